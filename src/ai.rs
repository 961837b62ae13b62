pub mod chatbot;
pub mod forecasting;
pub mod llm;
