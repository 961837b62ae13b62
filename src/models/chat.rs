// src/models/chat.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChatPayload {
    #[validate(length(min = 1, max = 4000, message = "Query is required"))]
    #[schema(example = "Which items should I reorder this week?")]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ChatReply {
    Answer {
        response: String,
        model: String,
        tokens_used: u32,
        context_used: bool,
    },
    /// Returned when the language model is unavailable; still a 200.
    Fallback {
        error: String,
        fallback_response: String,
    },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AiMode {
    pub name: &'static str,
    pub description: &'static str,
    pub endpoint: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AiModes {
    pub chatbot: AiMode,
    pub forecast: AiMode,
}

impl AiModes {
    pub fn catalogue() -> Self {
        Self {
            chatbot: AiMode {
                name: "Supply Chain Chatbot",
                description: "AI assistant for SCM questions and guidance",
                endpoint: "/ai/chat",
            },
            forecast: AiMode {
                name: "Demand Forecasting",
                description: "Predict future demand from order history",
                endpoint: "/ai/forecast",
            },
        }
    }
}
