// src/services/chat_service.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    ai::{
        chatbot::{build_context, fallback_response, user_prompt, ScmSnapshot, SYSTEM_PROMPT},
        llm::{CompletionRequest, LanguageModel, LlmSettings},
    },
    common::error::AppError,
    db::{InventoryRepository, OrderRepository},
    models::{chat::ChatReply, inventory::Item, orders::OrderSummary},
};

/// Live snapshot backed by the repositories.
pub struct DbSnapshot {
    inventory_repo: InventoryRepository,
    order_repo: OrderRepository,
}

impl DbSnapshot {
    pub fn new(inventory_repo: InventoryRepository, order_repo: OrderRepository) -> Self {
        Self { inventory_repo, order_repo }
    }
}

#[async_trait]
impl ScmSnapshot for DbSnapshot {
    async fn low_stock_items(&self, limit: i64) -> Result<Vec<Item>, AppError> {
        self.inventory_repo.low_stock_items(Some(limit)).await
    }

    async fn active_item_count(&self) -> Result<i64, AppError> {
        self.inventory_repo.count_active().await
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderSummary>, AppError> {
        self.order_repo.recent_summaries(limit).await
    }
}

#[derive(Clone)]
pub struct ChatService {
    llm: Option<Arc<dyn LanguageModel>>,
    snapshot: Arc<dyn ScmSnapshot>,
    max_tokens: u32,
    temperature: f32,
}

impl ChatService {
    /// `llm` is `None` when no API key is configured; every query then gets the fallback.
    pub fn new(llm: Option<Arc<dyn LanguageModel>>, snapshot: Arc<dyn ScmSnapshot>, settings: &LlmSettings) -> Self {
        Self {
            llm,
            snapshot,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    /// Never fails: upstream problems become a `Fallback` reply.
    pub async fn answer(&self, query: &str) -> ChatReply {
        let Some(llm) = &self.llm else {
            return fallback(query, "AI service is not configured".to_string());
        };

        let context = build_context(self.snapshot.as_ref(), query).await;
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: user_prompt(query, &context),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        match llm.complete(&request).await {
            Ok(completion) => ChatReply::Answer {
                response: completion.text,
                model: llm.model_name().to_string(),
                tokens_used: completion.total_tokens,
                context_used: !context.is_empty(),
            },
            Err(e) => {
                tracing::warn!("🤖 Language model call failed: {}", e);
                fallback(query, format!("AI service error: {e}"))
            }
        }
    }
}

fn fallback(query: &str, error: String) -> ChatReply {
    ChatReply::Fallback {
        error,
        fallback_response: fallback_response(query).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        ai::{chatbot::testing::FakeSnapshot, llm::{Completion, LlmError}},
        models::inventory::fixtures::item,
    };

    struct FakeModel {
        reply: Option<Completion>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeModel {
        fn answering(text: &str) -> Self {
            Self {
                reply: Some(Completion { text: text.into(), total_tokens: 42 }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self { reply: None, seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        fn model_name(&self) -> &str {
            "fake-model"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().ok_or(LlmError::EmptyResponse)
        }
    }

    fn service(llm: Option<Arc<FakeModel>>, snapshot: FakeSnapshot) -> ChatService {
        ChatService::new(
            llm.map(|m| m as Arc<dyn LanguageModel>),
            Arc::new(snapshot),
            &LlmSettings::default(),
        )
    }

    #[tokio::test]
    async fn answer_carries_model_metadata_and_context_flag() {
        let model = Arc::new(FakeModel::answering("Reorder USB cables."));
        let snapshot = FakeSnapshot { low_stock: vec![item(3, 20)], active: 7, ..Default::default() };
        let chat = service(Some(model.clone()), snapshot);

        let reply = chat.answer("What stock is low?").await;

        assert_eq!(
            reply,
            ChatReply::Answer {
                response: "Reorder USB cables.".into(),
                model: "fake-model".into(),
                tokens_used: 42,
                context_used: true,
            }
        );
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].system_prompt, SYSTEM_PROMPT);
        assert!(seen[0].user_prompt.contains("USB Cable (SKU: USB-001): 3 units (min: 20)"));
        assert_eq!(seen[0].max_tokens, 500);
    }

    #[tokio::test]
    async fn no_keywords_means_no_context() {
        let model = Arc::new(FakeModel::answering("Hello."));
        let chat = service(Some(model), FakeSnapshot::default());

        match chat.answer("hello").await {
            ChatReply::Answer { context_used, .. } => assert!(!context_used),
            other => panic!("expected an answer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_failure_falls_back_by_topic() {
        let chat = service(Some(Arc::new(FakeModel::failing())), FakeSnapshot::default());

        match chat.answer("Any supplier advice?").await {
            ChatReply::Fallback { error, fallback_response } => {
                assert!(error.contains("no choices"));
                assert!(fallback_response.starts_with("Effective supplier management"));
            }
            other => panic!("expected a fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_model_always_falls_back() {
        let chat = service(None, FakeSnapshot::default());

        let reply = chat.answer("forecast help").await;
        assert!(matches!(reply, ChatReply::Fallback { .. }));
    }
}
