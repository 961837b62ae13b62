// src/config.rs

use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    ai::{
        chatbot::ScmSnapshot,
        forecasting::ForecastSettings,
        llm::{LanguageModel, LlmSettings, OpenAiClient},
    },
    db::{ForecastRepository, InventoryRepository, OrderRepository, UserRepository},
    services::{
        auth::{AuthService, JwtKeys},
        chat_service::{ChatService, DbSnapshot},
        forecast_service::ForecastService,
        inventory_service::InventoryService,
        order_service::OrderService,
    },
};

/// Process configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub llm: LlmSettings,
    pub forecast: ForecastSettings,
}

impl Settings {
    /// Call after `dotenvy::dotenv()` so a local .env file is honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let llm_defaults = LlmSettings::default();
        let forecast_defaults = ForecastSettings::default();

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            jwt_expiration_hours: parse_or(&lookup, "JWT_EXPIRATION_HOURS", 168)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            llm: LlmSettings {
                api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
                base_url: lookup("OPENAI_BASE_URL").unwrap_or(llm_defaults.base_url),
                model: lookup("OPENAI_MODEL").unwrap_or(llm_defaults.model),
                max_tokens: parse_or(&lookup, "OPENAI_MAX_TOKENS", llm_defaults.max_tokens)?,
                temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", llm_defaults.temperature)?,
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "OPENAI_TIMEOUT_SECS",
                    llm_defaults.timeout.as_secs(),
                )?),
            },
            forecast: ForecastSettings {
                min_history: parse_or(&lookup, "FORECAST_MIN_HISTORY", forecast_defaults.min_history)?,
                yearly_seasonality: flag_or(&lookup, "FORECAST_YEARLY_SEASONALITY", forecast_defaults.yearly_seasonality)?,
                weekly_seasonality: flag_or(&lookup, "FORECAST_WEEKLY_SEASONALITY", forecast_defaults.weekly_seasonality)?,
                changepoint_prior_scale: parse_or(
                    &lookup,
                    "FORECAST_CHANGEPOINT_PRIOR_SCALE",
                    forecast_defaults.changepoint_prior_scale,
                )?,
                jitter: flag_or(&lookup, "FORECAST_JITTER", forecast_defaults.jitter)?,
            },
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{key} must be a boolean, got '{v}'")),
        },
    }
}

// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub inventory_service: InventoryService,
    pub order_service: OrderService,
    pub forecast_service: ForecastService,
    pub chat_service: ChatService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Could not connect to the database")?;

        tracing::info!("✅ Database connection established");
        Self::with_pool(settings, db_pool)
    }

    /// Wires repositories and services around an existing pool.
    pub fn with_pool(settings: Settings, db_pool: PgPool) -> anyhow::Result<Self> {
        // --- Repositories ---
        let user_repo = UserRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let forecast_repo = ForecastRepository::new(db_pool.clone());

        // --- Language model ---
        let llm: Option<Arc<dyn LanguageModel>> = match settings.llm.api_key.clone() {
            Some(api_key) => {
                let client = OpenAiClient::new(&settings.llm, api_key).context("Could not build the language model client")?;
                tracing::info!("🤖 Chat assistant using model '{}'", settings.llm.model);
                Some(Arc::new(client) as Arc<dyn LanguageModel>)
            }
            None => {
                tracing::warn!("⚠️ OPENAI_API_KEY not set, chat will only return fallback answers");
                None
            }
        };
        let snapshot: Arc<dyn ScmSnapshot> = Arc::new(DbSnapshot::new(inventory_repo.clone(), order_repo.clone()));

        // --- Services ---
        let keys = JwtKeys::new(
            settings.jwt_secret.clone(),
            chrono::Duration::hours(settings.jwt_expiration_hours),
        );
        let auth_service = AuthService::new(user_repo, keys, db_pool.clone());
        let inventory_service = InventoryService::new(inventory_repo.clone(), db_pool.clone());
        let order_service = OrderService::new(order_repo, inventory_repo.clone(), db_pool.clone());
        let forecast_service = ForecastService::new(
            inventory_repo,
            forecast_repo,
            settings.forecast.clone(),
            db_pool.clone(),
        );
        let chat_service = ChatService::new(llm, snapshot, &settings.llm);

        Ok(Self {
            db_pool,
            auth_service,
            inventory_service,
            order_service,
            forecast_service,
            chat_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/scm"), ("JWT_SECRET", "s3cret")];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let s = settings_from(&REQUIRED).unwrap();

        assert_eq!(s.jwt_expiration_hours, 168);
        assert_eq!(s.bind_addr, "0.0.0.0:5000");
        assert_eq!(s.database_max_connections, 5);
        assert_eq!(s.llm, LlmSettings::default());
        assert_eq!(s.forecast, ForecastSettings::default());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = settings_from(&[("JWT_SECRET", "s3cret")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("JWT_EXPIRATION_HOURS", "24"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("OPENAI_TIMEOUT_SECS", "5"),
            ("FORECAST_MIN_HISTORY", "20"),
            ("FORECAST_JITTER", "false"),
            ("FORECAST_YEARLY_SEASONALITY", "0"),
        ]);
        let s = settings_from(&pairs).unwrap();

        assert_eq!(s.jwt_expiration_hours, 24);
        assert_eq!(s.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(s.llm.temperature, 0.2);
        assert_eq!(s.llm.timeout, Duration::from_secs(5));
        assert_eq!(s.forecast.min_history, 20);
        assert!(!s.forecast.jitter);
        assert!(!s.forecast.yearly_seasonality);
        assert!(s.forecast.weekly_seasonality);
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OPENAI_API_KEY", "  "));
        assert!(settings_from(&pairs).unwrap().llm.api_key.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DATABASE_MAX_CONNECTIONS", "many"));
        let err = settings_from(&pairs).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FORECAST_JITTER", "maybe"));
        assert!(settings_from(&pairs).is_err());
    }
}
