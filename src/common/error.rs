// src/common/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::error::DatabaseError;
use serde_json::json;
use thiserror::Error;

use crate::models::orders::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // Input that is rejected by business rules rather than by field validators
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username already exists")]
    UsernameAlreadyExists,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("SKU already exists")]
    SkuAlreadyExists,

    #[error("Cannot move order from '{from}' to '{to}'")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Item not found")]
    ItemNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Resource not found")]
    RouteNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::DatabaseError(sqlx::Error::Database(db_err)) = &self {
            if let Some(message) = rejected_by_schema(&**db_err) {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
            }
        }

        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            e @ (AppError::UsernameAlreadyExists
            | AppError::EmailAlreadyExists
            | AppError::SkuAlreadyExists
            | AppError::InvalidStatusTransition { .. }) => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ (AppError::InvalidCredentials | AppError::AccountInactive | AppError::InvalidToken) => {
                (StatusCode::UNAUTHORIZED, e.to_string())
            }
            e @ (AppError::UserNotFound
            | AppError::ItemNotFound
            | AppError::OrderNotFound
            | AppError::RouteNotFound) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }

            // Everything else is an infrastructure failure: log the detail, hide it from the client.
            ref e => {
                tracing::error!("🔥 Internal server error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

/// Client input the database refused: a dangling reference, a failed CHECK or a numeric overflow.
fn rejected_by_schema(db_err: &dyn DatabaseError) -> Option<&'static str> {
    if db_err.is_foreign_key_violation() {
        return Some("Referenced record does not exist");
    }
    if db_err.is_check_violation() {
        return Some("Value violates a data constraint");
    }
    // 22003: numeric_value_out_of_range
    if db_err.code().as_deref() == Some("22003") {
        return Some("Numeric value out of range");
    }
    None
}

/// Maps a unique-constraint violation to `on_unique`, anything else to a database error.
pub(crate) fn map_unique_violation(e: sqlx::Error, on_unique: impl FnOnce(Option<&str>) -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return on_unique(db_err.constraint());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{borrow::Cow, fmt};

    use axum::body::to_bytes;
    use sqlx::error::ErrorKind;
    use validator::{ValidationError, ValidationErrors};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_list_field_details() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("SKU is required.".into());
        errors.add("sku", err);

        let response = AppError::ValidationError(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["details"]["sku"][0], "SKU is required.");
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_bad_request() {
        let response = AppError::SkuAlreadyExists.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "SKU already exists");
    }

    #[tokio::test]
    async fn illegal_transition_names_both_states() {
        let response = AppError::InvalidStatusTransition {
            from: OrderStatus::Received,
            to: OrderStatus::Pending,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Cannot move order from 'received' to 'pending'"
        );
    }

    #[test]
    fn auth_and_lookup_failures_map_to_their_status() {
        assert_eq!(AppError::InvalidToken.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountInactive.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ItemNotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::OrderNotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RouteNotFound.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug)]
    struct FakeDbError {
        kind: ErrorKind,
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self.kind)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "rejected"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(kind: ErrorKind, code: Option<&'static str>, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { kind, code, constraint }))
    }

    #[tokio::test]
    async fn dangling_reference_is_a_bad_request() {
        let err = AppError::from(db_error(ErrorKind::ForeignKeyViolation, Some("23503"), Some("items_supplier_id_fkey")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Referenced record does not exist");
    }

    #[tokio::test]
    async fn numeric_overflow_is_a_bad_request() {
        let response = AppError::from(db_error(ErrorKind::Other, Some("22003"), None)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Numeric value out of range");
    }

    #[tokio::test]
    async fn other_database_failures_stay_internal() {
        let response = AppError::from(db_error(ErrorKind::Other, Some("57P01"), None)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[test]
    fn unique_violation_maps_to_the_callers_error() {
        let err = map_unique_violation(
            db_error(ErrorKind::UniqueViolation, Some("23505"), Some("items_sku_key")),
            |constraint| {
                assert_eq!(constraint, Some("items_sku_key"));
                AppError::SkuAlreadyExists
            },
        );
        assert!(matches!(err, AppError::SkuAlreadyExists));

        let err = map_unique_violation(db_error(ErrorKind::CheckViolation, Some("23514"), None), |_| {
            AppError::SkuAlreadyExists
        });
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let response = AppError::InternalServerError(anyhow::anyhow!("pool exhausted")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }
}
