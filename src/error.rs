use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::attendance::LeaveCategory;
use crate::repo::StoreError;

#[derive(Debug, Display)]
pub enum ServiceError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{} {} not found", entity, id)]
    NotFound { entity: &'static str, id: u64 },

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(
        fmt = "Insufficient {} balance. Available: {}, requested: {}",
        category,
        available,
        requested
    )]
    InsufficientBalance {
        category: LeaveCategory,
        available: u32,
        requested: u32,
    },

    #[display(fmt = "{}", _0)]
    InvalidTransition(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "storage failure: {}", _0)]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InsufficientBalance { .. } => "insufficient_balance",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Store(_) => "internal_error",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
            ServiceError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Store operation failed");
                json!({
                    "error": self.kind(),
                    "message": "Something went wrong, Contact with system admin"
                })
            }
            ServiceError::InsufficientBalance { available, .. } => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "available": available
            }),
            _ => json!({
                "error": self.kind(),
                "message": self.to_string()
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn insufficient_balance_carries_available_count() {
        let err = ServiceError::InsufficientBalance {
            category: LeaveCategory::Sick,
            available: 2,
            requested: 5,
        };
        assert_eq!(err.to_string(), "Insufficient SICK balance. Available: 2, requested: 5");

        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["available"], 2);
        assert_eq!(value["error"], "insufficient_balance");
    }

    #[test]
    fn store_details_are_not_leaked() {
        let err = ServiceError::from(StoreError::Corrupt("bad enum".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
