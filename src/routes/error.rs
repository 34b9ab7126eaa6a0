use crate::domain::ValidationError;
use crate::lifecycle::LifecycleError;
use crate::store::StoreError;
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Rejected(#[from] LifecycleError),
    #[error(transparent)]
    Storage(StoreError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        ApiError::Rejected(LifecycleError::Validation(error))
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Rejected(rejection) => ApiError::Rejected(rejection),
            other => ApiError::Storage(other),
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Rejected(error) => match error {
                LifecycleError::Validation(_) => "validation_error",
                LifecycleError::DuplicateEmail { .. } => "duplicate_email",
                LifecycleError::CampaignLocked(_) => "campaign_locked",
                LifecycleError::AlreadySent(_) => "already_sent",
                LifecycleError::NoActiveSubscribers => "no_active_subscribers",
                LifecycleError::NotFound { .. } => "not_found",
            },
            ApiError::Storage(StoreError::NotFound) => "not_found",
            ApiError::Storage(StoreError::StaleWrite | StoreError::UniqueViolation { .. }) => {
                "conflict"
            }
            ApiError::Storage(_) | ApiError::Unexpected(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Rejected(error) => match error {
                LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
                LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
                LifecycleError::DuplicateEmail { .. }
                | LifecycleError::CampaignLocked(_)
                | LifecycleError::AlreadySent(_) => StatusCode::CONFLICT,
                LifecycleError::NoActiveSubscribers => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Storage(StoreError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(StoreError::StaleWrite | StoreError::UniqueViolation { .. }) => {
                StatusCode::CONFLICT
            }
            ApiError::Storage(_) | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error.cause_chain = ?self, error.message = %self, "Request failed");
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody {
            error: self.kind(),
            message,
        })
    }
}
