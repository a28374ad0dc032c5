use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use vpg_engine::{InventoryError, PaymentRequestError, ReconciliationError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("The request came from a peer that is not on the whitelist.")]
    ForbiddenPeer,
    #[error("A valid admin key is required.")]
    InvalidAdminKey,
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::InvalidAdminKey => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            InventoryError::CapacityExceeded { .. } | InventoryError::NegativeStock => {
                Self::InvalidRequestBody(e.to_string())
            },
        }
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ReconciliationError::ItemNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReconciliationError::AlreadyResolved(_) => Self::Conflict(e.to_string()),
            ReconciliationError::InvalidOutcome(_) => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<PaymentRequestError> for ServerError {
    fn from(e: PaymentRequestError) -> Self {
        match e {
            PaymentRequestError::UnknownTarget(_) => Self::NoRecordFound(e.to_string()),
            PaymentRequestError::OutOfStock(_) => Self::Conflict(e.to_string()),
            PaymentRequestError::InvalidAmount | PaymentRequestError::Reference(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            PaymentRequestError::Signature(_) => Self::ConfigurationError(e.to_string()),
            PaymentRequestError::Inventory(e) => e.into(),
        }
    }
}
