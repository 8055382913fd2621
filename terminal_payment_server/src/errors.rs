use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use terminal_payment_engine::{api::DeviceApiError, vault::VaultError, IngestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Device not authorized")]
    Unauthorized,
    #[error("{0}")]
    DeviceBlocked(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DeviceBlocked(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<DeviceApiError> for ServerError {
    fn from(e: DeviceApiError) -> Self {
        match e {
            DeviceApiError::Unauthorized => Self::Unauthorized,
            // The blocked message is part of the device protocol; it must survive verbatim.
            DeviceApiError::Blocked => Self::DeviceBlocked(e.to_string()),
            DeviceApiError::InvalidRegistration(msg) => Self::InvalidRequestBody(msg),
            DeviceApiError::NotFound(msg) => Self::NoRecordFound(msg),
            DeviceApiError::Store(e) => Self::BackendError(format!("Database error: {e}")),
            DeviceApiError::Vault(e) => Self::BackendError(format!("Vault error: {e}")),
        }
    }
}

impl From<IngestError> for ServerError {
    fn from(e: IngestError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<VaultError> for ServerError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Config(msg) => Self::ConfigurationError(msg),
            other => Self::BackendError(other.to_string()),
        }
    }
}
