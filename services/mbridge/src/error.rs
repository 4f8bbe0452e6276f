//! Error handling for the Modbus bridge
//!
//! Bus and decode failures stay inside the executor (logged, command dropped);
//! resolution, rejection and availability errors travel back to the HTTP caller.

use axum::http::StatusCode;
use thiserror::Error;

/// Bridge error type
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// Malformed reference or no such channel/device/register
    #[error("Reference error: {0}")]
    ReferenceResolution(String),

    /// Link-layer failure, Modbus exception response or timeout
    #[error("Bus error: {0}")]
    BusTransaction(String),

    /// Payload length or scaled value cannot be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Write aimed at a read-only or non-writable register
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Configuration load or validation failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write queue full or channel not running
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn reference(msg: impl Into<String>) -> Self {
        BridgeError::ReferenceResolution(msg.into())
    }

    pub fn bus(msg: impl Into<String>) -> Self {
        BridgeError::BusTransaction(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        BridgeError::Decode(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        BridgeError::WriteRejected(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        BridgeError::Config(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        BridgeError::Unavailable(msg.into())
    }

    /// HTTP status used when the error reaches the API boundary
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ReferenceResolution(_) => StatusCode::NOT_FOUND,
            Self::WriteRejected(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BusTransaction(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// From implementations for external error types
// ============================================================================

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

impl From<figment::Error> for BridgeError {
    fn from(err: figment::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<tokio_modbus::Error> for BridgeError {
    fn from(err: tokio_modbus::Error) -> Self {
        BridgeError::BusTransaction(err.to_string())
    }
}

impl From<tokio_modbus::ExceptionCode> for BridgeError {
    fn from(code: tokio_modbus::ExceptionCode) -> Self {
        BridgeError::BusTransaction(format!("Modbus exception: {}", code))
    }
}

// ============================================================================
// API Adaptation: BridgeError → AppError conversion
// ============================================================================

impl From<BridgeError> for common::AppError {
    fn from(err: BridgeError) -> Self {
        common::AppError::with_status(err.http_status(), err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BridgeError::reference("x").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BridgeError::rejected("ro").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BridgeError::unavailable("queue full").http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: common::AppError = BridgeError::rejected("register 'a:b:c' is read-only").into();
        assert_eq!(app.status, StatusCode::CONFLICT);
        assert_eq!(app.error.code, 409);
        assert!(app.error.message.contains("read-only"));
    }
}
