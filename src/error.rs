//! Error types for the Placement CLI
//!
//! Provides structured error types for all client components including
//! version negotiation, request construction, and response formatting.

use thiserror::Error;

/// Unified error type for the CLI
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Version Errors
    // =========================================================================
    #[error("Invalid API version {requested:?}: {reason}")]
    InvalidVersion { requested: String, reason: String },

    #[error(
        "Argument --{field} is not supported with version {negotiated}; \
         requires at least version {required}"
    )]
    FieldNotSupported {
        field: String,
        required: String,
        negotiated: String,
    },

    #[error(
        "Operation {operation} is not supported with version {negotiated}; \
         requires at least version {required}"
    )]
    NotSupported {
        operation: String,
        required: String,
        negotiated: String,
    },

    // =========================================================================
    // Request Construction Errors
    // =========================================================================
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Operation failed: {0}")]
    Failed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // =========================================================================
    // Transport / Parse Errors
    // =========================================================================
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid version error
    pub fn invalid_version(requested: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidVersion {
            requested: requested.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a server error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Error::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedResponse(message.into())
    }

    /// Whether the failure was detected client-side, before any request
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidVersion { .. }
                | Error::FieldNotSupported { .. }
                | Error::NotSupported { .. }
                | Error::MissingArgument(_)
                | Error::UnsupportedFilter(_)
                | Error::InvalidArgument(_)
                | Error::Configuration(_)
        )
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration(_) => 1,
            Error::InvalidVersion { .. } => 2,
            Error::FieldNotSupported { .. } | Error::NotSupported { .. } => 3,
            Error::MissingArgument(_)
            | Error::UnsupportedFilter(_)
            | Error::InvalidArgument(_) => 4,
            Error::Server { .. } | Error::Failed(_) => 5,
            Error::MalformedResponse(_) => 6,
            Error::Http(_) => 7,
            Error::Json(_) => 8,
            Error::Io(_) => 9,
        }
    }
}

/// Result type alias for the CLI
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors() {
        let err = Error::FieldNotSupported {
            field: "aggregate-uuid".into(),
            required: "1.3".into(),
            negotiated: "1.0".into(),
        };
        assert!(err.is_local());
        assert_eq!(err.exit_code(), 3);

        let err = Error::server(409, "inventory in use");
        assert!(!err.is_local());
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_field_not_supported_message() {
        let err = Error::FieldNotSupported {
            field: "resource".into(),
            required: "1.4".into(),
            negotiated: "1.2".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("--resource"));
        assert!(msg.contains("1.4"));
        assert!(msg.contains("1.2"));
    }

    #[test]
    fn test_server_error_verbatim() {
        let err = Error::server(404, "No resource provider with uuid abc found");
        assert!(err
            .to_string()
            .contains("No resource provider with uuid abc found"));
    }
}
