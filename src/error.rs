//! Error types for the certificate pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, logging or distributing a certificate
#[derive(Error, Debug)]
pub enum Error {
    /// The capture target is not mounted in the surface host
    #[error("Capture element not found: {0}")]
    ElementNotFound(String),

    /// Rasterization or encoding failed
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// A remote log submission could not be sent (logged, never surfaced)
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// An embedded image could not be loaded
    #[error("Resource unavailable: {0}")]
    ResourceError(String),

    /// Writing to the system clipboard failed
    #[error("Clipboard write failed: {0}")]
    ClipboardError(String),

    /// Opening a share target or saving a file failed
    #[error("Environment operation failed: {0}")]
    EnvironmentError(String),

    /// Appending to the submission log failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure belongs to the capture path and must be shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Error::ElementNotFound(_) | Error::CaptureError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_capture_errors_are_user_visible() {
        assert!(Error::ElementNotFound("x".into()).is_user_visible());
        assert!(Error::CaptureError("x".into()).is_user_visible());
        assert!(!Error::DeliveryError("x".into()).is_user_visible());
        assert!(!Error::ResourceError("x".into()).is_user_visible());
    }
}
