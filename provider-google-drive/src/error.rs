//! Error types for the Google Drive provider

use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// API request returned an error status
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Local file I/O failed while preparing an upload
    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for bridge_traits::error::BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::RemoteApi {
                status: status_code,
                message,
            },
            GoogleDriveError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GoogleDriveError::Io(e) => bridge_traits::error::BridgeError::Io(e),
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 404,
            message: "File not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn api_error_converts_to_remote_api() {
        let error = GoogleDriveError::ApiError {
            status_code: 403,
            message: "rate limited".to_string(),
        };
        let bridge: bridge_traits::error::BridgeError = error.into();
        assert!(matches!(
            bridge,
            bridge_traits::error::BridgeError::RemoteApi { status: 403, .. }
        ));
    }
}
