//! # Google Drive Provider
//!
//! Implements the `RemoteStore` trait against Google Drive API v3:
//!
//! - Paginated file listing driven by a caller-supplied query
//! - Multipart create and update uploads
//! - `alt=media` content downloads
//! - Exponential backoff on rate limiting and server errors

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
