//! Desktop implementations of the bridge traits.
//!
//! - [`DirBlobStore`]: cached file content as plain files in one flat
//!   directory, via `tokio::fs`
//! - [`ReqwestHttpClient`]: pooled HTTP transport with retry on transport
//!   failures
//! - [`StaticSettings`]: fixed in-process configuration
//! - [`SqliteSettingsStore`]: persistent key-value configuration in SQLite

pub mod blob;
pub mod http;
pub mod settings;

pub use blob::DirBlobStore;
pub use http::ReqwestHttpClient;
pub use settings::{SqliteSettingsStore, StaticSettings};
