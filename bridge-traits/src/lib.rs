//! Collaborator contracts for the sync engine.
//!
//! The reconciliation core performs no network or raw file I/O of its own.
//! Everything it needs from the outside world is expressed as a trait here:
//!
//! - [`RemoteStore`]: the cloud file service (listing, create, update, download)
//! - [`BlobStore`]: the local cached-content store (write, read, rename, delete)
//! - [`SettingsProvider`]: host configuration (the target remote parent folder)
//! - [`HttpClient`]: buffered HTTP transport used by remote providers
//!
//! Implementations live elsewhere (`bridge-desktop`, `provider-google-drive`);
//! tests supply in-memory fakes.

pub mod blob;
pub mod error;
pub mod http;
pub mod remote;
pub mod settings;

pub use blob::BlobStore;
pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use remote::{ListQuery, RemoteFileSnapshot, RemoteStore};
pub use settings::SettingsProvider;
