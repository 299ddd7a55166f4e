//! Host settings abstraction
//!
//! The sync core reads exactly one value from host configuration: the
//! remote parent folder that scopes listings and receives new uploads.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// The target remote parent-folder id, or `None` to sync against the
    /// provider's root namespace.
    async fn remote_parent_folder(&self) -> Result<Option<String>>;
}
