//! # Durable Sync State
//!
//! SQLite-backed persistence for the sync engine:
//!
//! - **File index** (`file_index`): one row per tracked file, holding its
//!   display name, remote linkage, and the timestamps the reconciler
//!   compares.
//! - **Command queue** (`command_queue`): strictly FIFO list of pending
//!   network operations, durable across process restarts.
//!
//! Both repositories are trait-fronted so the engine and its tests never see
//! SQL. Absence is `None`, never an error.

pub mod command_queue;
pub mod db;
pub mod error;
pub mod file_index;
pub mod models;

pub use command_queue::{CommandId, CommandKind, CommandQueue, PendingCommand, SqliteCommandQueue};
pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use file_index::{FileIndexRepository, SqliteFileIndexRepository};
pub use models::{LocalRecord, NewLocalRecord, RecordId};
