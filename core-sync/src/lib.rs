//! # Sync Reconciliation Engine
//!
//! Keeps a local collection of plain-text files synchronized with one folder
//! in a remote cloud file store, surviving process death at any point.
//!
//! ## Components
//!
//! - **Naming Resolver** (`naming`): deterministic collision-free display
//!   names via an incrementing `(1)`, `(2)`, … marker
//! - **Reconciliation Algorithm** (`reconcile`): compares a fresh remote
//!   listing against the file index and decides upload / download /
//!   overwrite / conflict for every file
//! - **Queue Worker** (`worker`): drains the durable command queue one
//!   entry at a time, deleting each entry only after its remote side effect
//!   succeeded
//!
//! All state lives in `core-store`; all I/O goes through the `bridge-traits`
//! collaborators. The engine itself never talks to the network and never
//! panics on collaborator failure; a failed command simply stays queued
//! for the next trigger.

pub mod error;
pub mod naming;
pub mod reconcile;
pub mod worker;

pub use error::{Result, SyncError};
pub use naming::resolve_collision;
pub use reconcile::{ReconcileStats, Reconciler};
pub use worker::{DrainStats, SyncWorker};
