//! # parley-store
//!
//! Local persistence for the Parley messaging simulation.
//!
//! Every piece of state lives in a named *partition*: one whole JSON value
//! stored under a string key.  The crate exposes the raw [`PartitionStore`]
//! contract (backed by SQLite through [`Database`], or by [`MemoryStore`] in
//! tests), the persisted domain models, and typed repositories layered on top
//! of any partition store.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod partitions;
pub mod repository;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::*;
pub use partitions::{keys, PartitionStore, PartitionStoreExt};
pub use repository::{AccountRepository, LedgerRepository, SessionRepository, StoryRepository};
