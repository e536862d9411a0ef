//! Storage traits and implementations
//!
//! This module defines the storage abstraction layer for inbox entities.
//! The trait-based design allows swapping between in-memory and persistent
//! storage implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryInboxStore;
pub use sqlite::SqliteInboxStore;
pub use traits::InboxStore;
