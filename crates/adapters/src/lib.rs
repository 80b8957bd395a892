//! post-scheduler adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `kv`: in-memory, file and SQLite key/value backends
//! - `store`: the post collection persisted over a key/value backend
//! - `platforms`: Twitter and Instagram API publishers plus a stub
//! - `outbox`: JSONL outbox for require-approval mode

mod kv_file;
mod kv_memory;
mod kv_sqlite;
pub mod outbox;
mod post_store;

pub mod platforms;

/// Re-exports for key/value backends
pub mod kv {
    pub use crate::kv_file::FileKeyValueStore;
    pub use crate::kv_memory::InMemoryKeyValueStore;
    pub use crate::kv_sqlite::SqliteKeyValueStore;
}

/// Re-exports for the post store
pub mod store {
    pub use crate::post_store::{CollectionPostStore, DEFAULT_COLLECTION_KEY};
}
