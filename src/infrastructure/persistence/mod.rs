pub mod in_memory_store;
pub mod migrations;
pub mod sqlite_store;
pub mod threshold_file;

pub use in_memory_store::InMemoryStore;
pub use sqlite_store::SqliteStore;
pub use threshold_file::JsonThresholdStore;
