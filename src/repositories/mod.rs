pub mod history_repository;
pub mod kv_store;
pub mod session_repository;

pub use history_repository::{HistoryRepository, KvHistoryRepository};
pub use kv_store::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use session_repository::SessionRepository;
