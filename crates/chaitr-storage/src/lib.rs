pub mod store;
pub mod file;
pub mod value;

pub use store::{KeyValueStore, MemoryStore};
pub use file::FileStore;
pub use value::{SlotState, StoredValue};
