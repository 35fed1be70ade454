pub mod kv;
pub mod secure_store;
pub mod session;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use secure_store::SecureStore;
pub use session::{LoginMethod, NativeSession, PersistedContext, SessionRecord, SessionStore};
