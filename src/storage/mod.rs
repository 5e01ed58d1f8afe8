//! SQLite-backed persistence for the concept graph
//!
//! All engine reads and writes go through a `StoreSession`, scoped either
//! to one transaction (`with_tx`) or to autocommit work (`with_session`).

mod sqlite;
mod traits;

pub use sqlite::{SqliteStore, StoreSession};
pub use traits::{OpenStore, StorageError, StorageResult};
