pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteState;
pub use traits::StateStore;

#[cfg(feature = "serde_support")]
pub use traits::StateStoreExt;
