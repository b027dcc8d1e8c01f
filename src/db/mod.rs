//! Database layer (Firestore, with an in-memory stand-in).

pub mod firestore;
pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::Db;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TRIPS: &str = "trips";
    /// Read-only activity catalog
    pub const ACTIVITIES: &str = "activities";
}
