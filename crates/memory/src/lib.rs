//! Memory stores and record collaborators for Solace.

pub mod decay;
pub mod in_memory;
pub mod maintenance;
pub mod records;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use decay::{DecayPolicy, retrieval_order};
pub use in_memory::InMemoryStore;
pub use maintenance::MemoryMaintenance;
pub use records::{InMemoryConsentStore, InMemoryMessages, InMemoryProfiles};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
