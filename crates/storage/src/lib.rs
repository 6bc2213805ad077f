pub mod conformance;
mod error;
mod memory;
#[cfg(feature = "postgrest")]
mod postgrest;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
#[cfg(feature = "postgrest")]
pub use postgrest::{PostgrestStore, DEFAULT_TABLE};
pub use record::{NewServiceRow, ServicePatch, ServiceRow, TextList};
pub use traits::RecordStore;
