/// All errors that can be returned by a RecordStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No service row with the given id exists.
    #[error("service not found: {id}")]
    ServiceNotFound { id: i64 },

    /// The store refused the request (constraint violation, bad column,
    /// permission denied). `message` is the store's own explanation.
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A backend-specific failure (connection, serialization, poisoned lock).
    #[error("storage backend error: {0}")]
    Backend(String),
}
