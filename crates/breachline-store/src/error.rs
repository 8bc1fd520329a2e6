use crate::DocKey;

/// Errors produced by a [`Store`](crate::Store).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `create` targeted a key that already holds a document.
    #[error("document {0} already exists")]
    AlreadyExists(DocKey),

    /// An update targeted a document that does not exist.
    #[error("document {0} not found")]
    NotFound(DocKey),

    /// Every attempt of a transaction hit a conflicting commit.
    #[error("transaction aborted after {attempts} conflicting attempts")]
    RetriesExhausted { attempts: u32 },

    /// A transaction read a document after it had already buffered writes.
    #[error("read of {0} after a write in the same transaction")]
    ReadAfterWrite(DocKey),

    /// A field update could not be applied to the stored document.
    #[error("invalid update of {key} at `{path}`: {reason}")]
    InvalidUpdate {
        key: DocKey,
        path: String,
        reason: String,
    },

    /// A stored document did not have the expected shape.
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: DocKey,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized into a document.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}
