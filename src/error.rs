use thiserror::Error;

/// Configuration problems detected during `init`. None of these are
/// recoverable: no later call can succeed with a bad config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("provider options are malformed: {0}")]
    Malformed(String),

    #[error("`bucketName` is required and must be a non-empty string")]
    MissingBucketName,

    #[error("`{field}` must be a boolean or one of the strings \"true\" or \"false\"")]
    InvalidFlag { field: &'static str },

    #[error("`serviceAccount` must be a JSON object or a JSON string: {reason}")]
    MalformedServiceAccount { reason: String },

    #[error("`serviceAccount` is missing the required field `{field}`")]
    IncompleteServiceAccount { field: &'static str },

    #[error("failed to resolve storage credentials")]
    Credentials(#[source] anyhow::Error),
}

/// Facade-level failure from the object-storage backend. `NotFound` is kept
/// discriminated because two call sites treat it as a non-error (existence
/// probes and already-deleted objects).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage returned not-found")]
    NotFound,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

/// Failure while planning or performing an upload. Logged with context by
/// the adapter, then returned for the host to apply its own policy.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("bucket `{0}` does not exist")]
    BucketNotFound(String),

    #[error("failed to query object storage for `{target}`")]
    Probe {
        target: String,
        #[source]
        source: StorageError,
    },

    #[error("file `{0}` carries no buffer to upload")]
    MissingBuffer(String),

    #[error("file `{0}` carries no stream to upload")]
    MissingStream(String),

    #[error("failed to remove the existing object at `{key}`")]
    Replace {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to compress payload for `{key}`")]
    Compress {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write object `{key}`")]
    Write {
        key: String,
        #[source]
        source: StorageError,
    },
}

/// Deletion failure. Not-found never reaches this type: the adapter treats
/// it as already-deleted.
#[derive(Debug, Error)]
#[error("failed to delete object `{key}`")]
pub struct DeleteError {
    pub key: String,
    #[source]
    pub source: StorageError,
}

#[derive(Debug, Error)]
pub enum SignedUrlError {
    #[error("file `{0}` has no stored url to sign")]
    MissingUrl(String),

    #[error("configured expiry {0} (epoch ms) is already in the past")]
    ExpiryInPast(i64),

    #[error("failed to sign a read url for `{key}`")]
    Sign {
        key: String,
        #[source]
        source: StorageError,
    },
}
