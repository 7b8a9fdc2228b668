use bytes::Bytes;
use std::time::Duration;

use crate::error::StorageError;
use crate::file::ByteStream;

pub mod gcs;
pub mod memory;

/// Content attributes attached to an object when it is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSettings {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub content_encoding: Option<String>,
    /// Request an object-level public-read ACL. Must stay unset for buckets
    /// with uniform bucket-level access, which reject object ACLs.
    pub public_read: bool,
}

/// The capability set this crate consumes from an object-storage backend.
///
/// One long-lived implementation is captured at init and shared across
/// concurrent calls; every method is an independent unit of work.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    async fn write_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError>;

    async fn write_object_streamed(
        &self,
        bucket: &str,
        key: &str,
        data: ByteStream,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Time-limited read-access url for an existing object, V4 signing.
    async fn signed_read_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    fn backend_name(&self) -> &'static str;
}

pub use gcs::GcsStorage;
pub use memory::MemoryStorage;
