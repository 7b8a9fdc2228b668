use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use super::{ObjectSettings, ObjectStorage};
use crate::error::StorageError;
use crate::file::ByteStream;

/// Hashmap-backed storage for tests and local development.
///
/// Buckets are created explicitly with [`create_bucket`] (the existence
/// check reports them missing otherwise) but writes create their bucket on
/// demand, mirroring a `skipCheckBucket` deployment where the check never
/// runs.
///
/// [`create_bucket`]: MemoryStorage::create_bucket
#[derive(Default)]
pub struct MemoryStorage {
    buckets: Mutex<HashMap<String, HashMap<String, StoredObject>>>,
}

/// An object as the memory backend stored it, exposed for assertions.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub settings: ObjectSettings,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().entry(bucket.to_string()).or_default();
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.lock().get(bucket).map(HashMap::len).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, StoredObject>>> {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store(&self, bucket: &str, key: &str, data: Bytes, settings: &ObjectSettings) {
        self.lock().entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data,
                settings: settings.clone(),
            },
        );
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.lock().contains_key(bucket))
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .lock()
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn write_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError> {
        self.store(bucket, key, data, settings);
        Ok(())
    }

    async fn write_object_streamed(
        &self,
        bucket: &str,
        key: &str,
        mut data: ByteStream,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError> {
        // Drain fully before storing so a failed stream leaves no object.
        let mut assembled = BytesMut::new();
        while let Some(chunk) = data.next().await {
            let chunk = chunk.map_err(|err| StorageError::Backend(anyhow!(err)))?;
            assembled.extend_from_slice(&chunk);
        }
        self.store(bucket, key, assembled.freeze(), settings);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.lock()
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key))
            .map(drop)
            .ok_or(StorageError::NotFound)
    }

    async fn signed_read_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://storage.googleapis.com/{bucket}/{key}\
             ?X-Goog-Algorithm=GOOG4-RSA-SHA256&X-Goog-Expires={}\
             &X-Goog-SignedHeaders=host&X-Goog-Signature=memory",
            expires_in.as_secs()
        ))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    #[test]
    fn delete_reports_not_found() {
        let storage = MemoryStorage::new();
        storage.create_bucket("b");
        let err = tokio_test::block_on(storage.delete_object("b", "missing")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn streamed_write_assembles_chunks() {
        let storage = MemoryStorage::new();
        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let source: ByteStream = Box::pin(stream::iter(chunks));

        tokio_test::block_on(storage.write_object_streamed(
            "b",
            "k",
            source,
            &ObjectSettings::default(),
        ))
        .unwrap();
        assert_eq!(storage.object("b", "k").unwrap().data, Bytes::from_static(b"abcd"));
    }

    #[test]
    fn failed_stream_stores_nothing() {
        let storage = MemoryStorage::new();
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "cut")),
        ];
        let source: ByteStream = Box::pin(stream::iter(chunks));

        let result = tokio_test::block_on(storage.write_object_streamed(
            "b",
            "k",
            source,
            &ObjectSettings::default(),
        ));
        assert!(result.is_err());
        assert!(storage.object("b", "k").is_none());
    }
}
