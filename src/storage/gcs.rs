use std::time::Duration;

use anyhow::anyhow;
use bytes::Bytes;
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::buckets::get::GetBucketRequest;
use google_cloud_storage::http::object_access_controls::PredefinedObjectAcl;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{UploadObjectRequest, UploadType};
use google_cloud_storage::http::objects::Object;
use google_cloud_storage::http::Error as GcsError;
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};

use super::{ObjectSettings, ObjectStorage};
use crate::config::ServiceAccount;
use crate::error::{ConfigError, StorageError};
use crate::file::ByteStream;

/// Google Cloud Storage backend.
pub struct GcsStorage {
    client: Client,
}

impl GcsStorage {
    /// Build a client from the validated credential, or from application
    /// default credentials when none was supplied.
    pub async fn connect(credential: Option<&ServiceAccount>) -> Result<Self, ConfigError> {
        let config = match credential {
            Some(account) => {
                let credentials = CredentialsFile::new_from_str(&account.auth_json())
                    .await
                    .map_err(|err| ConfigError::Credentials(anyhow!(err)))?;
                ClientConfig::default()
                    .with_credentials(credentials)
                    .await
                    .map_err(|err| ConfigError::Credentials(anyhow!(err)))?
            }
            None => ClientConfig::default()
                .with_auth()
                .await
                .map_err(|err| ConfigError::Credentials(anyhow!(err)))?,
        };

        Ok(GcsStorage {
            client: Client::new(config),
        })
    }
}

#[async_trait::async_trait]
impl ObjectStorage for GcsStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        let request = GetBucketRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };
        match self.client.get_bucket(&request).await {
            Ok(_) => Ok(true),
            Err(err) => match classify(err) {
                StorageError::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        match self.client.get_object(&request).await {
            Ok(_) => Ok(true),
            Err(err) => match classify(err) {
                StorageError::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn write_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError> {
        let (request, upload_type) = upload_parts(bucket, key, settings);
        self.client
            .upload_object(&request, data, &upload_type)
            .await
            .map(drop)
            .map_err(classify)
    }

    async fn write_object_streamed(
        &self,
        bucket: &str,
        key: &str,
        data: ByteStream,
        settings: &ObjectSettings,
    ) -> Result<(), StorageError> {
        let (request, upload_type) = upload_parts(bucket, key, settings);
        self.client
            .upload_streamed_object(&request, data, &upload_type)
            .await
            .map(drop)
            .map_err(classify)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let request = DeleteObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };
        self.client.delete_object(&request).await.map_err(classify)
    }

    async fn signed_read_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let options = SignedURLOptions {
            method: SignedURLMethod::GET,
            expires: expires_in,
            ..Default::default()
        };
        self.client
            .signed_url(bucket, key, None, None, options)
            .await
            .map_err(|err| StorageError::Backend(anyhow!(err)))
    }

    fn backend_name(&self) -> &'static str {
        "google-cloud-storage"
    }
}

/// Shape the request and object metadata shared by both write paths. The
/// public-read ACL rides on the request as a predefined ACL; everything
/// else is object metadata on the multipart upload.
fn upload_parts(bucket: &str, key: &str, settings: &ObjectSettings) -> (UploadObjectRequest, UploadType) {
    let request = UploadObjectRequest {
        bucket: bucket.to_string(),
        predefined_acl: settings
            .public_read
            .then_some(PredefinedObjectAcl::PublicRead),
        ..Default::default()
    };
    let metadata = Object {
        name: key.to_string(),
        content_type: (!settings.content_type.is_empty())
            .then(|| settings.content_type.clone()),
        content_disposition: settings.content_disposition.clone(),
        cache_control: settings.cache_control.clone(),
        content_encoding: settings.content_encoding.clone(),
        ..Default::default()
    };
    (request, UploadType::Multipart(Box::new(metadata)))
}

fn classify(err: GcsError) -> StorageError {
    if let GcsError::Response(response) = &err {
        if response.code == 404 {
            return StorageError::NotFound;
        }
    }
    StorageError::Backend(anyhow!(err))
}
