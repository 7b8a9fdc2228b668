use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::compress;
use crate::config::{check_config, ProviderConfig, ProviderOptions};
use crate::error::{ConfigError, DeleteError, SignedUrlError, UploadError};
use crate::file::FileDescriptor;
use crate::plan::{build_upload_plan, UploadPlan};
use crate::storage::{GcsStorage, ObjectStorage};

const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// The lifecycle contract the host plugin runtime drives: constructed once
/// via [`init`], then invoked per file event. Every operation is stateless
/// given the captured config and client handle, so the provider is safe to
/// share across concurrent calls.
#[async_trait::async_trait]
pub trait UploadProvider: Send + Sync {
    /// Write the descriptor's buffer to the destination key and record the
    /// resulting public url on the descriptor.
    async fn upload(&self, file: &mut FileDescriptor) -> Result<(), UploadError>;

    /// Like [`upload`](UploadProvider::upload), consuming the descriptor's
    /// byte stream instead of an in-memory buffer.
    async fn upload_stream(&self, file: &mut FileDescriptor) -> Result<(), UploadError>;

    /// Remove the object recorded on the descriptor. Missing url and
    /// already-deleted objects are no-ops.
    async fn delete(&self, file: &FileDescriptor) -> Result<(), DeleteError>;

    /// Whether uploaded files require signed access.
    fn is_private(&self) -> bool;

    /// Time-limited read url for the object recorded on the descriptor.
    async fn signed_url(&self, file: &FileDescriptor) -> Result<String, SignedUrlError>;
}

/// Validate configuration, resolve credentials, and capture the storage
/// client handle. Called once by the host at startup; all validation
/// failures surface here, since no later call could succeed with a bad
/// config.
pub async fn init(options: ProviderOptions) -> Result<GcsUploadProvider, ConfigError> {
    let (config, credential) = check_config(options)?;
    let credentials = if credential.is_some() {
        "service-account"
    } else {
        "application-default"
    };
    let storage = GcsStorage::connect(credential.as_ref()).await?;
    info!(
        bucket = %config.bucket_name,
        backend = storage.backend_name(),
        credentials = credentials,
        "upload provider initialized"
    );
    Ok(GcsUploadProvider::with_storage(config, Arc::new(storage)))
}

/// Provider adapter composing the validated config, the plan builder, and
/// a storage backend into the host contract.
pub struct GcsUploadProvider {
    config: ProviderConfig,
    storage: Arc<dyn ObjectStorage>,
}

impl GcsUploadProvider {
    /// Assemble the adapter over an already-connected backend. [`init`] is
    /// the GCS-backed path; tests and local development inject
    /// [`MemoryStorage`](crate::storage::MemoryStorage) here.
    pub fn with_storage(config: ProviderConfig, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.config.base_url, key)
    }

    /// Recover the object key by stripping the public-url prefix recorded
    /// at upload time.
    fn object_key(&self, url: &str) -> String {
        let prefix = format!("{}/", self.config.base_url);
        url.strip_prefix(&prefix).unwrap_or(url).to_string()
    }

    /// Build the plan and clear the destination when a stale object holds
    /// it. The probe/delete pair is best-effort: a concurrent writer can
    /// interleave between the two steps.
    async fn prepare(&self, file: &FileDescriptor) -> Result<UploadPlan, UploadError> {
        let plan = build_upload_plan(file, &self.config, self.storage.as_ref()).await?;
        if plan.replace_existing {
            debug!(key = %plan.key, "removing stale object before write");
            match self
                .storage
                .delete_object(&self.config.bucket_name, &plan.key)
                .await
            {
                Ok(()) => {}
                // Lost the race to another deleter; the key is free either way.
                Err(source) if source.is_not_found() => {}
                Err(source) => {
                    return Err(UploadError::Replace {
                        key: plan.key,
                        source,
                    })
                }
            }
        }
        Ok(plan)
    }

    async fn try_upload(&self, file: &mut FileDescriptor) -> Result<(), UploadError> {
        let Some(buffer) = file.buffer.clone() else {
            return Err(UploadError::MissingBuffer(file.name.clone()));
        };
        let plan = self.prepare(file).await?;

        let body = if plan.compress {
            compress::gzip_bytes(&buffer).map_err(|source| UploadError::Compress {
                key: plan.key.clone(),
                source,
            })?
        } else {
            buffer
        };
        self.storage
            .write_object(&self.config.bucket_name, &plan.key, body, &plan.settings)
            .await
            .map_err(|source| UploadError::Write {
                key: plan.key.clone(),
                source,
            })?;

        let url = self.public_url(&plan.key);
        debug!(key = %plan.key, %url, "object uploaded");
        file.url = Some(url);
        Ok(())
    }

    async fn try_upload_stream(&self, file: &mut FileDescriptor) -> Result<(), UploadError> {
        let Some(stream) = file.stream.take() else {
            return Err(UploadError::MissingStream(file.name.clone()));
        };
        let plan = self.prepare(file).await?;

        let body = if plan.compress {
            compress::gzip_stream(stream)
        } else {
            stream
        };
        self.storage
            .write_object_streamed(&self.config.bucket_name, &plan.key, body, &plan.settings)
            .await
            .map_err(|source| UploadError::Write {
                key: plan.key.clone(),
                source,
            })?;

        let url = self.public_url(&plan.key);
        debug!(key = %plan.key, %url, "object uploaded from stream");
        file.url = Some(url);
        Ok(())
    }

    fn expiry_window(&self) -> Result<Duration, SignedUrlError> {
        let Some(expires_at) = self.config.expires else {
            return Ok(DEFAULT_SIGNED_URL_TTL);
        };
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        if expires_at <= now_ms {
            return Err(SignedUrlError::ExpiryInPast(expires_at));
        }
        Ok(Duration::from_millis((expires_at - now_ms) as u64))
    }
}

#[async_trait::async_trait]
impl UploadProvider for GcsUploadProvider {
    async fn upload(&self, file: &mut FileDescriptor) -> Result<(), UploadError> {
        match self.try_upload(file).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(name = %file.name, error = %err, "upload failed");
                Err(err)
            }
        }
    }

    async fn upload_stream(&self, file: &mut FileDescriptor) -> Result<(), UploadError> {
        match self.try_upload_stream(file).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(name = %file.name, error = %err, "streamed upload failed");
                Err(err)
            }
        }
    }

    async fn delete(&self, file: &FileDescriptor) -> Result<(), DeleteError> {
        let Some(url) = file.url.as_deref() else {
            warn!(name = %file.name, "file has no stored url, nothing to delete");
            return Ok(());
        };
        let key = self.object_key(url);
        match self
            .storage
            .delete_object(&self.config.bucket_name, &key)
            .await
        {
            Ok(()) => {
                debug!(key = %key, "object deleted");
                Ok(())
            }
            Err(source) if source.is_not_found() => {
                warn!(key = %key, "object already deleted");
                Ok(())
            }
            Err(source) => {
                let err = DeleteError { key, source };
                error!(name = %file.name, error = %err, "delete failed");
                Err(err)
            }
        }
    }

    fn is_private(&self) -> bool {
        !self.config.public_files
    }

    async fn signed_url(&self, file: &FileDescriptor) -> Result<String, SignedUrlError> {
        let Some(url) = file.url.as_deref() else {
            return Err(SignedUrlError::MissingUrl(file.name.clone()));
        };
        let key = self.object_key(url);
        let expires_in = self.expiry_window()?;
        self.storage
            .signed_read_url(&self.config.bucket_name, &key, expires_in)
            .await
            .map_err(|source| SignedUrlError::Sign { key, source })
    }
}
