//! Google Cloud Storage upload provider for content-management backends.
//!
//! The host plugin runtime constructs the provider once with
//! [`init`](provider::init), then drives the five lifecycle operations of
//! [`UploadProvider`](provider::UploadProvider): `upload`, `upload_stream`,
//! `delete`, `is_private`, and `signed_url`. Configuration arrives as
//! [`ProviderOptions`](config::ProviderOptions) — typically deserialized
//! from the host's JSON plugin config — and is validated up front; every
//! later call reuses the normalized config and a shared storage client.
//!
//! Logging goes through `tracing`; the host owns the subscriber.

pub mod compress;
pub mod config;
pub mod error;
pub mod file;
pub mod plan;
pub mod provider;
pub mod storage;

pub use config::{
    check_config, ContentTypeFn, FileNameFn, MetadataFn, ObjectMetadata, ProviderConfig,
    ProviderOptions, ServiceAccount,
};
pub use error::{ConfigError, DeleteError, SignedUrlError, StorageError, UploadError};
pub use file::{ByteStream, FileDescriptor, RelatedRef};
pub use plan::{build_upload_plan, generate_upload_file_name, UploadPlan};
pub use provider::{init, GcsUploadProvider, UploadProvider};
pub use storage::{GcsStorage, MemoryStorage, ObjectSettings, ObjectStorage};
