use crate::config::ProviderConfig;
use crate::error::UploadError;
use crate::file::FileDescriptor;
use crate::storage::{ObjectSettings, ObjectStorage};

/// Per-call write plan. Never persisted; recomputed for every upload.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    /// Destination object key within the bucket.
    pub key: String,
    pub settings: ObjectSettings,
    /// Whether the body must be gzip-encoded before it is written.
    pub compress: bool,
    /// A same-named object already occupies the key and must be removed
    /// first. Last-write-wins; the two steps are not atomic.
    pub replace_existing: bool,
}

/// Compute the destination key, content attributes, and pre-existence flag
/// for one upload.
pub async fn build_upload_plan(
    file: &FileDescriptor,
    config: &ProviderConfig,
    storage: &dyn ObjectStorage,
) -> Result<UploadPlan, UploadError> {
    if !config.skip_check_bucket {
        let exists = storage
            .bucket_exists(&config.bucket_name)
            .await
            .map_err(|source| UploadError::Probe {
                target: config.bucket_name.clone(),
                source,
            })?;
        if !exists {
            return Err(UploadError::BucketNotFound(config.bucket_name.clone()));
        }
    }

    let key = match &config.generate_upload_file_name {
        Some(hook) => hook(&config.base_path, file),
        None => generate_upload_file_name(&config.base_path, file),
    };

    let replace_existing = storage
        .object_exists(&config.bucket_name, &key)
        .await
        .map_err(|source| UploadError::Probe {
            target: key.clone(),
            source,
        })?;

    let content_type = match &config.get_content_type {
        Some(hook) => hook(file),
        None => file.mime.clone(),
    };

    let (content_disposition, cache_control) = match &config.metadata {
        Some(hook) => {
            let metadata = hook(file);
            (metadata.content_disposition, metadata.cache_control)
        }
        None => (
            Some(format!(
                "inline; filename=\"{}\"",
                ascii_filename(&file.name)
            )),
            Some(format!("public, max-age={}", config.cache_max_age)),
        ),
    };

    let compress = config.gzip.should_compress(&content_type);

    let settings = ObjectSettings {
        content_type,
        content_disposition,
        cache_control,
        content_encoding: compress.then(|| "gzip".to_string()),
        // Object-level ACLs are rejected by uniform-access buckets; the
        // bucket policy governs visibility there.
        public_read: config.public_files && !config.uniform,
    };

    Ok(UploadPlan {
        key,
        settings,
        compress,
        replace_existing,
    })
}

/// Built-in destination-key computation: `basePath` + a folder derived from
/// the file's logical path (falling back to its first related entity, then
/// its hash) + the slugified hash + the lowercased extension.
pub fn generate_upload_file_name(base_path: &str, file: &FileDescriptor) -> String {
    let folder = match file.path.as_deref() {
        Some(path) if !path.is_empty() => format!("{path}/"),
        _ => {
            let fallback = file
                .related
                .first()
                .and_then(|related| related.entity.as_deref())
                .unwrap_or(&file.hash);
            format!("{fallback}/")
        }
    };
    format!(
        "{base_path}{folder}{}{}",
        slugify(&file.hash),
        file.ext.to_lowercase()
    )
}

/// Lowercased ASCII-safe rendition of `input`: alphanumerics kept, every
/// other run collapsed to a single interior hyphen.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut gap = false;
    for c in input.chars() {
        let folded = if c.is_ascii() {
            if c.is_ascii_alphanumeric() {
                push_separated(&mut out, &mut gap, c.to_ascii_lowercase());
            } else {
                gap = true;
            }
            continue;
        } else {
            fold_diacritic(c)
        };
        match folded {
            Some(text) => {
                for folded_char in text.chars() {
                    push_separated(&mut out, &mut gap, folded_char.to_ascii_lowercase());
                }
            }
            None => gap = true,
        }
    }
    out
}

fn push_separated(out: &mut String, gap: &mut bool, c: char) {
    if *gap && !out.is_empty() {
        out.push('-');
    }
    *gap = false;
    out.push(c);
}

/// Display name folded to ASCII for the content-disposition header:
/// diacritics stripped, unmappable characters and quotes dropped.
pub fn ascii_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii() {
            if !c.is_ascii_control() && c != '"' {
                out.push(c);
            }
        } else if let Some(folded) = fold_diacritic(c) {
            out.push_str(folded);
        }
    }
    out
}

fn fold_diacritic(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        _ => return None,
    })
}
