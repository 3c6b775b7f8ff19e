use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use crate::error::BlobError;

/// Characters escaped inside a single object path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Storage for uploaded certificate files.
pub trait BlobStore {
    /// Stores `bytes` at `path`. Fails with [`BlobError::AlreadyExists`] instead of overwriting.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobError>;

    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, path: &str) -> Result<(), BlobError>;
}

/// Public URL of an object, in the `/storage/v1/object/public/<bucket>/<path>` layout.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        encoded
    )
}

/// Extract the object path from a public URL produced by [`public_url`].
///
/// Returns `None` for malformed URLs (including broken `%` escapes), URLs of
/// another bucket and URLs without an object path.
pub fn resolve_storage_path(url: &str, bucket: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let marker = format!("/object/public/{bucket}/");
    let path = parsed.path();
    let start = path.find(&marker)? + marker.len();
    let raw = &path[start..];
    if raw.is_empty() || !has_valid_escapes(raw) {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Every `%` must start a two-hex-digit escape.
fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let escape = bytes.get(index + 1..index + 3);
            if !escape.is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            index += 3;
        } else {
            index += 1;
        }
    }
    true
}

/// Lowercase, dash-separated form of `text` restricted to `[a-z0-9._-]`.
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

fn unique_prefix(now: DateTime<Utc>) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &nonce[..8])
}

fn slug_or(text: &str, fallback: &str) -> String {
    let slug = slugify(text);
    if slug.trim_matches('-').is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Object path for a freshly submitted certificate.
pub fn new_upload_path(cert_number: &str, now: DateTime<Utc>) -> String {
    format!(
        "pdf/{}-{}.pdf",
        unique_prefix(now),
        slug_or(cert_number, "no-number")
    )
}

/// Object path for a file replacing an existing certificate's PDF.
pub fn replacement_path(employee_name: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}-{}",
        slug_or(employee_name, "pegawai"),
        unique_prefix(now),
        slug_or(file_name, "sertifikat.pdf")
    )
}

/// Blob store writing into a local directory, one sub-directory per bucket.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn object_path(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        let well_formed = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !well_formed {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }
}

impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobError> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => BlobError::AlreadyExists(path.to_string()),
                _ => BlobError::Io(err),
            })?;
        file.write_all(bytes).await?;
        file.flush().await?;

        tracing::debug!(path, content_type, size = bytes.len(), "stored object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_url(&self.public_base_url, &self.bucket, path)
    }

    async fn remove(&self, path: &str) -> Result<(), BlobError> {
        let target = self.object_path(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => BlobError::NotFound(path.to_string()),
                _ => BlobError::Io(err),
            })
    }
}
