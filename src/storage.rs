use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("not_found")]
    NotFound,
    #[error("reference '{0}' does not belong to this store")]
    ForeignReference(String),
    #[error("other: {0}")]
    Other(String),
}

/// Binary object store addressed by path; objects are read back by the
/// public URL returned from `upload`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `path` and returns the retrieval URL.
    async fn upload(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<String, ObjectStoreError>;
    /// Deletes the object behind a URL previously returned by `upload` (a bare path is accepted too).
    async fn delete(&self, reference: &str) -> Result<(), ObjectStoreError>;
}

/// Where an uploaded file lands: `{namespace}/{unix_millis}-{file_name}`.
pub fn asset_path(namespace: &str, file_name: &str, at: DateTime<Utc>) -> String {
    let clean: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let clean = if clean.is_empty() { "upload".to_string() } else { clean };
    format!("{}/{}-{}", namespace.trim_end_matches('/'), at.timestamp_millis(), clean)
}

pub const FEATURED_IMAGES: &str = "featured-images";

pub fn profile_images(uid: &str) -> String {
    format!("profile-images/{uid}")
}

/// Cover and avatar images must be at most this large.
pub const IMAGE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

pub const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Sniffed content type when the bytes are an accepted image.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    let mime = infer::get(bytes)?.mime_type();
    ALLOWED_MIME.iter().copied().find(|m| *m == mime)
}

// ---------------- S3 Implementation (MinIO compatible) ----------------
pub struct S3ObjectStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    public_base: String,
}

impl S3ObjectStore {
    pub async fn new(cfg: &crate::config::StorageConfig) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(cfg.region.clone()));
        loader = loader.endpoint_url(&cfg.endpoint);
        if !cfg.access_key.is_empty() && !cfg.secret_key.is_empty() {
            let creds = Credentials::new(cfg.access_key.clone(), cfg.secret_key.clone(), None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // path-style addressing; most MinIO/local endpoints have no wildcard DNS
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("initialized S3 object store client for bucket '{}'", cfg.bucket);

        if let Err(e) = client.head_bucket().bucket(&cfg.bucket).send().await {
            warn!("head_bucket failed for '{}' (will attempt create): {e:?}", cfg.bucket);
            let mut attempt = 0u32;
            let max_attempts = 5;
            loop {
                attempt += 1;
                match client.create_bucket().bucket(&cfg.bucket).send().await {
                    Ok(_) => {
                        info!("created bucket '{}' (attempt {attempt})", cfg.bucket);
                        break;
                    }
                    Err(e2) if attempt >= max_attempts => {
                        error!("create_bucket failed for '{}' after {attempt} attempts: {e2:?}", cfg.bucket);
                        return Err(anyhow::anyhow!("failed to ensure bucket '{}': {e2}", cfg.bucket));
                    }
                    Err(e2) => {
                        let backoff_ms = 200 * attempt.pow(2); // quadratic backoff
                        warn!("create_bucket attempt {attempt} failed: {e2:?} (retrying in {backoff_ms}ms)");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
                    }
                }
            }
        }

        let public_base = cfg
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", cfg.endpoint.trim_end_matches('/'), cfg.bucket));
        Ok(Self { bucket: cfg.bucket.clone(), client, public_base })
    }

    fn url_for(&self, key: &str) -> String {
        let encoded: Vec<String> = key.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect();
        format!("{}/{}", self.public_base.trim_end_matches('/'), encoded.join("/"))
    }

    fn key_for(&self, reference: &str) -> Result<String, ObjectStoreError> {
        key_from_reference(&self.public_base, reference)
    }
}

/// Recovers the object key from a URL issued under `public_base`. Anything
/// without a scheme is taken as a key already.
pub fn key_from_reference(public_base: &str, reference: &str) -> Result<String, ObjectStoreError> {
    let base = public_base.trim_end_matches('/');
    let under_base = reference
        .strip_prefix(base)
        .filter(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']));
    let raw = if let Some(rest) = under_base {
        rest.trim_start_matches('/')
    } else if reference.contains("://") {
        return Err(ObjectStoreError::ForeignReference(reference.to_string()));
    } else {
        reference.trim_start_matches('/')
    };
    let raw = raw.split(['?', '#']).next().unwrap_or_default();
    if raw.is_empty() {
        return Err(ObjectStoreError::ForeignReference(reference.to_string()));
    }
    urlencoding::decode(raw)
        .map(|k| k.into_owned())
        .map_err(|e| ObjectStoreError::Other(e.to_string()))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<String, ObjectStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type);
        if let Err(e) = put.send().await {
            error!("put_object failed key={path} bucket={} err={:?}", self.bucket, e);
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(ObjectStoreError::Other(format!("{e}{hint}")));
        }
        Ok(self.url_for(path))
    }

    async fn delete(&self, reference: &str) -> Result<(), ObjectStoreError> {
        let key = self.key_for(reference)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                warn!("delete_object failed key={key}: {e:?}");
                ObjectStoreError::Other(e.to_string())
            })?;
        Ok(())
    }
}

pub async fn build_object_store(cfg: &crate::config::StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    Ok(Arc::new(S3ObjectStore::new(cfg).await?))
}
