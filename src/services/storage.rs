use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};

/// Opaque blob storage for generated audio, addressed by file name.
///
/// Keys are deterministic from the instruction hash, so re-uploading the
/// same content is an idempotent overwrite.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Filesystem-backed store for development and single-host deployments.
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("file://{}", path.display()))
    }
}

/// S3-compatible bucket over plain authorized PUTs.
pub struct BucketContentStore {
    client: Client,
    endpoint: String,
    access_key: String,
    bucket: String,
    public_base: String,
}

impl BucketContentStore {
    /// `public_base` overrides the host that serves uploaded objects; when
    /// absent, URLs point at the bucket's r2.dev public host.
    pub fn new(
        endpoint: String,
        access_key: String,
        bucket: String,
        public_base: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        let public_base = public_base
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}.r2.dev", bucket));
        Self {
            client,
            endpoint,
            access_key,
            bucket,
            public_base,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[async_trait]
impl ContentStore for BucketContentStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let response = self
            .client
            .put(format!("{}/{}/{}", self.endpoint, self.bucket, key))
            .bearer_auth(&self.access_key)
            .header("content-type", content_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "upload of {} failed: HTTP {}",
                key,
                response.status()
            )));
        }

        Ok(self.object_url(key))
    }
}
