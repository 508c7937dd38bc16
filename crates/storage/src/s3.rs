//! S3-backed implementation of the evidence storage ports.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use recon_core::checklist::ports::{StorageSigner, StorageUploader};
use recon_core::error::{CoreError, CoreResult};

use crate::config::StorageConfig;

/// Upper bound S3 accepts for presigned URL lifetimes (7 days).
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from [`StorageConfig`].
    ///
    /// Static credentials and a custom endpoint are applied on top of the
    /// default AWS configuration when present.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.credentials_provider(Credentials::new(
                key,
                secret,
                None,
                None,
                "recon-static",
            ));
        }

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 evidence storage configured"
        );
        Self::new(Client::from_conf(builder.build()), config.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn object_key(path: &str) -> CoreResult<&str> {
    let key = path.trim().trim_start_matches('/');
    if key.is_empty() {
        return Err(CoreError::Validation("storage path cannot be empty".into()));
    }
    Ok(key)
}

#[async_trait]
impl StorageSigner for S3Storage {
    async fn create_signed_url(&self, path: &str, expires_in: Duration) -> CoreResult<String> {
        let key = object_key(path)?;
        let presigning = PresigningConfig::expires_in(expires_in.min(MAX_PRESIGN_TTL))
            .map_err(|e| CoreError::Internal(format!("invalid presign duration: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                CoreError::Internal(format!("failed to sign {key}: {}", DisplayErrorContext(&e)))
            })?;
        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl StorageUploader for S3Storage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> CoreResult<String> {
        let key = object_key(path)?;
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key, error = %DisplayErrorContext(&e), "S3 upload failed");
                CoreError::Internal(format!("failed to upload {key}"))
            })?;

        tracing::debug!(key, size, content_type, "Evidence uploaded");
        Ok(key.to_string())
    }
}
