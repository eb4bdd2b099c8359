use crate::keys::{check_size, generate_storage_key, stored_name, DEFAULT_KEY_PREFIX};
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload,
    Result as ObjectResult,
};

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_base_url: Option<String>,
    key_prefix: String,
    max_object_size: usize,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            public_base_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_object_size: usize::MAX,
        })
    }

    /// Serve objects from a CDN or public bucket domain instead of the API endpoint.
    pub fn with_public_base_url(mut self, base_url: Option<String>) -> Self {
        self.public_base_url = base_url;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_max_object_size(mut self, max: usize) -> Self {
        self.max_object_size = max;
        self
    }

    /// Generate public URL for S3 object
    ///
    /// Uses the public base URL when configured, then the custom endpoint
    /// (path-style), then the standard AWS virtual-hosted format.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
        scope: &str,
    ) -> StorageResult<StoredObject> {
        check_size(data.len(), self.max_object_size)?;

        let key = generate_storage_key(&self.key_prefix, scope, name)?;
        let size = data.len() as u64;
        let location = Path::from(key.clone());

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        let put = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(StoredObject {
            stored_name: stored_name(&key),
            key,
            url,
            size,
            etag: put.e_tag,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(endpoint: Option<&str>) -> S3Storage {
        S3Storage::new(
            "docs".to_string(),
            "eu-central-1".to_string(),
            endpoint.map(String::from),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn url_uses_virtual_hosted_style_by_default() {
        let s = storage(None).await;
        assert_eq!(
            s.generate_url("sessions/s1/a.pdf"),
            "https://docs.s3.eu-central-1.amazonaws.com/sessions/s1/a.pdf"
        );
    }

    #[tokio::test]
    async fn url_prefers_public_base() {
        let s = storage(Some("http://localhost:9000"))
            .await
            .with_public_base_url(Some("https://cdn.example.com/".to_string()));
        assert_eq!(
            s.generate_url("sessions/s1/a.pdf"),
            "https://cdn.example.com/sessions/s1/a.pdf"
        );
    }

    #[tokio::test]
    async fn url_uses_path_style_for_custom_endpoint() {
        let s = storage(Some("http://localhost:9000/")).await;
        assert_eq!(
            s.generate_url("k"),
            "http://localhost:9000/docs/k"
        );
    }

    #[tokio::test]
    async fn oversized_object_rejected_before_upload() {
        let s = storage(Some("http://localhost:1")).await.with_max_object_size(4);
        let err = s
            .put("a.pdf", "application/pdf", Bytes::from_static(b"12345"), "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 5, max: 4 }));
    }
}
