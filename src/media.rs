use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;

/// External media-upload collaborator. Uploads complete before the request
/// returns; a failure fails the whole request.
#[async_trait]
pub trait MediaClient: Send + Sync {
    /// Stores the object under `key` and returns its public URL.
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct MediaStore {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl MediaStore {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl MediaClient for MediaStore {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("put_object {}", key))?;
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }
}
