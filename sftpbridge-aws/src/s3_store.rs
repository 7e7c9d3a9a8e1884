//! S3 object store.
//!
//! The delivered flag lives in user metadata, so flipping it is a copy of the
//! object onto itself with the metadata directive set to REPLACE.

use crate::config::AwsConfig;
use crate::error::map_sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::MetadataDirective;
use sftpbridge_core::ports::ObjectStore;
use sftpbridge_core::{BridgeError, BridgeResult, StoredObject};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.s3_endpoint_override {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// `CopySource` value for `bucket/key`, with each key segment URL-encoded.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
    format!("{bucket}/{}", encoded.join("/"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> BridgeResult<StoredObject> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, BridgeError::Store, &format!("get {bucket}/{key}")))?;

        let metadata = resp.metadata().cloned().unwrap_or_default();
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| BridgeError::Store(format!("failed to read body of {bucket}/{key}: {e}")))?
            .into_bytes()
            .to_vec();

        debug!("downloaded {} bytes from s3://{bucket}/{key}", body.len());
        Ok(StoredObject { body, metadata })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, BridgeError::Store, &format!("put {bucket}/{key}")))?;

        debug!("uploaded {size} bytes to s3://{bucket}/{key}");
        Ok(())
    }

    async fn replace_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> BridgeResult<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .key(key)
            .copy_source(copy_source(bucket, key))
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(e, BridgeError::Store, &format!("copy {bucket}/{key} onto itself"))
            })?;

        debug!("replaced metadata on s3://{bucket}/{key}");
        Ok(())
    }
}
