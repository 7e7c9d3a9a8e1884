//! AWS client configuration.

use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,

    /// S3 endpoint override (MinIO/LocalStack). Enables path-style addressing.
    pub s3_endpoint_override: Option<String>,

    /// SQS endpoint override (LocalStack).
    pub sqs_endpoint_override: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            s3_endpoint_override: None,
            sqs_endpoint_override: None,
        }
    }
}

impl AwsConfig {
    /// Loads shared SDK configuration from the environment, pinned to `region`.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .load()
            .await
    }

    /// Creates a config pointing both services at a local emulator.
    pub fn local(endpoint: &str) -> Self {
        Self {
            region: "us-east-1".to_string(),
            s3_endpoint_override: Some(endpoint.to_string()),
            sqs_endpoint_override: Some(endpoint.to_string()),
        }
    }
}
