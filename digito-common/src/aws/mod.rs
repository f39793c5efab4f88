//! AWS SDK implementations of the ports in [`crate::ports`].

pub mod cloudformation;
pub mod cloudwatch;
pub mod s3;
pub mod ssm;

pub use cloudformation::CloudFormationAdapter;
pub use cloudwatch::CloudWatchAdapter;
pub use s3::S3Adapter;
pub use ssm::SsmAdapter;

use crate::config::DigitoConfig;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

/// Shared SDK configuration: region (explicit, then the default provider
/// chain) and standard retry mode with exponential backoff.
pub async fn load_sdk_config(region: Option<String>, max_attempts: u32) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .retry_config(RetryConfig::standard().with_max_attempts(max_attempts))
        .load()
        .await;
    info!(
        region = config.region().map(|r| r.as_ref()).unwrap_or("unset"),
        max_attempts,
        "AWS clients configured"
    );
    config
}

/// One adapter per port, sharing an [`SdkConfig`].
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub ssm: SsmAdapter,
    pub stacks: CloudFormationAdapter,
    pub objects: S3Adapter,
    pub metrics: CloudWatchAdapter,
}

impl AwsClients {
    pub async fn connect(region: Option<String>, max_attempts: u32) -> Self {
        let config = load_sdk_config(region, max_attempts).await;
        Self::from_sdk_config(&config)
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            ssm: SsmAdapter::new(aws_sdk_ssm::Client::new(config)),
            stacks: CloudFormationAdapter::new(aws_sdk_cloudformation::Client::new(config)),
            objects: S3Adapter::new(aws_sdk_s3::Client::new(config)),
            metrics: CloudWatchAdapter::new(aws_sdk_cloudwatch::Client::new(config)),
        }
    }

    /// Clients for the configured region, retry budget and stack polling.
    pub async fn from_config(config: &DigitoConfig) -> Self {
        let mut clients = Self::connect(config.region.value.clone(), config.aws_max_attempts.value).await;
        clients.stacks = clients
            .stacks
            .with_polling(config.stack_poll_interval(), config.stack_poll_max_attempts.value);
        clients
    }
}
