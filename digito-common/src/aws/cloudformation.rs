use crate::ports::{AwsPortError, StackApi, StackEventRecord};
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::Capability;
use std::time::Duration;
use tracing::{debug, warn};

const IN_PROGRESS_SUFFIX: &str = "_IN_PROGRESS";

#[derive(Debug, Clone)]
pub struct CloudFormationAdapter {
    client: aws_sdk_cloudformation::Client,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl CloudFormationAdapter {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(10),
            poll_max_attempts: 90,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_max_attempts = max_attempts.max(1);
        self
    }

    /// Poll until the stack leaves `*_IN_PROGRESS` or attempts run out.
    async fn wait_for_stack(&self, name: &str) -> Result<(), AwsPortError> {
        for attempt in 1..=self.poll_max_attempts {
            match self.describe_stack_status(name).await? {
                Some(status) if status.ends_with(IN_PROGRESS_SUFFIX) => {
                    debug!(stack = %name, %status, attempt, "waiting for stack");
                    tokio::time::sleep(self.poll_interval).await;
                }
                _ => return Ok(()),
            }
        }
        warn!(stack = %name, attempts = self.poll_max_attempts, "stack still in progress after polling");
        Ok(())
    }
}

impl StackApi for CloudFormationAdapter {
    async fn create_stack(&self, name: &str, template_url: &str) -> Result<(), AwsPortError> {
        self.client
            .create_stack()
            .stack_name(name)
            .template_url(template_url)
            .capabilities(Capability::CapabilityIam)
            .send()
            .await
            .map_err(|err| AwsPortError::service("CreateStack", name, DisplayErrorContext(&err)))?;
        self.wait_for_stack(name).await
    }

    async fn describe_stack_status(&self, name: &str) -> Result<Option<String>, AwsPortError> {
        match self.client.describe_stacks().stack_name(name).send().await {
            Ok(output) => Ok(output
                .stacks()
                .first()
                .and_then(|stack| stack.stack_status())
                .map(|status| status.as_str().to_string())),
            // A missing stack is reported as a validation error.
            Err(err) if err.as_service_error().is_some() => {
                debug!(stack = %name, error = %DisplayErrorContext(&err), "stack not found");
                Ok(None)
            }
            Err(err) => Err(AwsPortError::service("DescribeStacks", name, DisplayErrorContext(&err))),
        }
    }

    async fn describe_stack_events(&self, name: &str) -> Result<Vec<StackEventRecord>, AwsPortError> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .send()
            .await
            .map_err(|err| AwsPortError::service("DescribeStackEvents", name, DisplayErrorContext(&err)))?;
        Ok(output
            .stack_events()
            .iter()
            .map(|event| StackEventRecord {
                logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
                resource_status: event
                    .resource_status()
                    .map(|status| status.as_str().to_string())
                    .unwrap_or_default(),
                reason: event.resource_status_reason().map(str::to_string),
            })
            .collect())
    }

    async fn delete_stack(&self, name: &str) -> Result<(), AwsPortError> {
        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map_err(|err| AwsPortError::service("DeleteStack", name, DisplayErrorContext(&err)))?;
        Ok(())
    }
}
