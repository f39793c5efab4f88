use crate::alarms::MetricSpec;
use crate::ports::{AwsPortError, MetricApi};
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CloudWatchAdapter {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchAdapter {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

impl MetricApi for CloudWatchAdapter {
    async fn sample_count(
        &self,
        metric: &MetricSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AwsPortError> {
        let resource = format!("{}/{}", metric.namespace, metric.metric_name);
        let mut call = self
            .client
            .get_metric_statistics()
            .namespace(&metric.namespace)
            .metric_name(&metric.metric_name)
            .start_time(AwsDateTime::from_secs(start.timestamp()))
            .end_time(AwsDateTime::from_secs(end.timestamp()))
            .period(i32::try_from(metric.period).unwrap_or(i32::MAX))
            .statistics(Statistic::SampleCount);
        for (name, value) in &metric.dimensions {
            let dimension = Dimension::builder()
                .name(name)
                .value(value)
                .build();
            call = call.dimensions(dimension);
        }

        let output = call.send().await.map_err(|err| {
            AwsPortError::service("GetMetricStatistics", &resource, DisplayErrorContext(&err))
        })?;
        Ok(output.datapoints().len())
    }
}
