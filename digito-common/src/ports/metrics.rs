//! CloudWatch metric statistics port.

use super::{AwsPortError, lock};
use crate::alarms::MetricSpec;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

pub trait MetricApi: Send + Sync {
    /// Number of `SampleCount` datapoints of `metric` in `[start, end)`.
    fn sample_count(
        &self,
        metric: &MetricSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, AwsPortError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub metric: MetricSpec,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Datapoint counts keyed by `(namespace, metric name)`; unknown metrics have none.
#[derive(Debug, Clone, Default)]
pub struct MockMetricApi {
    datapoints: Arc<Mutex<BTreeMap<(String, String), usize>>>,
    queries: Arc<Mutex<Vec<MetricQuery>>>,
}

impl MockMetricApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_datapoints(&self, namespace: &str, metric_name: &str, count: usize) {
        lock(&self.datapoints).insert((namespace.to_string(), metric_name.to_string()), count);
    }

    pub fn queries(&self) -> Vec<MetricQuery> {
        lock(&self.queries).clone()
    }
}

impl MetricApi for MockMetricApi {
    async fn sample_count(
        &self,
        metric: &MetricSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AwsPortError> {
        lock(&self.queries).push(MetricQuery {
            metric: metric.clone(),
            start,
            end,
        });
        Ok(lock(&self.datapoints)
            .get(&(metric.namespace.clone(), metric.metric_name.clone()))
            .copied()
            .unwrap_or(0))
    }
}
