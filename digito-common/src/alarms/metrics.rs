//! Metric definitions of `AWS::CloudWatch::Alarm` resources.

use super::AlarmError;
use serde::Serialize;
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const ALARM_RESOURCE_TYPE: &str = "AWS::CloudWatch::Alarm";
const DEFAULT_PERIOD_SECS: u32 = 60;

/// One metric an alarm watches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricSpec {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, String>,
    pub period: u32,
}

/// Metrics of every alarm resource, keyed by logical id.
///
/// Simple alarms carry `Namespace`/`MetricName`/`Dimensions`/`Period`;
/// metric-math and anomaly alarms carry a `Metrics` list whose `MetricStat`
/// entries are collected. A template without any metric is an error.
pub fn extract_alarm_metrics(template: &str) -> Result<BTreeMap<String, Vec<MetricSpec>>, AlarmError> {
    let root: Value = serde_yaml_ng::from_str(template).map_err(|err| AlarmError::TemplateParse {
        detail: err.to_string(),
    })?;

    let mut alarms = BTreeMap::new();
    let Some(resources) = root.get("Resources").and_then(Value::as_mapping) else {
        return Err(AlarmError::NoMetrics);
    };

    for (logical_id, resource) in resources {
        let Some(logical_id) = logical_id.as_str() else {
            continue;
        };
        if resource.get("Type").and_then(Value::as_str) != Some(ALARM_RESOURCE_TYPE) {
            continue;
        }
        let Some(properties) = resource.get("Properties") else {
            warn!(alarm = %logical_id, "alarm resource has no Properties");
            continue;
        };

        let metrics = alarm_metrics(properties);
        if metrics.is_empty() {
            warn!(alarm = %logical_id, "alarm resource has no recognizable metric");
            continue;
        }
        alarms.insert(logical_id.to_string(), metrics);
    }

    if alarms.is_empty() {
        return Err(AlarmError::NoMetrics);
    }
    Ok(alarms)
}

fn alarm_metrics(properties: &Value) -> Vec<MetricSpec> {
    if let Some(spec) = metric_from(properties, properties.get("Period")) {
        return vec![spec];
    }

    properties
        .get("Metrics")
        .and_then(Value::as_sequence)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let stat = entry.get("MetricStat")?;
                    metric_from(stat.get("Metric")?, stat.get("Period"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn metric_from(metric: &Value, period: Option<&Value>) -> Option<MetricSpec> {
    let namespace = scalar(metric.get("Namespace")?)?;
    let metric_name = scalar(metric.get("MetricName")?)?;
    let dimensions = metric
        .get("Dimensions")
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| Some((scalar(item.get("Name")?)?, scalar(item.get("Value")?)?)))
                .collect()
        })
        .unwrap_or_default();
    let period = period
        .and_then(scalar)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_PERIOD_SECS);

    Some(MetricSpec {
        namespace,
        metric_name,
        dimensions,
        period,
    })
}

/// Scalars as text; intrinsic-function tags (`!Ref x`) keep their tag.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Tagged(tagged) => scalar(&tagged.value).map(|inner| format!("{} {inner}", tagged.tag)),
        _ => None,
    }
}
