//! Alarm templates: variable binding, stack deployment and data checks.

pub mod manager;
pub mod metrics;
pub mod parser;

pub use manager::{AlarmManager, AlarmManagerSettings, DeployedAlarm, TeardownReport, stack_name_for};
pub use metrics::{MetricSpec, extract_alarm_metrics};
pub use parser::AlarmDocumentParser;

use crate::errors::ErrorCode;
use crate::metadata::MetadataError;
use crate::ports::AwsPortError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("'{reference_id}' is not an alarm reference id (service:alarm:name:version)")]
    InvalidReference { reference_id: String },

    #[error("no alarm template for '{reference_id}' at {path}")]
    TemplateNotFound { reference_id: String, path: PathBuf },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("failed to read alarm template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("alarm template is not valid YAML: {detail}")]
    TemplateParse { detail: String },

    #[error("missing bindings for '{reference_id}': {}", names.join(", "))]
    MissingVariables { reference_id: String, names: Vec<String> },

    #[error("alarm id '{alarm_id}' is already deployed as stack {stack}")]
    DuplicateAlarmId { alarm_id: String, stack: String },

    #[error("no alarm bucket configured (set DIGITO_ALARM_BUCKET)")]
    MissingBucket,

    #[error("failed to upload template for stack {stack}: {source}")]
    Upload {
        stack: String,
        #[source]
        source: AwsPortError,
    },

    #[error("stack operation failed for {stack}: {source}")]
    Stack {
        stack: String,
        #[source]
        source: AwsPortError,
    },

    #[error("stack {stack} ended in {status}: {}", events.join("; "))]
    StackFailed {
        stack: String,
        status: String,
        events: Vec<String>,
    },

    #[error("alarm template contains no AWS::CloudWatch::Alarm metric")]
    NoMetrics,

    #[error("metric query failed for {metric}: {source}")]
    MetricQuery {
        metric: String,
        #[source]
        source: AwsPortError,
    },
}

impl AlarmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidReference { .. } | Self::TemplateNotFound { .. } | Self::TemplateRead { .. } => {
                ErrorCode::AlarmTemplateNotFound
            }
            Self::Metadata(err) => err.code(),
            Self::TemplateParse { .. } | Self::NoMetrics => ErrorCode::AlarmNoMetrics,
            Self::MissingVariables { .. } => ErrorCode::AlarmMissingVariables,
            Self::DuplicateAlarmId { .. } => ErrorCode::AlarmDuplicateId,
            Self::MissingBucket => ErrorCode::ConfigMissingBucket,
            Self::Upload { .. } => ErrorCode::AlarmUploadFailed,
            Self::Stack { .. } | Self::StackFailed { .. } => ErrorCode::AlarmStackFailed,
            Self::MetricQuery { .. } => ErrorCode::AlarmMetricQueryFailed,
        }
    }
}
