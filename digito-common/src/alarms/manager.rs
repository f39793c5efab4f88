//! Deployment, verification and teardown of alarm stacks.

use super::metrics::{MetricSpec, extract_alarm_metrics};
use super::parser::AlarmDocumentParser;
use super::AlarmError;
use crate::config::DigitoConfig;
use crate::metadata::{
    DOCUMENTS_DIR_NAME, DocumentCategory, DocumentTag, METADATA_FILE_NAME, MetadataFile,
    validate_alarm_metadata,
};
use crate::ports::stack::{CREATE_COMPLETE, UPDATE_COMPLETE};
use crate::ports::{MetricApi, ObjectStore, StackApi};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const MAX_STACK_NAME_LEN: usize = 128;
const TEMPLATE_KEY_PREFIX: &str = "alarms";

#[derive(Debug, Clone)]
pub struct AlarmManagerSettings {
    /// Root holding `<service>/alarm/<name>/<version>/Documents/metadata.json`.
    pub alarms_root: PathBuf,
    pub bucket: String,
    pub teardown_parallelism: usize,
    /// Run-unique stack name component.
    pub run_id: String,
}

impl AlarmManagerSettings {
    pub fn new(alarms_root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        let run_id: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
        Self {
            alarms_root: alarms_root.into(),
            bucket: bucket.into(),
            teardown_parallelism: 10,
            run_id,
        }
    }

    pub fn from_config(config: &DigitoConfig) -> Result<Self, AlarmError> {
        let bucket = config
            .alarm_bucket
            .value
            .clone()
            .ok_or(AlarmError::MissingBucket)?;
        let mut settings = Self::new(config.documents_root.value.clone(), bucket);
        settings.teardown_parallelism = config.teardown_parallelism.value as usize;
        Ok(settings)
    }
}

/// A stack this manager created and still owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedAlarm {
    pub alarm_id: String,
    pub reference_id: String,
    pub stack_name: String,
    pub template: AlarmDocumentParser,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub deleted: Vec<String>,
    /// `(stack name, error)` for every deletion that failed.
    pub failures: Vec<(String, String)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct AlarmManager<C, O, M> {
    stacks: C,
    objects: O,
    metrics: M,
    settings: AlarmManagerSettings,
    deployed: BTreeMap<String, DeployedAlarm>,
    ordinal: usize,
}

impl<C: StackApi, O: ObjectStore, M: MetricApi> AlarmManager<C, O, M> {
    pub fn new(stacks: C, objects: O, metrics: M, settings: AlarmManagerSettings) -> Self {
        Self {
            stacks,
            objects,
            metrics,
            settings,
            deployed: BTreeMap::new(),
            ordinal: 0,
        }
    }

    pub fn deployed(&self) -> impl Iterator<Item = &DeployedAlarm> {
        self.deployed.values()
    }

    pub fn get(&self, alarm_id: &str) -> Option<&DeployedAlarm> {
        self.deployed.get(alarm_id)
    }

    /// Load the template for `reference_id`, bind its variables, upload it and
    /// deploy it as a new stack. Returns the id the alarm is tracked under.
    pub async fn deploy_alarm(
        &mut self,
        reference_id: &str,
        bindings: &BTreeMap<String, String>,
        alarm_id: Option<&str>,
    ) -> Result<String, AlarmError> {
        let template = self.load_template(reference_id)?;

        let missing: Vec<String> = template
            .get_variables()
            .into_iter()
            .filter(|name| !bindings.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(AlarmError::MissingVariables {
                reference_id: reference_id.to_string(),
                names: missing,
            });
        }
        let rendered = template.replace_variables(bindings);

        // Each tracked id keeps exactly one live stack.
        let mut ordinal = self.ordinal + 1;
        let alarm_id = match alarm_id {
            Some(id) => {
                if let Some(existing) = self.deployed.get(id) {
                    return Err(AlarmError::DuplicateAlarmId {
                        alarm_id: id.to_string(),
                        stack: existing.stack_name.clone(),
                    });
                }
                id.to_string()
            }
            None => {
                while self.deployed.contains_key(&ordinal.to_string()) {
                    ordinal += 1;
                }
                ordinal.to_string()
            }
        };
        self.ordinal = ordinal;
        let stack_name = stack_name_for(reference_id, &self.settings.run_id, ordinal);
        let key = format!("{TEMPLATE_KEY_PREFIX}/{stack_name}.yml");

        let url = self
            .objects
            .put_object(&self.settings.bucket, &key, rendered.content().as_bytes().to_vec())
            .await
            .map_err(|source| AlarmError::Upload {
                stack: stack_name.clone(),
                source,
            })?;
        debug!(stack = %stack_name, %url, "uploaded alarm template");

        self.stacks
            .create_stack(&stack_name, &url)
            .await
            .map_err(|source| AlarmError::Stack {
                stack: stack_name.clone(),
                source,
            })?;
        self.check_stack_status(&stack_name).await?;

        info!(stack = %stack_name, alarm = %alarm_id, reference = %reference_id, "alarm deployed");
        self.deployed.insert(
            alarm_id.clone(),
            DeployedAlarm {
                alarm_id: alarm_id.clone(),
                reference_id: reference_id.to_string(),
                stack_name,
                template: rendered,
            },
        );
        Ok(alarm_id)
    }

    /// Delete every tracked stack, at most `teardown_parallelism` at a time.
    /// Every deletion is attempted; failures are reported, not raised.
    pub async fn destroy_deployed_alarms(&mut self) -> TeardownReport {
        let deployed = std::mem::take(&mut self.deployed);
        let stacks = &self.stacks;
        let width = self.settings.teardown_parallelism.max(1);

        let results: Vec<(String, Result<(), String>)> = stream::iter(deployed.into_values())
            .map(|alarm| async move {
                let result = stacks
                    .delete_stack(&alarm.stack_name)
                    .await
                    .map_err(|err| err.to_string());
                (alarm.stack_name, result)
            })
            .buffer_unordered(width)
            .collect()
            .await;

        let mut report = TeardownReport::default();
        for (stack, result) in results {
            match result {
                Ok(()) => report.deleted.push(stack),
                Err(message) => {
                    error!(stack = %stack, error = %message, "failed to delete alarm stack");
                    report.failures.push((stack, message));
                }
            }
        }
        report.deleted.sort();
        report.failures.sort();
        info!(
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "alarm teardown finished"
        );
        report
    }

    /// Metrics of tracked alarms with no `SampleCount` datapoints in the last
    /// `period * lookback_multiplier` seconds, keyed by alarm logical id.
    pub async fn collect_alarms_without_data(
        &self,
        lookback_multiplier: u32,
    ) -> Result<BTreeMap<String, Vec<MetricSpec>>, AlarmError> {
        let now = Utc::now();
        let mut without_data: BTreeMap<String, Vec<MetricSpec>> = BTreeMap::new();

        for alarm in self.deployed.values() {
            for (logical_id, specs) in extract_alarm_metrics(alarm.template.content())? {
                for spec in specs {
                    let window = i64::from(spec.period) * i64::from(lookback_multiplier);
                    let start = now - chrono::Duration::seconds(window);
                    let count = self
                        .metrics
                        .sample_count(&spec, start, now)
                        .await
                        .map_err(|source| AlarmError::MetricQuery {
                            metric: format!("{}/{}", spec.namespace, spec.metric_name),
                            source,
                        })?;
                    if count == 0 {
                        debug!(alarm = %logical_id, metric = %spec.metric_name, "no datapoints");
                        without_data.entry(logical_id.clone()).or_default().push(spec);
                    }
                }
            }
        }
        Ok(without_data)
    }

    fn load_template(&self, reference_id: &str) -> Result<AlarmDocumentParser, AlarmError> {
        let tag = DocumentTag::parse(reference_id)
            .filter(|tag| tag.category() == Some(DocumentCategory::Alarm))
            .ok_or_else(|| AlarmError::InvalidReference {
                reference_id: reference_id.to_string(),
            })?;

        let root = &self.settings.alarms_root;
        let metadata_path = alarm_metadata_path(root, &tag);
        if !metadata_path.is_file() {
            return Err(AlarmError::TemplateNotFound {
                reference_id: reference_id.to_string(),
                path: metadata_path,
            });
        }
        let file = MetadataFile::load(&metadata_path)?;
        let metadata = validate_alarm_metadata(&file, root)?;
        let content_path = metadata.content_path();
        let content = std::fs::read_to_string(&content_path).map_err(|source| AlarmError::TemplateRead {
            path: content_path,
            source,
        })?;
        Ok(AlarmDocumentParser::new(content))
    }

    async fn check_stack_status(&self, stack_name: &str) -> Result<(), AlarmError> {
        let status = self
            .stacks
            .describe_stack_status(stack_name)
            .await
            .map_err(|source| AlarmError::Stack {
                stack: stack_name.to_string(),
                source,
            })?
            .unwrap_or_else(|| "DOES_NOT_EXIST".to_string());

        if status == CREATE_COMPLETE || status == UPDATE_COMPLETE {
            return Ok(());
        }

        let events = match self.stacks.describe_stack_events(stack_name).await {
            Ok(events) => events
                .into_iter()
                .filter(|event| event.is_failure())
                .map(|event| {
                    format!(
                        "{} {}: {}",
                        event.logical_resource_id,
                        event.resource_status,
                        event.reason.unwrap_or_default()
                    )
                })
                .collect(),
            Err(err) => vec![format!("stack events unavailable: {err}")],
        };

        if let Err(err) = self.stacks.delete_stack(stack_name).await {
            warn!(stack = %stack_name, error = %err, "failed to clean up failed alarm stack");
        }
        Err(AlarmError::StackFailed {
            stack: stack_name.to_string(),
            status,
            events,
        })
    }
}

fn alarm_metadata_path(root: &Path, tag: &DocumentTag) -> PathBuf {
    root.join(&tag.service)
        .join(&tag.category)
        .join(&tag.name)
        .join(&tag.date)
        .join(DOCUMENTS_DIR_NAME)
        .join(METADATA_FILE_NAME)
}

/// `<slug>-<run_id>-<ordinal>`: lower-case, starts with a letter, at most 128 characters.
pub fn stack_name_for(reference_id: &str, run_id: &str, ordinal: usize) -> String {
    let mut slug = String::with_capacity(reference_id.len());
    for c in reference_id.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug = slug.trim_matches('-').to_string();
    if !slug.starts_with(|c: char| c.is_ascii_alphabetic()) {
        slug.insert_str(0, "alarm-");
    }

    let tail = format!("-{run_id}-{ordinal}");
    let keep = MAX_STACK_NAME_LEN.saturating_sub(tail.len());
    slug.truncate(keep);
    let slug = slug.trim_end_matches('-');
    format!("{slug}{tail}")
}
