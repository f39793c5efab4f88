//! CloudFormation stack port.

use super::{AwsPortError, lock};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};

pub const CREATE_COMPLETE: &str = "CREATE_COMPLETE";
pub const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";

/// One entry of a stack's event history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEventRecord {
    pub logical_resource_id: String,
    pub resource_status: String,
    pub reason: Option<String>,
}

impl StackEventRecord {
    pub fn is_failure(&self) -> bool {
        self.resource_status.ends_with("_FAILED")
    }
}

pub trait StackApi: Send + Sync {
    /// Start creating a stack and wait until it leaves its in-progress state.
    fn create_stack(
        &self,
        name: &str,
        template_url: &str,
    ) -> impl Future<Output = Result<(), AwsPortError>> + Send;

    /// Current status, `None` when the stack does not exist.
    fn describe_stack_status(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, AwsPortError>> + Send;

    fn describe_stack_events(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<StackEventRecord>, AwsPortError>> + Send;

    fn delete_stack(&self, name: &str) -> impl Future<Output = Result<(), AwsPortError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    Create { name: String, template_url: String },
    DescribeStatus(String),
    DescribeEvents(String),
    Delete(String),
}

#[derive(Debug, Clone)]
struct ScriptedOutcome {
    status: String,
    events: Vec<StackEventRecord>,
}

/// In-memory stack service.
///
/// Stacks reach `CREATE_COMPLETE` unless an outcome was pushed with
/// [`push_outcome`](Self::push_outcome); outcomes are consumed FIFO.
#[derive(Debug, Clone, Default)]
pub struct MockStackApi {
    stacks: Arc<Mutex<BTreeMap<String, (String, Vec<StackEventRecord>)>>>,
    outcomes: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    failing_deletes: Arc<Mutex<BTreeSet<String>>>,
    recorded_calls: Arc<Mutex<Vec<StackCall>>>,
}

impl MockStackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, status: &str, events: Vec<StackEventRecord>) {
        lock(&self.outcomes).push_back(ScriptedOutcome {
            status: status.to_string(),
            events,
        });
    }

    /// Make deletion of stacks whose name starts with `prefix` fail.
    pub fn fail_delete(&self, prefix: &str) {
        lock(&self.failing_deletes).insert(prefix.to_string());
    }

    pub fn stack_names(&self) -> Vec<String> {
        lock(&self.stacks).keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StackCall> {
        lock(&self.recorded_calls).clone()
    }

    fn record(&self, call: StackCall) {
        lock(&self.recorded_calls).push(call);
    }
}

impl StackApi for MockStackApi {
    async fn create_stack(&self, name: &str, template_url: &str) -> Result<(), AwsPortError> {
        self.record(StackCall::Create {
            name: name.to_string(),
            template_url: template_url.to_string(),
        });
        let mut stacks = lock(&self.stacks);
        if stacks.contains_key(name) {
            return Err(AwsPortError::service("CreateStack", name, "AlreadyExistsException"));
        }
        let outcome = lock(&self.outcomes).pop_front().unwrap_or_else(|| ScriptedOutcome {
            status: CREATE_COMPLETE.to_string(),
            events: Vec::new(),
        });
        stacks.insert(name.to_string(), (outcome.status, outcome.events));
        Ok(())
    }

    async fn describe_stack_status(&self, name: &str) -> Result<Option<String>, AwsPortError> {
        self.record(StackCall::DescribeStatus(name.to_string()));
        Ok(lock(&self.stacks).get(name).map(|(status, _)| status.clone()))
    }

    async fn describe_stack_events(&self, name: &str) -> Result<Vec<StackEventRecord>, AwsPortError> {
        self.record(StackCall::DescribeEvents(name.to_string()));
        lock(&self.stacks)
            .get(name)
            .map(|(_, events)| events.clone())
            .ok_or_else(|| AwsPortError::service("DescribeStackEvents", name, "Stack does not exist"))
    }

    async fn delete_stack(&self, name: &str) -> Result<(), AwsPortError> {
        self.record(StackCall::Delete(name.to_string()));
        let failing = lock(&self.failing_deletes)
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()));
        if failing {
            return Err(AwsPortError::service("DeleteStack", name, "DELETE_FAILED"));
        }
        lock(&self.stacks).remove(name);
        Ok(())
    }
}
