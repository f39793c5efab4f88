//! Async ports onto the AWS services the toolchain talks to.
//!
//! Each port has an in-memory mock that records calls and lets tests
//! script results. SDK-backed implementations live in [`crate::aws`].

pub mod metrics;
pub mod ssm;
pub mod stack;
pub mod storage;

pub use metrics::{MetricApi, MetricQuery, MockMetricApi};
pub use ssm::{
    CreateDocumentRequest, MockSsmDocumentApi, SsmCall, SsmDocumentApi, UpdateDocumentRequest,
};
pub use stack::{MockStackApi, StackApi, StackCall, StackEventRecord};
pub use storage::{MockObjectStore, ObjectStore};

use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsPortError {
    /// The service rejected the call.
    #[error("{operation} failed for '{resource}': {message}")]
    Service {
        operation: &'static str,
        resource: String,
        message: String,
    },

    /// The request never got a service answer (dispatch, timeout, connection).
    #[error("{operation} for '{resource}' did not reach the service: {message}")]
    Transport {
        operation: &'static str,
        resource: String,
        message: String,
    },

    /// The call succeeded but the response lacked a field we rely on.
    #[error("{operation} returned no {field} for '{resource}'")]
    MissingField {
        operation: &'static str,
        resource: String,
        field: &'static str,
    },

    /// A request could not be built.
    #[error("invalid {operation} request for '{resource}': {detail}")]
    InvalidRequest {
        operation: &'static str,
        resource: String,
        detail: String,
    },
}

impl AwsPortError {
    pub fn service(operation: &'static str, resource: &str, message: impl ToString) -> Self {
        Self::Service {
            operation,
            resource: resource.to_string(),
            message: message.to_string(),
        }
    }

    pub fn transport(operation: &'static str, resource: &str, message: impl ToString) -> Self {
        Self::Transport {
            operation,
            resource: resource.to_string(),
            message: message.to_string(),
        }
    }
}

/// Mock state is plain data; a poisoned lock still holds usable state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
