//! SSM document API port.

use super::{AwsPortError, lock};
use crate::metadata::{DocumentFormat, DocumentType};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Version selector for the newest stored version.
pub const LATEST_VERSION: &str = "$LATEST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDocumentRequest {
    pub name: String,
    pub content: String,
    pub document_type: DocumentType,
    pub document_format: DocumentFormat,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDocumentRequest {
    pub name: String,
    pub content: String,
    pub document_format: DocumentFormat,
}

pub trait SsmDocumentApi: Send + Sync {
    /// `Ok(false)` when the service reports the document as unknown.
    fn describe_document(&self, name: &str) -> impl Future<Output = Result<bool, AwsPortError>> + Send;

    fn get_document_content(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<String, AwsPortError>> + Send;

    fn create_document(
        &self,
        request: &CreateDocumentRequest,
    ) -> impl Future<Output = Result<(), AwsPortError>> + Send;

    /// Store a new version and return its version number.
    fn update_document(
        &self,
        request: &UpdateDocumentRequest,
    ) -> impl Future<Output = Result<String, AwsPortError>> + Send;

    fn update_default_version(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<(), AwsPortError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsmCall {
    Describe(String),
    GetContent { name: String, version: String },
    Create(CreateDocumentRequest),
    Update(UpdateDocumentRequest),
    UpdateDefaultVersion { name: String, version: String },
}

#[derive(Debug, Clone, Default)]
struct StoredDocument {
    versions: Vec<String>,
    default_version: usize,
    tags: Vec<(String, String)>,
}

/// In-memory SSM document store.
///
/// Versions are numbered from 1. `fail_next` scripts a service error for the
/// next call of the named operation.
#[derive(Debug, Clone, Default)]
pub struct MockSsmDocumentApi {
    documents: Arc<Mutex<BTreeMap<String, StoredDocument>>>,
    failures: Arc<Mutex<BTreeMap<&'static str, String>>>,
    recorded_calls: Arc<Mutex<Vec<SsmCall>>>,
}

impl MockSsmDocumentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document with one stored version.
    pub fn with_document(self, name: &str, content: &str) -> Self {
        lock(&self.documents).insert(
            name.to_string(),
            StoredDocument {
                versions: vec![content.to_string()],
                default_version: 1,
                tags: Vec::new(),
            },
        );
        self
    }

    /// Script a failure for the next call to `operation` (e.g. `"UpdateDocument"`).
    pub fn fail_next(&self, operation: &'static str, message: &str) {
        lock(&self.failures).insert(operation, message.to_string());
    }

    pub fn calls(&self) -> Vec<SsmCall> {
        lock(&self.recorded_calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.recorded_calls).clear();
    }

    pub fn count_calls(&self, predicate: impl Fn(&SsmCall) -> bool) -> usize {
        lock(&self.recorded_calls).iter().filter(|call| predicate(call)).count()
    }

    pub fn default_version(&self, name: &str) -> Option<String> {
        lock(&self.documents)
            .get(name)
            .map(|doc| doc.default_version.to_string())
    }

    pub fn latest_content(&self, name: &str) -> Option<String> {
        lock(&self.documents)
            .get(name)
            .and_then(|doc| doc.versions.last().cloned())
    }

    pub fn tags(&self, name: &str) -> Vec<(String, String)> {
        lock(&self.documents)
            .get(name)
            .map(|doc| doc.tags.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: SsmCall) {
        lock(&self.recorded_calls).push(call);
    }

    /// A scripted describe failure is a transport error: a service error on
    /// describe means "does not exist" and is answered with `Ok(false)`.
    fn scripted_failure(&self, operation: &'static str, resource: &str) -> Result<(), AwsPortError> {
        match lock(&self.failures).remove(operation) {
            Some(message) if operation == "DescribeDocument" => {
                Err(AwsPortError::transport(operation, resource, message))
            }
            Some(message) => Err(AwsPortError::service(operation, resource, message)),
            None => Ok(()),
        }
    }
}

impl SsmDocumentApi for MockSsmDocumentApi {
    async fn describe_document(&self, name: &str) -> Result<bool, AwsPortError> {
        self.record(SsmCall::Describe(name.to_string()));
        self.scripted_failure("DescribeDocument", name)?;
        Ok(lock(&self.documents).contains_key(name))
    }

    async fn get_document_content(&self, name: &str, version: &str) -> Result<String, AwsPortError> {
        self.record(SsmCall::GetContent {
            name: name.to_string(),
            version: version.to_string(),
        });
        self.scripted_failure("GetDocument", name)?;
        let documents = lock(&self.documents);
        let document = documents
            .get(name)
            .ok_or_else(|| AwsPortError::service("GetDocument", name, "InvalidDocument"))?;
        let content = if version == LATEST_VERSION {
            document.versions.last()
        } else {
            version
                .parse::<usize>()
                .ok()
                .and_then(|number| document.versions.get(number.wrapping_sub(1)))
        };
        content
            .cloned()
            .ok_or_else(|| AwsPortError::service("GetDocument", name, "InvalidDocumentVersion"))
    }

    async fn create_document(&self, request: &CreateDocumentRequest) -> Result<(), AwsPortError> {
        self.record(SsmCall::Create(request.clone()));
        self.scripted_failure("CreateDocument", &request.name)?;
        let mut documents = lock(&self.documents);
        if documents.contains_key(&request.name) {
            return Err(AwsPortError::service(
                "CreateDocument",
                &request.name,
                "DocumentAlreadyExists",
            ));
        }
        documents.insert(
            request.name.clone(),
            StoredDocument {
                versions: vec![request.content.clone()],
                default_version: 1,
                tags: request.tags.clone(),
            },
        );
        Ok(())
    }

    async fn update_document(&self, request: &UpdateDocumentRequest) -> Result<String, AwsPortError> {
        self.record(SsmCall::Update(request.clone()));
        self.scripted_failure("UpdateDocument", &request.name)?;
        let mut documents = lock(&self.documents);
        let document = documents
            .get_mut(&request.name)
            .ok_or_else(|| AwsPortError::service("UpdateDocument", &request.name, "InvalidDocument"))?;
        if document.versions.last() == Some(&request.content) {
            return Err(AwsPortError::service(
                "UpdateDocument",
                &request.name,
                "DuplicateDocumentContent",
            ));
        }
        document.versions.push(request.content.clone());
        Ok(document.versions.len().to_string())
    }

    async fn update_default_version(&self, name: &str, version: &str) -> Result<(), AwsPortError> {
        self.record(SsmCall::UpdateDefaultVersion {
            name: name.to_string(),
            version: version.to_string(),
        });
        self.scripted_failure("UpdateDocumentDefaultVersion", name)?;
        let mut documents = lock(&self.documents);
        let document = documents.get_mut(name).ok_or_else(|| {
            AwsPortError::service("UpdateDocumentDefaultVersion", name, "InvalidDocument")
        })?;
        match version.parse::<usize>() {
            Ok(number) if number >= 1 && number <= document.versions.len() => {
                document.default_version = number;
                Ok(())
            }
            _ => Err(AwsPortError::service(
                "UpdateDocumentDefaultVersion",
                name,
                "InvalidDocumentVersion",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_tracks_versions() {
        let api = MockSsmDocumentApi::new().with_document("Doc", "v1");
        assert!(api.describe_document("Doc").await.expect("describe"));
        assert!(!api.describe_document("Other").await.expect("describe"));

        let version = api
            .update_document(&UpdateDocumentRequest {
                name: "Doc".to_string(),
                content: "v2".to_string(),
                document_format: DocumentFormat::Yaml,
            })
            .await
            .expect("update");
        assert_eq!(version, "2");
        assert_eq!(api.get_document_content("Doc", LATEST_VERSION).await.expect("get"), "v2");
        assert_eq!(api.get_document_content("Doc", "1").await.expect("get"), "v1");
        assert_eq!(api.default_version("Doc").as_deref(), Some("1"));

        api.update_default_version("Doc", "2").await.expect("default");
        assert_eq!(api.default_version("Doc").as_deref(), Some("2"));
        assert_eq!(api.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_scripted_failures_fire_once() {
        let api = MockSsmDocumentApi::new();
        api.fail_next("DescribeDocument", "dispatch failure");
        assert!(matches!(
            api.describe_document("Doc").await,
            Err(AwsPortError::Transport { operation: "DescribeDocument", .. })
        ));
        assert!(!api.describe_document("Doc").await.expect("second call succeeds"));

        api.fail_next("UpdateDocument", "AccessDenied");
        let err = api
            .update_document(&UpdateDocumentRequest {
                name: "Doc".to_string(),
                content: "v1".to_string(),
                document_format: DocumentFormat::Yaml,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AwsPortError::Service { operation: "UpdateDocument", .. }));
    }
}
