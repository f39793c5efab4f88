//! Idempotent create-or-update of SSM documents.
//!
//! Per document: assemble content, look the document up, then create it,
//! update it (and advance its default version) or leave it unchanged.

pub mod resolve;

pub use resolve::{
    get_documents_list_by_manifest_file, get_documents_list_by_names, read_manifest,
    resolve_document_names,
};

use crate::assemble::{AssembleError, DocumentAssembler};
use crate::errors::ErrorCode;
use crate::metadata::{DocumentMetadata, MetadataError};
use crate::ports::ssm::LATEST_VERSION;
use crate::ports::{AwsPortError, CreateDocumentRequest, SsmDocumentApi, UpdateDocumentRequest};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

/// Tag key carrying the metadata `tag` on created documents.
pub const REFERENCE_ID_TAG: &str = "Digito-reference-id";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("failed to assemble {document}: {source}")]
    Assemble {
        document: String,
        #[source]
        source: AssembleError,
    },

    #[error("failed to look up {document}: {source}")]
    Describe {
        document: String,
        #[source]
        source: AwsPortError,
    },

    #[error("failed to create {document}: {source}")]
    Create {
        document: String,
        #[source]
        source: AwsPortError,
    },

    #[error("failed to update {document}: {source}")]
    Update {
        document: String,
        #[source]
        source: AwsPortError,
    },

    #[error("failed to set default version {version} of {document}: {source}")]
    DefaultVersion {
        document: String,
        version: String,
        #[source]
        source: AwsPortError,
    },
}

impl PublishError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Metadata(err) => err.code(),
            Self::Assemble { source, .. } => source.code(),
            Self::Describe { .. } => ErrorCode::PublishDescribeFailed,
            Self::Create { .. } => ErrorCode::PublishCreateFailed,
            Self::Update { .. } => ErrorCode::PublishUpdateFailed,
            Self::DefaultVersion { .. } => ErrorCode::PublishDefaultVersionFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Created,
    Updated { version: String },
    Unchanged,
    /// Assembled only; SSM was not contacted.
    DryRun { bytes: usize },
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated { version } => write!(f, "updated (default version {version})"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::DryRun { bytes } => write!(f, "assembled {bytes} bytes (dry run)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub outcomes: Vec<(String, PublishOutcome)>,
}

impl PublishReport {
    pub fn count(&self, predicate: impl Fn(&PublishOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| predicate(outcome)).count()
    }

    pub fn outcome(&self, document: &str) -> Option<&PublishOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == document)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Publisher<S> {
    ssm: S,
    assembler: DocumentAssembler,
    dry_run: bool,
}

impl<S: SsmDocumentApi> Publisher<S> {
    pub fn new(ssm: S, assembler: DocumentAssembler) -> Self {
        Self {
            ssm,
            assembler,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Publish documents in order, stopping at the first failure.
    pub async fn publish_document(&self, documents: &[DocumentMetadata]) -> Result<PublishReport, PublishError> {
        let mut report = PublishReport::default();
        for metadata in documents {
            let outcome = self.publish_one(metadata).await?;
            info!(document = %metadata.document_name, %outcome, "publish finished");
            report.outcomes.push((metadata.document_name.clone(), outcome));
        }
        Ok(report)
    }

    pub async fn publish_one(&self, metadata: &DocumentMetadata) -> Result<PublishOutcome, PublishError> {
        let name = metadata.document_name.as_str();
        let content = self
            .assembler
            .get_final_document_content(metadata)
            .map_err(|source| PublishError::Assemble {
                document: name.to_string(),
                source,
            })?;

        if self.dry_run {
            return Ok(PublishOutcome::DryRun { bytes: content.len() });
        }

        let exists = self.ssm.describe_document(name).await.map_err(|source| {
            error!(document = %name, error = %source, "document lookup failed");
            PublishError::Describe {
                document: name.to_string(),
                source,
            }
        })?;

        if !exists {
            return self.create(metadata, content).await;
        }

        let current = self
            .ssm
            .get_document_content(name, LATEST_VERSION)
            .await
            .map_err(|source| {
                error!(document = %name, error = %source, "failed to read published content");
                PublishError::Describe {
                    document: name.to_string(),
                    source,
                }
            })?;

        if current == content {
            info!(document = %name, "document content unchanged, skipping update");
            return Ok(PublishOutcome::Unchanged);
        }

        self.update(metadata, content).await
    }

    async fn create(&self, metadata: &DocumentMetadata, content: String) -> Result<PublishOutcome, PublishError> {
        let name = &metadata.document_name;
        let request = CreateDocumentRequest {
            name: name.clone(),
            content,
            document_type: metadata.document_type,
            document_format: metadata.document_format,
            tags: vec![(REFERENCE_ID_TAG.to_string(), metadata.tag.clone())],
        };
        self.ssm.create_document(&request).await.map_err(|source| {
            error!(document = %name, error = %source, "create_document failed");
            PublishError::Create {
                document: name.clone(),
                source,
            }
        })?;
        info!(document = %name, tag = %metadata.tag, "created document");
        Ok(PublishOutcome::Created)
    }

    async fn update(&self, metadata: &DocumentMetadata, content: String) -> Result<PublishOutcome, PublishError> {
        let name = &metadata.document_name;
        let request = UpdateDocumentRequest {
            name: name.clone(),
            content,
            document_format: metadata.document_format,
        };
        let version = self.ssm.update_document(&request).await.map_err(|source| {
            error!(document = %name, error = %source, "update_document failed");
            PublishError::Update {
                document: name.clone(),
                source,
            }
        })?;

        // The new version is stored but not yet the default until this succeeds.
        self.ssm
            .update_default_version(name, &version)
            .await
            .map_err(|source| {
                warn!(
                    document = %name,
                    %version,
                    "version stored but not made default; re-run publish to retry"
                );
                PublishError::DefaultVersion {
                    document: name.clone(),
                    version: version.clone(),
                    source,
                }
            })?;
        info!(document = %name, %version, "updated document and default version");
        Ok(PublishOutcome::Updated { version })
    }
}
