//! Digito common library.
//!
//! Metadata discovery and validation, rule checks, content assembly,
//! publishing to SSM and alarm deployment for Digito automation documents.

#![deny(unsafe_code)]

pub mod alarms;
pub mod assemble;
pub mod audit;
#[cfg(feature = "aws")]
pub mod aws;
pub mod config;
pub mod document;
pub mod errors;
pub mod logging;
pub mod metadata;
pub mod ports;
pub mod publish;
pub mod rules;
pub mod testing;

pub use alarms::{AlarmError, AlarmManager, AlarmManagerSettings, TeardownReport};
pub use audit::{AuditReport, CorpusAuditor};
pub use assemble::{AssembleError, DocumentAssembler, SnippetRegistry};
pub use config::{ConfigOverrides, DigitoConfig};
pub use document::AutomationDocument;
pub use errors::ErrorCode;
pub use logging::{LogFormat, init_logging};
pub use metadata::{DocumentCategory, DocumentMetadata, MetadataError, MetadataStore};
pub use publish::{PublishError, PublishOutcome, PublishReport, Publisher};
pub use rules::{RulesValidator, Violation, validator_for};
