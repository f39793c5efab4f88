//! Document and alarm metadata (`metadata.json`) model.
//!
//! One metadata file lives next to every automation document or alarm
//! template, at `<root>/<service>/<category>/<name>/<date>/Documents/metadata.json`.
//! Files are read once per run and never written back.

pub mod global;
pub mod store;
pub mod validate;

pub use global::GlobalMetadataValidator;
pub use store::{MetadataFile, MetadataStore};
pub use validate::{
    alarm_metadata_violations, metadata_violations, validate_alarm_metadata, validate_metadata,
};

use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-document descriptor file.
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// Directory holding the descriptor and content next to each other.
pub const DOCUMENTS_DIR_NAME: &str = "Documents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Automation,
    Command,
}

impl DocumentType {
    pub const ALL: [&'static str; 2] = ["Automation", "Command"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automation => "Automation",
            Self::Command => "Command",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    #[serde(rename = "YAML")]
    Yaml,
    #[serde(rename = "JSON")]
    Json,
}

impl DocumentFormat {
    pub const ALL: [&'static str; 2] = ["YAML", "JSON"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    Small,
    Medium,
    High,
}

impl Risk {
    pub const ALL: [&'static str; 3] = ["SMALL", "MEDIUM", "HIGH"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailureType {
    Region,
    Az,
    Hardware,
    Software,
}

impl FailureType {
    pub const ALL: [&'static str; 4] = ["REGION", "AZ", "HARDWARE", "SOFTWARE"];

    fn parse(value: &str) -> Option<Self> {
        match value {
            "REGION" => Some(Self::Region),
            "AZ" => Some(Self::Az),
            "HARDWARE" => Some(Self::Hardware),
            "SOFTWARE" => Some(Self::Software),
            _ => None,
        }
    }
}

/// Deserialize the comma-separated `failureType` string into a set of values.
fn failure_types_from_csv<'de, D>(deserializer: D) -> Result<Vec<FailureType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            FailureType::parse(item)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown failureType '{item}'")))
        })
        .collect()
}

/// Second tag segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Sop,
    Test,
    Alarm,
    Util,
}

impl DocumentCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sop" => Some(Self::Sop),
            "test" => Some(Self::Test),
            "alarm" => Some(Self::Alarm),
            "util" => Some(Self::Util),
            _ => None,
        }
    }

    /// Document name suffix required for this category, if any.
    pub fn name_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Sop => Some("SOP"),
            Self::Test => Some("Test"),
            Self::Alarm | Self::Util => None,
        }
    }
}

/// Colon-delimited category path `service:category:name:date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentTag {
    pub service: String,
    pub category: String,
    pub name: String,
    pub date: String,
}

impl DocumentTag {
    /// Parse `service:category:name:date`. Returns `None` unless there are
    /// exactly four non-empty segments.
    pub fn parse(tag: &str) -> Option<Self> {
        let segments: Vec<&str> = tag.split(':').collect();
        match segments.as_slice() {
            [service, category, name, date]
                if segments.iter().all(|segment| !segment.is_empty()) =>
            {
                Some(Self {
                    service: (*service).to_string(),
                    category: (*category).to_string(),
                    name: (*name).to_string(),
                    date: (*date).to_string(),
                })
            }
            _ => None,
        }
    }

    /// Derive the tag a metadata file must carry from its location under `root`.
    ///
    /// `root/ec2/test/kill_process/2020-07-28/Documents/metadata.json`
    /// yields `ec2:test:kill_process:2020-07-28`.
    pub fn from_metadata_path(root: &Path, metadata_path: &Path) -> Option<Self> {
        let relative = metadata_path.strip_prefix(root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        match segments.as_slice() {
            [service, category, name, date, documents, file]
                if documents == DOCUMENTS_DIR_NAME && file == METADATA_FILE_NAME =>
            {
                Some(Self {
                    service: service.clone(),
                    category: category.clone(),
                    name: name.clone(),
                    date: date.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn category(&self) -> Option<DocumentCategory> {
        DocumentCategory::parse(&self.category)
    }

    /// Service alias a document name must mention: the `name` segment up to
    /// the first `-` or `_`, or the service segment when that is empty.
    pub fn service_alias(&self) -> &str {
        let alias = self
            .name
            .split(['-', '_'])
            .next()
            .unwrap_or_default();
        if alias.is_empty() || !self.name.contains(['-', '_']) {
            &self.service
        } else {
            alias
        }
    }
}

impl fmt::Display for DocumentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.service, self.category, self.name, self.date)
    }
}

/// Validated descriptor of one SSM document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub document_name: String,
    pub document_type: DocumentType,
    pub document_format: DocumentFormat,
    pub document_content_path: String,
    pub tag: String,
    pub risk: Risk,
    #[serde(deserialize_with = "failure_types_from_csv")]
    pub failure_type: Vec<FailureType>,
    pub minor_version: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assume_role_cfn_path: Option<String>,
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub adk_path: Option<String>,
    #[serde(default)]
    pub recommended_alarms: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub supports_rollback: Option<bool>,
    /// Directory holding this metadata file; content paths are relative to it.
    #[serde(skip)]
    pub location: PathBuf,
}

impl DocumentMetadata {
    /// Names listed in `dependsOn`, trimmed, empty entries dropped.
    pub fn dependencies(&self) -> Vec<String> {
        split_names(self.depends_on.as_deref().unwrap_or_default())
    }

    pub fn parsed_tag(&self) -> Option<DocumentTag> {
        DocumentTag::parse(&self.tag)
    }

    pub fn content_path(&self) -> PathBuf {
        self.location.join(&self.document_content_path)
    }
}

/// Validated descriptor of one alarm template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmMetadata {
    pub alarm_name: String,
    #[serde(default)]
    pub alarm_type: Option<String>,
    pub alarm_content_path: String,
    pub tag: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(skip)]
    pub location: PathBuf,
}

impl AlarmMetadata {
    pub fn content_path(&self) -> PathBuf {
        self.location.join(&self.alarm_content_path)
    }
}

/// Split a comma-separated list of names.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Errors raised while loading or validating metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("documents root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{count} metadata violation(s) in {path}")]
    Invalid {
        path: PathBuf,
        count: usize,
        violations: Vec<String>,
    },

    #[error("{} global metadata uniqueness violation(s)", violations.len())]
    NotUnique { violations: Vec<String> },

    #[error("no metadata found for document(s): {}", names.join(", "))]
    DependencyMissing { names: Vec<String> },
}

impl MetadataError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RootNotFound { .. } => ErrorCode::MetadataNotFound,
            Self::Read { .. } => ErrorCode::MetadataReadError,
            Self::Parse { .. } => ErrorCode::MetadataParseError,
            Self::Invalid { .. } => ErrorCode::MetadataInvalid,
            Self::NotUnique { .. } => ErrorCode::MetadataNotUnique,
            Self::DependencyMissing { .. } => ErrorCode::MetadataDependencyMissing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parse_requires_four_segments() {
        let tag = DocumentTag::parse("compute:test:ec2-kill_process:2020-07-28").expect("tag");
        assert_eq!(tag.service, "compute");
        assert_eq!(tag.category(), Some(DocumentCategory::Test));
        assert_eq!(tag.to_string(), "compute:test:ec2-kill_process:2020-07-28");

        assert!(DocumentTag::parse("compute:test:2020-07-28").is_none());
        assert!(DocumentTag::parse("compute::x:2020-07-28").is_none());
        assert!(DocumentTag::parse("a:b:c:d:e").is_none());
    }

    #[test]
    fn test_tag_from_metadata_path_reads_directory_segments() {
        let root = Path::new("/repo/documents");
        let path = root.join("rds/sop/restore_from_backup/2020-04-01/Documents/metadata.json");
        let tag = DocumentTag::from_metadata_path(root, &path).expect("tag");
        assert_eq!(tag.to_string(), "rds:sop:restore_from_backup:2020-04-01");

        let shallow = root.join("rds/sop/Documents/metadata.json");
        assert!(DocumentTag::from_metadata_path(root, &shallow).is_none());
    }

    #[test]
    fn test_service_alias_prefers_name_prefix() {
        let tag = DocumentTag::parse("compute:test:ec2-kill_process:2020-07-28").expect("tag");
        assert_eq!(tag.service_alias(), "ec2");

        let plain = DocumentTag::parse("rds:sop:restore:2020-04-01").expect("tag");
        assert_eq!(plain.service_alias(), "rds");
    }

    #[test]
    fn test_document_metadata_deserializes_failure_type_csv() {
        let raw = serde_json::json!({
            "documentName": "Digito-KillProcessOnEc2Test_2020-07-28",
            "documentType": "Automation",
            "documentFormat": "YAML",
            "documentContentPath": "AutomationDocument.yml",
            "tag": "compute:test:ec2-kill_process:2020-07-28",
            "risk": "SMALL",
            "failureType": "SOFTWARE, HARDWARE",
            "minorVersion": "001",
            "dependsOn": "Digito-A_2020-01-01, ,Digito-B_2020-01-01"
        });
        let metadata: DocumentMetadata = serde_json::from_value(raw).expect("metadata");
        assert_eq!(
            metadata.failure_type,
            vec![FailureType::Software, FailureType::Hardware]
        );
        assert_eq!(metadata.document_format, DocumentFormat::Yaml);
        assert_eq!(
            metadata.dependencies(),
            vec!["Digito-A_2020-01-01".to_string(), "Digito-B_2020-01-01".to_string()]
        );
    }
}
