//! Error Catalog for Digito
//!
//! This module defines the error catalog with unique error codes,
//! categorized by subsystem. Each error includes:
//! - A unique code (DG-E001 through DG-E699)
//! - A human-readable message template
//! - Remediation steps
//! - Documentation links where applicable
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                              |
//! |------------|-------------|------------------------------------------|
//! | E001-E099  | Config      | Configuration and environment errors     |
//! | E100-E199  | Metadata    | metadata.json loading and validation     |
//! | E200-E299  | Validation  | Automation document rule validation      |
//! | E300-E399  | Assembly    | Content assembly (snippets, builders)    |
//! | E400-E499  | Publish     | SSM document create/update               |
//! | E500-E599  | Alarm       | Alarm stack deployment and verification  |
//! | E600-E699  | Internal    | Internal/unexpected errors               |
//!
//! # Example
//!
//! ```rust
//! use digito_common::errors::catalog::ErrorCode;
//!
//! let entry = ErrorCode::MetadataInvalid.entry();
//! println!("Error {}: {}", entry.code, entry.message);
//! for step in entry.remediation {
//!     println!("  - {}", step);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering all Digito error scenarios.
///
/// Each variant maps to a unique error code in the DG-Exxx format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Environment variable has invalid value
    ConfigEnvError,
    /// AWS region is not a valid region name
    ConfigInvalidRegion,
    /// No S3 bucket configured for alarm templates
    ConfigMissingBucket,
    /// Configured path does not exist
    ConfigPathNotFound,

    // =========================================================================
    // Metadata Errors (E100-E199)
    // =========================================================================
    /// Metadata file or directory not found
    MetadataNotFound,
    /// Metadata file could not be read
    MetadataReadError,
    /// Metadata file is not valid JSON for the expected shape
    MetadataParseError,
    /// Metadata attributes failed validation
    MetadataInvalid,
    /// Globally unique metadata attribute is duplicated
    MetadataNotUnique,
    /// Requested or depended-on document has no metadata
    MetadataDependencyMissing,

    // =========================================================================
    // Validation Errors (E200-E299)
    // =========================================================================
    /// Automation document could not be parsed
    ValidationDocumentParse,
    /// Automation document violates its rule set
    ValidationRuleViolation,

    // =========================================================================
    // Assembly Errors (E300-E399)
    // =========================================================================
    /// Document content file could not be read
    AssembleContentRead,
    /// Script placeholder references an unknown snippet
    AssembleSnippetNotFound,
    /// Helper script could not be parsed
    AssembleScriptParse,
    /// Programmatic document builder is not registered
    AssembleBuilderNotRegistered,
    /// Programmatic document builder failed
    AssembleBuilderFailed,

    // =========================================================================
    // Publish Errors (E400-E499)
    // =========================================================================
    /// SSM create_document call failed
    PublishCreateFailed,
    /// SSM update_document call failed
    PublishUpdateFailed,
    /// SSM update_document_default_version call failed
    PublishDefaultVersionFailed,
    /// SSM describe/get document call failed
    PublishDescribeFailed,

    // =========================================================================
    // Alarm Errors (E500-E599)
    // =========================================================================
    /// Alarm template not found for reference id
    AlarmTemplateNotFound,
    /// Alarm template variables were not bound
    AlarmMissingVariables,
    /// Alarm template upload failed
    AlarmUploadFailed,
    /// Alarm stack reached a failed terminal state
    AlarmStackFailed,
    /// Alarm template declares no recognizable metric
    AlarmNoMetrics,
    /// CloudWatch metric query failed
    AlarmMetricQueryFailed,
    /// Alarm stack deletion failed
    AlarmTeardownFailed,
    /// Alarm id is already tracked by this manager
    AlarmDuplicateId,

    // =========================================================================
    // Internal Errors (E600-E699)
    // =========================================================================
    /// Logging subsystem failed to initialize
    InternalLoggingError,
}

impl ErrorCode {
    /// Returns the numeric error code (without prefix).
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            // Config (001-099)
            Self::ConfigEnvError => 1,
            Self::ConfigInvalidRegion => 2,
            Self::ConfigMissingBucket => 3,
            Self::ConfigPathNotFound => 4,

            // Metadata (100-199)
            Self::MetadataNotFound => 100,
            Self::MetadataReadError => 101,
            Self::MetadataParseError => 102,
            Self::MetadataInvalid => 103,
            Self::MetadataNotUnique => 104,
            Self::MetadataDependencyMissing => 105,

            // Validation (200-299)
            Self::ValidationDocumentParse => 200,
            Self::ValidationRuleViolation => 201,

            // Assembly (300-399)
            Self::AssembleContentRead => 300,
            Self::AssembleSnippetNotFound => 301,
            Self::AssembleScriptParse => 302,
            Self::AssembleBuilderNotRegistered => 303,
            Self::AssembleBuilderFailed => 304,

            // Publish (400-499)
            Self::PublishCreateFailed => 400,
            Self::PublishUpdateFailed => 401,
            Self::PublishDefaultVersionFailed => 402,
            Self::PublishDescribeFailed => 403,

            // Alarm (500-599)
            Self::AlarmTemplateNotFound => 500,
            Self::AlarmMissingVariables => 501,
            Self::AlarmUploadFailed => 502,
            Self::AlarmStackFailed => 503,
            Self::AlarmNoMetrics => 504,
            Self::AlarmMetricQueryFailed => 505,
            Self::AlarmTeardownFailed => 506,
            Self::AlarmDuplicateId => 507,

            // Internal (600-699)
            Self::InternalLoggingError => 600,
        }
    }

    /// Returns the formatted error code string (e.g., "DG-E001").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("DG-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Metadata,
            200..=299 => ErrorCategory::Validation,
            300..=399 => ErrorCategory::Assembly,
            400..=499 => ErrorCategory::Publish,
            500..=599 => ErrorCategory::Alarm,
            _ => ErrorCategory::Internal,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            doc_url: self.doc_url().map(String::from),
        }
    }

    /// Returns the error message template.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            // Config
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::ConfigInvalidRegion => "AWS region is not a valid region name",
            Self::ConfigMissingBucket => "No S3 bucket configured for alarm templates",
            Self::ConfigPathNotFound => "Configured path does not exist",

            // Metadata
            Self::MetadataNotFound => "Metadata file or documents directory not found",
            Self::MetadataReadError => "Failed to read metadata file",
            Self::MetadataParseError => "Metadata file is not valid JSON for the expected shape",
            Self::MetadataInvalid => "Metadata attributes failed validation",
            Self::MetadataNotUnique => "Globally unique metadata attribute is duplicated",
            Self::MetadataDependencyMissing => {
                "Requested or depended-on document has no metadata in the documents tree"
            }

            // Validation
            Self::ValidationDocumentParse => "Automation document could not be parsed",
            Self::ValidationRuleViolation => "Automation document violates its rule set",

            // Assembly
            Self::AssembleContentRead => "Failed to read document content file",
            Self::AssembleSnippetNotFound => "Script placeholder references an unknown snippet",
            Self::AssembleScriptParse => "Helper script could not be parsed",
            Self::AssembleBuilderNotRegistered => "Document builder is not registered",
            Self::AssembleBuilderFailed => "Document builder failed to render content",

            // Publish
            Self::PublishCreateFailed => "Failed to create SSM document",
            Self::PublishUpdateFailed => "Failed to update SSM document",
            Self::PublishDefaultVersionFailed => "Failed to advance SSM document default version",
            Self::PublishDescribeFailed => "Failed to read live SSM document state",

            // Alarm
            Self::AlarmTemplateNotFound => "Alarm template not found for reference id",
            Self::AlarmMissingVariables => "Alarm template variables are not bound",
            Self::AlarmUploadFailed => "Failed to upload rendered alarm template",
            Self::AlarmStackFailed => "Alarm stack deployment failed",
            Self::AlarmNoMetrics => "Alarm template declares no recognizable metric",
            Self::AlarmMetricQueryFailed => "CloudWatch metric query failed",
            Self::AlarmTeardownFailed => "Alarm stack deletion failed",
            Self::AlarmDuplicateId => "Alarm id is already tracked by this manager",

            // Internal
            Self::InternalLoggingError => "Logging subsystem failed to initialize",
        }
    }

    /// Returns remediation steps for this error.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigEnvError => &[
                "Check DIGITO_* environment variables for typos",
                "Run with -l debug to see which variable was rejected",
            ],
            Self::ConfigInvalidRegion => &[
                "Use a region name such as eu-west-1 in DIGITO_REGION or AWS_REGION",
                "Or pass -r/--region on the command line",
            ],
            Self::ConfigMissingBucket => &["Export DIGITO_ALARM_BUCKET with a writable bucket name"],
            Self::ConfigPathNotFound => &[
                "Run the command from the repository root",
                "Or point DIGITO_DOCUMENTS_ROOT at the documents directory",
            ],

            Self::MetadataNotFound => &[
                "Check that the documents root contains */Documents/metadata.json files",
            ],
            Self::MetadataReadError => &["Check file permissions on the metadata file"],
            Self::MetadataParseError => &[
                "Validate the metadata file with a JSON linter",
                "Check that every value is a string",
            ],
            Self::MetadataInvalid => &[
                "Fix each attribute reported in the log above",
                "Make sure the tag matches the directory path",
                "Make sure documentName follows Digito-<Action><Service><SOP|Test>_<date>",
            ],
            Self::MetadataNotUnique => &[
                "Rename one of the documents listed in the message",
                "Names are compared after stripping non-alphanumeric characters",
            ],
            Self::MetadataDependencyMissing => &[
                "Check the spelling of the document name in the manifest or dependsOn",
                "Alarm documents cannot be published as SSM documents",
            ],

            Self::ValidationDocumentParse => &["Validate the document YAML/JSON syntax"],
            Self::ValidationRuleViolation => &[
                "Fix each violation listed for the document",
                "Use --warn-only <service> while migrating an existing service",
            ],

            Self::AssembleContentRead => &[
                "Check documentContentPath in metadata.json",
            ],
            Self::AssembleSnippetNotFound => &[
                "Check the <module>.<function> after SCRIPT_PLACEHOLDER::",
                "Make sure the function is defined at top level of the script",
            ],
            Self::AssembleScriptParse => &["Check the helper script for syntax errors"],
            Self::AssembleBuilderNotRegistered => &[
                "Register a DocumentBuilder for the adkPath value",
            ],
            Self::AssembleBuilderFailed => &["Run the builder in isolation to see its error"],

            Self::PublishCreateFailed
            | Self::PublishUpdateFailed
            | Self::PublishDefaultVersionFailed
            | Self::PublishDescribeFailed => &[
                "Check AWS credentials and ssm:*Document permissions",
                "Re-run the publish: it is idempotent",
            ],

            Self::AlarmTemplateNotFound => &[
                "Check the reference id format service:alarm:name:version",
                "Check alarmContentPath in the alarm metadata.json",
            ],
            Self::AlarmMissingVariables => &["Bind every ${Variable} listed in the message"],
            Self::AlarmUploadFailed => &["Check s3:PutObject permissions on the alarm bucket"],
            Self::AlarmStackFailed => &[
                "Read the stack events included in the message",
                "Delete the failed stack before re-running",
            ],
            Self::AlarmNoMetrics => &[
                "Make sure the template declares an AWS::CloudWatch::Alarm with MetricName or Metrics",
            ],
            Self::AlarmMetricQueryFailed => &["Check cloudwatch:GetMetricStatistics permissions"],
            Self::AlarmTeardownFailed => &[
                "Delete the listed stacks manually",
                "Check cloudformation:DeleteStack permissions",
            ],
            Self::AlarmDuplicateId => &[
                "Pass a different alarm id",
                "Or tear down the deployed alarms before reusing the id",
            ],

            Self::InternalLoggingError => &["Check DIGITO_LOG_LEVEL for an invalid directive"],
        }
    }

    /// Returns documentation URL for this error, if available.
    #[must_use]
    pub const fn doc_url(&self) -> Option<&'static str> {
        match self.category() {
            ErrorCategory::Metadata => {
                Some("https://github.com/aws-samples/aws-digito-artifacts-gameday#metadata")
            }
            ErrorCategory::Validation => {
                Some("https://github.com/aws-samples/aws-digito-artifacts-gameday#document-rules")
            }
            _ => None,
        }
    }

    /// Returns all error codes.
    #[must_use]
    pub const fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigEnvError,
            Self::ConfigInvalidRegion,
            Self::ConfigMissingBucket,
            Self::ConfigPathNotFound,
            Self::MetadataNotFound,
            Self::MetadataReadError,
            Self::MetadataParseError,
            Self::MetadataInvalid,
            Self::MetadataNotUnique,
            Self::MetadataDependencyMissing,
            Self::ValidationDocumentParse,
            Self::ValidationRuleViolation,
            Self::AssembleContentRead,
            Self::AssembleSnippetNotFound,
            Self::AssembleScriptParse,
            Self::AssembleBuilderNotRegistered,
            Self::AssembleBuilderFailed,
            Self::PublishCreateFailed,
            Self::PublishUpdateFailed,
            Self::PublishDefaultVersionFailed,
            Self::PublishDescribeFailed,
            Self::AlarmTemplateNotFound,
            Self::AlarmMissingVariables,
            Self::AlarmUploadFailed,
            Self::AlarmStackFailed,
            Self::AlarmNoMetrics,
            Self::AlarmMetricQueryFailed,
            Self::AlarmTeardownFailed,
            Self::AlarmDuplicateId,
            Self::InternalLoggingError,
        ]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration and environment errors (E001-E099)
    Config,
    /// metadata.json errors (E100-E199)
    Metadata,
    /// Document rule validation errors (E200-E299)
    Validation,
    /// Content assembly errors (E300-E399)
    Assembly,
    /// SSM publishing errors (E400-E499)
    Publish,
    /// Alarm deployment errors (E500-E599)
    Alarm,
    /// Internal/unexpected errors (E600-E699)
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Metadata => "Metadata",
            Self::Validation => "Validation",
            Self::Assembly => "Assembly",
            Self::Publish => "Publish",
            Self::Alarm => "Alarm",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Error code string (e.g., "DG-E001")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
    /// Documentation URL, if available
    pub doc_url: Option<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("Remediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        if let Some(url) = &self.doc_url {
            output.push_str(&format!("\nFor more information: {}\n", url));
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::all() {
            let num = code.code_number();
            assert!(
                seen.insert(num),
                "Duplicate error code number: {} for {:?}",
                num,
                code
            );
        }
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigEnvError.code_string(), "DG-E001");
        assert_eq!(ErrorCode::MetadataNotFound.code_string(), "DG-E100");
        assert_eq!(ErrorCode::ValidationDocumentParse.code_string(), "DG-E200");
        assert_eq!(ErrorCode::AssembleContentRead.code_string(), "DG-E300");
        assert_eq!(ErrorCode::PublishCreateFailed.code_string(), "DG-E400");
        assert_eq!(ErrorCode::AlarmTemplateNotFound.code_string(), "DG-E500");
        assert_eq!(ErrorCode::InternalLoggingError.code_string(), "DG-E600");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::ConfigEnvError.category(), ErrorCategory::Config);
        assert_eq!(
            ErrorCode::MetadataNotUnique.category(),
            ErrorCategory::Metadata
        );
        assert_eq!(
            ErrorCode::AssembleSnippetNotFound.category(),
            ErrorCategory::Assembly
        );
        assert_eq!(
            ErrorCode::AlarmMissingVariables.category(),
            ErrorCategory::Alarm
        );
        assert_eq!(
            ErrorCode::InternalLoggingError.category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_all_errors_have_message_and_remediation() {
        for code in ErrorCode::all() {
            assert!(!code.message().is_empty(), "Error {:?} has empty message", code);
            assert!(
                !code.remediation().is_empty(),
                "Error {:?} has no remediation steps",
                code
            );
        }
    }

    #[test]
    fn test_error_entry_serialization() {
        let entry = ErrorCode::MetadataInvalid.entry();
        let json = serde_json::to_string(&entry).expect("serialization failed");
        assert!(json.contains("DG-E103"));
        assert!(json.contains("metadata"));

        let parsed: ErrorEntry = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(parsed.code, "DG-E103");
        assert_eq!(parsed.category, ErrorCategory::Metadata);
    }

    #[test]
    fn test_format_full_lists_remediation() {
        let text = ErrorCode::AlarmMissingVariables.entry().format_full();
        assert!(text.starts_with("[DG-E501]"));
        assert!(text.contains("Remediation steps:"));
        assert!(text.contains("  1. "));
    }
}
