//! Corpus-wide validation for CI: metadata, uniqueness and document rules.
//!
//! Findings for services on the warn-only list are downgraded to warnings so
//! existing services can be migrated without failing the build.

use crate::assemble::DocumentAssembler;
use crate::document::AutomationDocument;
use crate::errors::ErrorCode;
use crate::metadata::{
    DocumentTag, GlobalMetadataValidator, MetadataFile, MetadataStore, alarm_metadata_violations,
    metadata_violations, validate_metadata,
};
use crate::rules::validator_for;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Catalog code, rendered as `DG-E###`.
    #[serde(serialize_with = "code_string")]
    pub code: ErrorCode,
    /// Service segment of the offending file, when it could be determined.
    pub service: Option<String>,
    pub file: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub files: usize,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    /// True when nothing fails the run; warnings are allowed.
    pub fn passed(&self) -> bool {
        self.errors().next().is_none()
    }
}

pub struct CorpusAuditor<'a> {
    store: &'a MetadataStore,
    assembler: &'a DocumentAssembler,
    warn_only: BTreeSet<String>,
}

impl<'a> CorpusAuditor<'a> {
    pub fn new(store: &'a MetadataStore, assembler: &'a DocumentAssembler) -> Self {
        Self {
            store,
            assembler,
            warn_only: BTreeSet::new(),
        }
    }

    pub fn warn_only<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warn_only = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn run(&self) -> AuditReport {
        let root = self.store.root();
        let mut report = AuditReport {
            files: self.store.len(),
            findings: Vec::new(),
        };
        let mut global = GlobalMetadataValidator::new();

        for file in self.store.files() {
            global.iterate_file(&file.raw, &file.path);
            let service = service_of(file, root);
            let messages = if file.is_alarm(root) {
                alarm_metadata_violations(file, root)
                    .into_iter()
                    .map(|message| (ErrorCode::MetadataInvalid, message))
                    .collect()
            } else {
                self.document_findings(file, root)
            };
            for (code, message) in messages {
                self.push(&mut report, code, service.clone(), &file.path, message);
            }
        }

        for message in global.get_metadata_violations() {
            self.push(&mut report, ErrorCode::MetadataNotUnique, None, root, message);
        }

        info!(
            files = report.files,
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "validation finished"
        );
        report
    }

    fn document_findings(&self, file: &MetadataFile, root: &Path) -> Vec<(ErrorCode, String)> {
        let violations = metadata_violations(file, root);
        if !violations.is_empty() {
            return violations
                .into_iter()
                .map(|message| (ErrorCode::MetadataInvalid, message))
                .collect();
        }
        let metadata = match validate_metadata(file, root) {
            Ok(metadata) => metadata,
            Err(err) => return vec![(err.code(), err.to_string())],
        };
        let Some(validator) = metadata
            .parsed_tag()
            .and_then(|tag| tag.category())
            .and_then(validator_for)
        else {
            return Vec::new();
        };

        let content = match self.assembler.get_final_document_content(&metadata) {
            Ok(content) => content,
            Err(err) => return vec![(err.code(), err.to_string())],
        };
        let content_path = metadata.content_path();
        match AutomationDocument::parse(&content, metadata.document_format) {
            Ok(document) => validator
                .validate_document_rules(&document, &content_path)
                .into_iter()
                .map(|violation| (ErrorCode::ValidationRuleViolation, violation.to_string()))
                .collect(),
            Err(err) => vec![(
                ErrorCode::ValidationDocumentParse,
                format!("{}: {err}", content_path.display()),
            )],
        }
    }

    fn push(
        &self,
        report: &mut AuditReport,
        code: ErrorCode,
        service: Option<String>,
        file: &Path,
        message: String,
    ) {
        let severity = match &service {
            Some(service) if self.warn_only.contains(service) => Severity::Warning,
            _ => Severity::Error,
        };
        match severity {
            Severity::Warning => warn!(code = %code.code_string(), file = %file.display(), "{message}"),
            Severity::Error => error!(code = %code.code_string(), file = %file.display(), "{message}"),
        }
        report.findings.push(Finding {
            severity,
            code,
            service,
            file: file.to_path_buf(),
            message,
        });
    }
}

fn code_string<S: Serializer>(code: &ErrorCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&code.code_string())
}

fn service_of(file: &MetadataFile, root: &Path) -> Option<String> {
    DocumentTag::from_metadata_path(root, &file.path)
        .or_else(|| file.tag().and_then(DocumentTag::parse))
        .map(|tag| tag.service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{BuilderRegistry, SnippetRegistry};
    use std::fs;
    use tempfile::TempDir;

    const SOP: &str = "\
description: Restore
schemaVersion: '0.3'
assumeRole: '{{ AutomationAssumeRole }}'
parameters:
  AutomationAssumeRole:
    type: String
    description: (Required) The role
mainSteps:
  - name: RecordStartTime
  - name: Restore
  - name: OutputRecoveryTime
outputs:
  - OutputRecoveryTime.RecoveryTime
";

    fn write_document(root: &Path, relative: &str, metadata: serde_json::Value, content: &str) {
        let dir = root.join(relative).join("Documents");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("metadata.json"), metadata.to_string()).expect("write metadata");
        fs::write(dir.join("AutomationDocument.yml"), content).expect("write content");
    }

    fn sop_metadata(name: &str, tag: &str) -> serde_json::Value {
        serde_json::json!({
            "documentName": name,
            "documentType": "Automation",
            "documentFormat": "YAML",
            "documentContentPath": "AutomationDocument.yml",
            "tag": tag,
            "risk": "SMALL",
            "failureType": "REGION",
            "minorVersion": "001"
        })
    }

    fn assembler() -> DocumentAssembler {
        DocumentAssembler::new(SnippetRegistry::new(), BuilderRegistry::new())
    }

    #[test]
    fn test_clean_corpus_passes() {
        let tmp = TempDir::new().expect("tempdir");
        write_document(
            tmp.path(),
            "rds/sop/rds-restore_from_backup/2020-04-01",
            sop_metadata(
                "Digito-RestoreFromBackupRdsSOP_2020-04-01",
                "rds:sop:rds-restore_from_backup:2020-04-01",
            ),
            SOP,
        );
        let store = MetadataStore::discover(tmp.path()).expect("discover");
        let assembler = assembler();
        let report = CorpusAuditor::new(&store, &assembler).run();
        assert_eq!(report.files, 1);
        assert!(report.findings.is_empty(), "{:#?}", report.findings);
        assert!(report.passed());
    }

    #[test]
    fn test_warn_only_services_do_not_fail() {
        let tmp = TempDir::new().expect("tempdir");
        write_document(
            tmp.path(),
            "rds/sop/rds-restore_from_backup/2020-04-01",
            sop_metadata(
                "Digito-RestoreFromBackupRdsSOP_2020-04-01",
                "rds:sop:rds-restore_from_backup:2020-04-01",
            ),
            "description: Broken\nparameters: {}\nmainSteps: []\n",
        );
        let store = MetadataStore::discover(tmp.path()).expect("discover");
        let assembler = assembler();

        let strict = CorpusAuditor::new(&store, &assembler).run();
        assert!(!strict.passed());

        let lenient = CorpusAuditor::new(&store, &assembler).warn_only(["rds"]).run();
        assert!(lenient.passed());
        assert!(lenient.warnings().count() > 0);
        assert!(lenient.warnings().all(|f| f.service.as_deref() == Some("rds")));
        assert!(lenient.warnings().all(|f| f.code == ErrorCode::ValidationRuleViolation));
    }

    #[test]
    fn test_duplicate_names_are_global_errors() {
        let tmp = TempDir::new().expect("tempdir");
        for date in ["2020-04-01", "2020-05-01"] {
            write_document(
                tmp.path(),
                &format!("rds/util/rds-helper/{date}"),
                sop_metadata("Digito-RdsHelper", &format!("rds:util:rds-helper:{date}")),
                SOP,
            );
        }
        let store = MetadataStore::discover(tmp.path()).expect("discover");
        let assembler = assembler();
        let report = CorpusAuditor::new(&store, &assembler).warn_only(["rds"]).run();

        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1, "{errors:#?}");
        assert!(errors[0].message.contains("cfn-documentName"));
        assert_eq!(errors[0].service, None);
        assert_eq!(errors[0].code, ErrorCode::MetadataNotUnique);
    }

    #[test]
    fn test_unparseable_document_is_reported_with_parse_code() {
        let tmp = TempDir::new().expect("tempdir");
        write_document(
            tmp.path(),
            "rds/sop/rds-restore_from_backup/2020-04-01",
            sop_metadata(
                "Digito-RestoreFromBackupRdsSOP_2020-04-01",
                "rds:sop:rds-restore_from_backup:2020-04-01",
            ),
            "- just\n- a\n- list\n",
        );
        let store = MetadataStore::discover(tmp.path()).expect("discover");
        let assembler = assembler();
        let report = CorpusAuditor::new(&store, &assembler).run();

        assert_eq!(report.findings.len(), 1, "{:#?}", report.findings);
        assert_eq!(report.findings[0].code, ErrorCode::ValidationDocumentParse);
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["findings"][0]["code"], "DG-E200");
        assert_eq!(json["findings"][0]["severity"], "error");
    }
}
