//! Cross-document uniqueness checks.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Attributes whose raw values must be unique across the corpus.
const UNIQUE_ATTRIBUTES: &[&str] = &["tag"];
/// Attributes that must stay unique once reduced to a CloudFormation name.
const UNIQUE_CFN_ATTRIBUTES: &[&str] = &["alarmName", "documentName"];

/// Reduce a value to the characters CloudFormation accepts in logical ids.
pub fn sanitize_cfn_name(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Reverse index `(attribute, value) -> files`, filled one file at a time.
///
/// Each run builds its own instance; call [`reset`](Self::reset) to reuse one.
#[derive(Debug, Default)]
pub struct GlobalMetadataValidator {
    index: BTreeMap<(String, String), BTreeSet<PathBuf>>,
}

impl GlobalMetadataValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterate_file(&mut self, metadata: &Value, path: &Path) {
        for attribute in UNIQUE_ATTRIBUTES {
            if let Some(value) = metadata.get(*attribute).and_then(Value::as_str) {
                self.record((*attribute).to_string(), value.to_string(), path);
            }
        }
        for attribute in UNIQUE_CFN_ATTRIBUTES {
            if let Some(value) = metadata.get(*attribute).and_then(Value::as_str) {
                self.record(format!("cfn-{attribute}"), sanitize_cfn_name(value), path);
            }
        }
    }

    /// One message per `(attribute, value)` claimed by more than one file.
    pub fn get_metadata_violations(&self) -> Vec<String> {
        self.index
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|((attribute, value), paths)| {
                let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!(
                    "Attribute '{attribute}' with value '{value}' must be unique but is used by: {}",
                    files.join(", ")
                )
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.index.clear();
    }

    fn record(&mut self, attribute: String, value: String, path: &Path) {
        self.index
            .entry((attribute, value))
            .or_default()
            .insert(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_duplicate_tags_name_both_files() {
        let mut validator = GlobalMetadataValidator::new();
        let tag = serde_json::json!({"tag": "compute:test:foo:2020-01-01"});
        validator.iterate_file(&tag, Path::new("a/metadata.json"));
        validator.iterate_file(&tag, Path::new("b/metadata.json"));

        let violations = validator.get_metadata_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("a/metadata.json"));
        assert!(violations[0].contains("b/metadata.json"));

        validator.reset();
        assert!(validator.get_metadata_violations().is_empty());
    }

    #[test]
    fn test_names_collide_after_sanitization() {
        let mut validator = GlobalMetadataValidator::new();
        validator.iterate_file(
            &serde_json::json!({"documentName": "Digito-Foo_2020", "tag": "a:sop:x:1"}),
            Path::new("one/metadata.json"),
        );
        validator.iterate_file(
            &serde_json::json!({"documentName": "Digito-Foo-2020", "tag": "a:sop:y:1"}),
            Path::new("two/metadata.json"),
        );
        let violations = validator.get_metadata_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("cfn-documentName"));
        assert!(violations[0].contains("DigitoFoo2020"));
    }

    #[test]
    fn test_same_file_twice_is_not_a_collision() {
        let mut validator = GlobalMetadataValidator::new();
        let raw = serde_json::json!({"alarmName": "cpu-high"});
        validator.iterate_file(&raw, Path::new("x/metadata.json"));
        validator.iterate_file(&raw, Path::new("x/metadata.json"));
        assert!(validator.get_metadata_violations().is_empty());
    }

    proptest! {
        #[test]
        fn test_sanitized_names_are_alphanumeric(value in "\\PC{0,64}") {
            let sanitized = sanitize_cfn_name(&value);
            prop_assert!(sanitized.chars().all(|c| c.is_ascii_alphanumeric()));
            prop_assert_eq!(sanitize_cfn_name(&sanitized), sanitized.clone());
        }
    }
}
