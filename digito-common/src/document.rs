//! Parsed SSM automation document.
//!
//! The document is kept as a generic YAML value and read through a few
//! accessors; nothing here mutates it.

use crate::metadata::DocumentFormat;
use serde_yaml_ng::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document root must be a mapping")]
    NotAMapping,
}

/// One declared parameter, as read from the `parameters` mapping.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredParameter<'a> {
    pub name: &'a str,
    pub definition: &'a Value,
}

impl<'a> DeclaredParameter<'a> {
    pub fn description(&self) -> Option<&'a str> {
        self.definition.get("description").and_then(Value::as_str)
    }

    pub fn param_type(&self) -> Option<&'a str> {
        self.definition.get("type").and_then(Value::as_str)
    }

    pub fn default_value(&self) -> Option<&'a Value> {
        self.definition.get("default")
    }

    pub fn has_default(&self) -> bool {
        self.default_value().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutomationDocument {
    root: Value,
}

impl AutomationDocument {
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self, DocumentParseError> {
        let root = match format {
            DocumentFormat::Yaml => serde_yaml_ng::from_str::<Value>(content)?,
            DocumentFormat::Json => {
                let json: serde_json::Value = serde_json::from_str(content)?;
                serde_yaml_ng::to_value(json)?
            }
        };
        Self::from_value(root)
    }

    pub fn from_value(root: Value) -> Result<Self, DocumentParseError> {
        if root.as_mapping().is_none() {
            return Err(DocumentParseError::NotAMapping);
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn has_element(&self, key: &str) -> bool {
        self.root.get(key).is_some()
    }

    /// Declared parameters in document order. Non-string keys are skipped.
    pub fn parameters(&self) -> Vec<DeclaredParameter<'_>> {
        self.root
            .get("parameters")
            .and_then(Value::as_mapping)
            .map(|params: &Mapping| {
                params
                    .iter()
                    .filter_map(|(name, definition)| {
                        name.as_str().map(|name| DeclaredParameter { name, definition })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parameter(&self, name: &str) -> Option<DeclaredParameter<'_>> {
        self.parameters().into_iter().find(|param| param.name == name)
    }

    /// `mainSteps[].name`, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.root
            .get("mainSteps")
            .and_then(Value::as_sequence)
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|step| step.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names listed under top-level `outputs`.
    ///
    /// Outputs are usually plain strings (`Step.Output`); mapping entries
    /// with a `Name` key are accepted as well.
    pub fn output_names(&self) -> Vec<&str> {
        self.root
            .get("outputs")
            .and_then(Value::as_sequence)
            .map(|outputs| {
                outputs
                    .iter()
                    .filter_map(|output| match output {
                        Value::String(name) => Some(name.as_str()),
                        other => other
                            .get("Name")
                            .or_else(|| other.get("name"))
                            .and_then(Value::as_str),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
description: Kill a process
schemaVersion: '0.3'
assumeRole: '{{ AutomationAssumeRole }}'
parameters:
  AutomationAssumeRole:
    type: String
    description: (Required) The role
  Delay:
    type: Integer
    description: (Optional) Delay
    default: 5
mainSteps:
  - name: RecordStartTime
    action: aws:executeScript
  - name: OutputRecoveryTime
    action: aws:executeScript
outputs:
  - OutputRecoveryTime.RecoveryTime
"#;

    #[test]
    fn test_yaml_accessors() {
        let doc = AutomationDocument::parse(YAML, DocumentFormat::Yaml).expect("parse");
        let params = doc.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "AutomationAssumeRole");
        assert_eq!(params[1].param_type(), Some("Integer"));
        assert!(params[1].has_default());
        assert_eq!(doc.step_names(), vec!["RecordStartTime", "OutputRecoveryTime"]);
        assert_eq!(doc.output_names(), vec!["OutputRecoveryTime.RecoveryTime"]);
        assert!(doc.has_element("assumeRole"));
    }

    #[test]
    fn test_json_documents_parse_to_same_shape() {
        let json = r#"{"description": "x", "mainSteps": [{"name": "A"}], "parameters": {}}"#;
        let doc = AutomationDocument::parse(json, DocumentFormat::Json).expect("parse");
        assert_eq!(doc.step_names(), vec!["A"]);
        assert!(doc.parameters().is_empty());
    }

    #[test]
    fn test_scalar_root_is_rejected() {
        assert!(matches!(
            AutomationDocument::parse("just text", DocumentFormat::Yaml),
            Err(DocumentParseError::NotAMapping)
        ));
    }
}
