//! Declarative rule sets for SOP and Test automation documents.

pub mod validator;

pub use validator::{
    RulesValidator, SopRulesValidator, TestRulesValidator, Violation, is_pascal_case,
    validator_for,
};

use regex::Regex;
use std::fmt;

/// Step, output or parameter name pattern, anchored at both ends and compiled
/// once. A pattern that fails to compile matches only its own text.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            regex: Regex::new(&format!("^(?:{source})$")).ok(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => self.source == candidate,
        }
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NamePattern {}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expected document parameter: a name pattern, its SSM type and whether it
/// must be supplied by the caller (no `default`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name_pattern: NamePattern,
    pub param_type: String,
    pub required: bool,
}

impl Parameter {
    pub fn new(name_pattern: &str, param_type: &str, required: bool) -> Self {
        Self {
            name_pattern: NamePattern::new(name_pattern),
            param_type: param_type.to_string(),
            required,
        }
    }
}

/// Structural contract of one document category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub required_document_elements: Vec<String>,
    pub required_parameters: Vec<Parameter>,
    /// Patterns matched against top-level `outputs`.
    pub required_outputs: Vec<NamePattern>,
    /// Each group lists alternative step-name patterns; one match satisfies it.
    pub required_step_groups: Vec<Vec<NamePattern>>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

pub(crate) fn patterns(items: &[&str]) -> Vec<NamePattern> {
    items.iter().map(|item| NamePattern::new(item)).collect()
}

/// Rule set for remediation (SOP) documents.
pub fn sop_rule() -> Rule {
    Rule {
        required_document_elements: strings(&[
            "description",
            "schemaVersion",
            "assumeRole",
            "parameters",
            "mainSteps",
            "outputs",
        ]),
        required_parameters: vec![Parameter::new("AutomationAssumeRole", "String", true)],
        required_outputs: patterns(&[".*RecoveryTime"]),
        required_step_groups: vec![patterns(&["RecordStartTime"]), patterns(&["OutputRecoveryTime"])],
    }
}

/// Rule set for fault-injection (Test) documents.
pub fn test_rule() -> Rule {
    Rule {
        required_document_elements: strings(&[
            "description",
            "schemaVersion",
            "assumeRole",
            "parameters",
            "mainSteps",
        ]),
        required_parameters: vec![Parameter::new("AutomationAssumeRole", "String", true)],
        required_outputs: Vec::new(),
        required_step_groups: Vec::new(),
    }
}
