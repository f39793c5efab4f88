//! Rule checks over a parsed automation document.
//!
//! Violations are returned as data. The only early exit is a missing
//! top-level element, since every later check reads below those keys.

use super::{NamePattern, Rule, sop_rule, test_rule};
use crate::document::{AutomationDocument, DeclaredParameter};
use crate::metadata::DocumentCategory;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

const REQUIRED_PREFIX: &str = "(Required)";
const OPTIONAL_PREFIX: &str = "(Optional)";
const PARAMETER_REFERENCE: &str = "ssm:{{";

const IS_ROLLBACK: &str = "IsRollback";
const PREVIOUS_EXECUTION_ID: &str = "PreviousExecutionId";
const ROLLBACK_STEPS: &[&str] = &["CheckIsRollback", "SelectExecutionMode"];

/// One rule failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Parameter, step, output or element the failure is about.
    pub identifier: String,
    pub file: PathBuf,
    pub message: String,
}

impl Violation {
    fn new(identifier: &str, file: &Path, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.to_string(),
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.file.display(), self.identifier, self.message)
    }
}

/// PascalCase: leading uppercase letter, mixed case, no underscores.
pub fn is_pascal_case(name: &str) -> bool {
    name.starts_with(|c: char| c.is_uppercase())
        && !name.contains('_')
        && name != name.to_lowercase()
        && name != name.to_uppercase()
}

pub trait RulesValidator: Send + Sync {
    fn rule(&self) -> &Rule;

    /// Category-specific checks appended after the base checks.
    fn custom_violations(&self, _document: &AutomationDocument, _file: &Path) -> Vec<Violation> {
        Vec::new()
    }

    fn validate_document_rules(&self, document: &AutomationDocument, file: &Path) -> Vec<Violation> {
        let rule = self.rule();

        let missing = check_document_elements(rule, document, file);
        if !missing.is_empty() {
            return missing;
        }

        let mut violations = Vec::new();
        let params = document.parameters();
        let mismatched = check_parameter_syntax(&params, file, &mut violations);
        check_required_parameters(rule, &params, &mismatched, file, &mut violations);
        check_required_outputs(rule, document, file, &mut violations);
        check_required_steps(rule, document, file, &mut violations);
        violations.extend(self.custom_violations(document, file));
        violations
    }
}

/// Remediation documents: the base rule set carries every requirement.
#[derive(Debug, Clone)]
pub struct SopRulesValidator {
    rule: Rule,
}

impl SopRulesValidator {
    pub fn new() -> Self {
        Self { rule: sop_rule() }
    }
}

impl Default for SopRulesValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesValidator for SopRulesValidator {
    fn rule(&self) -> &Rule {
        &self.rule
    }
}

/// Fault-injection documents, with rollback-branch checks.
#[derive(Debug, Clone)]
pub struct TestRulesValidator {
    rule: Rule,
}

impl TestRulesValidator {
    pub fn new() -> Self {
        Self { rule: test_rule() }
    }
}

impl Default for TestRulesValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesValidator for TestRulesValidator {
    fn rule(&self) -> &Rule {
        &self.rule
    }

    fn custom_violations(&self, document: &AutomationDocument, file: &Path) -> Vec<Violation> {
        let mut violations = Vec::new();
        let has_rollback = document.parameter(IS_ROLLBACK).is_some();
        let has_previous = document.parameter(PREVIOUS_EXECUTION_ID).is_some();

        if has_rollback != has_previous {
            let (present, absent) = if has_rollback {
                (IS_ROLLBACK, PREVIOUS_EXECUTION_ID)
            } else {
                (PREVIOUS_EXECUTION_ID, IS_ROLLBACK)
            };
            violations.push(Violation::new(
                absent,
                file,
                format!("Parameter '{present}' is declared but '{absent}' is missing"),
            ));
        }

        if !has_rollback {
            return violations;
        }

        let steps: BTreeSet<&str> = document.step_names().into_iter().collect();
        for step in ROLLBACK_STEPS {
            if !steps.contains(step) {
                violations.push(Violation::new(
                    step,
                    file,
                    format!("Rollback-capable document must contain step '{step}'"),
                ));
            }
        }

        for param in document.parameters() {
            if param.name == IS_ROLLBACK || param.name == PREVIOUS_EXECUTION_ID {
                continue;
            }
            let assert_step = format!("Assert{}", param.name);
            if !steps.contains(assert_step.as_str()) {
                violations.push(Violation::new(
                    &assert_step,
                    file,
                    format!(
                        "Step '{assert_step}' is required to compare parameter '{}' with the previous execution",
                        param.name
                    ),
                ));
            }
        }
        violations
    }
}

/// Validator for a document category; `None` for categories without rules.
pub fn validator_for(category: DocumentCategory) -> Option<Box<dyn RulesValidator>> {
    match category {
        DocumentCategory::Sop => Some(Box::new(SopRulesValidator::new())),
        DocumentCategory::Test => Some(Box::new(TestRulesValidator::new())),
        DocumentCategory::Alarm | DocumentCategory::Util => None,
    }
}

fn check_document_elements(rule: &Rule, document: &AutomationDocument, file: &Path) -> Vec<Violation> {
    rule.required_document_elements
        .iter()
        .filter(|element| !document.has_element(element))
        .map(|element| {
            Violation::new(element, file, format!("Required top-level element '{element}' is missing"))
        })
        .collect()
}

/// Syntax checks per declared parameter. Returns the names whose
/// `(Required)`/`(Optional)` prefix disagrees with `default` presence.
fn check_parameter_syntax(
    params: &[DeclaredParameter<'_>],
    file: &Path,
    violations: &mut Vec<Violation>,
) -> BTreeSet<String> {
    let mut mismatched = BTreeSet::new();

    for param in params {
        let name = param.name;
        if !is_pascal_case(name) {
            violations.push(Violation::new(name, file, format!("Parameter '{name}' must be PascalCase")));
        }

        match param.description() {
            Some(description) if description.starts_with(REQUIRED_PREFIX) => {
                if param.has_default() {
                    mismatched.insert(name.to_string());
                    violations.push(Violation::new(
                        name,
                        file,
                        format!("Parameter '{name}' is marked {REQUIRED_PREFIX} but declares a default"),
                    ));
                }
            }
            Some(description) if description.starts_with(OPTIONAL_PREFIX) => {
                if !param.has_default() {
                    mismatched.insert(name.to_string());
                    violations.push(Violation::new(
                        name,
                        file,
                        format!("Parameter '{name}' is marked {OPTIONAL_PREFIX} but has no default"),
                    ));
                }
            }
            Some(_) => violations.push(Violation::new(
                name,
                file,
                format!(
                    "Description of parameter '{name}' must start with {REQUIRED_PREFIX} or {OPTIONAL_PREFIX}"
                ),
            )),
            None => violations.push(Violation::new(
                name,
                file,
                format!("Parameter '{name}' has no description"),
            )),
        }

        match param.param_type() {
            None => violations.push(Violation::new(name, file, format!("Parameter '{name}' has no type"))),
            Some("SecureString") => violations.push(Violation::new(
                name,
                file,
                format!("Parameter '{name}' must not use type SecureString"),
            )),
            Some(_) => {}
        }

        if let Some(default) = param.default_value().and_then(|value| value.as_str())
            && default.contains(PARAMETER_REFERENCE)
        {
            violations.push(Violation::new(
                name,
                file,
                format!("Default of parameter '{name}' must not reference another parameter"),
            ));
        }
    }

    mismatched
}

fn check_required_parameters(
    rule: &Rule,
    params: &[DeclaredParameter<'_>],
    already_mismatched: &BTreeSet<String>,
    file: &Path,
    violations: &mut Vec<Violation>,
) {
    for expected in &rule.required_parameters {
        let matches: Vec<&DeclaredParameter<'_>> = params
            .iter()
            .filter(|param| expected.name_pattern.matches(param.name))
            .collect();

        if matches.is_empty() {
            violations.push(Violation::new(
                expected.name_pattern.as_str(),
                file,
                format!("Required parameter '{}' is not declared", expected.name_pattern),
            ));
            continue;
        }

        for param in matches {
            if param.param_type() != Some(expected.param_type.as_str()) {
                violations.push(Violation::new(
                    param.name,
                    file,
                    format!(
                        "Parameter '{}' must have type '{}', found '{}'",
                        param.name,
                        expected.param_type,
                        param.param_type().unwrap_or("none")
                    ),
                ));
            }
            if already_mismatched.contains(param.name) {
                continue;
            }
            if expected.required && param.has_default() {
                violations.push(Violation::new(
                    param.name,
                    file,
                    format!("Parameter '{}' must be required and have no default", param.name),
                ));
            } else if !expected.required && !param.has_default() {
                violations.push(Violation::new(
                    param.name,
                    file,
                    format!("Parameter '{}' must be optional and declare a default", param.name),
                ));
            }
        }
    }
}

fn check_required_outputs(
    rule: &Rule,
    document: &AutomationDocument,
    file: &Path,
    violations: &mut Vec<Violation>,
) {
    let outputs = document.output_names();
    for pattern in &rule.required_outputs {
        if !outputs.iter().any(|output| pattern.matches(output)) {
            violations.push(Violation::new(
                pattern.as_str(),
                file,
                format!("No output matches required pattern '{pattern}'"),
            ));
        }
    }
}

fn check_required_steps(
    rule: &Rule,
    document: &AutomationDocument,
    file: &Path,
    violations: &mut Vec<Violation>,
) {
    let steps = document.step_names();
    for group in &rule.required_step_groups {
        let satisfied = group
            .iter()
            .any(|pattern| steps.iter().any(|step| pattern.matches(step)));
        if !satisfied {
            let alternatives = group
                .iter()
                .map(NamePattern::as_str)
                .collect::<Vec<_>>()
                .join(" | ");
            violations.push(Violation::new(
                &alternatives,
                file,
                format!("Document must contain one of the steps: {alternatives}"),
            ));
        }
    }
}
