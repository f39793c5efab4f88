//! Per-file metadata validation.
//!
//! Every check runs; the resulting violation list is either empty (and the
//! file is converted into a typed record) or logged and raised as a single
//! [`MetadataError::Invalid`].

use super::{
    AlarmMetadata, DocumentCategory, DocumentFormat, DocumentMetadata, DocumentTag, DocumentType,
    FailureType, MetadataError, MetadataFile, Risk,
};
use serde_json::Value;
use std::path::Path;
use tracing::error;

const DOCUMENT_NAME_PREFIX: &str = "Digito-";

const REQUIRED_DOCUMENT_ATTRIBUTES: &[&str] = &[
    "documentName",
    "documentType",
    "documentFormat",
    "documentContentPath",
    "tag",
    "risk",
    "failureType",
    "minorVersion",
];

const REQUIRED_ALARM_ATTRIBUTES: &[&str] = &["alarmName", "alarmContentPath", "tag"];

const MAX_LENGTHS: &[(&str, usize)] = &[
    ("documentName", 128),
    ("tag", 256),
    ("displayName", 128),
    ("description", 1024),
];

/// Collect every metadata violation of a document descriptor.
pub fn metadata_violations(file: &MetadataFile, root: &Path) -> Vec<String> {
    let mut violations = Vec::new();
    let path = file.path.display();

    if !file.raw.is_object() {
        violations.push(format!("Metadata in {path} is not a JSON object"));
        return violations;
    }

    check_required(file, REQUIRED_DOCUMENT_ATTRIBUTES, &mut violations);

    check_enum(file, "documentType", &DocumentType::ALL, &mut violations);
    check_enum(file, "documentFormat", &DocumentFormat::ALL, &mut violations);
    check_enum(file, "risk", &Risk::ALL, &mut violations);

    if let Some(failure_type) = file.attribute("failureType") {
        for item in failure_type.split(',').map(str::trim) {
            if !FailureType::ALL.contains(&item) {
                violations.push(format!(
                    "Invalid failureType value '{item}' in {path}, expected a comma-separated subset of {}",
                    FailureType::ALL.join("|")
                ));
            }
        }
    }

    check_max_lengths(file, &mut violations);

    if let Some(minor) = file.attribute("minorVersion")
        && !minor.chars().all(|c| c.is_ascii_digit())
    {
        violations.push(format!(
            "minorVersion '{minor}' in {path} must contain digits only"
        ));
    }

    for key in ["dependsOn", "adkPath", "displayName", "description", "assumeRoleCfnPath"] {
        if let Some(value) = file.raw.get(key)
            && !value.is_string()
        {
            violations.push(format!("Attribute '{key}' in {path} must be a string"));
        }
    }

    if let Some(value) = file.raw.get("supportsRollback")
        && !value.is_boolean()
    {
        violations.push(format!("Attribute 'supportsRollback' in {path} must be a boolean"));
    }

    check_recommended_alarms(file, &mut violations);

    let path_tag = check_tag_matches_path(file, root, &mut violations);
    if let (Some(tag), Some(name)) = (path_tag, file.document_name()) {
        check_document_name(name, &tag, file, &mut violations);
    }

    violations
}

/// Validate a document descriptor and convert it into [`DocumentMetadata`].
pub fn validate_metadata(file: &MetadataFile, root: &Path) -> Result<DocumentMetadata, MetadataError> {
    let violations = metadata_violations(file, root);
    raise_if_invalid(file, violations)?;

    let mut metadata: DocumentMetadata =
        serde_json::from_value(file.raw.clone()).map_err(|source| MetadataError::Parse {
            path: file.path.clone(),
            source,
        })?;
    metadata.location = file.location().to_path_buf();
    Ok(metadata)
}

/// Collect every metadata violation of an alarm template descriptor.
pub fn alarm_metadata_violations(file: &MetadataFile, root: &Path) -> Vec<String> {
    let mut violations = Vec::new();
    check_required(file, REQUIRED_ALARM_ATTRIBUTES, &mut violations);
    check_max_lengths(file, &mut violations);
    if let Some(tag) = check_tag_matches_path(file, root, &mut violations)
        && tag.category() != Some(DocumentCategory::Alarm)
    {
        violations.push(format!(
            "Alarm metadata {} is not stored under an 'alarm' category directory",
            file.path.display()
        ));
    }
    violations
}

/// Validate an alarm template descriptor and convert it into [`AlarmMetadata`].
pub fn validate_alarm_metadata(file: &MetadataFile, root: &Path) -> Result<AlarmMetadata, MetadataError> {
    raise_if_invalid(file, alarm_metadata_violations(file, root))?;

    let mut metadata: AlarmMetadata =
        serde_json::from_value(file.raw.clone()).map_err(|source| MetadataError::Parse {
            path: file.path.clone(),
            source,
        })?;
    metadata.location = file.location().to_path_buf();
    Ok(metadata)
}

fn raise_if_invalid(file: &MetadataFile, violations: Vec<String>) -> Result<(), MetadataError> {
    if violations.is_empty() {
        return Ok(());
    }
    for violation in &violations {
        error!(metadata = %file.path.display(), "{violation}");
    }
    Err(MetadataError::Invalid {
        path: file.path.clone(),
        count: violations.len(),
        violations,
    })
}

fn check_required(file: &MetadataFile, keys: &[&str], violations: &mut Vec<String>) {
    for key in keys {
        match file.raw.get(*key) {
            Some(Value::String(value)) if !value.trim().is_empty() => {}
            _ => violations.push(format!(
                "Missing or empty required attribute '{key}' in {}",
                file.path.display()
            )),
        }
    }
}

fn check_enum(file: &MetadataFile, key: &str, allowed: &[&str], violations: &mut Vec<String>) {
    if let Some(value) = file.attribute(key)
        && !value.is_empty()
        && !allowed.contains(&value)
    {
        violations.push(format!(
            "Invalid {key} value '{value}' in {}, expected one of {}",
            file.path.display(),
            allowed.join("|")
        ));
    }
}

fn check_max_lengths(file: &MetadataFile, violations: &mut Vec<String>) {
    for (key, max) in MAX_LENGTHS {
        if let Some(value) = file.attribute(key) {
            let length = value.chars().count();
            if length > *max {
                violations.push(format!(
                    "Attribute '{key}' in {} is {length} characters long, maximum is {max}",
                    file.path.display()
                ));
            }
        }
    }
}

fn check_recommended_alarms(file: &MetadataFile, violations: &mut Vec<String>) {
    let Some(alarms) = file.raw.get("recommendedAlarms") else {
        return;
    };
    let Some(alarms) = alarms.as_object() else {
        violations.push(format!(
            "Attribute 'recommendedAlarms' in {} must be an object",
            file.path.display()
        ));
        return;
    };
    for (name, reference) in alarms {
        let well_formed = reference
            .as_str()
            .and_then(DocumentTag::parse)
            .is_some_and(|tag| tag.category() == Some(DocumentCategory::Alarm));
        if !well_formed {
            violations.push(format!(
                "Recommended alarm '{name}' in {} must reference 'service:alarm:name:version', got {reference}",
                file.path.display()
            ));
        }
    }
}

/// Compare the declared tag with the directory layout. Returns the tag derived
/// from the path when the layout is recognised.
fn check_tag_matches_path(
    file: &MetadataFile,
    root: &Path,
    violations: &mut Vec<String>,
) -> Option<DocumentTag> {
    let Some(expected) = DocumentTag::from_metadata_path(root, &file.path) else {
        violations.push(format!(
            "Metadata {} is not located at <service>/<category>/<name>/<date>/Documents/metadata.json",
            file.path.display()
        ));
        return None;
    };
    if let Some(tag) = file.tag()
        && tag != expected.to_string()
    {
        violations.push(format!(
            "Tag '{tag}' in {} does not match its path, expected '{expected}'",
            file.path.display()
        ));
    }
    Some(expected)
}

fn check_document_name(name: &str, tag: &DocumentTag, file: &MetadataFile, violations: &mut Vec<String>) {
    let Some(suffix) = tag.category().and_then(|category| category.name_suffix()) else {
        return;
    };
    if let Err(reason) = check_name_pattern(name, suffix, &tag.date, tag.service_alias()) {
        violations.push(format!(
            "Document name '{name}' in {} {reason}",
            file.path.display()
        ));
    }
}

/// Check `Digito-<Action>...<suffix>_<date>` and that the body mentions the
/// service alias.
pub(crate) fn check_name_pattern(
    name: &str,
    suffix: &str,
    date: &str,
    alias: &str,
) -> Result<(), String> {
    let Some(rest) = name.strip_prefix(DOCUMENT_NAME_PREFIX) else {
        return Err(format!("must start with '{DOCUMENT_NAME_PREFIX}'"));
    };
    let Some((head, name_date)) = rest.rsplit_once('_') else {
        return Err("must end with '_<date>'".to_string());
    };
    if name_date != date {
        return Err(format!(
            "has date version '{name_date}' but its directory date is '{date}'"
        ));
    }
    let Some(body) = head.strip_suffix(suffix) else {
        return Err(format!("must end with '{suffix}_<date>'"));
    };
    if !body.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err("must start its action with an uppercase letter".to_string());
    }
    if !body.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("must contain only letters and digits before the suffix".to_string());
    }
    if !body.to_lowercase().contains(&alias.to_lowercase()) {
        return Err(format!("must mention the service alias '{alias}'"));
    }
    Ok(())
}
