//! Selection of the documents to publish, including `dependsOn` closures.

use crate::metadata::{DocumentMetadata, MetadataError, MetadataStore, split_names, validate_metadata};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Expand `names` with every transitive `dependsOn` entry.
///
/// Alarm templates are never part of the result. Every resulting name must
/// belong to a discovered document.
pub fn resolve_document_names(
    store: &MetadataStore,
    names: &[String],
) -> Result<BTreeSet<String>, MetadataError> {
    let mut desired: BTreeSet<String> = names.iter().cloned().collect();

    loop {
        let before = desired.len();
        for file in store.documents() {
            let Some(name) = file.document_name() else {
                continue;
            };
            if !desired.contains(name) {
                continue;
            }
            if let Some(depends_on) = file.attribute("dependsOn") {
                desired.extend(split_names(depends_on));
            }
        }
        if desired.len() == before {
            break;
        }
        debug!(added = desired.len() - before, "expanded document dependencies");
    }

    let known: BTreeSet<&str> = store.documents().filter_map(|file| file.document_name()).collect();
    let missing: Vec<String> = desired
        .iter()
        .filter(|name| !known.contains(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(MetadataError::DependencyMissing { names: missing });
    }
    Ok(desired)
}

/// Validated metadata for `names` and their dependencies, in path order.
pub fn get_documents_list_by_names(
    store: &MetadataStore,
    names: &[String],
) -> Result<Vec<DocumentMetadata>, MetadataError> {
    let desired = resolve_document_names(store, names)?;
    let mut documents = Vec::with_capacity(desired.len());
    for file in store.documents() {
        if file.document_name().is_some_and(|name| desired.contains(name)) {
            documents.push(validate_metadata(file, store.root())?);
        }
    }
    info!(
        requested = names.len(),
        resolved = documents.len(),
        "resolved documents to publish"
    );
    Ok(documents)
}

/// Read a manifest: one document name per line, blank lines and `#` comments ignored.
pub fn read_manifest(path: &Path) -> Result<Vec<String>, MetadataError> {
    let text = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn get_documents_list_by_manifest_file(
    store: &MetadataStore,
    manifest: &Path,
) -> Result<Vec<DocumentMetadata>, MetadataError> {
    let names = read_manifest(manifest)?;
    get_documents_list_by_names(store, &names)
}
