//! Discovery and indexing of `metadata.json` files under a documents root.

use super::{DocumentCategory, DocumentTag, METADATA_FILE_NAME, MetadataError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One discovered metadata file, parsed but not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFile {
    pub path: PathBuf,
    pub raw: Value,
}

impl MetadataFile {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let text = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = serde_json::from_str(&text).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            raw,
        })
    }

    /// String attribute lookup; non-string values read as `None`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn document_name(&self) -> Option<&str> {
        self.attribute("documentName")
    }

    pub fn tag(&self) -> Option<&str> {
        self.attribute("tag")
    }

    /// Directory containing the metadata file.
    pub fn location(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Category taken from the declared tag, falling back to the directory layout.
    pub fn category(&self, root: &Path) -> Option<DocumentCategory> {
        self.tag()
            .and_then(DocumentTag::parse)
            .or_else(|| DocumentTag::from_metadata_path(root, &self.path))
            .and_then(|tag| tag.category())
    }

    /// Alarm templates are described by `alarmName` instead of `documentName`.
    pub fn is_alarm(&self, root: &Path) -> bool {
        self.raw.get("alarmName").is_some() || self.category(root) == Some(DocumentCategory::Alarm)
    }
}

/// All metadata files below a documents root, in path order.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
    files: Vec<MetadataFile>,
}

impl MetadataStore {
    /// Walk `root` and load every `metadata.json`.
    ///
    /// Files are sorted by path so resolution and reporting are deterministic.
    pub fn discover(root: &Path) -> Result<Self, MetadataError> {
        if !root.is_dir() {
            return Err(MetadataError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name() == METADATA_FILE_NAME {
                files.push(MetadataFile::load(entry.path())?);
            }
        }

        debug!(root = %root.display(), count = files.len(), "discovered metadata files");
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn from_files(root: PathBuf, mut files: Vec<MetadataFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { root, files }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[MetadataFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// First file declaring `documentName == name`.
    pub fn find_document(&self, name: &str) -> Option<&MetadataFile> {
        self.files
            .iter()
            .find(|file| file.document_name() == Some(name))
    }

    /// Metadata files of SSM documents, alarm templates excluded.
    pub fn documents(&self) -> impl Iterator<Item = &MetadataFile> {
        self.files.iter().filter(|file| !file.is_alarm(&self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_metadata(root: &Path, relative: &str, body: &Value) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, serde_json::to_string_pretty(body).expect("json")).expect("write");
        path
    }

    #[test]
    fn test_discover_finds_sorted_metadata_files() {
        let dir = TempDir::new().expect("tempdir");
        write_metadata(
            dir.path(),
            "rds/sop/restore/2020-04-01/Documents/metadata.json",
            &serde_json::json!({"documentName": "Digito-RestoreRdsSOP_2020-04-01"}),
        );
        write_metadata(
            dir.path(),
            "ec2/alarm/cpu/2020-01-01/Documents/metadata.json",
            &serde_json::json!({"alarmName": "cpu", "tag": "ec2:alarm:cpu:2020-01-01"}),
        );
        std::fs::write(dir.path().join("README.md"), "not metadata").expect("write");

        let store = MetadataStore::discover(dir.path()).expect("discover");
        assert_eq!(store.len(), 2);
        assert!(store.files()[0].path < store.files()[1].path);
        assert!(store.find_document("Digito-RestoreRdsSOP_2020-04-01").is_some());
        assert_eq!(store.documents().count(), 1);
    }

    #[test]
    fn test_discover_reports_missing_root_and_bad_json() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            MetadataStore::discover(&dir.path().join("missing")),
            Err(MetadataError::RootNotFound { .. })
        ));

        let path = dir.path().join("x/sop/y/2020-01-01/Documents/metadata.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            MetadataStore::discover(dir.path()),
            Err(MetadataError::Parse { .. })
        ));
    }
}
