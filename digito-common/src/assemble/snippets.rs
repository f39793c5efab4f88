//! Snippet registry built from helper scripts.
//!
//! Each top-level Python function becomes a snippet `<module>.<function>`
//! holding its source lines up to the next top-level definition. The lines
//! before the first definition are stored as `<module>.imports`.

use super::AssembleError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use tree_sitter::{Node, Parser};
use walkdir::WalkDir;

pub const IMPORTS_SNIPPET: &str = "imports";

const DEFINITION_KINDS: &[&str] = &["function_definition", "decorated_definition", "class_definition"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetRegistry {
    snippets: BTreeMap<String, String>,
}

struct TopLevelDefinition {
    start_row: usize,
    function_name: Option<String>,
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `*.py` under `dir`. A missing directory yields an empty registry.
    ///
    /// Module ids are the path relative to `dir` without extension, with `/`
    /// replaced by `.`.
    pub fn from_scripts_dir(dir: &Path) -> Result<Self, AssembleError> {
        let mut registry = Self::new();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "scripts directory not found, no snippets loaded");
            return Ok(registry);
        }

        let mut parser = python_parser()?;
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "py") {
                continue;
            }
            let Some(module) = module_id(dir, path) else {
                continue;
            };
            let source = std::fs::read_to_string(path).map_err(|source| AssembleError::ScriptRead {
                path: path.to_path_buf(),
                source,
            })?;
            registry.add_module_with(&mut parser, &module, &source, path)?;
        }

        debug!(dir = %dir.display(), snippets = registry.len(), "loaded script snippets");
        Ok(registry)
    }

    /// Register the snippets of one module's source text.
    pub fn add_module(&mut self, module: &str, source: &str) -> Result<(), AssembleError> {
        let mut parser = python_parser()?;
        self.add_module_with(&mut parser, module, source, Path::new(module))
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.snippets.insert(id.into(), text.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.snippets.get(id).map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.snippets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    fn add_module_with(
        &mut self,
        parser: &mut Parser,
        module: &str,
        source: &str,
        path: &Path,
    ) -> Result<(), AssembleError> {
        let tree = parser.parse(source, None).ok_or_else(|| AssembleError::ScriptParse {
            path: path.to_path_buf(),
            detail: "parser returned no tree".to_string(),
        })?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(AssembleError::ScriptParse {
                path: path.to_path_buf(),
                detail: "syntax error".to_string(),
            });
        }

        let definitions = top_level_definitions(root, source.as_bytes());
        let lines: Vec<&str> = source.lines().collect();

        let first_row = definitions.first().map_or(lines.len(), |def| def.start_row);
        self.insert(
            format!("{module}.{IMPORTS_SNIPPET}"),
            join_trimmed(&lines[..first_row.min(lines.len())]),
        );

        for (index, definition) in definitions.iter().enumerate() {
            let Some(name) = &definition.function_name else {
                continue;
            };
            let end = definitions
                .get(index + 1)
                .map_or(lines.len(), |next| next.start_row)
                .min(lines.len());
            let start = definition.start_row.min(end);
            self.insert(format!("{module}.{name}"), join_trimmed(&lines[start..end]));
        }
        Ok(())
    }
}

fn python_parser() -> Result<Parser, AssembleError> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|err| AssembleError::ScriptParse {
            path: Default::default(),
            detail: format!("failed to initialize Python parser: {err}"),
        })?;
    Ok(parser)
}

fn top_level_definitions(root: Node<'_>, source: &[u8]) -> Vec<TopLevelDefinition> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|node| DEFINITION_KINDS.contains(&node.kind()))
        .map(|node| TopLevelDefinition {
            start_row: node.start_position().row,
            function_name: function_name(node, source),
        })
        .collect()
}

/// Function name of a definition node; `None` for classes.
fn function_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let definition = match node.kind() {
        "decorated_definition" => node.child_by_field_name("definition")?,
        _ => node,
    };
    if definition.kind() != "function_definition" {
        return None;
    }
    definition
        .child_by_field_name("name")?
        .utf8_text(source)
        .ok()
        .map(str::to_string)
}

fn module_id(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("."))
}

/// Join lines, dropping trailing blank lines.
fn join_trimmed(lines: &[&str]) -> String {
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |index| index + 1);
    lines[..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCRIPT: &str = "import boto3\nfrom datetime import datetime\n\n\ndef start_time(events, context):\n    return datetime.utcnow().isoformat()\n\n\n@retry\ndef recovery_time(events, context):\n    started = events['StartTime']\n    return started\n\n\nclass Helper:\n    def method(self):\n        pass\n\n\ndef last(events, context):\n    return 1\n";

    #[test]
    fn test_functions_and_imports_are_extracted() {
        let mut registry = SnippetRegistry::new();
        registry.add_module("common_util", SCRIPT).expect("parse");

        assert_eq!(
            registry.get("common_util.imports"),
            Some("import boto3\nfrom datetime import datetime")
        );
        assert_eq!(
            registry.get("common_util.start_time"),
            Some("def start_time(events, context):\n    return datetime.utcnow().isoformat()")
        );
        assert_eq!(
            registry.get("common_util.recovery_time"),
            Some("@retry\ndef recovery_time(events, context):\n    started = events['StartTime']\n    return started")
        );
        assert_eq!(registry.get("common_util.last"), Some("def last(events, context):\n    return 1"));
        assert!(registry.get("common_util.method").is_none());
        assert!(registry.get("common_util.Helper").is_none());
    }

    #[test]
    fn test_scripts_dir_modules_use_relative_paths() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("rds")).expect("mkdir");
        std::fs::write(dir.path().join("rds/backup.py"), "def restore(events, context):\n    pass\n")
            .expect("write");
        std::fs::write(dir.path().join("notes.txt"), "def nope():\n").expect("write");

        let registry = SnippetRegistry::from_scripts_dir(dir.path()).expect("load");
        assert!(registry.get("rds.backup.restore").is_some());
        assert_eq!(registry.get("rds.backup.imports"), Some(""));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_missing_dir_is_empty_and_syntax_errors_fail() {
        let dir = TempDir::new().expect("tempdir");
        assert!(SnippetRegistry::from_scripts_dir(&dir.path().join("none")).expect("empty").is_empty());

        let mut registry = SnippetRegistry::new();
        assert!(matches!(
            registry.add_module("broken", "def broken(:\n"),
            Err(AssembleError::ScriptParse { .. })
        ));
    }
}
