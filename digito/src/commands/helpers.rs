//! Shared helper functions for Digito commands.

use anyhow::{Context, Result, bail};
use digito_common::assemble::{BuilderRegistry, DocumentAssembler, SnippetRegistry};
use digito_common::config::DigitoConfig;
use digito_common::metadata::MetadataStore;
use std::collections::BTreeMap;

/// Discover every metadata file under the configured documents root.
pub fn load_store(config: &DigitoConfig) -> Result<MetadataStore> {
    let root = &config.documents_root.value;
    MetadataStore::discover(root).with_context(|| {
        format!(
            "failed to load documents from {} ({})",
            root.display(),
            config.documents_root.describe_source()
        )
    })
}

/// Assembler over the configured scripts directory. No builders are
/// registered by the CLI.
pub fn load_assembler(config: &DigitoConfig) -> Result<DocumentAssembler> {
    let dir = &config.scripts_dir.value;
    let snippets = SnippetRegistry::from_scripts_dir(dir)
        .with_context(|| format!("failed to index script snippets in {}", dir.display()))?;
    Ok(DocumentAssembler::new(snippets, BuilderRegistry::new()))
}

/// Parse repeated `NAME=VALUE` arguments. Later bindings win.
pub fn parse_bindings(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut bindings = BTreeMap::new();
    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            bail!("invalid binding '{item}', expected NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("invalid binding '{item}', name is empty");
        }
        bindings.insert(name.to_string(), value.to_string());
    }
    Ok(bindings)
}

/// Left-pad every line with `prefix`.
pub fn indent_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bindings() {
        let parsed = parse_bindings(&[
            "Threshold=5".to_string(),
            "Expr=a=b".to_string(),
            "Threshold=7".to_string(),
        ])
        .expect("valid bindings");
        assert_eq!(parsed.get("Threshold").map(String::as_str), Some("7"));
        assert_eq!(parsed.get("Expr").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_bindings_rejects_garbage() {
        assert!(parse_bindings(&["novalue".to_string()]).is_err());
        assert!(parse_bindings(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("hello\nworld", "  "), "  hello\n  world");
        assert_eq!(indent_lines("", "  "), "");
    }
}
