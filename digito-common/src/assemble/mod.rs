//! Final document content: either a registered builder's output or the
//! content file with every script placeholder inlined.

pub mod builders;
pub mod snippets;

pub use builders::{BuildError, BuilderRegistry, DocumentBuilder, ValueBuilder};
pub use snippets::SnippetRegistry;

use crate::errors::ErrorCode;
use crate::metadata::DocumentMetadata;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Marker followed by `::<module>.<function>`.
pub const SCRIPT_PLACEHOLDER: &str = "SCRIPT_PLACEHOLDER";
const PLACEHOLDER_SEPARATOR: &str = "::";
/// Indentation applied to every inlined line after the first.
const INLINE_INDENT: &str = "        ";

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to read document content {path}: {source}")]
    ContentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse script {path}: {detail}")]
    ScriptParse { path: PathBuf, detail: String },

    #[error("snippet '{id}' referenced in {path} line {line} was not found")]
    SnippetNotFound { id: String, path: PathBuf, line: usize },

    #[error("malformed placeholder in {path} line {line}, expected SCRIPT_PLACEHOLDER::<module>.<function>")]
    MalformedPlaceholder { path: PathBuf, line: usize },

    #[error("no document builder registered for '{id}'")]
    BuilderNotRegistered { id: String },

    #[error("document builder '{id}' failed: {source}")]
    BuilderFailed {
        id: String,
        #[source]
        source: BuildError,
    },
}

impl AssembleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ContentRead { .. } | Self::ScriptRead { .. } => ErrorCode::AssembleContentRead,
            Self::SnippetNotFound { .. } | Self::MalformedPlaceholder { .. } => {
                ErrorCode::AssembleSnippetNotFound
            }
            Self::ScriptParse { .. } => ErrorCode::AssembleScriptParse,
            Self::BuilderNotRegistered { .. } => ErrorCode::AssembleBuilderNotRegistered,
            Self::BuilderFailed { .. } => ErrorCode::AssembleBuilderFailed,
        }
    }
}

/// Snippets and builders needed to turn metadata into publishable content.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    snippets: SnippetRegistry,
    builders: BuilderRegistry,
}

impl DocumentAssembler {
    pub fn new(snippets: SnippetRegistry, builders: BuilderRegistry) -> Self {
        Self { snippets, builders }
    }

    pub fn snippets(&self) -> &SnippetRegistry {
        &self.snippets
    }

    pub fn get_final_document_content(&self, metadata: &DocumentMetadata) -> Result<String, AssembleError> {
        if let Some(id) = &metadata.adk_path {
            let builder = self
                .builders
                .get(id)
                .ok_or_else(|| AssembleError::BuilderNotRegistered { id: id.clone() })?;
            debug!(document = %metadata.document_name, builder = %id, "rendering document from builder");
            return builder.render_yaml().map_err(|source| AssembleError::BuilderFailed {
                id: id.clone(),
                source,
            });
        }

        let path = metadata.content_path();
        let content = std::fs::read_to_string(&path).map_err(|source| AssembleError::ContentRead {
            path: path.clone(),
            source,
        })?;
        inline_placeholders(&content, &self.snippets, &path)
    }
}

/// Replace every `SCRIPT_PLACEHOLDER::<id>` token with its snippet.
///
/// The first snippet line takes the token's place; later lines are
/// prefixed with eight spaces.
pub fn inline_placeholders(
    content: &str,
    snippets: &SnippetRegistry,
    path: &Path,
) -> Result<String, AssembleError> {
    let mut output = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let Some(marker) = line.find(SCRIPT_PLACEHOLDER) else {
            output.push(line.to_string());
            continue;
        };
        let line_number = index + 1;
        let prefix = &line[..marker];
        let Some(rest) = line[marker + SCRIPT_PLACEHOLDER.len()..].strip_prefix(PLACEHOLDER_SEPARATOR) else {
            return Err(AssembleError::MalformedPlaceholder {
                path: path.to_path_buf(),
                line: line_number,
            });
        };
        let id_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (id, suffix) = rest.split_at(id_end);
        if id.is_empty() {
            return Err(AssembleError::MalformedPlaceholder {
                path: path.to_path_buf(),
                line: line_number,
            });
        }
        let snippet = snippets.get(id).ok_or_else(|| AssembleError::SnippetNotFound {
            id: id.to_string(),
            path: path.to_path_buf(),
            line: line_number,
        })?;

        let indented = snippet
            .lines()
            .enumerate()
            .map(|(n, snippet_line)| {
                if n == 0 {
                    snippet_line.to_string()
                } else {
                    format!("{INLINE_INDENT}{snippet_line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        output.push(format!("{prefix}{indented}{suffix}"));
    }

    let mut joined = output.join("\n");
    if content.ends_with('\n') {
        joined.push('\n');
    }
    Ok(joined)
}
