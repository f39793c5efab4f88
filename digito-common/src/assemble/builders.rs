//! Programmatic document builders, keyed by the metadata `adkPath`.

use std::collections::BTreeMap;
use std::sync::Arc;

pub type BuildError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the full YAML text of one document.
pub trait DocumentBuilder: Send + Sync {
    fn render_yaml(&self) -> Result<String, BuildError>;
}

impl<F> DocumentBuilder for F
where
    F: Fn() -> Result<String, BuildError> + Send + Sync,
{
    fn render_yaml(&self) -> Result<String, BuildError> {
        self()
    }
}

/// Builder serializing a fixed YAML value.
#[derive(Debug, Clone)]
pub struct ValueBuilder {
    document: serde_yaml_ng::Value,
}

impl ValueBuilder {
    pub fn new(document: serde_yaml_ng::Value) -> Self {
        Self { document }
    }
}

impl DocumentBuilder for ValueBuilder {
    fn render_yaml(&self) -> Result<String, BuildError> {
        Ok(serde_yaml_ng::to_string(&self.document)?)
    }
}

#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: BTreeMap<String, Arc<dyn DocumentBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, builder: impl DocumentBuilder + 'static) {
        self.builders.insert(id.into(), Arc::new(builder));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn DocumentBuilder>> {
        self.builders.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}
