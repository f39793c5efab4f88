//! `${Name}` placeholders in alarm templates.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::LazyLock;

/// Immutable wrapper over a raw alarm template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDocumentParser {
    content: String,
}

impl AlarmDocumentParser {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Distinct placeholder bodies, verbatim (whitespace included).
    pub fn get_variables(&self) -> BTreeSet<String> {
        placeholders(&self.content).map(str::to_string).collect()
    }

    /// New parser with every `${key}` replaced by its value.
    /// Placeholders without a binding stay as they are.
    pub fn replace_variables<I, K, V>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        let content = bindings
            .into_iter()
            .fold(self.content.clone(), |content, (key, value)| {
                content.replace(&format!("${{{}}}", key.as_ref()), &value.to_string())
            });
        Self { content }
    }
}

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is a valid regex"));

/// Bodies of `${...}` tokens: the text between `${` and the next `}`, never empty.
pub fn placeholders(content: &str) -> impl Iterator<Item = &str> {
    VARIABLE
        .captures_iter(content)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    const TEMPLATE: &str = "Resources:\n  Alarm:\n    Properties:\n      AlarmName: ${AlarmName}\n      Threshold: ${Threshold}\n      Dimensions:\n        - Value: ${ Instance Id }\n      Description: ${AlarmName} on ${}\n";

    #[test]
    fn test_variables_are_deduplicated_and_verbatim() {
        let parser = AlarmDocumentParser::new(TEMPLATE);
        let variables: Vec<String> = parser.get_variables().into_iter().collect();
        assert_eq!(variables, vec![" Instance Id ", "AlarmName", "Threshold"]);
    }

    #[test]
    fn test_replacement_returns_new_parser_and_keeps_unbound() {
        let parser = AlarmDocumentParser::new(TEMPLATE);
        let mut bindings = BTreeMap::new();
        bindings.insert("AlarmName", "cpu-high".to_string());
        let replaced = parser.replace_variables(&bindings);

        assert!(parser.get_variables().contains("AlarmName"));
        assert!(!replaced.get_variables().contains("AlarmName"));
        assert!(replaced.get_variables().contains("Threshold"));
        assert!(replaced.content().contains("AlarmName: cpu-high"));
        assert!(replaced.content().contains("on ${}"));
    }

    #[test]
    fn test_numeric_values_are_rendered_with_display() {
        let parser = AlarmDocumentParser::new("Threshold: ${Threshold}");
        let replaced = parser.replace_variables([("Threshold", 90)]);
        assert_eq!(replaced.content(), "Threshold: 90");
    }

    #[test]
    fn test_nested_openers_end_at_first_brace() {
        let bodies: Vec<&str> = placeholders("${a${b} ${c").collect();
        assert_eq!(bodies, vec!["a${b"]);
    }

    #[test]
    fn test_empty_placeholder_is_skipped() {
        let bodies: Vec<&str> = placeholders("${} ${}x} ${Name}").collect();
        assert_eq!(bodies, vec!["Name"]);
    }

    proptest! {
        #[test]
        fn test_bound_variable_disappears(name in "[A-Za-z][A-Za-z0-9]{0,12}", value in "[a-z0-9-]{0,12}") {
            let parser = AlarmDocumentParser::new(format!("X: ${{{name}}}\nY: ${{Other}}"));
            let replaced = parser.replace_variables([(name.as_str(), value.as_str())]);
            prop_assert!(!replaced.get_variables().contains(&name));
            if name != "Other" {
                prop_assert!(replaced.get_variables().contains("Other"));
            }
        }

        #[test]
        fn test_extracted_bodies_never_contain_closing_brace(content in "\\PC{0,80}") {
            for body in placeholders(&content) {
                prop_assert!(!body.is_empty());
                prop_assert!(!body.contains('}'), "body contains closing brace: {:?}", body);
            }
        }
    }
}
