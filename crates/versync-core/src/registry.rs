//! The canonical version registry — `versions.yml` at the project root.
//!
//! The registry is a flat two-level mapping of string keys to scalar version
//! strings (`go: "1.21"`, or `tools:` / `  golangci-lint: "1.64.8"`). It is
//! loaded once per invocation, immutable after load, and never written by
//! this tool — it is upstream truth for both file reconciliation and
//! installed-tool verification.
//!
//! Parsing deliberately implements only the documented subset rather than
//! full YAML: list values, nesting deeper than two levels, and anything else
//! outside the subset is rejected with a line-numbered error instead of being
//! silently mis-parsed.

use crate::error::{Result, VersyncError};
use indexmap::IndexMap;
use std::path::Path;

pub const REGISTRY_FILE: &str = "versions.yml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Scalar(String),
    Section(IndexMap<String, String>),
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    /// Load `versions.yml` from the project root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(REGISTRY_FILE);
        if !path.exists() {
            return Err(VersyncError::RegistryNotFound(path));
        }
        let data = std::fs::read_to_string(&path)?;
        Self::parse(&data)
    }

    /// Parse registry content. Recognized subset:
    /// - blank lines and `#` comments are skipped
    /// - an unindented `key:` with no value opens a section
    /// - an indented `key: value` belongs to the current section
    /// - an unindented `key: value` is a top-level entry and closes the section
    /// - matched surrounding quotes (single or double) are stripped from values
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries: IndexMap<String, Entry> = IndexMap::new();
        let mut current: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let indented = raw.starts_with(' ') || raw.starts_with('\t');

            if trimmed == "-" || trimmed.starts_with("- ") {
                return Err(VersyncError::RegistryParse {
                    line,
                    reason: "list values are not supported".to_string(),
                });
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                return Err(VersyncError::RegistryParse {
                    line,
                    reason: format!("expected 'key: value', got '{trimmed}'"),
                });
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(VersyncError::RegistryParse {
                    line,
                    reason: "empty key".to_string(),
                });
            }

            if value.is_empty() {
                if indented {
                    return Err(VersyncError::RegistryParse {
                        line,
                        reason: format!(
                            "nested section '{key}' — only two levels are supported"
                        ),
                    });
                }
                current = Some(key.to_string());
                entries.insert(key.to_string(), Entry::Section(IndexMap::new()));
                continue;
            }

            let value = unquote(value).to_string();

            if indented {
                let Some(section) = current.as_deref() else {
                    return Err(VersyncError::RegistryParse {
                        line,
                        reason: format!("indented entry '{key}' outside a section"),
                    });
                };
                if let Some(Entry::Section(map)) = entries.get_mut(section) {
                    map.insert(key.to_string(), value);
                }
            } else {
                entries.insert(key.to_string(), Entry::Scalar(value));
                current = None;
            }
        }

        Ok(Self { entries })
    }

    /// Resolve a dotted key (`"tools.golangci-lint"`) or a direct top-level
    /// key (`"go"`). Absent keys yield `None`, never an error.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key.split_once('.') {
            Some((section, sub)) => match self.entries.get(section)? {
                Entry::Section(map) => map.get(sub).map(String::as_str),
                Entry::Scalar(_) => None,
            },
            None => match self.entries.get(key)? {
                Entry::Scalar(v) => Some(v),
                Entry::Section(_) => None,
            },
        }
    }

    /// All leaves as `(dotted key, value)` pairs in declaration order.
    pub fn flat(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        for (key, entry) in &self.entries {
            match entry {
                Entry::Scalar(v) => out.push((key.clone(), v.as_str())),
                Entry::Section(map) => {
                    for (sub, v) in map {
                        out.push((format!("{key}.{sub}"), v.as_str()));
                    }
                }
            }
        }
        out
    }

    /// Top-level entries in declaration order, for grouped display.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }
}

fn unquote(value: &str) -> &str {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# Canonical version registry
languages:
  go: "1.21"

tools:
  golangci-lint: "1.64.8"
  gotestsum: '1.12.0'

build:
  task: 3.40.1

schema: 2
"#;

    #[test]
    fn parses_two_level_registry() {
        let reg = Registry::parse(SAMPLE).unwrap();
        assert_eq!(reg.get("languages.go"), Some("1.21"));
        assert_eq!(reg.get("tools.golangci-lint"), Some("1.64.8"));
        assert_eq!(reg.get("schema"), Some("2"));
    }

    #[test]
    fn strips_single_and_double_quotes() {
        let reg = Registry::parse(SAMPLE).unwrap();
        assert_eq!(reg.get("tools.gotestsum"), Some("1.12.0"));
        assert_eq!(reg.get("build.task"), Some("3.40.1"));
    }

    #[test]
    fn missing_keys_are_none_not_errors() {
        let reg = Registry::parse(SAMPLE).unwrap();
        assert_eq!(reg.get("missing.key"), None);
        assert_eq!(reg.get("tools.nope"), None);
        assert_eq!(reg.get("nope"), None);
    }

    #[test]
    fn section_key_without_subkey_is_none() {
        let reg = Registry::parse(SAMPLE).unwrap();
        assert_eq!(reg.get("tools"), None);
    }

    #[test]
    fn dotted_lookup_into_scalar_is_none() {
        let reg = Registry::parse("go: \"1.21\"\n").unwrap();
        assert_eq!(reg.get("go.sub"), None);
    }

    #[test]
    fn top_level_entry_closes_section() {
        let reg = Registry::parse("tools:\n  a: 1\nschema: 2\n").unwrap();
        assert_eq!(reg.get("tools.a"), Some("1"));
        assert_eq!(reg.get("schema"), Some("2"));
        // schema must not have landed inside tools
        assert_eq!(reg.get("tools.schema"), None);
    }

    #[test]
    fn flat_preserves_declaration_order() {
        let reg = Registry::parse(SAMPLE).unwrap();
        let keys: Vec<String> = reg.flat().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "languages.go",
                "tools.golangci-lint",
                "tools.gotestsum",
                "build.task",
                "schema",
            ]
        );
    }

    #[test]
    fn rejects_list_values() {
        let err = Registry::parse("tools:\n  - golangci-lint\n").unwrap_err();
        assert!(matches!(err, VersyncError::RegistryParse { line: 2, .. }));
        assert!(err.to_string().contains("list values"));
    }

    #[test]
    fn rejects_deep_nesting() {
        let err = Registry::parse("tools:\n  linters:\n    golangci-lint: 1\n").unwrap_err();
        assert!(err.to_string().contains("two levels"));
    }

    #[test]
    fn rejects_indented_entry_outside_section() {
        let err = Registry::parse("  go: \"1.21\"\n").unwrap_err();
        assert!(err.to_string().contains("outside a section"));
    }

    #[test]
    fn rejects_non_key_value_lines() {
        let err = Registry::parse("just some text\n").unwrap_err();
        assert!(matches!(err, VersyncError::RegistryParse { line: 1, .. }));
    }

    #[test]
    fn load_missing_file_is_registry_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Registry::load(dir.path()).unwrap_err();
        assert!(matches!(err, VersyncError::RegistryNotFound(_)));
    }

    #[test]
    fn load_reads_registry_from_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(REGISTRY_FILE), "tools:\n  air: \"1.61.7\"\n").unwrap();
        let reg = Registry::load(dir.path()).unwrap();
        assert_eq!(reg.get("tools.air"), Some("1.61.7"));
    }
}
