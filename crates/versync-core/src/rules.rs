//! Target-file rules: where versions are embedded outside the registry and
//! how to rewrite them.
//!
//! Each rule pairs a regex with exactly one capture group (the embedded
//! version substring) with the registry key it must equal and a template
//! that re-renders the full match for a new value. Rules are scoped to
//! distinct syntactic markers so no two rules in a file can overlap the
//! same text.

/// One (pattern, registry key, renderer) tuple inside a target file.
#[derive(Debug, Clone)]
pub struct SyncRule {
    /// Regex with exactly one capture group around the version substring.
    pub pattern: String,
    /// Dotted registry key the captured version must equal.
    pub key: String,
    /// Replacement for the full match; `{version}` is the placeholder.
    pub template: String,
}

impl SyncRule {
    pub fn new(pattern: &str, key: &str, template: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            key: key.to_string(),
            template: template.to_string(),
        }
    }

    /// Render the full replacement text for a new version value.
    pub fn render(&self, version: &str) -> String {
        self.template.replace("{version}", version)
    }
}

/// A target file and its rules, applied in declaration order.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// Path relative to the project root.
    pub path: String,
    pub rules: Vec<SyncRule>,
}

impl TargetSpec {
    pub fn new(path: &str, rules: Vec<SyncRule>) -> Self {
        Self {
            path: path.to_string(),
            rules,
        }
    }
}

/// The fixed table of files that embed registry versions: CI workflows, the
/// container build file, the module manifest, and the install script.
pub fn default_targets() -> Vec<TargetSpec> {
    let go_version_rule = || {
        SyncRule::new(
            r#"go-version:\s*['"]?([^'"\s]+)['"]?"#,
            "languages.go",
            "go-version: '{version}'",
        )
    };

    vec![
        TargetSpec::new(
            ".github/workflows/ci.yml",
            vec![
                go_version_rule(),
                SyncRule::new(
                    r#"golangci-lint-version:\s*['"]?([^'"\s]+)['"]?"#,
                    "tools.golangci-lint",
                    "golangci-lint-version: '{version}'",
                ),
            ],
        ),
        TargetSpec::new(
            ".github/workflows/docker.yml",
            vec![SyncRule::new(
                r#"GO_VERSION:\s*['"]?([^'"\s]+)['"]?"#,
                "languages.go",
                "GO_VERSION: '{version}'",
            )],
        ),
        TargetSpec::new(".github/workflows/codeql.yml", vec![go_version_rule()]),
        TargetSpec::new(
            ".github/workflows/dependencies.yml",
            vec![go_version_rule()],
        ),
        TargetSpec::new(".github/workflows/release.yml", vec![go_version_rule()]),
        TargetSpec::new(
            "Dockerfile",
            vec![SyncRule::new(
                r"FROM\s+golang:(\S+)",
                "languages.go",
                "FROM golang:{version}",
            )],
        ),
        TargetSpec::new(
            "go.mod",
            vec![SyncRule::new(
                r"go\s+([0-9]+\.[0-9]+)",
                "languages.go",
                "go {version}",
            )],
        ),
        TargetSpec::new(
            "scripts/install-tools.sh",
            vec![SyncRule::new(
                r#"GOLANGCI_LINT_VERSION="([^"]+)""#,
                "tools.golangci-lint",
                "GOLANGCI_LINT_VERSION=\"{version}\"",
            )],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn every_default_pattern_has_one_capture_group() {
        for target in default_targets() {
            for rule in &target.rules {
                let re = Regex::new(&rule.pattern)
                    .unwrap_or_else(|e| panic!("{}: {e}", target.path));
                assert_eq!(
                    re.captures_len(),
                    2,
                    "{} rule '{}' must have exactly one capture group",
                    target.path,
                    rule.pattern
                );
            }
        }
    }

    #[test]
    fn render_substitutes_version() {
        let rule = SyncRule::new("x", "languages.go", "go-version: '{version}'");
        assert_eq!(rule.render("1.21"), "go-version: '1.21'");
    }

    #[test]
    fn workflow_pattern_matches_quoted_and_bare() {
        let rule = &default_targets()[0].rules[0];
        let re = Regex::new(&rule.pattern).unwrap();
        for line in [
            "go-version: '1.20'",
            "go-version: \"1.20\"",
            "go-version: 1.20",
        ] {
            let caps = re.captures(line).unwrap_or_else(|| panic!("{line}"));
            assert_eq!(&caps[1], "1.20");
        }
    }

    #[test]
    fn dockerfile_pattern_captures_image_tag() {
        let re = Regex::new(r"FROM\s+golang:(\S+)").unwrap();
        let caps = re.captures("FROM golang:1.21-alpine AS builder").unwrap();
        assert_eq!(&caps[1], "1.21-alpine");
    }
}
