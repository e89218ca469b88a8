//! Verification: compare installed tool versions against the registry.
//!
//! The roster is a uniform table of tagged records: probe invocation,
//! registry key, optional installer package — iterated one tool at a time.
//! Classification of one tool never affects another; every tool gets a row.

use crate::error::{Result, VersyncError};
use crate::probe::{self, ProbeCommand};
use crate::process::{self, RunError};
use crate::registry::Registry;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Budget for one `go install` invocation.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// One tool the verifier knows about.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub probe: ProbeCommand,
    /// Dotted registry key holding the expected version.
    pub registry_key: String,
    /// Go module to `go install` when repairing; `None` means the tool is
    /// installed out-of-band and can never be auto-fixed.
    pub package: Option<String>,
}

impl ToolSpec {
    fn version_flag(name: &str, args: &[&str], pattern: &str, package: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            probe: ProbeCommand::VersionFlag {
                program: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                pattern: pattern.to_string(),
            },
            registry_key: format!("tools.{name}"),
            package: package.map(str::to_string),
        }
    }

    fn build_info(name: &str, module_path: &str, package: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: ProbeCommand::BuildInfo {
                binary: name.to_string(),
                module_path: module_path.to_string(),
            },
            registry_key: format!("tools.{name}"),
            package: package.to_string().into(),
        }
    }
}

/// The fixed roster of verified tools.
pub fn default_roster() -> Vec<ToolSpec> {
    vec![
        ToolSpec::version_flag(
            "golangci-lint",
            &["--version"],
            r"golangci-lint has version ([0-9]+\.[0-9]+\.[0-9]+)",
            Some("github.com/golangci/golangci-lint/v2/cmd/golangci-lint"),
        ),
        ToolSpec::version_flag(
            "gotestsum",
            &["--version"],
            r"gotestsum version (\S+)",
            Some("gotest.tools/gotestsum"),
        ),
        ToolSpec::version_flag(
            "gosec",
            &["--version"],
            r"Version: (\S+)",
            Some("github.com/securego/gosec/v2/cmd/gosec"),
        ),
        ToolSpec::version_flag(
            "govulncheck",
            &["--version"],
            r"govulncheck@v([0-9]+\.[0-9]+\.[0-9]+)",
            Some("golang.org/x/vuln/cmd/govulncheck"),
        ),
        ToolSpec::version_flag(
            "air",
            &["-v"],
            r"v([0-9]+\.[0-9]+\.[0-9]+)",
            Some("github.com/air-verse/air"),
        ),
        // Coverage tools expose no version flag; read the build metadata.
        ToolSpec::build_info("gocov", "github.com/axw/gocov", "github.com/axw/gocov/gocov"),
        ToolSpec::build_info(
            "gocov-html",
            "github.com/matm/gocov-html",
            "github.com/matm/gocov-html/cmd/gocov-html",
        ),
        ToolSpec::build_info(
            "go-cover-treemap",
            "github.com/nikolaydubina/go-cover-treemap",
            "github.com/nikolaydubina/go-cover-treemap",
        ),
        // trivy is not installed via `go install`; report-only.
        ToolSpec::version_flag(
            "trivy",
            &["--version"],
            r"Version: ([0-9]+\.[0-9]+\.[0-9]+)",
            None,
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Match,
    Mismatch,
    /// Binary absent or its version could not be determined.
    Missing,
    /// The registry has no expected value for this tool.
    Undefined,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Match => "match",
            Status::Mismatch => "mismatch",
            Status::Missing => "missing",
            Status::Undefined => "undefined",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRow {
    pub tool: String,
    pub installed: Option<String>,
    pub expected: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    pub rows: Vec<VerifyRow>,
}

impl VerifyReport {
    pub fn all_match(&self) -> bool {
        self.rows.iter().all(|r| r.status == Status::Match)
    }

    /// Rows that represent drift (`mismatch` or `missing`).
    pub fn drifted(&self) -> impl Iterator<Item = &VerifyRow> {
        self.rows
            .iter()
            .filter(|r| matches!(r.status, Status::Mismatch | Status::Missing))
    }
}

/// Strip a leading `v` so `v1.2.3` and `1.2.3` compare equal.
pub fn normalize(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Prefix-insensitive equality; the `dev`/`devel` sentinel never matches.
pub fn versions_match(installed: &str, expected: &str) -> bool {
    if installed == "dev" || installed == "devel" {
        return false;
    }
    normalize(installed) == normalize(expected)
}

/// Classification order matters: an absent installed version is `missing`
/// even when the registry also lacks a value.
pub fn classify(installed: Option<&str>, expected: Option<&str>) -> Status {
    match (installed, expected) {
        (None, _) => Status::Missing,
        (Some(_), None) => Status::Undefined,
        (Some(i), Some(e)) => {
            if versions_match(i, e) {
                Status::Match
            } else {
                Status::Mismatch
            }
        }
    }
}

pub struct Verifier<'a> {
    registry: &'a Registry,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Probe and classify every tool in the roster. No early exit: one row
    /// per tool regardless of outcome.
    pub fn verify(&self, roster: &[ToolSpec]) -> VerifyReport {
        let mut report = VerifyReport::default();

        for tool in roster {
            let probed = probe::probe(&tool.name, &tool.probe);
            if let Some(w) = &probed.warning {
                warn!("{w}");
            }
            let expected = self.registry.get(&tool.registry_key).map(str::to_string);
            let status = classify(probed.version.as_deref(), expected.as_deref());

            report.rows.push(VerifyRow {
                tool: tool.name.clone(),
                installed: probed.version,
                expected,
                status,
                warning: probed.warning,
            });
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// The installer collaborator. Production uses [`GoInstaller`]; tests swap
/// in a recording fake.
pub trait Installer {
    fn install(&self, package: &str, version: &str) -> Result<()>;
}

/// Installs Go tools with `go install <package>@v<version>`.
#[derive(Debug, Clone)]
pub struct GoInstaller {
    pub timeout: Duration,
}

impl Default for GoInstaller {
    fn default() -> Self {
        Self {
            timeout: INSTALL_TIMEOUT,
        }
    }
}

impl Installer for GoInstaller {
    fn install(&self, package: &str, version: &str) -> Result<()> {
        let target = if version.starts_with('v') {
            format!("{package}@{version}")
        } else {
            format!("{package}@v{version}")
        };
        info!("running go install {target}");
        let out = process::run_with_timeout("go", &["install", &target], Some(self.timeout))
            .map_err(|e| VersyncError::InstallFailed {
                tool: package.to_string(),
                reason: match e {
                    RunError::NotFound => "go not found in PATH".to_string(),
                    other => other.to_string(),
                },
            })?;
        if !out.success {
            return Err(VersyncError::InstallFailed {
                tool: package.to_string(),
                reason: out.output,
            });
        }
        Ok(())
    }
}

/// Per-tool outcome of a repair pass.
#[derive(Debug, Default, Serialize)]
pub struct RepairOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    /// Drifted tools with no installer package — reported, never touched.
    pub unfixable: Vec<String>,
    pub failures: Vec<String>,
}

/// Install the expected version for every drifted row that has an installer
/// package. Tools without one are collected as unfixable; install failures
/// are recoverable and summarized.
pub fn repair(
    report: &VerifyReport,
    roster: &[ToolSpec],
    installer: &dyn Installer,
) -> RepairOutcome {
    let mut outcome = RepairOutcome::default();

    for row in report.drifted() {
        let Some(tool) = roster.iter().find(|t| t.name == row.tool) else {
            continue;
        };
        let Some(expected) = row.expected.as_deref() else {
            outcome
                .unfixable
                .push(format!("{}: no expected version in the registry", row.tool));
            continue;
        };
        let Some(package) = tool.package.as_deref() else {
            outcome
                .unfixable
                .push(format!("{}: no installer package", row.tool));
            continue;
        };

        outcome.attempted += 1;
        match installer.install(package, expected) {
            Ok(()) => {
                info!("installed {} {expected}", row.tool);
                outcome.succeeded += 1;
            }
            Err(e) => {
                warn!("{e}");
                outcome.failures.push(e.to_string());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn v_prefix_is_insignificant() {
        assert!(versions_match("v1.2.3", "1.2.3"));
        assert!(versions_match("1.2.3", "v1.2.3"));
        assert!(versions_match("1.2.3", "1.2.3"));
        assert!(!versions_match("1.2.3", "1.2.4"));
    }

    #[test]
    fn dev_never_matches() {
        assert!(!versions_match("dev", "dev"));
        assert!(!versions_match("devel", "1.2.3"));
        assert!(!versions_match("dev", "1.2.3"));
    }

    #[test]
    fn classify_covers_all_outcomes() {
        assert_eq!(classify(Some("1.2.3"), Some("1.2.3")), Status::Match);
        assert_eq!(classify(Some("1.2.3"), Some("1.2.4")), Status::Mismatch);
        assert_eq!(classify(None, Some("1.2.3")), Status::Missing);
        assert_eq!(classify(Some("1.2.3"), None), Status::Undefined);
        // Absent binary wins over absent registry value
        assert_eq!(classify(None, None), Status::Missing);
    }

    #[test]
    fn default_roster_is_uniform() {
        let roster = default_roster();
        assert_eq!(roster.len(), 9);
        let trivy = roster.iter().find(|t| t.name == "trivy").unwrap();
        assert!(trivy.package.is_none());
        for tool in &roster {
            assert!(tool.registry_key.starts_with("tools."));
        }
    }

    #[test]
    fn verify_produces_one_row_per_tool() {
        // Probes that cannot run classify as missing; the roster still gets
        // a full set of rows.
        let registry = Registry::parse("tools:\n  ghost-one: \"1.0.0\"\n").unwrap();
        let roster = vec![
            ToolSpec {
                name: "ghost-one".to_string(),
                probe: ProbeCommand::VersionFlag {
                    program: "definitely-not-a-real-binary-xyz".to_string(),
                    args: vec!["--version".to_string()],
                    pattern: r"(\d+)".to_string(),
                },
                registry_key: "tools.ghost-one".to_string(),
                package: Some("example.com/ghost-one".to_string()),
            },
            ToolSpec {
                name: "ghost-two".to_string(),
                probe: ProbeCommand::VersionFlag {
                    program: "definitely-not-a-real-binary-xyz".to_string(),
                    args: vec!["--version".to_string()],
                    pattern: r"(\d+)".to_string(),
                },
                registry_key: "tools.ghost-two".to_string(),
                package: None,
            },
        ];

        let report = Verifier::new(&registry).verify(&roster);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].status, Status::Missing);
        assert_eq!(report.rows[0].expected.as_deref(), Some("1.0.0"));
        assert_eq!(report.rows[1].status, Status::Missing);
        assert!(!report.all_match());
    }

    #[derive(Default)]
    struct RecordingInstaller {
        calls: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Installer for RecordingInstaller {
        fn install(&self, package: &str, version: &str) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((package.to_string(), version.to_string()));
            if self.fail {
                return Err(VersyncError::InstallFailed {
                    tool: package.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn row(tool: &str, installed: Option<&str>, expected: Option<&str>) -> VerifyRow {
        VerifyRow {
            tool: tool.to_string(),
            installed: installed.map(str::to_string),
            expected: expected.map(str::to_string),
            status: classify(installed, expected),
            warning: None,
        }
    }

    fn spec(name: &str, package: Option<&str>) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            probe: ProbeCommand::VersionFlag {
                program: name.to_string(),
                args: vec![],
                pattern: String::new(),
            },
            registry_key: format!("tools.{name}"),
            package: package.map(str::to_string),
        }
    }

    #[test]
    fn repair_installs_drifted_tools_with_packages() {
        let report = VerifyReport {
            rows: vec![
                row("a", Some("1.0.0"), Some("1.1.0")),
                row("b", None, Some("2.0.0")),
                row("c", Some("3.0.0"), Some("3.0.0")),
            ],
        };
        let roster = vec![
            spec("a", Some("example.com/a")),
            spec("b", Some("example.com/b")),
            spec("c", Some("example.com/c")),
        ];
        let installer = RecordingInstaller::default();
        let outcome = repair(&report, &roster, &installer);

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.unfixable.is_empty());
        let calls = installer.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                ("example.com/a".to_string(), "1.1.0".to_string()),
                ("example.com/b".to_string(), "2.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn repair_never_touches_tools_without_packages() {
        let report = VerifyReport {
            rows: vec![row("trivy", Some("0.58.0"), Some("0.59.0"))],
        };
        let roster = vec![spec("trivy", None)];
        let installer = RecordingInstaller::default();
        let outcome = repair(&report, &roster, &installer);

        assert_eq!(outcome.attempted, 0);
        assert!(installer.calls.borrow().is_empty());
        assert_eq!(outcome.unfixable.len(), 1);
        assert!(outcome.unfixable[0].contains("trivy"));
    }

    #[test]
    fn repair_counts_failures_and_continues() {
        let report = VerifyReport {
            rows: vec![
                row("a", Some("1.0.0"), Some("1.1.0")),
                row("b", Some("2.0.0"), Some("2.1.0")),
            ],
        };
        let roster = vec![spec("a", Some("example.com/a")), spec("b", Some("example.com/b"))];
        let installer = RecordingInstaller {
            fail: true,
            ..Default::default()
        };
        let outcome = repair(&report, &roster, &installer);

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(installer.calls.borrow().len(), 2);
    }

    #[test]
    fn repair_skips_rows_without_expected_version() {
        let report = VerifyReport {
            rows: vec![row("a", None, None)],
        };
        let roster = vec![spec("a", Some("example.com/a"))];
        let installer = RecordingInstaller::default();
        let outcome = repair(&report, &roster, &installer);

        assert_eq!(outcome.attempted, 0);
        assert!(installer.calls.borrow().is_empty());
        assert_eq!(outcome.unfixable.len(), 1);
    }
}
