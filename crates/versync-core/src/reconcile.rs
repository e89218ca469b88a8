//! Reconciliation: rewrite target files whose embedded versions drifted from
//! the registry, or report the drift without touching anything.
//!
//! Per-file and per-rule failures are recoverable — they are logged, counted,
//! and the run continues. Only a missing or unparsable registry aborts a run,
//! and that happens before a `Reconciler` is ever constructed.

use crate::io;
use crate::registry::Registry;
use crate::rules::TargetSpec;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// One rewrite that happened (or would happen, in dry-run mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileRecord {
    pub file: String,
    pub key: String,
    pub old: String,
    pub new: String,
}

/// One drifted match found by check mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub file: String,
    pub key: String,
    pub found: String,
    pub expected: String,
}

/// Aggregate result of a sync pass.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub files_total: usize,
    pub files_changed: usize,
    pub records: Vec<ReconcileRecord>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregate result of a check pass.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub inconsistencies: Vec<Inconsistency>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl CheckReport {
    pub fn ok(&self) -> bool {
        self.inconsistencies.is_empty() && self.errors.is_empty()
    }
}

pub struct Reconciler<'a> {
    root: &'a Path,
    registry: &'a Registry,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(root: &'a Path, registry: &'a Registry, dry_run: bool) -> Self {
        Self {
            root,
            registry,
            dry_run,
        }
    }

    /// Apply every rule to every target file, rewriting drifted matches.
    /// Identical captures are left untouched, so a second pass over synced
    /// files produces no records.
    pub fn sync(&self, targets: &[TargetSpec]) -> SyncReport {
        let mut report = SyncReport {
            files_total: targets.len(),
            ..Default::default()
        };

        for target in targets {
            if self.sync_file(target, &mut report) {
                report.files_changed += 1;
            }
        }

        report
    }

    fn sync_file(&self, target: &TargetSpec, report: &mut SyncReport) -> bool {
        let path = self.root.join(&target.path);
        if !path.exists() {
            warn!("target file not found: {}", target.path);
            report
                .warnings
                .push(format!("target file not found: {}", target.path));
            return false;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to read {}: {e}", target.path));
                return false;
            }
        };

        let mut updated = content;
        let mut file_records: Vec<ReconcileRecord> = Vec::new();

        for rule in &target.rules {
            let Some((re, expected)) = self.resolve_rule(&target.path, rule, &mut report.errors)
            else {
                continue;
            };

            let mut rule_records: Vec<ReconcileRecord> = Vec::new();
            let rewritten = re
                .replace_all(&updated, |caps: &regex::Captures| {
                    let old = &caps[1];
                    if old == expected {
                        caps[0].to_string()
                    } else {
                        rule_records.push(ReconcileRecord {
                            file: target.path.clone(),
                            key: rule.key.clone(),
                            old: old.to_string(),
                            new: expected.to_string(),
                        });
                        rule.render(expected)
                    }
                })
                .into_owned();

            if !rule_records.is_empty() {
                updated = rewritten;
                file_records.append(&mut rule_records);
            }
        }

        if file_records.is_empty() {
            debug!("{} already in sync", target.path);
            return false;
        }

        if self.dry_run {
            debug!("would write {}", target.path);
        } else if let Err(e) = io::atomic_write(&path, updated.as_bytes()) {
            report
                .errors
                .push(format!("failed to write {}: {e}", target.path));
            report.records.append(&mut file_records);
            return false;
        } else {
            debug!("updated {}", target.path);
        }

        report.records.append(&mut file_records);
        true
    }

    /// Same matching as `sync`, but never writes: every drifted match is
    /// reported as an inconsistency.
    pub fn check(&self, targets: &[TargetSpec]) -> CheckReport {
        let mut report = CheckReport::default();

        for target in targets {
            let path = self.root.join(&target.path);
            if !path.exists() {
                report
                    .warnings
                    .push(format!("target file not found: {}", target.path));
                continue;
            }
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    report
                        .errors
                        .push(format!("failed to read {}: {e}", target.path));
                    continue;
                }
            };

            for rule in &target.rules {
                let Some((re, expected)) =
                    self.resolve_rule(&target.path, rule, &mut report.errors)
                else {
                    continue;
                };
                for caps in re.captures_iter(&content) {
                    let found = &caps[1];
                    if found != expected {
                        report.inconsistencies.push(Inconsistency {
                            file: target.path.clone(),
                            key: rule.key.clone(),
                            found: found.to_string(),
                            expected: expected.to_string(),
                        });
                    }
                }
            }
        }

        report
    }

    /// Compile a rule's pattern and resolve its registry key. Either failure
    /// skips the rule (recorded as an error) but not the rest of the file.
    fn resolve_rule<'r>(
        &'r self,
        file: &str,
        rule: &'r crate::rules::SyncRule,
        errors: &mut Vec<String>,
    ) -> Option<(Regex, &'r str)> {
        let re = match Regex::new(&rule.pattern) {
            Ok(re) => re,
            Err(e) => {
                errors.push(format!("invalid pattern for '{}' in {file}: {e}", rule.key));
                return None;
            }
        };
        let Some(expected) = self.registry.get(&rule.key) else {
            warn!("no registry value for '{}' (used by {file})", rule.key);
            errors.push(format!("no registry value for '{}' (used by {file})", rule.key));
            return None;
        };
        Some((re, expected))
    }
}
