//! Read-only check of registry versions against the upstream package index.
//!
//! For every roster tool with an installer package, asks the Go module proxy
//! for the latest published version and flags registry entries that are
//! behind. Nothing is ever mutated; index failures degrade to per-tool
//! warnings.

use crate::error::{Result, VersyncError};
use crate::registry::Registry;
use crate::verify::ToolSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// The upstream package index. Production uses [`GoProxyIndex`]; tests swap
/// in a canned fake.
pub trait PackageIndex {
    fn latest_version(&self, package: &str) -> Result<String>;
}

/// Queries the Go module proxy (`proxy.golang.org` by default) for the
/// latest published version of a module.
#[derive(Debug, Clone)]
pub struct GoProxyIndex {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GoProxyIndex {
    fn default() -> Self {
        Self {
            base_url: "https://proxy.golang.org".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestInfo {
    #[serde(rename = "Version")]
    version: String,
}

impl PackageIndex for GoProxyIndex {
    fn latest_version(&self, package: &str) -> Result<String> {
        let url = format!("{}/{}/@latest", self.base_url, escape_module_path(package));
        let response = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| VersyncError::IndexQuery {
                package: package.to_string(),
                reason: e.to_string(),
            })?;
        let info: LatestInfo =
            response
                .into_json()
                .map_err(|e| VersyncError::IndexQuery {
                    package: package.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(info
            .version
            .strip_prefix('v')
            .unwrap_or(&info.version)
            .to_string())
    }
}

/// Case-encode a module path per the Go module proxy protocol: an uppercase
/// letter becomes `!` followed by its lowercase form.
fn escape_module_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct OutdatedRow {
    pub tool: String,
    pub declared: Option<String>,
    pub latest: Option<String>,
    pub outdated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// `declared < latest` under semver when both parse; falls back to plain
/// inequality for non-semver strings (e.g. two-part Go versions).
fn is_behind(declared: &str, latest: &str) -> bool {
    match (
        semver::Version::parse(declared),
        semver::Version::parse(latest),
    ) {
        (Ok(d), Ok(l)) => d < l,
        _ => declared != latest,
    }
}

/// One row per roster tool that has an installer package. Tools the registry
/// does not declare and index failures are reported as warnings, not errors.
pub fn check_outdated(
    registry: &Registry,
    roster: &[ToolSpec],
    index: &dyn PackageIndex,
) -> Vec<OutdatedRow> {
    let mut rows = Vec::new();

    for tool in roster {
        let Some(package) = tool.package.as_deref() else {
            continue;
        };
        let declared = registry.get(&tool.registry_key).map(str::to_string);

        match index.latest_version(package) {
            Ok(latest) => {
                let outdated = declared
                    .as_deref()
                    .map(|d| is_behind(d, &latest))
                    .unwrap_or(false);
                let warning = declared
                    .is_none()
                    .then(|| format!("no registry value for '{}'", tool.registry_key));
                rows.push(OutdatedRow {
                    tool: tool.name.clone(),
                    declared,
                    latest: Some(latest),
                    outdated,
                    warning,
                });
            }
            Err(e) => {
                warn!("{e}");
                rows.push(OutdatedRow {
                    tool: tool.name.clone(),
                    declared,
                    latest: None,
                    outdated: false,
                    warning: Some(e.to_string()),
                });
            }
        }
    }

    rows
}
