//! Probing installed tools for their actual versions.
//!
//! Most tools report a version directly (`golangci-lint --version`); a few
//! expose no version flag at all and are probed through the build metadata
//! Go stamps into every binary (`go version -m <path>`), where the line
//! referencing the tool's module path carries the installed version.
//!
//! A probe never fails the run: every failure mode (binary absent, timeout,
//! unparsable output) degrades to an absent version plus a warning.

use crate::process::{self, RunError};
use regex::Regex;
use std::time::Duration;

/// Budget for a single version query.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// How to ask one tool for its installed version.
#[derive(Debug, Clone)]
pub enum ProbeCommand {
    /// Run the tool's own version invocation and match `pattern` (one
    /// capture group) against its combined stdout/stderr.
    VersionFlag {
        program: String,
        args: Vec<String>,
        pattern: String,
    },
    /// No version flag: resolve the binary on PATH and read the version
    /// token next to `module_path` in its `go version -m` output.
    BuildInfo {
        binary: String,
        module_path: String,
    },
}

/// Outcome of probing one tool. `version` is normalized: leading `v`
/// stripped, except the `dev`/`devel` built-from-source sentinel which is
/// kept as-is and never matches a concrete expected version.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub tool: String,
    pub version: Option<String>,
    pub warning: Option<String>,
}

impl ProbeResult {
    fn absent(tool: &str, warning: String) -> Self {
        Self {
            tool: tool.to_string(),
            version: None,
            warning: Some(warning),
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self.version.as_deref(), Some("dev") | Some("devel"))
    }
}

pub fn probe(tool: &str, command: &ProbeCommand) -> ProbeResult {
    match command {
        ProbeCommand::VersionFlag {
            program,
            args,
            pattern,
        } => probe_version_flag(tool, program, args, pattern),
        ProbeCommand::BuildInfo {
            binary,
            module_path,
        } => probe_build_info(tool, binary, module_path),
    }
}

fn probe_version_flag(tool: &str, program: &str, args: &[String], pattern: &str) -> ProbeResult {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = match process::run_with_timeout(program, &args, Some(PROBE_TIMEOUT)) {
        Ok(out) => out,
        Err(RunError::NotFound) => {
            return ProbeResult::absent(tool, format!("{tool} not found in PATH"));
        }
        Err(e) => {
            return ProbeResult::absent(tool, format!("failed to query {tool} version: {e}"));
        }
    };

    if !out.success {
        return ProbeResult::absent(
            tool,
            format!("failed to query {tool} version: {}", out.output),
        );
    }

    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            return ProbeResult::absent(tool, format!("invalid version pattern for {tool}: {e}"));
        }
    };

    match re.captures(&out.output) {
        Some(caps) => from_captured(tool, &caps[1]),
        None => ProbeResult::absent(
            tool,
            format!("could not parse {tool} version from: {}", out.output),
        ),
    }
}

fn probe_build_info(tool: &str, binary: &str, module_path: &str) -> ProbeResult {
    let path = match which::which(binary) {
        Ok(p) => p,
        Err(_) => return ProbeResult::absent(tool, format!("{tool} not found in PATH")),
    };

    let path_str = path.to_string_lossy();
    let out = match process::run_with_timeout(
        "go",
        &["version", "-m", path_str.as_ref()],
        Some(PROBE_TIMEOUT),
    ) {
        Ok(out) => out,
        Err(RunError::NotFound) => {
            return ProbeResult::absent(tool, "go not found in PATH".to_string());
        }
        Err(e) => {
            return ProbeResult::absent(tool, format!("failed to query {tool} version: {e}"));
        }
    };

    match find_module_version(&out.output, module_path) {
        Some(raw) => from_captured(tool, &raw),
        None => ProbeResult::absent(
            tool,
            format!("no {module_path} entry in build metadata for {tool}"),
        ),
    }
}

/// Search `go version -m` output for the token following `module_path`.
/// Lines look like `\tmod\tgithub.com/axw/gocov\tv1.1.0\th1:…`; a binary
/// built from a source checkout carries `(devel)` instead of a version.
fn find_module_version(output: &str, module_path: &str) -> Option<String> {
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(pos) = tokens.iter().position(|t| *t == module_path) {
            if let Some(version) = tokens.get(pos + 1) {
                if *version == "(devel)" {
                    return Some("devel".to_string());
                }
                return Some((*version).to_string());
            }
        }
    }
    None
}

fn from_captured(tool: &str, captured: &str) -> ProbeResult {
    if captured == "dev" || captured == "devel" {
        return ProbeResult {
            tool: tool.to_string(),
            version: Some(captured.to_string()),
            warning: Some(format!("{tool} reports '{captured}' — installed from source")),
        };
    }
    ProbeResult {
        tool: tool.to_string(),
        version: Some(captured.strip_prefix('v').unwrap_or(captured).to_string()),
        warning: None,
    }
}
