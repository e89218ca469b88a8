use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use versync_core::registry::{Entry, Registry};
use versync_core::VersyncError;

/// Keys emitted by `versync load` — the subset shell scripts and CI jobs
/// actually source.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("GO_VERSION", "languages.go"),
    ("GOLANGCI_LINT_VERSION", "tools.golangci-lint"),
    ("GOTESTSUM_VERSION", "tools.gotestsum"),
    ("GOSEC_VERSION", "tools.gosec"),
    ("GOVULNCHECK_VERSION", "tools.govulncheck"),
    ("AIR_VERSION", "tools.air"),
    ("GOCOV_VERSION", "tools.gocov"),
    ("GOCOV_HTML_VERSION", "tools.gocov-html"),
    ("GO_COVER_TREEMAP_VERSION", "tools.go-cover-treemap"),
    ("TRIVY_VERSION", "tools.trivy"),
    ("CODEQL_CLI_VERSION", "security.codeql-cli"),
    ("TASK_VERSION", "build.task"),
];

fn load_registry(root: &Path) -> anyhow::Result<Registry> {
    Registry::load(root).context("failed to load versions registry")
}

pub fn get(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(root)?;
    let Some(version) = registry.get(key) else {
        return Err(VersyncError::KeyNotFound(key.to_string()).into());
    };
    if json {
        print_json(&serde_json::json!({ "key": key, "version": version }))?;
    } else {
        println!("{version}");
    }
    Ok(())
}

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let registry = load_registry(root)?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = registry
            .flat()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v.to_string())))
            .collect();
        print_json(&map)?;
        return Ok(());
    }

    println!("Available versions:");
    for (key, entry) in registry.entries() {
        match entry {
            Entry::Scalar(v) => println!("  {key}: {v}"),
            Entry::Section(map) => {
                println!("\n[{key}]");
                for (sub, v) in map {
                    println!("  {key}.{sub}: {v}");
                }
            }
        }
    }
    Ok(())
}

pub fn env(root: &Path) -> anyhow::Result<()> {
    let registry = load_registry(root)?;
    for (key, version) in registry.flat() {
        println!("export {}='{version}'", env_name(&key));
    }
    Ok(())
}

pub fn load(root: &Path) -> anyhow::Result<()> {
    let registry = load_registry(root)?;
    for (var, key) in WELL_KNOWN {
        if let Some(version) = registry.get(key) {
            println!("export {var}='{version}'");
        }
    }
    Ok(())
}

/// `tools.golangci-lint` → `TOOLS_GOLANGCI_LINT_VERSION`
fn env_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    name.push_str("_VERSION");
    name
}
