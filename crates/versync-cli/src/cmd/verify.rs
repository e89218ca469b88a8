use crate::output::{print_json, Presenter};
use anyhow::Context;
use std::path::Path;
use versync_core::outdated::{self, GoProxyIndex};
use versync_core::registry::Registry;
use versync_core::verify::{self, GoInstaller, Verifier};

pub fn run(
    root: &Path,
    fix: bool,
    check_outdated: bool,
    json: bool,
    presenter: &dyn Presenter,
) -> anyhow::Result<()> {
    let registry = Registry::load(root).context("failed to load versions registry")?;
    let roster = verify::default_roster();

    if check_outdated {
        return run_check_outdated(&registry, &roster, json, presenter);
    }

    let report = Verifier::new(&registry).verify(&roster);

    let outcome = if fix && !report.all_match() {
        let installer = GoInstaller::default();
        Some(verify::repair(&report, &roster, &installer))
    } else {
        None
    };

    if json {
        match &outcome {
            Some(outcome) => print_json(&serde_json::json!({
                "rows": &report.rows,
                "repair": outcome,
            }))?,
            None => print_json(&report)?,
        }
    } else {
        presenter.panel("Tool version verification", "");
        let rows: Vec<Vec<String>> = report
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.tool.clone(),
                    r.installed.clone().unwrap_or_else(|| "-".to_string()),
                    r.expected.clone().unwrap_or_else(|| "-".to_string()),
                    r.status.as_str().to_string(),
                ]
            })
            .collect();
        presenter.table(&["Tool", "Installed", "Expected", "Status"], &rows);

        if report.all_match() {
            presenter.status("All tool versions match the registry");
        } else {
            let drifted = report.drifted().count();
            presenter.status(&format!("{drifted} tools out of sync with the registry"));
        }

        if let Some(outcome) = &outcome {
            for skipped in &outcome.unfixable {
                presenter.status(&format!("cannot auto-fix {skipped}"));
            }
            if outcome.attempted > 0 {
                presenter.status(&format!(
                    "installed {}/{} tools",
                    outcome.succeeded, outcome.attempted
                ));
            }
        }
    }

    if !report.all_match() {
        anyhow::bail!("tool version verification failed");
    }
    Ok(())
}

fn run_check_outdated(
    registry: &Registry,
    roster: &[verify::ToolSpec],
    json: bool,
    presenter: &dyn Presenter,
) -> anyhow::Result<()> {
    let index = GoProxyIndex::default();
    let rows = outdated::check_outdated(registry, roster, &index);

    if json {
        print_json(&rows)?;
        return Ok(());
    }

    presenter.panel("Registry freshness check", "read-only — nothing is modified");
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.tool.clone(),
                r.declared.clone().unwrap_or_else(|| "-".to_string()),
                r.latest.clone().unwrap_or_else(|| "-".to_string()),
                if r.outdated { "behind" } else { "ok" }.to_string(),
            ]
        })
        .collect();
    presenter.table(&["Tool", "Declared", "Latest", "Status"], &table_rows);

    let behind = rows.iter().filter(|r| r.outdated).count();
    if behind > 0 {
        presenter.status(&format!("{behind} registry versions are behind upstream"));
    } else {
        presenter.status("All registry versions are current");
    }
    Ok(())
}
