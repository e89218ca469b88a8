use crate::output::{print_json, Presenter};
use anyhow::Context;
use std::path::Path;
use versync_core::reconcile::Reconciler;
use versync_core::registry::Registry;
use versync_core::rules;

pub fn run(
    root: &Path,
    dry_run: bool,
    check: bool,
    json: bool,
    presenter: &dyn Presenter,
) -> anyhow::Result<()> {
    let registry = Registry::load(root).context("failed to load versions registry")?;
    let targets = rules::default_targets();

    if check {
        return run_check(root, &registry, &targets, json, presenter);
    }

    let reconciler = Reconciler::new(root, &registry, dry_run);
    let report = reconciler.sync(&targets);

    if json {
        print_json(&report)?;
    } else {
        let mode = if dry_run {
            "dry run — no files will be modified"
        } else {
            ""
        };
        presenter.panel("Version synchronization", mode);

        if !report.records.is_empty() {
            let rows: Vec<Vec<String>> = report
                .records
                .iter()
                .map(|r| {
                    vec![
                        r.file.clone(),
                        r.key.clone(),
                        r.old.clone(),
                        r.new.clone(),
                    ]
                })
                .collect();
            presenter.table(&["File", "Key", "Old", "New"], &rows);
        }

        if report.files_changed > 0 {
            let action = if dry_run { "Would update" } else { "Updated" };
            presenter.status(&format!(
                "{action} {} of {} files",
                report.files_changed, report.files_total
            ));
        } else {
            presenter.status(&format!(
                "All {} files are already in sync",
                report.files_total
            ));
        }
        for error in &report.errors {
            tracing::error!("{error}");
        }
    }

    if !report.ok() {
        anyhow::bail!("{} errors during synchronization", report.errors.len());
    }
    Ok(())
}

fn run_check(
    root: &Path,
    registry: &Registry,
    targets: &[rules::TargetSpec],
    json: bool,
    presenter: &dyn Presenter,
) -> anyhow::Result<()> {
    // Check never writes regardless of the dry-run flag.
    let report = Reconciler::new(root, registry, true).check(targets);

    if json {
        print_json(&report)?;
    } else {
        presenter.panel("Version consistency check", "");
        if report.inconsistencies.is_empty() {
            presenter.status("All versions are consistent across all files");
        } else {
            let rows: Vec<Vec<String>> = report
                .inconsistencies
                .iter()
                .map(|i| {
                    vec![
                        i.file.clone(),
                        i.key.clone(),
                        i.found.clone(),
                        i.expected.clone(),
                    ]
                })
                .collect();
            presenter.table(&["File", "Key", "Found", "Expected"], &rows);
            presenter.status(&format!(
                "Found {} version inconsistencies",
                report.inconsistencies.len()
            ));
        }
        for error in &report.errors {
            tracing::error!("{error}");
        }
    }

    if !report.ok() {
        anyhow::bail!("version consistency check failed");
    }
    Ok(())
}
