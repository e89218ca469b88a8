//! Presentation layer. Command logic emits structured rows through the
//! [`Presenter`] trait and never branches on which implementation is active;
//! a richer renderer can replace [`PlainPresenter`] without touching any
//! command module.

use serde::Serialize;

pub trait Presenter {
    /// A titled block introducing or summarizing a run.
    fn panel(&self, title: &str, body: &str);

    /// A column-aligned table of result rows.
    fn table(&self, headers: &[&str], rows: &[Vec<String>]);

    /// A single progress/status line.
    fn status(&self, message: &str);
}

/// Plain-text renderer writing to stdout.
pub struct PlainPresenter;

impl Presenter for PlainPresenter {
    fn panel(&self, title: &str, body: &str) {
        println!("=== {title} ===");
        if !body.is_empty() {
            println!("{body}");
        }
    }

    fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        // Calculate column widths
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_row: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect();
        println!("{}", header_row.join("  "));

        let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        println!("{}", sep.join("  "));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let w = widths.get(i).copied().unwrap_or(0);
                    format!("{:width$}", cell, width = w)
                })
                .collect();
            println!("{}", cells.join("  "));
        }
    }

    fn status(&self, message: &str) {
        println!("{message}");
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
