//! Terminal rendering for previews and run results.

use helpdesk_common::{PlaceholderWarning, Preview, ProcessingResult};
use owo_colors::OwoColorize;
use std::fmt::Write;

fn warning_line(w: &PlaceholderWarning) -> String {
    format!("{} has no value in column {}", w.token, w.column.to_uppercase())
}

pub fn format_preview(preview: &Preview) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} row(s) available, showing {}",
        preview.total_rows_available,
        preview.items.len()
    );

    for item in &preview.items {
        let label = format!("row {:>4}", item.row);
        match &item.error {
            Some(error) => {
                let _ = writeln!(out, "  {}  {}", label.red(), error.red());
            }
            None => {
                let _ = writeln!(out, "  {}  {}", label.bold(), item.title);
                for line in item.description.lines() {
                    let _ = writeln!(out, "            {}", line.dimmed());
                }
            }
        }
        for w in &item.warnings {
            let _ = writeln!(out, "            {} {}", "!".yellow(), warning_line(w).yellow());
        }
    }
    out
}

pub fn format_result(result: &ProcessingResult) -> String {
    let mut out = String::new();
    for detail in &result.details {
        let mark = if detail.success {
            format!("{}", "✓".green())
        } else {
            format!("{}", "✗".red())
        };
        match &detail.title {
            Some(title) => {
                let _ = writeln!(
                    out,
                    "  {} row {:>4}  {}  ({})",
                    mark, detail.row, title, detail.message
                );
            }
            None => {
                let _ = writeln!(out, "  {} row {:>4}  {}", mark, detail.row, detail.message);
            }
        }
        for w in &detail.warnings {
            let _ = writeln!(out, "             {} {}", "!".yellow(), warning_line(w).yellow());
        }
    }

    let summary = result.summary();
    if result.errors > 0 {
        let _ = writeln!(out, "{}", summary.red().bold());
    } else {
        let _ = writeln!(out, "{}", summary.green().bold());
    }
    out
}
