use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::display::{format_average, Mood};
use crate::models::{Category, DailyRecord};
use crate::stats::{self, LONG_WINDOW_DAYS};

/// Number of distinct days with a record inside the trailing window.
pub fn days_logged(records: &[DailyRecord], window_days: u64, as_of: NaiveDate) -> usize {
    let start = stats::window_start(window_days, as_of);
    let mut days: Vec<NaiveDate> = records
        .iter()
        .map(|record| record.date)
        .filter(|date| *date >= start && *date <= as_of)
        .collect();
    days.sort();
    days.dedup();
    days.len()
}

pub fn build_report(categories: &[Category], records: &[DailyRecord], as_of: NaiveDate) -> String {
    let summaries = stats::summarize(categories, records, as_of);

    let mut output = String::new();

    let _ = writeln!(output, "# Daily Metrics Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} entries, {} of the last {} days logged)",
        as_of,
        records.len(),
        days_logged(records, LONG_WINDOW_DAYS, as_of),
        LONG_WINDOW_DAYS
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rolling Averages");

    if summaries.is_empty() {
        let _ = writeln!(output, "No active categories.");
    } else {
        let _ = writeln!(output, "| Category | All time | 10 days | 30 days | Mood |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for (category, summary) in categories.iter().zip(summaries.iter()) {
            let averages = summary.averages;
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                category.display_name,
                format_average(averages.all_time),
                format_average(averages.trailing_10),
                format_average(averages.trailing_30),
                Mood::from_average(averages.trailing_10).glyph
            );
        }
    }

    let mut recent: Vec<&DailyRecord> = records.iter().filter(|r| r.date <= as_of).collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Notes");

    let with_notes: Vec<&DailyRecord> =
        recent.into_iter().filter(|r| !r.notes.is_empty()).collect();
    if with_notes.is_empty() {
        let _ = writeln!(output, "No notes recorded yet.");
    } else {
        for record in with_notes.iter().take(5) {
            let _ = writeln!(output, "- {}: {}", record.date, record.notes);
        }
    }

    output
}

pub fn write_report(out: &Path, report: &str) -> anyhow::Result<()> {
    std::fs::write(out, report)
        .with_context(|| format!("failed to write report to {}", out.display()))
}
