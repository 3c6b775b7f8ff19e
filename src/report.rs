use std::fmt::Write;

use crate::aggregate::{self, ReportingDay};
use crate::models::{CertificateRecord, EmployeeSummary};

const BAR_WIDTH: usize = 30;

/// Upper bound of the progress scale: the larger of the target and the best
/// total, rounded up to a multiple of five.
pub fn chart_scale_max(summaries: &[EmployeeSummary], target: i64) -> i64 {
    let highest = summaries
        .iter()
        .map(|summary| summary.total_jp)
        .max()
        .unwrap_or(0)
        .max(target)
        .max(1);
    (highest + 4) / 5 * 5
}

/// Text bar of `width` cells for `total` on a `0..=scale_max` scale, with `|`
/// marking the target cell when the bar has not reached it.
pub fn progress_bar(total: i64, scale_max: i64, target: i64, width: usize) -> String {
    let scale_max = scale_max.max(1);
    let cells = |value: i64| -> usize {
        let clamped = value.clamp(0, scale_max);
        ((clamped as f64 / scale_max as f64) * width as f64).round() as usize
    };

    let filled = cells(total);
    let marker = cells(target).min(width.saturating_sub(1));

    (0..width)
        .map(|cell| {
            if cell < filled {
                '#'
            } else if cell == marker && target > 0 {
                '|'
            } else {
                '.'
            }
        })
        .collect()
}

pub fn build_report(
    records: &[CertificateRecord],
    roster: &[String],
    target: i64,
    today: ReportingDay,
) -> String {
    let summaries = aggregate::aggregate_by_employee(records, target);
    let global = aggregate::compute_global_summary(records, roster.len(), target, today);

    let mut output = String::new();

    let _ = writeln!(output, "# JP Certificate Report");
    let _ = writeln!(
        output,
        "Generated on {} (target {} JP per employee)",
        today.date, target
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total JP: {}", global.total_jp);
    let _ = writeln!(output, "- Certificates: {}", global.total_certificates);
    let _ = writeln!(output, "- Employees recorded: {}", global.employee_count);
    let _ = writeln!(output, "- Average JP per employee: {:.1}", global.average_jp);
    if global.roster_size > 0 {
        let _ = writeln!(
            output,
            "- Reached target: {} of {} on the roster",
            global.reached_target_count, global.roster_size
        );
    } else {
        let _ = writeln!(output, "- Reached target: {}", global.reached_target_count);
    }
    if let Some(top) = &global.top_employee {
        let _ = writeln!(output, "- Top employee: {} ({} JP)", top.name, top.total_jp);
    }
    let _ = writeln!(output, "- Uploaded today: {}", global.uploads_today);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress per Employee");

    if summaries.is_empty() {
        let _ = writeln!(output, "No certificates uploaded yet.");
    } else {
        let scale_max = chart_scale_max(&summaries, target);
        let name_width = summaries
            .iter()
            .map(|summary| summary.name.chars().count())
            .max()
            .unwrap_or(0);

        let _ = writeln!(output, "```");
        for summary in &summaries {
            let _ = writeln!(
                output,
                "{:<name_width$} [{}] {:>3} JP {:>3}% {} cert{}{}",
                summary.name,
                progress_bar(summary.total_jp, scale_max, target, BAR_WIDTH),
                summary.total_jp,
                summary.progress_percent,
                summary.certificate_count,
                if summary.certificate_count == 1 { "" } else { "s" },
                if summary.reached_target { "  done" } else { "" },
            );
        }
        let _ = writeln!(output, "```");
        let _ = writeln!(output, "Scale: 0 to {} JP, `|` marks the target.", scale_max);
    }

    let missing = aggregate::roster_without_uploads(roster, &summaries);
    if !missing.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Not Yet Uploaded");
        for name in &missing {
            let _ = writeln!(output, "- {}", name);
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Certificates");

    if recent.is_empty() {
        let _ = writeln!(output, "No certificates uploaded yet.");
    } else {
        let _ = writeln!(output, "| Employee | Number | Training | JP | Uploaded | File |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for record in recent.iter().take(10) {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} |",
                record.employee_label(),
                record.cert_number.as_deref().unwrap_or("-"),
                record.training_name.as_deref().unwrap_or("-"),
                record.jp.map(|jp| jp.to_string()).unwrap_or_else(|| "-".to_string()),
                record.created_at.format("%Y-%m-%d %H:%M"),
                record
                    .file_url
                    .as_deref()
                    .map(|url| format!("[PDF]({url})"))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    output
}

/// Write per-employee summaries as CSV with a header row.
pub fn write_summaries_csv<W: std::io::Write>(
    writer: W,
    summaries: &[EmployeeSummary],
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}
