use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::models::{CertificateRecord, EmployeeSummary, GlobalSummary};

/// Training hours each employee is expected to collect.
pub const DEFAULT_TARGET: i64 = 20;

/// Rule for mapping a stored timestamp onto a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    #[default]
    Utc,
    Local,
}

impl DayBoundary {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "utc" => Some(Self::Utc),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn day_of(self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => timestamp.date_naive(),
            Self::Local => timestamp.with_timezone(&Local).date_naive(),
        }
    }
}

/// The calendar day a summary is evaluated against.
///
/// "Uploads today" depends on this value, so two summaries of the same
/// records taken on different days legitimately disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingDay {
    pub date: NaiveDate,
    pub boundary: DayBoundary,
}

impl ReportingDay {
    pub fn now(boundary: DayBoundary) -> Self {
        Self {
            date: boundary.day_of(Utc::now()),
            boundary,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.boundary.day_of(timestamp) == self.date
    }
}

/// Fields consulted by [`filter_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    EmployeeName,
    TrainingName,
    CertNumber,
}

impl SearchField {
    fn value(self, record: &CertificateRecord) -> &str {
        let value = match self {
            Self::EmployeeName => &record.employee_name,
            Self::TrainingName => &record.training_name,
            Self::CertNumber => &record.cert_number,
        };
        value.as_deref().unwrap_or("")
    }
}

pub const DEFAULT_SEARCH_FIELDS: [SearchField; 3] = [
    SearchField::EmployeeName,
    SearchField::TrainingName,
    SearchField::CertNumber,
];

pub fn progress_percent(total_jp: i64, target: i64) -> u8 {
    if target <= 0 {
        return 100;
    }
    let percent = (total_jp as f64 / target as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

pub fn aggregate_by_employee(records: &[CertificateRecord], target: i64) -> Vec<EmployeeSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(&str, i64, usize)> = Vec::new();

    for record in records {
        let label = record.employee_label();
        let slot = *index.entry(label).or_insert_with(|| {
            totals.push((label, 0, 0));
            totals.len() - 1
        });
        let entry = &mut totals[slot];
        entry.1 += record.credited_jp();
        entry.2 += 1;
    }

    let mut summaries: Vec<EmployeeSummary> = totals
        .into_iter()
        .map(|(name, total_jp, certificate_count)| EmployeeSummary {
            name: name.to_string(),
            total_jp,
            certificate_count,
            reached_target: total_jp >= target,
            progress_percent: progress_percent(total_jp, target),
        })
        .collect();

    // stable: equal totals keep first-seen order
    summaries.sort_by(|a, b| b.total_jp.cmp(&a.total_jp));
    summaries
}

pub fn compute_global_summary(
    records: &[CertificateRecord],
    roster_size: usize,
    target: i64,
    today: ReportingDay,
) -> GlobalSummary {
    let summaries = aggregate_by_employee(records, target);
    let total_jp: i64 = records.iter().map(CertificateRecord::credited_jp).sum();
    let employee_count = summaries.len();

    GlobalSummary {
        total_certificates: records.len(),
        total_jp,
        employee_count,
        average_jp: total_jp as f64 / employee_count.max(1) as f64,
        reached_target_count: summaries.iter().filter(|s| s.reached_target).count(),
        top_employee: summaries.into_iter().next(),
        roster_size,
        uploads_today: records
            .iter()
            .filter(|record| today.contains(record.created_at))
            .count(),
        target,
    }
}

pub fn filter_records(
    records: &[CertificateRecord],
    query: &str,
    fields: &[SearchField],
) -> Vec<CertificateRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            fields
                .iter()
                .map(|field| field.value(record))
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
                .contains(&needle)
        })
        .cloned()
        .collect()
}

/// Roster members that have not uploaded anything yet, in roster order.
pub fn roster_without_uploads(roster: &[String], summaries: &[EmployeeSummary]) -> Vec<String> {
    roster
        .iter()
        .filter(|name| {
            let name = name.trim();
            !summaries.iter().any(|summary| summary.name == name)
        })
        .cloned()
        .collect()
}
