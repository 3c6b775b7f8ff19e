use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Label used for blank employee names and blank certificate numbers.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateRecord {
    pub id: Uuid,
    pub employee_name: Option<String>,
    pub cert_number: Option<String>,
    pub training_name: Option<String>,
    pub jp: Option<i32>,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CertificateRecord {
    /// Grouping key for aggregation: the trimmed name, or the placeholder.
    pub fn employee_label(&self) -> &str {
        match self.employee_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => PLACEHOLDER,
        }
    }

    /// Training hours this record contributes; missing or negative counts as zero.
    pub fn credited_jp(&self) -> i64 {
        self.jp.map(|jp| i64::from(jp.max(0))).unwrap_or(0)
    }
}

/// Insertable subset of a certificate row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCertificate {
    pub employee_name: String,
    pub cert_number: String,
    pub training_name: String,
    pub jp: i32,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificatePatch {
    pub employee_name: Option<String>,
    pub cert_number: Option<String>,
    pub training_name: Option<String>,
    pub jp: Option<i32>,
    pub file_url: Option<String>,
}

impl CertificatePatch {
    pub fn file_url(url: impl Into<String>) -> Self {
        Self {
            file_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.employee_name.is_none()
            && self.cert_number.is_none()
            && self.training_name.is_none()
            && self.jp.is_none()
            && self.file_url.is_none()
    }
}

/// Exact-match conditions for `select_all`; unset fields match every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub id: Option<Uuid>,
    pub employee_name: Option<String>,
}

impl RecordFilter {
    pub fn id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn employee(name: impl Into<String>) -> Self {
        Self {
            employee_name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub name: String,
    pub total_jp: i64,
    pub certificate_count: usize,
    pub reached_target: bool,
    pub progress_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSummary {
    pub total_certificates: usize,
    pub total_jp: i64,
    pub employee_count: usize,
    pub average_jp: f64,
    pub top_employee: Option<EmployeeSummary>,
    pub reached_target_count: usize,
    pub roster_size: usize,
    pub uploads_today: usize,
    pub target: i64,
}
