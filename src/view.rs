use std::sync::atomic::{AtomicU64, Ordering};

use crate::aggregate::{self, SearchField, DEFAULT_SEARCH_FIELDS};
use crate::models::CertificateRecord;

/// Identifies one outstanding fetch issued by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Tracks the most recent fetch so that superseded results can be dropped.
#[derive(Debug, Default)]
pub struct LatestRequest {
    latest: AtomicU64,
}

impl LatestRequest {
    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}

/// Certificate rows shown by a list, plus the search box state.
#[derive(Debug, Default)]
pub struct CertificateListView {
    requests: LatestRequest,
    rows: Vec<CertificateRecord>,
    query: String,
}

impl CertificateListView {
    pub fn begin_fetch(&self) -> FetchTicket {
        self.requests.begin()
    }

    /// Apply a fetch result. Returns `false` and drops `rows` when a newer
    /// fetch has been issued since `ticket`.
    pub fn apply(&mut self, ticket: FetchTicket, rows: Vec<CertificateRecord>) -> bool {
        if !self.requests.is_current(ticket) {
            tracing::debug!(?ticket, "discarding stale certificate fetch");
            return false;
        }
        self.rows = rows;
        true
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn rows(&self) -> &[CertificateRecord] {
        &self.rows
    }

    pub fn visible(&self) -> Vec<CertificateRecord> {
        self.visible_by(&DEFAULT_SEARCH_FIELDS)
    }

    pub fn visible_by(&self, fields: &[SearchField]) -> Vec<CertificateRecord> {
        aggregate::filter_records(&self.rows, &self.query, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn row(name: &str, training: &str) -> CertificateRecord {
        CertificateRecord {
            id: Uuid::new_v4(),
            employee_name: Some(name.to_string()),
            cert_number: None,
            training_name: Some(training.to_string()),
            jp: Some(4),
            file_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_latest_ticket_is_current() {
        let requests = LatestRequest::default();
        let first = requests.begin();
        assert!(requests.is_current(first));

        let second = requests.begin();
        assert!(!requests.is_current(first));
        assert!(requests.is_current(second));
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut view = CertificateListView::default();
        let stale = view.begin_fetch();
        let fresh = view.begin_fetch();

        assert!(view.apply(fresh, vec![row("Ani", "Pelatihan SE")]));
        assert!(!view.apply(stale, vec![row("Budi", "Diklat"), row("Citra", "Diklat")]));
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].employee_name.as_deref(), Some("Ani"));
    }

    #[test]
    fn search_filters_visible_rows() {
        let mut view = CertificateListView::default();
        let ticket = view.begin_fetch();
        view.apply(
            ticket,
            vec![row("Ani", "Pelatihan SE"), row("Budi", "Diklat Statistik")],
        );

        view.set_query("STATISTIK");
        let visible = view.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].employee_name.as_deref(), Some("Budi"));
        assert!(view.visible_by(&[SearchField::EmployeeName]).is_empty());

        view.set_query("");
        assert_eq!(view.visible().len(), 2);
    }
}
