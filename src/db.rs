use std::path::Path;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{CertificatePatch, CertificateRecord, NewCertificate, RecordFilter};
use crate::validation;

/// Durable storage for certificate rows.
pub trait RecordStore {
    async fn insert(&self, certificate: NewCertificate) -> Result<CertificateRecord, StoreError>;

    /// All matching rows, newest first.
    async fn select_all(&self, filter: &RecordFilter) -> Result<Vec<CertificateRecord>, StoreError>;

    async fn update(&self, id: Uuid, patch: &CertificatePatch) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_db(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> CertificateRecord {
    CertificateRecord {
        id: row.get("id"),
        employee_name: row.get("employee_name"),
        cert_number: row.get("cert_number"),
        training_name: row.get("training_name"),
        jp: row.get("jp"),
        file_url: row.get("file_url"),
        created_at: row.get("created_at"),
    }
}

impl RecordStore for PgRecordStore {
    async fn insert(&self, certificate: NewCertificate) -> Result<CertificateRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO jp_tracker.certificates
            (id, employee_name, cert_number, training_name, jp, file_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, employee_name, cert_number, training_name, jp, file_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&certificate.employee_name)
        .bind(&certificate.cert_number)
        .bind(&certificate.training_name)
        .bind(certificate.jp)
        .bind(&certificate.file_url)
        .fetch_one(&self.pool)
        .await?;

        let record = record_from_row(&row);
        tracing::info!(id = %record.id, employee = %certificate.employee_name, "certificate inserted");
        Ok(record)
    }

    async fn select_all(&self, filter: &RecordFilter) -> Result<Vec<CertificateRecord>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, employee_name, cert_number, training_name, jp, file_url, created_at \
             FROM jp_tracker.certificates",
        );

        let mut keyword = " WHERE ";
        if let Some(id) = filter.id {
            builder.push(keyword).push("id = ").push_bind(id);
            keyword = " AND ";
        }
        if let Some(name) = &filter.employee_name {
            builder.push(keyword).push("employee_name = ").push_bind(name);
        }
        builder.push(" ORDER BY created_at DESC");

        let records = builder.build().fetch_all(&self.pool).await?;
        Ok(records.iter().map(record_from_row).collect())
    }

    async fn update(&self, id: Uuid, patch: &CertificatePatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE jp_tracker.certificates SET ");
        {
            let mut columns = builder.separated(", ");
            if let Some(value) = &patch.employee_name {
                columns.push("employee_name = ").push_bind_unseparated(value);
            }
            if let Some(value) = &patch.cert_number {
                columns.push("cert_number = ").push_bind_unseparated(value);
            }
            if let Some(value) = &patch.training_name {
                columns.push("training_name = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.jp {
                columns.push("jp = ").push_bind_unseparated(value);
            }
            if let Some(value) = &patch.file_url {
                columns.push("file_url = ").push_bind_unseparated(value);
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::info!(%id, "certificate updated");
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM jp_tracker.certificates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::info!(%id, "certificate deleted");
        Ok(())
    }
}

/// Look up a single certificate by id.
pub async fn find_by_id<S: RecordStore>(store: &S, id: Uuid) -> Result<CertificateRecord, StoreError> {
    store
        .select_all(&RecordFilter::id(id))
        .await?
        .into_iter()
        .next()
        .ok_or(StoreError::NotFound(id))
}

/// Bulk-load certificate rows that already have a file URL (or none).
///
/// Rows are validated like form submissions, minus the file. The first
/// invalid row aborts the import; rows before it stay inserted.
pub async fn import_csv<S: RecordStore>(
    store: &S,
    csv_path: &Path,
    roster: &[String],
) -> Result<usize, StoreError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        employee_name: String,
        cert_number: Option<String>,
        training_name: String,
        jp: Option<i64>,
        file_url: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let mut certificate = validation::validate_certificate(
            &row.employee_name,
            row.cert_number.as_deref(),
            &row.training_name,
            row.jp,
            roster,
        )
        .map_err(|source| StoreError::InvalidRow {
            row: index + 1,
            source,
        })?;
        certificate.file_url = row.file_url.filter(|url| !url.trim().is_empty());

        store.insert(certificate).await?;
        inserted += 1;
    }

    Ok(inserted)
}
