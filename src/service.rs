//! Certificate flows that touch both the blob store and the record store.
//!
//! None of these flows are transactional. A certificate is created by an
//! upload followed by an insert; when the insert fails the uploaded file is
//! removed once on a best-effort basis and the failure is reported. Removing
//! a replaced or deleted file is likewise best-effort: a failed removal is
//! logged and never fails the surrounding action.

use chrono::Utc;
use tracing::{info, warn};

use crate::db::RecordStore;
use crate::error::CertificateError;
use crate::models::{CertificatePatch, CertificateRecord, RecordFilter};
use crate::storage::{self, BlobStore};
use crate::validation::{self, SubmissionForm, UploadedFile};

pub struct CertificateService<R, B> {
    records: R,
    blobs: B,
    bucket: String,
    roster: Vec<String>,
}

impl<R: RecordStore, B: BlobStore> CertificateService<R, B> {
    pub fn new(records: R, blobs: B, bucket: impl Into<String>, roster: Vec<String>) -> Self {
        Self {
            records,
            blobs,
            bucket: bucket.into(),
            roster,
        }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<CertificateRecord>, CertificateError> {
        self.records
            .select_all(filter)
            .await
            .map_err(CertificateError::Persistence)
    }

    pub async fn create_certificate(
        &self,
        form: SubmissionForm,
    ) -> Result<CertificateRecord, CertificateError> {
        let submission = validation::validate_submission(form, &self.roster)?;
        let mut certificate = submission.certificate;
        let file = submission.file;

        let path = storage::new_upload_path(&certificate.cert_number, Utc::now());
        self.blobs
            .upload(&path, &file.bytes, &file.content_type)
            .await
            .map_err(CertificateError::Upload)?;
        certificate.file_url = Some(self.blobs.public_url(&path));

        match self.records.insert(certificate).await {
            Ok(record) => {
                info!(id = %record.id, %path, "certificate created");
                Ok(record)
            }
            Err(err) => {
                warn!(%path, error = %err, "insert failed after upload, removing uploaded file");
                if let Err(cleanup) = self.blobs.remove(&path).await {
                    warn!(%path, error = %cleanup, "uploaded file left orphaned");
                }
                Err(CertificateError::Persistence(err))
            }
        }
    }

    /// Swap the PDF of an existing certificate, returning the new public URL.
    pub async fn replace_file(
        &self,
        record: &CertificateRecord,
        file: UploadedFile,
    ) -> Result<String, CertificateError> {
        validation::validate_file(&file)?;

        let path = storage::replacement_path(
            record.employee_name.as_deref().unwrap_or_default(),
            &file.file_name,
            Utc::now(),
        );
        self.blobs
            .upload(&path, &file.bytes, &file.content_type)
            .await
            .map_err(CertificateError::Upload)?;

        let new_url = self.blobs.public_url(&path);
        self.records
            .update(record.id, &CertificatePatch::file_url(new_url.clone()))
            .await
            .map_err(CertificateError::Persistence)?;
        info!(id = %record.id, %path, "certificate file replaced");

        self.remove_blob_for(record).await;
        Ok(new_url)
    }

    pub async fn delete_certificate(&self, record: &CertificateRecord) -> Result<(), CertificateError> {
        self.remove_blob_for(record).await;
        self.records
            .delete(record.id)
            .await
            .map_err(CertificateError::Persistence)?;
        info!(id = %record.id, "certificate deleted");
        Ok(())
    }

    async fn remove_blob_for(&self, record: &CertificateRecord) {
        let Some(path) = record
            .file_url
            .as_deref()
            .and_then(|url| storage::resolve_storage_path(url, &self.bucket))
        else {
            return;
        };

        if let Err(err) = self.blobs.remove(&path).await {
            warn!(id = %record.id, %path, error = %err, "failed to remove stored file");
        }
    }
}
