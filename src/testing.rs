//! In-memory stores with switchable failures for exercising the certificate flows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::db::RecordStore;
use crate::error::{BlobError, StoreError};
use crate::models::{CertificatePatch, CertificateRecord, NewCertificate, RecordFilter};
use crate::storage::{self, BlobStore};

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: Mutex<Vec<CertificateRecord>>,
    pub fail_inserts: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_deletes: AtomicBool,
}

fn injected() -> StoreError {
    StoreError::Sqlx(sqlx::Error::PoolTimedOut)
}

impl MemoryRecordStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<CertificateRecord> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn push(&self, record: CertificateRecord) {
        self.rows.lock().unwrap().push(record);
    }
}

impl RecordStore for MemoryRecordStore {
    async fn insert(&self, certificate: NewCertificate) -> Result<CertificateRecord, StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let record = CertificateRecord {
            id: Uuid::new_v4(),
            employee_name: Some(certificate.employee_name),
            cert_number: Some(certificate.cert_number),
            training_name: Some(certificate.training_name),
            jp: Some(certificate.jp),
            file_url: certificate.file_url,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn select_all(&self, filter: &RecordFilter) -> Result<Vec<CertificateRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<CertificateRecord> = rows
            .iter()
            .rev()
            .filter(|record| filter.id.map_or(true, |id| record.id == id))
            .filter(|record| match &filter.employee_name {
                Some(name) => record.employee_name.as_deref() == Some(name.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn update(&self, id: Uuid, patch: &CertificatePatch) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(value) = &patch.employee_name {
            record.employee_name = Some(value.clone());
        }
        if let Some(value) = &patch.cert_number {
            record.cert_number = Some(value.clone());
        }
        if let Some(value) = &patch.training_name {
            record.training_name = Some(value.clone());
        }
        if let Some(value) = patch.jp {
            record.jp = Some(value);
        }
        if let Some(value) = &patch.file_url {
            record.file_url = Some(value.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|record| record.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

pub const TEST_BUCKET: &str = "sertifikat";
pub const TEST_BASE_URL: &str = "https://abcd.supabase.co";

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail_uploads: AtomicBool,
    pub fail_removes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), BlobError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other("storage offline")));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(BlobError::AlreadyExists(path.to_string()));
        }
        objects.insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        storage::public_url(TEST_BASE_URL, TEST_BUCKET, path)
    }

    async fn remove(&self, path: &str) -> Result<(), BlobError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other("storage offline")));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }
}
