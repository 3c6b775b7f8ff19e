//! Checks applied to submitted certificate data before any store is touched.

use std::fmt;
use std::path::Path;

use crate::models::{NewCertificate, PLACEHOLDER};

/// Largest accepted certificate file (10 MiB).
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left empty.
    Missing(&'static str),
    /// Employee is not on the configured roster.
    NotOnRoster(String),
    /// JP must be a positive whole number.
    InvalidJp(i64),
    /// Certificates must be PDF documents.
    NotPdf(String),
    FileTooLarge { size: usize, max: usize },
    EmptyFile,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Missing(field) => write!(f, "{} is required", field),
            ValidationError::NotOnRoster(name) => {
                write!(f, "{} is not on the employee roster", name)
            }
            ValidationError::InvalidJp(value) => {
                write!(f, "jp must be a whole number of at least 1 (got {})", value)
            }
            ValidationError::NotPdf(content_type) => {
                write!(f, "certificate must be a PDF (got {})", content_type)
            }
            ValidationError::FileTooLarge { size, max } => {
                write!(f, "file is {} bytes, the limit is {} bytes", size, max)
            }
            ValidationError::EmptyFile => write!(f, "file is empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Reads a file from disk, guessing its content type from the extension.
    ///
    /// Files over [`MAX_FILE_BYTES`] are refused before their contents are
    /// loaded; the error wraps [`ValidationError::FileTooLarge`].
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let size = usize::try_from(tokio::fs::metadata(path).await?.len()).unwrap_or(usize::MAX);
        if size > MAX_FILE_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                ValidationError::FileTooLarge {
                    size,
                    max: MAX_FILE_BYTES,
                },
            ));
        }

        let bytes = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sertifikat.pdf".to_string());

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

/// Raw input of the certificate upload form.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub employee_name: String,
    pub cert_number: Option<String>,
    pub training_name: String,
    pub jp: Option<i64>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub certificate: NewCertificate,
    pub file: UploadedFile,
}

/// Validate the form, returning the first problem found.
///
/// The roster check is skipped when `roster` is empty.
pub fn validate_submission(
    form: SubmissionForm,
    roster: &[String],
) -> Result<ValidSubmission, ValidationError> {
    let certificate = validate_certificate(
        &form.employee_name,
        form.cert_number.as_deref(),
        &form.training_name,
        form.jp,
        roster,
    )?;
    let file = form.file.ok_or(ValidationError::Missing("file"))?;
    validate_file(&file)?;

    Ok(ValidSubmission { certificate, file })
}

/// Validate certificate metadata without a file, as used by bulk imports.
pub fn validate_certificate(
    employee_name: &str,
    cert_number: Option<&str>,
    training_name: &str,
    jp: Option<i64>,
    roster: &[String],
) -> Result<NewCertificate, ValidationError> {
    let employee_name = employee_name.trim();
    if employee_name.is_empty() {
        return Err(ValidationError::Missing("employee name"));
    }
    if !roster.is_empty() && !roster.iter().any(|name| name.trim() == employee_name) {
        return Err(ValidationError::NotOnRoster(employee_name.to_string()));
    }

    let training_name = training_name.trim();
    if training_name.is_empty() {
        return Err(ValidationError::Missing("training name"));
    }

    let jp = jp.ok_or(ValidationError::Missing("jp"))?;
    let jp = i32::try_from(jp)
        .ok()
        .filter(|value| *value >= 1)
        .ok_or(ValidationError::InvalidJp(jp))?;

    Ok(NewCertificate {
        employee_name: employee_name.to_string(),
        cert_number: canonical_cert_number(cert_number),
        training_name: training_name.to_string(),
        jp,
        file_url: None,
    })
}

pub fn validate_file(file: &UploadedFile) -> Result<(), ValidationError> {
    if !file.content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        return Err(ValidationError::NotPdf(file.content_type.clone()));
    }
    if file.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    if file.bytes.len() > MAX_FILE_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: file.bytes.len(),
            max: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

pub fn canonical_cert_number(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(number) if !number.is_empty() => number.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}
