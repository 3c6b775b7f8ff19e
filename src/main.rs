use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod aggregate;
mod config;
mod db;
mod error;
mod models;
mod report;
mod service;
mod storage;
mod telemetry;
#[cfg(test)]
mod testing;
mod validation;
mod view;

use crate::aggregate::ReportingDay;
use crate::config::AppConfig;
use crate::db::{PgRecordStore, RecordStore};
use crate::models::RecordFilter;
use crate::service::CertificateService;
use crate::storage::LocalBlobStore;
use crate::validation::{SubmissionForm, UploadedFile};
use crate::view::CertificateListView;

#[derive(Parser)]
#[command(name = "jp-tracker")]
#[command(about = "Training hour (JP) certificate tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import certificate rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Upload a certificate PDF and record it
    Submit {
        #[arg(long)]
        employee: String,
        #[arg(long)]
        cert_number: Option<String>,
        #[arg(long)]
        training: String,
        #[arg(long)]
        jp: i64,
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace the PDF attached to a certificate
    ReplaceFile {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a certificate and its file
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// List certificates, newest first
    List {
        #[arg(long)]
        employee: Option<String>,
        /// Case-insensitive search over employee, training and certificate number
        #[arg(long)]
        query: Option<String>,
    },
    /// Show totals and the employee ranking
    Summary {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Also export per-employee summaries as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&config.log_level)?;

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = PgRecordStore::new(pool);
    let blobs = LocalBlobStore::new(
        &config.storage.root,
        &config.storage.bucket,
        &config.storage.public_base_url,
    );
    let reporting = config.reporting.clone();
    let service = CertificateService::new(
        store,
        blobs,
        &config.storage.bucket,
        reporting.roster.clone(),
    );

    match cli.command {
        Commands::InitDb => {
            service.records().init_db().await?;
            println!("Schema ready.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(service.records(), &csv, &reporting.roster)
                .await
                .with_context(|| format!("import of {} stopped", csv.display()))?;
            println!("Inserted {inserted} certificates from {}.", csv.display());
        }
        Commands::Submit {
            employee,
            cert_number,
            training,
            jp,
            file,
        } => {
            let upload = UploadedFile::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let record = service
                .create_certificate(SubmissionForm {
                    employee_name: employee,
                    cert_number,
                    training_name: training,
                    jp: Some(jp),
                    file: Some(upload),
                })
                .await?;
            println!(
                "Certificate {} uploaded for {}. Thank you!",
                record.id,
                record.employee_label()
            );
        }
        Commands::ReplaceFile { id, file } => {
            let record = db::find_by_id(service.records(), id).await?;
            let upload = UploadedFile::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let url = service.replace_file(&record, upload).await?;
            println!("Certificate {id} now points to {url}.");
        }
        Commands::Delete { id } => {
            let record = db::find_by_id(service.records(), id).await?;
            service.delete_certificate(&record).await?;
            println!("Certificate {id} deleted.");
        }
        Commands::List { employee, query } => {
            let filter = employee.map(RecordFilter::employee).unwrap_or_default();
            let mut view = CertificateListView::default();
            let ticket = view.begin_fetch();
            let rows = service.list(&filter).await?;
            view.apply(ticket, rows);
            view.set_query(query.unwrap_or_default());

            let visible = view.visible();
            if visible.is_empty() {
                println!("No certificates found.");
                return Ok(());
            }

            for record in &visible {
                println!(
                    "- {} | {} | {} | {} | {} JP | {} | {}",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.employee_label(),
                    record.training_name.as_deref().unwrap_or("-"),
                    record.jp.map(|jp| jp.to_string()).unwrap_or_else(|| "-".to_string()),
                    record.cert_number.as_deref().unwrap_or("-"),
                    record.file_url.as_deref().unwrap_or("no file"),
                );
            }
            println!("{} of {} certificates shown.", visible.len(), view.rows().len());
        }
        Commands::Summary { limit, json } => {
            let records = service.records().select_all(&RecordFilter::default()).await?;
            let today = ReportingDay::now(reporting.day_boundary);
            let summaries = aggregate::aggregate_by_employee(&records, reporting.target);
            let global = aggregate::compute_global_summary(
                &records,
                reporting.roster.len(),
                reporting.target,
                today,
            );

            if json {
                let payload = serde_json::json!({
                    "summary": global,
                    "employees": summaries,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            println!(
                "Total JP {} across {} certificates; {} employees, average {:.1} JP; {} uploaded today.",
                global.total_jp,
                global.total_certificates,
                global.employee_count,
                global.average_jp,
                global.uploads_today
            );
            println!(
                "Reached the {} JP target: {}{}",
                global.target,
                global.reached_target_count,
                if global.roster_size > 0 {
                    format!(" of {}", global.roster_size)
                } else {
                    String::new()
                }
            );

            if summaries.is_empty() {
                println!("No certificates uploaded yet.");
                return Ok(());
            }

            println!("Top employees by JP:");
            for summary in summaries.iter().take(limit) {
                println!(
                    "- {} {} JP across {} certificates ({}%){}",
                    summary.name,
                    summary.total_jp,
                    summary.certificate_count,
                    summary.progress_percent,
                    if summary.reached_target { ", target reached" } else { "" }
                );
            }
        }
        Commands::Report { out, csv } => {
            let records = service.records().select_all(&RecordFilter::default()).await?;
            let today = ReportingDay::now(reporting.day_boundary);
            let report = report::build_report(&records, &reporting.roster, reporting.target, today);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());

            if let Some(path) = csv {
                let summaries = aggregate::aggregate_by_employee(&records, reporting.target);
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                report::write_summaries_csv(file, &summaries)?;
                println!("Summaries written to {}.", path.display());
            }
        }
    }

    Ok(())
}
