use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::aggregate::{DayBoundary, DEFAULT_TARGET};

/// Top-level configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub storage: StorageConfig,
    pub reporting: ReportingConfig,
    pub log_level: String,
}

/// Where certificate files live and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub bucket: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ReportingConfig {
    pub target: i64,
    pub roster: Vec<String>,
    pub day_boundary: DayBoundary,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JP_TARGET must be a positive integer (got '{0}')")]
    InvalidTarget(String),

    #[error("JP_DAY_BOUNDARY must be 'utc' or 'local' (got '{0}')")]
    InvalidDayBoundary(String),

    #[error("JP_BUCKET must not contain '/'")]
    InvalidBucket,

    #[error("failed to read roster file {path}: {source}")]
    Roster {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let target = match var("JP_TARGET") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|target| *target > 0)
                .ok_or(ConfigError::InvalidTarget(raw))?,
            None => DEFAULT_TARGET,
        };

        let day_boundary = match var("JP_DAY_BOUNDARY") {
            Some(raw) => DayBoundary::parse(&raw).ok_or(ConfigError::InvalidDayBoundary(raw))?,
            None => DayBoundary::default(),
        };

        let bucket = var("JP_BUCKET").unwrap_or_else(|| "sertifikat".to_string());
        if bucket.contains('/') {
            return Err(ConfigError::InvalidBucket);
        }

        let roster = match (var("JP_ROSTER_FILE"), var("JP_ROSTER")) {
            (Some(path), _) => {
                let path = PathBuf::from(path);
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Roster { path, source })?;
                parse_roster(contents.lines())
            }
            (None, Some(list)) => parse_roster(list.split(',')),
            (None, None) => Vec::new(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            storage: StorageConfig {
                root: PathBuf::from(var("JP_STORAGE_ROOT").unwrap_or_else(|| "storage".to_string())),
                bucket,
                public_base_url: var("JP_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8000".to_string()),
            },
            reporting: ReportingConfig {
                target,
                roster,
                day_boundary,
            },
            log_level: var("JP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Trimmed, non-empty, de-duplicated names in their original order.
fn parse_roster<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut roster: Vec<String> = Vec::new();
    for name in names.map(str::trim).filter(|name| !name.is_empty()) {
        if !roster.iter().any(|existing| existing == name) {
            roster.push(name.to_string());
        }
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_env_missing() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.storage.bucket, "sertifikat");
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.storage.public_base_url, "http://localhost:8000");
        assert_eq!(config.reporting.target, 20);
        assert!(config.reporting.roster.is_empty());
        assert_eq!(config.reporting.day_boundary, DayBoundary::Utc);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/jp"),
            ("JP_TARGET", "24"),
            ("JP_DAY_BOUNDARY", "local"),
            ("JP_ROSTER", " Ani , Budi,,Ani "),
            ("JP_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/jp"));
        assert_eq!(config.reporting.target, 24);
        assert_eq!(config.reporting.day_boundary, DayBoundary::Local);
        assert_eq!(config.reporting.roster, vec!["Ani", "Budi"]);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("JP_TARGET", "0")]),
            Err(ConfigError::InvalidTarget(_))
        ));
        assert!(matches!(
            load(&[("JP_TARGET", "twenty")]),
            Err(ConfigError::InvalidTarget(_))
        ));
        assert!(matches!(
            load(&[("JP_DAY_BOUNDARY", "wib")]),
            Err(ConfigError::InvalidDayBoundary(_))
        ));
        assert!(matches!(
            load(&[("JP_BUCKET", "a/b")]),
            Err(ConfigError::InvalidBucket)
        ));
    }

    #[test]
    fn roster_file_takes_precedence() {
        let path = std::env::temp_dir().join(format!("jp-roster-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "Amran Pratama Putra\n\nCitra\n").unwrap();

        let config = load(&[
            ("JP_ROSTER_FILE", path.to_str().unwrap()),
            ("JP_ROSTER", "Ani"),
        ])
        .unwrap();
        assert_eq!(config.reporting.roster, vec!["Amran Pratama Putra", "Citra"]);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            load(&[("JP_ROSTER_FILE", path.to_str().unwrap())]),
            Err(ConfigError::Roster { .. })
        ));
    }
}
