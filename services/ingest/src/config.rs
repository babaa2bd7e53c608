//! Environment configuration shared by the services

use std::path::PathBuf;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Fs,
    Pg,
}

impl std::str::FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fs" => Ok(StoreKind::Fs),
            "pg" | "postgres" => Ok(StoreKind::Pg),
            other => Err(StoreError::Config(format!(
                "STORE_KIND must be 'fs' or 'pg', got '{}'",
                other
            ))),
        }
    }
}

/// Where sessions live
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub fs_dir: PathBuf,
    pub db_url: Option<String>,
}

impl StoreSettings {
    /// `STORE_KIND` (fs|pg, default fs), `STORE_FS_DIR`, `DB_URL`
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        Ok(Self {
            kind: var("STORE_KIND").as_deref().unwrap_or("fs").parse()?,
            fs_dir: PathBuf::from(
                var("STORE_FS_DIR").unwrap_or_else(|| "./data/sessions".to_string()),
            ),
            db_url: var("DB_URL"),
        })
    }
}
