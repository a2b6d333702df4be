// Append-only transaction journal, one file per disbursement run

use async_trait::async_trait;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use std::{fmt, path::PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use crate::error::{AppError, AppResult};
use crate::ledger::models::NATIVE_ASSET_CODE;

/// Append-only text sink keyed by run id
#[async_trait]
pub trait JournalSink: Send + Sync {
    async fn append(&self, run_id: &str, line: &str) -> AppResult<()>;
}

/// One journal line
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub timestamp: DateTime<Local>,
    pub destination: String,
    pub amount: Decimal,
    /// `None` on success, the failure reason otherwise
    pub failure: Option<String>,
}

impl JournalEntry {
    pub fn success(destination: &str, amount: Decimal) -> Self {
        Self {
            timestamp: Local::now(),
            destination: destination.to_string(),
            amount,
            failure: None,
        }
    }

    pub fn failure(destination: &str, amount: Decimal, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            destination: destination.to_string(),
            amount,
            failure: Some(reason.into()),
        }
    }
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Transaction to {} for {} {}: ",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.destination,
            self.amount,
            NATIVE_ASSET_CODE
        )?;
        match &self.failure {
            None => write!(f, "Success"),
            Some(reason) => write!(f, "Failed - {}", reason),
        }
    }
}

/// Journal writing `<dir>/log_<run_id>.txt`
pub struct FileJournal {
    dir: PathBuf,
}

impl FileJournal {
    /// Open the journal, creating its directory when missing
    pub async fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Journal(format!("Failed to create log directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("log_{}.txt", run_id))
    }
}

#[async_trait]
impl JournalSink for FileJournal {
    async fn append(&self, run_id: &str, line: &str) -> AppResult<()> {
        let path = self.path_for(run_id);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::Journal(format!("Failed to open {}: {}", path.display(), e)))?;

        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
