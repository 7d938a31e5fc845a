use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::IngestionConfig;
use crate::database::{SragQuery, SragStore};
use super::error::IngestError;
use super::loader::BatchLoader;

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of one ingestion run over the CSV directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    /// Files fully processed, in processing order
    pub files: Vec<String>,
    pub rows_read: u64,
    pub inserted: u64,
    pub failed: Vec<FileFailure>,
}

/// Loads every CSV file of the configured directory into the store
pub struct IngestionService {
    store: Arc<dyn SragStore>,
    config: IngestionConfig,
}

impl IngestionService {
    pub fn new(store: Arc<dyn SragStore>, config: IngestionConfig) -> Self {
        Self { store, config }
    }

    /// Ingest only when the table is empty. Returns `None` when data already exists.
    pub async fn init_ingestion_if_empty(&self) -> Result<Option<IngestSummary>, IngestError> {
        let existing = self.store.count(&SragQuery::all()).await?;
        if existing > 0 {
            tracing::info!("Table already holds {} records, skipping ingestion", existing);
            return Ok(None);
        }

        tracing::info!("Table is empty, starting ingestion from {}", self.config.csv_dir.display());
        self.ingest_all_csv_files().await.map(Some)
    }

    /// Process the directory's CSV files one after another in name order.
    /// A failing file is logged and recorded; the remaining files still run.
    pub async fn ingest_all_csv_files(&self) -> Result<IngestSummary, IngestError> {
        let files = list_csv_files(&self.config.csv_dir).await?;
        let loader = BatchLoader::new(self.store.as_ref(), self.config.batch_size);
        let mut summary = IngestSummary::default();

        for path in files {
            let name = file_label(&path);
            tracing::info!("Processing {}", name);

            match loader.load_file(&path).await {
                Ok(stats) => {
                    tracing::info!(
                        "Finished {}: {} rows read, {} inserted in {} batches",
                        name, stats.rows_read, stats.inserted, stats.batches
                    );
                    summary.rows_read += stats.rows_read;
                    summary.inserted += stats.inserted;
                    summary.files.push(name);
                }
                Err(e) => {
                    tracing::error!("Failed to process {}: {}", name, e);
                    summary.failed.push(FileFailure { file: name, error: e.to_string() });
                }
            }
        }

        tracing::info!(
            "Ingestion complete: {} inserted from {} files ({} failed)",
            summary.inserted,
            summary.files.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Regular files ending in `.csv` (any case), sorted by file name
pub async fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let io_err = |source| IngestError::Io { path: dir.to_path_buf(), source };

    if !tokio::fs::try_exists(dir).await.map_err(io_err)? {
        return Err(IngestError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && entry.file_type().await.map_err(io_err)?.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(IngestError::NoCsvFiles(dir.to_path_buf()));
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
