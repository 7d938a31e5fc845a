use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::{self, IngestionConfig};
use crate::database::{MemoryStore, SragStore};
use crate::srag::{IngestSummary, IngestionService};

fn ingestion_config(dir: Option<PathBuf>) -> IngestionConfig {
    let mut ingestion = config::config().ingestion.clone();
    if let Some(dir) = dir {
        ingestion.csv_dir = dir;
    }
    ingestion
}

fn report(summary: &IngestSummary, output_format: OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Text = output_format {
        for failure in &summary.failed {
            eprintln!("✗ {}: {}", failure.file, failure.error);
        }
    }

    output_success(
        output_format,
        &format!(
            "Inserted {} of {} rows from {} files ({} failed)",
            summary.inserted,
            summary.rows_read,
            summary.files.len(),
            summary.failed.len()
        ),
        Some(serde_json::to_value(summary)?),
    )
}

/// `srag ingest [--dir D] [--dry-run]`
pub async fn ingest(dir: Option<PathBuf>, dry_run: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let store: Arc<dyn SragStore> = if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        connect_store().await?
    };

    let service = IngestionService::new(store, ingestion_config(dir));
    let summary = service.ingest_all_csv_files().await?;
    report(&summary, output_format)
}

/// `srag init [--dir D]`
pub async fn init(dir: Option<PathBuf>, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = IngestionService::new(connect_store().await?, ingestion_config(dir));

    match service.init_ingestion_if_empty().await? {
        Some(summary) => report(&summary, output_format),
        None => output_success(
            output_format,
            "Table already has data, nothing ingested",
            Some(json!({ "skipped": true })),
        ),
    }
}
