mod common;

use anyhow::Result;
use std::sync::Arc;

use common::{generated_rows, ingestion_config, write_csv, FaultyStore};
use srag_api::database::{MemoryStore, SragQuery, SragStore};
use srag_api::srag::loader::BatchLoader;
use srag_api::srag::{IngestError, IngestionService};

#[tokio::test]
async fn flushes_once_per_thousand_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;

    for (rows, expected_flushes) in [(2500usize, 3usize), (1000, 1), (1, 1), (0, 0)] {
        let path = write_csv(dir.path(), &format!("rows_{rows}.csv"), &generated_rows("f", rows))?;
        let store = MemoryStore::new();

        let stats = BatchLoader::new(&store, 1000).load_file(&path).await?;

        assert_eq!(store.create_many_calls(), expected_flushes, "{rows} rows");
        assert_eq!(stats.batches as usize, expected_flushes);
        assert_eq!(stats.rows_read as usize, rows);
        assert_eq!(stats.inserted as usize, rows);
        assert_eq!(store.len().await, rows);
    }
    Ok(())
}

#[tokio::test]
async fn inserted_total_excludes_duplicates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut rows = generated_rows("dup", 5);
    rows.extend(generated_rows("dup", 3));
    let path = write_csv(dir.path(), "dups.csv", &rows)?;

    let store = MemoryStore::new();
    let stats = BatchLoader::new(&store, 4).load_file(&path).await?;

    assert_eq!(stats.rows_read, 8);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.inserted, 5);
    Ok(())
}

#[tokio::test]
async fn malformed_fields_become_null() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_csv(dir.path(), "bad.csv", &["X1;;31/02/2024;;;M;abc;;NaN;1".to_string()])?;

    let store = Arc::new(MemoryStore::new());
    let service = IngestionService::new(store.clone(), ingestion_config(dir.path()));
    let summary = service.ingest_all_csv_files().await?;
    assert_eq!(summary.inserted, 1);

    let rows = store.find_many(&SragQuery::all()).await?;
    let row = &rows[0];
    assert_eq!(row.notification_id.as_deref(), Some("X1"));
    assert_eq!(row.onset_date, None);
    assert_eq!(row.age, None);
    assert_eq!(row.outcome, None);
    assert_eq!(row.icu, None);
    assert_eq!(row.state_code, None);
    assert_eq!(row.vaccinated, Some(1));
    Ok(())
}

#[tokio::test]
async fn second_init_performs_no_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_csv(dir.path(), "a.csv", &generated_rows("a", 10))?;

    let store = Arc::new(MemoryStore::new());
    let service = IngestionService::new(store.clone(), ingestion_config(dir.path()));

    let first = service.init_ingestion_if_empty().await?.expect("table was empty");
    assert_eq!(first.inserted, 10);
    let calls = store.create_many_calls();

    assert!(service.init_ingestion_if_empty().await?.is_none());
    assert_eq!(store.create_many_calls(), calls);
    assert_eq!(store.len().await, 10);
    Ok(())
}

#[tokio::test]
async fn failing_file_does_not_stop_the_others() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_csv(dir.path(), "a.csv", &generated_rows("a", 3))?;
    let mut poisoned = generated_rows("b", 2);
    poisoned.push("POISON;2024-01-01;2024-01-01;RJ;330455;M;40;1;2;2".to_string());
    write_csv(dir.path(), "b.CSV", &poisoned)?;
    write_csv(dir.path(), "c.csv", &generated_rows("c", 4))?;
    std::fs::write(dir.path().join("readme.txt"), "not data")?;

    let store = Arc::new(FaultyStore { poison_id: Some("POISON".into()), ..Default::default() });
    let service = IngestionService::new(store.clone(), ingestion_config(dir.path()));
    let summary = service.ingest_all_csv_files().await?;

    assert_eq!(summary.files, vec!["a.csv", "c.csv"]);
    assert_eq!(summary.inserted, 7);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].file, "b.CSV");
    assert_eq!(store.inner.len().await, 7);
    Ok(())
}

#[tokio::test]
async fn missing_or_empty_directory_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(MemoryStore::new());

    let missing = IngestionService::new(store.clone(), ingestion_config(&dir.path().join("absent")));
    assert!(matches!(missing.ingest_all_csv_files().await, Err(IngestError::DirectoryMissing(_))));

    let empty = IngestionService::new(store.clone(), ingestion_config(dir.path()));
    assert!(matches!(empty.init_ingestion_if_empty().await, Err(IngestError::NoCsvFiles(_))));
    assert_eq!(store.create_many_calls(), 0);
    Ok(())
}
