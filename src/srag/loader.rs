//! Streaming CSV -> batched insert.
//!
//! The reader is pull-based: rows are only read while no insert is in flight,
//! so at most one batch of parsed records is held in memory per file.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::database::SragStore;
use super::error::IngestError;
use super::parser::{parse_row, RawRow};
use super::record::IngestionRecord;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// `;`-separated, `"`-quoted CSV with a header row
pub struct CsvSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: Vec<String>,
    record: csv::ByteRecord,
}

impl CsvSource {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let csv_err = |source| IngestError::Csv { path: path.to_path_buf(), source };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .quote(b'"')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        // DataSUS exports are frequently Latin-1; decode lossily instead of failing the file
        let headers = reader
            .byte_headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            record: csv::ByteRecord::new(),
        })
    }

    /// Next non-blank row as header -> value, `None` at end of stream
    pub fn next_row(&mut self) -> Result<Option<RawRow>, IngestError> {
        loop {
            let more = self
                .reader
                .read_byte_record(&mut self.record)
                .map_err(|source| IngestError::Csv { path: self.path.clone(), source })?;
            if !more {
                return Ok(None);
            }
            if self.record.iter().all(|field| field.is_empty()) {
                continue;
            }

            let row = self
                .headers
                .iter()
                .zip(self.record.iter())
                .map(|(h, v)| (h.clone(), String::from_utf8_lossy(v).into_owned()))
                .collect();
            return Ok(Some(row));
        }
    }

    /// Parse rows into `buffer` until it holds `capacity` records or the stream ends.
    /// Returns `false` once the stream is exhausted.
    pub fn fill(&mut self, buffer: &mut Vec<IngestionRecord>, capacity: usize) -> Result<bool, IngestError> {
        while buffer.len() < capacity {
            match self.next_row()? {
                Some(row) => buffer.push(parse_row(&row)),
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_read: u64,
    pub batches: u64,
    /// Rows actually inserted; duplicates skipped by the store are not counted
    pub inserted: u64,
}

pub struct BatchLoader<'a> {
    store: &'a dyn SragStore,
    batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(store: &'a dyn SragStore, batch_size: usize) -> Self {
        Self { store, batch_size: batch_size.max(1) }
    }

    /// Stream one file into the store. A storage error aborts the rest of the file.
    pub async fn load_file(&self, path: &Path) -> Result<LoadStats, IngestError> {
        let open_path = path.to_path_buf();
        let mut source = tokio::task::spawn_blocking(move || CsvSource::open(&open_path)).await??;

        let mut stats = LoadStats::default();
        let mut buffer: Vec<IngestionRecord> = Vec::with_capacity(self.batch_size);
        let mut more = true;

        while more {
            // Reading blocks on file I/O, so it runs off the async workers. The
            // buffer travels with the source and comes back filled.
            let capacity = self.batch_size;
            let (returned_source, returned_buffer, result) = tokio::task::spawn_blocking(move || {
                let result = source.fill(&mut buffer, capacity);
                (source, buffer, result)
            })
            .await?;
            source = returned_source;
            buffer = returned_buffer;
            more = result?;

            if buffer.is_empty() {
                break;
            }
            let inserted = self.flush(&mut buffer, &mut stats).await?;
            stats.inserted += inserted;
        }

        Ok(stats)
    }

    /// Take everything out of the buffer, then write it. Records read after
    /// this point land in a fresh buffer.
    async fn flush(&self, buffer: &mut Vec<IngestionRecord>, stats: &mut LoadStats) -> Result<u64, IngestError> {
        let batch = std::mem::replace(buffer, Vec::with_capacity(self.batch_size));
        let size = batch.len();
        stats.rows_read += size as u64;
        stats.batches += 1;

        let inserted = self.store.create_many(batch).await?;
        debug!(batch = stats.batches, size, inserted, "flushed batch");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn reads_semicolon_quoted_rows() {
        let file = write_csv(b"NU_NOTIFIC;DT_SIN_PRI;SG_UF\n\"1\";\"2024-01-15\";\" SP \"\n\n;;\n2;2024-02-01;RJ\n");
        let mut source = CsvSource::open(file.path()).unwrap();

        let first = source.next_row().unwrap().unwrap();
        assert_eq!(first.get("NU_NOTIFIC").map(String::as_str), Some("1"));
        assert_eq!(first.get("SG_UF").map(String::as_str), Some("SP"));

        // blank and all-empty lines are skipped
        let second = source.next_row().unwrap().unwrap();
        assert_eq!(second.get("SG_UF").map(String::as_str), Some("RJ"));
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn tolerates_latin1_bytes() {
        let file = write_csv(b"NU_NOTIFIC;ID_MUNICIP\n7;S\xe3o Paulo\n");
        let mut source = CsvSource::open(file.path()).unwrap();
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.get("NU_NOTIFIC").map(String::as_str), Some("7"));
        assert!(row.get("ID_MUNICIP").unwrap().starts_with('S'));
    }

    #[test]
    fn fill_stops_at_capacity_and_reports_exhaustion() {
        let file = write_csv(b"NU_NOTIFIC\n1\n2\n3\n");
        let mut source = CsvSource::open(file.path()).unwrap();
        let mut buffer = Vec::new();

        assert!(source.fill(&mut buffer, 2).unwrap());
        assert_eq!(buffer.len(), 2);
        buffer.clear();
        assert!(!source.fill(&mut buffer, 2).unwrap());
        assert_eq!(buffer.len(), 1);
    }
}
