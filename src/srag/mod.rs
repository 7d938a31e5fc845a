//! SRAG case data: CSV ingestion and the chart, metrics and list queries.

pub mod chart;
pub mod error;
pub mod ingest;
pub mod list;
pub mod loader;
pub mod metrics;
pub mod parser;
pub mod record;
pub mod service;

pub use chart::{ChartFilters, ChartPeriod, ChartPoint, GroupBy};
pub use error::{IngestError, SragError};
pub use ingest::{IngestSummary, IngestionService};
pub use list::{ListFilters, Pagination, SragPage};
pub use metrics::{MetricsFilters, SragMetrics};
pub use record::{CaseFacts, IngestionRecord, SragRecord};
pub use service::SragService;
