use std::sync::Arc;

use crate::config::{AppConfig, IngestionConfig, QueryConfig};
use crate::database::{DatabaseError, SragQuery, SragStore};
use super::chart::{self, ChartFilters, ChartPoint};
use super::error::{IngestError, SragError};
use super::ingest::{IngestSummary, IngestionService};
use super::list::{self, ListFilters, SragPage};
use super::metrics::{self, MetricsFilters, SragMetrics};

/// Entry point for the HTTP handlers and the CLI: one store, one set of limits.
#[derive(Clone)]
pub struct SragService {
    store: Arc<dyn SragStore>,
    ingestion: IngestionConfig,
    query: QueryConfig,
}

impl SragService {
    pub fn new(store: Arc<dyn SragStore>, ingestion: IngestionConfig, query: QueryConfig) -> Self {
        Self { store, ingestion, query }
    }

    pub fn from_config(store: Arc<dyn SragStore>, config: &AppConfig) -> Self {
        Self::new(store, config.ingestion.clone(), config.query.clone())
    }

    pub fn store(&self) -> &dyn SragStore {
        self.store.as_ref()
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        self.store.count(&SragQuery::all()).await
    }

    fn ingestion_service(&self) -> IngestionService {
        IngestionService::new(self.store.clone(), self.ingestion.clone())
    }

    pub async fn init_ingestion_if_empty(&self) -> Result<Option<IngestSummary>, IngestError> {
        self.ingestion_service().init_ingestion_if_empty().await
    }

    pub async fn ingest_all_csv_files(&self) -> Result<IngestSummary, IngestError> {
        self.ingestion_service().ingest_all_csv_files().await
    }

    pub async fn get_chart_data(&self, filters: &ChartFilters) -> Result<Vec<ChartPoint>, SragError> {
        chart::get_chart_data(self.store(), filters, self.query.chart_max_rows).await
    }

    pub async fn get_metrics(&self, filters: &MetricsFilters) -> Result<SragMetrics, SragError> {
        metrics::get_metrics(self.store(), filters).await
    }

    pub async fn get_srag_list(&self, filters: &ListFilters) -> Result<SragPage, SragError> {
        list::get_srag_list(self.store(), filters, self.query.default_items_per_page).await
    }
}
