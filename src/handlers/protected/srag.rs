use axum::extract::{rejection::QueryRejection, Extension, Query, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::srag::{ChartFilters, ChartPoint, ListFilters, MetricsFilters, SragMetrics, SragPage};

/// GET /api/v1/srag/health
pub async fn health(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    tracing::debug!("SRAG health check by {}", auth_user.subject);
    Ok(ApiResponse::success(json!({ "status": "ok" })))
}

/// GET /api/v1/srag/metrics?region&period
pub async fn metrics(
    State(state): State<AppState>,
    query: Result<Query<MetricsFilters>, QueryRejection>,
) -> ApiResult<SragMetrics> {
    let Query(filters) = query?;
    let metrics = state.service.get_metrics(&filters).await?;
    Ok(ApiResponse::success(metrics))
}

/// GET /api/v1/srag/chart?period&region&startDate&endDate&groupBy
pub async fn chart(
    State(state): State<AppState>,
    query: Result<Query<ChartFilters>, QueryRejection>,
) -> ApiResult<Vec<ChartPoint>> {
    let Query(filters) = query?;
    let points = state.service.get_chart_data(&filters).await?;
    Ok(ApiResponse::success(points))
}

/// GET /api/v1/srag/list?page&itemsPerPage&sgUf&coMunRes&startDate&endDate&evolucao&uti&vacinaCov
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListFilters>, QueryRejection>,
) -> ApiResult<SragPage> {
    let Query(filters) = query?;
    let page = state.service.get_srag_list(&filters).await?;
    Ok(ApiResponse::success(page))
}
