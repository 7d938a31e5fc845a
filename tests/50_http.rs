mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{app_state, bearer, date, seeded_store, Case, FaultyStore};
use srag_api::app::app;

fn router() -> Router {
    let cases = (1..=12u32)
        .map(|day| {
            let case = Case::new(format!("h{day}"), Some(date(2024, 1, day)), "SP");
            if day % 4 == 0 { case.death() } else { case }
        })
        .collect();
    app(app_state(seeded_store(cases)))
}

async fn get(router: Router, uri: &str, auth: Option<String>) -> Result<(StatusCode, Value)> {
    let mut request = Request::builder().uri(uri);
    if let Some(auth) = auth {
        request = request.header(header::AUTHORIZATION, auth);
    }
    let response = router.oneshot(request.body(Body::empty())?).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let (status, body) = get(router(), "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = get(router(), "/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn srag_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let (status, body) = get(router(), "/api/v1/srag/list", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = get(router(), "/api/v1/srag/list", Some("Bearer not-a-jwt".into())).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn list_endpoint_pages_with_camel_case_params() -> Result<()> {
    let (status, body) = get(router(), "/api/v1/srag/list?page=2&itemsPerPage=5&sgUf=SP", Some(bearer())).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["total"], 12);
    assert_eq!(pagination["totalPages"], 3);
    assert_eq!(pagination["hasNext"], true);
    assert_eq!(pagination["hasPrev"], true);
    assert_eq!(body["data"]["data"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn chart_and_metrics_endpoints() -> Result<()> {
    let (status, body) = get(router(), "/api/v1/srag/chart?period=monthly&groupBy=state&region=sp", Some(bearer())).await?;
    assert_eq!(status, StatusCode::OK);
    let points = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["date"], "2024-01-01");
    assert_eq!(points[0]["cases"], 12);
    assert_eq!(points[0]["deaths"], 3);

    let (status, body) = get(router(), "/api/v1/srag/metrics?region=SP&period=2024-01", Some(bearer())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mortalityRate"], 25.0);
    assert_eq!(body["data"]["caseIncreaseRate"], 0.0);
    assert_eq!(body["data"]["period"], "2024-01");

    let (status, body) = get(router(), "/api/v1/srag/metrics?period=2024-13", Some(bearer())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    Ok(())
}

#[tokio::test]
async fn storage_errors_surface_as_generic_500() -> Result<()> {
    let router = app(app_state(Arc::new(FaultyStore { fail_reads: true, ..Default::default() })));

    let (status, body) = get(router.clone(), "/api/v1/srag/chart", Some(bearer())).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to fetch chart data");

    let (status, body) = get(router, "/health", None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_json_404() -> Result<()> {
    let (status, body) = get(router(), "/api/v2/nothing", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn malformed_query_strings_get_json_400() -> Result<()> {
    for uri in [
        "/api/v1/srag/list?page=abc",
        "/api/v1/srag/chart?startDate=2024-01-01T00:00:00Z",
        "/api/v1/srag/chart?period=weekly",
    ] {
        let (status, body) = get(router(), uri, Some(bearer())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], true, "{uri}");
        assert_eq!(body["code"], "BAD_REQUEST", "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn list_rejects_out_of_range_paging_and_tolerates_date_like_codes() -> Result<()> {
    let max = i64::MAX;
    let (status, body) =
        get(router(), &format!("/api/v1/srag/list?page={max}&itemsPerPage={max}"), Some(bearer())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = get(router(), "/api/v1/srag/list?sgUf=2024-01-01", Some(bearer())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 0);
    Ok(())
}
