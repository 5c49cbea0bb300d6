use crate::errors::EngineResult;
use crate::pricing::overrides::OverridePayload;
use crate::report::{self, PnlReport, ReportRequest};
use crate::state::{AppState, CounterSnapshot};
use axum::extract::{Query, State};
use axum::response::Json;
use std::sync::Arc;
use std::time::Instant;

/// GET /options-strategy-pnl -- P&L rows priced from market premiums only
pub async fn get_strategy_pnl(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportRequest>,
) -> EngineResult<Json<PnlReport>> {
    respond(&state, &params, None).await
}

/// POST /options-strategy-pnl-custom -- same, with caller-supplied premiums.
///
/// The body may carry per-strike premiums under `calls` / `puts`, leg
/// premiums under a strategy name, or both.
pub async fn post_strategy_pnl_custom(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportRequest>,
    Json(body): Json<serde_json::Value>,
) -> EngineResult<Json<PnlReport>> {
    let payload = match OverridePayload::from_json(&body) {
        Ok(p) => {
            tracing::debug!(
                ticker = %params.ticker,
                strike_overrides = !p.strikes.is_empty(),
                "premium payload parsed"
            );
            p
        }
        Err(e) => {
            state.counters.record_failure();
            tracing::warn!(ticker = %params.ticker, error = %e, "rejected premium payload");
            return Err(e);
        }
    };
    respond(&state, &params, Some(&payload)).await
}

async fn respond(
    state: &AppState,
    params: &ReportRequest,
    overrides: Option<&OverridePayload>,
) -> EngineResult<Json<PnlReport>> {
    let started = Instant::now();
    match report::run(state.provider.as_ref(), params, overrides, &state.config.report).await {
        Ok(report) => {
            state.counters.record_report(&report);
            tracing::info!(
                ticker = %report.ticker,
                expiry = %report.expiry,
                strike = report.selected_strike,
                rows = report.strategies.len(),
                unavailable = report.unavailable_count(),
                custom = overrides.is_some(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "strategy pnl computed"
            );
            Ok(Json(report))
        }
        Err(e) => {
            state.counters.record_failure();
            if e.is_client_error() {
                tracing::info!(ticker = %params.ticker, error = %e, "strategy pnl request rejected");
            } else {
                tracing::warn!(ticker = %params.ticker, error = %e, "strategy pnl request failed");
            }
            Err(e)
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.provider.name(),
    }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}

#[cfg(test)]
mod tests {
    use crate::chain::snapshot::{ChainSnapshot, SnapshotChainProvider};
    use crate::chain::types::{OptionChain, OptionChainRow};
    use crate::config::{AppConfig, ChainSource, ReportSettings};
    use crate::server::router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    const EXPIRY: &str = "2025-06-27";

    fn snapshot(ticker: &str, spot: f64) -> ChainSnapshot {
        let rows: Vec<OptionChainRow> = (0..9)
            .map(|i| OptionChainRow::new(80.0 + 5.0 * i as f64, Some(2.0), Some(2.2), 2.5))
            .collect();
        let mut chains = HashMap::new();
        chains.insert(EXPIRY.to_string(), OptionChain::new(rows.clone(), rows));
        ChainSnapshot {
            ticker: ticker.into(),
            spot: Some(spot),
            expiries: vec![EXPIRY.into()],
            chains,
        }
    }

    fn app() -> (Router, Arc<AppState>) {
        let config = AppConfig {
            server_port: 0,
            chain_source: ChainSource::Snapshot,
            yahoo_base_url: String::new(),
            snapshot_path: None,
            cors_origin: Some("http://localhost:5173".into()),
            http_timeout_secs: 1,
            report: ReportSettings::default(),
        };
        let provider = SnapshotChainProvider::new(vec![snapshot("TEST", 101.0), snapshot("ZERO", 0.0)]);
        let state = AppState::new(config, Arc::new(provider));
        (router(state.clone()), state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "snapshot");
    }

    #[tokio::test]
    async fn test_market_report() {
        let (app, state) = app();
        let (status, body) = send(app, get("/options-strategy-pnl?ticker=test&strike=100")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "TEST");
        assert_eq!(body["expiry"], EXPIRY);
        assert_eq!(body["selected_strike"], json!(100.0));
        assert_eq!(body["strategies"].as_array().unwrap().len(), 5);
        assert_eq!(body["strategies"][0]["Price at Expiry"], "$90.0");
        assert!(body.get("user_provided_premiums").is_none());

        let counters = state.counters.snapshot();
        assert_eq!(counters.requests_served, 1);
        assert_eq!(counters.rows_computed, 5);
    }

    #[tokio::test]
    async fn test_custom_report_uses_overrides() {
        let (app, _) = app();
        let body = json!({
            "calls": {"$100": 4.0},
            "long_call": {"call_premium": 5.0},
            "straddle": {"put_premium": "x"}
        });
        let (status, body) = send(app, post("/options-strategy-pnl-custom?ticker=TEST&strike=100", body)).await;

        assert_eq!(status, StatusCode::OK);
        let last = &body["strategies"][4];
        assert_eq!(last["Price at Expiry"], "$110.0");
        assert_eq!(last["long_call"], json!(500.0));
        assert_eq!(last["straddle"], "N/A");
        assert_eq!(last["premium_breakdown"]["straddle"], Value::Null);
        assert_eq!(last["premium_breakdown"]["covered_call"]["call_strike"], json!(105.0));
        assert_eq!(body["premiums"]["calls"]["100"], json!(4.0));
        assert_eq!(body["user_provided_premiums"]["calls"]["100"], json!(4.0));
    }

    #[tokio::test]
    async fn test_invalid_spot_is_bad_request() {
        let (app, state) = app();
        let (status, body) = send(app, get("/options-strategy-pnl?ticker=zero")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid price data for ZERO.");
        assert_eq!(state.counters.snapshot().requests_failed, 1);
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_upstream_error() {
        let (app, _) = app();
        let (status, body) = send(app, get("/options-strategy-pnl?ticker=NOPE")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("An error occurred:"));
    }

    #[tokio::test]
    async fn test_non_object_payload_is_bad_request() {
        let (app, state) = app();
        let (status, _) = send(app, post("/options-strategy-pnl-custom?ticker=TEST", json!([1, 2]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.counters.snapshot().requests_failed, 1);
    }

    #[tokio::test]
    async fn test_counters_endpoint() {
        let (app, _) = app();
        let (status, body) = send(app, get("/api/counters")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests_served"], 0);
        assert_eq!(body["cells_unavailable"], 0);
    }
}
