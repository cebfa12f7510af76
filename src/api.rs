use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::data::validate_candles;
use crate::structure::{
    build_prior_day, build_weekly_vwap, AnchorSource, AnchoredWindow, EngineConfig, LevelCache,
    LevelSourceKind, PriorDayLevels, StructureEngine, StructureReport, WeeklyVwapLevels,
};
use crate::types::Candle;

/// Shared server state
pub struct AppState {
    pub config: EngineConfig,
    /// Timezone that defines trading days for history requests
    pub tz: Tz,
    pub prior_day: Mutex<LevelCache<PriorDayLevels>>,
    pub weekly_vwap: Mutex<LevelCache<WeeklyVwapLevels>>,
}

impl AppState {
    pub fn new(config: EngineConfig, tz: Tz) -> Self {
        Self {
            config,
            tz,
            prior_day: Mutex::new(LevelCache::new()),
            weekly_vwap: Mutex::new(LevelCache::new()),
        }
    }
}

/// Anchor supplied directly by the caller
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceRequest {
    PriorDay {
        reference: Candle,
        #[serde(default)]
        atr14: f64,
    },
    WeeklyVwap {
        #[serde(rename = "dailyVwaps")]
        daily_vwaps: Vec<f64>,
        #[serde(rename = "liveVwap")]
        live_vwap: f64,
        #[serde(default)]
        atr14: f64,
    },
}

impl SourceRequest {
    fn into_source(self) -> Result<AnchorSource, String> {
        match self {
            SourceRequest::PriorDay { reference, atr14 } => {
                validate_candles(std::slice::from_ref(&reference))
                    .map_err(|e| format!("reference {}", e))?;
                Ok(AnchorSource::PriorDay(PriorDayLevels::from_candle(&reference, atr14)))
            }
            SourceRequest::WeeklyVwap {
                daily_vwaps,
                live_vwap,
                atr14,
            } => {
                if !live_vwap.is_finite() {
                    return Err("liveVwap must be finite".to_string());
                }
                Ok(AnchorSource::WeeklyVwap(WeeklyVwapLevels::new(daily_vwaps, live_vwap, atr14)))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub symbol: Option<String>,
    pub source: SourceRequest,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub variant: LevelSourceKind,
    /// Multi-day history ending with the current session
    pub candles: Vec<Candle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub symbol: String,
    pub session: NaiveDate,
    #[serde(flatten)]
    pub report: StructureReport,
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message })))
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/analyze - evaluate a window against a caller-supplied anchor
pub async fn analyze(State(state): State<Arc<AppState>>, Json(req): Json<AnalyzeRequest>) -> impl IntoResponse {
    if let Err(e) = validate_candles(&req.candles) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    let source = match req.source.into_source() {
        Ok(source) => source,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let engine = StructureEngine::new(source, state.config.clone());
    let report = engine.evaluate(&req.candles);

    info!(
        "{} {}: {} ({} candles)",
        req.symbol.as_deref().unwrap_or("-"),
        report.source,
        report.analysis.state,
        req.candles.len()
    );

    (StatusCode::OK, Json(serde_json::json!(report)))
}

/// POST /api/analyze/history - derive the anchor from history, cached per session
pub async fn analyze_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HistoryRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_candles(&req.candles) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let atr_period = state.config.atr_period;
    let config = state.config.clone();

    let evaluated = match req.variant {
        LevelSourceKind::PriorDay => match build_prior_day(&req.candles, state.tz, atr_period) {
            Some(AnchoredWindow { session, source, window }) => {
                let source = *state.prior_day.lock().await.get_or_build(&req.symbol, session, || source);
                Some((session, StructureEngine::new(source, config).evaluate(&window)))
            }
            None => None,
        },
        LevelSourceKind::WeeklyVwap => match build_weekly_vwap(&req.candles, state.tz, atr_period) {
            Some(AnchoredWindow { session, source, window }) => {
                let live_vwap = source.live_vwap;
                let source = state
                    .weekly_vwap
                    .lock()
                    .await
                    .get_or_build(&req.symbol, session, || source)
                    .with_live_vwap(live_vwap);
                Some((session, StructureEngine::new(source, config).evaluate(&window)))
            }
            None => None,
        },
    };

    let Some((session, report)) = evaluated else {
        warn!("{}: not enough history for {} levels", req.symbol, req.variant);
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("not enough history to build {} levels", req.variant),
        );
    };

    let response = HistoryResponse {
        symbol: req.symbol,
        session,
        report,
    };
    (StatusCode::OK, Json(serde_json::json!(response)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/history", post(analyze_history))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::response::Response;

    /// 2024-01-01T00:00:00Z, a Monday
    const MONDAY: i64 = 1_704_067_200;
    const DAY: i64 = 86_400;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(EngineConfig::default(), Tz::UTC))
    }

    fn hlc(time: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(time, close, high, low, close, 100.0)
    }

    fn day_of(start: i64, base: f64) -> Vec<Candle> {
        (0..4)
            .map(|i| {
                let open = base + i as f64;
                Candle::new(start + 14 * 3_600 + i * 900, open, open + 2.0, open - 1.0, open + 1.0, 10.0)
            })
            .collect()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn pd_request(candles: Vec<Candle>) -> AnalyzeRequest {
        AnalyzeRequest {
            symbol: Some("NQ".to_string()),
            source: SourceRequest::PriorDay {
                reference: Candle::new(0, 95.0, 110.0, 90.0, 106.0, 1_000.0),
                atr14: 3.0,
            },
            candles,
        }
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_analyze_prior_day_sweep() {
        let candles = vec![hlc(1, 106.0, 104.0, 105.0), hlc(2, 112.0, 104.0, 108.0)];
        let response = analyze(State(state()), Json(pd_request(candles))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let report = body_json(response).await;
        assert_eq!(report["source"], "priorDay");
        assert_eq!(report["analysis"]["state"], "sweepingUpper");
        let p = &report["probabilities"];
        let total = p["reversal"].as_u64().unwrap() + p["continuation"].as_u64().unwrap() + p["range"].as_u64().unwrap();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_analyze_rejects_unordered_candles() {
        let candles = vec![hlc(5, 106.0, 104.0, 105.0), hlc(2, 112.0, 104.0, 108.0)];
        let response = analyze(State(state()), Json(pd_request(candles))).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("not after"));
    }

    #[test]
    fn test_source_request_json_shape() {
        let raw = r#"{"type":"weeklyVwap","dailyVwaps":[100.0,102.0],"liveVwap":104.0}"#;
        let req: SourceRequest = serde_json::from_str(raw).unwrap();
        let AnchorSource::WeeklyVwap(levels) = req.into_source().unwrap() else {
            panic!("expected weekly VWAP source");
        };
        assert_eq!(levels.daily_vwaps, vec![100.0, 102.0]);
        assert_eq!(levels.atr14, 0.0);
    }

    #[tokio::test]
    async fn test_history_uses_cached_levels() {
        let state = state();
        let mut history = day_of(MONDAY, 100.0);
        history.extend(day_of(MONDAY + DAY, 110.0));

        let req = HistoryRequest {
            symbol: "NQ".to_string(),
            variant: LevelSourceKind::PriorDay,
            candles: history.clone(),
        };
        let response = analyze_history(State(state.clone()), Json(req)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["session"], "2024-01-02");
        assert_eq!(body["levels"]["upper"], 105.0);

        let cache = state.prior_day.lock().await;
        let (session, cached) = cache.get("NQ").unwrap();
        assert_eq!(session, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(cached.pdh, 105.0);
    }

    #[tokio::test]
    async fn test_history_insufficient() {
        let req = HistoryRequest {
            symbol: "ES".to_string(),
            variant: LevelSourceKind::WeeklyVwap,
            candles: day_of(MONDAY, 100.0),
        };
        let response = analyze_history(State(state()), Json(req)).await.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
