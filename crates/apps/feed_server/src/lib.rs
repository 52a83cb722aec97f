//! Fixture-backed hazard feed server.
//!
//! Serves `GET /hazard/{kind}` from `{fixtures}/{kind}.json`, keeping the
//! fixture's shape (feature collection or bare record array) and filtering
//! by the optional `lat`/`lng`/`radiusKm`/`hours` scope. `GET /health`
//! reports liveness.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use feeds::{HazardKind, HazardScope, ScopeQuery};
use formats::{normalize, FeaturePayload};
use foundation::math::within_radius_km;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_FIXTURES: &str = "data/hazards";
pub const DEFAULT_RADIUS_KM: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct FeedServerConfig {
    pub fixtures: PathBuf,
    pub addr: SocketAddr,
    pub default_radius_km: f64,
    /// Kinds that always answer with the given HTTP status.
    pub failing: HashMap<HazardKind, u16>,
}

impl FeedServerConfig {
    pub fn new(fixtures: impl Into<PathBuf>) -> Self {
        Self {
            fixtures: fixtures.into(),
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            default_radius_km: DEFAULT_RADIUS_KM,
            failing: HashMap::new(),
        }
    }

    /// `HAZARD_FIXTURES`, `HAZARD_ADDR`, and `HAZARD_FAIL` (e.g.
    /// `seismic:500,weather:503`).
    pub fn from_env() -> anyhow::Result<Self> {
        let fixtures = env::var("HAZARD_FIXTURES").unwrap_or_else(|_| DEFAULT_FIXTURES.to_string());
        let addr = env::var("HAZARD_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let mut config = Self::new(fixtures);
        config.addr = addr
            .parse()
            .with_context(|| format!("invalid HAZARD_ADDR: {addr}"))?;
        if let Ok(spec) = env::var("HAZARD_FAIL") {
            config.failing = parse_failures(&spec)?;
        }
        Ok(config)
    }
}

pub fn parse_failures(spec: &str) -> anyhow::Result<HashMap<HazardKind, u16>> {
    let mut out = HashMap::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (kind, status) = entry
            .split_once(':')
            .with_context(|| format!("expected kind:status, got {entry}"))?;
        let kind: HazardKind = kind.parse()?;
        let status: u16 = status
            .trim()
            .parse()
            .with_context(|| format!("invalid status in {entry}"))?;
        StatusCode::from_u16(status).with_context(|| format!("invalid status in {entry}"))?;
        out.insert(kind, status);
    }
    Ok(out)
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("no fixture at {0}")]
    Missing(PathBuf),
    #[error("fixture read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub async fn load_fixture(root: &Path, kind: HazardKind) -> Result<Value, FixtureError> {
    let path = root.join(format!("{}.json", kind.path()));
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(FixtureError::Missing(path));
        }
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_str(&text)?)
}

/// Drops items outside the scope's radius or older than its hours window.
/// Items without a usable position or timestamp are kept.
pub fn filter_payload(
    value: Value,
    kind: HazardKind,
    scope: Option<HazardScope>,
    now: DateTime<Utc>,
) -> Value {
    let Some(scope) = scope else {
        return value;
    };
    let keep = |items: Vec<Value>| -> Vec<Value> {
        items
            .into_iter()
            .filter(|item| in_scope(item, kind, &scope, now))
            .collect()
    };
    match value {
        Value::Array(items) => Value::Array(keep(items)),
        Value::Object(mut obj) => {
            if let Some(Value::Array(items)) = obj.remove("features") {
                obj.insert("features".to_string(), Value::Array(keep(items)));
            }
            Value::Object(obj)
        }
        other => other,
    }
}

fn in_scope(item: &Value, kind: HazardKind, scope: &HazardScope, now: DateTime<Utc>) -> bool {
    let Ok(payload) = FeaturePayload::from_value(Value::Array(vec![item.clone()]), kind.path())
    else {
        return true;
    };
    let Some(Ok(feature)) = payload.features.first().map(normalize) else {
        return true;
    };
    if !within_radius_km(scope.center, feature.anchor(), scope.radius_km) {
        return false;
    }
    match (scope.hours, feature.source_timestamp) {
        (Some(hours), Some(ts)) => now - ts <= chrono::Duration::hours(i64::from(hours)),
        _ => true,
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<FeedServerConfig>,
}

pub fn router(config: FeedServerConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/health", get(health))
        .route("/hazard/:kind", get(hazard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "fixtures": state.config.fixtures.display().to_string(),
    }))
    .into_response()
}

async fn hazard(
    State(state): State<AppState>,
    AxumPath(kind): AxumPath<String>,
    Query(query): Query<ScopeQuery>,
) -> Response {
    let kind: HazardKind = match kind.parse() {
        Ok(kind) => kind,
        Err(err) => return api_error(StatusCode::NOT_FOUND, err.to_string()),
    };

    if let Some(status) = state.config.failing.get(&kind) {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return api_error(status, format!("{kind} feed unavailable"));
    }

    let value = match load_fixture(&state.config.fixtures, kind).await {
        Ok(value) => value,
        Err(err @ FixtureError::Missing(_)) => return api_error(StatusCode::NOT_FOUND, err.to_string()),
        Err(err) => {
            error!(%kind, error = %err, "fixture load failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    let scope = query.scope(state.config.default_radius_km);
    debug!(%kind, scoped = scope.is_some(), "serving hazard feed");
    Json(filter_payload(value, kind, scope, Utc::now())).into_response()
}
