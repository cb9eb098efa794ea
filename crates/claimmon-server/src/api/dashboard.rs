use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use claimmon_common::health::HealthReport;
use claimmon_common::types::{
    Alert, AlertCategory, AlertFilter, AlertLevel, MetricAggregate, MetricsSnapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashboardScope {
    All,
    Metrics,
    Alerts,
    Health,
}

impl DashboardScope {
    fn includes(self, part: DashboardScope) -> bool {
        self == DashboardScope::All || self == part
    }

    fn as_str(self) -> &'static str {
        match self {
            DashboardScope::All => "all",
            DashboardScope::Metrics => "metrics",
            DashboardScope::Alerts => "alerts",
            DashboardScope::Health => "health",
        }
    }
}

impl FromStr for DashboardScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DashboardScope::All),
            "metrics" => Ok(DashboardScope::Metrics),
            "alerts" => Ok(DashboardScope::Alerts),
            "health" => Ok(DashboardScope::Health),
            other => Err(format!(
                "unknown scope '{other}', expected all, metrics, alerts or health"
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// `all` (default), `metrics`, `alerts` or `health`.
    scope: Option<String>,
    /// Only alerts of this level.
    level: Option<String>,
    /// Only alerts of this category.
    category: Option<String>,
    /// `true` or `false`.
    resolved: Option<String>,
}

impl DashboardQuery {
    fn scope(&self) -> Result<DashboardScope, String> {
        self.scope
            .as_deref()
            .map_or(Ok(DashboardScope::All), DashboardScope::from_str)
    }

    fn filter(&self) -> Result<AlertFilter, String> {
        let level = self.level.as_deref().map(AlertLevel::from_str).transpose()?;
        let category = self
            .category
            .as_deref()
            .map(AlertCategory::from_str)
            .transpose()?;
        let resolved = self
            .resolved
            .as_deref()
            .map(|r| {
                r.parse::<bool>()
                    .map_err(|_| format!("resolved must be true or false, got '{r}'"))
            })
            .transpose()?;
        Ok(AlertFilter {
            level,
            category,
            resolved,
        })
    }
}

#[derive(Serialize, ToSchema)]
struct DashboardMeta {
    scope: String,
    generated_at: DateTime<Utc>,
    uptime_secs: u64,
    version: String,
    total_alerts: usize,
    unresolved_alerts: usize,
    /// Unresolved alerts at `critical` level.
    critical_alerts: usize,
}

#[derive(Serialize, ToSchema)]
struct DashboardData {
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<MetricsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<HealthReport>,
    meta: DashboardMeta,
}

/// Dashboard read model: metrics, alerts and health in one response.
#[utoipa::path(
    get,
    path = "/monitoring/dashboard",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard data for the requested scope", body = DashboardData),
        (status = 400, description = "Invalid scope or alert filter", body = ApiError)
    )
)]
async fn get_dashboard(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(q)) => q,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e.body_text())
        }
    };
    let (scope, filter) = match (query.scope(), query.filter()) {
        (Ok(scope), Ok(filter)) => (scope, filter),
        (Err(msg), _) | (_, Err(msg)) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
        }
    };

    let monitor = &state.monitor;
    let metrics = if scope.includes(DashboardScope::Metrics) {
        Some(monitor.get_metrics().await)
    } else {
        None
    };
    let health = if scope.includes(DashboardScope::Health) {
        Some(monitor.get_health_status().await)
    } else {
        None
    };

    // Read after the health run so alerts it raised are included.
    let all_alerts = monitor.get_alerts(&AlertFilter::default());
    let alerts = scope
        .includes(DashboardScope::Alerts)
        .then(|| monitor.get_alerts(&filter));

    let unresolved = all_alerts.iter().filter(|a| !a.resolved);
    let meta = DashboardMeta {
        scope: scope.as_str().to_string(),
        generated_at: Utc::now(),
        uptime_secs: monitor.uptime_secs(),
        version: monitor.version().to_string(),
        total_alerts: all_alerts.len(),
        unresolved_alerts: unresolved.clone().count(),
        critical_alerts: unresolved
            .filter(|a| a.level == AlertLevel::Critical)
            .count(),
    };

    success_response(
        StatusCode::OK,
        &trace_id,
        DashboardData {
            metrics,
            alerts,
            health,
            meta,
        },
    )
}

const KNOWN_ACTIONS: &[&str] = &["resolve_alert", "record_metric"];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
enum DashboardAction {
    ResolveAlert {
        #[serde(rename = "alertId")]
        alert_id: String,
        /// A string note, or any JSON value which is stored as its text.
        #[serde(default)]
        #[schema(value_type = Object)]
        resolution: Option<Value>,
    },
    RecordMetric {
        category: String,
        name: String,
        value: f64,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
}

#[derive(Serialize, ToSchema)]
struct ResolveResult {
    alert_id: String,
    resolved: bool,
}

#[derive(Serialize, ToSchema)]
struct RecordResult {
    key: String,
    aggregate: Option<MetricAggregate>,
}

fn resolution_note(resolution: Option<Value>) -> Option<String> {
    match resolution? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(map) => match map.get("note") {
            Some(Value::String(note)) => Some(note.clone()),
            _ => Some(Value::Object(map).to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Dashboard write actions: `resolve_alert` and `record_metric`.
#[utoipa::path(
    post,
    path = "/monitoring/dashboard",
    tag = "Dashboard",
    request_body = DashboardAction,
    responses(
        (status = 200, description = "Action applied"),
        (status = 400, description = "Malformed body or unknown action", body = ApiError),
        (status = 404, description = "Alert not found", body = ApiError)
    )
)]
async fn post_dashboard(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e.body_text())
        }
    };

    let action_name = body.get("action").and_then(Value::as_str).unwrap_or("");
    if !KNOWN_ACTIONS.contains(&action_name) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "unknown_action",
            &format!("unknown action '{action_name}'"),
        );
    }

    let action: DashboardAction = match serde_json::from_value(body) {
        Ok(action) => action,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e.to_string())
        }
    };

    match action {
        DashboardAction::ResolveAlert {
            alert_id,
            resolution,
        } => {
            if state
                .monitor
                .resolve_alert(&alert_id, resolution_note(resolution))
            {
                success_response(
                    StatusCode::OK,
                    &trace_id,
                    ResolveResult {
                        alert_id,
                        resolved: true,
                    },
                )
            } else {
                error_response(
                    StatusCode::NOT_FOUND,
                    &trace_id,
                    "not_found",
                    &format!("alert {alert_id} not found"),
                )
            }
        }
        DashboardAction::RecordMetric {
            category,
            name,
            value,
            metadata,
        } => {
            if category.trim().is_empty() || name.trim().is_empty() {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "bad_request",
                    "category and name must not be empty",
                );
            }
            state
                .monitor
                .record_metric(&category, &name, value, metadata)
                .await;
            let aggregate = state.monitor.metric_aggregate(&category, &name).await;
            success_response(
                StatusCode::OK,
                &trace_id,
                RecordResult {
                    key: format!("{category}:{name}"),
                    aggregate,
                },
            )
        }
    }
}

pub fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_dashboard, post_dashboard))
}
