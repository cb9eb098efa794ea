#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use claimmon_collector::cache::MetricCache;
use claimmon_collector::error::CacheError;
use claimmon_common::types::Alert;
use claimmon_notify::manager::NotificationManager;
use claimmon_notify::NotificationChannel;
use claimmon_server::app;
use claimmon_server::config::MonitorConfig;
use claimmon_server::emergency::{EmergencyFeed, EmergencyReport};
use claimmon_server::health::{HealthProbe, Probe, ProbeOutcome};
use claimmon_server::monitor::{MonitorBuilder, SystemMonitor};
use claimmon_server::state::AppState;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub struct TestContext {
    pub monitor: Arc<SystemMonitor>,
    pub app: axum::Router,
    pub sent: Arc<Mutex<Vec<Alert>>>,
}

/// Records every alert it is asked to deliver.
pub struct RecordingChannel {
    pub sent: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, alert: &Alert) -> claimmon_notify::error::Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

pub struct FixedProbe(pub ProbeOutcome);

#[async_trait]
impl Probe for FixedProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(self.0.clone())
    }
}

pub struct HangingProbe;

#[async_trait]
impl Probe for HangingProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ProbeOutcome::pass())
    }
}

/// A cache that is always down.
pub struct DownCache;

#[async_trait]
impl MetricCache for DownCache {
    async fn get(&self, _key: &str) -> claimmon_collector::error::Result<Option<Value>> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Value,
        _ttl: Duration,
    ) -> claimmon_collector::error::Result<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub struct ThrowingFeed;

#[async_trait]
impl EmergencyFeed for ThrowingFeed {
    async fn fetch(&self) -> anyhow::Result<EmergencyReport> {
        anyhow::bail!("feed offline")
    }
}

pub struct StaticFeed(pub EmergencyReport);

#[async_trait]
impl EmergencyFeed for StaticFeed {
    async fn fetch(&self) -> anyhow::Result<EmergencyReport> {
        Ok(self.0.clone())
    }
}

/// Builder with a recording notifier and a single passing probe, so tests
/// never touch the network.
pub fn test_builder(config: MonitorConfig) -> (MonitorBuilder, Arc<Mutex<Vec<Alert>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let notifier = NotificationManager::broadcast(vec![Box::new(RecordingChannel {
        sent: sent.clone(),
    })]);
    let builder = SystemMonitor::builder(config)
        .with_notifier(notifier)
        .with_probes(vec![HealthProbe::new(
            "static",
            false,
            Arc::new(FixedProbe(ProbeOutcome::pass())),
        )]);
    (builder, sent)
}

pub fn context_from(monitor: SystemMonitor, sent: Arc<Mutex<Vec<Alert>>>) -> TestContext {
    let monitor = Arc::new(monitor);
    let app = app::build_http_app(AppState::new(monitor.clone()));
    TestContext { monitor, app, sent }
}

pub fn build_test_context() -> TestContext {
    let (builder, sent) = test_builder(MonitorConfig::default());
    context_from(builder.build(), sent)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json, trace_id)
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
