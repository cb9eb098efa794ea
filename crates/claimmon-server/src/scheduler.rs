use crate::config::IntervalConfig;
use crate::monitor::SystemMonitor;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// The four interval timers of a running monitor.
///
/// Each timer holds only a weak reference to the monitor, so dropping the
/// monitor also ends its timers.
pub(crate) struct Timers {
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Timers {
    pub(crate) fn start(monitor: &Arc<SystemMonitor>, intervals: &IntervalConfig) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let weak = Arc::downgrade(monitor);

        let handles = [
            spawn_timer(
                "metrics_collection",
                intervals.metrics_collection,
                weak.clone(),
                stop_rx.clone(),
                |m| async move {
                    m.metrics_store().collect().await;
                },
            ),
            spawn_timer(
                "alert_check",
                intervals.alert_check,
                weak.clone(),
                stop_rx.clone(),
                |m| async move {
                    m.check_alerts().await;
                },
            ),
            spawn_timer(
                "health_check",
                intervals.health_check,
                weak.clone(),
                stop_rx.clone(),
                |m| async move {
                    let report = m.run_health_checks().await;
                    tracing::debug!(status = %report.status, "Health tick finished");
                    m.check_regional_emergency().await;
                },
            ),
            spawn_timer(
                "business_metrics",
                intervals.business_metrics,
                weak,
                stop_rx,
                |m| async move {
                    m.monitor_ai_costs().await;
                },
            ),
        ];

        Self {
            stop,
            handles: handles.into_iter().flatten().collect(),
        }
    }

    /// Signal every timer to stop. Ticks in progress run to completion.
    pub(crate) fn stop(self) {
        let _ = self.stop.send(true);
        tracing::debug!(timers = self.handles.len(), "Monitor timers signalled to stop");
    }
}

/// Spawn one timer. A zero period disables it.
fn spawn_timer<F, Fut>(
    name: &'static str,
    period_ms: u64,
    monitor: Weak<SystemMonitor>,
    mut stop: watch::Receiver<bool>,
    tick: F,
) -> Option<JoinHandle<()>>
where
    F: Fn(Arc<SystemMonitor>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period_ms == 0 {
        tracing::info!(timer = name, "Timer disabled");
        return None;
    }

    let period = Duration::from_millis(period_ms);
    Some(tokio::spawn(async move {
        tracing::info!(timer = name, period_ms, "Timer started");
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(monitor) = monitor.upgrade() else {
                break;
            };
            tick(monitor).await;
        }

        tracing::debug!(timer = name, "Timer stopped");
    }))
}
