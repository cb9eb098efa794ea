use crate::monitor::SystemMonitor;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<SystemMonitor>,
}

impl AppState {
    pub fn new(monitor: Arc<SystemMonitor>) -> Self {
        Self { monitor }
    }
}
