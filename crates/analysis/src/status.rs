use serde::Serialize;
use std::time::SystemTime;

/// Outcome of one settled analysis cycle, broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct AnalysisUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub success: bool,
    pub reason: String,
}

/// Point-in-time view of the scheduler, published whenever it changes.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerHealth {
    /// Current state, as a stable lowercase name.
    pub state: &'static str,
    /// Requests coalesced into the window that has not produced a build yet.
    pub pending_requests: u64,
    pub analyzing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_duration_ms: Option<u64>,
    pub alert_log_json: String,
    pub alert_log_len: usize,
}

impl SchedulerHealth {
    pub(crate) fn initial() -> Self {
        Self {
            state: "idle",
            pending_requests: 0,
            analyzing: false,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            last_duration_ms: None,
            alert_log_json: String::from("[]"),
            alert_log_len: 0,
        }
    }
}
