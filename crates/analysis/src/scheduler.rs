use crate::machine::{self, Effect, Event, State};
use crate::status::{AnalysisUpdate, SchedulerHealth};
use crate::{AnalysisHost, Result, SchedulerError};
use log::{debug, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;

const DEFAULT_REQUEST_REASON: &str = "analysis_request";

/// Timing knobs for the scheduler.
///
/// `debounce` and `busy_poll` are separate tunables but share a default:
/// the quiescence window doubles as the re-poll interval unless a caller
/// wants them apart.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Quiescence window: an analysis fires only after this long with no
    /// further requests.
    pub debounce: Duration,
    /// Re-poll interval while the primary build holds the toolchain.
    pub busy_poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            busy_poll: Duration::from_millis(1000),
        }
    }
}

/// Debounced, serialized trigger for analysis builds.
///
/// Cheap to clone; all clones feed the same driver task. The driver stops
/// once every clone is dropped or [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct AnalysisScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    command_tx: mpsc::Sender<SchedulerCommand>,
    update_tx: broadcast::Sender<AnalysisUpdate>,
    health_tx: watch::Sender<SchedulerHealth>,
}

enum SchedulerCommand {
    Request { reason: String },
    Shutdown,
}

struct BuildOutcome {
    duration_ms: u64,
    reason: String,
    error: Option<String>,
}

impl AnalysisScheduler {
    /// Spawns the driver task. Fails only on a non-positive period.
    pub fn start<H: AnalysisHost>(host: Arc<H>, config: SchedulerConfig) -> Result<Self> {
        if config.debounce.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "debounce must be positive".to_string(),
            ));
        }
        if config.busy_poll.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "busy_poll must be positive".to_string(),
            ));
        }

        let (command_tx, command_rx) = mpsc::channel(64);
        let (health_tx, _) = watch::channel(SchedulerHealth::initial());
        let (update_tx, _) = broadcast::channel(32);

        spawn_scheduler_loop(host, config, command_rx, update_tx.clone(), health_tx.clone());

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                command_tx,
                update_tx,
                health_tx,
            }),
        })
    }

    /// Records that an analysis should eventually run.
    ///
    /// Resolves once the request is queued for the driver, not once any
    /// resulting build completes. Requests landing within one quiescence
    /// window coalesce into a single build; requests landing while a build
    /// is in flight coalesce into a single follow-up window.
    pub async fn request_analysis(&self) -> Result<()> {
        self.request_analysis_with_reason(DEFAULT_REQUEST_REASON)
            .await
    }

    /// Same as [`request_analysis`](Self::request_analysis), tagging the
    /// eventual update record. When a burst coalesces, the latest reason
    /// wins.
    pub async fn request_analysis_with_reason(&self, reason: impl Into<String>) -> Result<()> {
        self.inner
            .command_tx
            .send(SchedulerCommand::Request {
                reason: reason.into(),
            })
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Stops the driver. A pending window is abandoned; an in-flight build
    /// is detached and runs to completion unobserved.
    pub async fn shutdown(&self) -> Result<()> {
        self.inner
            .command_tx
            .send(SchedulerCommand::Shutdown)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<AnalysisUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> SchedulerHealth {
        self.inner.health_tx.subscribe().borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<SchedulerHealth> {
        self.inner.health_tx.subscribe()
    }
}

impl Drop for AnalysisScheduler {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(SchedulerCommand::Shutdown);
        }
    }
}

fn spawn_scheduler_loop<H: AnalysisHost>(
    host: Arc<H>,
    config: SchedulerConfig,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
    update_tx: broadcast::Sender<AnalysisUpdate>,
    health_tx: watch::Sender<SchedulerHealth>,
) {
    tokio::spawn(async move {
        // Capacity 1 suffices: at most one build is ever in flight.
        let (done_tx, mut done_rx) = mpsc::channel::<BuildOutcome>(1);

        let mut state = State::Idle;
        let mut deadline: Option<time::Instant> = None;
        let mut pending_requests: u64 = 0;
        let mut pending_reason: Option<String> = None;
        let mut health = SchedulerHealth::initial();
        let mut alert_log: VecDeque<AlertRecord> = VecDeque::new();

        loop {
            let armed = deadline;

            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::Request { reason }) => {
                            pending_requests += 1;
                            pending_reason = Some(reason);
                            let (next, effect) = step(state, Event::AnalysisRequest);
                            state = next;
                            if effect == Effect::StartDebounce {
                                deadline = Some(time::Instant::now() + config.debounce);
                            }
                        }
                        Some(SchedulerCommand::Shutdown) | None => break,
                    }
                }
                Some(outcome) = done_rx.recv() => {
                    let success = outcome.error.is_none();
                    health.last_duration_ms = Some(outcome.duration_ms);
                    match outcome.error {
                        None => {
                            health.last_success = Some(SystemTime::now());
                            health.last_error = None;
                            health.consecutive_failures = 0;
                        }
                        Some(err) => {
                            warn!("analysis build failed: {err}");
                            health.consecutive_failures += 1;
                            push_alert(&mut alert_log, "error", &outcome.reason, &err);
                            health.alert_log_json = serialize_alerts(&alert_log);
                            health.alert_log_len = alert_log.len();
                            health.last_error = Some(err);
                        }
                    }

                    let (next, effect) = step(state, Event::BuildDone);
                    state = next;
                    if effect == Effect::StartDebounce {
                        deadline = Some(time::Instant::now() + config.debounce);
                    }

                    let _ = update_tx.send(AnalysisUpdate {
                        completed_at: SystemTime::now(),
                        duration_ms: outcome.duration_ms,
                        success,
                        reason: outcome.reason,
                    });
                }
                () = async {
                    if let Some(at) = armed {
                        time::sleep_until(at).await;
                    }
                }, if armed.is_some() => {
                    deadline = None;
                    let building = host.build_in_progress();
                    let (next, effect) = step(state, Event::WaitTimeout { building });
                    state = next;
                    match effect {
                        Effect::StartPoll => {
                            debug!("primary build in progress, re-polling");
                            deadline = Some(time::Instant::now() + config.busy_poll);
                        }
                        Effect::StartBuild => {
                            let reason = pending_reason
                                .take()
                                .unwrap_or_else(|| DEFAULT_REQUEST_REASON.to_string());
                            pending_requests = 0;
                            spawn_build(host.clone(), reason, done_tx.clone());
                        }
                        Effect::StartDebounce | Effect::None => {}
                    }
                }
            }

            health.state = state.name();
            health.analyzing = state.analyzing();
            health.pending_requests = pending_requests;
            let _ = health_tx.send(health.clone());
        }
    });
}

/// Feeds one event through the transition table, tracing ignored pairs.
fn step(state: State, event: Event) -> (State, Effect) {
    let (next, effect) = machine::apply(state, event);
    if next == state && effect == Effect::None {
        debug!("ignoring {event:?} in state {}", state.name());
    }
    (next, effect)
}

fn spawn_build<H: AnalysisHost>(
    host: Arc<H>,
    reason: String,
    done_tx: mpsc::Sender<BuildOutcome>,
) {
    tokio::spawn(async move {
        let started = time::Instant::now();
        let result = host.run_analysis().await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = BuildOutcome {
            duration_ms,
            reason,
            error: result.err().map(|e| format!("{e:#}")),
        };
        // Fails only when the driver already stopped; the build is then
        // simply detached.
        let _ = done_tx.send(outcome).await;
    });
}

#[derive(Debug, Serialize)]
struct AlertRecord {
    timestamp_unix_ms: u64,
    level: String,
    reason: String,
    detail: String,
}

fn push_alert(log: &mut VecDeque<AlertRecord>, level: &str, reason: &str, detail: &str) {
    const MAX_ALERTS: usize = 20;
    let record = AlertRecord {
        timestamp_unix_ms: current_unix_ms(),
        level: level.to_string(),
        reason: reason.to_string(),
        detail: detail.to_string(),
    };
    log.push_back(record);
    if log.len() > MAX_ALERTS {
        log.pop_front();
    }
}

fn serialize_alerts(log: &VecDeque<AlertRecord>) -> String {
    serde_json::to_string(log).unwrap_or_else(|_| "[]".to_string())
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
