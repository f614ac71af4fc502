//! Provisioning Session
//!
//! The single-owner state for one in-flight provisioning operation. A
//! session owns the steps of its plan with their statuses, two periodic timers and
//! the terminal outcome.
//!
//! # Timers
//!
//! - The elapsed timer recomputes `now - started` for display. It never
//!   touches the step pointer.
//! - The heartbeat advances the presented step at a fixed interval while
//!   the remote call is outstanding and holds on the last step until the
//!   real result arrives. It says nothing about actual backend progress.
//!
//! Both timers are torn down together by [`ProvisioningSession::cancel`] and
//! on entry to any terminal state.

use crate::provisioning::events::SessionEvent;
use crate::provisioning::plan::{ProvisionPlan, Step, StepStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Summary shown while the remote call is outstanding
pub const STARTED_SUMMARY: &str = "Operation started. Waiting for server-side steps to complete.";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Session Configuration
// =============================================================================

/// Timer configuration for provisioning sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Elapsed-time display refresh period
    pub elapsed_interval: Duration,
    /// Cosmetic step advance period
    pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            elapsed_interval: Duration::from_millis(1000),
            heartbeat_interval: Duration::from_millis(6000),
        }
    }
}

// =============================================================================
// Phase & Outcome
// =============================================================================

/// Lifecycle phase of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Plan built, timers active, remote call outstanding
    Running,
    /// Remote call succeeded, views are being refreshed
    Reconciling,
    /// Terminal success
    Completed,
    /// Terminal failure
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

/// Outcome of the operation as presented to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SessionOutcome {
    InProgress,
    Completed(String),
    Failed(String),
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of a session for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: u64,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<Step>,
    pub current_index: Option<usize>,
    pub elapsed_secs: u64,
    pub phase: SessionPhase,
    pub outcome: SessionOutcome,
    pub summary: String,
}

impl SessionSnapshot {
    /// Operation label: the title while live, then `Completed` / `Failed`
    pub fn operation_label(&self) -> &str {
        match self.phase {
            SessionPhase::Completed => "Completed",
            SessionPhase::Failed => "Failed",
            _ => &self.title,
        }
    }

    /// Render the step list the way the dashboard shows it
    pub fn render(&self) -> String {
        let mut out = format!("{} ({}s)\n", self.operation_label(), self.elapsed_secs);
        for step in &self.steps {
            out.push_str(step.status.marker());
            out.push(' ');
            out.push_str(&step.label);
            out.push('\n');
        }
        out.push_str(&self.summary);
        out
    }
}

// =============================================================================
// Session State
// =============================================================================

#[derive(Debug)]
struct SessionState {
    steps: Vec<Step>,
    current_index: Option<usize>,
    phase: SessionPhase,
    outcome: SessionOutcome,
    summary: String,
    elapsed_secs: u64,
    heartbeat_ticks: u64,
    elapsed_ticks: u64,
    /// Cleared under the lock to stop both timer callbacks at once
    timers_live: bool,
}

impl SessionState {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            current_index: None,
            phase: SessionPhase::Running,
            outcome: SessionOutcome::InProgress,
            summary: STARTED_SUMMARY.to_string(),
            elapsed_secs: 0,
            heartbeat_ticks: 0,
            elapsed_ticks: 0,
            timers_live: true,
        }
    }

    /// Present `index` as running; earlier steps done, later pending.
    /// Error taint survives in both directions.
    fn set_current(&mut self, index: usize) {
        self.current_index = Some(index);
        for (i, step) in self.steps.iter_mut().enumerate() {
            if step.status == StepStatus::Error && i != index {
                continue;
            }
            step.status = match i.cmp(&index) {
                std::cmp::Ordering::Less => StepStatus::Done,
                std::cmp::Ordering::Equal => StepStatus::Running,
                std::cmp::Ordering::Greater => StepStatus::Pending,
            };
        }
    }

    fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    fn on_heartbeat(&mut self) -> Option<usize> {
        if !self.timers_live || self.phase != SessionPhase::Running {
            return None;
        }
        self.heartbeat_ticks += 1;

        let current = self.current_index?;
        if current < self.last_index() {
            self.set_current(current + 1);
            Some(current + 1)
        } else {
            None
        }
    }

    fn on_elapsed(&mut self, elapsed: Duration) -> Option<u64> {
        if !self.timers_live {
            return None;
        }
        self.elapsed_ticks += 1;
        self.elapsed_secs = elapsed.as_secs();
        Some(self.elapsed_secs)
    }

    fn snapshot(&self, session: &ProvisioningSession) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session.id,
            title: session.title.clone(),
            started_at: session.started_at,
            steps: self.steps.clone(),
            current_index: self.current_index,
            elapsed_secs: self.elapsed_secs,
            phase: self.phase,
            outcome: self.outcome.clone(),
            summary: self.summary.clone(),
        }
    }
}

// =============================================================================
// Timers
// =============================================================================

struct SessionTimers {
    token: CancellationToken,
    elapsed: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// Spawn a fire-and-repeat callback; the first firing is one period out
fn spawn_ticker<F>(period: Duration, token: CancellationToken, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => on_tick(),
            }
        }
    })
}

// =============================================================================
// Provisioning Session
// =============================================================================

/// One in-flight provisioning operation
pub struct ProvisioningSession {
    id: u64,
    title: String,
    started_at: DateTime<Utc>,
    started: Instant,
    state: Arc<Mutex<SessionState>>,
    timers: Mutex<Option<SessionTimers>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ProvisioningSession {
    /// Start a session: step 0 running, both timers armed
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        title: impl Into<String>,
        plan: ProvisionPlan,
        config: &SessionConfig,
        events: broadcast::Sender<SessionEvent>,
    ) -> Arc<Self> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let title = title.into();

        let mut state = SessionState::new(plan.pending_steps());
        state.set_current(0);
        let state = Arc::new(Mutex::new(state));

        info!(
            "Starting provisioning session {}: {} ({} steps)",
            id,
            title,
            plan.len()
        );
        let _ = events.send(SessionEvent::Started {
            session_id: id,
            title: title.clone(),
            steps: plan.labels().to_vec(),
        });

        let started = Instant::now();
        let token = CancellationToken::new();

        let elapsed = {
            let state = state.clone();
            let events = events.clone();
            spawn_ticker(config.elapsed_interval, token.clone(), move || {
                let seconds = state.lock().on_elapsed(started.elapsed());
                if let Some(seconds) = seconds {
                    let _ = events.send(SessionEvent::ElapsedTick {
                        session_id: id,
                        seconds,
                    });
                }
            })
        };

        let heartbeat = {
            let state = state.clone();
            let events = events.clone();
            spawn_ticker(config.heartbeat_interval, token.clone(), move || {
                let advanced = {
                    let mut state = state.lock();
                    state
                        .on_heartbeat()
                        .map(|index| (index, state.steps[index].label.clone()))
                };
                if let Some((index, label)) = advanced {
                    debug!("Session {} heartbeat: step {} ({})", id, index, label);
                    let _ = events.send(SessionEvent::StepAdvanced {
                        session_id: id,
                        index,
                        label,
                    });
                }
            })
        };

        Arc::new(Self {
            id,
            title,
            started_at: Utc::now(),
            started,
            state,
            timers: Mutex::new(Some(SessionTimers {
                token,
                elapsed,
                heartbeat,
            })),
            events,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().current_index
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.state.lock().outcome.clone()
    }

    /// Heartbeat firings that reached the session
    pub fn heartbeat_ticks(&self) -> u64 {
        self.state.lock().heartbeat_ticks
    }

    /// Elapsed-timer firings that reached the session
    pub fn elapsed_ticks(&self) -> u64 {
        self.state.lock().elapsed_ticks
    }

    /// Whether either timer task is still alive
    pub fn timers_active(&self) -> bool {
        self.timers
            .lock()
            .as_ref()
            .map(|t| !t.elapsed.is_finished() || !t.heartbeat.is_finished())
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot(self)
    }

    /// Tear down both timers without reaching a terminal state
    ///
    /// Used when a newer session preempts this one. Idempotent.
    pub fn cancel(&self) {
        if self.stop_timers() {
            warn!("Provisioning session {} cancelled before completion", self.id);
            let _ = self.events.send(SessionEvent::Cancelled { session_id: self.id });
        }
    }

    /// Remote call succeeded: every step done, pointer on the last step
    pub fn mark_remote_succeeded(&self) {
        {
            let mut state = self.state.lock();
            if state.phase != SessionPhase::Running {
                return;
            }
            for step in state.steps.iter_mut() {
                step.status = StepStatus::Done;
            }
            state.current_index = Some(state.last_index());
            state.phase = SessionPhase::Reconciling;
            state.elapsed_secs = self.started.elapsed().as_secs();
        }
        self.stop_timers();

        debug!("Session {} remote operation succeeded, reconciling", self.id);
        let _ = self.events.send(SessionEvent::Reconciling { session_id: self.id });
    }

    /// Enter the terminal success state with the final display message
    pub fn complete(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return;
            }
            for step in state.steps.iter_mut() {
                step.status = StepStatus::Done;
            }
            state.current_index = Some(state.last_index());
            state.phase = SessionPhase::Completed;
            state.outcome = SessionOutcome::Completed(message.clone());
            state.summary = if message.is_empty() {
                "Completed successfully.".to_string()
            } else {
                message.clone()
            };
            state.elapsed_secs = self.started.elapsed().as_secs();
        }
        self.stop_timers();

        info!("Provisioning session {} completed: {}", self.id, message);
        let _ = self.events.send(SessionEvent::Completed {
            session_id: self.id,
            message,
        });
    }

    /// Enter the terminal failure state, tainting the current step
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return;
            }
            if let Some(index) = state.current_index {
                if let Some(step) = state.steps.get_mut(index) {
                    step.status = StepStatus::Error;
                }
            }
            state.phase = SessionPhase::Failed;
            state.outcome = SessionOutcome::Failed(message.clone());
            state.summary = if message.is_empty() {
                "Operation failed.".to_string()
            } else {
                message.clone()
            };
            state.elapsed_secs = self.started.elapsed().as_secs();
        }
        self.stop_timers();

        warn!("Provisioning session {} failed: {}", self.id, message);
        let _ = self.events.send(SessionEvent::Failed {
            session_id: self.id,
            message,
        });
    }

    /// Returns whether the timers were still live
    fn stop_timers(&self) -> bool {
        let was_live = std::mem::replace(&mut self.state.lock().timers_live, false);
        if let Some(timers) = self.timers.lock().as_ref() {
            timers.token.cancel();
        }
        was_live
    }
}

impl Drop for ProvisioningSession {
    fn drop(&mut self) {
        self.stop_timers();
    }
}

impl std::fmt::Debug for ProvisioningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningSession")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("state", &*self.state.lock())
            .finish()
    }
}
