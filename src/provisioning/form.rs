//! Provisioning Form
//!
//! Binds one device class to its executor, views and acknowledger, and
//! drives a request through guard, plan, session, remote call and
//! reconciliation. A form holds at most one active session; starting a new
//! one cancels the previous session's timers first.

use crate::domain::ports::{
    AcknowledgerRef, DeviceClass, OperationExecutorRef, ProvisionPayload, ProvisionRequest,
    ViewRefresherRef,
};
use crate::error::{Error, ErrorKind};
use crate::provisioning::events::SessionEvent;
use crate::provisioning::guard::{GuardDecision, GuardRejection, SafetyGuard};
use crate::provisioning::plan::ProvisionPlan;
use crate::provisioning::reconcile::{ReconcileConfig, Reconciler};
use crate::provisioning::session::{ProvisioningSession, SessionConfig, SessionSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

// =============================================================================
// Form Configuration
// =============================================================================

/// Configuration for a provisioning form
#[derive(Debug, Clone)]
pub struct FormConfig {
    pub session: SessionConfig,
    pub reconcile: ReconcileConfig,
    /// Capacity of the session event channel
    pub event_capacity: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reconcile: ReconcileConfig::default(),
            event_capacity: 256,
        }
    }
}

// =============================================================================
// Submit Outcome
// =============================================================================

/// Result of submitting a request through a form
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Guard refused; no session, no network call
    Blocked(GuardRejection),
    /// Session reached Completed or Failed
    Finished(SessionSnapshot),
    /// Executor signalled auth expiry; the operator must log in again
    ReauthRequired,
}

impl SubmitOutcome {
    /// Message to show next to the form, if any
    pub fn message(&self) -> Option<String> {
        match self {
            SubmitOutcome::Blocked(rejection) => rejection.message(),
            SubmitOutcome::Finished(snapshot) => Some(snapshot.summary.clone()),
            SubmitOutcome::ReauthRequired => Some(Error::AuthExpired.to_string()),
        }
    }
}

// =============================================================================
// Provisioning Form
// =============================================================================

/// Provisioning entry point for one device class
pub struct ProvisioningForm {
    device_class: DeviceClass,
    guard: SafetyGuard,
    executor: OperationExecutorRef,
    reconciler: Reconciler,
    session_config: SessionConfig,
    current: Mutex<Option<Arc<ProvisioningSession>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ProvisioningForm {
    pub fn new(
        device_class: DeviceClass,
        executor: OperationExecutorRef,
        views: ViewRefresherRef,
        acknowledger: AcknowledgerRef,
        config: FormConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            device_class,
            guard: SafetyGuard::new(acknowledger),
            executor,
            reconciler: Reconciler::new(views, config.reconcile),
            session_config: config.session,
            current: Mutex::new(None),
            events,
        }
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Subscribe to events from every session this form starts
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The session currently owning this form's display
    pub fn current_session(&self) -> Option<Arc<ProvisioningSession>> {
        self.current.lock().clone()
    }

    /// Run a request end to end
    pub async fn submit(&self, request: ProvisionRequest) -> SubmitOutcome {
        if let GuardDecision::Blocked(rejection) = self.guard.check(&request).await {
            info!(
                "{} provisioning request for {:?} blocked: {:?}",
                self.device_class.label(),
                request.device,
                rejection
            );
            return SubmitOutcome::Blocked(rejection);
        }

        let plan = match ProvisionPlan::build(&request) {
            Ok(plan) => plan,
            Err(_) => return SubmitOutcome::Blocked(GuardRejection::MissingFields),
        };

        let session = self.begin(&request, plan);
        let payload = ProvisionPayload::from(&request);

        match self.executor.submit(self.device_class, &payload).await {
            Ok(result) => {
                session.mark_remote_succeeded();
                let report = self.reconciler.reconcile(self.device_class).await;
                session.complete(report.qualify(&result.message));
            }
            Err(e) => match e.kind() {
                ErrorKind::AuthExpired => {
                    warn!("Authentication expired during {} provisioning", self.device_class.label());
                    session.cancel();
                    self.release(&session);
                    return SubmitOutcome::ReauthRequired;
                }
                ErrorKind::Internal => {
                    error!("{} provisioning client error: {}", self.device_class.label(), e);
                    session.fail(e.to_string());
                }
                _ => session.fail(e.to_string()),
            },
        }

        SubmitOutcome::Finished(session.snapshot())
    }

    /// Preempt any previous session, then start a new one
    fn begin(&self, request: &ProvisionRequest, plan: ProvisionPlan) -> Arc<ProvisioningSession> {
        let mut current = self.current.lock();

        if let Some(previous) = current.take() {
            if !previous.phase().is_terminal() {
                warn!(
                    "Session {} superseded by a new {} request",
                    previous.id(),
                    self.device_class.label()
                );
            }
            previous.cancel();
        }

        let title = format!("{} Provision ({})", self.device_class.label(), request.device);
        let session =
            ProvisioningSession::start(title, plan, &self.session_config, self.events.clone());
        *current = Some(session.clone());
        session
    }

    /// Drop the session from the display slot if it still owns it
    fn release(&self, session: &Arc<ProvisioningSession>) {
        let mut current = self.current.lock();
        if current.as_ref().map(|s| s.id()) == Some(session.id()) {
            *current = None;
        }
    }
}
