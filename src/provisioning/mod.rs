//! Provisioning Workflow
//!
//! Guarded, progress-reported execution of a destructive share-provisioning
//! request:
//!
//! - Safety guard: field checks, typed wipe confirmation, acknowledgment
//! - Plan builder: ordered step labels derived from the request
//! - Session: step statuses, elapsed and heartbeat timers, terminal outcome
//! - Reconciler: bounded, all-settle refresh of dependent views
//! - Form: one active session per device class, preempting older ones

pub mod events;
pub mod form;
pub mod guard;
pub mod plan;
pub mod reconcile;
pub mod session;

pub use events::SessionEvent;
pub use form::{FormConfig, ProvisioningForm, SubmitOutcome};
pub use guard::{GuardDecision, GuardRejection, SafetyGuard};
pub use plan::{ProvisionPlan, Step, StepStatus};
pub use reconcile::{ReconcileConfig, ReconcileReport, Reconciler, RefreshOutcome, RefreshTask};
pub use session::{
    ProvisioningSession, SessionConfig, SessionOutcome, SessionPhase, SessionSnapshot,
};
