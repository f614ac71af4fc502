//! Reconciliation Coordinator
//!
//! After a successful operation, refreshes every dashboard view the
//! operation invalidated. Tasks run concurrently, each bounded by its own
//! timeout, and every task is awaited regardless of how the others fare.
//! Failures here qualify the success message; they never turn a completed
//! operation into a failed one.

use crate::domain::ports::{DeviceClass, ViewRefresherRef};
use crate::error::Error;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix of the warning attached to a qualified success
pub const WARNING_PREFIX: &str = "Operation completed, but UI refresh had issues: ";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Budget for each refresh task
    pub task_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_millis(8000),
        }
    }
}

// =============================================================================
// Refresh Tasks
// =============================================================================

/// A view invalidated by a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTask {
    /// Share/service summary
    ServiceSummary,
    /// Device list for one device class
    Devices(DeviceClass),
}

impl RefreshTask {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshTask::ServiceSummary => "NAS service refresh",
            RefreshTask::Devices(DeviceClass::Usb) => "USB device refresh",
            RefreshTask::Devices(DeviceClass::Nvme) => "NVMe device refresh",
        }
    }
}

/// Views to refresh after provisioning a device of the given class
pub fn refresh_tasks(device_class: DeviceClass) -> Vec<RefreshTask> {
    vec![RefreshTask::ServiceSummary, RefreshTask::Devices(device_class)]
}

/// How a single refresh task settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Ok,
    TimedOut(String),
    Err(String),
}

impl RefreshOutcome {
    /// Failure message, if the task did not succeed
    pub fn failure(&self) -> Option<&str> {
        match self {
            RefreshOutcome::Ok => None,
            RefreshOutcome::TimedOut(msg) | RefreshOutcome::Err(msg) => Some(msg),
        }
    }
}

/// Settled result of one refresh task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshResult {
    pub task: RefreshTask,
    pub outcome: RefreshOutcome,
}

// =============================================================================
// Report
// =============================================================================

/// Aggregate of every settled refresh task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub ok: bool,
    pub warning: String,
    pub results: Vec<RefreshResult>,
}

impl ReconcileReport {
    pub fn from_results(results: Vec<RefreshResult>) -> Self {
        let failures: Vec<&str> = results
            .iter()
            .filter_map(|r| r.outcome.failure())
            .collect();

        let warning = if failures.is_empty() {
            String::new()
        } else {
            format!("{}{}", WARNING_PREFIX, failures.join(" | "))
        };

        Self {
            ok: failures.is_empty(),
            warning,
            results,
        }
    }

    /// Final display message for a completed operation
    pub fn qualify(&self, message: &str) -> String {
        if self.ok {
            message.to_string()
        } else {
            format!("{} ({})", message, self.warning)
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Runs refresh tasks with all-settle semantics
pub struct Reconciler {
    views: ViewRefresherRef,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(views: ViewRefresherRef, config: ReconcileConfig) -> Self {
        Self { views, config }
    }

    /// Refresh every view invalidated for `device_class`
    pub async fn reconcile(&self, device_class: DeviceClass) -> ReconcileReport {
        let tasks = refresh_tasks(device_class);
        debug!("Reconciling {} views after {} provisioning", tasks.len(), device_class);

        let results = join_all(tasks.into_iter().map(|task| self.run(task))).await;
        let report = ReconcileReport::from_results(results);

        if !report.ok {
            warn!("{}", report.warning);
        }
        report
    }

    /// Run one task; on timeout we stop waiting and leave the refresh to
    /// finish (or fail) in the background, its result unobserved.
    async fn run(&self, task: RefreshTask) -> RefreshResult {
        let views = self.views.clone();
        let handle = tokio::spawn(async move {
            match task {
                RefreshTask::ServiceSummary => views.refresh_service_summary().await,
                RefreshTask::Devices(class) => views.refresh_devices(class).await,
            }
        });

        let outcome = match tokio::time::timeout(self.config.task_timeout, handle).await {
            Ok(Ok(Ok(()))) => RefreshOutcome::Ok,
            Ok(Ok(Err(e))) => RefreshOutcome::Err(
                Error::RefreshFailed {
                    label: task.label().to_string(),
                    reason: e.to_string(),
                }
                .to_string(),
            ),
            Ok(Err(join_err)) => RefreshOutcome::Err(
                Error::RefreshFailed {
                    label: task.label().to_string(),
                    reason: join_err.to_string(),
                }
                .to_string(),
            ),
            Err(_) => RefreshOutcome::TimedOut(
                Error::RefreshTimeout {
                    label: task.label().to_string(),
                    timeout: self.config.task_timeout,
                }
                .to_string(),
            ),
        };

        RefreshResult { task, outcome }
    }
}
