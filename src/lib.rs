//! Share Provisioner
//!
//! Supervised provisioning of a physical device (USB or NVMe) as a network
//! share on a NAS host: safety-gated, reported as a step list with elapsed
//! time, and followed by a bounded refresh of the views it invalidated.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                         Provisioning Form                             │
//! │                 (one active session per device class)                 │
//! ├───────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────────────┐  │
//! │  │ Safety Guard │──▶│ Plan Builder │──▶│   Provisioning Session    │  │
//! │  └──────┬───────┘   └──────────────┘   │ (elapsed + heartbeat)     │  │
//! │         │                              └─────────────┬─────────────┘  │
//! │         ▼                                            ▼                │
//! │  ┌──────────────┐                      ┌───────────────────────────┐  │
//! │  │ Acknowledger │                      │ Reconciler (8s, settled)  │  │
//! │  └──────────────┘                      └─────────────┬─────────────┘  │
//! ├──────────────────────────────────────────────────────┼────────────────┤
//! │                         Ports / Adapters             │                │
//! │  ┌──────────────────────────┐   ┌────────────────────┴─────────────┐  │
//! │  │ OperationExecutor (HTTP) │   │ ViewRefresher (HTTP + view store)│  │
//! │  └──────────────────────────┘   └──────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provisioning`]: Guard, plan, session, reconciliation and form
//! - [`client`]: HTTP and terminal adapters
//! - [`domain`]: Request model and ports
//! - [`error`]: Error types and handling

pub mod client;
pub mod domain;
pub mod error;
pub mod provisioning;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use client::{
    ApiClient, DashboardViews, HttpClientConfig, HttpOperationClient, HttpViewRefresher,
    TerminalAcknowledger,
};

pub use domain::ports::{
    expected_wipe_confirmation, Acknowledger, AcknowledgerRef, DestructiveIntent, DeviceClass,
    FsType, OperationExecutor, OperationExecutorRef, OperationResult, ProvisionPayload,
    ProvisionRequest, ViewRefresher, ViewRefresherRef,
};

pub use error::{Error, ErrorKind, Result};

pub use provisioning::{
    FormConfig, GuardRejection, ProvisionPlan, ProvisioningForm, ProvisioningSession,
    ReconcileConfig, SessionConfig, SessionEvent, SessionOutcome, SessionPhase, SessionSnapshot,
    StepStatus, SubmitOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
