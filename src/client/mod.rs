//! Adapters
//!
//! Port implementations backed by the dashboard HTTP API and the terminal.

pub mod http;
pub mod prompt;
pub mod views;

pub use http::{ApiClient, HttpClientConfig, HttpOperationClient};
pub use prompt::TerminalAcknowledger;
pub use views::{DashboardViews, DeviceCandidate, HttpViewRefresher, ServiceSummary};
