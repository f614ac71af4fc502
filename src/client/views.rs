//! Dashboard Views
//!
//! The read-only views a provisioning run invalidates: the share service
//! summary and the per-class device lists. [`HttpViewRefresher`] reloads
//! them from the dashboard API into a [`DashboardViews`] store; every
//! refresh replaces the stored view wholesale, so running one twice is
//! harmless.

use crate::client::http::{ApiClient, ApiEnvelope};
use crate::domain::ports::{DeviceClass, ViewRefresher};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Service whose state the NAS summary shows
pub const SHARE_SERVICE: &str = "samba";

const SERVICES_PATH: &str = "/api/services/list";
const DRIVES_PATH: &str = "/api/storage/drives";

// =============================================================================
// Wire Types
// =============================================================================

/// One block device as reported by the drive listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub fstype: Option<String>,
    /// Human-readable size, e.g. `"931.5G"`
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub is_usb: bool,
}

impl DriveEntry {
    /// Case-insensitive, whitespace-tolerant transport match
    fn transport_is(&self, wanted: &str) -> bool {
        self.transport
            .as_deref()
            .map(|t| t.trim().eq_ignore_ascii_case(wanted))
            .unwrap_or(false)
    }
}

/// One service as reported by the service listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub active: bool,
}

// =============================================================================
// Service Summary
// =============================================================================

/// Enabled/active state of the share service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceSummary {
    Known { enabled: bool, active: bool },
    Unavailable,
}

impl ServiceSummary {
    pub fn from_services(services: &[ServiceEntry]) -> Self {
        services
            .iter()
            .find(|s| s.service == SHARE_SERVICE)
            .map(|s| ServiceSummary::Known {
                enabled: s.enabled,
                active: s.active,
            })
            .unwrap_or(ServiceSummary::Unavailable)
    }

    pub fn enabled_label(&self) -> &'static str {
        match self {
            ServiceSummary::Known { enabled: true, .. } => "Yes",
            ServiceSummary::Known { enabled: false, .. } => "No",
            ServiceSummary::Unavailable => "Unavailable",
        }
    }

    pub fn active_label(&self) -> &'static str {
        match self {
            ServiceSummary::Known { active: true, .. } => "Running",
            ServiceSummary::Known { active: false, .. } => "Stopped",
            ServiceSummary::Unavailable => "Unavailable",
        }
    }
}

// =============================================================================
// Device Candidates
// =============================================================================

/// Whether a candidate is a whole disk or a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Disk,
    Partition,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::Disk => write!(f, "disk"),
            CandidateKind::Partition => write!(f, "partition"),
        }
    }
}

/// A drive offered as a provisioning target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCandidate {
    pub drive: DriveEntry,
    pub kind: CandidateKind,
}

impl DeviceCandidate {
    /// Option text for a device picker
    pub fn option_label(&self, device_class: DeviceClass) -> String {
        let size = self.drive.size.as_deref().unwrap_or("-");
        match device_class {
            DeviceClass::Usb => format!("{} ({})", self.drive.device, size),
            DeviceClass::Nvme => format!("{} ({}, {})", self.drive.device, size, self.kind),
        }
    }
}

fn nvme_partition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/dev/nvme\d+n\d+p\d+$").expect("valid nvme partition regex"))
}

fn nvme_disk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/dev/nvme\d+n\d+$").expect("valid nvme disk regex"))
}

/// USB drives: flagged `is_usb` or reporting exactly the `usb` transport
///
/// `sdX` names end in a digit only for partitions.
pub fn select_usb(drives: &[DriveEntry]) -> Vec<DeviceCandidate> {
    drives
        .iter()
        .filter(|d| d.is_usb || d.transport.as_deref() == Some("usb"))
        .map(|d| DeviceCandidate {
            drive: d.clone(),
            kind: if d.device.ends_with(|c: char| c.is_ascii_digit()) {
                CandidateKind::Partition
            } else {
                CandidateKind::Disk
            },
        })
        .collect()
}

/// NVMe drives ordered partitions first, then whole disks, then the rest
pub fn select_nvme(drives: &[DriveEntry]) -> Vec<DeviceCandidate> {
    let all: Vec<&DriveEntry> = drives
        .iter()
        .filter(|d| {
            d.transport_is("nvme") || d.device.trim().to_lowercase().starts_with("/dev/nvme")
        })
        .collect();

    let partitions = all.iter().filter(|d| nvme_partition_re().is_match(&d.device));
    let disks = all.iter().filter(|d| nvme_disk_re().is_match(&d.device));
    let others = all
        .iter()
        .filter(|d| !nvme_partition_re().is_match(&d.device) && !nvme_disk_re().is_match(&d.device));

    partitions
        .map(|d| (d, CandidateKind::Partition))
        .chain(disks.map(|d| (d, CandidateKind::Disk)))
        .chain(others.map(|d| (d, CandidateKind::Disk)))
        .map(|(d, kind)| DeviceCandidate {
            drive: (*d).clone(),
            kind,
        })
        .collect()
}

/// Candidates for one device class
pub fn select_candidates(device_class: DeviceClass, drives: &[DriveEntry]) -> Vec<DeviceCandidate> {
    match device_class {
        DeviceClass::Usb => select_usb(drives),
        DeviceClass::Nvme => select_nvme(drives),
    }
}

/// Status line shown above a device list
pub fn device_status_line(device_class: DeviceClass, count: usize) -> String {
    match (device_class, count) {
        (DeviceClass::Usb, 0) => "No USB drives detected.".to_string(),
        (DeviceClass::Usb, n) => format!("{} USB device(s) detected.", n),
        (DeviceClass::Nvme, 0) => "No NVMe drives detected.".to_string(),
        (DeviceClass::Nvme, n) => format!("{} NVMe candidate device(s) detected.", n),
    }
}

// =============================================================================
// View Store
// =============================================================================

/// A stored view with the time it was loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub value: T,
    pub loaded_at: DateTime<Utc>,
}

impl<T> Loaded<T> {
    fn now(value: T) -> Self {
        Self {
            value,
            loaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    service_summary: Option<Loaded<ServiceSummary>>,
    usb_devices: Option<Loaded<Vec<DeviceCandidate>>>,
    nvme_devices: Option<Loaded<Vec<DeviceCandidate>>>,
}

/// In-memory copy of the dashboard views
#[derive(Debug, Default)]
pub struct DashboardViews {
    state: RwLock<ViewState>,
}

impl DashboardViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_summary(&self) -> Option<Loaded<ServiceSummary>> {
        self.state.read().service_summary.clone()
    }

    pub fn devices(&self, device_class: DeviceClass) -> Option<Loaded<Vec<DeviceCandidate>>> {
        let state = self.state.read();
        match device_class {
            DeviceClass::Usb => state.usb_devices.clone(),
            DeviceClass::Nvme => state.nvme_devices.clone(),
        }
    }

    pub fn set_service_summary(&self, summary: ServiceSummary) {
        self.state.write().service_summary = Some(Loaded::now(summary));
    }

    pub fn set_devices(&self, device_class: DeviceClass, devices: Vec<DeviceCandidate>) {
        let mut state = self.state.write();
        let slot = match device_class {
            DeviceClass::Usb => &mut state.usb_devices,
            DeviceClass::Nvme => &mut state.nvme_devices,
        };
        *slot = Some(Loaded::now(devices));
    }
}

// =============================================================================
// HTTP View Refresher
// =============================================================================

/// Reloads dashboard views from the API
pub struct HttpViewRefresher {
    api: ApiClient,
    views: Arc<DashboardViews>,
}

impl HttpViewRefresher {
    pub fn new(api: ApiClient, views: Arc<DashboardViews>) -> Self {
        Self { api, views }
    }

    pub fn views(&self) -> Arc<DashboardViews> {
        self.views.clone()
    }

    /// Fetch the full drive listing
    pub async fn fetch_drives(&self) -> Result<Vec<DriveEntry>> {
        let envelope: ApiEnvelope<Vec<DriveEntry>> = self.api.get_json(DRIVES_PATH).await?;
        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl ViewRefresher for HttpViewRefresher {
    async fn refresh_service_summary(&self) -> Result<()> {
        let envelope: ApiEnvelope<Vec<ServiceEntry>> = self.api.get_json(SERVICES_PATH).await?;
        let summary = ServiceSummary::from_services(&envelope.data.unwrap_or_default());

        debug!(
            "Share service enabled: {}, active: {}",
            summary.enabled_label(),
            summary.active_label()
        );
        self.views.set_service_summary(summary);
        Ok(())
    }

    async fn refresh_devices(&self, device_class: DeviceClass) -> Result<()> {
        let drives = self.fetch_drives().await?;
        let candidates = select_candidates(device_class, &drives);

        debug!("{}", device_status_line(device_class, candidates.len()));
        self.views.set_devices(device_class, candidates);
        Ok(())
    }
}
