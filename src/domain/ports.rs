//! Domain Ports - Core trait definitions for the share provisioner
//!
//! These traits define the boundaries between the provisioning logic and
//! external systems: the remote operation executor, the dashboard views
//! that must be refreshed afterwards, and the operator who acknowledges
//! destructive actions. Adapters implement these traits to provide
//! concrete functionality.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Device Class
// =============================================================================

/// Class of block device a provisioning form targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Usb,
    Nvme,
}

impl DeviceClass {
    /// Human-readable label used in operation titles
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::Usb => "USB",
            DeviceClass::Nvme => "NVMe",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Usb => write!(f, "usb"),
            DeviceClass::Nvme => write!(f, "nvme"),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "usb" => Ok(DeviceClass::Usb),
            "nvme" => Ok(DeviceClass::Nvme),
            other => Err(Error::Validation(format!(
                "Invalid device class: {}. Use 'usb' or 'nvme'",
                other
            ))),
        }
    }
}

// =============================================================================
// Filesystem Type
// =============================================================================

/// Filesystems the executor accepts for NAS usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    #[default]
    Ext4,
    Exfat,
}

impl std::fmt::Display for FsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsType::Ext4 => write!(f, "ext4"),
            FsType::Exfat => write!(f, "exfat"),
        }
    }
}

impl FromStr for FsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ext4" => Ok(FsType::Ext4),
            "exfat" => Ok(FsType::Exfat),
            other => Err(Error::Validation(format!(
                "Unsupported filesystem: {}. Only ext4 and exfat are supported",
                other
            ))),
        }
    }
}

// =============================================================================
// Destructive Intent
// =============================================================================

/// How destructive a provisioning request is
///
/// Confirmation text only exists for a wipe, so a confirmation without a
/// wipe cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestructiveIntent {
    /// Mount the existing filesystem as-is
    Preserve,
    /// Format the device without repartitioning
    FormatOnly { fs_type: Option<FsType> },
    /// Destroy every partition, create one, then format it
    WipeAndRepartition {
        fs_type: Option<FsType>,
        confirmation: String,
    },
}

impl DestructiveIntent {
    /// Whether a filesystem will be created
    pub fn formats(&self) -> bool {
        !matches!(self, DestructiveIntent::Preserve)
    }

    /// Whether the partition table will be rewritten
    pub fn wipes(&self) -> bool {
        matches!(self, DestructiveIntent::WipeAndRepartition { .. })
    }
}

/// Confirmation text the operator must type before a wipe
pub fn expected_wipe_confirmation(device: &str) -> String {
    format!("WIPE {}", device)
}

// =============================================================================
// Provisioning Request
// =============================================================================

/// Operator request to publish a block device as a network share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Target block device (e.g., /dev/sdb)
    pub device: String,
    /// Desired network share name
    pub share_name: String,
    /// Explicit mount path; the executor picks one when absent
    pub mountpoint: Option<String>,
    /// Destructive intent
    pub intent: DestructiveIntent,
}

impl ProvisionRequest {
    /// Build a request from raw form fields
    ///
    /// Text inputs are trimmed. `wipe_repartition` wins over
    /// `format_before_mount`, and the confirmation text is dropped unless a
    /// wipe was requested.
    pub fn from_form(
        device: impl Into<String>,
        share_name: impl Into<String>,
        mountpoint: Option<String>,
        fs_type: Option<FsType>,
        format_before_mount: bool,
        wipe_repartition: bool,
        wipe_confirmation: Option<String>,
    ) -> Self {
        let intent = if wipe_repartition {
            DestructiveIntent::WipeAndRepartition {
                fs_type,
                confirmation: wipe_confirmation
                    .map(|c| c.trim().to_string())
                    .unwrap_or_default(),
            }
        } else if format_before_mount {
            DestructiveIntent::FormatOnly { fs_type }
        } else {
            DestructiveIntent::Preserve
        };

        Self {
            device: device.into(),
            share_name: share_name.into().trim().to_string(),
            mountpoint: mountpoint
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            intent,
        }
    }

    /// Whether the device will be formatted
    pub fn format_before_mount(&self) -> bool {
        self.intent.formats()
    }

    /// Whether the partition table will be wiped and recreated
    pub fn wipe_repartition(&self) -> bool {
        self.intent.wipes()
    }

    /// Filesystem that will be created, defaulting to ext4
    pub fn filesystem_type(&self) -> FsType {
        match &self.intent {
            DestructiveIntent::Preserve => FsType::default(),
            DestructiveIntent::FormatOnly { fs_type }
            | DestructiveIntent::WipeAndRepartition { fs_type, .. } => {
                fs_type.unwrap_or_default()
            }
        }
    }

    /// Operator-typed wipe confirmation, if a wipe was requested
    pub fn wipe_confirmation(&self) -> Option<&str> {
        match &self.intent {
            DestructiveIntent::WipeAndRepartition { confirmation, .. } => Some(confirmation),
            _ => None,
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// JSON body of the destructive-operation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionPayload {
    pub device: String,
    pub share_name: String,
    pub mountpoint: Option<String>,
    pub format_before_mount: bool,
    /// Non-null only if formatting occurs
    pub fs_type: Option<FsType>,
    pub wipe_repartition: bool,
    /// Non-null only for a wipe
    pub wipe_confirmation: Option<String>,
}

impl From<&ProvisionRequest> for ProvisionPayload {
    fn from(request: &ProvisionRequest) -> Self {
        Self {
            device: request.device.clone(),
            share_name: request.share_name.clone(),
            mountpoint: request.mountpoint.clone(),
            format_before_mount: request.format_before_mount(),
            fs_type: request
                .format_before_mount()
                .then(|| request.filesystem_type()),
            wipe_repartition: request.wipe_repartition(),
            wipe_confirmation: request.wipe_confirmation().map(str::to_string),
        }
    }
}

/// Terminal success result of the remote operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Human-readable success message
    pub message: String,
    /// Executor-specific details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// =============================================================================
// Operation Executor Port
// =============================================================================

/// Port for the external executor that performs the destructive work
///
/// One call represents the whole operation; only its terminal result is
/// observable.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Submit the operation and wait for its terminal result
    ///
    /// Fails with [`Error::Remote`] on rejection or transport failure and
    /// with [`Error::AuthExpired`] when the operator must log in again.
    async fn submit(
        &self,
        device_class: DeviceClass,
        payload: &ProvisionPayload,
    ) -> Result<OperationResult>;
}

// =============================================================================
// View Refresher Port
// =============================================================================

/// Port for refreshing dashboard views invalidated by a provisioning run
///
/// Implementations must be idempotent: two forms may refresh the shared
/// service summary at the same time.
#[async_trait]
pub trait ViewRefresher: Send + Sync {
    /// Refresh the share/service summary view
    async fn refresh_service_summary(&self) -> Result<()>;

    /// Refresh the device list for a device class
    async fn refresh_devices(&self, device_class: DeviceClass) -> Result<()>;
}

// =============================================================================
// Acknowledger Port
// =============================================================================

/// Port for interactive yes/no acknowledgment of a destructive action
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Ask the operator; `true` means proceed
    async fn acknowledge(&self, prompt: &str) -> bool;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type OperationExecutorRef = Arc<dyn OperationExecutor>;
pub type ViewRefresherRef = Arc<dyn ViewRefresher>;
pub type AcknowledgerRef = Arc<dyn Acknowledger>;
