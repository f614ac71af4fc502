//! Plan Builder
//!
//! Derives the ordered, human-readable step list shown while a provisioning
//! operation is outstanding. The plan is a presentation aid: the executor
//! performs the real work in one call and never reports step completions.

use crate::domain::ports::ProvisionRequest;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Step Labels
// =============================================================================

pub const STEP_VALIDATE: &str = "Validate request";
pub const STEP_WIPE: &str = "Wipe existing partitions";
pub const STEP_PARTITION: &str = "Create partition table + one partition";
pub const STEP_MOUNT: &str = "Mount filesystem";
pub const STEP_PUBLISH: &str = "Publish network share";
pub const STEP_REFRESH: &str = "Refresh dependent views";

// =============================================================================
// Step
// =============================================================================

/// Presentation status of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl StepStatus {
    /// Fixed-width marker used when rendering the step list
    pub fn marker(&self) -> &'static str {
        match self {
            StepStatus::Pending => "[PEND]",
            StepStatus::Running => "[WAIT]",
            StepStatus::Done => "[DONE]",
            StepStatus::Error => "[ERR]",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Done => write!(f, "done"),
            StepStatus::Error => write!(f, "error"),
        }
    }
}

/// A labelled step with its current status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub label: String,
    pub status: StepStatus,
}

impl Step {
    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: StepStatus::Pending,
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Build the ordered step labels for a request
///
/// Deterministic and total; no step is ever omitted or reordered.
pub fn step_labels(request: &ProvisionRequest) -> Vec<String> {
    let mut labels = vec![STEP_VALIDATE.to_string()];

    if request.wipe_repartition() {
        labels.push(STEP_WIPE.to_string());
        labels.push(STEP_PARTITION.to_string());
    }

    if request.format_before_mount() || request.wipe_repartition() {
        labels.push(format!("Format filesystem ({})", request.filesystem_type()));
    }

    labels.push(STEP_MOUNT.to_string());
    labels.push(STEP_PUBLISH.to_string());
    labels.push(STEP_REFRESH.to_string());
    labels
}

/// Immutable ordered plan owned by one provisioning session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    labels: Vec<String>,
}

impl ProvisionPlan {
    /// Build the plan for a request
    ///
    /// Device and share name must be non-empty.
    pub fn build(request: &ProvisionRequest) -> Result<Self> {
        if request.device.is_empty() || request.share_name.is_empty() {
            return Err(Error::Validation(
                "Device and share name are required.".to_string(),
            ));
        }

        Ok(Self {
            labels: step_labels(request),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the final step
    pub fn last_index(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }

    /// Fresh step list with every step pending
    pub fn pending_steps(&self) -> Vec<Step> {
        self.labels.iter().map(Step::pending).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FsType;

    fn request(format: bool, wipe: bool, fs_type: Option<FsType>) -> ProvisionRequest {
        ProvisionRequest::from_form(
            "/dev/sdb",
            "media",
            None,
            fs_type,
            format,
            wipe,
            wipe.then(|| "WIPE /dev/sdb".to_string()),
        )
    }

    #[test]
    fn test_wipe_plan_has_seven_steps() {
        for format in [false, true] {
            let plan = ProvisionPlan::build(&request(format, true, Some(FsType::Ext4))).unwrap();
            assert_eq!(
                plan.labels(),
                &[
                    "Validate request",
                    "Wipe existing partitions",
                    "Create partition table + one partition",
                    "Format filesystem (ext4)",
                    "Mount filesystem",
                    "Publish network share",
                    "Refresh dependent views",
                ]
            );
            assert_eq!(plan.last_index(), 6);
        }
    }

    #[test]
    fn test_format_only_plan_has_five_steps() {
        let plan = ProvisionPlan::build(&request(true, false, Some(FsType::Exfat))).unwrap();
        assert_eq!(
            plan.labels(),
            &[
                "Validate request",
                "Format filesystem (exfat)",
                "Mount filesystem",
                "Publish network share",
                "Refresh dependent views",
            ]
        );
    }

    #[test]
    fn test_preserve_plan_has_no_format_step() {
        let plan = ProvisionPlan::build(&request(false, false, Some(FsType::Exfat))).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.labels().iter().all(|l| !l.starts_with("Format")));
        assert_eq!(plan.labels()[0], STEP_VALIDATE);
        assert_eq!(plan.labels()[3], STEP_REFRESH);
    }

    #[test]
    fn test_format_label_defaults_to_ext4() {
        let labels = step_labels(&request(true, false, None));
        assert_eq!(labels[1], "Format filesystem (ext4)");
    }

    #[test]
    fn test_build_rejects_missing_fields() {
        let mut req = request(false, false, None);
        req.device.clear();
        assert!(ProvisionPlan::build(&req).is_err());

        let mut req = request(false, false, None);
        req.share_name.clear();
        assert!(ProvisionPlan::build(&req).is_err());
    }

    #[test]
    fn test_pending_steps() {
        let plan = ProvisionPlan::build(&request(false, false, None)).unwrap();
        let steps = plan.pending_steps();
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(StepStatus::Running.marker(), "[WAIT]");
    }
}
