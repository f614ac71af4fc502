//! Safety Guard
//!
//! Validates destructive intent before anything else happens. No plan,
//! timer or network call exists until the guard returns
//! [`GuardDecision::Allowed`].

use crate::domain::ports::{expected_wipe_confirmation, AcknowledgerRef, ProvisionRequest};
use crate::error::Error;
use tracing::{debug, info};

/// Why a request was blocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// Device or share name missing
    MissingFields,
    /// Wipe confirmation text did not match exactly
    ConfirmationMismatch { expected: String },
    /// Operator declined the interactive acknowledgment
    Declined,
}

impl GuardRejection {
    /// Message to show the operator; a declined prompt is silent
    pub fn message(&self) -> Option<String> {
        match self {
            GuardRejection::Declined => None,
            other => Some(Error::from(other.clone()).to_string()),
        }
    }
}

impl From<GuardRejection> for Error {
    fn from(rejection: GuardRejection) -> Self {
        match rejection {
            GuardRejection::MissingFields => {
                Error::Validation("Device and share name are required.".to_string())
            }
            GuardRejection::ConfirmationMismatch { expected } => {
                Error::ConfirmationMismatch { expected }
            }
            GuardRejection::Declined => Error::UserAbort,
        }
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allowed,
    Blocked(GuardRejection),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allowed)
    }
}

/// Acknowledgment prompt for a wipe + repartition
pub fn wipe_prompt(request: &ProvisionRequest) -> String {
    format!(
        "This will DELETE all partitions on {}, recreate one partition, and format it as {}. Continue?",
        request.device,
        request.filesystem_type()
    )
}

/// Acknowledgment prompt for a format without repartitioning
pub fn format_prompt(request: &ProvisionRequest) -> String {
    format!("This will ERASE all data on {}. Continue?", request.device)
}

/// Pre-submission check for destructive requests
pub struct SafetyGuard {
    acknowledger: AcknowledgerRef,
}

impl SafetyGuard {
    pub fn new(acknowledger: AcknowledgerRef) -> Self {
        Self { acknowledger }
    }

    /// Run the check to completion, including any interactive prompt
    pub async fn check(&self, request: &ProvisionRequest) -> GuardDecision {
        if request.device.is_empty() || request.share_name.is_empty() {
            return GuardDecision::Blocked(GuardRejection::MissingFields);
        }

        let prompt = if let Some(typed) = request.wipe_confirmation() {
            let expected = expected_wipe_confirmation(&request.device);
            if typed != expected {
                debug!("Wipe confirmation mismatch for {}", request.device);
                return GuardDecision::Blocked(GuardRejection::ConfirmationMismatch { expected });
            }
            wipe_prompt(request)
        } else if request.format_before_mount() {
            format_prompt(request)
        } else {
            return GuardDecision::Allowed;
        };

        if self.acknowledger.acknowledge(&prompt).await {
            GuardDecision::Allowed
        } else {
            info!("Operator declined destructive action on {}", request.device);
            GuardDecision::Blocked(GuardRejection::Declined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FsType;
    use crate::testing::ScriptedAcknowledger;
    use std::sync::Arc;

    fn request(device: &str, share: &str, format: bool, wipe: bool, confirm: &str) -> ProvisionRequest {
        ProvisionRequest::from_form(
            device,
            share,
            None,
            Some(FsType::Ext4),
            format,
            wipe,
            Some(confirm.to_string()),
        )
    }

    #[tokio::test]
    async fn test_missing_fields_blocked_without_prompt() {
        let ack = Arc::new(ScriptedAcknowledger::new(true));
        let guard = SafetyGuard::new(ack.clone());

        let decision = guard.check(&request("", "x", true, false, "")).await;
        assert_eq!(decision, GuardDecision::Blocked(GuardRejection::MissingFields));
        assert_eq!(
            GuardRejection::MissingFields.message().as_deref(),
            Some("Device and share name are required.")
        );

        let decision = guard.check(&request("/dev/sdb", "", false, false, "")).await;
        assert!(!decision.is_allowed());
        assert!(ack.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_wipe_confirmation_is_case_sensitive() {
        let ack = Arc::new(ScriptedAcknowledger::new(true));
        let guard = SafetyGuard::new(ack.clone());

        let decision = guard
            .check(&request("/dev/sdb", "media", false, true, "wipe /dev/sdb"))
            .await;
        let GuardDecision::Blocked(rejection) = decision else {
            panic!("expected a blocked decision");
        };
        assert_eq!(
            rejection.message().as_deref(),
            Some("Confirmation mismatch. Type exactly: WIPE /dev/sdb")
        );
        assert!(ack.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_wipe_prompts_and_allows() {
        let ack = Arc::new(ScriptedAcknowledger::new(true));
        let guard = SafetyGuard::new(ack.clone());

        let decision = guard
            .check(&request("/dev/sdb", "media", false, true, "WIPE /dev/sdb"))
            .await;
        assert!(decision.is_allowed());
        assert_eq!(
            ack.prompts(),
            vec![
                "This will DELETE all partitions on /dev/sdb, recreate one partition, and format it as ext4. Continue?"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_declined_prompt_is_silent() {
        let ack = Arc::new(ScriptedAcknowledger::new(false));
        let guard = SafetyGuard::new(ack.clone());

        let decision = guard.check(&request("/dev/sdb", "media", true, false, "")).await;
        assert_eq!(decision, GuardDecision::Blocked(GuardRejection::Declined));
        assert_eq!(GuardRejection::Declined.message(), None);
        assert_eq!(
            ack.prompts(),
            vec!["This will ERASE all data on /dev/sdb. Continue?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_destructive_request_needs_no_prompt() {
        let ack = Arc::new(ScriptedAcknowledger::new(false));
        let guard = SafetyGuard::new(ack.clone());

        let decision = guard.check(&request("/dev/sdb", "media", false, false, "")).await;
        assert!(decision.is_allowed());
        assert!(ack.prompts().is_empty());
    }
}
