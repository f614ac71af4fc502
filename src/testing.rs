//! Test doubles for the provisioning ports

use crate::domain::ports::{
    Acknowledger, DeviceClass, OperationExecutor, OperationResult, ProvisionPayload,
    ViewRefresher,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// Acknowledger
// =============================================================================

/// Answers every prompt the same way and records what was asked
pub struct ScriptedAcknowledger {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAcknowledger {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Acknowledger for ScriptedAcknowledger {
    async fn acknowledge(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answer
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Scripted terminal reply of the fake executor
#[derive(Debug, Clone)]
pub enum FakeReply {
    Success(String),
    Reject(String),
    AuthExpired,
    /// Success status with an undecodable body
    Malformed,
}

/// Executor that replies after a fixed delay
pub struct FakeExecutor {
    reply: FakeReply,
    delay: Duration,
    calls: Mutex<Vec<(DeviceClass, ProvisionPayload)>>,
}

impl FakeExecutor {
    pub fn new(reply: FakeReply, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(DeviceClass, ProvisionPayload)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl OperationExecutor for FakeExecutor {
    async fn submit(
        &self,
        device_class: DeviceClass,
        payload: &ProvisionPayload,
    ) -> Result<OperationResult> {
        self.calls.lock().push((device_class, payload.clone()));
        tokio::time::sleep(self.delay).await;

        match &self.reply {
            FakeReply::Success(message) => Ok(OperationResult {
                message: message.clone(),
                data: None,
            }),
            FakeReply::Reject(detail) => Err(Error::Remote(detail.clone())),
            FakeReply::AuthExpired => Err(Error::AuthExpired),
            FakeReply::Malformed => {
                Err(serde_json::from_str::<serde_json::Value>("{").unwrap_err().into())
            }
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// View refresher with configurable latency and failures
#[derive(Default)]
pub struct FakeViews {
    summary_delay: Duration,
    devices_delay: Duration,
    summary_error: Option<String>,
    summary_refreshes: AtomicU64,
    usb_refreshes: AtomicU64,
    nvme_refreshes: AtomicU64,
}

impl FakeViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary_delay(mut self, delay: Duration) -> Self {
        self.summary_delay = delay;
        self
    }

    pub fn with_devices_delay(mut self, delay: Duration) -> Self {
        self.devices_delay = delay;
        self
    }

    pub fn with_summary_error(mut self, message: &str) -> Self {
        self.summary_error = Some(message.to_string());
        self
    }

    /// Completed summary refreshes
    pub fn summary_refreshes(&self) -> u64 {
        self.summary_refreshes.load(Ordering::SeqCst)
    }

    /// Completed device-list refreshes for a class
    pub fn device_refreshes(&self, device_class: DeviceClass) -> u64 {
        match device_class {
            DeviceClass::Usb => self.usb_refreshes.load(Ordering::SeqCst),
            DeviceClass::Nvme => self.nvme_refreshes.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl ViewRefresher for FakeViews {
    async fn refresh_service_summary(&self) -> Result<()> {
        tokio::time::sleep(self.summary_delay).await;
        if let Some(message) = &self.summary_error {
            return Err(Error::Remote(message.clone()));
        }
        self.summary_refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_devices(&self, device_class: DeviceClass) -> Result<()> {
        tokio::time::sleep(self.devices_delay).await;
        match device_class {
            DeviceClass::Usb => self.usb_refreshes.fetch_add(1, Ordering::SeqCst),
            DeviceClass::Nvme => self.nvme_refreshes.fetch_add(1, Ordering::SeqCst),
        };
        Ok(())
    }
}
