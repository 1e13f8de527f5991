//! Test helpers shared by the service tests.

use crate::service::RequestHandler;
use async_trait::async_trait;
use fm_01_process_directory::{ProcessIdentity, SiblingDirectory, StaticSupervisor};
use serde_json::Value;
use shared_types::{ClusterError, ProcessDescriptor, ProcessId, ProcessPacket};
use std::time::Duration;

pub(crate) const APP: &str = "api";

pub(crate) fn pid(id: u32) -> ProcessId {
    ProcessId::new(id)
}

/// Supervisor listing `ids` as online processes of `APP`.
pub(crate) fn online(ids: &[u32]) -> StaticSupervisor {
    StaticSupervisor::new(
        ids.iter()
            .map(|&id| ProcessDescriptor::online(pid(id), APP))
            .collect(),
    )
}

pub(crate) fn directory(supervisor: StaticSupervisor, id: u32) -> SiblingDirectory<StaticSupervisor> {
    SiblingDirectory::new(supervisor, ProcessIdentity::new(APP, pid(id)))
}

/// Answers every request with a fixed payload after a delay.
pub(crate) struct FixedAnswer {
    pub payload: Value,
    pub delay: Duration,
}

impl FixedAnswer {
    pub(crate) fn new(payload: Value) -> Self {
        Self {
            payload,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(payload: Value, delay: Duration) -> Self {
        Self { payload, delay }
    }
}

#[async_trait]
impl RequestHandler for FixedAnswer {
    async fn handle(&self, _request: &ProcessPacket) -> Result<Value, ClusterError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.payload.clone())
    }
}

/// Always fails.
pub(crate) struct FailingAnswer;

#[async_trait]
impl RequestHandler for FailingAnswer {
    async fn handle(&self, request: &ProcessPacket) -> Result<Value, ClusterError> {
        Err(ClusterError::HandlerFailed {
            topic: request.topic.clone(),
            reason: "registry locked".to_string(),
        })
    }
}
