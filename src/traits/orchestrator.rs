// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::DataBundle;
use crate::config::consts::DATA_REQUEST_ALL;
use crate::errors::TransportError;

/// Portion of the task data requested from the orchestrator.
///
/// The engine only ever asks for the complete bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataRequestScope {
    #[serde(rename = "all")]
    All,
}

impl DataRequestScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DataRequestScope::All => DATA_REQUEST_ALL,
        }
    }
}

/// The engine's only view of the orchestrator process.
///
/// Implementations own the transport. Both calls are request/response; the
/// engine decides per call site whether it awaits the response (data requests,
/// helper RPCs) or hands the call to a background task (log forwarding).
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Fetch the data bundle for `task_id`.
    async fn request_data(
        &self,
        task_id: &str,
        scope: DataRequestScope,
    ) -> Result<DataBundle, TransportError>;

    /// Invoke `method` on the orchestrator on behalf of `task_id`.
    async fn rpc_call(
        &self,
        task_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, TransportError>;
}
