// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::errors::TransportError;
use crate::observability::messages::sandbox::RpcCallFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::Orchestrator;

/// Synchronous access to orchestrator RPCs for code running on a sandbox worker.
///
/// The sandbox runs on a blocking thread, so calls are driven to completion on
/// the runtime handle captured when the bridge was created. Must not be called
/// from an async context.
#[derive(Clone)]
pub struct RpcBridge {
    orchestrator: Arc<dyn Orchestrator>,
    runtime: Handle,
    task_id: Arc<str>,
    allowed: Arc<BTreeSet<String>>,
}

impl RpcBridge {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        runtime: Handle,
        task_id: &str,
        allowed: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            orchestrator,
            runtime,
            task_id: Arc::from(task_id),
            allowed: Arc::new(allowed.into_iter().collect()),
        }
    }

    /// Methods sandboxed code may call.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Perform `method(args)` and wait for the response.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
        if !self.allowed.contains(method) {
            return Err(TransportError::MethodNotAllowed(method.to_string()));
        }
        let result = self
            .runtime
            .block_on(self.orchestrator.rpc_call(&self.task_id, method, args));
        if let Err(error) = &result {
            RpcCallFailed {
                task_id: &self.task_id,
                method,
                error,
            }
            .log();
        }
        result
    }

    /// [`RpcBridge::call`] with JSON text in and out, as seen by the sandbox.
    ///
    /// The reply is `{"status":"success","data":...}` or
    /// `{"status":"error","message":...}`; it never fails.
    pub fn call_json(&self, method: &str, args_json: &str) -> String {
        let reply = match serde_json::from_str::<Vec<Value>>(args_json)
            .map_err(TransportError::from)
            .and_then(|args| self.call(method, args))
        {
            Ok(data) => json!({"status": "success", "data": data}),
            Err(TransportError::RpcFailed { message, .. }) => {
                json!({"status": "error", "message": message})
            }
            Err(error) => json!({"status": "error", "message": error.to_string()}),
        };
        reply.to_string()
    }
}

impl std::fmt::Debug for RpcBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcBridge")
            .field("task_id", &self.task_id)
            .field("allowed", &self.allowed)
            .finish()
    }
}
