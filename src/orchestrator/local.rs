// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::bundle::DataBundle;
use crate::config::consts::LOG_OUTPUT_METHOD;
use crate::errors::TransportError;
use crate::observability::messages::orchestrator::NodeOutputLogged;
use crate::observability::messages::StructuredLog;
use crate::traits::{DataRequestScope, Orchestrator};

/// An RPC call received by a [`LocalOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub task_id: String,
    pub method: String,
    pub args: Vec<Value>,
}

/// In-process orchestrator holding bundles in memory.
///
/// Log lines forwarded by sandboxed code are written to `tracing`. Other RPC
/// methods answer with a canned response registered through
/// [`LocalOrchestrator::with_rpc_response`], or `null`. Every call is recorded.
#[derive(Debug, Default)]
pub struct LocalOrchestrator {
    bundles: Mutex<HashMap<String, DataBundle>>,
    responses: Mutex<HashMap<String, Result<Value, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl LocalOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(self, task_id: impl Into<String>, bundle: DataBundle) -> Self {
        self.insert_bundle(task_id, bundle);
        self
    }

    pub fn insert_bundle(&self, task_id: impl Into<String>, bundle: DataBundle) {
        if let Ok(mut bundles) = self.bundles.lock() {
            bundles.insert(task_id.into(), bundle);
        }
    }

    /// Answer every call to `method` with `response`; `Err` rejects the call.
    pub fn with_rpc_response(self, method: impl Into<String>, response: Result<Value, String>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(method.into(), response);
        }
        self
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Lines received through the log-forwarding method.
    pub fn logged_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == LOG_OUTPUT_METHOD)
            .flat_map(|call| call.args)
            .filter_map(|arg| arg.as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Orchestrator for LocalOrchestrator {
    async fn request_data(
        &self,
        task_id: &str,
        _scope: DataRequestScope,
    ) -> Result<DataBundle, TransportError> {
        let bundles = self.bundles.lock().map_err(|_| TransportError::Closed)?;
        bundles
            .get(task_id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownTask(task_id.to_string()))
    }

    async fn rpc_call(
        &self,
        task_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, TransportError> {
        if method == LOG_OUTPUT_METHOD {
            for line in args.iter().filter_map(Value::as_str) {
                NodeOutputLogged { task_id, line }.log();
            }
        }

        self.calls
            .lock()
            .map_err(|_| TransportError::Closed)?
            .push(RecordedCall {
                task_id: task_id.to_string(),
                method: method.to_string(),
                args,
            });

        let responses = self.responses.lock().map_err(|_| TransportError::Closed)?;
        match responses.get(method) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(TransportError::RpcFailed {
                method: method.to_string(),
                message: message.clone(),
            }),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::bundle_with_items;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_task_is_reported() {
        let orchestrator = LocalOrchestrator::new();
        let err = orchestrator
            .request_data("missing", DataRequestScope::All)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::UnknownTask("missing".to_string()));
    }

    #[tokio::test]
    async fn test_bundle_is_returned_by_task_id() {
        let orchestrator = LocalOrchestrator::new().with_bundle("t-1", bundle_with_items(2));
        let bundle = orchestrator
            .request_data("t-1", DataRequestScope::All)
            .await
            .unwrap();
        assert_eq!(bundle.items.len(), 2);
    }

    #[tokio::test]
    async fn test_rpc_calls_are_recorded_and_answered() {
        let orchestrator = LocalOrchestrator::new()
            .with_rpc_response("helpers.httpRequest", Ok(json!({"status": 200})))
            .with_rpc_response("helpers.binaryToString", Err("unsupported".to_string()));

        let ok = orchestrator
            .rpc_call("t-1", "helpers.httpRequest", vec![json!("https://example.com")])
            .await
            .unwrap();
        assert_eq!(ok, json!({"status": 200}));

        let err = orchestrator
            .rpc_call("t-1", "helpers.binaryToString", vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported"));

        orchestrator
            .rpc_call("t-1", LOG_OUTPUT_METHOD, vec![json!("hello")])
            .await
            .unwrap();

        assert_eq!(orchestrator.calls().len(), 3);
        assert_eq!(orchestrator.logged_lines(), vec!["hello".to_string()]);
    }
}
