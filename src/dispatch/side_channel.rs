// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::consts::LOG_OUTPUT_METHOD;
use crate::observability::messages::sandbox::LogForwardFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::Orchestrator;

/// A fire-and-forget call queued for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    pub method: String,
    pub args: Vec<Value>,
}

/// Unbounded outbound queue for one task.
///
/// Enqueuing never blocks and never fails from the caller's point of view. A
/// background task forwards queued calls in order; a forward that fails is
/// logged and dropped. The queue closes once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SideChannel {
    task_id: Arc<str>,
    tx: mpsc::UnboundedSender<OutboundCall>,
}

impl SideChannel {
    /// Open the queue for `task_id` and spawn its drain task.
    ///
    /// The join handle resolves to the number of calls forwarded successfully
    /// once the queue is closed and drained. Callers are free to drop it.
    pub fn spawn(orchestrator: Arc<dyn Orchestrator>, task_id: &str) -> (Self, JoinHandle<usize>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundCall>();
        let task_id: Arc<str> = Arc::from(task_id);

        let drain_task_id = Arc::clone(&task_id);
        let handle = tokio::spawn(async move {
            let mut forwarded = 0;
            while let Some(call) = rx.recv().await {
                match orchestrator.rpc_call(&drain_task_id, &call.method, call.args).await {
                    Ok(_) => forwarded += 1,
                    Err(error) => LogForwardFailed {
                        task_id: &drain_task_id,
                        method: &call.method,
                        error: &error,
                    }
                    .log(),
                }
            }
            forwarded
        });

        (Self { task_id, tx }, handle)
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Queue `method(args)` without waiting for delivery.
    pub fn enqueue(&self, method: impl Into<String>, args: Vec<Value>) {
        // A closed queue means the drain task is gone; the call is dropped.
        let _ = self.tx.send(OutboundCall {
            method: method.into(),
            args,
        });
    }

    /// Queue one console line.
    pub fn log_line(&self, line: String) {
        self.enqueue(LOG_OUTPUT_METHOD, vec![Value::String(line)]);
    }
}
