// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Inbound task contract and outbound task result.
//!
//! A [`Task`] is owned by the task-acquisition layer and handed to the engine
//! read-only. The engine answers with a [`TaskResult`] or a
//! [`NormalizedError`](crate::errors::NormalizedError).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// A unit of work accepted by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub settings: TaskSettings,
}

/// Execution settings of a code node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSettings {
    pub code: String,
    #[serde(alias = "mode")]
    pub node_mode: NodeMode,
    #[serde(default)]
    pub continue_on_fail: bool,
    #[serde(default = "default_workflow_mode", alias = "workflowExecutionMode")]
    pub workflow_mode: String,
}

fn default_workflow_mode() -> String {
    "manual".to_string()
}

/// How often the code runs for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeMode {
    /// Once, with every input item bound as `items`.
    #[serde(alias = "run-once-for-all-items")]
    RunOnceForAllItems,
    /// Once per input item, with that item bound as `item`.
    #[serde(alias = "run-once-for-each-item")]
    RunOnceForEachItem,
}

impl NodeMode {
    /// Short name used inside the sandbox and in log messages.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeMode::RunOnceForAllItems => "allItems",
            NodeMode::RunOnceForEachItem => "eachItem",
        }
    }
}

impl fmt::Display for NodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-reference from an output record to the input item it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One unit of task output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<PairedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ExecutionRecord {
    pub fn new(json: Map<String, Value>) -> Self {
        Self {
            json,
            binary: None,
            paired_item: None,
            error: None,
        }
    }

    /// Error-shaped record emitted when `continueOnFail` absorbs a failure.
    pub fn error(message: &str, item_index: Option<usize>) -> Self {
        let mut json = Map::new();
        json.insert("error".to_string(), json!(message));
        Self {
            json,
            binary: None,
            paired_item: item_index.map(|item| PairedItem { item }),
            error: None,
        }
    }

    pub fn paired_with(mut self, item: usize) -> Self {
        self.paired_item = Some(PairedItem { item });
        self
    }
}

/// Task output handed back to the task layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub result: Vec<ExecutionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Map<String, Value>>,
}
