// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The data bundle fetched from the orchestrator once per task.
//!
//! The bundle is an immutable snapshot of everything an execution unit can see:
//! the input items, the workflow and node being executed, earlier node outputs
//! and addressing information for the orchestrator. It lives for the duration
//! of one task and is dropped afterwards.

mod adapter;

pub use adapter::{build_proxy, ExpressionContext, TaskBindings, UnitBindings};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One input item of the code node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputItem {
    #[serde(default)]
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<Value>,
}

impl InputItem {
    pub fn from_json(json: Map<String, Value>) -> Self {
        Self {
            json,
            binary: None,
            paired_item: None,
        }
    }
}

/// Full contextual data for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBundle {
    pub workflow: WorkflowInfo,
    #[serde(default, alias = "connectionInputData")]
    pub items: Vec<InputItem>,
    pub node: NodeInfo,
    #[serde(default)]
    pub run_execution_data: Option<RunExecutionData>,
    #[serde(default)]
    pub run_index: usize,
    #[serde(default)]
    pub item_index: usize,
    pub active_node_name: String,
    #[serde(default)]
    pub sibling_parameters: Map<String, Value>,
    pub mode: String,
    #[serde(default)]
    pub env_provider_state: Option<EnvProviderState>,
    #[serde(default)]
    pub execute_data: Option<ExecuteData>,
    #[serde(default = "latest_run")]
    pub default_return_run_index: i64,
    #[serde(default)]
    pub self_data: Map<String, Value>,
    pub context_node_name: String,
    #[serde(default)]
    pub additional_data: AdditionalData,
}

fn latest_run() -> i64 {
    -1
}

impl DataBundle {
    /// Result metadata passed through unchanged as the task's custom data.
    pub fn custom_data(&self) -> Option<Map<String, Value>> {
        self.run_execution_data
            .as_ref()
            .and_then(|data| data.result_data.metadata.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub type_version: Option<f64>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Environment visibility granted to sandboxed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvProviderState {
    #[serde(default)]
    pub env: Map<String, Value>,
    pub is_env_access_blocked: bool,
    pub is_process_available: bool,
}

impl EnvProviderState {
    /// State substituted when the bundle carries none: no variables, access
    /// blocked. Sandboxed code never inherits the orchestrator's environment
    /// through a missing field.
    pub fn sandboxed() -> Self {
        Self {
            env: Map::new(),
            is_env_access_blocked: true,
            is_process_available: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunExecutionData {
    #[serde(default)]
    pub result_data: ResultData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    /// Runs per node name, oldest first.
    #[serde(default)]
    pub run_data: BTreeMap<String, Vec<NodeRun>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRun {
    #[serde(default)]
    pub data: Option<NodeRunData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRunData {
    /// Items per output; an output that produced nothing is `null`.
    #[serde(default)]
    pub main: Vec<Option<Vec<InputItem>>>,
}

impl NodeRun {
    /// Items of the first output of this run.
    pub fn main_output(&self) -> Vec<InputItem> {
        self.data
            .as_ref()
            .and_then(|data| data.main.first().cloned().flatten())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteData {
    #[serde(default)]
    pub source: Option<ExecuteSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSource {
    #[serde(default)]
    pub main: Vec<Option<SourceData>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    pub previous_node: String,
    #[serde(default)]
    pub previous_node_output: Option<usize>,
    #[serde(default)]
    pub previous_node_run: Option<usize>,
}

/// Orchestrator addressing information carried by the bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalData {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub rest_api_url: Option<String>,
    #[serde(default)]
    pub instance_base_url: Option<String>,
    #[serde(default)]
    pub webhook_base_url: Option<String>,
    #[serde(default)]
    pub webhook_test_base_url: Option<String>,
    #[serde(default)]
    pub webhook_waiting_base_url: Option<String>,
    #[serde(default)]
    pub form_waiting_base_url: Option<String>,
    #[serde(default)]
    pub variables: Map<String, Value>,
}
