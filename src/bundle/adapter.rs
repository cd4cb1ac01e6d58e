// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data bundle adapter.
//!
//! Derives the expression-resolution object for one execution unit from the
//! task's data bundle. The result is plain data; the sandbox's expression
//! prelude turns it into the `$`-prefixed globals user code reads
//! (`$json`, `$input`, `$('Node')`, `$env`, ...).

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DataBundle, EnvProviderState, InputItem};
use crate::errors::SandboxError;
use crate::task::NodeMode;

/// Expression-resolution data for one execution unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionContext {
    pub item_index: usize,
    pub run_index: usize,
    pub execution_mode: String,
    pub workflow_mode: String,
    pub active_node_name: String,
    pub context_node_name: String,
    pub node: NodeView,
    pub parameter: Map<String, Value>,
    pub workflow: WorkflowView,
    pub execution: ExecutionView,
    pub env: EnvView,
    pub node_outputs: BTreeMap<String, Vec<Vec<InputItem>>>,
    pub node_parameters: BTreeMap<String, Map<String, Value>>,
    pub default_return_run_index: i64,
    pub prev_node: Option<PrevNodeView>,
    pub self_data: Map<String, Value>,
    pub vars: Map<String, Value>,
    pub urls: UrlView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub type_version: Option<f64>,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowView {
    pub id: Option<String>,
    pub name: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub id: Option<String>,
    /// `test` for manual runs, `production` otherwise.
    pub mode: &'static str,
    pub resume_url: Option<String>,
    pub resume_form_url: Option<String>,
    pub custom_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvView {
    pub vars: Map<String, Value>,
    pub access_blocked: bool,
    pub process_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevNodeView {
    pub name: String,
    pub output_index: usize,
    pub run_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlView {
    pub rest_api_url: Option<String>,
    pub instance_base_url: Option<String>,
    pub webhook_base_url: Option<String>,
    pub webhook_test_base_url: Option<String>,
    pub webhook_waiting_base_url: Option<String>,
    pub form_waiting_base_url: Option<String>,
}

/// Build the expression-resolution object for `item_index`.
pub fn build_proxy(bundle: &DataBundle, item_index: usize, workflow_mode: &str) -> ExpressionContext {
    let env = bundle
        .env_provider_state
        .clone()
        .unwrap_or_else(EnvProviderState::sandboxed);
    let additional = &bundle.additional_data;

    let node_outputs = bundle
        .run_execution_data
        .as_ref()
        .map(|data| {
            data.result_data
                .run_data
                .iter()
                .map(|(name, runs)| (name.clone(), runs.iter().map(|run| run.main_output()).collect()))
                .collect()
        })
        .unwrap_or_default();

    let node_parameters = bundle
        .workflow
        .nodes
        .iter()
        .map(|node| (node.name.clone(), node.parameters.clone()))
        .collect();

    let prev_node = bundle
        .execute_data
        .as_ref()
        .and_then(|data| data.source.as_ref())
        .and_then(|source| source.main.first().cloned().flatten())
        .map(|source| PrevNodeView {
            name: source.previous_node,
            output_index: source.previous_node_output.unwrap_or(0),
            run_index: source.previous_node_run.unwrap_or(0),
        });

    let join_execution = |base: &Option<String>| match (base, &additional.execution_id) {
        (Some(base), Some(id)) => Some(format!("{}/{}", base.trim_end_matches('/'), id)),
        _ => None,
    };

    ExpressionContext {
        item_index,
        run_index: bundle.run_index,
        execution_mode: bundle.mode.clone(),
        workflow_mode: workflow_mode.to_string(),
        active_node_name: bundle.active_node_name.clone(),
        context_node_name: bundle.context_node_name.clone(),
        node: NodeView {
            name: bundle.node.name.clone(),
            node_type: bundle.node.node_type.clone(),
            type_version: bundle.node.type_version,
            parameters: bundle.node.parameters.clone(),
        },
        parameter: bundle.sibling_parameters.clone(),
        workflow: WorkflowView {
            id: bundle.workflow.id.clone(),
            name: bundle.workflow.name.clone(),
            active: bundle.workflow.active,
        },
        execution: ExecutionView {
            id: additional.execution_id.clone(),
            mode: if bundle.mode == "manual" { "test" } else { "production" },
            resume_url: join_execution(&additional.webhook_waiting_base_url),
            resume_form_url: join_execution(&additional.form_waiting_base_url),
            custom_data: bundle.custom_data().unwrap_or_default(),
        },
        env: EnvView {
            vars: if env.is_env_access_blocked { Map::new() } else { env.env },
            access_blocked: env.is_env_access_blocked,
            process_available: env.is_process_available,
        },
        node_outputs,
        node_parameters,
        default_return_run_index: bundle.default_return_run_index,
        prev_node,
        self_data: bundle.self_data.clone(),
        vars: additional.variables.clone(),
        urls: UrlView {
            rest_api_url: additional.rest_api_url.clone(),
            instance_base_url: additional.instance_base_url.clone(),
            webhook_base_url: additional.webhook_base_url.clone(),
            webhook_test_base_url: additional.webhook_test_base_url.clone(),
            webhook_waiting_base_url: additional.webhook_waiting_base_url.clone(),
            form_waiting_base_url: additional.form_waiting_base_url.clone(),
        },
    }
}

/// Serialized inputs shared by every execution unit of one task.
///
/// Built once per task. Items and node outputs are handed to a sandbox only
/// when its code reads them, so the cost of a unit does not grow with the
/// size of the task.
#[derive(Debug)]
pub struct TaskBindings {
    pub mode: NodeMode,
    pub items_json: String,
    /// The expression context without node outputs.
    pub context_json: String,
    pub node_outputs_json: String,
}

impl TaskBindings {
    pub fn new(bundle: &DataBundle, mode: NodeMode, workflow_mode: &str) -> Result<Self, SandboxError> {
        let mut context = build_proxy(bundle, bundle.item_index, workflow_mode);
        let node_outputs = std::mem::take(&mut context.node_outputs);
        Ok(Self {
            mode,
            items_json: serde_json::to_string(&bundle.items)?,
            context_json: serde_json::to_string(&context)?,
            node_outputs_json: serde_json::to_string(&node_outputs)?,
        })
    }
}

/// Inputs for one execution unit.
#[derive(Debug, Clone)]
pub struct UnitBindings {
    pub task: Arc<TaskBindings>,
    pub item_index: usize,
    /// The current item, or `null` when the index is past the input.
    pub item_json: String,
}

impl UnitBindings {
    /// Bindings for the single AllItems unit.
    pub fn all_items(task: &Arc<TaskBindings>, bundle: &DataBundle) -> Result<Self, SandboxError> {
        Self::for_unit(task, bundle, bundle.item_index)
    }

    /// Bindings for the EachItem unit at `index`.
    pub fn item(task: &Arc<TaskBindings>, bundle: &DataBundle, index: usize) -> Result<Self, SandboxError> {
        Self::for_unit(task, bundle, index)
    }

    fn for_unit(task: &Arc<TaskBindings>, bundle: &DataBundle, item_index: usize) -> Result<Self, SandboxError> {
        Ok(Self {
            task: Arc::clone(task),
            item_index,
            item_json: serde_json::to_string(&bundle.items.get(item_index))?,
        })
    }

    pub fn mode(&self) -> NodeMode {
        self.task.mode
    }
}
