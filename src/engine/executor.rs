// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task executor: runs a code node's task from bundle fetch to result.
//!
//! # Execution Flow
//!
//! 1. **Fetch**: one `request_data(task_id, all)` round trip. This is the only
//!    suspension point before user code runs; a failed fetch fails the task.
//! 2. **Execute**: every execution unit of the task runs on one blocking worker,
//!    because the script engine context cannot leave its thread. Each unit gets
//!    a fresh sandbox.
//!    * RunOnceForAllItems: one unit, all items bound as `items`.
//!    * RunOnceForEachItem: one unit per item, strictly in input order, the
//!      item bound as `item`.
//! 3. **Reconcile**: the returned value is validated against the item contract.
//!    With `continueOnFail`, failures caused by user code become error records;
//!    engine failures never do.
//!
//! Console output leaves through the task's side channel while units run and
//! may still be in flight when the result is returned.

use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{Instrument, Span};

use crate::bundle::{DataBundle, TaskBindings, UnitBindings};
use crate::config::RunnerConfig;
use crate::dispatch::{RpcBridge, SandboxHost, SideChannel};
use crate::engine::state::{EngineState, TaskRun};
use crate::engine::validation::{validate_all_items, validate_each_item};
use crate::errors::{ConfigError, ErrorKind, NormalizedError};
use crate::observability::messages::engine::{
    BundleReceived, TaskCompleted, TaskFailed, TaskReceived, UnitFailureRecovered, UnitSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::sandbox::{CapabilityTable, ModuleResolver, ReturnedValue, SandboxFactory};
use crate::task::{ExecutionRecord, NodeMode, Task, TaskResult, TaskSettings};
use crate::traits::{DataRequestScope, Orchestrator};

/// Executes tasks against one orchestrator.
///
/// Cheap to share: tasks may run concurrently on the same executor, each on
/// its own worker with its own sandboxes.
#[derive(Clone)]
pub struct TaskExecutor {
    orchestrator: Arc<dyn Orchestrator>,
    factory: SandboxFactory,
    rpc_methods: Arc<Vec<String>>,
}

impl TaskExecutor {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, factory: SandboxFactory, rpc_methods: Vec<String>) -> Self {
        Self {
            orchestrator,
            factory,
            rpc_methods: Arc::new(rpc_methods),
        }
    }

    /// Build an executor with the standard capability table and the module
    /// resolver described by `config`.
    pub fn from_config(orchestrator: Arc<dyn Orchestrator>, config: &RunnerConfig) -> Result<Self, ConfigError> {
        let resolver = ModuleResolver::from_config(&config.sandbox)?;
        let factory = SandboxFactory::new(Arc::new(CapabilityTable::standard()), Arc::new(resolver));
        Ok(Self::new(orchestrator, factory, config.sandbox.rpc_methods()))
    }

    pub async fn execute(&self, task: &Task) -> Result<TaskResult, NormalizedError> {
        let received = TaskReceived {
            task_id: &task.task_id,
            mode: task.settings.node_mode,
            continue_on_fail: task.settings.continue_on_fail,
        };
        received.log();
        let span = received.span("execute");
        self.run_task(task).instrument(span).await
    }

    async fn run_task(&self, task: &Task) -> Result<TaskResult, NormalizedError> {
        let started = Instant::now();
        let mut run = TaskRun::new(task.task_id.as_str());
        run.transition(EngineState::BundleFetchPending);

        let bundle = match self
            .orchestrator
            .request_data(&task.task_id, DataRequestScope::All)
            .await
        {
            Ok(bundle) => bundle,
            Err(error) => {
                run.transition(EngineState::Failed);
                return Err(self.fail(&task.task_id, error.into()));
            }
        };
        BundleReceived {
            task_id: &task.task_id,
            item_count: bundle.items.len(),
        }
        .log();

        let custom_data = bundle.custom_data();
        let (side_channel, _drain) = SideChannel::spawn(Arc::clone(&self.orchestrator), &task.task_id);
        let rpc = RpcBridge::new(
            Arc::clone(&self.orchestrator),
            Handle::current(),
            &task.task_id,
            self.rpc_methods.iter().cloned(),
        );
        let host = SandboxHost { side_channel, rpc };
        let factory = self.factory.clone();
        let settings = task.settings.clone();

        let span = Span::current();
        let worker = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let outcome = run_units(&mut run, &settings, &bundle, &factory, &host);
            (run, outcome)
        })
        .await;

        let (mut run, outcome) = match worker {
            Ok(finished) => finished,
            Err(join_error) => {
                let error = NormalizedError::new(
                    ErrorKind::SandboxSetup,
                    format!("sandbox worker did not finish: {}", join_error),
                );
                return Err(self.fail(&task.task_id, error));
            }
        };

        match outcome {
            Ok(records) => {
                run.transition(EngineState::Completed);
                TaskCompleted {
                    task_id: &task.task_id,
                    record_count: records.len(),
                    duration: started.elapsed(),
                }
                .log();
                Ok(TaskResult {
                    result: records,
                    custom_data,
                })
            }
            Err(error) => {
                run.transition(EngineState::Failed);
                Err(self.fail(&task.task_id, error))
            }
        }
    }

    fn fail(&self, task_id: &str, error: NormalizedError) -> NormalizedError {
        TaskFailed {
            task_id,
            error: &error,
        }
        .log();
        error
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("factory", &self.factory)
            .field("rpc_methods", &self.rpc_methods)
            .finish()
    }
}

/// Everything one unit needs besides its bindings.
struct UnitScope<'a> {
    settings: &'a TaskSettings,
    bundle: &'a DataBundle,
    task: Arc<TaskBindings>,
    factory: &'a SandboxFactory,
    host: &'a SandboxHost,
}

impl UnitScope<'_> {
    fn run(&self, bindings: &UnitBindings) -> Result<ReturnedValue, NormalizedError> {
        let sandbox = self.factory.build(bindings, self.host)?;
        sandbox.evaluate(&self.settings.code)?.into_result()
    }
}

fn run_units(
    run: &mut TaskRun,
    settings: &TaskSettings,
    bundle: &DataBundle,
    factory: &SandboxFactory,
    host: &SandboxHost,
) -> Result<Vec<ExecutionRecord>, NormalizedError> {
    run.transition(EngineState::Executing);
    // Serialized once; every unit of the task shares it.
    let task = Arc::new(TaskBindings::new(bundle, settings.node_mode, &settings.workflow_mode)?);
    let scope = UnitScope {
        settings,
        bundle,
        task,
        factory,
        host,
    };

    match settings.node_mode {
        NodeMode::RunOnceForAllItems => run_all_items(run, &scope),
        NodeMode::RunOnceForEachItem => run_each_item(run, &scope),
    }
}

fn run_all_items(run: &mut TaskRun, scope: &UnitScope<'_>) -> Result<Vec<ExecutionRecord>, NormalizedError> {
    let bindings = UnitBindings::all_items(&scope.task, scope.bundle)?;
    let outcome = scope.run(&bindings);
    run.transition(EngineState::ResultPending);

    let records = outcome.and_then(|value| match value {
        ReturnedValue::Null => Ok(Vec::new()),
        value => validate_all_items(value).map_err(NormalizedError::from),
    });

    match records {
        Err(error) if scope.settings.continue_on_fail && error.is_recoverable() => {
            UnitFailureRecovered {
                task_id: run.task_id(),
                item_index: None,
                error: &error,
            }
            .log();
            Ok(vec![ExecutionRecord::error(&error.message, None)])
        }
        other => other,
    }
}

fn run_each_item(run: &mut TaskRun, scope: &UnitScope<'_>) -> Result<Vec<ExecutionRecord>, NormalizedError> {
    let mut records = Vec::with_capacity(scope.bundle.items.len());

    for index in 0..scope.bundle.items.len() {
        if index > 0 {
            run.transition(EngineState::Executing);
        }
        let bindings = UnitBindings::item(&scope.task, scope.bundle, index)?;
        let outcome = scope.run(&bindings);
        run.transition(EngineState::ResultPending);

        let record = outcome.and_then(|value| {
            if value.is_nullish() {
                UnitSkipped {
                    task_id: run.task_id(),
                    item_index: index,
                }
                .log();
                return Ok(None);
            }
            validate_each_item(value, index)
                .map(Some)
                .map_err(NormalizedError::from)
        });

        match record {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(error) if scope.settings.continue_on_fail && error.is_recoverable() => {
                UnitFailureRecovered {
                    task_id: run.task_id(),
                    item_index: Some(index),
                    error: &error,
                }
                .log();
                records.push(ExecutionRecord::error(&error.message, Some(index)));
            }
            // Records produced for earlier items are discarded with the task.
            Err(error) => return Err(error.with_item_index(index)),
        }
    }

    Ok(records)
}
