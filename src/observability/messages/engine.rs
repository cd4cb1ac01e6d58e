// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the task lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Task intake and bundle fetch
//! * Engine state transitions
//! * Per-unit outcomes (skipped, recovered)
//! * Task completion and failure

use crate::engine::EngineState;
use crate::errors::NormalizedError;
use crate::observability::messages::StructuredLog;
use crate::task::NodeMode;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Task accepted by the executor.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagwood_task_runner::observability::messages::engine::TaskReceived;
/// use dagwood_task_runner::task::NodeMode;
///
/// let msg = TaskReceived {
///     task_id: "task-1",
///     mode: NodeMode::RunOnceForEachItem,
///     continue_on_fail: false,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TaskReceived<'a> {
    pub task_id: &'a str,
    pub mode: NodeMode,
    pub continue_on_fail: bool,
}

impl Display for TaskReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} received: mode={}, continue_on_fail={}",
            self.task_id, self.mode, self.continue_on_fail
        )
    }
}

impl StructuredLog for TaskReceived<'_> {
    fn log(&self) {
        tracing::info!(
            task_id = self.task_id,
            mode = self.mode.as_str(),
            continue_on_fail = self.continue_on_fail,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task",
            span_name = name,
            task_id = self.task_id,
            mode = self.mode.as_str(),
        )
    }
}

/// Data bundle fetched for a task.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct BundleReceived<'a> {
    pub task_id: &'a str,
    pub item_count: usize,
}

impl Display for BundleReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Bundle for task {} received with {} input items",
            self.task_id, self.item_count
        )
    }
}

impl StructuredLog for BundleReceived<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            item_count = self.item_count,
            "{}", self
        );
    }
}

/// Engine moved between lifecycle states.
///
/// # Log Level
/// `trace!` - Emitted several times per item
pub struct StateTransition<'a> {
    pub task_id: &'a str,
    pub from: EngineState,
    pub to: EngineState,
}

impl Display for StateTransition<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task {}: {} -> {}", self.task_id, self.from, self.to)
    }
}

impl StructuredLog for StateTransition<'_> {
    fn log(&self) {
        tracing::trace!(
            task_id = self.task_id,
            from = %self.from,
            to = %self.to,
            "{}", self
        );
    }
}

/// An each-item unit returned `null` or `undefined`; no record is emitted.
///
/// # Log Level
/// `debug!`
pub struct UnitSkipped<'a> {
    pub task_id: &'a str,
    pub item_index: usize,
}

impl Display for UnitSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {}: item {} returned nothing, skipping",
            self.task_id, self.item_index
        )
    }
}

impl StructuredLog for UnitSkipped<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            item_index = self.item_index,
            "{}", self
        );
    }
}

/// A unit failed and `continueOnFail` turned the failure into an error record.
///
/// # Log Level
/// `warn!` - User code failed but the task continues
pub struct UnitFailureRecovered<'a> {
    pub task_id: &'a str,
    pub item_index: Option<usize>,
    pub error: &'a NormalizedError,
}

impl Display for UnitFailureRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.item_index {
            Some(index) => write!(
                f,
                "Task {}: item {} failed ({}), continuing: {}",
                self.task_id, index, self.error.kind, self.error.message
            ),
            None => write!(
                f,
                "Task {}: code failed ({}), continuing: {}",
                self.task_id, self.error.kind, self.error.message
            ),
        }
    }
}

impl StructuredLog for UnitFailureRecovered<'_> {
    fn log(&self) {
        tracing::warn!(
            task_id = self.task_id,
            item_index = ?self.item_index,
            kind = %self.error.kind,
            "{}", self
        );
    }
}

/// Task finished with a result.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagwood_task_runner::observability::messages::engine::TaskCompleted;
/// use std::time::Duration;
///
/// let msg = TaskCompleted {
///     task_id: "task-1",
///     record_count: 3,
///     duration: Duration::from_millis(12),
/// };
///
/// assert_eq!(msg.to_string(), "Task task-1 completed: 3 records in 12ms");
/// ```
pub struct TaskCompleted<'a> {
    pub task_id: &'a str,
    pub record_count: usize,
    pub duration: Duration,
}

impl Display for TaskCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} completed: {} records in {:?}",
            self.task_id, self.record_count, self.duration
        )
    }
}

impl StructuredLog for TaskCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            task_id = self.task_id,
            record_count = self.record_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// Task failed; the error is what the task layer receives.
///
/// # Log Level
/// `error!` - Task produced no result
pub struct TaskFailed<'a> {
    pub task_id: &'a str,
    pub error: &'a NormalizedError,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} failed ({}): {}",
            self.task_id, self.error.kind, self.error.message
        )
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::error!(
            task_id = self.task_id,
            kind = %self.error.kind,
            item_index = ?self.error.item_index,
            "{}", self
        );
    }
}
