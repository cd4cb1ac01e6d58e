// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for sandbox assembly, module resolution and host calls.

use crate::errors::TransportError;
use crate::observability::messages::StructuredLog;
use crate::task::NodeMode;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A fresh sandbox is ready for one execution unit.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use dagwood_task_runner::observability::messages::sandbox::SandboxBuilt;
/// use dagwood_task_runner::task::NodeMode;
///
/// let msg = SandboxBuilt {
///     task_id: "task-1",
///     mode: NodeMode::RunOnceForEachItem,
///     item_index: 4,
///     capability_version: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct SandboxBuilt<'a> {
    pub task_id: &'a str,
    pub mode: NodeMode,
    pub item_index: usize,
    pub capability_version: u32,
}

impl Display for SandboxBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sandbox built for task {} ({}, item {}) with capability table v{}",
            self.task_id, self.mode, self.item_index, self.capability_version
        )
    }
}

impl StructuredLog for SandboxBuilt<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            mode = self.mode.as_str(),
            item_index = self.item_index,
            capability_version = self.capability_version,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "unit",
            span_name = name,
            task_id = self.task_id,
            item_index = self.item_index,
        )
    }
}

/// The event loop is idle until the next timer is due.
///
/// # Log Level
/// `trace!`
pub struct TimerWait {
    pub wait: Duration,
}

impl Display for TimerWait {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Waiting {:?} for next timer", self.wait)
    }
}

impl StructuredLog for TimerWait {
    fn log(&self) {
        tracing::trace!(wait_ms = self.wait.as_millis() as u64, "{}", self);
    }
}

/// `require` of a module outside the allow-lists.
///
/// # Log Level
/// `warn!` - User code asked for a capability it does not have
pub struct ModuleDenied<'a> {
    pub module_id: &'a str,
}

impl Display for ModuleDenied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' is not on the allow-list", self.module_id)
    }
}

impl StructuredLog for ModuleDenied<'_> {
    fn log(&self) {
        tracing::warn!(module_id = self.module_id, "{}", self);
    }
}

/// `require` of a permitted module that has no source in this runner.
///
/// # Log Level
/// `warn!`
pub struct ModuleNotFound<'a> {
    pub module_id: &'a str,
}

impl Display for ModuleNotFound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' is permitted but not available", self.module_id)
    }
}

impl StructuredLog for ModuleNotFound<'_> {
    fn log(&self) {
        tracing::warn!(module_id = self.module_id, "{}", self);
    }
}

/// Awaited helper call failed in transport or was rejected.
///
/// # Log Level
/// `warn!` - The failure is surfaced to user code as a rejection
pub struct RpcCallFailed<'a> {
    pub task_id: &'a str,
    pub method: &'a str,
    pub error: &'a TransportError,
}

impl Display for RpcCallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Helper call {} for task {} failed: {}",
            self.method, self.task_id, self.error
        )
    }
}

impl StructuredLog for RpcCallFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            task_id = self.task_id,
            method = self.method,
            error = %self.error,
            "{}", self
        );
    }
}

/// A fire-and-forget call (console output) could not be delivered.
///
/// # Log Level
/// `debug!` - Delivery is best effort
pub struct LogForwardFailed<'a> {
    pub task_id: &'a str,
    pub method: &'a str,
    pub error: &'a TransportError,
}

impl Display for LogForwardFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped {} for task {}: {}",
            self.method, self.task_id, self.error
        )
    }
}

impl StructuredLog for LogForwardFailed<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            method = self.method,
            error = %self.error,
            "{}", self
        );
    }
}
