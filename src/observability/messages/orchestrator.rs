// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for orchestrator traffic.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A broker response arrived for a request nobody is waiting on.
///
/// # Log Level
/// `warn!` - Usually a late reply after the waiter gave up
pub struct BrokerMessageDropped<'a> {
    pub id: &'a str,
}

impl Display for BrokerMessageDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dropping broker response for unknown request {}", self.id)
    }
}

impl StructuredLog for BrokerMessageDropped<'_> {
    fn log(&self) {
        tracing::warn!(request_id = self.id, "{}", self);
    }
}

/// Outstanding requests were failed because the connection went away.
///
/// # Log Level
/// `warn!`
pub struct PendingRequestsFailed {
    pub count: usize,
}

impl Display for PendingRequestsFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failing {} pending orchestrator requests", self.count)
    }
}

impl StructuredLog for PendingRequestsFailed {
    fn log(&self) {
        tracing::warn!(count = self.count, "{}", self);
    }
}

/// A console line forwarded by user code, as seen by the in-process
/// orchestrator.
///
/// # Log Level
/// `info!` - This is the node's output, not a runner diagnostic
pub struct NodeOutputLogged<'a> {
    pub task_id: &'a str,
    pub line: &'a str,
}

impl Display for NodeOutputLogged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.task_id, self.line)
    }
}

impl StructuredLog for NodeOutputLogged<'_> {
    fn log(&self) {
        tracing::info!(target: "node_output", task_id = self.task_id, "{}", self.line);
    }
}
