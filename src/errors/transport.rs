// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while talking to the orchestrator.

use thiserror::Error;

/// Failure of a request/response exchange with the orchestrator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The orchestrator has no data bundle for the task.
    #[error("no data available for task '{0}'")]
    UnknownTask(String),

    /// The connection to the broker is gone; no response will arrive.
    #[error("broker connection closed")]
    Closed,

    /// The orchestrator answered the RPC call with an error.
    #[error("rpc call '{method}' failed: {message}")]
    RpcFailed { method: String, message: String },

    /// The requested RPC method is not exposed to sandboxed code.
    #[error("rpc method '{0}' is not available")]
    MethodNotAllowed(String),

    /// A message could not be encoded or decoded.
    #[error("malformed broker message: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        TransportError::Malformed(error.to_string())
    }
}
