// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Canonical error shape for everything that leaves the engine.
//!
//! Whatever goes wrong while a task runs (a disallowed `require`, a rejected
//! return value, a genuine `Error` thrown by user code, a thrown string) ends up
//! as one [`NormalizedError`]. The value is plain serde data so it can cross the
//! process boundary to the orchestrator unchanged.
//!
//! Thrown values are classified exactly once, at the sandbox boundary, into the
//! tagged [`ThrownValue`] variant. [`normalize`] is the only place that turns that
//! classification into an error; the engine never inspects thrown values itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::{SandboxError, TransportError};

/// Name given to the error thrown by the sandbox module loader when a module is
/// not permitted by the allow-lists.
pub const CAPABILITY_DENIED_ERROR_NAME: &str = "CapabilityDeniedError";

/// Failure category carried by every [`NormalizedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Sandboxed code requested a module outside the allow-lists.
    CapabilityDenied,
    /// The value returned by the code does not match the item contract.
    ShapeMismatch,
    /// User code raised a genuine `Error` instance.
    NativeExecutionFailure,
    /// User code threw something that is not an `Error` instance.
    NonErrorThrow,
    /// The data bundle for the task could not be fetched.
    DataUnavailable,
    /// The sandbox could not be constructed or read back.
    SandboxSetup,
}

impl ErrorKind {
    /// Whether `continueOnFail` may turn this failure into an error record.
    ///
    /// Only failures caused by the user's code qualify. Engine-side failures
    /// always fail the task.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::CapabilityDenied
                | ErrorKind::ShapeMismatch
                | ErrorKind::NativeExecutionFailure
                | ErrorKind::NonErrorThrow
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::CapabilityDenied => "capability denied",
            ErrorKind::ShapeMismatch => "shape mismatch",
            ErrorKind::NativeExecutionFailure => "execution failure",
            ErrorKind::NonErrorThrow => "non-error throw",
            ErrorKind::DataUnavailable => "data unavailable",
            ErrorKind::SandboxSetup => "sandbox setup",
        };
        f.write_str(name)
    }
}

/// The one error shape surfaced to the task layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
            description: None,
            cause: None,
            item_index: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the originating item position unless one is already recorded.
    pub fn with_item_index(mut self, index: usize) -> Self {
        self.item_index.get_or_insert(index);
        self
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

/// A value thrown inside the sandbox, classified at the boundary.
///
/// Produced by the harness script as JSON (`kind` tag) or, for failures the
/// script never sees such as syntax errors, by [`ThrownValue::from_engine_error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThrownValue {
    /// An `instanceof Error` value.
    #[serde(rename_all = "camelCase")]
    NativeError {
        name: String,
        message: String,
        #[serde(default)]
        stack: Option<String>,
        #[serde(default)]
        cause: Option<Value>,
        #[serde(default)]
        module_id: Option<String>,
    },
    /// A plain object with a string `message` that is not an `Error` instance.
    ErrorLike {
        message: String,
        #[serde(default)]
        stack: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    /// Anything else; `text` is the value's canonical textual serialization.
    Other { text: String },
}

impl ThrownValue {
    /// Classify an error the engine raised before any script could catch it,
    /// e.g. a syntax error in the wrapped code. The engine renders these as
    /// `Name: message`.
    pub fn from_engine_error(rendered: &str) -> Self {
        let (name, message) = match rendered.split_once(": ") {
            Some((name, message)) if is_error_name(name) => (name, message),
            _ => ("Error", rendered),
        };
        ThrownValue::NativeError {
            name: name.to_string(),
            message: message.to_string(),
            stack: None,
            cause: None,
            module_id: None,
        }
    }
}

fn is_error_name(candidate: &str) -> bool {
    candidate.ends_with("Error") && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Turn a classified thrown value into the canonical error.
pub fn normalize(thrown: ThrownValue) -> NormalizedError {
    match thrown {
        ThrownValue::NativeError {
            name,
            message,
            stack,
            cause,
            module_id,
        } => {
            let kind = if name == CAPABILITY_DENIED_ERROR_NAME {
                ErrorKind::CapabilityDenied
            } else {
                ErrorKind::NativeExecutionFailure
            };
            let message = match (message.is_empty(), &module_id) {
                (true, Some(id)) => format!("Cannot find module '{}'", id),
                (true, None) => name.clone(),
                (false, _) => message,
            };
            let mut error = NormalizedError::new(kind, message);
            error.stack = stack.filter(|s| !s.is_empty());
            error.cause = cause;
            if name != "Error" && kind == ErrorKind::NativeExecutionFailure {
                error.description = Some(name);
            }
            error
        }
        ThrownValue::ErrorLike {
            message,
            stack,
            description,
        } => {
            let mut error = NormalizedError::new(ErrorKind::NonErrorThrow, message);
            error.stack = stack.filter(|s| !s.is_empty());
            error.description = description;
            error
        }
        ThrownValue::Other { text } => NormalizedError::new(ErrorKind::NonErrorThrow, text),
    }
}

impl From<ThrownValue> for NormalizedError {
    fn from(thrown: ThrownValue) -> Self {
        normalize(thrown)
    }
}

impl From<TransportError> for NormalizedError {
    fn from(error: TransportError) -> Self {
        NormalizedError::new(
            ErrorKind::DataUnavailable,
            format!("Failed to fetch task data: {}", error),
        )
    }
}

impl From<SandboxError> for NormalizedError {
    fn from(error: SandboxError) -> Self {
        NormalizedError::new(ErrorKind::SandboxSetup, error.to_string())
    }
}
