// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors from building or reading back a sandbox context.
//!
//! These are engine failures, not failures of the user's code: a sandbox that
//! cannot be assembled fails the task regardless of `continueOnFail`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    /// A host binding or prelude script could not be installed.
    #[error("failed to install sandbox binding '{binding}': {reason}")]
    Binding { binding: String, reason: String },

    /// Unit inputs could not be serialized into the sandbox.
    #[error("failed to serialize sandbox inputs: {0}")]
    Inputs(#[from] serde_json::Error),

    /// The harness produced a report the engine cannot read. Only used to
    /// word the failure of the unit, since user code ran before it.
    #[error("unreadable execution report: {0}")]
    Report(String),

    /// Driving the event loop of the sandbox failed.
    #[error("sandbox event loop failed: {0}")]
    EventLoop(String),
}
