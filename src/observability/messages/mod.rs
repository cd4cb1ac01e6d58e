// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging.
//!
//! * `engine` - task lifecycle and per-unit outcomes
//! * `orchestrator` - broker traffic
//! * `sandbox` - sandbox assembly and host calls

use std::fmt::Display;
use tracing::Span;

pub mod engine;
pub mod orchestrator;
pub mod sandbox;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the message as a `tracing` event at its documented level.
    fn log(&self);

    /// A span carrying the message's fields, for instrumenting the work the
    /// message describes.
    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("event", span_name = name)
    }
}
