// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Orchestrator implementations.
//!
//! * [`LocalOrchestrator`] serves bundles from memory (CLI, tests)
//! * [`ChannelOrchestrator`] talks to a broker through the message protocol in [`messages`]

mod channel;
mod local;
pub mod messages;

pub use channel::ChannelOrchestrator;
pub use local::{LocalOrchestrator, RecordedCall};
