// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the task runner.
//!
//! Every diagnostic the runner emits is a message struct that implements
//! `Display` for the human-readable line and [`messages::StructuredLog`] for
//! the structured `tracing` event with its fields. Call sites never format log
//! strings themselves.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - task lifecycle and per-unit outcomes
//! * `messages::orchestrator` - broker traffic and pending requests
//! * `messages::sandbox` - sandbox assembly, module resolution, host calls
//!
//! # Usage
//!
//! ```rust
//! use dagwood_task_runner::observability::messages::engine::UnitSkipped;
//! use dagwood_task_runner::observability::messages::StructuredLog;
//!
//! UnitSkipped {
//!     task_id: "task-1",
//!     item_index: 3,
//! }
//! .log();
//! ```
//!
//! Output is routed by whatever `tracing` subscriber the binary installs; the
//! CLI uses `tracing-subscriber` with an `EnvFilter` read from `RUST_LOG`.

pub mod messages;
