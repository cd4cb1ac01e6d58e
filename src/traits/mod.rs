// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod orchestrator;

pub use orchestrator::{DataRequestScope, Orchestrator};
