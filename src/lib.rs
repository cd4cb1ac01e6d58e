// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod bundle;       // data bundle + expression context
pub mod config;       // runner config + allow-lists
pub mod dispatch;     // side channel + awaited helper calls
pub mod engine;       // task executor
pub mod errors;       // error handling
pub mod observability;
pub mod orchestrator; // orchestrator clients
pub mod sandbox;      // script sandbox
pub mod task;         // task contract
pub mod traits;       // orchestrator seam
