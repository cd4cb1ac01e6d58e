// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod allow_list;
mod loader;
pub mod consts;

pub use allow_list::AllowList;
pub use loader::{load_config, RunnerConfig, SandboxConfig};
