// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod state;
pub mod validation;

pub use executor::TaskExecutor;
pub use state::{EngineState, TaskRun};
pub use validation::{validate_all_items, validate_each_item, ITEM_KEYS};
