// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Script sandbox.
//!
//! Each execution unit runs in a fresh script engine context that exposes the
//! ECMAScript built-ins plus exactly the host primitives of the
//! [`CapabilityTable`]. Modules are reachable only through `require`, gated by
//! the [`ModuleResolver`]. The engine reads the outcome back as a
//! [`UnitReport`].
//!
//! # Architecture
//!
//! * `capabilities` - versioned table of injected globals
//! * `resolver` - allow-list checks and module sources
//! * `context` - sandbox assembly and the event loop
//! * `report` - the outcome of one unit as plain data

pub mod capabilities;
mod context;
mod report;
pub mod resolver;

pub use capabilities::{Capability, CapabilityTable, CAPABILITY_TABLE_VERSION};
pub use context::{SandboxContext, SandboxFactory};
pub use report::{ReturnedValue, UnitReport};
pub use resolver::{ModuleResolver, ResolveError, ResolvedModule};
