// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Side effects leaving the sandbox.
//!
//! Console output goes through the [`SideChannel`], an unordered
//! fire-and-forget queue. `helpers.*` calls go through the [`RpcBridge`] and
//! wait for the orchestrator's answer.

mod rpc_bridge;
mod side_channel;

pub use rpc_bridge::RpcBridge;
pub use side_channel::{OutboundCall, SideChannel};

/// Host services one sandbox is wired to.
#[derive(Debug, Clone)]
pub struct SandboxHost {
    pub side_channel: SideChannel,
    pub rpc: RpcBridge,
}
