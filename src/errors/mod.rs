// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod normalized;
mod sandbox;
mod shape;
mod transport;

pub use config::ConfigError;
pub use normalized::{
    normalize, ErrorKind, NormalizedError, ThrownValue, CAPABILITY_DENIED_ERROR_NAME,
};
pub use sandbox::SandboxError;
pub use shape::ShapeMismatch;
pub use transport::TransportError;
