// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output shape rejections raised by the output validator.

use thiserror::Error;

use crate::errors::{ErrorKind, NormalizedError};

/// The code returned something that does not match the item contract.
///
/// `description` tells the user which shape was expected; `item_index` is set
/// when the offending value can be tied to one input item.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ShapeMismatch {
    pub message: String,
    pub description: String,
    pub item_index: Option<usize>,
}

impl ShapeMismatch {
    pub fn new(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: description.into(),
            item_index: None,
        }
    }

    pub fn at_item(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }
}

impl From<ShapeMismatch> for NormalizedError {
    fn from(mismatch: ShapeMismatch) -> Self {
        let mut error = NormalizedError::new(ErrorKind::ShapeMismatch, mismatch.message)
            .with_description(mismatch.description);
        error.item_index = mismatch.item_index;
        error
    }
}
