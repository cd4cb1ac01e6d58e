// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The capability table: host primitives installed into every sandbox.
//!
//! The script engine only provides ECMAScript built-ins. Everything else a
//! code node may use without `require` is listed here, with the prelude script
//! that installs it. The table is static; changing what sandboxes can see means
//! changing this file and bumping [`CAPABILITY_TABLE_VERSION`].

use std::fmt;

/// Version of the capability surface exposed to sandboxed code.
pub const CAPABILITY_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `TextEncoder`, `TextDecoder`
    TextCodec,
    /// `TextEncoderStream`, `TextDecoderStream`
    TextStreams,
    /// `Buffer`
    ByteBuffer,
    /// `setTimeout`, `setInterval`, `setImmediate` and their `clear*` counterparts
    Timers,
    /// `FormData`
    FormData,
}

impl Capability {
    /// Globals the capability defines.
    pub fn globals(self) -> &'static [&'static str] {
        match self {
            Capability::TextCodec => &["TextEncoder", "TextDecoder"],
            Capability::TextStreams => &["TextEncoderStream", "TextDecoderStream"],
            Capability::ByteBuffer => &["Buffer"],
            Capability::Timers => &[
                "setTimeout",
                "setInterval",
                "setImmediate",
                "clearTimeout",
                "clearInterval",
                "clearImmediate",
            ],
            Capability::FormData => &["FormData"],
        }
    }

    pub(crate) fn prelude(self) -> &'static str {
        match self {
            Capability::TextCodec => include_str!("js/text_codec.js"),
            Capability::TextStreams => include_str!("js/text_streams.js"),
            Capability::ByteBuffer => include_str!("js/buffer.js"),
            Capability::Timers => include_str!("js/timers.js"),
            Capability::FormData => include_str!("js/form_data.js"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::TextCodec => "text-codec",
            Capability::TextStreams => "text-streams",
            Capability::ByteBuffer => "byte-buffer",
            Capability::Timers => "timers",
            Capability::FormData => "form-data",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of capabilities installed into each sandbox.
///
/// Order matters: the byte buffer and the text streams reuse the UTF-8 codec
/// installed by [`Capability::TextCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    version: u32,
    entries: Vec<Capability>,
}

impl CapabilityTable {
    pub fn standard() -> Self {
        Self {
            version: CAPABILITY_TABLE_VERSION,
            entries: vec![
                Capability::TextCodec,
                Capability::TextStreams,
                Capability::ByteBuffer,
                Capability::Timers,
                Capability::FormData,
            ],
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.entries
    }

    /// Every global the table defines, in installation order.
    pub fn globals(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().flat_map(|c| c.globals().iter().copied())
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::standard()
    }
}
