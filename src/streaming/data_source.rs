//! Locators of bulk payloads stored outside the typed graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bits of the locator holding the logical offset; the rest is the file index.
pub const LOCATOR_OFFSET_BITS: u32 = 40;
const LOCATOR_OFFSET_MASK: u64 = (1 << LOCATOR_OFFSET_BITS) - 1;

/// Reference to opaque payload bytes (texture mips, audio, vertex streams).
///
/// Wire form is `[channel:i32][locator:u64][length:u32]`. The locator packs
/// the archive file index (high 24 bits) and the logical offset inside that
/// archive (low 40 bits). Resolving yields raw bytes for an external codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamingDataSource {
    /// Payload channel; negative means none was assigned.
    pub channel: i32,
    pub locator: u64,
    pub length: u32,
}

impl StreamingDataSource {
    /// Wire size in bytes.
    pub const SIZE: usize = 16;

    pub fn new(channel: i32, locator: u64, length: u32) -> Self {
        Self { channel, locator, length }
    }

    /// Pack a file index and logical offset into a locator.
    pub fn locator_for(file_index: u32, offset: u64) -> u64 {
        ((file_index as u64) << LOCATOR_OFFSET_BITS) | (offset & LOCATOR_OFFSET_MASK)
    }

    /// Points at some bytes.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.locator != 0 && self.length > 0
    }

    /// Present and bound to a real channel.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_present() && self.channel >= 0
    }

    #[inline]
    pub fn file_index(&self) -> usize {
        (self.locator >> LOCATOR_OFFSET_BITS) as usize
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.locator & LOCATOR_OFFSET_MASK
    }
}

impl fmt::Display for StreamingDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_present() {
            return write!(f, "<absent>");
        }
        write!(
            f,
            "file {} @ {:#x} +{} (channel {})",
            self.file_index(),
            self.offset(),
            self.length,
            self.channel
        )
    }
}
