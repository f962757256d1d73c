//! Line records and the sentinel-bounded line list.
//!
//! Every buffer owns one [`LineList`]: a doubly linked chain of byte
//! lines bracketed by a TOP and a BOTTOM sentinel. Links are arena
//! indices ([`LineId`]) rather than pointers, so unlinking a line never
//! leaves a dangling next/prev to chase.
//!
//! Invariants maintained here:
//! - every text line holds at least one byte and ends with `\n`;
//! - sentinels carry fixed placeholder text and are never edited or
//!   removed;
//! - TOP has no predecessor and BOTTOM has no successor.

use bitflags::bitflags;
use thiserror::Error;

mod list;
mod sanitize;

pub use list::{LineId, LineList};
pub use sanitize::sanitize_line;

/// Placeholder text of the TOP sentinel.
pub const TOP_MARK: &[u8] = b"<<top>>\n";
/// Placeholder text of the BOTTOM sentinel.
pub const BOTTOM_MARK: &[u8] = b"<<eof>>\n";

/// Reallocation step for line buffers: round up to the next 32-byte
/// chunk, minimum 32.
pub const fn alloc_size(len: usize) -> usize {
    (len | 0x1f) + 1
}

bitflags! {
    /// Per-line flag word. The layout mirrors the buffer flag word
    /// where the two overlap: the seven hide bits occupy `0x7f00`
    /// on both sides so a single mask test decides visibility.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineFlags: u32 {
        /// Line was truncated while reading.
        const TRUNCATED = 0x0000_0001;
        /// Bytes changed since the last save.
        const CHANGED = 0x0000_0002;
        /// Line was changed at some point since open (sticky).
        const ALTERED = 0x0000_0004;
        /// Colour mark.
        const COLOR_TAG = 0x0000_0008;
        /// Line belongs to the selection.
        const SELECTED = 0x0000_0010;
        /// TOP sentinel.
        const TOP = 0x0000_0020;
        /// BOTTOM sentinel.
        const BOTTOM = 0x0000_0040;
        /// Seven filter hide bits, one per level (level L is `0x80 << L`).
        const HIDE_MASK = 0x0000_7f00;
        /// Bookmark index nibble (0 = no bookmark).
        const BOOKMARK_MASK = 0x000f_0000;
    }
}

/// Shift count converting a bookmark index to/from its flag nibble.
pub const BOOKMARK_SHIFT: u32 = 16;

/// Hide bit of a filter level (valid levels are 1..=7; anything else
/// yields zero).
pub const fn hide_bit(level: u8) -> u32 {
    (0x80u32 << level) & LineFlags::HIDE_MASK.bits()
}

/// Errors raised by line-level primitives.
#[derive(Debug, Error)]
pub enum LineError {
    /// The allocator refused to grow a line or the arena; the target
    /// line is left unchanged.
    #[error("line buffer allocation failed")]
    Capacity,
}

/// One mutable text line: a byte buffer terminated by `\n` plus flags.
#[derive(Debug, Clone)]
pub struct Line {
    text: Vec<u8>,
    pub flags: LineFlags,
}

impl Line {
    /// Build a line from raw bytes, appending the terminating `\n`
    /// when missing.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut text = Vec::with_capacity(alloc_size(bytes.len() + 1));
        text.extend_from_slice(bytes);
        if text.last() != Some(&b'\n') {
            text.push(b'\n');
        }
        Self {
            text,
            flags: LineFlags::empty(),
        }
    }

    /// Full byte content including the trailing `\n`.
    pub fn bytes(&self) -> &[u8] {
        &self.text
    }

    /// Byte content without the trailing `\n`.
    pub fn content(&self) -> &[u8] {
        &self.text[..self.text.len() - 1]
    }

    /// Length in bytes including the trailing `\n`.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// A line is never empty; the shortest line is a lone `\n`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Splice-replace bytes `[from, from+len)` with `repl`.
    ///
    /// This is the single low-level editor for line content. Space is
    /// reserved in [`alloc_size`] chunks up front so a refused
    /// allocation leaves the line untouched, and the trailing `\n` is
    /// re-established if the replacement stripped it.
    pub fn splice(&mut self, from: usize, len: usize, repl: &[u8]) -> Result<(), LineError> {
        let from = from.min(self.text.len());
        let end = from.saturating_add(len).min(self.text.len());
        let new_len = self.text.len() - (end - from) + repl.len();
        let want = alloc_size(new_len + 1);
        if want > self.text.capacity() {
            self.text
                .try_reserve(want - self.text.len())
                .map_err(|_| LineError::Capacity)?;
        }
        self.text.splice(from..end, repl.iter().copied());
        if self.text.last() != Some(&b'\n') {
            self.text.push(b'\n');
        }
        Ok(())
    }

    /// Filter-level hide bits currently set on this line.
    pub fn hide_bits(&self) -> u32 {
        self.flags.bits() & LineFlags::HIDE_MASK.bits()
    }

    /// Set the hide bits given in `mask`.
    pub fn hide(&mut self, mask: u32) {
        let bits = self.flags.bits() | (mask & LineFlags::HIDE_MASK.bits());
        self.flags = LineFlags::from_bits_retain(bits);
    }

    /// Clear the hide bits given in `mask`.
    pub fn unhide(&mut self, mask: u32) {
        let bits = self.flags.bits() & !(mask & LineFlags::HIDE_MASK.bits());
        self.flags = LineFlags::from_bits_retain(bits);
    }

    /// Bookmark index carried in the flag nibble, 0 when none.
    pub fn bookmark(&self) -> u8 {
        ((self.flags.bits() & LineFlags::BOOKMARK_MASK.bits()) >> BOOKMARK_SHIFT) as u8
    }

    /// Store a bookmark index (1..=9) in the flag nibble; 0 clears.
    pub fn set_bookmark(&mut self, index: u8) {
        let bits = (self.flags.bits() & !LineFlags::BOOKMARK_MASK.bits())
            | (u32::from(index & 0x0f) << BOOKMARK_SHIFT);
        self.flags = LineFlags::from_bits_retain(bits);
    }

    fn sentinel(text: &[u8], flag: LineFlags) -> Self {
        let mut line = Self::from_bytes(text);
        line.flags = flag;
        line
    }

    pub fn is_top(&self) -> bool {
        self.flags.contains(LineFlags::TOP)
    }

    pub fn is_bottom(&self) -> bool {
        self.flags.contains(LineFlags::BOTTOM)
    }

    /// A "text" line is any non-sentinel line.
    pub fn is_text(&self) -> bool {
        !self
            .flags
            .intersects(LineFlags::TOP | LineFlags::BOTTOM)
    }
}
