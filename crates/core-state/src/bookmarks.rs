//! Bookmarks (slots 1..=9) and the motion history stack.
//!
//! A bookmark pairs a ring index with a sample of the marked line's
//! text; the line itself carries the bookmark index in a nibble of
//! its flag word, so finding the line again is a list walk rather
//! than a stored pointer that edits could invalidate.

use crate::{EditorState, LineId};
use tracing::debug;

/// Number of usable bookmark slots (index 0 means "none").
pub const BOOKMARK_SLOTS: usize = 10;

#[derive(Debug, Clone)]
pub struct Bookmark {
    pub ring: usize,
    /// First bytes of the marked line, for listings.
    pub sample: String,
}

#[derive(Debug, Default)]
pub struct BookmarkTable {
    slots: [Option<Bookmark>; BOOKMARK_SLOTS],
}

impl BookmarkTable {
    pub fn get(&self, index: u8) -> Option<&Bookmark> {
        self.slots.get(index as usize)?.as_ref()
    }

    pub fn set(&mut self, index: u8, bm: Bookmark) {
        if (1..BOOKMARK_SLOTS as u8).contains(&index) {
            self.slots[index as usize] = Some(bm);
        }
    }

    pub fn clear(&mut self, index: u8) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            *slot = None;
        }
    }

    /// Forget every bookmark pointing into the given ring slot.
    pub fn clear_ring(&mut self, ri: usize) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|b| b.ring == ri) {
                *slot = None;
            }
        }
    }
}

/// Stack of (ring index, lineno) pairs recorded before cross-buffer
/// jumps; popped to "jump back".
#[derive(Debug, Default)]
pub struct MotionHistory {
    entries: Vec<(usize, usize)>,
}

impl MotionHistory {
    pub fn push(&mut self, ri: usize, lineno: usize) {
        self.entries.push((ri, lineno));
    }

    pub fn pop(&mut self) -> Option<(usize, usize)> {
        self.entries.pop()
    }

    pub fn clear_ring(&mut self, ri: usize) {
        self.entries.retain(|&(r, _)| r != ri);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EditorState {
    /// Mark the focus line with bookmark `index` (1..=9). An existing
    /// bookmark with the same index moves here; a different bookmark
    /// on this line is replaced.
    pub fn set_bookmark(&mut self, index: u8) -> bool {
        if !(1..BOOKMARK_SLOTS as u8).contains(&index) {
            return false;
        }
        let ri = self.ring.current_index();
        // un-mark the old holder of this index, if it still exists
        if let Some(old) = self.bookmarks.get(index).cloned()
            && let Some(buffer) = self.ring.get_mut(old.ring)
        {
            let ids: Vec<LineId> = buffer.lines.iter_text().collect();
            for id in ids {
                if buffer.lines.line(id).bookmark() == index {
                    buffer.lines.line_mut(id).set_bookmark(0);
                }
            }
        }
        let Some(buffer) = self.ring.get_mut(ri) else {
            return false;
        };
        if !buffer.lines.is_text(buffer.curr) {
            return false;
        }
        let curr = buffer.curr;
        buffer.lines.line_mut(curr).set_bookmark(index);
        let sample: String = String::from_utf8_lossy(buffer.lines.line(curr).content())
            .chars()
            .take(40)
            .collect();
        self.bookmarks.set(index, Bookmark { ring: ri, sample });
        debug!(target: "state", index, ring = ri, "bookmark_set");
        true
    }

    /// Drop a bookmark attached to a line that is about to be
    /// removed. Call before every structural line removal.
    pub fn clear_line_bookmark(&mut self, ri: usize, id: LineId) {
        let Some(buffer) = self.ring.get_mut(ri) else {
            return;
        };
        let index = buffer.lines.line(id).bookmark();
        if index != 0 {
            buffer.lines.line_mut(id).set_bookmark(0);
            self.bookmarks.clear(index);
            debug!(target: "state", index, ring = ri, "bookmark_dropped_with_line");
        }
    }

    /// Jump to bookmark `index`: switch ring slot and walk the list
    /// for the line carrying the index. A stale bookmark (line gone)
    /// is cleared.
    pub fn jump_to_bookmark(&mut self, index: u8) -> bool {
        let Some(bm) = self.bookmarks.get(index).cloned() else {
            return false;
        };
        let Some(buffer) = self.ring.get(bm.ring) else {
            self.bookmarks.clear(index);
            return false;
        };
        let mut lineno = 0;
        let mut found = None;
        for id in buffer.lines.iter_text() {
            lineno += 1;
            if buffer.lines.line(id).bookmark() == index {
                found = Some((id, lineno));
                break;
            }
        }
        let Some((id, lineno)) = found else {
            self.bookmarks.clear(index);
            return false;
        };
        let from = (self.ring.current_index(), self.cur().map(|b| b.lineno));
        if let Ok(no) = from.1 {
            self.mhist.push(from.0, no);
        }
        let tabsize = self.opts.tabsize;
        self.ring.set_current(bm.ring);
        if let Some(buffer) = self.ring.get_mut(bm.ring) {
            buffer.set_position(lineno, id, tabsize);
        }
        true
    }

    /// Pop the motion history and return to the recorded position.
    pub fn jump_back(&mut self) -> bool {
        let tabsize = self.opts.tabsize;
        while let Some((ri, lineno)) = self.mhist.pop() {
            let Some(buffer) = self.ring.get(ri) else {
                continue;
            };
            let lineno = lineno.min(buffer.num_lines);
            if let Some(id) = buffer.goto_lineno(lineno) {
                self.ring.set_current(ri);
                if let Some(buffer) = self.ring.get_mut(ri) {
                    buffer.set_position(lineno, id, tabsize);
                }
                return true;
            }
        }
        false
    }
}
