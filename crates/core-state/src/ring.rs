//! The fixed-capacity ring of buffer slots.

use crate::buffer::{Buffer, BufferFlags};
use crate::{CoreError, CoreResult};

/// Number of slots; buffers beyond this are refused.
pub const RING_SIZE: usize = 37;

/// Fixed array of file slots with a current index. Traversal wraps
/// and skips HIDDEN buffers unless nothing else is left, in which
/// case the landing buffer is force-unhidden.
pub struct Ring {
    slots: Vec<Option<Buffer>>,
    current: usize,
    open: usize,
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

impl Ring {
    pub fn new() -> Self {
        Self {
            slots: (0..RING_SIZE).map(|_| None).collect(),
            current: 0,
            open: 0,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, ri: usize) {
        if ri < RING_SIZE && self.slots[ri].is_some() {
            self.current = ri;
        }
    }

    pub fn get(&self, ri: usize) -> Option<&Buffer> {
        self.slots.get(ri)?.as_ref()
    }

    pub fn get_mut(&mut self, ri: usize) -> Option<&mut Buffer> {
        self.slots.get_mut(ri)?.as_mut()
    }

    pub fn current(&self) -> Option<&Buffer> {
        self.get(self.current)
    }

    pub fn current_mut(&mut self) -> Option<&mut Buffer> {
        let ri = self.current;
        self.get_mut(ri)
    }

    /// Indices of all open slots.
    pub fn open_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..RING_SIZE).filter(|&ri| self.slots[ri].is_some())
    }

    /// Place a buffer in the first free slot.
    pub fn insert(&mut self, buffer: Buffer) -> CoreResult<usize> {
        let Some(ri) = (0..RING_SIZE).find(|&ri| self.slots[ri].is_none()) else {
            return Err(CoreError::RingFull);
        };
        self.slots[ri] = Some(buffer);
        self.open += 1;
        Ok(ri)
    }

    /// Remove the slot and hand the buffer back for teardown. The
    /// caller is responsible for repositioning `current` afterwards
    /// (origin jump or `next_file`).
    pub fn take(&mut self, ri: usize) -> Option<Buffer> {
        let buffer = self.slots.get_mut(ri)?.take()?;
        self.open -= 1;
        Some(buffer)
    }

    /// Slot holding the given inode, ignoring scratch buffers.
    pub fn find_inode(&self, dev: u64, ino: u64) -> Option<usize> {
        self.open_indices().find(|&ri| {
            let b = &self.slots[ri].as_ref().unwrap();
            !b.is_scratch()
                && b.stat
                    .map(|s| s.dev == dev && s.ino == ino)
                    .unwrap_or(false)
        })
    }

    /// Slot of an open scratch buffer with this display name.
    pub fn find_scratch_name(&self, name: &str) -> Option<usize> {
        self.open_indices()
            .find(|&ri| {
                let b = self.slots[ri].as_ref().unwrap();
                b.is_scratch() && b.name == name
            })
    }

    fn advance(&mut self, step_back: bool) -> bool {
        if self.open == 0 {
            return false;
        }
        let step = |ri: usize| -> usize {
            if step_back {
                if ri > 0 { ri - 1 } else { RING_SIZE - 1 }
            } else if ri < RING_SIZE - 1 {
                ri + 1
            } else {
                0
            }
        };
        let start = self.current;
        let mut ri = step(start);
        while ri != start {
            if let Some(b) = &self.slots[ri] {
                if !b.flags.contains(BufferFlags::HIDDEN) {
                    self.current = ri;
                    return true;
                }
            }
            ri = step(ri);
        }
        // everything else is hidden: take the next open slot anyway
        // and unhide it
        let mut ri = step(start);
        while ri != start {
            if let Some(b) = &mut self.slots[ri] {
                b.flags.remove(BufferFlags::HIDDEN);
                self.current = ri;
                return true;
            }
            ri = step(ri);
        }
        self.slots[start].is_some()
    }

    /// Switch to the next open buffer, skipping hidden ones.
    pub fn next_file(&mut self) -> bool {
        self.advance(false)
    }

    /// Switch to the previous open buffer, skipping hidden ones.
    pub fn prev_file(&mut self) -> bool {
        self.advance(true)
    }
}
