//! The file slot: one open file (or scratch buffer) with its line
//! list, cursor, filter level, search handles and optional child
//! process.

use crate::pipe::ChildPipe;
use bitflags::bitflags;
use core_line::{Line, LineFlags, LineId, LineList, hide_bit};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

bitflags! {
    /// Per-buffer flag word. The seven filter-active bits share the
    /// `0x7f00` region with the per-line hide bits so visibility is a
    /// single AND of the two words.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferFlags: u32 {
        /// Focus is on the command line rather than the text area.
        const CMDLINE = 0x0000_0001;
        /// Inline editing disabled.
        const NO_EDIT = 0x0000_0002;
        /// Adding lines disabled.
        const NO_ADD_LINE = 0x0000_0004;
        /// Deleting lines disabled.
        const NO_DEL_LINE = 0x0000_0008;
        /// Slot in use.
        const OPEN = 0x0000_0010;
        /// Read-only.
        const READ_ONLY = 0x0000_0020;
        /// Memory buffer differs from disk.
        const CHANGED = 0x0000_0040;
        /// No on-disk backing (memory only).
        const SCRATCH = 0x0000_0080;
        /// Filter-active bits, one per level.
        const FILTER_MASK = 0x0000_7f00;
        /// Compiled forward search regex present.
        const SEARCH_ACTIVE = 0x0000_8000;
        /// Interactive replace in progress.
        const REPLACE_ACTIVE = 0x0001_0000;
        /// Special buffer (command output, listings).
        const SPECIAL = 0x0002_0000;
        /// Search pattern is BoL/EoL anchored.
        const SEARCH_ANCHORED = 0x0004_0000;
        /// Highlight regex present.
        const HIGHLIGHT = 0x0008_0000;
        /// Highlight regex is anchored.
        const HIGHLIGHT_ANCHORED = 0x0010_0000;
        /// File changed on disk since open/save.
        const DISK_CHANGED = 0x0020_0000;
        /// Buffer skipped by ring traversal.
        const HIDDEN = 0x0040_0000;
        /// Child runs on a PTY and echoes into the buffer.
        const INTERACTIVE = 0x0080_0000;
    }
}

impl BufferFlags {
    /// The three edit-restriction bits together.
    pub const CHANGE_MASK: BufferFlags = BufferFlags::NO_EDIT
        .union(BufferFlags::NO_ADD_LINE)
        .union(BufferFlags::NO_DEL_LINE);
}

/// File type for the language-aware fold recognisers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    C,
    Perl,
    Tcl,
    Shell,
    Python,
    Text,
    #[default]
    Unknown,
}

impl FileType {
    /// Detect from the file name extension; scratch names (leading
    /// `*`) and unknown extensions come back [`FileType::Unknown`].
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match ext {
            "c" | "h" | "cc" | "cpp" | "cxx" | "hh" | "hpp" => FileType::C,
            "pl" | "pm" => FileType::Perl,
            "tcl" | "tk" => FileType::Tcl,
            "sh" | "bash" | "ksh" => FileType::Shell,
            "py" => FileType::Python,
            "txt" | "text" | "md" => FileType::Text,
            _ => FileType::Unknown,
        }
    }
}

/// Snapshot of the on-disk identity taken at open/save time, compared
/// by the external-change watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    pub dev: u64,
    pub ino: u64,
    pub size: u64,
    pub mtime: SystemTime,
    pub readonly: bool,
}

impl StatSnapshot {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            size: meta.size(),
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            readonly: meta.permissions().readonly(),
        }
    }
}

/// Search/replace state owned by one buffer.
#[derive(Debug, Default)]
pub struct SearchState {
    /// Compiled forward search regex (valid while SEARCH_ACTIVE).
    pub regex: Option<regex::bytes::Regex>,
    /// The expression as the user typed it.
    pub expr: String,
    /// Translated replacement expression of the last change command.
    pub replace_expr: String,
}

/// One slot of the ring.
#[derive(Debug)]
pub struct Buffer {
    /// Display name (file name or `*scratch*` style special name).
    pub name: String,
    /// On-disk path, absent for scratch buffers.
    pub path: Option<PathBuf>,
    pub basename: String,
    pub dirname: String,
    pub ftype: FileType,
    pub flags: BufferFlags,
    pub stat: Option<StatSnapshot>,
    pub lines: LineList,
    /// Current (focus) line.
    pub curr: LineId,
    /// 1-based line number of `curr`; TOP is 0, BOTTOM is
    /// `num_lines + 1`.
    pub lineno: usize,
    pub num_lines: usize,
    /// Byte column in the current line; may exceed the line length
    /// until the next vertical move recomputes it.
    pub lncol: usize,
    /// Visual column after tab expansion.
    pub curpos: usize,
    /// Row of the focus line within the visible text area.
    pub focus: usize,
    /// Horizontal scroll offset.
    pub lnoff: usize,
    /// Active filter level, 1..=7.
    pub flevel: u8,
    pub search: SearchState,
    /// Compiled highlight regex (valid while HIGHLIGHT).
    pub highlight: Option<regex::bytes::Regex>,
    /// Running child process, if any.
    pub child: Option<ChildPipe>,
    /// Ring index to return to when this buffer closes.
    pub origin: Option<usize>,
}

impl Buffer {
    /// Fresh buffer in scratch state; file opens flip SCRATCH off
    /// after the read succeeds.
    pub fn scratch(name: &str, origin: usize) -> Self {
        let lines = LineList::new();
        let bottom = lines.bottom();
        let special = name.starts_with('*');
        let (basename, dirname) = if special {
            (String::new(), String::new())
        } else {
            let p = Path::new(name);
            (
                p.file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                p.parent()
                    .map(|s| s.to_string_lossy().into_owned())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| ".".into()),
            )
        };
        Self {
            name: name.to_string(),
            path: None,
            basename,
            dirname,
            ftype: FileType::from_name(name),
            flags: BufferFlags::OPEN
                | BufferFlags::SCRATCH
                | BufferFlags::CMDLINE
                | BufferFlags::FILTER_MASK,
            stat: None,
            curr: bottom,
            lineno: 1,
            num_lines: 0,
            lncol: 0,
            curpos: 0,
            focus: 0,
            lnoff: 0,
            flevel: 1,
            search: SearchState::default(),
            highlight: None,
            child: None,
            origin: Some(origin),
            lines,
        }
    }

    /// Wipe all text lines and reset cursor/filter state, keeping the
    /// slot open, the stat snapshot and the stored search expression.
    pub fn clean(&mut self) {
        let mut lp = self.lines.first_text();
        while let Some(id) = lp {
            let next = self.lines.remove(id);
            lp = self.lines.is_text(next).then_some(next);
        }
        self.flags = BufferFlags::OPEN
            | BufferFlags::SCRATCH
            | BufferFlags::CMDLINE
            | BufferFlags::FILTER_MASK;
        self.num_lines = 0;
        self.lineno = 0;
        self.curr = self.lines.top();
        self.lncol = 0;
        self.lnoff = 0;
        self.focus = 0;
        self.curpos = 0;
        self.flevel = 1;
        self.search.regex = None;
        self.highlight = None;
    }

    pub fn is_open(&self) -> bool {
        self.flags.contains(BufferFlags::OPEN)
    }

    pub fn is_scratch(&self) -> bool {
        self.flags.contains(BufferFlags::SCRATCH)
    }

    pub fn is_special(&self) -> bool {
        self.flags.contains(BufferFlags::SPECIAL)
    }

    /// Hide/filter-active bit of the buffer's current level.
    pub fn fmask(&self) -> u32 {
        hide_bit(self.flevel)
    }

    /// The effective visibility mask: non-zero only while the current
    /// level's filter-active bit is set on the buffer.
    pub fn lmask(&self) -> u32 {
        self.flags.bits() & self.fmask()
    }

    /// A line is hidden iff it carries the hide bit of the active
    /// level while that level's filter is switched on.
    pub fn is_hidden(&self, id: LineId) -> bool {
        self.lines.line(id).hide_bits() & self.lmask() != 0
    }

    pub fn line(&self, id: LineId) -> &Line {
        self.lines.line(id)
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut Line {
        self.lines.line_mut(id)
    }

    pub fn current_line(&self) -> &Line {
        self.lines.line(self.curr)
    }

    pub fn current_line_mut(&mut self) -> &mut Line {
        self.lines.line_mut(self.curr)
    }

    /// Step to the next line that is not filtered out, stopping at
    /// BOTTOM. Returns the landing line and the number of steps.
    pub fn next_visible(&self, from: LineId) -> (LineId, usize) {
        let mask = self.lmask();
        let mut id = from;
        let mut cnt = 0;
        while let Some(next) = self.lines.next(id) {
            id = next;
            cnt += 1;
            if self.lines.line(id).is_bottom() || self.lines.line(id).hide_bits() & mask == 0 {
                break;
            }
        }
        (id, cnt)
    }

    /// Step to the previous visible line, stopping at TOP.
    pub fn prev_visible(&self, from: LineId) -> (LineId, usize) {
        let mask = self.lmask();
        let mut id = from;
        let mut cnt = 0;
        while let Some(prev) = self.lines.prev(id) {
            id = prev;
            cnt += 1;
            if self.lines.line(id).is_top() || self.lines.line(id).hide_bits() & mask == 0 {
                break;
            }
        }
        (id, cnt)
    }

    /// Absolute jump; see [`LineList::goto_lineno`].
    pub fn goto_lineno(&self, n: usize) -> Option<LineId> {
        self.lines
            .goto_lineno(n, self.num_lines, (self.curr, self.lineno))
    }

    /// Move the cursor to an absolute line, recomputing the byte
    /// column from the sticky visual column.
    pub fn set_position(&mut self, lineno: usize, id: LineId, tabsize: usize) {
        self.curr = id;
        self.lineno = lineno;
        self.lncol = self.col_at(id, self.curpos, tabsize);
    }

    /// Visual column of byte column `lncol` in `id` after tab
    /// expansion.
    pub fn pos_at(&self, id: LineId, lncol: usize, tabsize: usize) -> usize {
        let content = self.lines.line(id).content();
        let mut pos = 0;
        for &b in content.iter().take(lncol) {
            if b == b'\t' {
                pos += tabsize - (pos % tabsize);
            } else {
                pos += 1;
            }
        }
        // cursor may rest past the end of the line
        pos + lncol.saturating_sub(content.len())
    }

    /// Inverse of [`Buffer::pos_at`]: byte column whose visual column
    /// reaches `curpos` (clamped to the line content).
    pub fn col_at(&self, id: LineId, curpos: usize, tabsize: usize) -> usize {
        let content = self.lines.line(id).content();
        let mut pos = 0;
        for (i, &b) in content.iter().enumerate() {
            if pos >= curpos {
                return i;
            }
            if b == b'\t' {
                pos += tabsize - (pos % tabsize);
            } else {
                pos += 1;
            }
        }
        content.len()
    }

    /// Refresh `curpos` (and horizontal scroll) from `lncol`.
    pub fn update_curpos(&mut self, tabsize: usize, text_cols: usize) {
        self.curpos = self.pos_at(self.curr, self.lncol, tabsize);
        if self.curpos < self.lnoff {
            self.lnoff = self.curpos;
        } else if text_cols > 0 && self.curpos - self.lnoff > text_cols - 1 {
            self.lnoff = self.curpos + 1 - text_cols;
        }
    }

    /// Keep the focus row inside the text area, recentring when it
    /// drifted onto a border.
    pub fn focus_avoid_border(&mut self, text_rows: usize) {
        if text_rows == 0 {
            self.focus = 0;
            return;
        }
        if self.focus >= text_rows {
            self.focus = text_rows / 2;
        }
    }

    pub fn focus_center(&mut self, text_rows: usize) {
        self.focus = text_rows / 2;
    }

    pub fn focus_incr(&mut self, text_rows: usize) {
        if self.focus + 1 < text_rows {
            self.focus += 1;
        }
    }

    pub fn focus_decr(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    /// Pull the cursor to the nearest visible line (next first, then
    /// previous), used after filter changes hid the current line.
    pub fn pull_cursor_to_visible(&mut self, tabsize: usize) {
        if !self.is_hidden(self.curr) {
            return;
        }
        let (next, cnt) = self.next_visible(self.curr);
        if self.lines.is_text(next) {
            self.curr = next;
            self.lineno += cnt;
        } else {
            let (prev, cnt) = self.prev_visible(self.curr);
            self.curr = prev;
            self.lineno = self.lineno.saturating_sub(cnt);
        }
        self.lncol = self.col_at(self.curr, self.curpos, tabsize);
    }

    /// True when the current line may be edited in place.
    pub fn can_edit(&self) -> bool {
        !self.flags.contains(BufferFlags::NO_EDIT) && self.lines.is_text(self.curr)
    }

    /// Set CHANGED on a line and the buffer together.
    pub fn mark_changed(&mut self, id: LineId) {
        self.lines.line_mut(id).flags.insert(LineFlags::CHANGED);
        self.flags.insert(BufferFlags::CHANGED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(texts: &[&str]) -> Buffer {
        let mut b = Buffer::scratch("*t*", 0);
        let mut at = b.lines.top();
        for t in texts {
            at = b.lines.append(at, t.as_bytes()).unwrap();
            b.num_lines += 1;
        }
        b.curr = b.lines.first_text().unwrap();
        b.lineno = 1;
        b
    }

    #[test]
    fn filetype_detection() {
        assert_eq!(FileType::from_name("foo.c"), FileType::C);
        assert_eq!(FileType::from_name("foo.py"), FileType::Python);
        assert_eq!(FileType::from_name("*sh*"), FileType::Unknown);
        assert_eq!(FileType::from_name("script.tcl"), FileType::Tcl);
    }

    #[test]
    fn visibility_needs_both_bits() {
        let mut b = filled(&["a", "b"]);
        let id = b.lines.first_text().unwrap();
        assert!(!b.is_hidden(id));
        let mask = b.fmask();
        b.lines.line_mut(id).hide(mask);
        assert!(b.is_hidden(id));
        // dropping the buffer's active bit shows the line again
        b.flags.remove(BufferFlags::from_bits_retain(mask));
        assert!(!b.is_hidden(id));
    }

    #[test]
    fn next_visible_skips_masked_lines() {
        let mut b = filled(&["a", "b", "c"]);
        let ids: Vec<_> = b.lines.iter_text().collect();
        let mask = b.fmask();
        b.lines.line_mut(ids[1]).hide(mask);
        let (id, cnt) = b.next_visible(ids[0]);
        assert_eq!(id, ids[2]);
        assert_eq!(cnt, 2);
        let (id, cnt) = b.prev_visible(ids[2]);
        assert_eq!(id, ids[0]);
        assert_eq!(cnt, 2);
    }

    #[test]
    fn tab_expansion_round_trip() {
        let b = filled(&["\tx\ty"]);
        let id = b.lines.first_text().unwrap();
        assert_eq!(b.pos_at(id, 0, 8), 0);
        assert_eq!(b.pos_at(id, 1, 8), 8);
        assert_eq!(b.pos_at(id, 2, 8), 9);
        assert_eq!(b.pos_at(id, 3, 8), 16);
        assert_eq!(b.col_at(id, 16, 8), 3);
        assert_eq!(b.col_at(id, 9, 8), 2);
        // column past the end clamps
        assert_eq!(b.col_at(id, 100, 8), 4);
    }

    #[test]
    fn cursor_past_end_keeps_virtual_columns() {
        let b = filled(&["ab"]);
        let id = b.lines.first_text().unwrap();
        assert_eq!(b.pos_at(id, 5, 8), 5);
    }

    #[test]
    fn clean_resets_but_keeps_slot() {
        let mut b = filled(&["a", "b"]);
        b.flags.insert(BufferFlags::CHANGED);
        b.clean();
        assert!(b.is_open());
        assert!(b.is_scratch());
        assert_eq!(b.num_lines, 0);
        assert!(b.lines.first_text().is_none());
        assert!(!b.flags.contains(BufferFlags::CHANGED));
    }
}
