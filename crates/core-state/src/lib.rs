//! Editor state: the buffer ring, selection, bookmarks, motion
//! history, trace messages and global options.
//!
//! The runtime threads one explicit [`EditorState`] value through
//! every command instead of keeping process-wide globals. Subsystems
//! (filter, search, pipe, io) receive `&mut EditorState` and touch
//! only the parts they need; nothing here is synchronised because the
//! whole editor mutates from a single cooperative loop.

use thiserror::Error;

mod bookmarks;
mod buffer;
mod options;
mod pipe;
mod ring;
mod selection;
mod trace;

pub use bookmarks::{Bookmark, BookmarkTable, MotionHistory};
pub use buffer::{Buffer, BufferFlags, FileType, SearchState, StatSnapshot};
pub use core_line::{Line, LineFlags, LineId, LineList, hide_bit};
pub use options::Options;
pub use pipe::{ChildPipe, LINESIZE_INIT, PipeOpts, ZOMBIE_DELAY};
pub use ring::{RING_SIZE, Ring};
pub use trace::{ErrorLog, TRACE_ROWS, TraceRing};

/// Error taxonomy shared across the core crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Line(#[from] core_line::LineError),
    #[error("no open buffer")]
    NoBuffer,
    #[error("buffer ring is full")]
    RingFull,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("regex: {0}")]
    Regex(String),
    #[error("child process: {0}")]
    Child(String),
    #[error("parse: {0}")]
    Parse(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// State of an interactive change (search & replace) session, kept
/// across prompt keystrokes.
#[derive(Debug)]
pub struct ChangeSession {
    /// Line the pending match lives on.
    pub line: LineId,
    pub lineno: usize,
    /// Column the pending search started from within the line.
    pub lncol: usize,
    /// Accumulated replacement bytes for the pending match.
    pub rep: Vec<u8>,
    /// False once the replacement expression turned out constant, so
    /// later matches skip re-accumulation.
    pub rep_dynamic: bool,
    pub change_count: usize,
    /// Capture spans of the pending match: group 0 plus up to nine
    /// subgroups, byte offsets into the line content.
    pub groups: Vec<Option<(usize, usize)>>,
}

/// The whole mutable editor universe.
pub struct EditorState {
    pub ring: Ring,
    /// Ring index holding the selection, if any.
    pub select_ri: Option<usize>,
    /// Watch line: the last cursor-touched selection line, biasing
    /// the direction in which the selection grows.
    pub select_w: usize,
    pub bookmarks: BookmarkTable,
    pub mhist: MotionHistory,
    pub opts: Options,
    pub trace: TraceRing,
    pub errlog: ErrorLog,
    /// Pending interactive replace session (replace prompt showing).
    pub change: Option<ChangeSession>,
    /// Command line under construction while a buffer has CMDLINE
    /// focus; the command-line editor itself lives outside the core.
    pub cmdline: String,
    /// Visible text geometry, updated on resize.
    pub text_rows: usize,
    pub text_cols: usize,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl EditorState {
    pub fn new(opts: Options) -> Self {
        Self {
            ring: Ring::new(),
            select_ri: None,
            select_w: 0,
            bookmarks: BookmarkTable::default(),
            mhist: MotionHistory::default(),
            opts,
            trace: TraceRing::default(),
            errlog: ErrorLog::default(),
            change: None,
            cmdline: String::new(),
            text_rows: 24,
            text_cols: 80,
        }
    }

    /// Current buffer or [`CoreError::NoBuffer`].
    pub fn cur(&self) -> CoreResult<&Buffer> {
        self.ring.current().ok_or(CoreError::NoBuffer)
    }

    pub fn cur_mut(&mut self) -> CoreResult<&mut Buffer> {
        self.ring.current_mut().ok_or(CoreError::NoBuffer)
    }

    /// Queue a short user-visible message (the trace area shows the
    /// most recent [`TRACE_ROWS`] of them).
    pub fn tracemsg(&mut self, msg: impl Into<String>) {
        self.trace.push(msg.into());
    }

    /// Open the named scratch buffer, or switch to it when it already
    /// exists. Sets the ring current index on success.
    pub fn scratch_buffer(&mut self, name: &str) -> CoreResult<usize> {
        if let Some(ri) = self.ring.find_scratch_name(name) {
            self.ring.set_current(ri);
            return Ok(ri);
        }
        let origin = self.ring.current_index();
        let buffer = Buffer::scratch(name, origin);
        let ri = self.ring.insert(buffer)?;
        self.ring.set_current(ri);
        Ok(ri)
    }

    /// Wipe the current buffer's text and per-buffer state while
    /// keeping the slot open (used before re-reading a file and by
    /// pipe targets with the no-append option).
    pub fn clean_current_buffer(&mut self) -> CoreResult<()> {
        let ri = self.ring.current_index();
        if self.select_ri == Some(ri) {
            self.reset_select();
        }
        self.bookmarks.clear_ring(ri);
        self.mhist.clear_ring(ri);
        let cur = self.cur_mut()?;
        cur.clean();
        Ok(())
    }
}
