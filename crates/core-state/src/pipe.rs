//! Child-process state carried by a buffer.
//!
//! Only plain data lives here: the process handle, the two pipe ends
//! and the line-reassembly buffer. Spawning, polling and teardown are
//! the pipe plane's business; keeping the record on the buffer gives
//! drop-time access to everything that must be closed.

use bitflags::bitflags;
use std::os::fd::OwnedFd;
use std::process::Child;

/// Initial read chunk and reassembly buffer size.
pub const LINESIZE_INIT: usize = 0x1000;

/// Consecutive EAGAIN reads on a PTY before probing the child with a
/// non-blocking wait.
pub const ZOMBIE_DELAY: u32 = 10;

bitflags! {
    /// Launch options for `read_pipe`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PipeOpts: u32 {
        /// Feed the child some input lines (selection by default).
        const IN_OUT = 0x0010;
        /// ... only the focus line.
        const IN_FOCUS = 0x0001;
        /// ... all visible lines.
        const IN_VIS_ALL = 0x0002;
        /// ... really all lines.
        const IN_REAL_ALL = 0x0004;
        /// Insert shadow markers for skipped hidden runs.
        const SHADOW_MARK = 0x0020;
        /// Redirect the child's stderr into the output pipe.
        const REDIR_ERR = 0x0040;
        /// Drain synchronously instead of backgrounding.
        const NO_BG = 0x0080;
        /// Custom processing: no scratch buffer is opened.
        const NO_SCRATCH = 0x0100;
        /// Run on a PTY and keep the writer open for typed input.
        const INTERACT = 0x0200;
        /// No header/footer lines.
        const SILENT = 0x2000;
        /// Wipe the target buffer instead of appending.
        const NO_APPEND = 0x4000;
    }
}

/// A running (or recently finished) child owned by one buffer.
#[derive(Debug)]
pub struct ChildPipe {
    pub child: Child,
    /// Writer towards the child's stdin; `None` once closed. Under
    /// INTERACT this is a dup of the PTY master.
    pub input: Option<OwnedFd>,
    /// Non-blocking reader from the child's stdout (or PTY master).
    pub output: Option<OwnedFd>,
    /// Partial line bytes kept between polls.
    pub readbuf: Vec<u8>,
    pub opts: PipeOpts,
    /// Consecutive EAGAIN count for zombie detection.
    pub eagain: u32,
    /// Length of the last text typed into an interactive buffer, for
    /// prompt recognition.
    pub last_input_len: usize,
}

impl ChildPipe {
    pub fn new(child: Child, input: Option<OwnedFd>, output: Option<OwnedFd>, opts: PipeOpts) -> Self {
        Self {
            child,
            input,
            output,
            readbuf: Vec::with_capacity(LINESIZE_INIT),
            opts,
            eagain: 0,
            last_input_len: 0,
        }
    }

    /// Closing the writer signals EOF to well-behaved children; safe
    /// to call twice.
    pub fn close_input(&mut self) {
        self.input = None;
    }

    pub fn close_output(&mut self) {
        self.output = None;
    }
}
