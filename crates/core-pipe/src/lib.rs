//! The external-process plane.
//!
//! Each buffer may own at most one child process. Children run in
//! parallel with editing and talk to the editor only through their
//! pipe (or PTY) fds; the cooperative loop polls every child's output
//! once per idle tick and appends complete lines to the owning
//! buffer. Nothing blocks outside the explicit foreground drain.

mod args;
mod clients;
mod plane;
mod spawn;

pub use args::parse_args;
pub use clients::{
    filter_cmd, filter_shadow_cmd, find_cmd, ishell_cmd, locate_cmd, make_cmd, shell_cmd,
};
pub use plane::{
    PollStatus, background_pipes, filter_esc_sequences, finish_in_fg, finish_stream, read_pipe,
    readout_pipe, stop_bg_process, stop_child, stop_child_of, write_to_child,
};
pub use spawn::{ReadOutcome, Spawned, read_fd, set_nonblocking, spawn_child, write_fd};
