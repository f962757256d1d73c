//! The pipe plane: launching children into buffers, per-tick output
//! polling, and teardown.

use crate::spawn::{ReadOutcome, read_fd, set_nonblocking, spawn_child, write_fd};
use core_line::sanitize_line;
use core_state::{
    Buffer, BufferFlags, ChildPipe, CoreError, CoreResult, EditorState, LINESIZE_INIT, LineFlags,
    LineId, PipeOpts, ZOMBIE_DELAY,
};
use std::os::fd::AsRawFd;
use tracing::{debug, error, info};

/// Result of one poll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Lines arrived (or the stream finished) and the buffer changed.
    Progress,
    /// Nothing to read this tick.
    Idle,
    /// The pipe broke; the child was torn down.
    Error,
}

/// Start an external command whose output streams into the buffer
/// named `dest` (opened or reused as a scratch buffer).
///
/// Without NO_BG the output fd is switched to non-blocking and the
/// per-tick poll picks lines up; with NO_BG the child is drained
/// before returning. NO_SCRATCH skips all buffer handling and leaves
/// the stream to a custom consumer (the diff reload).
pub fn read_pipe(
    state: &mut EditorState,
    dest: &str,
    cmd: &str,
    argstr: &str,
    opts: PipeOpts,
) -> CoreResult<()> {
    if opts.contains(PipeOpts::NO_BG) && opts.contains(PipeOpts::INTERACT) {
        error!(target: "pipe", ?opts, "interactive_must_be_background");
        return Err(CoreError::Child("interactive must be background".into()));
    }
    let origin_ri = state.ring.current_index();
    let standard = !opts.contains(PipeOpts::NO_SCRATCH);

    if standard {
        state.scratch_buffer(dest)?;
    }
    if state.cur()?.child.is_some() {
        state.tracemsg("running background process!");
        debug!(target: "pipe", dest, "child_already_running");
        state.ring.set_current(origin_ri);
        return Ok(());
    }
    if standard && opts.contains(PipeOpts::NO_APPEND) && state.cur()?.num_lines > 0 {
        state.clean_current_buffer()?;
    }

    let spawned = match spawn_child(cmd, argstr, opts) {
        Ok(s) => s,
        Err(e) => {
            state.tracemsg("failed to start external tool");
            state.ring.set_current(origin_ri);
            return Err(e);
        }
    };
    let mut pipe = ChildPipe::new(spawned.child, spawned.input, spawned.output, opts);

    if opts.contains(PipeOpts::IN_OUT)
        && let Some(input) = pipe.input.as_ref()
    {
        let fd = input.as_raw_fd();
        let written = feed_child_input(state, origin_ri, fd, opts)?;
        debug!(target: "pipe", written, origin = origin_ri, "child_input_fed");
    }
    if !opts.contains(PipeOpts::INTERACT) {
        pipe.close_input();
    }

    if standard {
        let silent = opts.contains(PipeOpts::SILENT);
        let buffer = state.cur_mut()?;
        buffer.flags.insert(BufferFlags::SPECIAL);
        if opts.contains(PipeOpts::INTERACT) {
            buffer.flags.insert(BufferFlags::INTERACTIVE);
            buffer.flags.remove(BufferFlags::CMDLINE);
        } else {
            buffer
                .flags
                .insert(BufferFlags::NO_EDIT | BufferFlags::NO_ADD_LINE);
        }
        if !silent {
            let prompt = if unsafe { libc::getuid() } == 0 { "# " } else { "$ " };
            let header = format!("{prompt}{argstr}");
            let bottom = buffer.lines.bottom();
            buffer.lines.insert_before(bottom, header.as_bytes())?;
            buffer.num_lines += 1;
        }
    }

    state.cur_mut()?.child = Some(pipe);

    if standard {
        // pull the cursor onto the tail so appended output stays in
        // view
        let text_rows = state.text_rows;
        let buffer = state.cur_mut()?;
        if buffer.lineno >= buffer.num_lines {
            let bottom = buffer.lines.bottom();
            buffer.curr = buffer.lines.prev(bottom).unwrap_or(bottom);
            buffer.lineno = buffer.num_lines;
            if buffer.lines.is_text(buffer.curr) {
                let mask = buffer.lmask();
                let curr = buffer.curr;
                buffer.line_mut(curr).unhide(mask);
            }
            buffer.focus_center(text_rows);
        }
        if state.ring.current_index() != origin_ri {
            state.cur_mut()?.origin = Some(origin_ri);
        }
        if opts.contains(PipeOpts::NO_BG) {
            info!(target: "pipe", dest, cmd, "draining_in_foreground");
            return finish_in_fg(state);
        }
        if let Some(out) = state.cur()?.child.as_ref().and_then(|c| c.output.as_ref()) {
            set_nonblocking(out)?;
        }
        debug!(target: "pipe", dest, cmd, "continuing_in_background");
    }
    Ok(())
}

/// Feed the child's stdin from the origin buffer per the IN_OUT
/// subcode: focus line, really-all lines, all visible lines, or the
/// visible selection (the default).
fn feed_child_input(
    state: &EditorState,
    origin_ri: usize,
    fd: std::os::fd::RawFd,
    opts: PipeOpts,
) -> CoreResult<usize> {
    let Some(origin) = state.ring.get(origin_ri) else {
        return Ok(0);
    };
    let shadow = opts.contains(PipeOpts::SHADOW_MARK) && state.opts.shadow_marks;
    let mut count = 0usize;
    if opts.contains(PipeOpts::IN_FOCUS) {
        if origin.lines.is_text(origin.curr) {
            write_fd(fd, origin.current_line().bytes())?;
            count += 1;
        }
    } else if opts.contains(PipeOpts::IN_REAL_ALL) {
        for id in origin.lines.iter_text() {
            write_fd(fd, origin.line(id).bytes())?;
            count += 1;
        }
    } else if opts.contains(PipeOpts::IN_VIS_ALL) {
        count += write_visible(origin, fd, shadow, |_, _| true)?;
    } else {
        count += write_visible(origin, fd, shadow, |b, id| {
            b.line(id).flags.contains(LineFlags::SELECTED)
        })?;
    }
    Ok(count)
}

fn write_visible(
    buffer: &Buffer,
    fd: std::os::fd::RawFd,
    shadow: bool,
    pick: impl Fn(&Buffer, LineId) -> bool,
) -> CoreResult<usize> {
    let mut count = 0usize;
    let mut id = buffer.lines.top();
    loop {
        let (next, cnt) = buffer.next_visible(id);
        if !buffer.lines.is_text(next) {
            break;
        }
        if pick(buffer, next) {
            if shadow && cnt > 1 {
                let skipped = cnt - 1;
                let marker = if skipped == 1 {
                    "--- 1 line ---\n".to_string()
                } else {
                    format!("--- {skipped} lines ---\n")
                };
                write_fd(fd, marker.as_bytes())?;
                count += 1;
            }
            write_fd(fd, buffer.line(next).bytes())?;
            count += 1;
        }
        id = next;
    }
    Ok(count)
}

/// Drain the current buffer's child synchronously until EOF.
pub fn finish_in_fg(state: &mut EditorState) -> CoreResult<()> {
    let ri = state.ring.current_index();
    if let Some(pipe) = state.cur_mut()?.child.as_mut() {
        pipe.opts.insert(PipeOpts::NO_BG);
    }
    loop {
        let running = state
            .ring
            .get(ri)
            .is_some_and(|b| b.child.as_ref().is_some_and(|c| c.output.is_some()));
        if !running {
            break;
        }
        if readout_pipe(state, ri) == PollStatus::Error {
            return Err(CoreError::Child("pipe read failed".into()));
        }
    }
    Ok(())
}

/// One best-effort poll step for the buffer's child: read what is
/// available, cut complete lines into the buffer, keep the partial
/// tail for the next tick.
pub fn readout_pipe(state: &mut EditorState, ri: usize) -> PollStatus {
    let Some(buffer) = state.ring.get(ri) else {
        return PollStatus::Idle;
    };
    let Some(pipe) = buffer.child.as_ref() else {
        return PollStatus::Idle;
    };
    if pipe.opts.contains(PipeOpts::NO_SCRATCH) {
        return readout_line(state, ri);
    }
    if buffer.flags.contains(BufferFlags::INTERACTIVE) {
        return readout_interactive(state, ri);
    }
    readout_standard(state, ri)
}

/// NO_SCRATCH mode: deliver exactly one line (or the final partial)
/// into the reassembly buffer for a custom consumer.
fn readout_line(state: &mut EditorState, ri: usize) -> PollStatus {
    let Some(pipe) = state.ring.get_mut(ri).and_then(|b| b.child.as_mut()) else {
        return PollStatus::Idle;
    };
    pipe.readbuf.clear();
    let Some(fd) = pipe.output.as_ref().map(|f| f.as_raw_fd()) else {
        return PollStatus::Idle;
    };
    let mut byte = [0u8; 1];
    loop {
        match read_fd(fd, &mut byte) {
            ReadOutcome::Data(_) => {
                pipe.readbuf.push(byte[0]);
                if byte[0] == b'\n' || pipe.readbuf.len() >= LINESIZE_INIT - 8 {
                    return PollStatus::Progress;
                }
            }
            ReadOutcome::Eof => {
                pipe.close_output();
                return if pipe.readbuf.is_empty() {
                    PollStatus::Idle
                } else {
                    PollStatus::Progress
                };
            }
            ReadOutcome::WouldBlock => {
                return if pipe.readbuf.is_empty() {
                    PollStatus::Idle
                } else {
                    PollStatus::Progress
                };
            }
            ReadOutcome::Failed => {
                pipe.close_output();
                return PollStatus::Error;
            }
        }
    }
}

/// Interactive (PTY) mode: read one block, strip terminal escape
/// noise, and push the rest through the ordinary text-insert path on
/// the buffer's last line.
fn readout_interactive(state: &mut EditorState, ri: usize) -> PollStatus {
    let mut chunk = vec![0u8; LINESIZE_INIT];
    let outcome = {
        let Some(pipe) = state.ring.get_mut(ri).and_then(|b| b.child.as_mut()) else {
            return PollStatus::Idle;
        };
        let Some(fd) = pipe.output.as_ref().map(|f| f.as_raw_fd()) else {
            return PollStatus::Idle;
        };
        read_fd(fd, &mut chunk)
    };
    match outcome {
        ReadOutcome::Data(n) => {
            chunk.truncate(n);
            let text = filter_esc_sequences(&chunk);
            if let Some(pipe) = state.ring.get_mut(ri).and_then(|b| b.child.as_mut()) {
                pipe.eagain = 0;
            }
            let origin = state.ring.current_index();
            state.ring.set_current(ri);
            // typed-output insertion must ignore the no-edit guard
            let had_no_edit = {
                let Ok(buffer) = state.cur_mut() else {
                    return PollStatus::Error;
                };
                let had = buffer.flags.contains(BufferFlags::NO_EDIT);
                buffer.flags.remove(BufferFlags::NO_EDIT);
                had
            };
            let res = core_edit::type_text(state, &text);
            if had_no_edit && let Ok(buffer) = state.cur_mut() {
                buffer.flags.insert(BufferFlags::NO_EDIT);
            }
            state.ring.set_current(origin);
            if res.is_err() {
                return PollStatus::Error;
            }
            PollStatus::Progress
        }
        ReadOutcome::WouldBlock => {
            let Some(pipe) = state.ring.get_mut(ri).and_then(|b| b.child.as_mut()) else {
                return PollStatus::Idle;
            };
            pipe.eagain += 1;
            if pipe.eagain >= ZOMBIE_DELAY {
                pipe.eagain = 0;
                match pipe.child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(target: "pipe", ri, %status, "pty_child_exited");
                        stop_child(state, ri);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(target: "pipe", ri, error = %e, "zombie_check_failed");
                        stop_child(state, ri);
                    }
                }
            }
            PollStatus::Idle
        }
        ReadOutcome::Eof => {
            finish_stream(state, ri);
            PollStatus::Progress
        }
        ReadOutcome::Failed => {
            stop_child(state, ri);
            PollStatus::Error
        }
    }
}

/// Standard mode: append complete lines to the buffer tail.
fn readout_standard(state: &mut EditorState, ri: usize) -> PollStatus {
    let fix_cr = state.opts.fix_cr;
    let Some(buffer) = state.ring.get_mut(ri) else {
        return PollStatus::Idle;
    };
    let pull = buffer.lineno >= buffer.num_lines;

    // phase one: drain what the fd has into the reassembly bytes
    let (mut data, finished, failed) = {
        let Some(pipe) = buffer.child.as_mut() else {
            return PollStatus::Idle;
        };
        let mut data = std::mem::take(&mut pipe.readbuf);
        let mut finished = false;
        let mut failed = false;
        match pipe.output.as_ref().map(|f| f.as_raw_fd()) {
            Some(fd) => {
                let mut total = 0usize;
                loop {
                    let mut chunk = [0u8; 1024];
                    match read_fd(fd, &mut chunk) {
                        ReadOutcome::Data(n) => {
                            data.extend_from_slice(&chunk[..n]);
                            total += n;
                            if total >= LINESIZE_INIT {
                                break;
                            }
                        }
                        ReadOutcome::Eof => {
                            finished = true;
                            break;
                        }
                        ReadOutcome::WouldBlock => break,
                        ReadOutcome::Failed => {
                            failed = true;
                            break;
                        }
                    }
                }
            }
            None => finished = true,
        }
        (data, finished, failed)
    };
    if failed {
        stop_child(state, ri);
        return PollStatus::Error;
    }

    // phase two: cut complete lines into the buffer
    let mut appended = 0usize;
    {
        let Some(buffer) = state.ring.get_mut(ri) else {
            return PollStatus::Idle;
        };
        while let Some(pos) = data.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = data.drain(..=pos).collect();
            sanitize_line(&mut line, fix_cr);
            let bottom = buffer.lines.bottom();
            if buffer.lines.insert_before(bottom, &line).is_err() {
                return PollStatus::Error;
            }
            buffer.num_lines += 1;
            appended += 1;
        }
        if let Some(pipe) = buffer.child.as_mut() {
            pipe.readbuf = data;
        }
        if appended > 0 && pull {
            let bottom = buffer.lines.bottom();
            buffer.curr = buffer.lines.prev(bottom).unwrap_or(bottom);
            buffer.lineno = buffer.num_lines;
            if buffer.lines.is_text(buffer.curr) {
                let mask = buffer.lmask();
                let curr = buffer.curr;
                buffer.line_mut(curr).unhide(mask);
            }
        }
    }

    if finished {
        finish_stream(state, ri);
        return PollStatus::Progress;
    }
    if appended > 0 {
        PollStatus::Progress
    } else {
        PollStatus::Idle
    }
}

/// End of stream: flush the partial tail as a line, close and reap,
/// and append the footer line unless SILENT.
pub fn finish_stream(state: &mut EditorState, ri: usize) {
    let fix_cr = state.opts.fix_cr;
    let Some(buffer) = state.ring.get_mut(ri) else {
        return;
    };
    let mut silent = true;
    if let Some(pipe) = buffer.child.as_mut() {
        silent = pipe.opts.contains(PipeOpts::SILENT) || pipe.opts.contains(PipeOpts::NO_SCRATCH);
        if pipe.opts.contains(PipeOpts::NO_SCRATCH) {
            // the custom consumer owns these bytes; never flush them
            // into the buffer
            pipe.readbuf.clear();
        }
        if !pipe.readbuf.is_empty() {
            let mut line = std::mem::take(&mut pipe.readbuf);
            sanitize_line(&mut line, fix_cr);
            let bottom = buffer.lines.bottom();
            if buffer.lines.insert_before(bottom, &line).is_ok() {
                buffer.num_lines += 1;
            }
        }
    }
    wait_child(buffer);
    if !silent {
        let bottom = buffer.lines.bottom();
        if buffer.lines.insert_before(bottom, b"").is_ok() {
            buffer.num_lines += 1;
        }
    }
    buffer.flags.remove(BufferFlags::INTERACTIVE);
    info!(target: "pipe", ri, "stream_finished");
}

/// Close the pipe ends and reap the child, escalating to SIGKILL when
/// the wait fails.
fn wait_child(buffer: &mut Buffer) {
    let Some(mut pipe) = buffer.child.take() else {
        return;
    };
    pipe.close_input();
    pipe.close_output();
    pipe.readbuf = Vec::new();
    match pipe.child.wait() {
        Ok(status) => {
            debug!(target: "pipe", %status, "child_reaped");
        }
        Err(e) => {
            error!(target: "pipe", error = %e, "wait_failed_killing");
            let _ = pipe.child.kill();
            let _ = pipe.child.try_wait();
        }
    }
}

/// Kill and reap the buffer's child without waiting for EOF. Used by
/// the explicit stop command and on buffer drop.
pub fn stop_child(state: &mut EditorState, ri: usize) {
    let Some(buffer) = state.ring.get_mut(ri) else {
        return;
    };
    stop_child_of(buffer);
}

/// Same teardown for a buffer already detached from the ring.
pub fn stop_child_of(buffer: &mut Buffer) {
    let Some(mut pipe) = buffer.child.take() else {
        return;
    };
    pipe.close_input();
    pipe.close_output();
    pipe.readbuf = Vec::new();
    let _ = pipe.child.kill();
    let _ = pipe.child.try_wait();
    buffer.flags.remove(BufferFlags::INTERACTIVE);
    debug!(target: "pipe", "child_stopped");
}

/// Stop the current buffer's child (user command).
pub fn stop_bg_process(state: &mut EditorState) -> CoreResult<()> {
    let ri = state.ring.current_index();
    stop_child(state, ri);
    Ok(())
}

/// Poll every buffer that owns a child. Returns true when the current
/// buffer changed, so the caller can schedule a redraw.
pub fn background_pipes(state: &mut EditorState) -> bool {
    let current = state.ring.current_index();
    let mut current_changed = false;
    let with_children: Vec<usize> = state
        .ring
        .open_indices()
        .filter(|&ri| {
            state.ring.get(ri).is_some_and(|b| {
                b.child
                    .as_ref()
                    .is_some_and(|c| !c.opts.contains(PipeOpts::NO_SCRATCH))
            })
        })
        .collect();
    for ri in with_children {
        match readout_pipe(state, ri) {
            PollStatus::Progress if ri == current => current_changed = true,
            PollStatus::Error => {
                error!(target: "pipe", ri, "background_poll_failed");
            }
            _ => {}
        }
    }
    current_changed
}

/// Send typed bytes to an interactive child's PTY.
pub fn write_to_child(state: &mut EditorState, bytes: &[u8]) -> CoreResult<usize> {
    let buffer = state.cur_mut()?;
    let Some(pipe) = buffer.child.as_mut() else {
        return Ok(0);
    };
    let Some(fd) = pipe.input.as_ref().map(|f| f.as_raw_fd()) else {
        return Ok(0);
    };
    let n = write_fd(fd, bytes)?;
    pipe.last_input_len = bytes.len();
    Ok(n)
}

/// Strip xterm title sequences (`ESC ] 0 ; ... BEL`) entirely and
/// drop other escape sequences: CSI runs up to their final byte,
/// anything else the ESC plus one byte.
pub fn filter_esc_sequences(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        let b = input[i];
        if b != 0x1b {
            out.push(b);
            i += 1;
            continue;
        }
        match input.get(i + 1) {
            Some(b']') => {
                // OSC: swallow through BEL (or terminator-less end)
                i += 2;
                while i < input.len() && input[i] != 0x07 {
                    i += 1;
                }
                i += 1;
            }
            Some(b'[') => {
                // CSI: swallow parameter bytes up to the final byte
                i += 2;
                while i < input.len() && !(0x40..=0x7e).contains(&input[i]) {
                    i += 1;
                }
                i += 1;
            }
            Some(_) => i += 2,
            None => i += 1,
        }
    }
    out
}
