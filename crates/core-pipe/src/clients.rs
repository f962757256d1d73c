//! Command-level clients of the pipe plane: shell, make, find and
//! the buffer-through-filter command.

use crate::plane::read_pipe;
use core_state::{BufferFlags, CoreResult, EditorState, PipeOpts};

const SHELL: &str = "/bin/sh";

/// Run `sh -c '<cmd>'` into the `*sh*` scratch buffer.
pub fn shell_cmd(state: &mut EditorState, cmd: &str) -> CoreResult<()> {
    if cmd.is_empty() {
        return Ok(());
    }
    let argstr = format!("sh -c '{cmd}'");
    read_pipe(state, "*sh*", SHELL, &argstr, PipeOpts::REDIR_ERR)
}

/// Run an interactive `sh -i` on a PTY into the `*sh*` buffer; typed
/// lines are forwarded through the master side.
pub fn ishell_cmd(state: &mut EditorState, cmd: &str) -> CoreResult<()> {
    let argstr = if cmd.is_empty() {
        "sh -i".to_string()
    } else {
        format!("sh -i -c '{cmd}'")
    };
    read_pipe(
        state,
        "*sh*",
        SHELL,
        &argstr,
        PipeOpts::REDIR_ERR | PipeOpts::INTERACT | PipeOpts::IN_OUT,
    )
}

/// Run `make` with the given arguments into the `*make*` buffer.
pub fn make_cmd(state: &mut EditorState, args: &str) -> CoreResult<()> {
    let argstr = if args.is_empty() {
        "make".to_string()
    } else {
        format!("make {args}")
    };
    read_pipe(state, "*make*", "make", &argstr, PipeOpts::REDIR_ERR)
}

/// Run `find` with the given arguments (a bare word is wrapped into a
/// name match over the tree) into the `*find*` buffer.
pub fn find_cmd(state: &mut EditorState, args: &str) -> CoreResult<()> {
    let argstr = if args.is_empty() {
        "find . -type f".to_string()
    } else if args.starts_with('-') || args.starts_with('.') || args.starts_with('/') {
        format!("find {args}")
    } else {
        format!("find . -type f -name '{args}'")
    };
    read_pipe(state, "*find*", "find", &argstr, PipeOpts::REDIR_ERR)
}

/// Pipe lines of the current buffer through an external command into
/// `*sh*`: the visible selection when this buffer owns one, otherwise
/// all visible lines.
pub fn filter_cmd(state: &mut EditorState, cmd: &str) -> CoreResult<()> {
    if cmd.is_empty() {
        return Ok(());
    }
    let input = if state.select_ri == Some(state.ring.current_index()) {
        PipeOpts::IN_OUT
    } else {
        PipeOpts::IN_OUT | PipeOpts::IN_VIS_ALL
    };
    let argstr = format!("sh -c '{cmd}'");
    read_pipe(state, "*sh*", SHELL, &argstr, PipeOpts::REDIR_ERR | input)
}

/// Same as [`filter_cmd`] but with shadow markers for hidden runs.
pub fn filter_shadow_cmd(state: &mut EditorState, cmd: &str) -> CoreResult<()> {
    if cmd.is_empty() {
        return Ok(());
    }
    let input = if state.select_ri == Some(state.ring.current_index()) {
        PipeOpts::IN_OUT
    } else {
        PipeOpts::IN_OUT | PipeOpts::IN_VIS_ALL
    };
    let argstr = format!("sh -c '{cmd}'");
    read_pipe(
        state,
        "*sh*",
        SHELL,
        &argstr,
        PipeOpts::REDIR_ERR | input | PipeOpts::SHADOW_MARK,
    )
}

/// Scan all regular buffers for a pattern into the `*locate*` special
/// buffer.
pub fn locate_cmd(state: &mut EditorState, expr: &str) -> CoreResult<()> {
    if expr.is_empty() {
        return Ok(());
    }
    state.scratch_buffer("*locate*")?;
    {
        let buffer = state.cur_mut()?;
        buffer
            .flags
            .insert(BufferFlags::SPECIAL | BufferFlags::NO_EDIT | BufferFlags::NO_ADD_LINE);
    }
    core_search::locate(state, expr)
}
