//! Block tools over the visible selection: shifting, padding,
//! cutting, splitting and the two-block join.

use core_state::{BufferFlags, CoreResult, EditorState, LineFlags, LineId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftKind {
    /// Drop one leading blank per line.
    UnindentLeft,
    /// Insert one indent step per line.
    IndentRight,
    /// Drop the first character unconditionally.
    ShiftLeft,
    /// Duplicate the first character.
    ShiftRight,
}

/// Visible selection line ids, starting at the first visible line of
/// the run; empty when the selection is not in the current buffer or
/// has no visible line.
fn visible_run(state: &EditorState) -> Vec<LineId> {
    if state.select_ri != Some(state.ring.current_index()) {
        return Vec::new();
    }
    let Some((first, _)) = state.selection_first_line() else {
        return Vec::new();
    };
    let Ok(buffer) = state.cur() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut id = first;
    while buffer.lines.is_text(id) && buffer.line(id).flags.contains(LineFlags::SELECTED) {
        if !buffer.is_hidden(id) {
            out.push(id);
        }
        match buffer.lines.next(id) {
            Some(n) => id = n,
            None => break,
        }
    }
    out
}

fn shift_engine(state: &mut EditorState, kind: ShiftKind) -> CoreResult<bool> {
    let run = visible_run(state);
    if run.is_empty() {
        state.tracemsg("selection not visible");
        return Ok(false);
    }
    let prefix: Vec<u8> = match kind {
        ShiftKind::IndentRight => {
            let unit = if state.opts.indent_tabs { b'\t' } else { b' ' };
            vec![unit; state.opts.indent_size]
        }
        ShiftKind::ShiftRight => vec![b' '],
        _ => Vec::new(),
    };
    let tabsize = state.opts.tabsize;
    let buffer = state.cur_mut()?;
    let mut modified = 0usize;
    for id in run {
        // empty lines are never shifted
        if buffer.line(id).len() <= 1 {
            continue;
        }
        match kind {
            ShiftKind::UnindentLeft => {
                let first = buffer.line(id).content()[0];
                if first == b' ' || first == b'\t' {
                    buffer.line_mut(id).splice(0, 1, b"")?;
                    modified += 1;
                    buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
                }
            }
            ShiftKind::ShiftLeft => {
                buffer.line_mut(id).splice(0, 1, b"")?;
                modified += 1;
                buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
            }
            ShiftKind::IndentRight => {
                buffer.line_mut(id).splice(0, 0, &prefix)?;
                modified += 1;
                buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
            }
            ShiftKind::ShiftRight => {
                let dup = buffer.line(id).content()[0];
                buffer.line_mut(id).splice(0, 0, &[dup])?;
                modified += 1;
                buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
            }
        }
    }
    if modified == 0 {
        state.tracemsg("nothing shifted");
    } else {
        let buffer = state.cur_mut()?;
        if buffer
            .line(buffer.curr)
            .flags
            .contains(LineFlags::SELECTED)
        {
            buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
        }
        buffer.flags.insert(BufferFlags::CHANGED);
    }
    Ok(true)
}

/// Drop one leading blank from every visible selection line.
pub fn unindent_left(state: &mut EditorState) -> CoreResult<bool> {
    shift_engine(state, ShiftKind::UnindentLeft)
}

/// Insert one indent step in front of every visible selection line.
pub fn indent_right(state: &mut EditorState) -> CoreResult<bool> {
    shift_engine(state, ShiftKind::IndentRight)
}

/// Drop the first character of every visible selection line.
pub fn shift_left(state: &mut EditorState) -> CoreResult<bool> {
    shift_engine(state, ShiftKind::ShiftLeft)
}

/// Duplicate the first character of every visible selection line.
pub fn shift_right(state: &mut EditorState) -> CoreResult<bool> {
    shift_engine(state, ShiftKind::ShiftRight)
}

fn parse_curpos(state: &EditorState, opt: &str) -> usize {
    if opt.is_empty() {
        state.cur().map(|b| b.curpos).unwrap_or(0)
    } else {
        opt.trim().parse().unwrap_or(0)
    }
}

/// Pad one line with spaces up to the visual column `padsize`.
/// Returns true when the line grew.
pub fn pad_line(
    buffer: &mut core_state::Buffer,
    id: LineId,
    padsize: usize,
    tabsize: usize,
) -> CoreResult<bool> {
    let content_len = buffer.line(id).content().len();
    let width = buffer.pos_at(id, content_len, tabsize);
    if padsize <= width {
        return Ok(false);
    }
    let fill = vec![b' '; padsize - width];
    buffer.line_mut(id).splice(content_len, 0, &fill)?;
    Ok(true)
}

/// Pad every visible selection line with spaces to the given visual
/// column (or the cursor column).
pub fn pad_block(state: &mut EditorState, opt_curpos: &str) -> CoreResult<bool> {
    let curpos = parse_curpos(state, opt_curpos);
    let run = visible_run(state);
    if run.is_empty() {
        state.tracemsg("selection not visible");
        return Ok(false);
    }
    let tabsize = state.opts.tabsize;
    let buffer = state.cur_mut()?;
    let mut modified = 0usize;
    for id in run {
        if pad_line(buffer, id, curpos, tabsize)? {
            buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
            buffer.flags.insert(BufferFlags::CHANGED);
            modified += 1;
        }
    }
    if modified == 0 {
        state.tracemsg("nothing changed");
    }
    Ok(true)
}

/// Cut every visible selection line at the given visual column,
/// keeping the left part. Lines are truncated, never removed.
pub fn cut_block(state: &mut EditorState, opt_curpos: &str) -> CoreResult<bool> {
    lcut_engine(state, opt_curpos, false)
}

/// Cut every visible selection line at the given visual column,
/// keeping the right part.
pub fn left_cut_block(state: &mut EditorState, opt_curpos: &str) -> CoreResult<bool> {
    lcut_engine(state, opt_curpos, true)
}

fn lcut_engine(state: &mut EditorState, opt_curpos: &str, left: bool) -> CoreResult<bool> {
    let curpos = parse_curpos(state, opt_curpos);
    let run = visible_run(state);
    if run.is_empty() {
        state.tracemsg("selection not visible");
        return Ok(false);
    }
    let tabsize = state.opts.tabsize;
    let buffer = state.cur_mut()?;
    let mut modified = 0usize;
    for id in run {
        let lncol = buffer.col_at(id, curpos, tabsize);
        let content_len = buffer.line(id).content().len();
        if left {
            if lncol > 0 {
                buffer.line_mut(id).splice(0, lncol, b"")?;
                buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
                buffer.flags.insert(BufferFlags::CHANGED);
                modified += 1;
            }
        } else if lncol < content_len {
            let len = buffer.line(id).len();
            buffer.line_mut(id).splice(lncol, len, b"\n")?;
            buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
            buffer.flags.insert(BufferFlags::CHANGED);
            modified += 1;
        }
    }
    if modified == 0 {
        state.tracemsg("nothing changed");
    }
    Ok(true)
}

/// Split every visible selection line at the given visual column: the
/// right parts move to fresh lines appended after the selection, in
/// order.
pub fn split_block(state: &mut EditorState, opt_curpos: &str) -> CoreResult<bool> {
    let curpos = parse_curpos(state, opt_curpos);
    let run = visible_run(state);
    if run.is_empty() {
        state.tracemsg("selection not visible");
        return Ok(false);
    }
    let tabsize = state.opts.tabsize;
    let buffer = state.cur_mut()?;
    // insertion point: the first visible line after the run
    let (after, _) = buffer.next_visible(*run.last().expect("run not empty"));
    let mut modified = 0usize;
    for id in run {
        let lncol = buffer.col_at(id, curpos, tabsize);
        let content_len = buffer.line(id).content().len();
        let tail: Vec<u8> = if lncol < content_len {
            buffer.line(id).content()[lncol..].to_vec()
        } else {
            Vec::new()
        };
        // inserting each tail right before `after` keeps block order
        let new = buffer.lines.insert_before(after, &tail)?;
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED);
        buffer.num_lines += 1;
        modified += 1;
        if !tail.is_empty() {
            let len = buffer.line(id).len();
            buffer.line_mut(id).splice(lncol, len, b"\n")?;
            buffer.line_mut(id).flags.insert(LineFlags::CHANGED);
        }
    }
    if modified > 0 {
        buffer.flags.insert(BufferFlags::CHANGED);
    } else {
        state.tracemsg("nothing changed");
    }
    debug!(target: "edit", modified, "block_split");
    Ok(true)
}

/// Join the two halves of the selection one-to-one around a separator
/// line (given as a regex, default an empty line): each line above
/// the separator gets the matching line below appended; surplus lower
/// lines are padded to the upper block's width and kept.
pub fn join_block(state: &mut EditorState, separator: &str) -> CoreResult<bool> {
    if state.select_ri != Some(state.ring.current_index()) {
        return Ok(false);
    }
    let pattern = if separator.is_empty() {
        "^$".to_string()
    } else if separator.starts_with('^') {
        separator.to_string()
    } else {
        format!("^{separator}")
    };
    let re = match core_search::compile_translated(
        &core_search::expand_shorthands(&pattern),
        state.opts.case_sensitive,
    ) {
        Ok(re) => re,
        Err(e) => {
            state.tracemsg(e.to_string());
            return Err(e);
        }
    };
    let run = visible_run(state);
    if run.is_empty() {
        state.tracemsg("selection not visible");
        return Ok(false);
    }
    let tabsize = state.opts.tabsize;

    // split the run at the separator; measure the upper block width
    let (upper, sep_index, padsize) = {
        let buffer = state.cur()?;
        let mut padsize = 0usize;
        let mut sep = None;
        for (i, id) in run.iter().enumerate() {
            let content = buffer.line(*id).content();
            if re
                .find(content)
                .is_some_and(|m| m.start() < m.end() || m.end() == 0)
            {
                sep = Some(i);
                break;
            }
            let width = buffer.pos_at(*id, content.len(), tabsize);
            padsize = padsize.max(width);
        }
        let Some(sep) = sep else {
            state.tracemsg("separator line not found");
            return Ok(false);
        };
        (run[..sep].to_vec(), sep, padsize)
    };
    let lower: Vec<LineId> = run[sep_index + 1..].to_vec();
    let sep_id = run[sep_index];

    // bookmarks on consumed lower lines die with them
    let target_ri = state.ring.current_index();
    for id in &lower {
        state.clear_line_bookmark(target_ri, *id);
    }

    let buffer = state.cur_mut()?;
    // the cursor must not sit on a line the join consumes
    if lower.contains(&buffer.curr) {
        buffer.curr = sep_id;
        let mut lineno = 0;
        for (no, id) in buffer.lines.iter_text().enumerate() {
            if id == sep_id {
                lineno = no + 1;
                break;
            }
        }
        buffer.lineno = lineno;
        buffer.lncol = buffer.col_at(sep_id, buffer.curpos, tabsize);
    }
    let mut modified = 0usize;
    let mut lower_iter = lower.into_iter();
    for up in &upper {
        let Some(down) = lower_iter.next() else {
            break;
        };
        let tail = buffer.line(down).bytes().to_vec();
        let nonempty = buffer.line(down).len() > 1;
        let at = buffer.line(*up).len() - 1;
        buffer.line_mut(*up).splice(at, 1, &tail)?;
        if nonempty {
            buffer.line_mut(*up).flags.insert(LineFlags::CHANGED);
        }
        buffer.lines.remove(down);
        buffer.num_lines -= 1;
        buffer.flags.insert(BufferFlags::CHANGED);
        modified += 1;
    }
    // surplus lower lines: fresh padded lines inserted before the
    // separator, keeping block order
    for down in lower_iter {
        let new = buffer.lines.insert_before(sep_id, b"")?;
        pad_line(buffer, new, padsize, tabsize)?;
        let tail = buffer.line(down).bytes().to_vec();
        let at = buffer.line(new).len() - 1;
        buffer.line_mut(new).splice(at, 1, &tail)?;
        buffer
            .line_mut(new)
            .flags
            .insert(LineFlags::CHANGED | LineFlags::SELECTED);
        buffer.lines.remove(down);
        // one removed, one inserted: num_lines is unchanged
        buffer.flags.insert(BufferFlags::CHANGED);
        modified += 1;
    }
    if modified == 0 {
        state.tracemsg("nothing changed");
    }
    // the cursor may now be past the shrunken buffer
    let buffer = state.cur_mut()?;
    if buffer.lineno > buffer.num_lines + 1 {
        buffer.lineno = buffer.num_lines + 1;
        buffer.curr = buffer.lines.bottom();
    }
    state.recover_selection();
    debug!(target: "edit", modified, "block_join");
    Ok(true)
}
