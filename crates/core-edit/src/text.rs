//! Character and line edit primitives.
//!
//! Everything here funnels through the line splice primitive; each
//! mutation sets the line's CHANGED bit and the buffer's CHANGED
//! flag. Structural edits (delete, join) respect the filter: a hidden
//! neighbour blocks the join rather than silently editing what the
//! user cannot see.

use crate::cursor;
use core_state::{BufferFlags, CoreResult, EditorState, LineFlags};

/// Insert bytes (no newline) at the cursor.
pub fn insert_chars(state: &mut EditorState, input: &[u8]) -> CoreResult<()> {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    {
        let buffer = state.cur()?;
        if !buffer.lines.is_text(buffer.curr) || input.is_empty() {
            return Ok(());
        }
        if buffer.lncol > buffer.current_line().content().len() {
            cursor::go_end(state);
        }
    }
    let buffer = state.cur_mut()?;
    let curr = buffer.curr;
    let lncol = buffer.lncol;
    buffer.line_mut(curr).splice(lncol, 0, input)?;
    buffer.lncol += input.len();
    buffer.mark_changed(curr);
    buffer.update_curpos(tabsize, text_cols);
    Ok(())
}

/// Delete the byte under the cursor; at end of line this joins the
/// next visible line, and on an empty line it deletes the line.
pub fn delete_char(state: &mut EditorState) -> CoreResult<()> {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    {
        let buffer = state.cur()?;
        if buffer.flags.contains(BufferFlags::NO_EDIT) || !buffer.lines.is_text(buffer.curr) {
            return Ok(());
        }
        if buffer.lncol >= buffer.current_line().content().len() {
            return if buffer.lncol == 0 {
                delete_line(state)
            } else {
                join_line(state)
            };
        }
    }
    let buffer = state.cur_mut()?;
    let curr = buffer.curr;
    let lncol = buffer.lncol;
    let deleted = buffer.line(curr).content()[lncol];
    buffer.line_mut(curr).splice(lncol, 1, b"")?;
    buffer.mark_changed(curr);
    if deleted == b'\t' {
        buffer.update_curpos(tabsize, text_cols);
    }
    Ok(())
}

/// Go left and delete; at column zero this joins onto the previous
/// visible line instead.
pub fn delback_char(state: &mut EditorState) -> CoreResult<()> {
    {
        let buffer = state.cur()?;
        if buffer.flags.contains(BufferFlags::NO_EDIT) || !buffer.lines.is_text(buffer.curr) {
            return Ok(());
        }
    }
    let at_bol = state.cur()?.lncol == 0;
    if !at_bol {
        cursor::go_left(state);
        let buffer = state.cur()?;
        if buffer.lncol < buffer.current_line().content().len() {
            return delete_char(state);
        }
        return Ok(());
    }
    let blocked = {
        let buffer = state.cur()?;
        match buffer.lines.prev(buffer.curr) {
            Some(prev) if buffer.lines.line(prev).is_top() => return Ok(()),
            Some(prev) => buffer.is_hidden(prev),
            None => return Ok(()),
        }
    };
    if blocked {
        state.tracemsg("the previous line is not in-view");
        return Ok(());
    }
    cursor::go_up(state);
    cursor::go_end(state);
    delete_char(state)
}

/// Delete from the cursor to the end of line; at end of line this
/// joins like [`delete_char`].
pub fn deleol(state: &mut EditorState) -> CoreResult<()> {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    {
        let buffer = state.cur()?;
        if buffer.flags.contains(BufferFlags::CMDLINE) || !buffer.lines.is_text(buffer.curr) {
            return Ok(());
        }
        if buffer.lncol >= buffer.current_line().content().len() {
            return if buffer.lncol == 0 {
                delete_line(state)
            } else {
                join_line(state)
            };
        }
    }
    let buffer = state.cur_mut()?;
    let curr = buffer.curr;
    let lncol = buffer.lncol;
    let deleted = buffer.line(curr).content()[lncol];
    let len = buffer.line(curr).len();
    buffer.line_mut(curr).splice(lncol, len, b"\n")?;
    buffer.mark_changed(curr);
    if deleted == b'\t' {
        buffer.update_curpos(tabsize, text_cols);
    }
    Ok(())
}

/// Delete from the cursor back to the beginning of the line.
pub fn del2bol(state: &mut EditorState) -> CoreResult<()> {
    let buffer = state.cur_mut()?;
    if buffer.flags.contains(BufferFlags::CMDLINE) || !buffer.lines.is_text(buffer.curr) {
        return Ok(());
    }
    let content_len = buffer.current_line().content().len();
    let lncol = buffer.lncol.min(content_len);
    if lncol > 0 {
        let curr = buffer.curr;
        buffer.line_mut(curr).splice(0, lncol, b"")?;
        buffer.mark_changed(curr);
    }
    buffer.lncol = 0;
    buffer.curpos = 0;
    buffer.lnoff = 0;
    Ok(())
}

/// Delete the focus line and land on the next visible line.
pub fn delete_line(state: &mut EditorState) -> CoreResult<()> {
    let tabsize = state.opts.tabsize;
    {
        let buffer = state.cur()?;
        if buffer
            .flags
            .intersects(BufferFlags::CMDLINE | BufferFlags::NO_DEL_LINE)
            || !buffer.lines.is_text(buffer.curr)
        {
            return Ok(());
        }
    }
    let ri = state.ring.current_index();
    let curr = state.cur()?.curr;
    state.clear_line_bookmark(ri, curr);
    let buffer = state.cur_mut()?;
    let (next, cnt) = buffer.next_visible(curr);
    buffer.lines.remove(curr);
    buffer.num_lines -= 1;
    buffer.flags.insert(BufferFlags::CHANGED);
    buffer.curr = next;
    buffer.lineno += cnt - 1;
    buffer.lncol = buffer.col_at(next, buffer.curpos, tabsize);
    Ok(())
}

/// Duplicate the focus line and move onto the copy.
pub fn duplicate(state: &mut EditorState) -> CoreResult<()> {
    let text_rows = state.text_rows;
    let buffer = state.cur_mut()?;
    if !buffer.lines.is_text(buffer.curr) {
        return Ok(());
    }
    let bytes = buffer.current_line().content().to_vec();
    let flags = buffer.current_line().flags;
    let curr = buffer.curr;
    let new = buffer.lines.append(curr, &bytes)?;
    {
        let line = buffer.line_mut(new);
        line.flags = flags;
        line.set_bookmark(0);
        line.flags.insert(LineFlags::CHANGED);
    }
    buffer.curr = new;
    buffer.lineno += 1;
    buffer.num_lines += 1;
    buffer.flags.insert(BufferFlags::CHANGED);
    buffer.focus_incr(text_rows);
    Ok(())
}

/// Split the current line at the cursor. With smart indent on, the
/// new line inherits the original's leading blanks.
pub fn split_line(state: &mut EditorState) -> CoreResult<()> {
    let smart = state.opts.smart_indent;
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let text_rows = state.text_rows;
    let buffer = state.cur_mut()?;
    let mut blanks = 0usize;

    if buffer.current_line().is_bottom() {
        let bottom = buffer.lines.bottom();
        let new = buffer.lines.insert_before(bottom, b"")?;
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED);
        buffer.curr = new;
        // lineno already equals num_lines + 1, which is the new line
    } else if buffer.current_line().is_top() {
        let top = buffer.lines.top();
        let new = buffer.lines.append(top, b"")?;
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED);
        buffer.curr = new;
        buffer.lineno += 1;
        buffer.focus_incr(text_rows);
    } else if buffer.lncol >= buffer.current_line().content().len() {
        // cursor at or past the end: open a fresh line below
        if smart {
            blanks = prefix_blanks(buffer.current_line().content());
        }
        let curr = buffer.curr;
        let keep = buffer.current_line().flags & LineFlags::SELECTED;
        let prefix = buffer.line(curr).content()[..blanks].to_vec();
        let new = buffer.lines.append(curr, &prefix)?;
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED | keep);
        buffer.curr = new;
        buffer.lineno += 1;
        buffer.focus_incr(text_rows);
    } else if buffer.lncol == 0 {
        // push an empty line above, cursor stays on its text
        let curr = buffer.curr;
        let keep = buffer.current_line().flags & LineFlags::SELECTED;
        let new = buffer.lines.insert_before(curr, b"")?;
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED | keep);
        buffer.lineno += 1;
        buffer.focus_incr(text_rows);
    } else {
        // real split
        if smart {
            blanks = prefix_blanks(buffer.current_line().content());
        }
        let curr = buffer.curr;
        let lncol = buffer.lncol;
        let keep = buffer.current_line().flags & (LineFlags::COLOR_TAG | LineFlags::SELECTED);
        let mut rest = buffer.line(curr).content()[..blanks].to_vec();
        rest.extend_from_slice(&buffer.line(curr).content()[lncol..]);
        let new = buffer.lines.append(curr, &rest)?;
        let len = buffer.line(curr).len();
        buffer.line_mut(curr).splice(lncol, len, b"\n")?;
        buffer.line_mut(curr).flags.insert(LineFlags::CHANGED);
        buffer.line_mut(new).flags.insert(LineFlags::CHANGED | keep);
        buffer.curr = new;
        buffer.lineno += 1;
        buffer.focus_incr(text_rows);
    }

    buffer.lncol = blanks;
    buffer.update_curpos(tabsize, text_cols);
    buffer.num_lines += 1;
    buffer.flags.insert(BufferFlags::CHANGED);
    Ok(())
}

/// Join the current line with the next visible text line.
pub fn join_line(state: &mut EditorState) -> CoreResult<()> {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let (next, next_empty) = {
        let buffer = state.cur()?;
        if !buffer.lines.is_text(buffer.curr) {
            return Ok(());
        }
        let Some(next) = buffer.lines.next(buffer.curr) else {
            return Ok(());
        };
        if !buffer.lines.is_text(next) {
            return Ok(());
        }
        if buffer.is_hidden(next) {
            state.tracemsg("the next line is not in-view");
            return Ok(());
        }
        (next, buffer.line(next).len() <= 1)
    };
    if state.cur()?.lncol > state.cur()?.current_line().content().len() {
        cursor::go_end(state);
    }
    let ri = state.ring.current_index();
    state.clear_line_bookmark(ri, next);
    let buffer = state.cur_mut()?;
    let curr = buffer.curr;
    let tail = buffer.line(next).bytes().to_vec();
    let at = buffer.line(curr).len() - 1;
    buffer.line_mut(curr).splice(at, 1, &tail)?;
    buffer.lines.remove(next);
    buffer.num_lines -= 1;
    buffer.flags.insert(BufferFlags::CHANGED);
    if !next_empty {
        buffer.line_mut(curr).flags.insert(LineFlags::CHANGED);
    }
    buffer.update_curpos(tabsize, text_cols);
    Ok(())
}

/// Insert multi-line stream data at the cursor; smart indent is
/// suspended for the whole insertion.
pub fn type_text(state: &mut EditorState, text: &[u8]) -> CoreResult<()> {
    if text.is_empty() {
        return Ok(());
    }
    if state.cur()?.flags.contains(BufferFlags::NO_EDIT) {
        return Ok(());
    }
    let smart = state.opts.smart_indent;
    state.opts.smart_indent = false;
    let mut result = Ok(());
    for (i, segment) in text.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            result = split_line(state);
            if result.is_err() {
                break;
            }
        }
        if !segment.is_empty() {
            result = insert_chars(state, segment);
            if result.is_err() {
                break;
            }
        }
    }
    state.opts.smart_indent = smart;
    result
}

/// Count the leading blanks of a line; all-blank lines count zero.
pub fn prefix_blanks(content: &[u8]) -> usize {
    let blanks = content
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    if blanks == content.len() { 0 } else { blanks }
}
