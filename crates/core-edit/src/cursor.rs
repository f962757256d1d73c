//! Cursor movement cooperative with tab expansion.
//!
//! The visual column (`curpos`) is sticky across vertical moves; the
//! byte column is recomputed on every landing line. Horizontal moves
//! step over a TAB to the next or previous tab stop boundary.

use core_state::EditorState;

pub fn go_left(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    if buffer.lncol > 0 {
        buffer.lncol -= 1;
        buffer.update_curpos(tabsize, text_cols);
    }
}

pub fn go_right(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    if buffer.lncol < buffer.current_line().content().len() {
        buffer.lncol += 1;
        buffer.update_curpos(tabsize, text_cols);
    }
}

pub fn go_up(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    let (prev, cnt) = buffer.prev_visible(buffer.curr);
    if buffer.lines.is_text(prev) {
        buffer.curr = prev;
        buffer.lineno = buffer.lineno.saturating_sub(cnt);
        buffer.lncol = buffer.col_at(prev, buffer.curpos, tabsize);
        buffer.focus_decr();
    }
}

pub fn go_down(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    let (next, cnt) = buffer.next_visible(buffer.curr);
    if buffer.lines.is_text(next) {
        buffer.curr = next;
        buffer.lineno += cnt;
        buffer.lncol = buffer.col_at(next, buffer.curpos, tabsize);
        buffer.focus_incr(text_rows);
    }
}

pub fn go_home(state: &mut EditorState) {
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    buffer.lncol = 0;
    buffer.curpos = 0;
    buffer.lnoff = 0;
}

pub fn go_end(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    buffer.lncol = buffer.current_line().content().len();
    buffer.update_curpos(tabsize, text_cols);
}

/// Park the cursor on the TOP sentinel (line number zero).
pub fn go_top(state: &mut EditorState) {
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    buffer.curr = buffer.lines.top();
    buffer.lineno = 0;
    buffer.lncol = 0;
    buffer.curpos = 0;
    buffer.lnoff = 0;
    buffer.focus = 0;
}

/// Park the cursor on the BOTTOM sentinel.
pub fn go_bottom(state: &mut EditorState) {
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    buffer.curr = buffer.lines.bottom();
    buffer.lineno = buffer.num_lines + 1;
    buffer.lncol = 0;
    buffer.curpos = 0;
    buffer.focus_center(text_rows);
}

/// Jump to an absolute line number, clamping into range.
pub fn goto_line(state: &mut EditorState, lineno: usize) {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    let lineno = lineno.min(buffer.num_lines + 1);
    if let Some(id) = buffer.goto_lineno(lineno) {
        buffer.set_position(lineno, id, tabsize);
        buffer.focus_avoid_border(text_rows);
    }
}
