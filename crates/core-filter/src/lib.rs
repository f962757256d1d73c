//! The hierarchical filter engine.
//!
//! Every buffer carries seven independent show/hide levels. Level L
//! owns one bit (`0x80 << L`) that appears twice: as the hide bit on
//! each line and as the filter-active bit on the buffer. A line is
//! hidden iff both are set, so `filter_tmp_all` can reveal everything
//! by flipping a single buffer bit without losing per-line state.

use core_state::{BufferFlags, EditorState, LineFlags, LineId};
use tracing::debug;

mod fold;
mod tomatch;

pub use fold::{FoldClass, classify_c_line};
pub use tomatch::tomatch;

/// What a filter operation does to matching lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// Reset visibility so matching lines and only those show.
    All,
    /// Additionally unhide matching lines.
    More,
    /// Hide matching lines.
    Less,
}

/// `filter_all(expr)` — matching lines and only those stay visible.
pub fn filter_all(state: &mut EditorState, expr: &str) -> bool {
    filter_base(state, FilterAction::All, expr)
}

/// `filter_more(expr)` — unhide the matching lines.
pub fn filter_more(state: &mut EditorState, expr: &str) -> bool {
    filter_base(state, FilterAction::More, expr)
}

/// `filter_less(expr)` — hide the matching lines.
pub fn filter_less(state: &mut EditorState, expr: &str) -> bool {
    filter_base(state, FilterAction::Less, expr)
}

fn apply(line_flags: &mut LineFlags, action: FilterAction, matched: bool, fmask: u32) {
    let hide = LineFlags::from_bits_retain(fmask);
    if matched {
        match action {
            FilterAction::All | FilterAction::More => line_flags.remove(hide),
            FilterAction::Less => line_flags.insert(hide),
        }
    } else if action == FilterAction::All {
        line_flags.insert(hide);
    }
}

/// The filter engine shared by `all`, `more` and `less`.
///
/// The predicate vocabulary: an empty argument makes `all` show
/// everything and `less` hide everything (`more` is a no-op); the
/// words `alter` and `selection` (or any prefix) pick changed and
/// selected lines; `function` invokes the language-aware fold
/// recogniser; `:N` picks the single line N; anything else is an
/// extended regex.
pub fn filter_base(state: &mut EditorState, action: FilterAction, expr: &str) -> bool {
    let case = state.opts.case_sensitive;
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    let fmask = buffer.fmask();
    buffer
        .flags
        .insert(BufferFlags::from_bits_retain(fmask));

    let mut ok = true;
    if expr.is_empty() {
        match action {
            FilterAction::All => for_each_text(buffer, |flags| flags.unhide(fmask)),
            FilterAction::Less => for_each_text(buffer, |flags| flags.hide(fmask)),
            FilterAction::More => {}
        }
    } else if "alter".starts_with(expr) {
        let ids: Vec<LineId> = buffer.lines.iter_text().collect();
        for id in ids {
            let matched = buffer
                .line(id)
                .flags
                .intersects(LineFlags::ALTERED | LineFlags::CHANGED);
            apply(&mut buffer.line_mut(id).flags, action, matched, fmask);
        }
    } else if "selection".starts_with(expr) {
        let ids: Vec<LineId> = buffer.lines.iter_text().collect();
        for id in ids {
            let matched = buffer.line(id).flags.contains(LineFlags::SELECTED);
            apply(&mut buffer.line_mut(id).flags, action, matched, fmask);
        }
    } else if "function".starts_with(expr) {
        ok = fold::filter_function(buffer, action, fmask);
    } else if let Some(no) = expr.strip_prefix(':') {
        ok = false;
        if let Ok(lineno) = no.trim().parse::<usize>()
            && lineno >= 1
            && lineno <= buffer.num_lines
            && let Some(id) = buffer.goto_lineno(lineno)
            && buffer.lines.is_text(id)
        {
            buffer.curr = id;
            buffer.lineno = lineno;
            apply(&mut buffer.line_mut(id).flags, action, true, fmask);
            ok = true;
        }
    } else {
        match core_search::compile(expr, case) {
            Ok(re) => {
                let ids: Vec<LineId> = buffer.lines.iter_text().collect();
                for id in ids {
                    let matched = re
                        .find(buffer.line(id).content())
                        .is_some_and(|m| m.start() < m.end() || m.end() == 0);
                    apply(&mut buffer.line_mut(id).flags, action, matched, fmask);
                }
            }
            Err(e) => {
                let msg = e.to_string();
                state.tracemsg(msg);
                return false;
            }
        }
    }

    let buffer = state.cur_mut().expect("buffer still open");
    buffer.pull_cursor_to_visible(tabsize);
    buffer.focus_avoid_border(text_rows);
    buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
    debug!(target: "filter", ?action, expr, "filter_applied");
    ok
}

fn for_each_text(buffer: &mut core_state::Buffer, mut f: impl FnMut(&mut core_line::Line)) {
    let ids: Vec<LineId> = buffer.lines.iter_text().collect();
    for id in ids {
        f(buffer.line_mut(id));
    }
}

/// Toggle between the filtered view and the full view by flipping the
/// buffer's filter-active bit; per-line hide bits stay untouched.
pub fn filter_tmp_all(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    let fmask = BufferFlags::from_bits_retain(buffer.fmask());
    if buffer.lmask() != 0 {
        buffer.flags.remove(fmask);
    } else {
        buffer.flags.insert(fmask);
        if buffer.is_hidden(buffer.curr) {
            let (next, cnt) = buffer.next_visible(buffer.curr);
            buffer.curr = next;
            buffer.lineno += cnt;
            buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
        }
        buffer.focus_avoid_border(text_rows);
    }
    true
}

/// Unhide the hidden neighbour above and step onto it.
pub fn filter_expand_up(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if buffer.current_line().is_top() {
        return true;
    }
    let Some(prev) = buffer.lines.prev(buffer.curr) else {
        return true;
    };
    if buffer.lines.is_text(prev) {
        if buffer.is_hidden(prev) {
            let mask = buffer.lmask();
            buffer.line_mut(prev).unhide(mask);
        }
        buffer.curr = prev;
        buffer.lineno -= 1;
        buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
        buffer.focus_decr();
    }
    true
}

/// Unhide the hidden neighbour below and step onto it.
pub fn filter_expand_down(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if buffer.current_line().is_bottom() {
        return true;
    }
    let Some(next) = buffer.lines.next(buffer.curr) else {
        return true;
    };
    if buffer.lines.is_text(next) {
        if buffer.is_hidden(next) {
            let mask = buffer.lmask();
            buffer.line_mut(next).unhide(mask);
        }
        buffer.curr = next;
        buffer.lineno += 1;
        buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
        buffer.focus_incr(text_rows);
    }
    true
}

/// Hide the focus line and move to the next visible one.
pub fn filter_restrict(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if !buffer.lines.is_text(buffer.curr) {
        return true;
    }
    let mask = buffer.lmask();
    let curr = buffer.curr;
    buffer.line_mut(curr).hide(mask);
    let (next, cnt) = buffer.next_visible(curr);
    buffer.curr = next;
    buffer.lineno += cnt;
    buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
    if buffer.focus < text_rows / 2 {
        buffer.focus_incr(text_rows);
    }
    true
}

fn switch_level(state: &mut EditorState, up: bool, copy_bits: bool) -> bool {
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    let from = buffer.flevel;
    let to = if up { from + 1 } else { from.wrapping_sub(1) };
    if !(1..=7).contains(&to) {
        return false;
    }
    buffer.flevel = to;
    if copy_bits {
        let mask_from = core_line::hide_bit(from);
        let mask_to = core_line::hide_bit(to);
        // copy the buffer's filter-active bit
        let active = buffer.flags.bits() & mask_from != 0;
        buffer
            .flags
            .set(BufferFlags::from_bits_retain(mask_to), active);
        let ids: Vec<LineId> = buffer.lines.iter_text().collect();
        for id in ids {
            let hidden = buffer.line(id).hide_bits() & mask_from != 0;
            let line = buffer.line_mut(id);
            if hidden {
                line.hide(mask_to);
            } else {
                line.unhide(mask_to);
            }
        }
    } else if buffer.is_hidden(buffer.curr) {
        let (next, cnt) = buffer.next_visible(buffer.curr);
        buffer.curr = next;
        buffer.lineno += cnt;
        buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
    }
    buffer.focus_avoid_border(text_rows);
    debug!(target: "filter", from, to, copy_bits, "filter_level_switch");
    true
}

/// Move to the next filter level.
pub fn incr_filter_level(state: &mut EditorState) -> bool {
    switch_level(state, true, false)
}

/// Move to the next filter level and copy this level's bits there.
pub fn incr2_filter_level(state: &mut EditorState) -> bool {
    let ok = switch_level(state, true, true);
    if ok {
        state.tracemsg("filter level increased, filter bits copied");
    }
    ok
}

/// Move to the previous filter level.
pub fn decr_filter_level(state: &mut EditorState) -> bool {
    switch_level(state, false, false)
}

/// Move to the previous filter level and copy this level's bits there.
pub fn decr2_filter_level(state: &mut EditorState) -> bool {
    let ok = switch_level(state, false, true);
    if ok {
        state.tracemsg("filter level decreased, filter bits copied");
    }
    ok
}
