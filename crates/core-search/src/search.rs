//! Forward search with anchor-aware stepping.

use crate::pattern;
use core_state::{Buffer, BufferFlags, EditorState, LineId};
use tracing::debug;

/// One regex probe against a line's content starting at `from`.
///
/// A non-empty match is always accepted. A zero-width match is only
/// meaningful for anchored patterns and only at the beginning or the
/// end of the line; anything else is treated as a miss so the scan
/// moves on to the next line.
pub(crate) fn probe_line(
    re: &regex::bytes::Regex,
    content: &[u8],
    from: usize,
    anchored: bool,
) -> Option<(usize, usize)> {
    if from > content.len() {
        return None;
    }
    let m = re.find_at(content, from)?;
    if m.start() == m.end() {
        if anchored && (m.start() == 0 || m.start() == content.len()) {
            return Some((m.start(), m.end()));
        }
        return None;
    }
    Some((m.start(), m.end()))
}

/// Scan forward from `(start, from_col)` over visible lines for the
/// buffer's compiled pattern. Returns the hit line, its line number
/// and the match span.
fn scan(
    buffer: &Buffer,
    start: LineId,
    start_lineno: usize,
    from_col: usize,
) -> Option<(LineId, usize, (usize, usize))> {
    let re = buffer.search.regex.as_ref()?;
    let anchored = buffer.flags.contains(BufferFlags::SEARCH_ANCHORED);
    let mut id = start;
    let mut lineno = start_lineno;
    let mut col = from_col;
    while !buffer.line(id).is_bottom() {
        if buffer.lines.is_text(id)
            && let Some(span) = probe_line(re, buffer.line(id).content(), col, anchored)
        {
            return Some((id, lineno, span));
        }
        let (next, cnt) = buffer.next_visible(id);
        id = next;
        lineno += cnt;
        col = 0;
    }
    None
}

/// Start a forward search: compile, set the search flags and advance
/// to the first match. An immediate miss resets the search again.
pub fn search(state: &mut EditorState, expr: &str) -> bool {
    reset_search(state);
    if expr.is_empty() {
        return false;
    }
    let translated = pattern::expand_shorthands(pattern::cut_delimiters(expr));
    if translated.is_empty() {
        return false;
    }
    let case = state.opts.case_sensitive;
    match pattern::compile_translated(&translated, case) {
        Err(e) => {
            state.tracemsg(e.to_string());
            false
        }
        Ok(re) => {
            let Ok(buffer) = state.cur_mut() else {
                return false;
            };
            buffer.search.regex = Some(re);
            buffer.flags.insert(BufferFlags::SEARCH_ACTIVE);
            buffer
                .flags
                .set(BufferFlags::SEARCH_ANCHORED, pattern::is_anchored(&translated));
            let found = repeat_search_inner(state, true);
            if found {
                if let Ok(buffer) = state.cur_mut() {
                    buffer.search.expr = expr.to_string();
                }
            } else {
                reset_search(state);
            }
            found
        }
    }
}

/// Drop the compiled search state and the search/replace flags.
pub fn reset_search(state: &mut EditorState) {
    state.change = None;
    let Ok(buffer) = state.cur_mut() else {
        return;
    };
    if buffer
        .flags
        .intersects(BufferFlags::SEARCH_ACTIVE | BufferFlags::REPLACE_ACTIVE)
    {
        buffer.search.regex = None;
    }
    buffer.flags.remove(
        BufferFlags::SEARCH_ACTIVE | BufferFlags::REPLACE_ACTIVE | BufferFlags::SEARCH_ANCHORED,
    );
}

/// Search the next occurrence; restores the position and resets the
/// search when nothing further matches.
pub fn repeat_search(state: &mut EditorState) -> bool {
    repeat_search_inner(state, false)
}

fn repeat_search_inner(state: &mut EditorState, initial: bool) -> bool {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if !buffer.flags.contains(BufferFlags::SEARCH_ACTIVE) {
        return false;
    }
    let restore = (buffer.curr, buffer.lineno, buffer.lncol, buffer.focus);

    if buffer.line(buffer.curr).is_top() {
        if let Some(next) = buffer.lines.next(buffer.curr) {
            buffer.curr = next;
            buffer.lineno += 1;
        }
    }
    // between repeats an anchored pattern must step off its own
    // zero-width match
    if !initial && buffer.flags.contains(BufferFlags::SEARCH_ANCHORED) {
        buffer.lncol += 1;
    }

    if let Some((id, lineno, span)) = scan(buffer, buffer.curr, buffer.lineno, buffer.lncol) {
        buffer.curr = id;
        buffer.lineno = lineno;
        buffer.lncol = span.1;
        buffer.focus_avoid_border(text_rows);
        buffer.update_curpos(tabsize, text_cols);
        buffer.flags.remove(BufferFlags::CMDLINE);
        debug!(target: "search", lineno, col = span.0, "match");
        return true;
    }

    // initial call only: a prefix scan from the first screen line
    // distinguishes "matches are above" from a plain miss
    let mut found_earlier = false;
    if initial && buffer.focus > 0 && !buffer.line(buffer.curr).is_top() {
        let mut first = buffer.curr;
        let mut first_no = buffer.lineno;
        for _ in 0..buffer.focus {
            let (prev, cnt) = buffer.prev_visible(first);
            if !buffer.lines.is_text(prev) {
                break;
            }
            first = prev;
            first_no = first_no.saturating_sub(cnt);
        }
        found_earlier = scan(buffer, first, first_no, 0).is_some();
    }

    let (curr, lineno, lncol, focus) = restore;
    buffer.curr = curr;
    buffer.lineno = lineno;
    buffer.lncol = lncol;
    buffer.focus = focus;
    buffer.update_curpos(tabsize, text_cols);

    if found_earlier {
        buffer.flags.remove(BufferFlags::CMDLINE);
        true
    } else {
        state.tracemsg("search: no match");
        reset_search(state);
        false
    }
}
