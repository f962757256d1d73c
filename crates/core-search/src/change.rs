//! The interactive change (search & replace) driver.

use crate::pattern;
use crate::search::{probe_line, reset_search};
use core_state::{
    Buffer, BufferFlags, ChangeSession, CoreResult, EditorState, LineFlags,
};
use tracing::debug;

/// Prompt shown while a change session waits for an answer.
pub const REPLACE_PROMPT: &str = "replace? y=yes n=no r=rest q=quit";

/// Keys understood by the replace prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKey {
    /// Apply the pending replacement and continue.
    Yes,
    /// Skip the pending match.
    No,
    /// Apply everything remaining without asking.
    Rest,
    /// Abort the session.
    Quit,
}

impl ChangeKey {
    /// Map a prompt keystroke; `Esc` quits like `q`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'y' | 'Y' => Some(Self::Yes),
            'n' | 'N' => Some(Self::No),
            'r' | 'R' => Some(Self::Rest),
            'q' | 'Q' | '\x1b' => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Outcome of one change-driver step.
#[derive(Debug, PartialEq, Eq)]
pub enum ChangeStatus {
    /// A match is pending; the prompt is showing.
    Pending,
    /// Session over; the count is the number of replacements made.
    Done(usize),
    /// The initial search matched nothing.
    NoMatch,
    /// The argument could not be parsed.
    BadArgument,
}

/// Parse `"/from/to/[g]"` (delimiters `/ ' " !`) into the search
/// expression, the replacement expression, and the global flag.
fn parse_change_args(argz: &str) -> Option<(&str, &str, bool)> {
    let bytes = argz.as_bytes();
    let d = *bytes.first()?;
    if !matches!(d, b'/' | b'\'' | b'"' | b'!') {
        return None;
    }
    let rest = &argz[1..];
    let mid = rest.find(d as char)?;
    let from = &rest[..mid];
    let tail = &rest[mid + 1..];
    let end = tail.find(d as char)?;
    let to = &tail[..end];
    let global = tail[end + 1..].starts_with('g');
    Some((from, to, global))
}

/// Start a change session: `change("/from/to/[g]")`.
///
/// Without the `g` flag the session stops at the first match and
/// waits for [`repeat_change`] calls carrying prompt keys. With `g`
/// the whole buffer is processed quietly and the cursor restored.
pub fn change(state: &mut EditorState, argz: &str) -> CoreResult<ChangeStatus> {
    reset_search(state);
    if argz.is_empty() {
        return Ok(ChangeStatus::Done(0));
    }
    let Some((from, to, global)) = parse_change_args(argz) else {
        state.tracemsg("failure: missing pattern delimiters");
        return Ok(ChangeStatus::BadArgument);
    };
    if from.is_empty() {
        return Ok(ChangeStatus::Done(0));
    }
    let translated = pattern::expand_shorthands(from);
    let replace_translated = pattern::expand_shorthands(to);
    let re = match pattern::compile_translated(&translated, state.opts.case_sensitive) {
        Ok(re) => re,
        Err(e) => {
            state.tracemsg(e.to_string());
            return Err(e);
        }
    };

    let saved = {
        let buffer = state.cur_mut()?;
        buffer.search.regex = Some(re);
        buffer
            .flags
            .insert(BufferFlags::SEARCH_ACTIVE | BufferFlags::REPLACE_ACTIVE);
        buffer
            .flags
            .set(BufferFlags::SEARCH_ANCHORED, pattern::is_anchored(&translated));
        buffer.search.expr = from.to_string();
        buffer.search.replace_expr = replace_translated;
        (buffer.curr, buffer.lineno, buffer.focus, buffer.lncol)
    };

    let status = start_session(state)?;
    if status != ChangeStatus::Pending {
        reset_search(state);
        if status == ChangeStatus::NoMatch {
            state.tracemsg("change: no match");
        }
        return Ok(status);
    }
    let buffer = state.cur_mut()?;
    buffer.flags.remove(BufferFlags::CMDLINE);

    if global {
        debug!(target: "search", "global_quiet_replace");
        state.trace.clear();
        let status = repeat_change(state, ChangeKey::Rest)?;
        let tabsize = state.opts.tabsize;
        let text_cols = state.text_cols;
        let buffer = state.cur_mut()?;
        let (curr, lineno, focus, lncol) = saved;
        buffer.curr = curr;
        buffer.lineno = lineno;
        buffer.focus = focus;
        buffer.lncol = lncol;
        buffer.update_curpos(tabsize, text_cols);
        return Ok(status);
    }
    Ok(ChangeStatus::Pending)
}

/// Create the session record and search the first match.
fn start_session(state: &mut EditorState) -> CoreResult<ChangeStatus> {
    let buffer = state.cur()?;
    let mut line = buffer.curr;
    let mut lineno = buffer.lineno;
    let mut lncol = buffer.lncol;
    if buffer.line(line).is_top() {
        let (next, cnt) = buffer.next_visible(line);
        line = next;
        lineno += cnt;
        lncol = 0;
    }
    let mut session = ChangeSession {
        line,
        lineno,
        lncol,
        rep: Vec::new(),
        rep_dynamic: true,
        change_count: 0,
        groups: Vec::new(),
    };
    let found = search_for_replace(state.cur()?, &mut session);
    state.change = Some(session);
    if found {
        show_pending(state);
        Ok(ChangeStatus::Pending)
    } else {
        Ok(ChangeStatus::NoMatch)
    }
}

/// Advance the session by one prompt answer.
pub fn repeat_change(state: &mut EditorState, key: ChangeKey) -> CoreResult<ChangeStatus> {
    let anchored = state
        .cur()?
        .flags
        .contains(BufferFlags::SEARCH_ANCHORED);
    let Some(mut session) = state.change.take() else {
        return Ok(ChangeStatus::Done(0));
    };
    let mut pending = true;
    match key {
        ChangeKey::Yes => {
            apply_pending(state, &mut session, anchored)?;
            pending = search_for_replace(state.cur()?, &mut session);
        }
        ChangeKey::No => {
            let end = session.groups.first().and_then(|g| *g).map_or(0, |g| g.1);
            session.lncol = end + usize::from(anchored);
            pending = search_for_replace(state.cur()?, &mut session);
        }
        ChangeKey::Rest => {
            loop {
                apply_pending(state, &mut session, anchored)?;
                if !search_for_replace(state.cur()?, &mut session) {
                    break;
                }
            }
            pending = false;
        }
        ChangeKey::Quit => pending = false,
    }

    if pending {
        state.change = Some(session);
        show_pending(state);
        return Ok(ChangeStatus::Pending);
    }

    let count = session.change_count;
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    reset_search(state);
    {
        let buffer = state.cur_mut()?;
        // the sticky visual column decides where the cursor lands
        buffer.lncol = buffer.col_at(buffer.curr, buffer.curpos, tabsize);
        buffer.update_curpos(tabsize, text_cols);
    }
    state.tracemsg(format!("change count {count}"));
    debug!(target: "search", count, "change_finished");
    Ok(ChangeStatus::Done(count))
}

/// Accumulate (when needed) and apply the pending replacement, then
/// advance the search column past the inserted text.
fn apply_pending(
    state: &mut EditorState,
    session: &mut ChangeSession,
    anchored: bool,
) -> CoreResult<()> {
    if session.rep_dynamic {
        accumulate_replacement(state.cur()?, session);
    }
    let (start, end) = session.groups.first().and_then(|g| *g).unwrap_or((0, 0));
    let rep = session.rep.clone();
    let buffer = state.cur_mut()?;
    let line = session.line;
    buffer.line_mut(line).splice(start, end - start, &rep)?;
    buffer.line_mut(line).flags.insert(LineFlags::CHANGED);
    buffer.flags.insert(BufferFlags::CHANGED);
    session.change_count += 1;
    session.lncol = start + rep.len() + usize::from(anchored);
    Ok(())
}

/// Search the next match for the session, storing all capture spans.
fn search_for_replace(buffer: &Buffer, session: &mut ChangeSession) -> bool {
    let Some(re) = buffer.search.regex.as_ref() else {
        return false;
    };
    let anchored = buffer.flags.contains(BufferFlags::SEARCH_ANCHORED);
    let mut id = session.line;
    let mut lineno = session.lineno;
    let mut col = session.lncol;
    while !buffer.line(id).is_bottom() {
        if buffer.lines.is_text(id) {
            let content = buffer.line(id).content();
            if probe_line(re, content, col, anchored).is_some() {
                // the probe accepted; collect the capture groups
                if let Some(caps) = re.captures_at(content, col) {
                    session.line = id;
                    session.lineno = lineno;
                    session.lncol = col;
                    session.groups = (0..caps.len().min(10))
                        .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                        .collect();
                    return true;
                }
            }
        }
        let (next, cnt) = buffer.next_visible(id);
        id = next;
        lineno += cnt;
        col = 0;
    }
    false
}

/// Build the replacement for the pending match by walking the
/// (translated) replacement expression byte by byte:
/// - `\0`..`\9` insert the capture group;
/// - `&` inserts group 0;
/// - `\\` and `\&` insert the literals;
/// - `\X` for any other X stays `\X`;
/// - everything else copies verbatim.
///
/// Embedded newlines inside captured text are skipped to keep the
/// single-line invariant. When no backreference was used the session
/// is marked constant so later matches reuse the bytes.
fn accumulate_replacement(buffer: &Buffer, session: &mut ChangeSession) {
    let content = buffer.line(session.line).content();
    let expr = buffer.search.replace_expr.as_bytes();
    let mut rep: Vec<u8> = Vec::with_capacity(expr.len());
    let mut used_backref = false;
    let group_bytes = |n: usize, rep: &mut Vec<u8>| {
        if let Some(Some((s, e))) = session.groups.get(n)
            && e > s
        {
            rep.extend(content[*s..*e].iter().filter(|&&b| b != b'\n'));
        }
    };
    let mut i = 0;
    while i < expr.len() {
        let b = expr[i];
        if b == b'\\' && i + 1 < expr.len() {
            let next = expr[i + 1];
            match next {
                b'0'..=b'9' => {
                    group_bytes((next - b'0') as usize, &mut rep);
                    used_backref = true;
                }
                b'&' | b'\\' => rep.push(next),
                _ => {
                    rep.push(b'\\');
                    rep.push(next);
                }
            }
            i += 2;
        } else if b == b'&' {
            group_bytes(0, &mut rep);
            used_backref = true;
            i += 1;
        } else {
            rep.push(b);
            i += 1;
        }
    }
    session.rep = rep;
    session.rep_dynamic = used_backref;
    debug!(
        target: "search",
        lineno = session.lineno,
        rep_len = session.rep.len(),
        dynamic = session.rep_dynamic,
        "replacement_accumulated"
    );
}

/// Move the cursor onto the pending match and show the prompt.
fn show_pending(state: &mut EditorState) {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let text_rows = state.text_rows;
    let (line, lineno, end) = {
        let Some(session) = state.change.as_ref() else {
            return;
        };
        (
            session.line,
            session.lineno,
            session.groups.first().and_then(|g| *g).map_or(0, |g| g.1),
        )
    };
    if let Ok(buffer) = state.cur_mut() {
        buffer.curr = line;
        buffer.lineno = lineno;
        buffer.lncol = end;
        buffer.focus_avoid_border(text_rows);
        buffer.update_curpos(tabsize, text_cols);
    }
    state.tracemsg(REPLACE_PROMPT);
}
