//! Word highlighting and colour tagging.

use crate::pattern;
use core_state::{BufferFlags, EditorState, LineFlags, LineId};

/// Extract the identifier-like word around byte column `lncol`, used
/// when `highlight_word` is called with no argument.
pub fn select_word(content: &[u8], lncol: usize) -> Option<String> {
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    if lncol >= content.len() || !is_word(content[lncol]) {
        return None;
    }
    let mut start = lncol;
    while start > 0 && is_word(content[start - 1]) {
        start -= 1;
    }
    let mut end = lncol;
    while end < content.len() && is_word(content[end]) {
        end += 1;
    }
    Some(String::from_utf8_lossy(&content[start..end]).into_owned())
}

/// Compile the highlight regex for the current buffer; an empty
/// expression falls back to the word under the cursor, and no word
/// resets the highlight entirely.
pub fn highlight_word(state: &mut EditorState, expr: &str) -> bool {
    let case = state.opts.case_sensitive;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if buffer.flags.contains(BufferFlags::HIGHLIGHT) {
        buffer.highlight = None;
        buffer
            .flags
            .remove(BufferFlags::HIGHLIGHT | BufferFlags::HIGHLIGHT_ANCHORED);
    }
    let translated = if expr.is_empty() {
        let lncol = buffer
            .lncol
            .min(buffer.current_line().content().len().saturating_sub(1));
        match select_word(buffer.current_line().content(), lncol) {
            Some(word) => regex::escape(&word),
            None => return false,
        }
    } else {
        pattern::expand_shorthands(pattern::cut_delimiters(expr))
    };
    match pattern::compile_translated(&translated, case) {
        Ok(re) => {
            let buffer = state.cur_mut().expect("buffer still open");
            buffer.highlight = Some(re);
            buffer.flags.insert(BufferFlags::HIGHLIGHT);
            buffer.flags.set(
                BufferFlags::HIGHLIGHT_ANCHORED,
                pattern::is_anchored(&translated),
            );
            true
        }
        Err(e) => {
            state.tracemsg(e.to_string());
            false
        }
    }
}

/// Toggle the colour mark on the focus line.
pub fn tag_focusline(state: &mut EditorState) -> bool {
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if !buffer.lines.is_text(buffer.curr) {
        return false;
    }
    let curr = buffer.curr;
    buffer.line_mut(curr).flags.toggle(LineFlags::COLOR_TAG);
    true
}

/// Colour-tag lines by predicate: empty clears all in-view marks,
/// `alter`/`selection`/`:N` add marks, and a regex marks matching
/// in-view lines while unmarking the rest.
pub fn color_tag(state: &mut EditorState, expr: &str) -> bool {
    let case = state.opts.case_sensitive;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };

    let visible: Vec<LineId> = {
        let mut ids = Vec::new();
        let mut id = buffer.lines.top();
        loop {
            let (next, _) = buffer.next_visible(id);
            if !buffer.lines.is_text(next) {
                break;
            }
            ids.push(next);
            id = next;
        }
        ids
    };

    if expr.is_empty() {
        for id in visible {
            buffer.line_mut(id).flags.remove(LineFlags::COLOR_TAG);
        }
        return true;
    }
    if "alter".starts_with(expr) {
        for id in visible {
            if buffer
                .line(id)
                .flags
                .intersects(LineFlags::ALTERED | LineFlags::CHANGED)
            {
                buffer.line_mut(id).flags.insert(LineFlags::COLOR_TAG);
            }
        }
        return true;
    }
    if "selection".starts_with(expr) {
        for id in visible {
            if buffer.line(id).flags.contains(LineFlags::SELECTED) {
                buffer.line_mut(id).flags.insert(LineFlags::COLOR_TAG);
            }
        }
        return true;
    }
    if let Some(no) = expr.strip_prefix(':') {
        let Ok(lineno) = no.trim().parse::<usize>() else {
            return false;
        };
        if lineno >= 1
            && lineno <= buffer.num_lines
            && let Some(id) = buffer.goto_lineno(lineno)
            && !buffer.is_hidden(id)
        {
            buffer.line_mut(id).flags.insert(LineFlags::COLOR_TAG);
            return true;
        }
        return false;
    }

    match pattern::compile(expr, case) {
        Ok(re) => {
            for id in visible {
                let hit = re
                    .find(buffer.line(id).content())
                    .is_some_and(|m| m.start() < m.end() || m.end() == 0);
                buffer
                    .line_mut(id)
                    .flags
                    .set(LineFlags::COLOR_TAG, hit);
            }
            true
        }
        Err(e) => {
            state.tracemsg(e.to_string());
            false
        }
    }
}
