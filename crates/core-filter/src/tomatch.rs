//! Bracket matching over visible lines.

use core_state::EditorState;

const PAIRS: [(u8, u8); 4] = [(b'(', b')'), (b'[', b']'), (b'{', b'}'), (b'<', b'>')];

fn partner(ch: u8) -> Option<(u8, i8)> {
    for &(open, close) in &PAIRS {
        if ch == open {
            return Some((close, 1));
        }
        if ch == close {
            return Some((open, -1));
        }
    }
    None
}

/// `'x'` and `'\x'` character constants must not count as brackets;
/// returns how many columns to skip when the position opens one.
fn char_constant_skip(content: &[u8], col: usize) -> usize {
    if content.get(col) != Some(&b'\'') {
        return 0;
    }
    if content.get(col + 2) == Some(&b'\'') {
        2
    } else if content.get(col + 1) == Some(&b'\\') && content.get(col + 3) == Some(&b'\'') {
        3
    } else {
        0
    }
}

/// Move the cursor to the bracket matching the one under it. Walks
/// forward for an opener and backward for a closer, skipping hidden
/// lines and character constants. Nothing happens when the cursor is
/// not on a bracket or no partner exists.
pub fn tomatch(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let text_cols = state.text_cols;
    let text_rows = state.text_rows;
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if !buffer.lines.is_text(buffer.curr) {
        return false;
    }
    let start_ch = match buffer.current_line().content().get(buffer.lncol) {
        Some(&c) => c,
        None => return false,
    };
    let Some((tofind, dir)) = partner(start_ch) else {
        return false;
    };

    let mut id = buffer.curr;
    let mut lineno = buffer.lineno;
    let mut depth: i32 = 1;
    let mut col = buffer.lncol as isize + dir as isize;

    loop {
        let content = buffer.line(id).content();
        if dir > 0 {
            let mut c = col.max(0) as usize;
            while c < content.len() {
                let skip = char_constant_skip(content, c);
                if skip > 0 {
                    c += skip;
                } else if content[c] == start_ch {
                    depth += 1;
                } else if content[c] == tofind {
                    depth -= 1;
                    if depth == 0 {
                        buffer.curr = id;
                        buffer.lineno = lineno;
                        buffer.lncol = c;
                        buffer.update_curpos(tabsize, text_cols);
                        buffer.focus_avoid_border(text_rows);
                        return true;
                    }
                }
                c += 1;
            }
            let (next, cnt) = buffer.next_visible(id);
            if !buffer.lines.is_text(next) {
                return false;
            }
            id = next;
            lineno += cnt;
            col = 0;
        } else {
            let mut c = col;
            while c >= 0 {
                let cu = c as usize;
                // backward over a closing quote of a char constant
                if content.get(cu) == Some(&b'\'')
                    && cu >= 2
                    && content.get(cu - 2) == Some(&b'\'')
                {
                    c -= 2;
                } else if content.get(cu) == Some(&b'\'')
                    && cu >= 3
                    && content.get(cu - 2) == Some(&b'\\')
                    && content.get(cu - 3) == Some(&b'\'')
                {
                    c -= 3;
                } else {
                    if content.get(cu) == Some(&start_ch) {
                        depth += 1;
                    } else if content.get(cu) == Some(&tofind) {
                        depth -= 1;
                        if depth == 0 {
                            buffer.curr = id;
                            buffer.lineno = lineno;
                            buffer.lncol = cu;
                            buffer.update_curpos(tabsize, text_cols);
                            buffer.focus_avoid_border(text_rows);
                            return true;
                        }
                    }
                    c -= 1;
                }
            }
            let (prev, cnt) = buffer.prev_visible(id);
            if !buffer.lines.is_text(prev) {
                return false;
            }
            id = prev;
            lineno = lineno.saturating_sub(cnt);
            col = buffer.line(prev).content().len() as isize - 1;
        }
    }
}
