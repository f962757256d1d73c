#![allow(dead_code)] // shared across the edit test binaries

use core_state::{Buffer, EditorState, LineFlags, Options};

/// Fresh state with one buffer holding the given lines, cursor on
/// line 1 column 0.
pub fn state_with(texts: &[&str]) -> EditorState {
    let mut st = EditorState::new(Options::default());
    let mut b = Buffer::scratch("*t*", 0);
    let mut at = b.lines.top();
    for t in texts {
        at = b.lines.append(at, t.as_bytes()).unwrap();
        b.num_lines += 1;
    }
    b.curr = b.lines.first_text().unwrap_or(b.lines.bottom());
    b.lineno = 1;
    let ri = st.ring.insert(b).unwrap();
    st.ring.set_current(ri);
    st
}

pub fn lines_of(st: &EditorState) -> Vec<String> {
    let b = st.cur().unwrap();
    b.lines
        .iter_text()
        .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
        .collect()
}

pub fn lines_of_ri(st: &EditorState, ri: usize) -> Vec<String> {
    let b = st.ring.get(ri).unwrap();
    b.lines
        .iter_text()
        .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
        .collect()
}

/// Put the cursor on an absolute line/column.
pub fn place_cursor(st: &mut EditorState, lineno: usize, lncol: usize) {
    let b = st.cur_mut().unwrap();
    let id = b.goto_lineno(lineno).unwrap();
    b.curr = id;
    b.lineno = lineno;
    b.lncol = lncol;
    b.curpos = b.pos_at(id, lncol, 8);
}

/// Mark an inclusive 1-based line range selected.
pub fn select_range(st: &mut EditorState, range: std::ops::RangeInclusive<usize>) {
    let ri = st.ring.current_index();
    st.select_ri = Some(ri);
    st.select_w = *range.start();
    let b = st.ring.get_mut(ri).unwrap();
    let ids: Vec<_> = b.lines.iter_text().collect();
    for no in range {
        b.lines.line_mut(ids[no - 1]).flags.insert(LineFlags::SELECTED);
    }
}
