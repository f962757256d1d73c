//! Selection copy/move/remove/overwrite behaviour.

use core_edit::{cp_select, line_select, mv_select, over_select, rm_select, select_all};
use core_state::{Buffer, LineFlags};
use pretty_assertions::assert_eq;

mod common;
use common::{lines_of, lines_of_ri, place_cursor, select_range, state_with};

fn selected_map(st: &core_state::EditorState) -> Vec<bool> {
    let b = st.cur().unwrap();
    b.lines
        .iter_text()
        .map(|id| b.lines.line(id).flags.contains(LineFlags::SELECTED))
        .collect()
}

#[test]
fn line_select_starts_and_grows() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    place_cursor(&mut st, 2, 0);
    assert!(line_select(&mut st));
    assert_eq!(selected_map(&st), [false, true, false, false]);
    // jump two lines down and select: the gap joins the run
    place_cursor(&mut st, 4, 0);
    assert!(line_select(&mut st));
    assert_eq!(selected_map(&st), [false, true, true, true]);
}

#[test]
fn line_select_shrinks_from_inside() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    select_range(&mut st, 1..=4);
    st.select_w = 1;
    place_cursor(&mut st, 2, 0);
    assert!(line_select(&mut st));
    // the shorter side of the run (above the cursor) is dropped
    assert_eq!(selected_map(&st), [false, true, true, true]);
}

#[test]
fn select_all_marks_every_line() {
    let mut st = state_with(&["a", "b"]);
    assert!(select_all(&mut st));
    assert_eq!(selected_map(&st), [true, true]);
    assert_eq!(st.select_ri, Some(st.ring.current_index()));
}

#[test]
fn cp_select_copies_after_focus() {
    let mut st = state_with(&["a", "b", "c", "target"]);
    select_range(&mut st, 1..=2);
    place_cursor(&mut st, 4, 0);
    assert!(cp_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "b", "c", "target", "a", "b"]);
    // copies carry the selection now
    assert_eq!(
        selected_map(&st),
        [false, false, false, false, true, true]
    );
    assert_eq!(st.cur().unwrap().num_lines, 6);
}

#[test]
fn cp_select_skips_hidden_lines() {
    let mut st = state_with(&["a", "hidden", "c", "target"]);
    select_range(&mut st, 1..=3);
    {
        let b = st.cur_mut().unwrap();
        let ids: Vec<_> = b.lines.iter_text().collect();
        let mask = b.fmask();
        b.lines.line_mut(ids[1]).hide(mask);
    }
    place_cursor(&mut st, 4, 0);
    assert!(cp_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "hidden", "c", "target", "a", "c"]);
}

#[test]
fn cp_select_refuses_target_inside_run() {
    let mut st = state_with(&["a", "b", "c"]);
    select_range(&mut st, 1..=3);
    place_cursor(&mut st, 2, 0);
    assert!(!cp_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "b", "c"]);
}

#[test]
fn rm_select_removes_visible_run() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    select_range(&mut st, 2..=3);
    place_cursor(&mut st, 1, 0);
    assert!(rm_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "d"]);
    assert_eq!(st.select_ri, None);
    assert_eq!(st.cur().unwrap().num_lines, 2);
}

#[test]
fn rm_select_relocates_cursor_out_of_run() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    select_range(&mut st, 2..=3);
    place_cursor(&mut st, 3, 0);
    assert!(rm_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "d"]);
    assert_eq!(st.cur().unwrap().lineno, 1);
}

#[test]
fn mv_select_within_buffer() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    select_range(&mut st, 1..=2);
    place_cursor(&mut st, 4, 0);
    assert!(mv_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["c", "d", "a", "b"]);
    // the default move resets the selection
    assert_eq!(st.select_ri, None);
}

#[test]
fn mv_select_adjacent_is_noop_on_content() {
    let mut st = state_with(&["a", "b", "c"]);
    select_range(&mut st, 2..=3);
    place_cursor(&mut st, 1, 0);
    assert!(mv_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "b", "c"]);
}

#[test]
fn mv_select_refuses_target_in_selection() {
    let mut st = state_with(&["a", "b", "c"]);
    select_range(&mut st, 1..=2);
    place_cursor(&mut st, 2, 0);
    assert!(!mv_select(&mut st).unwrap());
    assert_eq!(lines_of(&st), ["a", "b", "c"]);
}

#[test]
fn mv_select_across_buffers() {
    let mut st = state_with(&["src1", "src2", "keep"]);
    let src_ri = st.ring.current_index();
    select_range(&mut st, 1..=2);
    let dst_ri = st.ring.insert(Buffer::scratch("*dst*", 0)).unwrap();
    st.ring.set_current(dst_ri);
    assert!(mv_select(&mut st).unwrap());
    assert_eq!(lines_of_ri(&st, src_ri), ["keep"]);
    assert_eq!(lines_of_ri(&st, dst_ri), ["src1", "src2"]);
    assert_eq!(st.ring.get(src_ri).unwrap().num_lines, 1);
    assert_eq!(st.ring.get(dst_ri).unwrap().num_lines, 2);
}

#[test]
fn over_select_one_to_one_then_extras() {
    // source buffer has three lines, the selection only two: the
    // third is appended after the run
    let mut st = state_with(&["old1", "old2", "tail"]);
    let target_ri = st.ring.current_index();
    select_range(&mut st, 1..=2);
    let mut src = Buffer::scratch("*sh*", 0);
    let mut at = src.lines.top();
    for t in ["new1", "new2", "new3"] {
        at = src.lines.append(at, t.as_bytes()).unwrap();
        src.num_lines += 1;
    }
    let src_ri = st.ring.insert(src).unwrap();
    st.ring.set_current(src_ri);
    assert!(over_select(&mut st).unwrap());
    assert_eq!(
        lines_of_ri(&st, target_ri),
        ["new1", "new2", "new3", "tail"]
    );
    assert_eq!(st.ring.get(target_ri).unwrap().num_lines, 4);
    assert_eq!(st.ring.current_index(), target_ri);
}

#[test]
fn over_select_deletes_leftover_selection() {
    let mut st = state_with(&["old1", "old2", "old3", "tail"]);
    let target_ri = st.ring.current_index();
    select_range(&mut st, 1..=3);
    let mut src = Buffer::scratch("*sh*", 0);
    let at = src.lines.top();
    src.lines.append(at, b"only").unwrap();
    src.num_lines = 1;
    let src_ri = st.ring.insert(src).unwrap();
    st.ring.set_current(src_ri);
    assert!(over_select(&mut st).unwrap());
    assert_eq!(lines_of_ri(&st, target_ri), ["only", "tail"]);
    assert_eq!(st.ring.get(target_ri).unwrap().num_lines, 2);
}

#[test]
fn over_select_requires_different_buffers() {
    let mut st = state_with(&["a", "b"]);
    select_range(&mut st, 1..=2);
    assert!(!over_select(&mut st).unwrap());
}
