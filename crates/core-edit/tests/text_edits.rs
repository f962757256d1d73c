//! Character and line edit behaviour.

use core_edit::{
    delback_char, delete_char, delete_line, deleol, del2bol, duplicate, insert_chars, join_line,
    split_line, type_text,
};
use core_state::{BufferFlags, LineFlags};
use pretty_assertions::assert_eq;

mod common;
use common::{lines_of, place_cursor, state_with};

#[test]
fn split_mid_empty_logic_spec_scenario() {
    // three lines a/b/c, cursor line 2 column 1 (end of "b")
    let mut st = state_with(&["a", "b", "c"]);
    place_cursor(&mut st, 2, 1);
    split_line(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["a", "b", "", "c"]);
    let b = st.cur().unwrap();
    assert_eq!((b.lineno, b.lncol), (3, 0));
    assert_eq!(b.num_lines, 4);
    assert!(b.flags.contains(BufferFlags::CHANGED));
}

#[test]
fn split_and_join_restore_bytes() {
    let mut st = state_with(&["hello world"]);
    place_cursor(&mut st, 1, 5);
    split_line(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["hello", " world"]);
    place_cursor(&mut st, 1, 5);
    join_line(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["hello world"]);
}

#[test]
fn smart_indent_inherits_prefix_blanks() {
    let mut st = state_with(&["    indented body"]);
    st.opts.smart_indent = true;
    place_cursor(&mut st, 1, 12);
    split_line(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["    indented", "     body"]);
    assert_eq!(st.cur().unwrap().lncol, 4);
}

#[test]
fn insert_then_delback_round_trip() {
    let mut st = state_with(&["base"]);
    place_cursor(&mut st, 1, 2);
    insert_chars(&mut st, b"XY").unwrap();
    assert_eq!(lines_of(&st), ["baXYse"]);
    delback_char(&mut st).unwrap();
    delback_char(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["base"]);
    let b = st.cur().unwrap();
    assert_eq!(b.lncol, 2);
    // the byte content is restored but the change marks stay
    assert!(b.current_line().flags.contains(LineFlags::CHANGED));
}

#[test]
fn delete_char_joins_at_line_end() {
    let mut st = state_with(&["ab", "cd"]);
    place_cursor(&mut st, 1, 2);
    delete_char(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["abcd"]);
    assert_eq!(st.cur().unwrap().num_lines, 1);
}

#[test]
fn delete_char_on_empty_line_removes_it() {
    let mut st = state_with(&["a", "", "c"]);
    place_cursor(&mut st, 2, 0);
    delete_char(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["a", "c"]);
}

#[test]
fn delback_at_bol_joins_previous() {
    let mut st = state_with(&["ab", "cd"]);
    place_cursor(&mut st, 2, 0);
    delback_char(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["abcd"]);
    let b = st.cur().unwrap();
    assert_eq!((b.lineno, b.lncol), (1, 2));
}

#[test]
fn delback_blocked_by_hidden_previous_line() {
    let mut st = state_with(&["hideme", "stay"]);
    {
        let b = st.cur_mut().unwrap();
        let first = b.lines.first_text().unwrap();
        let mask = b.fmask();
        b.lines.line_mut(first).hide(mask);
    }
    place_cursor(&mut st, 2, 0);
    delback_char(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["hideme", "stay"]);
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("not in-view")));
}

#[test]
fn deleol_cuts_to_line_end() {
    let mut st = state_with(&["hello world"]);
    place_cursor(&mut st, 1, 5);
    deleol(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["hello"]);
}

#[test]
fn del2bol_cuts_to_line_start() {
    let mut st = state_with(&["hello world"]);
    place_cursor(&mut st, 1, 6);
    del2bol(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["world"]);
    assert_eq!(st.cur().unwrap().lncol, 0);
}

#[test]
fn delete_line_lands_on_next() {
    let mut st = state_with(&["one", "two", "three"]);
    place_cursor(&mut st, 2, 0);
    delete_line(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["one", "three"]);
    let b = st.cur().unwrap();
    assert_eq!(b.lineno, 2);
    assert_eq!(b.num_lines, 2);
}

#[test]
fn duplicate_copies_without_bookmark() {
    let mut st = state_with(&["keep me"]);
    st.set_bookmark(4);
    duplicate(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["keep me", "keep me"]);
    let b = st.cur().unwrap();
    assert_eq!(b.lineno, 2);
    assert_eq!(b.current_line().bookmark(), 0);
    assert!(b.current_line().flags.contains(LineFlags::CHANGED));
}

#[test]
fn type_text_splits_on_newlines() {
    let mut st = state_with(&[""]);
    place_cursor(&mut st, 1, 0);
    type_text(&mut st, b"first\nsecond\nthird").unwrap();
    assert_eq!(lines_of(&st), ["first", "second", "third"]);
}

#[test]
fn type_text_suspends_smart_indent() {
    let mut st = state_with(&["    lead"]);
    st.opts.smart_indent = true;
    place_cursor(&mut st, 1, 8);
    type_text(&mut st, b"\nplain").unwrap();
    assert_eq!(lines_of(&st), ["    lead", "plain"]);
    assert!(st.opts.smart_indent, "option restored after insert");
}

#[test]
fn no_edit_flag_blocks_typing() {
    let mut st = state_with(&["ro"]);
    st.cur_mut().unwrap().flags.insert(BufferFlags::NO_EDIT);
    type_text(&mut st, b"zz").unwrap();
    assert_eq!(lines_of(&st), ["ro"]);
}
