//! Filter engine behaviour over small buffers.

use core_filter::{
    FilterAction, decr2_filter_level, decr_filter_level, filter_all, filter_base,
    filter_expand_down, filter_expand_up, filter_less, filter_more, filter_restrict,
    filter_tmp_all, incr2_filter_level, incr_filter_level,
};
use core_state::{Buffer, EditorState, FileType, LineFlags, Options};
use pretty_assertions::assert_eq;

fn state_with(texts: &[&str]) -> EditorState {
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

fn hidden_map(st: &EditorState) -> Vec<bool> {
    let b = st.cur().unwrap();
    b.lines.iter_text().map(|id| b.is_hidden(id)).collect()
}

#[test]
fn filter_all_regex_keeps_only_matches() {
    // five lines, only 2 and 4 contain foo
    let mut st = state_with(&["one", "foo a", "three", "b foo", "five"]);
    assert!(filter_all(&mut st, "foo"));
    assert_eq!(hidden_map(&st), [true, false, true, false, true]);
    // cursor was pulled off the hidden first line
    assert_eq!(st.cur().unwrap().lineno, 2);

    // tmp-all shows everything without losing bits
    assert!(filter_tmp_all(&mut st));
    assert_eq!(hidden_map(&st), [false; 5]);
    assert!(filter_tmp_all(&mut st));
    assert_eq!(hidden_map(&st), [true, false, true, false, true]);
}

#[test]
fn filter_all_twice_is_idempotent() {
    let mut st = state_with(&["foo", "bar", "foo baz"]);
    assert!(filter_all(&mut st, "foo"));
    let first = hidden_map(&st);
    assert!(filter_all(&mut st, "foo"));
    assert_eq!(hidden_map(&st), first);
    // more with the same predicate must keep every visible line
    assert!(filter_more(&mut st, "foo"));
    assert_eq!(hidden_map(&st), first);
}

#[test]
fn empty_argument_semantics() {
    let mut st = state_with(&["a", "b"]);
    assert!(filter_less(&mut st, ""));
    assert_eq!(hidden_map(&st), [true, true]);
    assert!(filter_more(&mut st, ""));
    assert_eq!(hidden_map(&st), [true, true]);
    assert!(filter_all(&mut st, ""));
    assert_eq!(hidden_map(&st), [false, false]);
}

#[test]
fn alter_predicate_selects_changed_lines() {
    let mut st = state_with(&["a", "b", "c"]);
    {
        let b = st.cur_mut().unwrap();
        let ids: Vec<_> = b.lines.iter_text().collect();
        b.lines.line_mut(ids[1]).flags.insert(LineFlags::ALTERED);
    }
    assert!(filter_all(&mut st, "alter"));
    assert_eq!(hidden_map(&st), [true, false, true]);
    // any prefix of the keyword works
    assert!(filter_all(&mut st, "alt"));
    assert_eq!(hidden_map(&st), [true, false, true]);
}

#[test]
fn lineno_predicate_moves_and_unhides_one_line() {
    let mut st = state_with(&["a", "b", "c"]);
    assert!(filter_less(&mut st, ""));
    assert!(filter_more(&mut st, ":2"));
    assert_eq!(hidden_map(&st), [true, false, true]);
    assert_eq!(st.cur().unwrap().lineno, 2);
}

#[test]
fn expand_and_restrict_adjust_neighbours() {
    let mut st = state_with(&["a", "b", "c", "d"]);
    assert!(filter_all(&mut st, "c"));
    assert_eq!(st.cur().unwrap().lineno, 3);
    assert!(filter_expand_up(&mut st));
    assert_eq!(hidden_map(&st), [true, false, false, true]);
    assert_eq!(st.cur().unwrap().lineno, 2);
    assert!(filter_expand_down(&mut st));
    assert_eq!(hidden_map(&st), [true, false, false, true]);
    assert_eq!(st.cur().unwrap().lineno, 3);
    assert!(filter_expand_down(&mut st));
    assert_eq!(hidden_map(&st), [true, false, false, false]);
    // restrict hides the focus line again and steps off it
    assert!(filter_restrict(&mut st));
    assert_eq!(hidden_map(&st)[3], true);
}

#[test]
fn level_switch_keeps_bits_separate() {
    let mut st = state_with(&["foo", "bar"]);
    assert!(filter_all(&mut st, "foo"));
    assert_eq!(hidden_map(&st), [false, true]);
    // level 2 starts clean
    assert!(incr_filter_level(&mut st));
    assert_eq!(st.cur().unwrap().flevel, 2);
    assert_eq!(hidden_map(&st), [false, false]);
    assert!(decr_filter_level(&mut st));
    assert_eq!(hidden_map(&st), [false, true]);
}

#[test]
fn level_copy_variants_duplicate_bits() {
    let mut st = state_with(&["foo", "bar"]);
    assert!(filter_all(&mut st, "foo"));
    assert!(incr2_filter_level(&mut st));
    assert_eq!(st.cur().unwrap().flevel, 2);
    assert_eq!(hidden_map(&st), [false, true]);
    assert!(decr2_filter_level(&mut st));
    assert_eq!(st.cur().unwrap().flevel, 1);
    assert_eq!(hidden_map(&st), [false, true]);
}

#[test]
fn level_bounds_are_enforced() {
    let mut st = state_with(&["x"]);
    assert!(!decr_filter_level(&mut st));
    for _ in 0..6 {
        assert!(incr_filter_level(&mut st));
    }
    assert_eq!(st.cur().unwrap().flevel, 7);
    assert!(!incr_filter_level(&mut st));
}

#[test]
fn c_function_fold_keeps_signature_and_braces() {
    let mut st = state_with(&[
        "#include <stdio.h>",
        "",
        "static int",
        "helper (int x)",
        "{",
        "\treturn x + 1;",
        "}",
        "",
        "int main (void)",
        "{",
        "\tprintf(\"hi\");",
        "\treturn 0;",
        "}",
    ]);
    st.cur_mut().unwrap().ftype = FileType::C;
    assert!(filter_base(&mut st, FilterAction::All, "function"));
    assert_eq!(
        hidden_map(&st),
        [
            true,  // include
            true,  // blank
            true,  // "static int" return-type line
            false, // helper (...)
            false, // {
            true,  // body
            false, // }
            true,  // blank
            false, // int main (void)
            false, // {
            true, true, // body
            false, // }
        ]
    );
}

#[test]
fn python_fold_keeps_headers_only() {
    let mut st = state_with(&[
        "import os",
        "def first():",
        "    pass",
        "class Thing:",
        "    def method(self):",
        "        pass",
    ]);
    st.cur_mut().unwrap().ftype = FileType::Python;
    assert!(filter_base(&mut st, FilterAction::All, "function"));
    assert_eq!(
        hidden_map(&st),
        [true, false, true, false, false, true]
    );
}

#[test]
fn shell_fold_walks_header_to_closing_brace() {
    let mut st = state_with(&[
        "#!/bin/sh",
        "greet() {",
        "  echo hi",
        "}",
        "echo done",
    ]);
    st.cur_mut().unwrap().ftype = FileType::Shell;
    assert!(filter_base(&mut st, FilterAction::All, "function"));
    assert_eq!(hidden_map(&st), [true, false, true, false, true]);
}
