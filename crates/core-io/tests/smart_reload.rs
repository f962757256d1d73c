//! Smart reload driven by a real `diff` child.

use core_io::{add_file, parse_diff_header, reload_bydiff};
use core_state::{BufferFlags, EditorState, LineFlags, Options};
use pretty_assertions::assert_eq;
use std::fs;

fn lines_of(st: &EditorState) -> Vec<String> {
    let b = st.cur().unwrap();
    b.lines
        .iter_text()
        .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
        .collect()
}

fn open_with(content: &str) -> (tempfile::TempDir, EditorState, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    fs::write(&path, content).unwrap();
    let mut st = EditorState::new(Options::default());
    add_file(&mut st, path.to_str().unwrap()).unwrap();
    (dir, st, path)
}

#[test]
fn header_parser_accepts_all_forms() {
    let h = parse_diff_header(b"2a3,4").unwrap();
    assert_eq!((h.action, h.from_start, h.to_start, h.to_end), (b'a', 2, 3, 4));
    let h = parse_diff_header(b"1,3d0").unwrap();
    assert_eq!((h.action, h.from_start, h.from_end, h.to_start), (b'd', 1, 3, 0));
    let h = parse_diff_header(b"5c5").unwrap();
    assert_eq!((h.action, h.from_start, h.to_start), (b'c', 5, 5));
    assert!(parse_diff_header(b"> added text").is_none());
    assert!(parse_diff_header(b"--- ").is_none());
    assert!(parse_diff_header(b"2x3").is_none());
}

#[test]
fn insertion_keeps_attributes_and_moves_cursor() {
    // the disk version inserts MID between lines 2
    // and 3 of a 5-line buffer; the cursor sits on line 4
    let (_dir, mut st, path) = open_with("l1\nl2\nl3\nl4\nl5\n");
    {
        let b = st.cur_mut().unwrap();
        let id = b.goto_lineno(4).unwrap();
        b.lines.line_mut(id).flags.insert(LineFlags::ALTERED);
        b.curr = id;
        b.lineno = 4;
    }
    fs::write(&path, "l1\nl2\nMID\nl3\nl4\nl5\n").unwrap();
    reload_bydiff(&mut st).unwrap();

    assert_eq!(lines_of(&st), ["l1", "l2", "MID", "l3", "l4", "l5"]);
    let b = st.cur().unwrap();
    assert_eq!(b.num_lines, 6);
    assert_eq!(b.lineno, 5, "cursor follows its line past the insertion");
    let mid = b.goto_lineno(3).unwrap();
    assert!(!b.lines.line(mid).flags.contains(LineFlags::CHANGED));
    let l4 = b.goto_lineno(5).unwrap();
    assert!(b.lines.line(l4).flags.contains(LineFlags::ALTERED));
    assert!(!b.flags.contains(BufferFlags::CHANGED));
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("reload done")));
}

#[test]
fn identical_content_reports_identical() {
    let (_dir, mut st, _path) = open_with("same\nlines\n");
    {
        // a stale CHANGED mark folds into ALTERED because the bytes
        // match the disk
        let b = st.cur_mut().unwrap();
        let id = b.goto_lineno(1).unwrap();
        b.lines.line_mut(id).flags.insert(LineFlags::CHANGED);
        b.flags.insert(BufferFlags::CHANGED);
    }
    reload_bydiff(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["same", "lines"]);
    let b = st.cur().unwrap();
    let id = b.goto_lineno(1).unwrap();
    assert!(b.lines.line(id).flags.contains(LineFlags::ALTERED));
    assert!(!b.lines.line(id).flags.contains(LineFlags::CHANGED));
    assert!(!b.flags.contains(BufferFlags::CHANGED));
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("identical")));
}

#[test]
fn deletion_and_change_apply_in_place() {
    let (_dir, mut st, path) = open_with("a\nb\nc\nd\n");
    fs::write(&path, "a\nC\nd\n").unwrap();
    reload_bydiff(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["a", "C", "d"]);
    assert_eq!(st.cur().unwrap().num_lines, 3);
}

#[test]
fn selection_is_recovered_after_reload() {
    let (_dir, mut st, path) = open_with("a\nb\nc\nd\n");
    let ri = st.ring.current_index();
    st.select_ri = Some(ri);
    st.select_w = 2;
    {
        let b = st.cur_mut().unwrap();
        for no in 2..=3 {
            let id = b.goto_lineno(no).unwrap();
            b.lines.line_mut(id).flags.insert(LineFlags::SELECTED);
        }
    }
    fs::write(&path, "a\nb\nMID\nc\nd\n").unwrap();
    reload_bydiff(&mut st).unwrap();
    // the run re-expands across the inserted line
    let b = st.ring.get(ri).unwrap();
    let selected: Vec<bool> = b
        .lines
        .iter_text()
        .map(|id| b.lines.line(id).flags.contains(LineFlags::SELECTED))
        .collect();
    assert_eq!(selected, [false, true, true, true, false]);
}

#[test]
fn bookmark_on_deleted_line_is_cleared() {
    let (_dir, mut st, path) = open_with("a\nb\nc\n");
    {
        let b = st.cur_mut().unwrap();
        let id = b.goto_lineno(2).unwrap();
        b.curr = id;
        b.lineno = 2;
    }
    st.set_bookmark(1);
    assert!(st.bookmarks.get(1).is_some());
    fs::write(&path, "a\nc\n").unwrap();
    reload_bydiff(&mut st).unwrap();
    assert_eq!(lines_of(&st), ["a", "c"]);
    assert!(st.bookmarks.get(1).is_none());
}

#[test]
fn no_underflow_on_diff_running_off_the_end() {
    // lie about the line count so the change script asks to delete a
    // line the walk cannot reach: the reload must fail cleanly, keep
    // CHANGED raised, and never wrap the line counter
    let (_dir, mut st, path) = open_with("x\n");
    fs::write(&path, "y\n").unwrap();
    {
        let b = st.cur_mut().unwrap();
        b.num_lines = 0;
        b.curr = b.lines.top();
        b.lineno = 0;
    }
    let _ = reload_bydiff(&mut st);
    let b = st.cur().unwrap();
    assert_eq!(b.num_lines, 0, "counter untouched, no underflow");
    assert!(b.flags.contains(BufferFlags::CHANGED));
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("reload failed")));
}
