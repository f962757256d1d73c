//! End-to-end search and change scenarios over small buffers.

use core_search::{ChangeKey, ChangeStatus, change, repeat_change, repeat_search, search};
use core_state::{Buffer, BufferFlags, EditorState, Options};
use pretty_assertions::assert_eq;

fn state_with(texts: &[&str]) -> EditorState {
    let mut st = EditorState::new(Options::default());
    let mut b = Buffer::scratch("*t*", 0);
    let mut at = b.lines.top();
    for t in texts {
        at = b.lines.append(at, t.as_bytes()).unwrap();
        b.num_lines += 1;
    }
    b.curr = b.lines.top();
    b.lineno = 0;
    let ri = st.ring.insert(b).unwrap();
    st.ring.set_current(ri);
    st
}

fn lines_of(st: &EditorState) -> Vec<String> {
    let b = st.cur().unwrap();
    b.lines
        .iter_text()
        .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
        .collect()
}

#[test]
fn plain_search_advances_to_each_match() {
    let mut st = state_with(&["alpha", "beta", "alphabet"]);
    assert!(search(&mut st, "/alpha/"));
    assert_eq!(st.cur().unwrap().lineno, 1);
    assert_eq!(st.cur().unwrap().lncol, 5);
    assert!(repeat_search(&mut st));
    assert_eq!(st.cur().unwrap().lineno, 3);
    // no further match: position restored, search reset
    assert!(!repeat_search(&mut st));
    assert_eq!(st.cur().unwrap().lineno, 3);
    assert!(
        !st.cur()
            .unwrap()
            .flags
            .contains(BufferFlags::SEARCH_ACTIVE)
    );
}

#[test]
fn anchored_search_visits_every_line_start() {
    // three lines "foo", "", "foo" with pattern /^/
    let mut st = state_with(&["foo", "", "foo"]);
    assert!(search(&mut st, "/^/"));
    let b = st.cur().unwrap();
    assert!(b.flags.contains(BufferFlags::SEARCH_ANCHORED));
    assert_eq!((b.lineno, b.lncol), (1, 0));
    assert!(repeat_search(&mut st));
    assert_eq!(
        (st.cur().unwrap().lineno, st.cur().unwrap().lncol),
        (2, 0)
    );
    assert!(repeat_search(&mut st));
    assert_eq!(
        (st.cur().unwrap().lineno, st.cur().unwrap().lncol),
        (3, 0)
    );
    assert!(!repeat_search(&mut st));
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("no match")));
}

#[test]
fn eol_anchor_matches_line_ends() {
    let mut st = state_with(&["ab", "c"]);
    assert!(search(&mut st, "/$/"));
    assert_eq!(
        (st.cur().unwrap().lineno, st.cur().unwrap().lncol),
        (1, 2)
    );
    assert!(repeat_search(&mut st));
    assert_eq!(
        (st.cur().unwrap().lineno, st.cur().unwrap().lncol),
        (2, 1)
    );
}

#[test]
fn case_insensitive_by_default() {
    let mut st = state_with(&["FOO"]);
    assert!(search(&mut st, "/foo/"));
    let mut st = state_with(&["FOO"]);
    st.opts.case_sensitive = true;
    assert!(!search(&mut st, "/foo/"));
}

#[test]
fn interactive_change_with_backreference() {
    // x=1 / x=2 / y=3 with change /^x=(\d)/X=\1/
    let mut st = state_with(&["x=1", "x=2", "y=3"]);
    let status = change(&mut st, r"/^x=(\d)/X=\1/").unwrap();
    assert_eq!(status, ChangeStatus::Pending);
    assert_eq!(
        repeat_change(&mut st, ChangeKey::Yes).unwrap(),
        ChangeStatus::Pending
    );
    let status = repeat_change(&mut st, ChangeKey::Yes).unwrap();
    // second yes leaves no further match pending
    let status = if status == ChangeStatus::Pending {
        repeat_change(&mut st, ChangeKey::Quit).unwrap()
    } else {
        status
    };
    assert_eq!(status, ChangeStatus::Done(2));
    assert_eq!(lines_of(&st), ["X=1", "X=2", "y=3"]);
}

#[test]
fn change_no_skips_match() {
    let mut st = state_with(&["aaa", "aab"]);
    assert_eq!(change(&mut st, "/a/X/").unwrap(), ChangeStatus::Pending);
    assert_eq!(
        repeat_change(&mut st, ChangeKey::No).unwrap(),
        ChangeStatus::Pending
    );
    assert_eq!(
        repeat_change(&mut st, ChangeKey::Yes).unwrap(),
        ChangeStatus::Pending
    );
    let _ = repeat_change(&mut st, ChangeKey::Quit).unwrap();
    assert_eq!(lines_of(&st), ["aXa", "aab"]);
}

#[test]
fn change_rest_applies_everything() {
    let mut st = state_with(&["one two", "two three", "none"]);
    assert_eq!(change(&mut st, "/two/2/").unwrap(), ChangeStatus::Pending);
    assert_eq!(
        repeat_change(&mut st, ChangeKey::Rest).unwrap(),
        ChangeStatus::Done(2)
    );
    assert_eq!(lines_of(&st), ["one 2", "2 three", "none"]);
}

#[test]
fn global_change_is_quiet_and_restores_position() {
    let mut st = state_with(&["x x", "x"]);
    let status = change(&mut st, "/x/y/g").unwrap();
    assert_eq!(status, ChangeStatus::Done(3));
    assert_eq!(lines_of(&st), ["y y", "y"]);
    assert_eq!(st.cur().unwrap().lineno, 0);
}

#[test]
fn ampersand_and_escapes_in_replacement() {
    let mut st = state_with(&["ab"]);
    let status = change(&mut st, r"/ab/<&> \& \\ \x/g").unwrap();
    assert_eq!(status, ChangeStatus::Done(1));
    assert_eq!(lines_of(&st), [r"<ab> & \ \x"]);
}

#[test]
fn identity_change_is_byte_noop() {
    let mut st = state_with(&["stable line", "another"]);
    let status = change(&mut st, "/stable/stable/g").unwrap();
    assert_eq!(status, ChangeStatus::Done(1));
    assert_eq!(lines_of(&st), ["stable line", "another"]);
    // running it again still works (idempotence at the byte level)
    let status = change(&mut st, "/stable/stable/g").unwrap();
    assert_eq!(status, ChangeStatus::Done(1));
    assert_eq!(lines_of(&st), ["stable line", "another"]);
}

#[test]
fn missing_delimiters_are_rejected() {
    let mut st = state_with(&["x"]);
    assert_eq!(
        change(&mut st, "no-delims").unwrap(),
        ChangeStatus::BadArgument
    );
}

#[test]
fn change_no_match_reports() {
    let mut st = state_with(&["abc"]);
    assert_eq!(change(&mut st, "/zzz/y/").unwrap(), ChangeStatus::NoMatch);
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("no match")));
}

#[test]
fn anchored_change_does_not_stick() {
    // replacing at a zero-width BoL match must advance, not loop
    let mut st = state_with(&["aa", "bb"]);
    let status = change(&mut st, "/^/> /g").unwrap();
    assert_eq!(status, ChangeStatus::Done(2));
    assert_eq!(lines_of(&st), ["> aa", "> bb"]);
}
