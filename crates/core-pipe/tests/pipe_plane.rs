//! End-to-end pipe plane behaviour with real children.

use core_pipe::{PollStatus, read_pipe, readout_pipe, stop_bg_process};
use core_state::{Buffer, EditorState, Options, PipeOpts};
use std::time::{Duration, Instant};

fn fresh_state() -> EditorState {
    let mut st = EditorState::new(Options::default());
    let ri = st.ring.insert(Buffer::scratch("*origin*", 0)).unwrap();
    st.ring.set_current(ri);
    st
}

fn lines_of_ri(st: &EditorState, ri: usize) -> Vec<String> {
    let b = st.ring.get(ri).unwrap();
    b.lines
        .iter_text()
        .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
        .collect()
}

/// Poll the buffer's child until its stream closes or the deadline
/// passes.
fn drain(st: &mut EditorState, ri: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let running = st
            .ring
            .get(ri)
            .is_some_and(|b| b.child.is_some());
        if !running {
            return;
        }
        if readout_pipe(st, ri) == PollStatus::Idle {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    panic!("child did not finish in time");
}

#[test]
fn echo_hello_appends_header_body_footer() {
    let mut st = fresh_state();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'echo hello'",
        PipeOpts::REDIR_ERR | PipeOpts::NO_BG,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    assert_eq!(
        lines_of_ri(&st, ri),
        ["$ sh -c 'echo hello'", "hello", ""]
    );
    assert_eq!(st.ring.get(ri).unwrap().num_lines, 3);
    assert!(st.ring.get(ri).unwrap().child.is_none());
}

#[test]
fn background_child_is_polled_to_completion() {
    let mut st = fresh_state();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'printf \"a\\nb\\n\"'",
        PipeOpts::REDIR_ERR,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    drain(&mut st, ri);
    let rows = lines_of_ri(&st, ri);
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[1..], ["a", "b", ""]);
}

#[test]
fn silent_mode_skips_header_and_footer() {
    let mut st = fresh_state();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'echo only'",
        PipeOpts::REDIR_ERR | PipeOpts::NO_BG | PipeOpts::SILENT,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    assert_eq!(lines_of_ri(&st, ri), ["only"]);
}

#[test]
fn child_input_is_fed_from_origin_buffer() {
    let mut st = fresh_state();
    {
        let b = st.cur_mut().unwrap();
        let mut at = b.lines.top();
        for t in ["one", "two", "three"] {
            at = b.lines.append(at, t.as_bytes()).unwrap();
            b.num_lines += 1;
        }
        b.curr = b.lines.first_text().unwrap();
        b.lineno = 1;
    }
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'wc -l'",
        PipeOpts::REDIR_ERR | PipeOpts::NO_BG | PipeOpts::IN_OUT | PipeOpts::IN_REAL_ALL,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    let rows = lines_of_ri(&st, ri);
    assert_eq!(rows[1].trim(), "3");
}

#[test]
fn second_launch_into_busy_buffer_is_refused() {
    let mut st = fresh_state();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'sleep 5'",
        PipeOpts::REDIR_ERR,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    assert!(st.ring.get(ri).unwrap().child.is_some());
    let origin = st.ring.current_index();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'echo nope'",
        PipeOpts::REDIR_ERR,
    )
    .unwrap();
    // refused: back at the origin, message queued
    assert_eq!(st.ring.current_index(), origin);
    let trace: Vec<&str> = st.trace.rows().collect();
    assert!(trace.iter().any(|m| m.contains("running background process")));
    st.ring.set_current(ri);
    stop_bg_process(&mut st).unwrap();
    assert!(st.ring.get(ri).unwrap().child.is_none());
}

#[test]
fn stop_kills_running_child() {
    let mut st = fresh_state();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'sleep 30'",
        PipeOpts::REDIR_ERR,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    let started = Instant::now();
    st.ring.set_current(ri);
    stop_bg_process(&mut st).unwrap();
    assert!(st.ring.get(ri).unwrap().child.is_none());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn origin_is_recorded_for_jump_back() {
    let mut st = fresh_state();
    let origin = st.ring.current_index();
    read_pipe(
        &mut st,
        "*sh*",
        "/bin/sh",
        "sh -c 'echo x'",
        PipeOpts::REDIR_ERR | PipeOpts::NO_BG,
    )
    .unwrap();
    let ri = st.ring.find_scratch_name("*sh*").unwrap();
    assert_eq!(st.ring.get(ri).unwrap().origin, Some(origin));
}
