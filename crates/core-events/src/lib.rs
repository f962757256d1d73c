//! The cooperative event loop.
//!
//! Single-threaded by construction: input arrives over a channel from
//! whatever produces it (a terminal reader thread, a test), and every
//! mutation of editor state happens on the loop thread. A tick with
//! no input is the idle slot: children are polled every idle tick,
//! and on-disk files are re-stat'ed once the configured number of
//! idle ticks has passed. Children's output observed in a tick is
//! fully appended before the next input is dispatched.

use core_search::{ChangeKey, ChangeStatus};
use core_state::{BufferFlags, EditorState};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Duration;
use tracing::{debug, info};

/// Events consumed by the loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(KeyEvent),
    Resize(u16, u16),
    /// External request to repaint (a child changed some buffer).
    Redraw,
    Shutdown,
}

/// Where a key was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    CommandLine,
    TextArea,
    ReplacePrompt,
}

/// Key handling supplied by the embedding layer (the command table
/// and key tree live outside the core).
pub trait Dispatcher {
    /// A key while the command line has focus.
    fn command_key(&mut self, state: &mut EditorState, key: &KeyEvent);
    /// A key while the text area has focus.
    fn text_key(&mut self, state: &mut EditorState, key: &KeyEvent);
}

/// Screen painting supplied by the embedding layer.
pub trait Renderer {
    fn draw(&mut self, state: &mut EditorState);
    /// The terminal geometry changed; recompute and clamp.
    fn resized(&mut self, state: &mut EditorState, cols: u16, rows: u16) {
        state.text_cols = cols as usize;
        state.text_rows = (rows as usize).saturating_sub(2).max(1);
        let text_rows = state.text_rows;
        if let Ok(buffer) = state.cur_mut() {
            buffer.focus_avoid_border(text_rows);
        }
    }
}

/// Flush the internal error log into the tracing log; returns how
/// many entries were dumped.
pub fn errdump(state: &mut EditorState) -> usize {
    let n = state.errlog.dump();
    state.tracemsg(format!("error log: {n} entries dumped"));
    n
}

/// Route one key according to the buffer flags: the replace prompt
/// wins, then command-line focus, then the text area.
pub fn route_key<D: Dispatcher>(
    state: &mut EditorState,
    dispatcher: &mut D,
    key: &KeyEvent,
) -> Routed {
    if state.change.is_some() {
        let answer = match key.code {
            KeyCode::Char(c) => ChangeKey::from_char(c),
            KeyCode::Esc => Some(ChangeKey::Quit),
            _ => None,
        };
        if let Some(answer) = answer {
            match core_search::repeat_change(state, answer) {
                Ok(ChangeStatus::Pending) => {}
                Ok(_) | Err(_) => debug!(target: "events", "replace_session_closed"),
            }
        }
        return Routed::ReplacePrompt;
    }
    let on_cmdline = state
        .cur()
        .map(|b| b.flags.contains(BufferFlags::CMDLINE))
        .unwrap_or(true);
    if on_cmdline {
        dispatcher.command_key(state, key);
        Routed::CommandLine
    } else {
        dispatcher.text_key(state, key);
        Routed::TextArea
    }
}

/// Drive the editor until every buffer is closed or the channel shuts
/// down.
pub fn run_loop<D: Dispatcher, R: Renderer>(
    state: &mut EditorState,
    events: &Receiver<Event>,
    dispatcher: &mut D,
    renderer: &mut R,
) {
    let tick = Duration::from_millis(state.opts.tick_ms.max(10));
    let stat_period = state.opts.stat_period_ticks.max(1);
    let mut idle_ticks: u32 = 0;
    let mut pending_redraw = true;

    info!(target: "events", tick_ms = tick.as_millis() as u64, "loop_started");
    while state.ring.open_count() > 0 {
        if pending_redraw {
            renderer.draw(state);
            pending_redraw = false;
        }
        match events.recv_timeout(tick) {
            Err(RecvTimeoutError::Timeout) => {
                idle_ticks += 1;
                if idle_ticks >= stat_period {
                    // rare idle slots stat the disk files
                    idle_ticks = 0;
                    if core_io::check_files(state) {
                        pending_redraw = true;
                    }
                } else if core_pipe::background_pipes(state) {
                    pending_redraw = true;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                info!(target: "events", "input_channel_closed");
                break;
            }
            Ok(Event::Shutdown) => break,
            Ok(Event::Redraw) => pending_redraw = true,
            Ok(Event::Resize(cols, rows)) => {
                renderer.resized(state, cols, rows);
                pending_redraw = true;
            }
            Ok(Event::Input(key)) => {
                route_key(state, dispatcher, &key);
                pending_redraw = true;
            }
        }
    }
    info!(target: "events", "loop_finished");
}
