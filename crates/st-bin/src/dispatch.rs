//! Key dispatch: a small command-line editor plus the text-area key
//! bindings, routing into the core operations.
//!
//! The original drives this through a configurable command table and
//! key tree; here a fixed mapping is enough to exercise every core
//! operation.

use core_events::Dispatcher;
use core_state::{BufferFlags, EditorState};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

#[derive(Default)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    fn execute(&mut self, state: &mut EditorState, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }
        let (name, args) = match input.split_once(char::is_whitespace) {
            Some((n, a)) => (n, a.trim()),
            None => (input, ""),
        };
        debug!(target: "main", name, args, "command");
        let result: core_state::CoreResult<()> = match name {
            "e" | "edit" | "open" => core_io::add_file(state, args).map(|_| ()),
            "w" | "save" => core_io::save_file(state, args),
            "wall" | "saveall" => core_io::save_all(state),
            "q" | "quit" => core_io::quit_file(state),
            "q!" | "drop" => core_io::drop_file(state),
            "next" => {
                state.ring.next_file();
                Ok(())
            }
            "prev" => {
                state.ring.prev_file();
                Ok(())
            }
            "hide" => {
                if let Ok(b) = state.cur_mut() {
                    b.flags.insert(BufferFlags::HIDDEN);
                }
                state.ring.next_file();
                Ok(())
            }
            "ring" | "ls" => core_io::list_buffers(state),
            "reload" => core_io::reload_file(state),
            "rediff" => core_io::reload_bydiff(state),
            "/" | "search" => {
                core_search::search(state, args);
                Ok(())
            }
            "n" | "repeat" => {
                core_search::repeat_search(state);
                Ok(())
            }
            "ch" | "change" => core_search::change(state, args).map(|_| ()),
            "all" => {
                core_filter::filter_all(state, args);
                Ok(())
            }
            "more" => {
                core_filter::filter_more(state, args);
                Ok(())
            }
            "less" => {
                core_filter::filter_less(state, args);
                Ok(())
            }
            "tmpall" => {
                core_filter::filter_tmp_all(state);
                Ok(())
            }
            "restrict" => {
                core_filter::filter_restrict(state);
                Ok(())
            }
            "expup" => {
                core_filter::filter_expand_up(state);
                Ok(())
            }
            "expdown" => {
                core_filter::filter_expand_down(state);
                Ok(())
            }
            "level+" => {
                core_filter::incr_filter_level(state);
                Ok(())
            }
            "level-" => {
                core_filter::decr_filter_level(state);
                Ok(())
            }
            "level2+" => {
                core_filter::incr2_filter_level(state);
                Ok(())
            }
            "level2-" => {
                core_filter::decr2_filter_level(state);
                Ok(())
            }
            "tomatch" => {
                core_filter::tomatch(state);
                Ok(())
            }
            "tag" => {
                core_search::color_tag(state, args);
                Ok(())
            }
            "tagline" => {
                core_search::tag_focusline(state);
                Ok(())
            }
            "high" => {
                core_search::highlight_word(state, args);
                Ok(())
            }
            "locate" => core_pipe::locate_cmd(state, args),
            "sh" => core_pipe::shell_cmd(state, args),
            "ish" => core_pipe::ishell_cmd(state, args),
            "make" => core_pipe::make_cmd(state, args),
            "find" => core_pipe::find_cmd(state, args),
            "fcmd" => core_pipe::filter_cmd(state, args),
            "fscmd" => core_pipe::filter_shadow_cmd(state, args),
            "stop" => core_pipe::stop_bg_process(state),
            "goto" => {
                if let Ok(n) = args.parse::<usize>() {
                    core_edit::cursor::goto_line(state, n);
                }
                Ok(())
            }
            "selall" => {
                core_edit::select_all(state);
                Ok(())
            }
            "unsel" => {
                state.reset_select();
                Ok(())
            }
            "cpsel" => core_edit::cp_select(state).map(|_| ()),
            "mvsel" => core_edit::mv_select(state).map(|_| ()),
            "rmsel" => core_edit::rm_select(state).map(|_| ()),
            "oversel" => core_edit::over_select(state).map(|_| ()),
            "selfirst" => {
                core_edit::go_select_first(state);
                Ok(())
            }
            "sellast" => {
                core_edit::go_select_last(state);
                Ok(())
            }
            "unindent" => core_edit::unindent_left(state).map(|_| ()),
            "indent" => core_edit::indent_right(state).map(|_| ()),
            "shleft" => core_edit::shift_left(state).map(|_| ()),
            "shright" => core_edit::shift_right(state).map(|_| ()),
            "pad" => core_edit::pad_block(state, args).map(|_| ()),
            "cut" => core_edit::cut_block(state, args).map(|_| ()),
            "lcut" => core_edit::left_cut_block(state, args).map(|_| ()),
            "splitblock" => core_edit::split_block(state, args).map(|_| ()),
            "joinblock" => core_edit::join_block(state, args).map(|_| ()),
            "bm" => {
                if let Ok(n) = args.parse::<u8>() {
                    state.set_bookmark(n);
                }
                Ok(())
            }
            "jump" => {
                if let Ok(n) = args.parse::<u8>() {
                    state.jump_to_bookmark(n);
                }
                Ok(())
            }
            "back" => {
                state.jump_back();
                Ok(())
            }
            "errdump" => {
                core_events::errdump(state);
                Ok(())
            }
            _ => {
                state.tracemsg(format!("unknown command [{name}]"));
                Ok(())
            }
        };
        if let Err(e) = result {
            state.tracemsg(e.to_string());
        }
    }
}

impl Dispatcher for CommandDispatcher {
    fn command_key(&mut self, state: &mut EditorState, key: &KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if let Ok(b) = state.cur_mut() {
                    b.flags.remove(BufferFlags::CMDLINE);
                }
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut state.cmdline);
                self.execute(state, &line);
            }
            KeyCode::Backspace => {
                state.cmdline.pop();
            }
            KeyCode::Char(c) => {
                if state.cmdline.len() < 255 {
                    state.cmdline.push(c);
                }
            }
            _ => {}
        }
    }

    fn text_key(&mut self, state: &mut EditorState, key: &KeyEvent) {
        use core_edit::cursor;
        let interactive = state
            .cur()
            .map(|b| b.flags.contains(BufferFlags::INTERACTIVE))
            .unwrap_or(false);
        let report = |state: &mut EditorState, r: core_state::CoreResult<()>| {
            if let Err(e) = r {
                state.tracemsg(e.to_string());
            }
        };
        match key.code {
            KeyCode::Esc => {
                if let Ok(b) = state.cur_mut() {
                    b.flags.insert(BufferFlags::CMDLINE);
                }
            }
            KeyCode::Left => cursor::go_left(state),
            KeyCode::Right => cursor::go_right(state),
            KeyCode::Up => cursor::go_up(state),
            KeyCode::Down => cursor::go_down(state),
            KeyCode::Home => cursor::go_home(state),
            KeyCode::End => cursor::go_end(state),
            KeyCode::PageUp => {
                for _ in 0..state.text_rows.saturating_sub(1) {
                    cursor::go_up(state);
                }
            }
            KeyCode::PageDown => {
                for _ in 0..state.text_rows.saturating_sub(1) {
                    cursor::go_down(state);
                }
            }
            KeyCode::Enter => {
                if interactive {
                    // forward the focus line to the PTY child
                    let line: Vec<u8> = state
                        .cur()
                        .map(|b| b.current_line().bytes().to_vec())
                        .unwrap_or_default();
                    let r = core_pipe::write_to_child(state, &line).map(|_| ());
                    report(state, r);
                } else {
                    let r = core_edit::split_line(state);
                    report(state, r);
                }
            }
            KeyCode::Backspace => {
                let r = core_edit::delback_char(state);
                report(state, r);
            }
            KeyCode::Delete => {
                let r = core_edit::delete_char(state);
                report(state, r);
            }
            KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => match c {
                's' => {
                    let r = core_io::save_file(state, "");
                    report(state, r);
                }
                'd' => {
                    let r = core_edit::duplicate(state);
                    report(state, r);
                }
                'k' => {
                    let r = core_edit::deleol(state);
                    report(state, r);
                }
                'u' => {
                    let r = core_edit::del2bol(state);
                    report(state, r);
                }
                'y' => {
                    let r = core_edit::delete_line(state);
                    report(state, r);
                }
                'l' => {
                    core_edit::line_select(state);
                }
                _ => {}
            },
            KeyCode::Char(c) => {
                let mut bytes = [0u8; 4];
                let s = c.encode_utf8(&mut bytes);
                let r = core_edit::insert_chars(state, s.as_bytes());
                report(state, r);
            }
            _ => {}
        }
    }
}
