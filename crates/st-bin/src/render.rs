//! Minimal terminal display: trace rows, the visible text window and
//! a status/command line. Deliberately plain; the core does not
//! depend on anything here.

use anyhow::Result;
use core_events::Renderer;
use core_state::{BufferFlags, EditorState, LineFlags};
use crossterm::{cursor, execute, queue, style::Print, terminal};
use std::io::{Stdout, Write, stdout};

pub struct TerminalRenderer {
    out: Stdout,
}

impl TerminalRenderer {
    pub fn enter() -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out })
    }

    pub fn leave(&mut self) -> Result<()> {
        execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    fn draw_inner(&mut self, state: &mut EditorState) -> Result<()> {
        let cols = state.text_cols.max(20);
        let rows = state.text_rows.max(3);
        queue!(self.out, terminal::Clear(terminal::ClearType::All))?;

        // trace rows on top
        let trace: Vec<String> = state.trace.rows().map(str::to_string).collect();
        let trace_rows = trace.len().min(rows / 2);
        for (i, msg) in trace.iter().rev().take(trace_rows).rev().enumerate() {
            queue!(
                self.out,
                cursor::MoveTo(0, i as u16),
                Print(clip(msg, cols))
            )?;
        }

        let Ok(buffer) = state.cur() else {
            self.out.flush()?;
            return Ok(());
        };

        // the text window: walk up from the focus line, then paint
        // downwards over the remaining rows
        let text_top = trace_rows;
        let text_rows = rows - trace_rows;
        let mut first = buffer.curr;
        let mut first_no = buffer.lineno;
        for _ in 0..buffer.focus.min(text_rows.saturating_sub(1)) {
            let (prev, cnt) = buffer.prev_visible(first);
            if !buffer.lines.is_text(prev) {
                break;
            }
            first = prev;
            first_no = first_no.saturating_sub(cnt);
        }
        let mut id = first;
        let mut lineno = first_no;
        for row in 0..text_rows {
            if !buffer.lines.is_text(id) {
                if buffer.line(id).is_top() {
                    let (next, cnt) = buffer.next_visible(id);
                    if !buffer.lines.is_text(next) {
                        break;
                    }
                    id = next;
                    lineno += cnt;
                } else {
                    break;
                }
            }
            let line = buffer.line(id);
            let marker = if id == buffer.curr {
                '>'
            } else if line.flags.contains(LineFlags::SELECTED) {
                '|'
            } else if line.flags.contains(LineFlags::COLOR_TAG) {
                '*'
            } else {
                ' '
            };
            let text = String::from_utf8_lossy(line.content()).into_owned();
            let shown: String = text.chars().skip(buffer.lnoff).collect();
            queue!(
                self.out,
                cursor::MoveTo(0, (text_top + row) as u16),
                Print(format!("{lineno:>5}{marker}{}", clip(&shown, cols - 6)))
            )?;
            let (next, cnt) = buffer.next_visible(id);
            if !buffer.lines.is_text(next) {
                break;
            }
            id = next;
            lineno += cnt;
        }

        // status plus command line at the bottom
        let mut flags = String::new();
        if buffer.flags.contains(BufferFlags::CHANGED) {
            flags.push('*');
        }
        if buffer.flags.contains(BufferFlags::READ_ONLY) {
            flags.push('%');
        }
        if buffer.flags.contains(BufferFlags::DISK_CHANGED) {
            flags.push('!');
        }
        if buffer.child.is_some() {
            flags.push('&');
        }
        let status = format!(
            "{}{} {} L{}/{} C{} f{}",
            buffer.name,
            flags,
            if buffer.flags.contains(BufferFlags::CMDLINE) {
                "cmd"
            } else {
                "txt"
            },
            buffer.lineno,
            buffer.num_lines,
            buffer.curpos,
            buffer.flevel,
        );
        queue!(
            self.out,
            cursor::MoveTo(0, rows as u16),
            Print(clip(&status, cols))
        )?;
        let prompt = format!(":{}", state.cmdline);
        queue!(
            self.out,
            cursor::MoveTo(0, (rows + 1) as u16),
            Print(clip(&prompt, cols))
        )?;
        self.out.flush()?;
        Ok(())
    }
}

fn clip(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

impl Renderer for TerminalRenderer {
    fn draw(&mut self, state: &mut EditorState) {
        let _ = self.draw_inner(state);
    }
}
