//! Smart reload: mutate the buffer in place from a running `diff`
//! child, preserving line attributes and bookmarks where possible.

use core_state::{BufferFlags, CoreResult, EditorState, LineFlags, PipeOpts, StatSnapshot};
use tracing::{debug, error, info};

/// One parsed `N[,M]{a|c|d}N[,M]` header of the default diff output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffHunk {
    pub action: u8,
    pub from_start: usize,
    pub from_end: usize,
    pub to_start: usize,
    pub to_end: usize,
}

/// Parse a diff change header; `None` for anything else (content
/// lines, separators, garbage).
pub fn parse_diff_header(line: &[u8]) -> Option<DiffHunk> {
    let s = std::str::from_utf8(line).ok()?.trim_end();
    let mut rest = s;
    let take_num = |r: &mut &str| -> Option<usize> {
        let end = r.find(|c: char| !c.is_ascii_digit()).unwrap_or(r.len());
        if end == 0 {
            return None;
        }
        let n = r[..end].parse().ok()?;
        *r = &r[end..];
        Some(n)
    };
    let from_start = take_num(&mut rest)?;
    let from_end = if let Some(stripped) = rest.strip_prefix(',') {
        rest = stripped;
        take_num(&mut rest)?
    } else {
        from_start
    };
    let action = *rest.as_bytes().first()?;
    if !matches!(action, b'a' | b'c' | b'd') {
        return None;
    }
    rest = &rest[1..];
    let to_start = take_num(&mut rest)?;
    let to_end = if let Some(stripped) = rest.strip_prefix(',') {
        rest = stripped;
        take_num(&mut rest)?
    } else {
        to_start
    };
    if !rest.is_empty() {
        return None;
    }
    Some(DiffHunk {
        action,
        from_start,
        from_end,
        to_start,
        to_end,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffState {
    Header,
    Add,
    Delete,
    Change,
}

/// Reload the current buffer from disk by applying `diff` output
/// line by line.
///
/// The buffer's full content is piped into `diff - <file>` and the
/// resulting a/c/d script replayed against the line list: inserted
/// lines arrive with CHANGED clear (they match the disk now), deleted
/// lines drop their bookmarks first, and untouched lines keep their
/// attributes with CHANGED folded into the sticky ALTERED. The saved
/// cursor line number is shifted over earlier insertions and
/// deletions and restored at the end. An error leaves the partially
/// applied buffer with CHANGED raised.
pub fn reload_bydiff(state: &mut EditorState) -> CoreResult<()> {
    let fix_cr = state.opts.fix_cr;
    let tabsize = state.opts.tabsize;
    let text_rows = state.text_rows;
    let (fname, mut original_lineno) = {
        let buffer = state.cur()?;
        if buffer.is_special() {
            return Ok(());
        }
        let Some(path) = buffer.path.clone() else {
            return Ok(());
        };
        (path.to_string_lossy().into_owned(), buffer.lineno)
    };

    // refresh the stat snapshot first; an unreadable file aborts
    match std::fs::metadata(&fname) {
        Ok(meta) => {
            let buffer = state.cur_mut()?;
            buffer
                .flags
                .set(BufferFlags::READ_ONLY, meta.permissions().readonly());
            buffer.stat = Some(StatSnapshot::from_metadata(&meta));
        }
        Err(e) => {
            state.tracemsg(format!("Cannot reload file [{fname}]: {e}"));
            state.cur_mut()?.flags.insert(BufferFlags::SCRATCH);
            return Err(e.into());
        }
    }

    let argstr = if fix_cr {
        format!("diff --strip-trailing-cr - {fname}")
    } else {
        format!("diff - {fname}")
    };
    if let Err(e) = core_pipe::read_pipe(
        state,
        "*notused*",
        "diff",
        &argstr,
        PipeOpts::NO_SCRATCH | PipeOpts::IN_OUT | PipeOpts::IN_REAL_ALL,
    ) {
        state.tracemsg("reload failed");
        error!(target: "diff", error = %e, "diff_launch_failed");
        return Err(e);
    }

    let ri = state.ring.current_index();
    // position at TOP; the hunk targets are absolute line numbers
    {
        let buffer = state.cur_mut()?;
        buffer.curr = buffer.lines.top();
        buffer.lineno = 0;
    }

    let mut dstate = DiffState::Header;
    let mut cnt_from = 0usize;
    let mut cnt_to = 0usize;
    let mut actions = 0usize;
    let mut failed = false;

    'drain: loop {
        let has_output = state
            .ring
            .get(ri)
            .is_some_and(|b| b.child.as_ref().is_some_and(|c| c.output.is_some()));
        if !has_output {
            break;
        }
        match core_pipe::readout_pipe(state, ri) {
            core_pipe::PollStatus::Idle => break,
            core_pipe::PollStatus::Error => {
                failed = true;
                break;
            }
            core_pipe::PollStatus::Progress => {}
        }
        let row: Vec<u8> = {
            let Some(pipe) = state.ring.get(ri).and_then(|b| b.child.as_ref()) else {
                break;
            };
            pipe.readbuf.clone()
        };
        if row.is_empty() {
            continue;
        }
        let content = row.strip_suffix(b"\n").unwrap_or(&row);

        match dstate {
            DiffState::Header => {
                actions += 1;
                let Some(hunk) = parse_diff_header(content) else {
                    debug!(target: "diff", "unparseable_header");
                    failed = true;
                    break 'drain;
                };
                dstate = match hunk.action {
                    b'a' => DiffState::Add,
                    b'd' => DiffState::Delete,
                    _ => DiffState::Change,
                };
                cnt_to = hunk.to_end + 1 - hunk.to_start;
                cnt_from = hunk.from_end + 1 - hunk.from_start;
                let target = hunk.to_start;
                let buffer = state.cur_mut()?;
                let Some(id) = buffer.goto_lineno(target) else {
                    error!(target: "diff", target, "hunk_target_out_of_range");
                    failed = true;
                    break 'drain;
                };
                buffer.curr = id;
                buffer.lineno = target;
                // shift the remembered cursor over edits above it
                match hunk.action {
                    b'a' if target < original_lineno => original_lineno += cnt_to,
                    b'd' if target < original_lineno => {
                        original_lineno = original_lineno.saturating_sub(cnt_from);
                    }
                    b'c' if target < original_lineno => {
                        if cnt_to > cnt_from {
                            original_lineno += cnt_to - cnt_from;
                        } else {
                            original_lineno =
                                original_lineno.saturating_sub(cnt_from - cnt_to);
                        }
                    }
                    _ => {}
                }
            }
            DiffState::Add => {
                if content.first() == Some(&b'>') && cnt_to > 0 && content.len() >= 2 {
                    let text = content.get(2..).unwrap_or(b"");
                    let buffer = state.cur_mut()?;
                    // the header positioned the cursor on the line the
                    // additions precede; keep it there while they pile
                    // up in order
                    let curr = buffer.curr;
                    let new = buffer.lines.insert_before(curr, text)?;
                    buffer.line_mut(new).flags.remove(LineFlags::CHANGED);
                    buffer.num_lines += 1;
                    buffer.lineno += 1;
                    cnt_to -= 1;
                    if cnt_to == 0 {
                        dstate = DiffState::Header;
                    }
                } else {
                    error!(target: "diff", "invalid_add_line");
                    failed = true;
                    break 'drain;
                }
            }
            DiffState::Delete => {
                if content.first() == Some(&b'<') && cnt_from > 0 {
                    let doomed = {
                        let buffer = state.cur()?;
                        buffer
                            .lines
                            .next(buffer.curr)
                            .filter(|&id| buffer.lines.is_text(id))
                    };
                    match doomed {
                        Some(id) => {
                            state.clear_line_bookmark(ri, id);
                            let buffer = state.cur_mut()?;
                            buffer.lines.remove(id);
                            buffer.num_lines -= 1;
                        }
                        None => {
                            error!(target: "diff", "delete_past_end");
                            failed = true;
                            break 'drain;
                        }
                    }
                    cnt_from -= 1;
                    if cnt_from == 0 {
                        dstate = DiffState::Header;
                    }
                } else {
                    error!(target: "diff", "invalid_delete_line");
                    failed = true;
                    break 'drain;
                }
            }
            DiffState::Change => {
                if content.first() == Some(&b'<') && cnt_from > 0 {
                    let (doomed, is_text) = {
                        let buffer = state.cur()?;
                        let id = buffer.curr;
                        (id, buffer.lines.is_text(id))
                    };
                    if is_text {
                        state.clear_line_bookmark(ri, doomed);
                        let buffer = state.cur_mut()?;
                        buffer.curr = buffer.lines.remove(doomed);
                        buffer.num_lines -= 1;
                    } else {
                        error!(target: "diff", "change_delete_past_end");
                        failed = true;
                        break 'drain;
                    }
                    cnt_from -= 1;
                } else if content.first() == Some(&b'>') && cnt_to > 0 && content.len() >= 2 {
                    let text = content.get(2..).unwrap_or(b"");
                    let buffer = state.cur_mut()?;
                    let curr = buffer.curr;
                    let new = buffer.lines.insert_before(curr, text)?;
                    buffer.line_mut(new).flags.remove(LineFlags::CHANGED);
                    buffer.num_lines += 1;
                    buffer.lineno += 1;
                    cnt_to -= 1;
                } else if content.first() == Some(&b'-') && cnt_from == 0 {
                    // the --- separator between the two halves
                } else {
                    error!(target: "diff", "invalid_change_line");
                    failed = true;
                    break 'drain;
                }
                if cnt_from == 0 && cnt_to == 0 {
                    dstate = DiffState::Header;
                }
            }
        }
    }
    // a hunk left half-applied counts as failure
    if dstate != DiffState::Header {
        failed = true;
    }

    {
        let buffer = state.cur_mut()?;
        buffer.flags.remove(
            BufferFlags::DISK_CHANGED
                | BufferFlags::SCRATCH
                | BufferFlags::READ_ONLY
                | BufferFlags::CHANGED,
        );
    }

    if failed {
        let buffer = state.cur_mut()?;
        buffer.curr = buffer.lines.bottom();
        buffer.lineno = buffer.num_lines + 1;
        buffer.flags.insert(BufferFlags::CHANGED);
    } else {
        let buffer = state.cur_mut()?;
        let lineno = original_lineno.min(buffer.num_lines + 1);
        match buffer.goto_lineno(lineno) {
            Some(id) => {
                buffer.set_position(lineno, id, tabsize);
            }
            None => {
                buffer.curr = buffer.lines.bottom();
                buffer.lineno = buffer.num_lines + 1;
            }
        }
        buffer.focus_center(text_rows);
    }

    if state.select_ri == Some(ri) {
        state.recover_selection();
    }

    // reap the diff child
    core_pipe::finish_stream(state, ri);

    if failed {
        error!(target: "diff", actions, "reload_failed");
        state.tracemsg("reload failed");
        return Ok(());
    }
    if actions > 0 {
        state.tracemsg("reload done");
    } else {
        state.tracemsg("identical");
    }
    // untouched lines that still carry CHANGED were changed before
    // the reload and match the disk now: fold into ALTERED
    let buffer = state.cur_mut()?;
    let ids: Vec<_> = buffer.lines.iter_text().collect();
    for id in ids {
        let line = buffer.line_mut(id);
        if line.flags.contains(LineFlags::CHANGED) {
            line.flags.remove(LineFlags::CHANGED);
            line.flags.insert(LineFlags::ALTERED);
        }
    }
    info!(target: "diff", actions, "reload_done");
    Ok(())
}
