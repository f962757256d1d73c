//! Selection operations: growing/shrinking the run, and copying,
//! moving, removing or overwriting the selected lines.
//!
//! Hidden lines inside the run are never copied, moved or removed;
//! they silently lose their SELECTED bit instead, so the engines only
//! ever touch what the user can see.

use core_line::LineFlags;
use core_state::{BufferFlags, CoreResult, EditorState, LineId};
use tracing::debug;

/// Toggle-extend the selection at the focus line. The first call in a
/// buffer starts a fresh run; a call on a selected line shrinks the
/// run towards its nearer border; a call outside grows the run
/// towards the watch line.
pub fn line_select(state: &mut EditorState) -> bool {
    let ri = state.ring.current_index();
    {
        let Ok(buffer) = state.cur() else {
            return false;
        };
        if !buffer.lines.is_text(buffer.curr) {
            return false;
        }
    }
    if state.select_ri != Some(ri) {
        state.reset_select();
        state.select_ri = Some(ri);
        let buffer = state.cur_mut().expect("current buffer open");
        let lineno = buffer.lineno;
        let curr = buffer.curr;
        buffer.flags.remove(BufferFlags::CMDLINE);
        buffer.line_mut(curr).flags.insert(LineFlags::SELECTED);
        state.select_w = lineno;
        return true;
    }

    let watch = state.select_w;
    let buffer = state.cur_mut().expect("current buffer open");
    buffer.flags.remove(BufferFlags::CMDLINE);
    let curr = buffer.curr;
    let selected = |b: &core_state::Buffer, id: LineId| {
        b.lines.is_text(id) && b.lines.line(id).flags.contains(LineFlags::SELECTED)
    };

    if buffer.line(curr).flags.contains(LineFlags::SELECTED) {
        // shrink: find the nearer border, drop the other side
        let mut up = buffer.lines.prev(curr);
        let mut down = buffer.lines.next(curr);
        loop {
            let u = up.filter(|&id| selected(buffer, id));
            let d = down.filter(|&id| selected(buffer, id));
            match (u, d) {
                (Some(u_id), Some(d_id)) => {
                    up = buffer.lines.prev(u_id);
                    down = buffer.lines.next(d_id);
                }
                _ => break,
            }
        }
        let upper_is_longer = up.is_some_and(|id| selected(buffer, id));
        if upper_is_longer {
            let mut id = buffer.lines.next(curr);
            while let Some(n) = id.filter(|&n| selected(buffer, n)) {
                buffer.line_mut(n).flags.remove(LineFlags::SELECTED);
                id = buffer.lines.next(n);
            }
        } else {
            let mut id = buffer.lines.prev(curr);
            while let Some(p) = id.filter(|&p| selected(buffer, p)) {
                buffer.line_mut(p).flags.remove(LineFlags::SELECTED);
                id = buffer.lines.prev(p);
            }
        }
    } else {
        // grow towards the side the watch line suggests
        let grow_up_first = watch < buffer.lineno;
        let mut direction = None;
        for up in [grow_up_first, !grow_up_first] {
            let mut id = if up {
                buffer.lines.prev(curr)
            } else {
                buffer.lines.next(curr)
            };
            while let Some(n) = id.filter(|&n| buffer.lines.is_text(n)) {
                if selected(buffer, n) {
                    direction = Some(up);
                    break;
                }
                id = if up {
                    buffer.lines.prev(n)
                } else {
                    buffer.lines.next(n)
                };
            }
            if direction.is_some() {
                break;
            }
        }
        match direction {
            Some(true) => {
                let mut id = buffer.lines.prev(curr);
                while let Some(p) = id.filter(|&p| buffer.lines.is_text(p) && !selected(buffer, p))
                {
                    buffer.line_mut(p).flags.insert(LineFlags::SELECTED);
                    id = buffer.lines.prev(p);
                }
            }
            Some(false) => {
                let mut id = buffer.lines.next(curr);
                while let Some(n) = id.filter(|&n| buffer.lines.is_text(n) && !selected(buffer, n))
                {
                    buffer.line_mut(n).flags.insert(LineFlags::SELECTED);
                    id = buffer.lines.next(n);
                }
            }
            None => {}
        }
    }

    let curr = buffer.curr;
    buffer.line_mut(curr).flags.insert(LineFlags::SELECTED);
    state.select_w = state.cur().expect("current buffer open").lineno;
    true
}

/// Select every line of the current buffer (visible or not) without
/// touching filter bits.
pub fn select_all(state: &mut EditorState) -> bool {
    state.reset_select();
    let ri = state.ring.current_index();
    let Ok(buffer) = state.cur_mut() else {
        return false;
    };
    if buffer.num_lines == 0 {
        return true;
    }
    let ids: Vec<LineId> = buffer.lines.iter_text().collect();
    let mut visible = 0;
    for id in ids {
        buffer.line_mut(id).flags.insert(LineFlags::SELECTED);
        if !buffer.is_hidden(id) {
            visible += 1;
        }
    }
    state.select_ri = Some(ri);
    state.select_w = 1;
    if visible == 0 {
        state.tracemsg("file is not empty, but selected lines are not visible");
    }
    true
}

/// Move the focus to the first visible line of the selection.
pub fn go_select_first(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let Some((id, lineno)) = state.selection_first_line() else {
        state.tracemsg("no selection");
        return false;
    };
    let ri = state.select_ri.expect("selection owner exists");
    let Some(buffer) = state.ring.get_mut(ri) else {
        return false;
    };
    let (id, lineno) = if buffer.is_hidden(id) {
        let (next, cnt) = buffer.next_visible(id);
        (next, lineno + cnt)
    } else {
        (id, lineno)
    };
    if buffer.lines.is_text(id) && buffer.line(id).flags.contains(LineFlags::SELECTED) {
        state.ring.set_current(ri);
        let buffer = state.ring.get_mut(ri).expect("selection buffer open");
        buffer.set_position(lineno, id, tabsize);
        true
    } else {
        state.tracemsg("selection is not visible");
        false
    }
}

/// Move the focus to the last visible line of the selection.
pub fn go_select_last(state: &mut EditorState) -> bool {
    let tabsize = state.opts.tabsize;
    let Some((id, lineno)) = state.selection_last_line() else {
        state.tracemsg("no selection");
        return false;
    };
    let ri = state.select_ri.expect("selection owner exists");
    let Some(buffer) = state.ring.get_mut(ri) else {
        return false;
    };
    let (id, lineno) = if buffer.is_hidden(id) {
        let (prev, cnt) = buffer.prev_visible(id);
        (prev, lineno.saturating_sub(cnt))
    } else {
        (id, lineno)
    };
    if buffer.lines.is_text(id) && buffer.line(id).flags.contains(LineFlags::SELECTED) {
        state.ring.set_current(ri);
        let buffer = state.ring.get_mut(ri).expect("selection buffer open");
        buffer.set_position(lineno, id, tabsize);
        true
    } else {
        state.tracemsg("selection is not visible");
        false
    }
}

/// Visible selection lines as (id, bytes, flags) snapshots, clearing
/// nothing. Used by the cross-buffer engines.
fn snapshot_selection(state: &EditorState) -> Vec<(LineId, Vec<u8>, LineFlags)> {
    let Some(ri) = state.select_ri else {
        return Vec::new();
    };
    let Some(buffer) = state.ring.get(ri) else {
        return Vec::new();
    };
    let Some((first, _)) = state.selection_first_line() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut id = Some(first);
    while let Some(n) = id {
        if !buffer.lines.is_text(n) || !buffer.lines.line(n).flags.contains(LineFlags::SELECTED) {
            break;
        }
        out.push((
            n,
            buffer.lines.line(n).content().to_vec(),
            buffer.lines.line(n).flags,
        ));
        id = buffer.lines.next(n);
    }
    out
}

/// Copy the visible selection lines after the focus line; the copies
/// become the new selection.
pub fn cp_select(state: &mut EditorState) -> CoreResult<bool> {
    let Some(src_ri) = state.select_ri else {
        state.tracemsg("no selection");
        return Ok(false);
    };
    let target_ri = state.ring.current_index();
    {
        let buffer = state.cur()?;
        if buffer.flags.contains(BufferFlags::NO_ADD_LINE) {
            state.tracemsg("no line addition in this buffer");
            return Ok(false);
        }
    }
    {
        // target conflict: inserting inside the selection run would
        // duplicate endlessly in the original; refuse the same way
        let buffer = state.cur()?;
        let t = buffer.curr;
        let inside = buffer.line(t).flags.contains(LineFlags::SELECTED)
            && buffer
                .lines
                .next(t)
                .is_some_and(|n| buffer.line(n).flags.contains(LineFlags::SELECTED));
        if buffer.line(t).is_bottom() || inside {
            state.tracemsg("selection copy: target conflict");
            return Ok(false);
        }
    }

    let rows = snapshot_selection(state);
    if rows.is_empty() {
        state.tracemsg("no selection");
        return Ok(false);
    }
    let hidden: Vec<bool> = {
        let src = state.ring.get(src_ri).expect("selection buffer open");
        rows.iter().map(|(id, _, _)| src.is_hidden(*id)).collect()
    };
    // the source run loses its SELECTED bits either way
    if let Some(src) = state.ring.get_mut(src_ri) {
        for (id, _, _) in &rows {
            src.lines.line_mut(*id).flags.remove(LineFlags::SELECTED);
        }
    }

    let buffer = state.ring.get_mut(target_ri).expect("current buffer open");
    let mut at = buffer.curr;
    let mut count = 0usize;
    for ((_, bytes, flags), hide) in rows.iter().zip(hidden) {
        if hide {
            continue;
        }
        at = buffer.lines.append(at, bytes)?;
        let line = buffer.line_mut(at);
        line.flags = *flags;
        line.set_bookmark(0);
        line.unhide(LineFlags::HIDE_MASK.bits());
        line.flags.insert(LineFlags::CHANGED | LineFlags::SELECTED);
        count += 1;
    }
    buffer.num_lines += count;
    if count > 0 {
        buffer.flags.insert(BufferFlags::CHANGED);
    }
    state.select_ri = Some(target_ri);
    debug!(target: "edit", count, "selection_copied");
    Ok(true)
}

/// Remove the visible selection lines and reset the selection.
pub fn rm_select(state: &mut EditorState) -> CoreResult<bool> {
    let Some(ri) = state.select_ri else {
        state.tracemsg("no selection");
        return Ok(false);
    };
    if state
        .ring
        .get(ri)
        .is_some_and(|b| b.flags.contains(BufferFlags::NO_DEL_LINE))
    {
        state.tracemsg("no line delete in this buffer");
        return Ok(false);
    }
    let Some((first, first_no)) = state.selection_first_line() else {
        state.tracemsg("no selection");
        return Ok(false);
    };
    let rows = snapshot_selection(state);
    for (id, _, _) in &rows {
        state.clear_line_bookmark(ri, *id);
    }
    let tabsize = state.opts.tabsize;
    let buffer = state.ring.get_mut(ri).expect("selection buffer open");

    // relocate the cursor above the doomed run first
    if buffer
        .line(buffer.curr)
        .flags
        .contains(LineFlags::SELECTED)
    {
        let (prev, cnt) = buffer.prev_visible(first);
        buffer.curr = prev;
        buffer.lineno = first_no.saturating_sub(cnt);
        buffer.lncol = buffer.col_at(prev, buffer.curpos, tabsize);
    }

    let mut count = 0usize;
    let mut id = first;
    while buffer.lines.is_text(id) && buffer.line(id).flags.contains(LineFlags::SELECTED) {
        if buffer.is_hidden(id) {
            buffer.line_mut(id).flags.remove(LineFlags::SELECTED);
            let Some(next) = buffer.lines.next(id) else {
                break;
            };
            id = next;
        } else {
            id = buffer.lines.remove(id);
            count += 1;
        }
    }
    if first_no < buffer.lineno {
        buffer.lineno -= count;
    }
    buffer.num_lines -= count;
    if count > 0 {
        buffer.flags.insert(BufferFlags::CHANGED);
    }
    state.select_ri = None;
    state.select_w = 0;
    debug!(target: "edit", count, "selection_removed");
    Ok(true)
}

/// Move the visible selection lines after the focus line. An adjacent
/// move (the run already sits right after the target) ends up a
/// no-op by construction of the relink. Depending on options the
/// moved lines either stay selected or the selection resets.
pub fn mv_select(state: &mut EditorState) -> CoreResult<bool> {
    let Some(src_ri) = state.select_ri else {
        state.tracemsg("no selection");
        return Ok(false);
    };
    let target_ri = state.ring.current_index();
    {
        let buffer = state.cur()?;
        if buffer.flags.contains(BufferFlags::NO_ADD_LINE) {
            state.tracemsg("no line addition in this buffer");
            return Ok(false);
        }
        if buffer.line(buffer.curr).flags.contains(LineFlags::SELECTED) {
            state.tracemsg("selection move conflict: target line in selection");
            return Ok(false);
        }
    }
    if state
        .ring
        .get(src_ri)
        .is_some_and(|b| b.flags.contains(BufferFlags::NO_DEL_LINE))
    {
        state.tracemsg("no line delete in this buffer");
        return Ok(false);
    }
    let Some((first, first_no)) = state.selection_first_line() else {
        state.tracemsg("no selection");
        return Ok(false);
    };
    let move_reset = state.opts.move_reset;
    let tabsize = state.opts.tabsize;

    let count = if src_ri == target_ri {
        let buffer = state.ring.get_mut(target_ri).expect("current buffer open");
        let mut count = 0usize;
        let mut target = buffer.curr;
        let mut id = first;
        while buffer.lines.is_text(id) && buffer.line(id).flags.contains(LineFlags::SELECTED) {
            let next = buffer.lines.next(id);
            if move_reset {
                buffer.line_mut(id).flags.remove(LineFlags::SELECTED);
            }
            if !buffer.is_hidden(id) {
                buffer.lines.move_after(id, target);
                let line = buffer.line_mut(id);
                line.set_bookmark(0);
                line.unhide(LineFlags::HIDE_MASK.bits());
                line.flags.insert(LineFlags::CHANGED);
                target = id;
                count += 1;
            }
            match next {
                Some(n) => id = n,
                None => break,
            }
        }
        // renumber from scratch: the relocation may have crossed the
        // cursor in either direction
        let curr = buffer.curr;
        let mut lineno = 0;
        for (no, tid) in buffer.lines.iter_text().enumerate() {
            if tid == curr {
                lineno = no + 1;
                break;
            }
        }
        buffer.lineno = lineno;
        buffer.lncol = buffer.col_at(curr, buffer.curpos, tabsize);
        count
    } else {
        // cross-buffer: arenas are per-buffer, so the move is a copy
        // into the target plus a removal from the source
        let rows = snapshot_selection(state);
        let hidden: Vec<bool> = {
            let src = state.ring.get(src_ri).expect("selection buffer open");
            rows.iter().map(|(id, _, _)| src.is_hidden(*id)).collect()
        };
        for ((id, _, _), hide) in rows.iter().zip(&hidden) {
            if !hide {
                state.clear_line_bookmark(src_ri, *id);
            }
        }
        {
            // relocate the source cursor off the doomed run
            let src = state.ring.get_mut(src_ri).expect("selection buffer open");
            if src.line(src.curr).flags.contains(LineFlags::SELECTED) {
                let (prev, cnt) = src.prev_visible(first);
                src.curr = prev;
                src.lineno = first_no.saturating_sub(cnt);
            }
            let mut removed = 0usize;
            let mut id = first;
            while src.lines.is_text(id) && src.line(id).flags.contains(LineFlags::SELECTED) {
                if src.is_hidden(id) {
                    src.line_mut(id).flags.remove(LineFlags::SELECTED);
                    let Some(next) = src.lines.next(id) else {
                        break;
                    };
                    id = next;
                } else {
                    id = src.lines.remove(id);
                    removed += 1;
                }
            }
            if first_no < src.lineno {
                src.lineno -= removed;
            }
            src.num_lines -= removed;
            if removed > 0 {
                src.flags.insert(BufferFlags::CHANGED);
            }
        }
        let buffer = state.ring.get_mut(target_ri).expect("current buffer open");
        let mut at = buffer.curr;
        let mut count = 0usize;
        for ((_, bytes, flags), hide) in rows.iter().zip(hidden) {
            if hide {
                continue;
            }
            at = buffer.lines.append(at, bytes)?;
            let line = buffer.line_mut(at);
            line.flags = *flags;
            line.set_bookmark(0);
            line.unhide(LineFlags::HIDE_MASK.bits());
            line.flags.insert(LineFlags::CHANGED);
            line.flags.set(LineFlags::SELECTED, !move_reset);
            count += 1;
        }
        buffer.num_lines += count;
        count
    };

    if count > 0 {
        if let Some(b) = state.ring.get_mut(src_ri) {
            b.flags.insert(BufferFlags::CHANGED);
        }
        if let Some(b) = state.ring.get_mut(target_ri) {
            b.flags.insert(BufferFlags::CHANGED);
        }
    }
    if move_reset {
        state.select_ri = None;
        state.select_w = 0;
    } else {
        state.select_ri = Some(target_ri);
        state.select_w = first_no + 1;
    }
    debug!(target: "edit", count, "selection_moved");
    Ok(true)
}


/// Overwrite the visible selection with the visible lines of the
/// current buffer, one to one: extra source lines are appended after
/// the run, leftover selection lines are deleted. Source and target
/// must be different buffers.
pub fn over_select(state: &mut EditorState) -> CoreResult<bool> {
    let src_ri = state.ring.current_index();
    let Some(target_ri) = state.select_ri else {
        state.tracemsg("no selection target");
        return Ok(false);
    };
    if target_ri == src_ri {
        state.tracemsg("selection target and source must be in different buffers");
        return Ok(false);
    }
    if state
        .ring
        .get(target_ri)
        .is_some_and(|b| b.flags.intersects(BufferFlags::CHANGE_MASK))
    {
        state.tracemsg("selection is in read/only buffer");
        return Ok(false);
    }

    // the source: every visible line of the current buffer
    let src_rows: Vec<Vec<u8>> = {
        let src = state.cur()?;
        let mut rows = Vec::new();
        let mut id = src.lines.top();
        loop {
            let (next, _) = src.next_visible(id);
            if !src.lines.is_text(next) {
                break;
            }
            rows.push(src.line(next).content().to_vec());
            id = next;
        }
        rows
    };

    // the target: the visible lines of the selection run
    let Some((first, first_no)) = state.selection_first_line() else {
        state.tracemsg("selection has no visible line(s)");
        return Ok(false);
    };
    let (run, last_no) = {
        let target = state.ring.get(target_ri).expect("selection buffer open");
        let mut run: Vec<LineId> = Vec::new();
        let mut no = first_no;
        let mut last_no = first_no;
        let mut id = first;
        while target.lines.is_text(id)
            && target.line(id).flags.contains(LineFlags::SELECTED)
        {
            if !target.is_hidden(id) {
                run.push(id);
                last_no = no;
            }
            match target.lines.next(id) {
                Some(n) => {
                    id = n;
                    no += 1;
                }
                None => break,
            }
        }
        (run, last_no)
    };
    if run.is_empty() {
        state.tracemsg("selection has no visible line(s)");
        return Ok(false);
    }
    // bookmarks on leftovers die with their lines
    for id in run.iter().skip(src_rows.len()) {
        state.clear_line_bookmark(target_ri, *id);
    }
    state.reset_select();

    let tabsize = state.opts.tabsize;
    let target = state.ring.get_mut(target_ri).expect("selection buffer open");
    let paired = run.len().min(src_rows.len());

    for (id, bytes) in run.iter().zip(src_rows.iter()) {
        let len = target.line(*id).len();
        target.line_mut(*id).splice(0, len, bytes)?;
        target.line_mut(*id).flags.insert(LineFlags::CHANGED);
    }

    if src_rows.len() > run.len() {
        // extra source lines go right after the run
        let anchor = *run.last().expect("run not empty");
        let mut at = anchor;
        let extras = src_rows.len() - run.len();
        for bytes in &src_rows[run.len()..] {
            at = target.lines.append(at, bytes)?;
            target.line_mut(at).flags.insert(LineFlags::CHANGED);
        }
        target.num_lines += extras;
        if last_no < target.lineno {
            target.lineno += extras;
        }
    } else if run.len() > src_rows.len() {
        // leftover selection lines are deleted; relocate the cursor
        // above the doomed range first
        let doomed_first_no = first_no + paired;
        if run[paired..].contains(&target.curr) {
            let (prev, cnt) = target.prev_visible(run[paired]);
            target.curr = prev;
            target.lineno = doomed_first_no.saturating_sub(cnt);
            target.lncol = target.col_at(prev, target.curpos, tabsize);
        }
        let mut deleted = 0usize;
        for id in &run[paired..] {
            target.lines.remove(*id);
            deleted += 1;
        }
        if doomed_first_no < target.lineno {
            target.lineno -= deleted;
        }
        target.num_lines -= deleted;
    }
    target.flags.insert(BufferFlags::CHANGED);

    state.ring.set_current(target_ri);
    debug!(target: "edit", overwritten = paired, "selection_overwritten");
    Ok(true)
}
