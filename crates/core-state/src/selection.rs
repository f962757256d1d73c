//! Selection bookkeeping at the data-model level.
//!
//! A selection is a contiguous run of SELECTED-bitted lines in at
//! most one buffer. Operations that copy/move/remove selections live
//! in the edit layer; what belongs here is locating the run, clearing
//! it, and re-expanding it after surgery (smart reload).

use crate::{EditorState, LineFlags, LineId};

impl EditorState {
    /// Clear every SELECTED bit in the owning buffer and forget the
    /// selection.
    pub fn reset_select(&mut self) {
        let Some(ri) = self.select_ri else {
            return;
        };
        if let Some(buffer) = self.ring.get_mut(ri) {
            let ids: Vec<LineId> = buffer.lines.iter_text().collect();
            for id in ids {
                buffer
                    .lines
                    .line_mut(id)
                    .flags
                    .remove(LineFlags::SELECTED);
            }
        }
        self.select_ri = None;
        self.select_w = 0;
    }

    /// First line of the selection run and its line number.
    ///
    /// The scan starts at the owning buffer's current line and probes
    /// toward the watch side first, mirroring the original guess, so
    /// the cost is proportional to the distance between cursor and
    /// selection.
    pub fn selection_first_line(&self) -> Option<(LineId, usize)> {
        let ri = self.select_ri?;
        let buffer = self.ring.get(ri)?;
        let selected =
            |id: LineId| buffer.lines.line(id).flags.contains(LineFlags::SELECTED);
        let mut lp = buffer.curr;
        let mut lineno = buffer.lineno;
        if !buffer.lines.is_text(lp) || !selected(lp) {
            let up_first = self.select_w < buffer.lineno;
            let mut found = None;
            for direction in [up_first, !up_first] {
                let mut id = buffer.curr;
                let mut no = buffer.lineno;
                loop {
                    let step = if direction {
                        no = no.wrapping_sub(1);
                        buffer.lines.prev(id)
                    } else {
                        no += 1;
                        buffer.lines.next(id)
                    };
                    match step {
                        Some(n) if buffer.lines.is_text(n) => {
                            id = n;
                            if selected(n) {
                                found = Some((n, no));
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                if found.is_some() {
                    break;
                }
            }
            let (id, no) = found?;
            lp = id;
            lineno = no;
        }
        // walk up to the start of the run
        while let Some(prev) = buffer.lines.prev(lp) {
            if buffer.lines.is_text(prev) && selected(prev) {
                lp = prev;
                lineno -= 1;
            } else {
                break;
            }
        }
        Some((lp, lineno))
    }

    /// Last line of the selection run and its line number, scanning
    /// bottom-up.
    pub fn selection_last_line(&self) -> Option<(LineId, usize)> {
        let ri = self.select_ri?;
        let buffer = self.ring.get(ri)?;
        let mut lp = buffer.lines.prev(buffer.lines.bottom())?;
        let mut lineno = buffer.num_lines;
        while buffer.lines.is_text(lp) {
            if buffer.lines.line(lp).flags.contains(LineFlags::SELECTED) {
                return Some((lp, lineno));
            }
            lp = buffer.lines.prev(lp)?;
            lineno = lineno.checked_sub(1)?;
        }
        None
    }

    /// Make the selection contiguous again: every line between the
    /// first and last SELECTED line joins the run, and the watch is
    /// clamped into the range. Run after in-place surgery such as the
    /// diff reload.
    pub fn recover_selection(&mut self) {
        let Some(ri) = self.select_ri else {
            return;
        };
        let Some(buffer) = self.ring.get(ri) else {
            self.select_ri = None;
            return;
        };
        let mut first = None;
        for (no, id) in buffer.lines.iter_text().enumerate() {
            if buffer.lines.line(id).flags.contains(LineFlags::SELECTED) {
                first = Some(no + 1);
                break;
            }
        }
        let Some(first) = first else {
            self.select_ri = None;
            self.select_w = 0;
            return;
        };
        let Some((mut lp, mut lineno)) = self.selection_last_line() else {
            return;
        };
        let last = lineno;
        let buffer = self.ring.get_mut(ri).expect("selection buffer open");
        while lineno > first {
            buffer
                .lines
                .line_mut(lp)
                .flags
                .insert(LineFlags::SELECTED);
            match buffer.lines.prev(lp) {
                Some(prev) if buffer.lines.is_text(prev) => {
                    lp = prev;
                    lineno -= 1;
                }
                _ => break,
            }
        }
        self.select_w = self.select_w.clamp(first, last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buffer, Options};

    fn state_with(texts: &[&str]) -> EditorState {
        let mut st = EditorState::new(Options::default());
        let mut b = Buffer::scratch("*t*", 0);
        let mut at = b.lines.top();
        for t in texts {
            at = b.lines.append(at, t.as_bytes()).unwrap();
            b.num_lines += 1;
        }
        b.curr = b.lines.first_text().unwrap();
        b.lineno = 1;
        let ri = st.ring.insert(b).unwrap();
        st.ring.set_current(ri);
        st
    }

    fn select(st: &mut EditorState, range: std::ops::RangeInclusive<usize>) {
        let ri = st.ring.current_index();
        st.select_ri = Some(ri);
        st.select_w = *range.start();
        let b = st.ring.get_mut(ri).unwrap();
        let ids: Vec<_> = b.lines.iter_text().collect();
        for no in range {
            b.lines.line_mut(ids[no - 1]).flags.insert(LineFlags::SELECTED);
        }
    }

    #[test]
    fn first_and_last_of_run() {
        let mut st = state_with(&["a", "b", "c", "d", "e"]);
        select(&mut st, 2..=4);
        let (first, no) = st.selection_first_line().unwrap();
        assert_eq!(no, 2);
        let b = st.cur().unwrap();
        assert_eq!(b.lines.line(first).content(), b"b");
        let (_, last_no) = st.selection_last_line().unwrap();
        assert_eq!(last_no, 4);
    }

    #[test]
    fn first_line_found_from_outside_the_run() {
        let mut st = state_with(&["a", "b", "c", "d", "e"]);
        select(&mut st, 4..=5);
        // cursor stays on line 1, selection is below
        let (_, no) = st.selection_first_line().unwrap();
        assert_eq!(no, 4);
    }

    #[test]
    fn recover_fills_gaps() {
        let mut st = state_with(&["a", "b", "c", "d", "e"]);
        select(&mut st, 2..=4);
        let ri = st.ring.current_index();
        {
            let b = st.ring.get_mut(ri).unwrap();
            let ids: Vec<_> = b.lines.iter_text().collect();
            b.lines.line_mut(ids[2]).flags.remove(LineFlags::SELECTED);
        }
        st.recover_selection();
        let b = st.ring.get(ri).unwrap();
        let picked: Vec<bool> = b
            .lines
            .iter_text()
            .map(|id| b.lines.line(id).flags.contains(LineFlags::SELECTED))
            .collect();
        assert_eq!(picked, [false, true, true, true, false]);
    }

    #[test]
    fn recover_clears_empty_selection() {
        let mut st = state_with(&["a", "b"]);
        st.select_ri = Some(st.ring.current_index());
        st.recover_selection();
        assert_eq!(st.select_ri, None);
    }

    #[test]
    fn reset_clears_bits_and_owner() {
        let mut st = state_with(&["a", "b", "c"]);
        select(&mut st, 1..=3);
        st.reset_select();
        assert_eq!(st.select_ri, None);
        let b = st.cur().unwrap();
        assert!(
            b.lines
                .iter_text()
                .all(|id| !b.lines.line(id).flags.contains(LineFlags::SELECTED))
        );
    }
}
