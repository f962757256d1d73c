//! Arena-backed doubly linked line list.

use crate::{BOTTOM_MARK, Line, LineError, LineFlags, TOP_MARK};

const NIL: u32 = u32::MAX;

/// Index of a line inside its buffer's arena. Stable for the lifetime
/// of the line; slots are recycled after removal, so holding an id
/// across a `remove` of that same line is a caller bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(u32);

impl LineId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node {
    prev: u32,
    next: u32,
    line: Line,
}

/// The sentinel-bounded chain of lines owned by one buffer.
#[derive(Debug)]
pub struct LineList {
    nodes: Vec<Node>,
    free: Vec<u32>,
    top: LineId,
    bottom: LineId,
}

impl Default for LineList {
    fn default() -> Self {
        Self::new()
    }
}

impl LineList {
    /// Create an empty list: TOP linked directly to BOTTOM.
    pub fn new() -> Self {
        let nodes = vec![
            Node {
                prev: NIL,
                next: 1,
                line: Line::sentinel(TOP_MARK, LineFlags::TOP),
            },
            Node {
                prev: 0,
                next: NIL,
                line: Line::sentinel(BOTTOM_MARK, LineFlags::BOTTOM),
            },
        ];
        Self {
            nodes,
            free: Vec::new(),
            top: LineId(0),
            bottom: LineId(1),
        }
    }

    pub fn top(&self) -> LineId {
        self.top
    }

    pub fn bottom(&self) -> LineId {
        self.bottom
    }

    pub fn line(&self, id: LineId) -> &Line {
        &self.nodes[id.idx()].line
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut Line {
        &mut self.nodes[id.idx()].line
    }

    pub fn next(&self, id: LineId) -> Option<LineId> {
        match self.nodes[id.idx()].next {
            NIL => None,
            n => Some(LineId(n)),
        }
    }

    pub fn prev(&self, id: LineId) -> Option<LineId> {
        match self.nodes[id.idx()].prev {
            NIL => None,
            p => Some(LineId(p)),
        }
    }

    pub fn is_text(&self, id: LineId) -> bool {
        self.line(id).is_text()
    }

    /// First text line, if any.
    pub fn first_text(&self) -> Option<LineId> {
        let first = self.next(self.top)?;
        self.is_text(first).then_some(first)
    }

    /// Last text line, if any.
    pub fn last_text(&self) -> Option<LineId> {
        let last = self.prev(self.bottom)?;
        self.is_text(last).then_some(last)
    }

    fn alloc(&mut self, line: Line) -> Result<u32, LineError> {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot as usize] = Node {
                prev: NIL,
                next: NIL,
                line,
            };
            return Ok(slot);
        }
        if self.nodes.len() == self.nodes.capacity() {
            self.nodes
                .try_reserve(self.nodes.len().max(8))
                .map_err(|_| LineError::Capacity)?;
        }
        self.nodes.push(Node {
            prev: NIL,
            next: NIL,
            line,
        });
        Ok((self.nodes.len() - 1) as u32)
    }

    /// Insert a new line with `text` immediately after `after`.
    /// Appending after TOP prepends to the buffer. `after` must not be
    /// the BOTTOM sentinel; that case is redirected to an insert
    /// before it.
    pub fn append(&mut self, after: LineId, text: &[u8]) -> Result<LineId, LineError> {
        if after == self.bottom {
            return self.insert_before(self.bottom, text);
        }
        let id = self.alloc(Line::from_bytes(text))?;
        let next = self.nodes[after.idx()].next;
        self.nodes[id as usize].prev = after.0;
        self.nodes[id as usize].next = next;
        self.nodes[after.idx()].next = id;
        if next != NIL {
            self.nodes[next as usize].prev = id;
        }
        Ok(LineId(id))
    }

    /// Insert a new line with `text` immediately before `at`.
    pub fn insert_before(&mut self, at: LineId, text: &[u8]) -> Result<LineId, LineError> {
        if at == self.top {
            return self.append(self.top, text);
        }
        let id = self.alloc(Line::from_bytes(text))?;
        let prev = self.nodes[at.idx()].prev;
        self.nodes[id as usize].next = at.0;
        self.nodes[id as usize].prev = prev;
        self.nodes[at.idx()].prev = id;
        if prev != NIL {
            self.nodes[prev as usize].next = id;
        }
        Ok(LineId(id))
    }

    /// Unlink and free `id`, returning its successor (or the
    /// predecessor when the successor is missing). Sentinels are never
    /// removed; asking to returns the id unchanged.
    pub fn remove(&mut self, id: LineId) -> LineId {
        if !self.is_text(id) {
            return id;
        }
        let Node { prev, next, .. } = self.nodes[id.idx()];
        if prev != NIL {
            self.nodes[prev as usize].next = next;
        }
        if next != NIL {
            self.nodes[next as usize].prev = prev;
        }
        self.nodes[id.idx()].line = Line::from_bytes(b"");
        self.nodes[id.idx()].prev = NIL;
        self.nodes[id.idx()].next = NIL;
        self.free.push(id.0);
        if next != NIL { LineId(next) } else { LineId(prev) }
    }

    fn unlink(&mut self, id: LineId) {
        let Node { prev, next, .. } = self.nodes[id.idx()];
        if prev != NIL {
            self.nodes[prev as usize].next = next;
        }
        if next != NIL {
            self.nodes[next as usize].prev = prev;
        }
        self.nodes[id.idx()].prev = NIL;
        self.nodes[id.idx()].next = NIL;
    }

    /// Relink `src` so it follows `target`. Allocates nothing; handles
    /// the already-adjacent case as a cheap no-op.
    pub fn move_after(&mut self, src: LineId, target: LineId) {
        if src == target || !self.is_text(src) || self.nodes[target.idx()].next == src.0 {
            return;
        }
        self.unlink(src);
        let next = self.nodes[target.idx()].next;
        self.nodes[src.idx()].prev = target.0;
        self.nodes[src.idx()].next = next;
        self.nodes[target.idx()].next = src.0;
        if next != NIL {
            self.nodes[next as usize].prev = src.0;
        }
    }

    /// Relink `src` so it precedes `target`.
    pub fn move_before(&mut self, src: LineId, target: LineId) {
        if src == target || !self.is_text(src) || self.nodes[target.idx()].prev == src.0 {
            return;
        }
        self.unlink(src);
        let prev = self.nodes[target.idx()].prev;
        self.nodes[src.idx()].next = target.0;
        self.nodes[src.idx()].prev = prev;
        self.nodes[target.idx()].prev = src.0;
        if prev != NIL {
            self.nodes[prev as usize].next = src.0;
        }
    }

    /// Walk to the absolute line number `n` (1-based; 0 is TOP,
    /// `num_lines + 1` is BOTTOM) starting from TOP, BOTTOM or the
    /// caller's current position, whichever is the shortest walk.
    pub fn goto_lineno(
        &self,
        n: usize,
        num_lines: usize,
        current: (LineId, usize),
    ) -> Option<LineId> {
        if n > num_lines + 1 {
            return None;
        }
        if n == 0 {
            return Some(self.top);
        }
        if n == num_lines + 1 {
            return Some(self.bottom);
        }
        let (cur_id, cur_no) = current;
        if n == cur_no && self.is_text(cur_id) {
            return Some(cur_id);
        }

        let (mut id, mut at): (LineId, usize) = if n < cur_no {
            if n < cur_no - n {
                (self.top, 0)
            } else {
                (cur_id, cur_no)
            }
        } else if num_lines.saturating_sub(n) < n - cur_no {
            (self.bottom, num_lines + 1)
        } else {
            (cur_id, cur_no)
        };

        while at < n {
            id = self.next(id)?;
            at += 1;
        }
        while at > n {
            id = self.prev(id)?;
            at -= 1;
        }
        self.is_text(id).then_some(id)
    }

    /// Iterate text lines front to back.
    pub fn iter_text(&self) -> impl Iterator<Item = LineId> + '_ {
        let mut cur = self.next(self.top);
        std::iter::from_fn(move || {
            let id = cur?;
            if !self.is_text(id) {
                return None;
            }
            cur = self.next(id);
            Some(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(texts: &[&str]) -> (LineList, Vec<LineId>) {
        let mut list = LineList::new();
        let mut ids = Vec::new();
        let mut at = list.top();
        for t in texts {
            at = list.append(at, t.as_bytes()).unwrap();
            ids.push(at);
        }
        (list, ids)
    }

    fn collect(list: &LineList) -> Vec<String> {
        list.iter_text()
            .map(|id| String::from_utf8_lossy(list.line(id).content()).into_owned())
            .collect()
    }

    #[test]
    fn empty_list_links_top_to_bottom() {
        let list = LineList::new();
        assert_eq!(list.next(list.top()), Some(list.bottom()));
        assert_eq!(list.prev(list.bottom()), Some(list.top()));
        assert_eq!(list.prev(list.top()), None);
        assert_eq!(list.next(list.bottom()), None);
        assert!(list.first_text().is_none());
    }

    #[test]
    fn append_after_top_prepends() {
        let (mut list, _) = filled(&["b", "c"]);
        list.append(list.top(), b"a").unwrap();
        assert_eq!(collect(&list), ["a", "b", "c"]);
    }

    #[test]
    fn remove_returns_successor_and_recycles() {
        let (mut list, ids) = filled(&["a", "b", "c"]);
        let succ = list.remove(ids[1]);
        assert_eq!(succ, ids[2]);
        assert_eq!(collect(&list), ["a", "c"]);
        // the freed slot is reused for the next insertion
        let again = list.append(ids[0], b"B").unwrap();
        assert_eq!(again, ids[1]);
        assert_eq!(collect(&list), ["a", "B", "c"]);
    }

    #[test]
    fn remove_last_text_line_returns_bottom() {
        let (mut list, ids) = filled(&["only"]);
        let succ = list.remove(ids[0]);
        assert_eq!(succ, list.bottom());
    }

    #[test]
    fn sentinels_are_never_removed() {
        let mut list = LineList::new();
        assert_eq!(list.remove(list.top()), list.top());
        assert_eq!(list.remove(list.bottom()), list.bottom());
    }

    #[test]
    fn move_after_handles_adjacency() {
        let (mut list, ids) = filled(&["a", "b", "c"]);
        // already adjacent: no-op
        list.move_after(ids[1], ids[0]);
        assert_eq!(collect(&list), ["a", "b", "c"]);
        list.move_after(ids[0], ids[2]);
        assert_eq!(collect(&list), ["b", "c", "a"]);
    }

    #[test]
    fn move_before_relinks() {
        let (mut list, ids) = filled(&["a", "b", "c"]);
        list.move_before(ids[2], ids[0]);
        assert_eq!(collect(&list), ["c", "a", "b"]);
    }

    #[test]
    fn goto_lineno_bounds() {
        let (list, ids) = filled(&["a", "b", "c"]);
        let cur = (ids[1], 2);
        assert_eq!(list.goto_lineno(0, 3, cur), Some(list.top()));
        assert_eq!(list.goto_lineno(4, 3, cur), Some(list.bottom()));
        assert_eq!(list.goto_lineno(5, 3, cur), None);
        assert_eq!(list.goto_lineno(1, 3, cur), Some(ids[0]));
        assert_eq!(list.goto_lineno(3, 3, cur), Some(ids[2]));
        assert_eq!(list.goto_lineno(2, 3, cur), Some(ids[1]));
    }

    #[test]
    fn goto_lineno_on_empty_buffer() {
        let list = LineList::new();
        let cur = (list.top(), 0);
        // with no text lines, line 1 resolves to BOTTOM
        assert_eq!(list.goto_lineno(1, 0, cur), Some(list.bottom()));
    }
}
