//! `locate`: scan every regular buffer and collect matching lines
//! into the current buffer.

use crate::pattern;
use core_state::{CoreResult, EditorState};
use tracing::info;

/// Scan all regular (non-special) buffers for the pattern and append
/// `name:lineno: text` hits to the current buffer between a header
/// and an empty footer line. The cursor lands on the footer.
pub fn locate(state: &mut EditorState, expr: &str) -> CoreResult<()> {
    let re = match pattern::compile(expr, state.opts.case_sensitive) {
        Ok(re) => re,
        Err(e) => {
            state.tracemsg(e.to_string());
            return Err(e);
        }
    };

    // collect first: hits are appended to a buffer in the same ring
    let mut hits: Vec<Vec<u8>> = Vec::new();
    for ri in state.ring.open_indices().collect::<Vec<_>>() {
        let Some(buffer) = state.ring.get(ri) else {
            continue;
        };
        if buffer.is_special() {
            continue;
        }
        for (no, id) in buffer.lines.iter_text().enumerate() {
            let content = buffer.line(id).content();
            if re
                .find(content)
                .is_some_and(|m| m.start() < m.end() || m.end() == 0)
            {
                let mut row = format!("{}:{}:", buffer.name, no + 1).into_bytes();
                row.extend_from_slice(content);
                hits.push(row);
            }
        }
    }
    let count = hits.len();

    let buffer = state.cur_mut()?;
    let mut at = buffer
        .lines
        .insert_before(buffer.lines.bottom(), format!("locate {expr}").as_bytes())?;
    buffer.num_lines += 1;
    for row in hits {
        at = buffer.lines.append(at, &row)?;
        buffer.num_lines += 1;
    }
    buffer.lines.append(at, b"")?;
    buffer.num_lines += 1;

    let bottom = buffer.lines.bottom();
    buffer.curr = buffer.lines.prev(bottom).unwrap_or(bottom);
    buffer.lineno = buffer.num_lines;
    info!(target: "search", count, "locate_done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{Buffer, BufferFlags, Options};

    fn add_buffer(state: &mut EditorState, name: &str, texts: &[&str], special: bool) -> usize {
        let mut b = Buffer::scratch(name, 0);
        let mut at = b.lines.top();
        for t in texts {
            at = b.lines.append(at, t.as_bytes()).unwrap();
            b.num_lines += 1;
        }
        if special {
            b.flags.insert(BufferFlags::SPECIAL);
        }
        b.curr = b.lines.first_text().unwrap_or(b.lines.bottom());
        b.lineno = 1;
        let ri = state.ring.insert(b).unwrap();
        state.ring.set_current(ri);
        ri
    }

    #[test]
    fn locate_collects_across_buffers() {
        let mut st = EditorState::new(Options::default());
        add_buffer(&mut st, "a.txt", &["foo one", "bar", "foo two"], false);
        add_buffer(&mut st, "b.txt", &["nothing", "foo three"], false);
        add_buffer(&mut st, "*ignored*", &["foo hidden"], true);
        let out = add_buffer(&mut st, "*locate*", &[], false);
        st.ring.set_current(out);
        locate(&mut st, "foo").unwrap();
        let b = st.ring.get(out).unwrap();
        let rows: Vec<String> = b
            .lines
            .iter_text()
            .map(|id| String::from_utf8_lossy(b.lines.line(id).content()).into_owned())
            .collect();
        assert_eq!(
            rows,
            [
                "locate foo",
                "a.txt:1:foo one",
                "a.txt:3:foo two",
                "b.txt:2:foo three",
                ""
            ]
        );
        assert_eq!(b.num_lines, 5);
        assert_eq!(b.lineno, 5);
    }

    #[test]
    fn locate_bad_pattern_is_an_error() {
        let mut st = EditorState::new(Options::default());
        add_buffer(&mut st, "*locate*", &[], false);
        assert!(locate(&mut st, "a(").is_err());
        assert!(!st.trace.is_empty());
    }
}
