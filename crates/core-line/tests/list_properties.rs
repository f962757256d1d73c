//! Property tests over the line-list invariants: every text line ends
//! with `\n`, the chain stays symmetric, and sentinel bounds hold
//! under arbitrary edit sequences.

use core_line::{LineId, LineList};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(usize, Vec<u8>),
    InsertBefore(usize, Vec<u8>),
    Remove(usize),
    MoveAfter(usize, usize),
    Splice(usize, usize, usize, Vec<u8>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let bytes = proptest::collection::vec(any::<u8>(), 0..20);
    prop_oneof![
        (any::<usize>(), bytes.clone()).prop_map(|(i, b)| Op::Append(i, b)),
        (any::<usize>(), bytes.clone()).prop_map(|(i, b)| Op::InsertBefore(i, b)),
        any::<usize>().prop_map(Op::Remove),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::MoveAfter(a, b)),
        (any::<usize>(), 0..64usize, 0..64usize, bytes)
            .prop_map(|(i, f, l, b)| Op::Splice(i, f, l, b)),
    ]
}

fn text_ids(list: &LineList) -> Vec<LineId> {
    list.iter_text().collect()
}

fn check_invariants(list: &LineList) {
    assert!(list.prev(list.top()).is_none(), "TOP must have no prev");
    assert!(list.next(list.bottom()).is_none(), "BOTTOM must have no next");
    // forward walk is the reverse of the backward walk
    let fwd = text_ids(list);
    let mut cur = list.prev(list.bottom());
    let mut back = Vec::new();
    while let Some(id) = cur {
        if !list.is_text(id) {
            break;
        }
        back.push(id);
        cur = list.prev(id);
    }
    back.reverse();
    assert_eq!(fwd, back, "chain must be symmetric");
    for id in fwd {
        let line = list.line(id);
        assert!(line.len() >= 1);
        assert_eq!(line.bytes().last(), Some(&b'\n'));
        assert!(
            !line.content().contains(&b'\n'),
            "no embedded newline in a single line"
        );
    }
}

proptest! {
    #[test]
    fn invariants_hold_under_random_edits(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut list = LineList::new();
        for op in ops {
            let ids = text_ids(&list);
            match op {
                Op::Append(i, b) => {
                    // TOP is a valid append anchor as well
                    let anchor = if ids.is_empty() || i % (ids.len() + 1) == 0 {
                        list.top()
                    } else {
                        ids[i % (ids.len() + 1) - 1]
                    };
                    // newlines inside the payload would break the
                    // one-line contract; callers split first
                    let clean: Vec<u8> = b.into_iter().filter(|&c| c != b'\n').collect();
                    list.append(anchor, &clean).unwrap();
                }
                Op::InsertBefore(i, b) => {
                    let anchor = if ids.is_empty() {
                        list.bottom()
                    } else {
                        ids[i % ids.len()]
                    };
                    let clean: Vec<u8> = b.into_iter().filter(|&c| c != b'\n').collect();
                    list.insert_before(anchor, &clean).unwrap();
                }
                Op::Remove(i) => {
                    if !ids.is_empty() {
                        list.remove(ids[i % ids.len()]);
                    }
                }
                Op::MoveAfter(a, b) => {
                    if !ids.is_empty() {
                        let src = ids[a % ids.len()];
                        let target = if b % (ids.len() + 1) == 0 {
                            list.top()
                        } else {
                            ids[b % (ids.len() + 1) - 1]
                        };
                        list.move_after(src, target);
                    }
                }
                Op::Splice(i, from, len, b) => {
                    if !ids.is_empty() {
                        let id = ids[i % ids.len()];
                        let clean: Vec<u8> = b.into_iter().filter(|&c| c != b'\n').collect();
                        // single-line contract: splice starts within content
                        let content_len = list.line(id).len() - 1;
                        let from = if content_len == 0 { 0 } else { from % (content_len + 1) };
                        list.line_mut(id).splice(from, len, &clean).unwrap();
                    }
                }
            }
            check_invariants(&list);
        }
    }
}
