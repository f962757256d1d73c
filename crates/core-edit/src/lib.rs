//! Edit primitives: cursor movement, character and line edits,
//! selection operations and block tools.
//!
//! Every mutation goes through the line splice primitive and keeps
//! the change-tracking invariant: the touched line gets CHANGED, the
//! owning buffer gets CHANGED, and structural removals clear
//! bookmarks through the bookmark interface first.

mod block;
pub mod cursor;
mod select_ops;
mod text;

pub use block::{
    cut_block, indent_right, join_block, left_cut_block, pad_block, pad_line, shift_left,
    shift_right, split_block, unindent_left,
};
pub use select_ops::{
    cp_select, go_select_first, go_select_last, line_select, mv_select, over_select, rm_select,
    select_all,
};
pub use text::{
    del2bol, delback_char, delete_char, delete_line, deleol, duplicate, insert_chars, join_line,
    prefix_blanks, split_line, type_text,
};
