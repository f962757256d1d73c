//! Search and replace: pattern normalisation, forward search with
//! anchor-aware stepping, the interactive change driver, word
//! highlighting and the cross-buffer locate scan.
//!
//! Patterns go through two fixed steps before compilation: delimiter
//! stripping (`/ ' " !`) and shorthand translation (`\d`, `\D`,
//! `\t`). The compiled handle lives on the buffer so switching
//! buffers keeps each one's search state independent.

mod change;
mod highlight;
mod locate;
mod pattern;
mod search;

pub use change::{ChangeKey, ChangeStatus, REPLACE_PROMPT, change, repeat_change};
pub use highlight::{color_tag, highlight_word, select_word, tag_focusline};
pub use locate::locate;
pub use pattern::{compile, compile_translated, cut_delimiters, expand_shorthands, is_anchored};
pub use search::{repeat_search, reset_search, search};
