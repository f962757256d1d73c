//! Language-aware function-fold recognisers.
//!
//! The C/C++ recogniser walks bottom-up: a closing brace opens an END
//! region, the walk then looks for the matching BEGIN and the header
//! above it. The script languages (Perl, Tcl, shell) walk top-down
//! from the header towards the closing brace; Python and plain text
//! keep only the header line itself.
//!
//! Classification is explicit per line: [`FoldClass`] names each
//! predicate the state machine consults, including the one-line-block
//! containment test the bottom-up walk needs in state END.

use crate::FilterAction;
use crate::apply;
use core_state::{Buffer, FileType, LineId};
use regex::bytes::Regex;
use tracing::debug;

/// Fold states; lines classified HEADER, BEGIN or END stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldState {
    None,
    Header,
    Begin,
    Intern,
    End,
}

impl FoldState {
    fn keeps_line(self) -> bool {
        matches!(self, FoldState::Header | FoldState::Begin | FoldState::End)
    }
}

/// Per-line predicates of the C recogniser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldClass {
    /// Line begins with `}`.
    BlockClose,
    /// Line begins with `{`.
    BlockOpen,
    /// Line longer than three bytes containing `{` somewhere: treated
    /// as a one-line block when seen right below a close.
    OneLineBlock,
    /// Anything else.
    Plain,
}

/// Classify one C line by its leading byte and the one-line-block
/// containment test.
pub fn classify_c_line(content: &[u8]) -> FoldClass {
    match content.first() {
        Some(b'}') => FoldClass::BlockClose,
        Some(b'{') => FoldClass::BlockOpen,
        _ if content.len() > 3 && content.contains(&b'{') => FoldClass::OneLineBlock,
        _ => FoldClass::Plain,
    }
}

/// A header candidate must not be indented and must be longer than
/// three bytes before the header pattern is even consulted.
fn header_candidate(content: &[u8], header: &Regex) -> bool {
    content.len() > 3
        && !matches!(content.first(), Some(b' ') | Some(b'\t'))
        && header.is_match(content)
}

// Function and structure header shapes per language. The original's
// exact patterns did not survive; these reproduce the documented
// behaviour: identifier-led prototype lines for C, keyword-led block
// headers for the script types, any unindented line for plain text.
const C_HEADER: &str = r"^[A-Za-z_][A-Za-z0-9_ \t\*]*\(";
const C_STRUCTURE: &str = r"^(typedef[ \t]+)?(struct|union|enum)([ \t]+[A-Za-z_][A-Za-z0-9_]*)?";
const C_HEADER_END: &str = r"\)[ \t]*$";
const PERL_HEADER: &str = r"^sub[ \t]+[A-Za-z_][A-Za-z0-9_:]*";
const TCL_HEADER: &str = r"^proc[ \t]+[^ \t]+";
const SHELL_HEADER: &str = r"^(function[ \t]+)?[A-Za-z_][A-Za-z0-9_]*[ \t]*\(\)";
const PYTHON_HEADER: &str = r"^[ \t]*(def|class)[ \t]+[A-Za-z_]";
const TEXT_HEADER: &str = r"^[^ \t]";
const OPEN_BRACE_END: &str = r"\{[ \t]*$";

fn build(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(target: "filter", pattern, error = %e, "internal_fold_pattern_failed");
            None
        }
    }
}

/// Dispatch the fold pass for the buffer's file type. Unknown types
/// do nothing and report success.
pub(crate) fn filter_function(buffer: &mut Buffer, action: FilterAction, fmask: u32) -> bool {
    match buffer.ftype {
        FileType::C => fold_bottom_up(buffer, action, fmask),
        FileType::Perl | FileType::Tcl | FileType::Shell | FileType::Python | FileType::Text => {
            fold_top_down(buffer, action, fmask)
        }
        FileType::Unknown => true,
    }
}

/// The C/C++ recogniser, bottom to top.
fn fold_bottom_up(buffer: &mut Buffer, action: FilterAction, fmask: u32) -> bool {
    let (Some(header), Some(structure), Some(header_end)) = (
        build(C_HEADER),
        build(C_STRUCTURE),
        build(C_HEADER_END),
    ) else {
        return false;
    };

    let mut state = FoldState::None;
    let mut id_opt = buffer.lines.last_text();
    while let Some(id) = id_opt {
        let above: Option<LineId> = buffer
            .lines
            .prev(id)
            .filter(|&p| buffer.lines.is_text(p));
        let content = buffer.line(id).content();
        state = match classify_c_line(content) {
            FoldClass::BlockClose => FoldState::End,
            FoldClass::BlockOpen => FoldState::Begin,
            class => match state {
                FoldState::End => {
                    if class == FoldClass::OneLineBlock {
                        // safe guess for an empty one-line block
                        FoldState::Begin
                    } else {
                        FoldState::Intern
                    }
                }
                FoldState::Header => FoldState::None,
                FoldState::Intern => {
                    if structure.is_match(content) {
                        FoldState::Header
                    } else if header_end.is_match(content) {
                        if header_candidate(content, &header) {
                            FoldState::Header
                        } else if above
                            .map(|p| header_candidate(buffer.line(p).content(), &header))
                            .unwrap_or(false)
                        {
                            // the line above holds the header, this
                            // line is still part of the opening
                            FoldState::Begin
                        } else {
                            FoldState::Intern
                        }
                    } else {
                        FoldState::Intern
                    }
                }
                FoldState::Begin => {
                    if structure.is_match(content) || header_candidate(content, &header) {
                        FoldState::Header
                    } else if above
                        .map(|p| header_candidate(buffer.line(p).content(), &header))
                        .unwrap_or(false)
                    {
                        FoldState::Begin
                    } else {
                        FoldState::None
                    }
                }
                FoldState::None => FoldState::None,
            },
        };
        apply(
            &mut buffer.line_mut(id).flags,
            action,
            state.keeps_line(),
            fmask,
        );
        id_opt = above;
    }
    true
}

/// The top-down recogniser for the script types and plain text.
fn fold_top_down(buffer: &mut Buffer, action: FilterAction, fmask: u32) -> bool {
    let header_only = matches!(buffer.ftype, FileType::Python | FileType::Text);
    let pattern = match buffer.ftype {
        FileType::Perl => PERL_HEADER,
        FileType::Tcl => TCL_HEADER,
        FileType::Shell => SHELL_HEADER,
        FileType::Python => PYTHON_HEADER,
        FileType::Text => TEXT_HEADER,
        _ => return true,
    };
    let (Some(header), Some(open_end)) = (build(pattern), build(OPEN_BRACE_END)) else {
        return false;
    };

    let mut state = FoldState::None;
    let ids: Vec<LineId> = buffer.lines.iter_text().collect();
    for id in ids {
        let content = buffer.line(id).content();
        state = if header_only {
            if header.is_match(content) {
                FoldState::Header
            } else {
                FoldState::None
            }
        } else {
            match state {
                FoldState::None => {
                    if header.is_match(content) {
                        if open_end.is_match(content) {
                            // header and opening brace on one line
                            FoldState::Begin
                        } else {
                            FoldState::Header
                        }
                    } else {
                        FoldState::None
                    }
                }
                FoldState::Header => {
                    if content.first() == Some(&b'{') {
                        FoldState::Begin
                    } else {
                        FoldState::None
                    }
                }
                FoldState::Begin => {
                    if content.first() == Some(&b'}') {
                        FoldState::End
                    } else {
                        FoldState::Intern
                    }
                }
                FoldState::Intern => {
                    if content.first() == Some(&b'}') {
                        FoldState::End
                    } else {
                        FoldState::Intern
                    }
                }
                FoldState::End => FoldState::None,
            }
        };
        apply(
            &mut buffer.line_mut(id).flags,
            action,
            state.keeps_line(),
            fmask,
        );
    }
    true
}
