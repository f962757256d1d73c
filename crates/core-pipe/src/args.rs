//! Whitespace tokenizer for child argv construction.

/// Break a command string into argv words.
///
/// Single and double quotes group words without nesting (the first
/// quote type rules until its partner); the quote characters are
/// removed. A backslash escapes only backslash, quote, space and tab;
/// before anything else it is dropped.
pub fn parse_args(input: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Mode {
        None,
        Word,
        Squote,
        Dquote,
    }
    let mut args: Vec<String> = Vec::new();
    let mut mode = Mode::None;
    let mut cur = String::new();
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            if matches!(ch, '\\' | '\'' | '"' | ' ' | '\t') {
                if mode == Mode::None {
                    mode = Mode::Word;
                }
                cur.push(ch);
            }
            // any other escaped character is dropped with its backslash
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\'' => match mode {
                Mode::Dquote => cur.push(ch),
                Mode::None => mode = Mode::Squote,
                Mode::Word => mode = Mode::Squote,
                Mode::Squote => mode = Mode::Word,
            },
            '"' => match mode {
                Mode::Squote => cur.push(ch),
                Mode::None => mode = Mode::Dquote,
                Mode::Word => mode = Mode::Dquote,
                Mode::Dquote => mode = Mode::Word,
            },
            ' ' | '\t' => match mode {
                Mode::Squote | Mode::Dquote => cur.push(ch),
                Mode::Word => {
                    args.push(std::mem::take(&mut cur));
                    mode = Mode::None;
                }
                Mode::None => {}
            },
            _ => {
                if mode == Mode::None {
                    mode = Mode::Word;
                }
                cur.push(ch);
            }
        }
    }
    if mode != Mode::None {
        args.push(cur);
    }
    args
}
