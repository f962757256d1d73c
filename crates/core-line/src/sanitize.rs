//! Input sanitisation shared by file reads and pipe output.

/// Clean one raw input line in place, up to and including the first
/// `\n` (anything after it is dropped).
///
/// Rules, in order per byte:
/// - TAB passes through;
/// - backspace erases the previous kept byte;
/// - printable bytes (`>= 0x20`, not DEL) pass through, which keeps
///   multi-byte sequences intact since their continuation bytes are
///   all above `0x7f`;
/// - CR is dropped like any other control byte, except that a CR
///   immediately preceding the final LF is put back when `fix_cr`
///   is off;
/// - every other control byte is dropped.
///
/// Returns true when anything was fixed, so callers can mark the
/// resulting line CHANGED.
pub fn sanitize_line(bytes: &mut Vec<u8>, fix_cr: bool) -> bool {
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut fixes: i32 = 0;
    let mut prev: u8 = 0;
    for &b in bytes.iter() {
        match b {
            b'\n' => {
                if !fix_cr && prev == b'\r' {
                    out.push(b'\r');
                    fixes -= 1;
                }
                out.push(b'\n');
                break;
            }
            b'\t' => out.push(b),
            0x08 => {
                out.pop();
                fixes += 1;
            }
            b if b >= 0x20 && b != 0x7f => out.push(b),
            _ => fixes += 1,
        }
        prev = b;
    }
    if out != *bytes {
        *bytes = out;
    }
    fixes != 0
}
