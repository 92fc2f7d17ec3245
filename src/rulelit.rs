// rulelit.rs - Literal text helpers for the generated program.
// String-constant escaping and quantifier annotations.

use crate::rulenode::Quantifier;

/// Escape sequence for `c`, or `None` when the byte is copied unchanged.
/// NUL is written in hex with both digits, so a following digit can never be
/// read as part of it.
fn escape(c: u8) -> Option<&'static [u8]> {
    let e: &'static [u8] = match c {
        b'\\' => b"\\\\",
        b'"' => b"\\\"",
        b'\'' => b"\\'",
        b'\n' => b"\\n",
        b'\r' => b"\\r",
        b'\t' => b"\\t",
        0 => b"\\x00",
        _ => return None,
    };
    Some(e)
}

/// Encode raw bytes as a double-quoted string constant of the program text.
///
/// Backslash, both quote characters, newline, carriage return, tab and NUL are
/// escaped; every other byte is copied unchanged. The encoding is injective:
/// an escape always starts with a backslash and a literal backslash is itself
/// escaped.
///
/// ```
/// use ferrule::rulelit::encode_string_literal;
///
/// assert_eq!(encode_string_literal(b"a\"b\n"), b"\"a\\\"b\\n\"".to_vec());
/// assert_eq!(encode_string_literal(b"\x001"), b"\"\\x001\"".to_vec());
/// ```
pub fn encode_string_literal(s: &[u8]) -> Vec<u8> {
    let mut esc = Vec::with_capacity(s.len() * 2 + 2);
    esc.push(b'"');
    for &c in s {
        match escape(c) {
            Some(e) => esc.extend_from_slice(e),
            None => esc.push(c),
        }
    }
    esc.push(b'"');
    esc
}

/// The opening part of `encode_string_literal(s)`, at most `max_len` bytes
/// long. Escape sequences are kept whole; the closing quote is only written
/// when everything fits.
pub fn encode_string_prefix(s: &[u8], max_len: usize) -> Vec<u8> {
    let mut esc = vec![b'"'];
    for &c in s {
        let one = [c];
        let unit: &[u8] = match escape(c) {
            Some(e) => e,
            None => &one,
        };
        if esc.len() + unit.len() > max_len {
            esc.truncate(max_len);
            return esc;
        }
        esc.extend_from_slice(unit);
    }
    if esc.len() < max_len {
        esc.push(b'"');
    }
    esc.truncate(max_len);
    esc
}

/// Quantifier annotation used in trace comments: `<m>`, `<m..n>` or `<m...>`,
/// followed by a space when greedy and `?` when lazy.
pub fn format_quantifier(min: u32, max: Option<u32>, greedy: bool) -> String {
    let c = if greedy { ' ' } else { '?' };
    match max {
        None => format!("<{}...>{}", min, c),
        Some(max) if max != min => format!("<{}..{}>{}", min, max, c),
        Some(_) => format!("<{}>{}", min, c),
    }
}

pub fn format_quant(q: &Quantifier) -> String {
    format_quantifier(q.min, q.max, q.greedy)
}
