//! String and character literal escaping and unescaping.
//!
//! Converts between runtime text (`"a\nb"` holding an actual newline) and the
//! source form of a C# literal (`"a\nb"` holding a backslash-n sequence).

use alloc::borrow::Cow;
use core::fmt;

use thiserror::Error;

/// Which delimiter a literal uses; the delimiter itself must be escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `"..."` string literal.
    Double,
    /// `'.'` character literal.
    Single,
}

impl Quote {
    pub fn char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

/// Errors that can occur when unescaping literal text. Positions are byte
/// offsets relative to the start of the literal body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnescapeError {
    #[error("invalid escape sequence '{seq}'")]
    InvalidEscape { pos: usize, seq: String },

    #[error("incomplete escape sequence '{seq}': expected {expected} hex digits")]
    IncompleteEscape {
        pos: usize,
        seq: String,
        expected: usize,
    },

    #[error("invalid Unicode scalar value U+{value:X}")]
    InvalidUnicodeScalar { pos: usize, value: u32 },

    #[error("escape sequence at end of literal")]
    TrailingBackslash { pos: usize },
}

impl UnescapeError {
    pub fn pos(&self) -> usize {
        match self {
            UnescapeError::InvalidEscape { pos, .. }
            | UnescapeError::IncompleteEscape { pos, .. }
            | UnescapeError::InvalidUnicodeScalar { pos, .. }
            | UnescapeError::TrailingBackslash { pos } => *pos,
        }
    }
}

/// Writes `s` as a quoted C# literal, escaping the delimiter, backslashes and
/// control characters.
pub fn escape_string(f: &mut impl fmt::Write, s: &str, quote: Quote) -> fmt::Result {
    let q = quote.char();
    f.write_char(q)?;
    for ch in s.chars() {
        match ch {
            c if c == q => write!(f, "\\{}", q)?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(q)
}

/// Unescapes the body of a regular (non-verbatim) string or char literal.
///
/// Supported escapes: `\' \" \\ \0 \a \b \f \n \r \t \v`, `\xH..HHHH` (one to
/// four hex digits), `\uHHHH`, `\UHHHHHHHH` and octal `\NNN` (one to three
/// octal digits after a leading `0`..`7`).
///
/// Borrows the input when it contains no backslash.
pub fn unescape(input: &str) -> Result<Cow<'_, str>, UnescapeError> {
    if !input.contains('\\') {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let Some((_, esc)) = chars.next() else {
            return Err(UnescapeError::TrailingBackslash { pos });
        };

        match esc {
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            'x' | 'u' | 'U' => {
                let (min, max) = match esc {
                    'x' => (1, 4),
                    'u' => (4, 4),
                    _ => (8, 8),
                };
                let mut value: u32 = 0;
                let mut count = 0;
                while count < max {
                    match chars.peek() {
                        Some(&(_, c)) if c.is_ascii_hexdigit() => {
                            value = value * 16 + c.to_digit(16).unwrap_or(0);
                            chars.next();
                            count += 1;
                        }
                        _ => break,
                    }
                }
                if count < min {
                    return Err(UnescapeError::IncompleteEscape {
                        pos,
                        seq: format!("\\{}", esc),
                        expected: min,
                    });
                }
                let c = char::from_u32(value)
                    .ok_or(UnescapeError::InvalidUnicodeScalar { pos, value })?;
                out.push(c);
            }
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                let mut count = 1;
                while count < 3 {
                    match chars.peek() {
                        Some(&(_, c)) if ('0'..='7').contains(&c) => {
                            value = value * 8 + c.to_digit(8).unwrap_or(0);
                            chars.next();
                            count += 1;
                        }
                        _ => break,
                    }
                }
                let c = char::from_u32(value)
                    .ok_or(UnescapeError::InvalidUnicodeScalar { pos, value })?;
                out.push(c);
            }
            other => {
                return Err(UnescapeError::InvalidEscape {
                    pos,
                    seq: format!("\\{}", other),
                });
            }
        }
    }

    Ok(Cow::Owned(out))
}

/// Unescapes the body of a verbatim string (`@"..."`): only `""` is special.
pub fn unescape_verbatim(input: &str) -> Cow<'_, str> {
    if input.contains("\"\"") {
        Cow::Owned(input.replace("\"\"", "\""))
    } else {
        Cow::Borrowed(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape(s: &str, quote: Quote) -> String {
        let mut out = String::new();
        escape_string(&mut out, s, quote).unwrap();
        out
    }

    #[test]
    fn test_escape_common() {
        assert_eq!(escape("hello", Quote::Double), r#""hello""#);
        assert_eq!(escape("a\nb\tc", Quote::Double), r#""a\nb\tc""#);
        assert_eq!(escape(r"C:\temp", Quote::Double), r#""C:\\temp""#);
        assert_eq!(escape("say \"hi\"", Quote::Double), r#""say \"hi\"""#);
        assert_eq!(escape("'", Quote::Single), r"'\''");
        assert_eq!(escape("\"", Quote::Single), "'\"'");
    }

    #[test]
    fn test_unescape_borrows_without_backslash() {
        assert!(matches!(unescape("plain"), Ok(Cow::Borrowed("plain"))));
    }

    #[test]
    fn test_unescape_simple_escapes() {
        assert_eq!(unescape(r"a\nb").unwrap(), "a\nb");
        assert_eq!(unescape(r#"\"q\""#).unwrap(), "\"q\"");
        assert_eq!(unescape(r"\\").unwrap(), "\\");
        assert_eq!(unescape(r"\a\b\f\v").unwrap(), "\u{7}\u{8}\u{c}\u{b}");
    }

    #[test]
    fn test_unescape_hex_and_unicode() {
        assert_eq!(unescape(r"\x41").unwrap(), "A");
        assert_eq!(unescape(r"\x4").unwrap(), "\u{4}");
        assert_eq!(unescape(r"\u00e9").unwrap(), "é");
        assert_eq!(unescape(r"\U0001F600").unwrap(), "😀");
    }

    #[test]
    fn test_unescape_octal() {
        assert_eq!(unescape(r"\101").unwrap(), "A");
        assert_eq!(unescape(r"\0").unwrap(), "\0");
        assert_eq!(unescape(r"\0x").unwrap(), "\0x");
    }

    #[test]
    fn test_unescape_errors() {
        assert!(matches!(
            unescape(r"\q"),
            Err(UnescapeError::InvalidEscape { pos: 0, .. })
        ));
        assert!(matches!(
            unescape(r"ab\u12"),
            Err(UnescapeError::IncompleteEscape { pos: 2, .. })
        ));
        assert!(matches!(
            unescape(r"\uD800"),
            Err(UnescapeError::InvalidUnicodeScalar { value: 0xD800, .. })
        ));
        assert!(matches!(
            unescape("x\\"),
            Err(UnescapeError::TrailingBackslash { pos: 1 })
        ));
    }

    #[test]
    fn test_verbatim() {
        assert_eq!(unescape_verbatim(r#"a""b"#), "a\"b");
        assert_eq!(unescape_verbatim(r"C:\temp"), r"C:\temp");
    }

    #[test]
    fn test_roundtrip() {
        for s in ["", "x", "tab\there", "quote\"", "back\\slash", "\u{1}"] {
            let escaped = escape(s, Quote::Double);
            let body = &escaped[1..escaped.len() - 1];
            assert_eq!(unescape(body).unwrap(), s);
        }
    }
}
