//! Tokenizer for Java-like statement fragments.

use std::fmt;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Integer literal text, suffix included (`10L`, `0x1F`).
    Int(String),
    /// Floating literal text, suffix included (`1.5f`, `2e3`).
    Float(String),
    Char(char),
    Str(String),
    Punct(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) | Token::Int(s) | Token::Float(s) => f.write_str(s),
            Token::Char(c) => write!(f, "'{c}'"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Punct(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Tokens lexed before the first error, plus that error.
#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Spanned>,
    pub error: Option<ParseError>,
}

const PUNCT: &str = "(){}[];,.=<>?&-+!:@*/%|^~";

pub fn tokenize(src: &str) -> LexOutput {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    macro_rules! fail {
        ($err:expr) => {
            return LexOutput {
                tokens,
                error: Some($err),
            }
        };
    }

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Comments
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                fail!(ParseError::Unterminated {
                    line,
                    what: "comment"
                });
            }
            i += 2;
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            tokens.push(Spanned {
                token: Token::Ident(chars[start..i].iter().collect()),
                line,
            });
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let (token, next) = lex_number(&chars, i);
            tokens.push(Spanned { token, line });
            i = next;
            continue;
        }

        if c == '"' {
            match lex_quoted(&chars, i + 1, '"') {
                Some((text, next)) => {
                    tokens.push(Spanned {
                        token: Token::Str(text),
                        line,
                    });
                    i = next;
                }
                None => fail!(ParseError::Unterminated {
                    line,
                    what: "string"
                }),
            }
            continue;
        }

        if c == '\'' {
            match lex_quoted(&chars, i + 1, '\'') {
                Some((text, next)) if text.chars().count() == 1 => {
                    let ch = text.chars().next().unwrap_or_default();
                    tokens.push(Spanned {
                        token: Token::Char(ch),
                        line,
                    });
                    i = next;
                }
                _ => fail!(ParseError::Unterminated {
                    line,
                    what: "character"
                }),
            }
            continue;
        }

        if PUNCT.contains(c) {
            tokens.push(Spanned {
                token: Token::Punct(c),
                line,
            });
            i += 1;
            continue;
        }

        fail!(ParseError::UnexpectedChar { line, found: c });
    }

    LexOutput {
        tokens,
        error: None,
    }
}

fn lex_number(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    let mut is_float = false;

    if chars[i] == '0' && matches!(chars.get(i + 1), Some('x' | 'X' | 'b' | 'B')) {
        i += 2;
        while i < chars.len() && (chars[i].is_ascii_hexdigit() || chars[i] == '_') {
            i += 1;
        }
    } else {
        while i < chars.len() {
            let ch = chars[i];
            if ch.is_ascii_digit() || ch == '_' {
                i += 1;
            } else if ch == '.'
                && !is_float
                && chars
                    .get(i + 1)
                    .map_or(true, |n| !n.is_alphabetic() || "eEfFdD".contains(*n))
            {
                is_float = true;
                i += 1;
            } else if (ch == 'e' || ch == 'E')
                && chars
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
            {
                is_float = true;
                i += 2;
            } else {
                break;
            }
        }
    }

    if let Some(&suffix) = chars.get(i) {
        match suffix {
            'l' | 'L' => i += 1,
            'f' | 'F' | 'd' | 'D' => {
                is_float = true;
                i += 1;
            }
            _ => {}
        }
    }

    let text: String = chars[start..i].iter().collect();
    let token = if is_float {
        Token::Float(text)
    } else {
        Token::Int(text)
    };
    (token, i)
}

/// Read a quoted literal body starting after the opening quote. Returns the
/// unescaped text and the index after the closing quote.
fn lex_quoted(chars: &[char], start: usize, quote: char) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut pending_high: Option<u16> = None;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return Some((out, i + 1));
        }
        if c == '\n' {
            return None;
        }
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }
        let esc = *chars.get(i + 1)?;
        i += 2;
        let decoded = match esc {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '0' => '\0',
            's' => ' ',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'u' => {
                while chars.get(i) == Some(&'u') {
                    i += 1;
                }
                let hex: String = chars.get(i..i + 4)?.iter().collect();
                let unit = u16::from_str_radix(&hex, 16).ok()?;
                i += 4;
                if (0xD800..0xDC00).contains(&unit) {
                    pending_high = Some(unit);
                    continue;
                }
                if let Some(high) = pending_high.take() {
                    let pair = [high, unit];
                    out.extend(char::decode_utf16(pair).filter_map(Result::ok));
                    continue;
                }
                char::from_u32(u32::from(unit))?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    None
}
