//! Literal constants carried by `PrimitiveLiteral` statements.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::typename::PrimitiveKind;

/// A literal value. The statement's declared type decides its width
/// (`Int` serves byte/short/int/long, `Float` serves float/double).
///
/// Equality, hashing, and ordering compare floats by bit pattern so the
/// literal pool can hold `NaN` and distinguish `-0.0` from `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum LiteralKey<'a> {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    Float(u64),
    Str(&'a str),
}

impl Literal {
    fn key(&self) -> LiteralKey<'_> {
        match self {
            Literal::Null => LiteralKey::Null,
            Literal::Bool(b) => LiteralKey::Bool(*b),
            Literal::Char(c) => LiteralKey::Char(*c),
            Literal::Int(i) => LiteralKey::Int(*i),
            Literal::Float(f) => LiteralKey::Float(f.to_bits()),
            Literal::Str(s) => LiteralKey::Str(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Whether this literal can initialize a value of the given family.
    pub fn conforms_to(&self, kind: PrimitiveKind) -> bool {
        match (self, kind) {
            (Literal::Null, _) => true,
            (Literal::Bool(_), PrimitiveKind::Boolean) => true,
            (Literal::Char(_), PrimitiveKind::Char) => true,
            (Literal::Int(_), k) => k.is_integral() || k.is_floating(),
            (Literal::Float(_), k) => k.is_floating(),
            (Literal::Str(_), PrimitiveKind::String) => true,
            _ => false,
        }
    }

    /// Source text of this literal when assigned to `type_name`.
    pub fn render(&self, type_name: &str) -> String {
        let kind = PrimitiveKind::of(type_name);
        match self {
            Literal::Null => "null".to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Char(c) => format!("'{}'", escape_char(*c)),
            Literal::Str(s) => format!("\"{}\"", escape_string(s)),
            Literal::Int(i) => match kind {
                Some(PrimitiveKind::Long) => format!("{i}L"),
                Some(PrimitiveKind::Byte) => format!("(byte) {i}"),
                Some(PrimitiveKind::Short) => format!("(short) {i}"),
                Some(PrimitiveKind::Float) => format!("{i}.0f"),
                Some(PrimitiveKind::Double) => format!("{i}.0"),
                _ => i.to_string(),
            },
            Literal::Float(f) => render_float(*f, kind == Some(PrimitiveKind::Float)),
        }
    }
}

/// Render a floating constant, using named constants for non-finite values.
pub fn render_float(value: f64, single: bool) -> String {
    let owner = if single { "Float" } else { "Double" };
    if value.is_nan() {
        return format!("{owner}.NaN");
    }
    if value.is_infinite() {
        let sign = if value > 0.0 { "POSITIVE" } else { "NEGATIVE" };
        return format!("{owner}.{sign}_INFINITY");
    }
    let mut text = format!("{value:?}");
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    if single {
        text.push('f');
    }
    text
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Char(c) => write!(f, "'{}'", escape_char(*c)),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => f.write_str(&render_float(*v, false)),
            Literal::Str(s) => write!(f, "\"{}\"", escape_string(s)),
        }
    }
}

/// Escape a string for a double-quoted source literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            _ => push_escaped(&mut out, c),
        }
    }
    out
}

/// Escape a char for a single-quoted source literal.
pub fn escape_char(c: char) -> String {
    let mut out = String::new();
    match c {
        '\'' => out.push_str("\\'"),
        _ => push_escaped(&mut out, c),
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{8}' => out.push_str("\\b"),
        '\u{c}' => out.push_str("\\f"),
        c if c.is_ascii_control() || !c.is_ascii() => {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
        c => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_literals_compare_equal() {
        assert_eq!(Literal::Float(f64::NAN), Literal::Float(f64::NAN));
        assert_ne!(Literal::Float(0.0), Literal::Float(-0.0));
    }

    #[test]
    fn test_render_by_declared_type() {
        assert_eq!(Literal::Int(5).render("long"), "5L");
        assert_eq!(Literal::Int(5).render("byte"), "(byte) 5");
        assert_eq!(Literal::Int(5).render("int"), "5");
        assert_eq!(Literal::Float(1.5).render("float"), "1.5f");
        assert_eq!(Literal::Float(2.0).render("double"), "2.0");
        assert_eq!(Literal::Float(f64::NAN).render("double"), "Double.NaN");
        assert_eq!(
            Literal::Float(f64::NEG_INFINITY).render("float"),
            "Float.NEGATIVE_INFINITY"
        );
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_string("a\"b\n"), "a\\\"b\\n");
        assert_eq!(escape_char('\''), "\\'");
        assert_eq!(escape_string("é"), "\\u00e9");
        assert_eq!(Literal::Str("x\ty".into()).render("String"), "\"x\\ty\"");
    }

    #[test]
    fn test_conformance() {
        assert!(Literal::Int(3).conforms_to(PrimitiveKind::Long));
        assert!(Literal::Int(3).conforms_to(PrimitiveKind::Double));
        assert!(!Literal::Float(3.0).conforms_to(PrimitiveKind::Int));
        assert!(!Literal::Str("x".into()).conforms_to(PrimitiveKind::Char));
    }
}
