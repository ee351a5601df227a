//! Recursive-descent parser: tokens to a small statement AST.
//!
//! The accepted language is a flat list of simple statements: declarations
//! with an initializer, bare calls, and assignments to variables or fields.
//! Control flow, operators, lambdas, and array indexing are rejected.

use tessera_ir::Literal;

use crate::error::ParseError;
use crate::lexer::{Spanned, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal with its natural type (`int`, `long`, `double`, ...).
    Literal { value: Literal, natural: String },
    Null,
    /// Dotted identifiers: a variable, a field chain, or a static field.
    Name(Vec<String>),
    Field { target: Box<Expr>, name: String },
    /// `target` is `None` for an unqualified call.
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    New { type_name: String, args: Vec<Expr> },
    NewArray {
        element: String,
        length: Option<Box<Expr>>,
        init: Option<Vec<Expr>>,
    },
    /// `{a, b}` initializer, only valid on the right of an array declaration.
    ArrayInit(Vec<Expr>),
    Cast { type_name: String, inner: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declare {
        type_name: String,
        name: String,
        init: Expr,
    },
    Assign { target: Expr, value: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceStmt {
    pub stmt: Stmt,
    pub line: usize,
}

const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "try", "catch", "finally", "return", "throw", "switch",
    "synchronized", "class", "interface", "assert", "break", "continue",
];

pub struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(tok) => ParseError::UnexpectedToken {
                line: self.line(),
                expected: expected.to_string(),
                found: tok.to_string(),
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), ParseError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{c}'")))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Parse one statement, including its terminating `;`.
    pub fn parse_statement(&mut self) -> Result<SourceStmt, ParseError> {
        let line = self.line();
        while matches!(self.peek(), Some(Token::Ident(k)) if k == "final") {
            self.pos += 1;
        }
        match self.peek() {
            Some(Token::Ident(k)) if UNSUPPORTED_KEYWORDS.contains(&k.as_str()) => {
                return Err(ParseError::UnsupportedStatement {
                    line,
                    found: k.clone(),
                })
            }
            Some(Token::Punct(c @ ('{' | '}' | '@'))) => {
                return Err(ParseError::UnsupportedStatement {
                    line,
                    found: c.to_string(),
                })
            }
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: "statement".into(),
                })
            }
            _ => {}
        }

        if let Some(stmt) = self.try_declaration(line)? {
            return Ok(SourceStmt { stmt, line });
        }

        let expr = self.parse_expr()?;
        if self.eat_punct('=') {
            if !matches!(expr, Expr::Name(_) | Expr::Field { .. }) {
                return Err(ParseError::UnsupportedStatement {
                    line,
                    found: "assignment to a non-variable".into(),
                });
            }
            let value = self.parse_initializer()?;
            self.expect_punct(';')?;
            return Ok(SourceStmt {
                stmt: Stmt::Assign {
                    target: expr,
                    value,
                },
                line,
            });
        }
        self.expect_punct(';')?;
        match expr {
            Expr::Call { .. } | Expr::New { .. } => Ok(SourceStmt {
                stmt: Stmt::Expr(expr),
                line,
            }),
            _ => Err(ParseError::UnsupportedStatement {
                line,
                found: "expression without effect".into(),
            }),
        }
    }

    fn try_declaration(&mut self, line: usize) -> Result<Option<Stmt>, ParseError> {
        let start = self.pos;
        let Ok(type_name) = self.parse_type() else {
            self.pos = start;
            return Ok(None);
        };
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };
        match self.peek_at(1) {
            Some(Token::Punct('=')) => {
                self.pos += 2;
                let init = self.parse_initializer()?;
                self.expect_punct(';')?;
                Ok(Some(Stmt::Declare {
                    type_name,
                    name,
                    init,
                }))
            }
            Some(Token::Punct(';')) => Err(ParseError::UnsupportedStatement {
                line,
                found: format!("declaration of '{name}' without initializer"),
            }),
            _ => {
                self.pos = start;
                Ok(None)
            }
        }
    }

    fn parse_initializer(&mut self) -> Result<Expr, ParseError> {
        if self.is_punct('{') {
            self.parse_array_init()
        } else {
            self.parse_expr()
        }
    }

    fn parse_array_init(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect_punct('{')?;
        let mut items = Vec::new();
        while !self.is_punct('}') {
            if self.is_punct('{') {
                return Err(ParseError::MultiDimensionalArray {
                    line,
                    type_name: "nested array initializer".into(),
                });
            }
            items.push(self.parse_expr()?);
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}')?;
        Ok(Expr::ArrayInit(items))
    }

    /// `a.b.C<D, ? extends E>[]`, rendered back to canonical text.
    pub fn parse_type(&mut self) -> Result<String, ParseError> {
        let mut text = self.expect_ident()?;
        while self.is_punct('.') && matches!(self.peek_at(1), Some(Token::Ident(_))) {
            self.pos += 1;
            text.push('.');
            text.push_str(&self.expect_ident()?);
        }
        if self.is_punct('<') {
            text.push_str(&self.parse_type_args()?);
        }
        while self.is_punct('[') && self.peek_at(1) == Some(&Token::Punct(']')) {
            self.pos += 2;
            text.push_str("[]");
        }
        Ok(text)
    }

    fn parse_type_args(&mut self) -> Result<String, ParseError> {
        self.expect_punct('<')?;
        let mut args = Vec::new();
        while !self.is_punct('>') {
            if self.eat_punct('?') {
                match self.peek() {
                    Some(Token::Ident(k)) if k == "extends" || k == "super" => {
                        let k = k.clone();
                        self.pos += 1;
                        args.push(format!("? {k} {}", self.parse_type()?));
                    }
                    _ => args.push("?".to_string()),
                }
            } else {
                args.push(self.parse_type()?);
            }
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('>')?;
        Ok(format!("<{}>", args.join(", ")))
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.is_punct('.') {
                if self.peek_at(1) == Some(&Token::Punct('<')) {
                    return Err(ParseError::UnsupportedExpression {
                        line: self.line(),
                        what: "explicit generic method arguments".into(),
                    });
                }
                self.pos += 1;
                let name = self.expect_ident()?;
                if self.is_punct('(') {
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        target: Some(Box::new(expr)),
                        name,
                        args,
                    };
                } else {
                    expr = Expr::Field {
                        target: Box::new(expr),
                        name,
                    };
                }
                continue;
            }
            break;
        }
        if let Some(Token::Punct(op)) = self.peek() {
            if "+-*/%&|^<>!?:[~".contains(*op) {
                return Err(ParseError::UnsupportedExpression {
                    line: self.line(),
                    what: format!("operator '{op}'"),
                });
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        while !self.is_punct(')') {
            args.push(self.parse_expr()?);
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct(')')?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        match token {
            Token::Int(text) | Token::Float(text) => {
                self.pos += 1;
                number_literal(&text, false, line)
            }
            Token::Punct('-') => match self.peek_at(1).cloned() {
                Some(Token::Int(text) | Token::Float(text)) => {
                    self.pos += 2;
                    number_literal(&text, true, line)
                }
                _ => Err(ParseError::UnsupportedExpression {
                    line,
                    what: "unary minus on a non-literal".into(),
                }),
            },
            Token::Char(c) => {
                self.pos += 1;
                Ok(Expr::Literal {
                    value: Literal::Char(c),
                    natural: "char".into(),
                })
            }
            Token::Str(s) => {
                self.pos += 1;
                Ok(Expr::Literal {
                    value: Literal::Str(s),
                    natural: "java.lang.String".into(),
                })
            }
            Token::Punct('{') => self.parse_array_init(),
            Token::Punct('(') => self.parse_paren_or_cast(),
            Token::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.pos += 1;
                    Ok(Expr::Literal {
                        value: Literal::Bool(word == "true"),
                        natural: "boolean".into(),
                    })
                }
                "null" => {
                    self.pos += 1;
                    Ok(Expr::Null)
                }
                "new" => {
                    self.pos += 1;
                    self.parse_new()
                }
                "this" | "super" => Err(ParseError::UnsupportedExpression {
                    line,
                    what: format!("'{word}' reference"),
                }),
                _ => self.parse_name_or_call(),
            },
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_name_or_call(&mut self) -> Result<Expr, ParseError> {
        let mut path = vec![self.expect_ident()?];
        while self.is_punct('.') && matches!(self.peek_at(1), Some(Token::Ident(_))) {
            self.pos += 1;
            path.push(self.expect_ident()?);
        }
        if self.is_punct('(') {
            let name = path.pop().unwrap_or_default();
            let args = self.parse_args()?;
            let target = if path.is_empty() {
                None
            } else {
                Some(Box::new(Expr::Name(path)))
            };
            return Ok(Expr::Call { target, name, args });
        }
        Ok(Expr::Name(path))
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let mut type_name = self.expect_ident()?;
        while self.eat_punct('.') {
            type_name.push('.');
            type_name.push_str(&self.expect_ident()?);
        }
        if self.is_punct('<') {
            type_name.push_str(&self.parse_type_args()?);
        }
        if self.is_punct('(') {
            let args = self.parse_args()?;
            if self.is_punct('{') {
                return Err(ParseError::UnsupportedExpression {
                    line,
                    what: "anonymous class".into(),
                });
            }
            return Ok(Expr::New { type_name, args });
        }

        self.expect_punct('[')?;
        if self.eat_punct(']') {
            let mut dims = 1;
            while self.eat_punct('[') {
                self.expect_punct(']')?;
                dims += 1;
            }
            if dims > 1 {
                return Err(ParseError::MultiDimensionalArray {
                    line,
                    type_name: format!("{type_name}{}", "[]".repeat(dims)),
                });
            }
            let Expr::ArrayInit(items) = self.parse_array_init()? else {
                return Err(self.unexpected("array initializer"));
            };
            return Ok(Expr::NewArray {
                element: type_name,
                length: None,
                init: Some(items),
            });
        }
        let length = self.parse_expr()?;
        self.expect_punct(']')?;
        if self.is_punct('[') {
            return Err(ParseError::MultiDimensionalArray {
                line,
                type_name: format!("{type_name}[][]"),
            });
        }
        Ok(Expr::NewArray {
            element: type_name,
            length: Some(Box::new(length)),
            init: None,
        })
    }

    fn parse_paren_or_cast(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.expect_punct('(')?;
        if let Ok(type_name) = self.parse_type() {
            if self.eat_punct(')') {
                let starts_operand = matches!(
                    self.peek(),
                    Some(
                        Token::Int(_)
                            | Token::Float(_)
                            | Token::Char(_)
                            | Token::Str(_)
                            | Token::Ident(_)
                            | Token::Punct('(' | '-')
                    )
                );
                if starts_operand {
                    let inner = self.parse_primary()?;
                    return Ok(Expr::Cast {
                        type_name,
                        inner: Box::new(inner),
                    });
                }
            }
        }
        self.pos = start + 1;
        let inner = self.parse_expr()?;
        self.expect_punct(')')?;
        Ok(inner)
    }
}

/// Parse numeric literal text. Suffixes decide the natural type and are
/// stripped; `-` is applied before range checking so `MIN_VALUE` parses.
pub fn number_literal(text: &str, negative: bool, line: usize) -> Result<Expr, ParseError> {
    let invalid = || ParseError::InvalidLiteral {
        line,
        text: if negative {
            format!("-{text}")
        } else {
            text.to_string()
        },
    };
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let is_radix = lower.starts_with("0x") || lower.starts_with("0b");

    let is_float = !is_radix
        && (lower.contains(['.', 'e']) || lower.ends_with('f') || lower.ends_with('d'));
    if is_float {
        let (body, natural) = match lower.strip_suffix('f') {
            Some(b) => (b, "float"),
            None => (lower.strip_suffix('d').unwrap_or(&lower), "double"),
        };
        let value: f64 = body.parse().map_err(|_| invalid())?;
        let value = if negative { -value } else { value };
        return Ok(Expr::Literal {
            value: Literal::Float(value),
            natural: natural.into(),
        });
    }

    let (body, is_long) = match lower.strip_suffix('l') {
        Some(b) => (b, true),
        None => (lower.as_str(), false),
    };
    let value: i64 = if let Some(hex) = body.strip_prefix("0x") {
        radix_value(hex, 16, is_long).ok_or_else(invalid)?
    } else if let Some(bin) = body.strip_prefix("0b") {
        radix_value(bin, 2, is_long).ok_or_else(invalid)?
    } else if body.len() > 1 && body.starts_with('0') {
        i64::from_str_radix(&body[1..], 8).map_err(|_| invalid())?
    } else {
        let signed = if negative {
            format!("-{body}")
        } else {
            body.to_string()
        };
        let v: i64 = signed.parse().map_err(|_| invalid())?;
        return Ok(Expr::Literal {
            value: Literal::Int(v),
            natural: natural_int(v, is_long).into(),
        });
    };
    let value = if negative { value.wrapping_neg() } else { value };
    Ok(Expr::Literal {
        value: Literal::Int(value),
        natural: natural_int(value, is_long).into(),
    })
}

/// Hex and binary literals are two's complement at their width.
fn radix_value(digits: &str, radix: u32, is_long: bool) -> Option<i64> {
    let raw = u64::from_str_radix(digits, radix).ok()?;
    if !is_long && raw <= u64::from(u32::MAX) {
        Some(i64::from(raw as u32 as i32))
    } else {
        Some(raw as i64)
    }
}

fn natural_int(value: i64, is_long: bool) -> &'static str {
    if is_long || i32::try_from(value).is_err() {
        "long"
    } else {
        "int"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_one(src: &str) -> Result<Stmt, ParseError> {
        let lexed = tokenize(src);
        assert!(lexed.error.is_none());
        let mut parser = Parser::new(&lexed.tokens);
        parser.parse_statement().map(|s| s.stmt)
    }

    fn lit(value: Literal, natural: &str) -> Expr {
        Expr::Literal {
            value,
            natural: natural.into(),
        }
    }

    #[test]
    fn test_parse_generic_declaration() {
        let stmt = parse_one("Map<String, List<Integer>> m = new HashMap<>();").unwrap();
        assert_eq!(
            stmt,
            Stmt::Declare {
                type_name: "Map<String, List<Integer>>".into(),
                name: "m".into(),
                init: Expr::New {
                    type_name: "HashMap<>".into(),
                    args: vec![]
                },
            }
        );
    }

    #[test]
    fn test_parse_call_with_mixed_args() {
        let stmt = parse_one("acct.deposit(10L, -2.5f, other.balance, \"x\");").unwrap();
        let Stmt::Expr(Expr::Call { target, name, args }) = stmt else {
            panic!("expected call");
        };
        assert_eq!(target, Some(Box::new(Expr::Name(vec!["acct".into()]))));
        assert_eq!(name, "deposit");
        assert_eq!(args[0], lit(Literal::Int(10), "long"));
        assert_eq!(args[1], lit(Literal::Float(-2.5), "float"));
        assert_eq!(args[2], Expr::Name(vec!["other".into(), "balance".into()]));
    }

    #[test]
    fn test_parse_field_assignment() {
        let stmt = parse_one("p.x = 3;").unwrap();
        assert!(matches!(stmt, Stmt::Assign { target: Expr::Name(ref p), .. } if p.len() == 2));
    }

    #[test]
    fn test_parse_cast_and_hex() {
        let stmt = parse_one("byte b = (byte) 0x7F;").unwrap();
        let Stmt::Declare { init, .. } = stmt else {
            panic!("expected declaration");
        };
        assert_eq!(
            init,
            Expr::Cast {
                type_name: "byte".into(),
                inner: Box::new(lit(Literal::Int(127), "int")),
            }
        );
    }

    #[test]
    fn test_hex_wraps_to_int() {
        assert_eq!(
            number_literal("0xFFFFFFFF", false, 1).unwrap(),
            lit(Literal::Int(-1), "int")
        );
        assert_eq!(
            number_literal("9223372036854775808", true, 1).unwrap(),
            lit(Literal::Int(i64::MIN), "long")
        );
        assert!(number_literal("99999999999999999999", false, 1).is_err());
    }

    #[test]
    fn test_multi_dimensional_arrays_rejected() {
        let err = parse_one("int[][] grid = new int[2][3];").unwrap_err();
        assert_eq!(err.kind(), "multi_dimensional_array");
        let err = parse_one("int[][] grid = {{1}, {2}};").unwrap_err();
        assert_eq!(err.kind(), "multi_dimensional_array");
    }

    #[test]
    fn test_control_flow_rejected() {
        let err = parse_one("if (x) foo();").unwrap_err();
        assert_eq!(err.kind(), "unsupported_statement");
        let err = parse_one("int x = a + b;").unwrap_err();
        assert_eq!(err.kind(), "unsupported_expression");
    }
}
