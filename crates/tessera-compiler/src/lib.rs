pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod render;
pub mod validate;

pub use error::ParseError;
pub use lower::{parse, parse_prefix, ParseContext, ParsedSequence, PrefixParse};
pub use render::{render, render_lines};
pub use validate::{validate_plan, ValidationError};
