use tessera_ir::introspect::IntrospectError;
use tessera_ir::SequenceError;

/// Why a code fragment could not be turned into a sequence.
///
/// Always scoped to one fragment; callers skip the fragment and count the
/// failure under [`ParseError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Line {line}: unexpected character '{found}'")]
    UnexpectedChar { line: usize, found: char },

    #[error("Line {line}: unterminated {what} literal")]
    Unterminated { line: usize, what: &'static str },

    #[error("Line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Line {line}: unsupported statement starting with '{found}'")]
    UnsupportedStatement { line: usize, found: String },

    #[error("Line {line}: unsupported expression: {what}")]
    UnsupportedExpression { line: usize, what: String },

    #[error("Line {line}: expressions nested deeper than one level are not supported")]
    NestedTooDeep { line: usize },

    #[error("Line {line}: multi-dimensional array '{type_name}' is not supported")]
    MultiDimensionalArray { line: usize, type_name: String },

    #[error("Line {line}: invalid literal '{text}'")]
    InvalidLiteral { line: usize, text: String },

    #[error("Line {line}: unknown variable '{name}'")]
    UnknownVariable { line: usize, name: String },

    #[error("Line {line}: cannot resolve '{name}'")]
    UnresolvedName { line: usize, name: String },

    #[error("Line {line}: {source}")]
    Resolution {
        line: usize,
        #[source]
        source: IntrospectError,
    },

    #[error("Line {line}: {source}")]
    Sequence {
        line: usize,
        #[source]
        source: SequenceError,
    },
}

impl ParseError {
    /// Stable category name used for diagnostic bucketing.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::UnexpectedChar { .. } | ParseError::Unterminated { .. } => "lex",
            ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof { .. } => "syntax",
            ParseError::UnsupportedStatement { .. } => "unsupported_statement",
            ParseError::UnsupportedExpression { .. } => "unsupported_expression",
            ParseError::NestedTooDeep { .. } => "nested_too_deep",
            ParseError::MultiDimensionalArray { .. } => "multi_dimensional_array",
            ParseError::InvalidLiteral { .. } => "invalid_literal",
            ParseError::UnknownVariable { .. } => "unknown_variable",
            ParseError::UnresolvedName { .. } => "unresolved_name",
            ParseError::Resolution { .. } => "resolution",
            ParseError::Sequence { .. } => "sequence",
        }
    }
}
