pub mod introspect;
pub mod literal;
pub mod operation;
pub mod parse;
pub mod runtime;
pub mod sequence;
pub mod typename;
pub mod types;

pub use literal::Literal;
pub use operation::{MemberRef, Operation, StatementKind};
pub use sequence::{Sequence, SequenceError, Statement, VarIndex};
pub use types::{CoverageRow, CoverageStatus, TypeSpec};
