//! Invocation sequences.
//!
//! A sequence is an append-only list of statements. Each statement produces
//! one variable, identified by the statement's position; inputs reference
//! strictly earlier positions. Variables have no names in the IR, which is
//! what makes sequences concatenable and sliceable by index.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, StatementKind};

/// Position of a statement (and of the variable it defines).
pub type VarIndex = usize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SequenceError {
    #[error("Statement {position} references variable {input}, which is not defined earlier")]
    ForwardReference { position: usize, input: VarIndex },

    #[error("Statement {position} uses variable {input}, which produces no value")]
    VoidInput { position: usize, input: VarIndex },

    #[error("Operation '{signature}' expects {expected} inputs, got {found}")]
    ArityMismatch {
        signature: String,
        expected: usize,
        found: usize,
    },

    #[error("Index {index} is outside a sequence of length {len}")]
    OutOfRange { index: usize, len: usize },
}

/// One IR node: an operation applied to earlier variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub operation: Operation,
    pub inputs: Vec<VarIndex>,
    /// Source-level variable name, when the statement came from parsed code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Statement {
    pub fn new(operation: Operation, inputs: Vec<VarIndex>) -> Self {
        Self {
            operation,
            inputs,
            label: None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.operation.kind()
    }

    pub fn output_type(&self) -> Option<String> {
        self.operation.output_type()
    }

    /// Receiver variable, for instance-member operations.
    pub fn receiver(&self) -> Option<VarIndex> {
        if self.operation.has_receiver() {
            self.inputs.first().copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct Sequence {
    statements: Vec<Statement>,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Build a sequence from raw statements, checking every reference.
    pub fn from_statements(statements: Vec<Statement>) -> Result<Self, SequenceError> {
        let mut seq = Sequence::new();
        for stmt in statements {
            seq.push_statement(stmt)?;
        }
        Ok(seq)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statement(&self, index: VarIndex) -> Option<&Statement> {
        self.statements.get(index)
    }

    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    pub fn last_index(&self) -> Option<VarIndex> {
        self.statements.len().checked_sub(1)
    }

    /// Declared type of variable `index`, `None` for void or out of range.
    pub fn output_type(&self, index: VarIndex) -> Option<String> {
        self.statements.get(index).and_then(Statement::output_type)
    }

    /// Append an operation; returns the index of the variable it defines.
    pub fn push(
        &mut self,
        operation: Operation,
        inputs: Vec<VarIndex>,
    ) -> Result<VarIndex, SequenceError> {
        self.push_statement(Statement::new(operation, inputs))
    }

    pub fn push_labeled(
        &mut self,
        operation: Operation,
        inputs: Vec<VarIndex>,
        label: Option<String>,
    ) -> Result<VarIndex, SequenceError> {
        self.push_statement(Statement {
            operation,
            inputs,
            label,
        })
    }

    /// Append a statement after checking the ordering invariant.
    pub fn push_statement(&mut self, statement: Statement) -> Result<VarIndex, SequenceError> {
        let position = self.statements.len();
        if !statement.operation.accepts_arity(statement.inputs.len()) {
            return Err(SequenceError::ArityMismatch {
                signature: statement.operation.signature(),
                expected: statement.operation.arity(),
                found: statement.inputs.len(),
            });
        }
        for &input in &statement.inputs {
            if input >= position {
                return Err(SequenceError::ForwardReference { position, input });
            }
            if self.statements[input].output_type().is_none() {
                return Err(SequenceError::VoidInput { position, input });
            }
        }
        self.statements.push(statement);
        Ok(position)
    }

    /// Append all of `other`, re-basing its references by `self.len()`.
    /// Returns the offset applied.
    pub fn append(&mut self, other: &Sequence) -> usize {
        let offset = self.statements.len();
        self.statements
            .extend(other.statements.iter().map(|stmt| Statement {
                operation: stmt.operation.clone(),
                inputs: stmt.inputs.iter().map(|i| i + offset).collect(),
                label: stmt.label.clone(),
            }));
        offset
    }

    pub fn concat(&self, other: &Sequence) -> Sequence {
        let mut out = self.clone();
        out.append(other);
        out
    }

    /// The first `len` statements.
    pub fn prefix(&self, len: usize) -> Sequence {
        Sequence {
            statements: self.statements[..len.min(self.statements.len())].to_vec(),
        }
    }

    /// `index` plus every statement it transitively depends on.
    pub fn dependencies(&self, index: VarIndex) -> Result<BTreeSet<VarIndex>, SequenceError> {
        if index >= self.statements.len() {
            return Err(SequenceError::OutOfRange {
                index,
                len: self.statements.len(),
            });
        }
        let mut closure = BTreeSet::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            if closure.insert(i) {
                stack.extend(self.statements[i].inputs.iter().copied());
            }
        }
        Ok(closure)
    }

    /// Backward data-slice ending at `index`: the minimal subsequence that
    /// produces it, re-indexed so the sliced statement comes last.
    pub fn slice(&self, index: VarIndex) -> Result<Sequence, SequenceError> {
        let keep = self.dependencies(index)?;
        let mut remap = vec![usize::MAX; self.statements.len()];
        let mut statements = Vec::with_capacity(keep.len());
        for (new_index, &old) in keep.iter().enumerate() {
            remap[old] = new_index;
            let stmt = &self.statements[old];
            statements.push(Statement {
                operation: stmt.operation.clone(),
                inputs: stmt.inputs.iter().map(|i| remap[*i]).collect(),
                label: stmt.label.clone(),
            });
        }
        Ok(Sequence { statements })
    }

    /// Check the ordering invariant over the whole sequence.
    pub fn validate(&self) -> Result<(), SequenceError> {
        Sequence::from_statements(self.statements.clone()).map(|_| ())
    }

    /// Collision-free variable names: the statement's label when present and
    /// unused, otherwise `v{index}`.
    pub fn variable_names(&self) -> Vec<String> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut names = Vec::with_capacity(self.statements.len());
        for (i, stmt) in self.statements.iter().enumerate() {
            let preferred = stmt
                .label
                .as_deref()
                .filter(|l| is_identifier(l) && !taken.contains(*l))
                .map(str::to_string);
            let name = preferred.unwrap_or_else(|| {
                let base = format!("v{i}");
                let mut candidate = base.clone();
                let mut n = 1;
                while taken.contains(&candidate) {
                    candidate = format!("{base}_{n}");
                    n += 1;
                }
                candidate
            });
            taken.insert(name.clone());
            names.push(name);
        }
        names
    }

    /// Statements that read variable `index`.
    pub fn uses_of(&self, index: VarIndex) -> Vec<VarIndex> {
        self.statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.inputs.contains(&index))
            .map(|(i, _)| i)
            .collect()
    }
}

impl TryFrom<Vec<Statement>> for Sequence {
    type Error = SequenceError;

    fn try_from(statements: Vec<Statement>) -> Result<Self, Self::Error> {
        Sequence::from_statements(statements)
    }
}

impl From<Sequence> for Vec<Statement> {
    fn from(seq: Sequence) -> Self {
        seq.statements
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
