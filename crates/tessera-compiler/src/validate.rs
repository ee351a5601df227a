//! Structural validation of a test plan against the program under test.

use std::collections::BTreeSet;

use tessera_ir::introspect::TypeIntrospector;
use tessera_ir::typename::array_dimensions;
use tessera_ir::types::{PlanEntry, TestPlan};
use tessera_ir::{MemberRef, TypeSpec};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Empty operation signature in class '{class}'")]
    EmptySignature { class: String },

    #[error("Malformed signature '{signature}': {reason}")]
    MalformedSignature { signature: String, reason: String },

    #[error("Operation '{signature}' cannot be resolved: {reason}")]
    UnresolvedOperation { signature: String, reason: String },

    #[error("Row {row} of '{signature}' has {found} parameter specs, operation takes {expected}")]
    ArityMismatch {
        signature: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} of '{signature}': array spec '{type_name}' is not an array type")]
    MalformedArrayType {
        signature: String,
        row: usize,
        type_name: String,
    },

    #[error("Row {row} of '{signature}': multi-dimensional array '{type_name}' is unsupported")]
    MultiDimensionalArray {
        signature: String,
        row: usize,
        type_name: String,
    },
}

impl ValidationError {
    pub fn signature(&self) -> Option<&str> {
        match self {
            ValidationError::EmptySignature { .. } => None,
            ValidationError::MalformedSignature { signature, .. }
            | ValidationError::UnresolvedOperation { signature, .. }
            | ValidationError::ArityMismatch { signature, .. }
            | ValidationError::MalformedArrayType { signature, .. }
            | ValidationError::MultiDimensionalArray { signature, .. } => Some(signature),
        }
    }

    /// Whether the error disqualifies the whole operation rather than one row.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ValidationError::EmptySignature { .. }
                | ValidationError::MalformedSignature { .. }
                | ValidationError::UnresolvedOperation { .. }
        )
    }
}

pub fn validate_plan(
    plan: &TestPlan,
    introspector: &dyn TypeIntrospector,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for entry in plan.entries() {
        validate_entry(&entry, introspector, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Signatures whose operation cannot be processed at all.
pub fn unresolvable_signatures(errors: &[ValidationError]) -> BTreeSet<String> {
    errors
        .iter()
        .filter(|e| e.is_structural())
        .filter_map(|e| e.signature().map(str::to_string))
        .collect()
}

fn validate_entry(
    entry: &PlanEntry<'_>,
    introspector: &dyn TypeIntrospector,
    errors: &mut Vec<ValidationError>,
) {
    let signature = entry.signature.trim();
    if signature.is_empty() {
        errors.push(ValidationError::EmptySignature {
            class: entry.class.to_string(),
        });
        return;
    }
    let member = match MemberRef::parse(signature) {
        Ok(m) => m,
        Err(e) => {
            errors.push(ValidationError::MalformedSignature {
                signature: signature.to_string(),
                reason: e.to_string(),
            });
            return;
        }
    };
    let resolved = match introspector.resolve_member(&member) {
        Ok(r) => r,
        Err(e) => {
            errors.push(ValidationError::UnresolvedOperation {
                signature: signature.to_string(),
                reason: e.to_string(),
            });
            return;
        }
    };

    let expected = resolved.operation.param_types().len();
    for (row_index, row) in entry.plan.rows.iter().enumerate() {
        if row.len() != expected {
            errors.push(ValidationError::ArityMismatch {
                signature: signature.to_string(),
                row: row_index,
                expected,
                found: row.len(),
            });
        }
        for spec in row.params() {
            validate_spec(spec, signature, row_index, errors);
        }
    }
}

fn validate_spec(spec: &TypeSpec, signature: &str, row: usize, errors: &mut Vec<ValidationError>) {
    match spec {
        TypeSpec::Scalar { .. } => {}
        TypeSpec::Array {
            type_name,
            elements,
        } => {
            match array_dimensions(type_name) {
                0 => errors.push(ValidationError::MalformedArrayType {
                    signature: signature.to_string(),
                    row,
                    type_name: type_name.clone(),
                }),
                1 => {}
                _ => errors.push(ValidationError::MultiDimensionalArray {
                    signature: signature.to_string(),
                    row,
                    type_name: type_name.clone(),
                }),
            }
            for e in elements {
                validate_spec(e, signature, row, errors);
            }
        }
        TypeSpec::Collection { elements, .. } => {
            for e in elements {
                validate_spec(e, signature, row, errors);
            }
        }
        TypeSpec::Map { keys, values, .. } => {
            for e in keys.iter().chain(values) {
                validate_spec(e, signature, row, errors);
            }
        }
    }
}
