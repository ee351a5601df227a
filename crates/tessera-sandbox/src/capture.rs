//! Observable-state capture and intersection across repeated runs.

use tessera_ir::introspect::RuntimeSession;
use tessera_ir::runtime::{ObservedState, Value};

use crate::executor::ExecutionResult;

/// Read the observable state of `value`. Primitives, null, unreadable
/// objects, and objects with nothing observable yield `None`.
pub fn capture_state(session: &mut dyn RuntimeSession, value: &Value) -> Option<ObservedState> {
    match session.read_observable_state(value) {
        Ok(Some(state)) if !state.is_empty() => Some(state),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(value = %value, error = %e, "state capture failed");
            None
        }
    }
}

/// Fold a later run into `base`: values and fields that differ between runs
/// are dropped, and a state left with no fields is dropped entirely.
pub fn intersect_runs(base: &mut ExecutionResult, other: &ExecutionResult) {
    for (a, b) in base.statements.iter_mut().zip(&other.statements) {
        if a.value != b.value {
            a.value = None;
        }
        let keep = match (a.state.as_mut(), b.state.as_ref()) {
            (Some(mine), Some(theirs)) if mine.variable == theirs.variable => {
                mine.state.retain_matching(&theirs.state);
                !mine.state.is_empty()
            }
            _ => false,
        };
        if !keep {
            a.state = None;
        }
    }
}
