//! Bounded in-process execution of sequences.
//!
//! Each execution runs on a dedicated worker thread with its own runtime
//! session. The caller waits on a channel with a wall-clock timeout; on
//! expiry the worker is told to stop at the next statement boundary and
//! abandoned, and the execution is reported as failed.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use tessera_ir::introspect::{InvokeError, TypeIntrospector};
use tessera_ir::runtime::{ObservedState, ObservedValue, Thrown, Value};
use tessera_ir::{Sequence, StatementKind, VarIndex};

use crate::capture::{capture_state, intersect_runs};
use crate::config::ExecutorConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorError {
    #[error("Execution exceeded the {timeout_ms} ms budget")]
    Timeout { timeout_ms: u64 },

    #[error("Statement {index} threw {thrown}")]
    Exception { index: VarIndex, thrown: Thrown },

    #[error("Runtime session failed: {message}")]
    Session { message: String },

    #[error("Execution worker panicked: {message}")]
    Panicked { message: String },

    #[error("Execution cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatementOutcome {
    Normal,
    Exceptional { thrown: Thrown },
    NotExecuted,
}

/// Observable state of one variable after a statement ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedState {
    /// Variable whose state was read: the statement's own result, or the
    /// receiver of a trailing void call.
    pub variable: VarIndex,
    pub name: String,
    pub state: ObservedState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub index: VarIndex,
    /// Source-level variable name when the statement carries one.
    pub name: String,
    pub outcome: StatementOutcome,
    /// Produced value; absent for literals, void statements, and values that
    /// differed between repeated runs.
    #[serde(default)]
    pub value: Option<ObservedValue>,
    #[serde(default)]
    pub state: Option<CapturedState>,
}

impl StatementResult {
    fn pending(index: VarIndex, name: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
            outcome: StatementOutcome::NotExecuted,
            value: None,
            state: None,
        }
    }

    pub fn thrown(&self) -> Option<&Thrown> {
        match &self.outcome {
            StatementOutcome::Exceptional { thrown } => Some(thrown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub passed: bool,
    /// Number of runs folded into this result.
    pub runs: usize,
    pub statements: Vec<StatementResult>,
    #[serde(default)]
    pub failure: Option<ExecutorError>,
}

impl ExecutionResult {
    /// A result for an execution that never reached the statements.
    pub fn aborted(seq: &Sequence, failure: ExecutorError) -> Self {
        let names = seq.variable_names();
        Self {
            passed: false,
            runs: 1,
            statements: names
                .iter()
                .enumerate()
                .map(|(i, n)| StatementResult::pending(i, n))
                .collect(),
            failure: Some(failure),
        }
    }

    /// The statement that threw, if the failure was an exception.
    pub fn exception(&self) -> Option<(VarIndex, &Thrown)> {
        match &self.failure {
            Some(ExecutorError::Exception { index, thrown }) => Some((*index, thrown)),
            _ => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.failure, Some(ExecutorError::Timeout { .. }))
    }

    /// Captured object states keyed by variable name.
    pub fn captured_states(&self) -> BTreeMap<&str, &ObservedState> {
        self.statements
            .iter()
            .filter_map(|s| s.state.as_ref())
            .map(|c| (c.name.as_str(), &c.state))
            .collect()
    }
}

pub struct Executor {
    introspector: Arc<dyn TypeIntrospector>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(introspector: Arc<dyn TypeIntrospector>, config: ExecutorConfig) -> Self {
        Self {
            introspector,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn introspector(&self) -> &dyn TypeIntrospector {
        self.introspector.as_ref()
    }

    /// Execute with the configured repeat count.
    pub fn execute(&self, seq: &Sequence) -> ExecutionResult {
        self.execute_repeated(seq, self.config.repeat_count)
    }

    /// Execute `repeat_count` times and intersect the captured state. The
    /// first failing run decides the result.
    pub fn execute_repeated(&self, seq: &Sequence, repeat_count: usize) -> ExecutionResult {
        let mut merged = self.execute_once(seq);
        if !merged.passed {
            return merged;
        }
        for run in 1..repeat_count.max(1) {
            let next = self.execute_once(seq);
            if !next.passed {
                tracing::debug!(run, "repeated execution diverged into a failure");
                return next;
            }
            intersect_runs(&mut merged, &next);
        }
        merged.runs = repeat_count.max(1);
        merged
    }

    fn execute_once(&self, seq: &Sequence) -> ExecutionResult {
        let (tx, rx) = channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let introspector = Arc::clone(&self.introspector);
        let worker_cancel = Arc::clone(&cancel);
        let worker_seq = seq.clone();
        let capture = self.config.capture_state;

        let spawned = thread::Builder::new()
            .name("tessera-exec".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_statements(introspector.as_ref(), &worker_seq, capture, &worker_cancel)
                }))
                .unwrap_or_else(|payload| {
                    ExecutionResult::aborted(
                        &worker_seq,
                        ExecutorError::Panicked {
                            message: panic_message(payload.as_ref()),
                        },
                    )
                });
                // The receiver is gone when the caller already timed out.
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            return ExecutionResult::aborted(
                seq,
                ExecutorError::Session {
                    message: e.to_string(),
                },
            );
        }

        let timeout_ms = self.config.timeout_ms;
        match rx.recv_timeout(Duration::from_millis(timeout_ms)) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::warn!(timeout_ms, statements = seq.len(), "sequence execution timed out");
                ExecutionResult::aborted(seq, ExecutorError::Timeout { timeout_ms })
            }
            Err(RecvTimeoutError::Disconnected) => ExecutionResult::aborted(
                seq,
                ExecutorError::Panicked {
                    message: "worker exited without a result".to_string(),
                },
            ),
        }
    }
}

fn run_statements(
    introspector: &dyn TypeIntrospector,
    seq: &Sequence,
    capture: bool,
    cancel: &AtomicBool,
) -> ExecutionResult {
    let mut session = match introspector.new_session() {
        Ok(s) => s,
        Err(e) => {
            return ExecutionResult::aborted(
                seq,
                ExecutorError::Session {
                    message: e.to_string(),
                },
            )
        }
    };
    let names = seq.variable_names();
    let mut results: Vec<StatementResult> = names
        .iter()
        .enumerate()
        .map(|(i, n)| StatementResult::pending(i, n))
        .collect();
    let mut values: Vec<Option<Value>> = Vec::with_capacity(seq.len());
    let last = seq.last_index();

    for (index, stmt) in seq.statements().iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return ExecutionResult {
                passed: false,
                runs: 1,
                statements: results,
                failure: Some(ExecutorError::Cancelled),
            };
        }
        let args: Vec<Value> = stmt
            .inputs
            .iter()
            .map(|&i| values.get(i).cloned().flatten().unwrap_or(Value::Null))
            .collect();

        let value = match session.invoke(&stmt.operation, &args) {
            Ok(v) => v,
            Err(InvokeError::Thrown(thrown)) => {
                results[index].outcome = StatementOutcome::Exceptional {
                    thrown: thrown.clone(),
                };
                return ExecutionResult {
                    passed: false,
                    runs: 1,
                    statements: results,
                    failure: Some(ExecutorError::Exception { index, thrown }),
                };
            }
            Err(InvokeError::Introspect(e)) => {
                return ExecutionResult {
                    passed: false,
                    runs: 1,
                    statements: results,
                    failure: Some(ExecutorError::Session {
                        message: e.to_string(),
                    }),
                };
            }
        };

        let produced = stmt.output_type().map(|_| value);
        results[index].outcome = StatementOutcome::Normal;
        if capture && stmt.kind() != StatementKind::PrimitiveLiteral {
            match &produced {
                Some(v) => {
                    results[index].value = Some(v.observe());
                    results[index].state =
                        capture_state(session.as_mut(), v).map(|state| CapturedState {
                            variable: index,
                            name: names[index].clone(),
                            state,
                        });
                }
                None if Some(index) == last => {
                    let receiver = stmt
                        .receiver()
                        .and_then(|r| values.get(r).cloned().flatten().map(|v| (r, v)));
                    if let Some((r, v)) = receiver {
                        results[index].state =
                            capture_state(session.as_mut(), &v).map(|state| CapturedState {
                                variable: r,
                                name: names[r].clone(),
                                state,
                            });
                    }
                }
                None => {}
            }
        }
        values.push(produced);
    }

    ExecutionResult {
        passed: true,
        runs: 1,
        statements: results,
        failure: None,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
