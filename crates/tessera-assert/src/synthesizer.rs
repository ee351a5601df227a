//! Inline differential assertions.
//!
//! [`DiffAssertionSynthesizer::inject`] re-renders a sequence and follows
//! each statement with assertions on what the execution captured: the
//! produced value, and the observable fields of the produced object (or of
//! the receiver of a trailing void call). A statement that threw is wrapped
//! in a try/fail/catch block and nothing after it is emitted.

use tessera_compiler::render::{declared_type, render_lines};
use tessera_ir::runtime::Thrown;
use tessera_ir::typename::erasure;
use tessera_ir::{Sequence, StatementKind};
use tessera_sandbox::{CapturedState, ExecutionResult, ExecutorError, StatementOutcome};

use crate::config::AssertConfig;
use crate::expect::assertion_for;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AssertError {
    #[error("Execution result has {found} statements, sequence has {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Execution did not run to a verdict: {failure}")]
    Inconclusive { failure: ExecutorError },
}

/// A sequence rendered with its assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotated {
    pub lines: Vec<String>,
    pub assertion_count: usize,
    /// Exception type the code expects, when a statement threw.
    pub expected_exception: Option<String>,
}

impl Annotated {
    pub fn code(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiffAssertionSynthesizer {
    config: AssertConfig,
}

impl DiffAssertionSynthesizer {
    pub fn new(config: AssertConfig) -> Self {
        Self { config }
    }

    /// Annotate `seq` using the states captured in `result`.
    pub fn inject(&self, seq: &Sequence, result: &ExecutionResult) -> Result<Annotated, AssertError> {
        if result.statements.len() != seq.len() {
            return Err(AssertError::LengthMismatch {
                expected: seq.len(),
                found: result.statements.len(),
            });
        }
        match &result.failure {
            None | Some(ExecutorError::Exception { .. }) => {}
            Some(other) => {
                return Err(AssertError::Inconclusive {
                    failure: other.clone(),
                })
            }
        }

        let names = seq.variable_names();
        let code = render_lines(seq);
        let mut out = Annotated {
            lines: Vec::with_capacity(seq.len() * 2),
            assertion_count: 0,
            expected_exception: None,
        };

        for ((stmt, line), outcome) in seq.statements().iter().zip(&code).zip(&result.statements) {
            match &outcome.outcome {
                StatementOutcome::Exceptional { thrown } => {
                    out.lines.extend(expect_thrown(line, thrown));
                    out.assertion_count += 1;
                    out.expected_exception = Some(thrown.type_name.clone());
                    break;
                }
                StatementOutcome::NotExecuted => break,
                StatementOutcome::Normal => {}
            }
            out.lines.push(line.clone());

            let asserts_value = !matches!(
                stmt.kind(),
                StatementKind::PrimitiveLiteral
                    | StatementKind::ArrayCreate
                    | StatementKind::ConstructorCall
            );
            if asserts_value {
                if let (Some(value), Some(t)) = (&outcome.value, stmt.output_type()) {
                    let name = &names[outcome.index];
                    out.lines
                        .push(assertion_for(name, &t, value, self.config.tolerance));
                    out.assertion_count += 1;
                }
            }
            if let Some(captured) = &outcome.state {
                let static_type = seq.output_type(captured.variable).unwrap_or_default();
                let lines = self.state_assertions(&names[captured.variable], &static_type, captured);
                out.assertion_count += lines.len();
                out.lines.extend(lines);
            }
        }

        tracing::debug!(
            statements = seq.len(),
            assertions = out.assertion_count,
            expects = ?out.expected_exception,
            "annotated sequence"
        );
        Ok(out)
    }

    fn state_assertions(&self, var: &str, static_type: &str, captured: &CapturedState) -> Vec<String> {
        let runtime_type = &captured.state.type_name;
        let receiver = if !static_type.is_empty() && erasure(static_type) != erasure(runtime_type) {
            format!("(({}) {var})", declared_type(runtime_type))
        } else {
            var.to_string()
        };

        captured
            .state
            .fields
            .iter()
            .filter(|(_, f)| self.config.derived_fields || !f.is_derived())
            .map(|(name, field)| {
                let expr = match &field.accessor {
                    Some(accessor) => format!("{receiver}.{accessor}()"),
                    None => format!("{receiver}.{name}"),
                };
                assertion_for(&expr, &field.declared_type, &field.value, self.config.tolerance)
            })
            .collect()
    }
}

/// Wrap a statement that is expected to throw.
fn expect_thrown(line: &str, thrown: &Thrown) -> Vec<String> {
    let exception = erasure(&thrown.type_name);
    vec![
        "try {".to_string(),
        format!("    {line}"),
        format!("    fail(\"Expected {exception}\");"),
        format!("}} catch ({exception} expected) {{"),
        format!("    // {}", thrown.simple_name()),
        "}".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::runtime::{ObservedField, ObservedState, ObservedValue};
    use tessera_ir::{Literal, Operation};
    use tessera_sandbox::StatementResult;

    fn seq() -> Sequence {
        let mut s = Sequence::new();
        s.push_labeled(
            Operation::Constructor {
                declaring: "com.acme.Circle".into(),
                params: vec![],
            },
            vec![],
            Some("shape".into()),
        )
        .unwrap();
        s
    }

    fn circle_state(variable: usize) -> CapturedState {
        let mut state = ObservedState::new("com.acme.Circle");
        state.fields.insert(
            "radius".into(),
            ObservedField {
                declared_type: "double".into(),
                value: ObservedValue::Literal(Literal::Float(0.5)),
                accessor: Some("getRadius".into()),
            },
        );
        CapturedState {
            variable,
            name: "shape".into(),
            state,
        }
    }

    #[test]
    fn test_derived_fields_can_be_skipped() {
        let s = seq();
        let result = ExecutionResult {
            passed: true,
            runs: 1,
            statements: vec![StatementResult {
                index: 0,
                name: "shape".into(),
                outcome: StatementOutcome::Normal,
                value: Some(ObservedValue::Object {
                    type_name: "com.acme.Circle".into(),
                }),
                state: Some(circle_state(0)),
            }],
            failure: None,
        };

        let all = DiffAssertionSynthesizer::default().inject(&s, &result).unwrap();
        assert_eq!(all.assertion_count, 1);
        assert_eq!(
            all.lines[1],
            "assertEquals(0.5, shape.getRadius(), 1e-6);"
        );

        let public_only = DiffAssertionSynthesizer::new(AssertConfig {
            derived_fields: false,
            ..AssertConfig::default()
        })
        .inject(&s, &result)
        .unwrap();
        assert_eq!(public_only.assertion_count, 0);
    }

    #[test]
    fn test_length_mismatch() {
        let result = ExecutionResult {
            passed: true,
            runs: 1,
            statements: vec![],
            failure: None,
        };
        assert_eq!(
            DiffAssertionSynthesizer::default().inject(&seq(), &result),
            Err(AssertError::LengthMismatch {
                expected: 1,
                found: 0
            })
        );
    }
}
