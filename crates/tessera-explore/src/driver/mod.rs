//! Row extension: pick a base sequence for a target operation, synthesize
//! its arguments, append the call, and classify what happened.

pub mod coverage;

use std::collections::BTreeSet;

use serde::Serialize;
use tessera_ir::introspect::{TypeHierarchy, TypeIntrospector};
use tessera_ir::typename::{
    array_element, erasure, is_primitive_like, mentions_type_variable, substitute_type_variables,
};
use tessera_ir::{CoverageRow, CoverageStatus, MemberRef, Operation, Sequence, TypeSpec, VarIndex};
use tessera_sandbox::{ExecutionResult, Executor, ExecutorError};

use crate::config::SynthConfig;
use crate::diagnostics::RunDiagnostics;
use crate::pool::{PooledSequence, SequencePool};
use crate::synth::rng::row_rng;
use crate::synth::{SynthError, Synthesizer};

/// Why a row did not end up covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RowFailure {
    NonInstantiable { type_name: String },
    NoBaseSequence { declaring: String },
    Structural { message: String },
    UnsupportedShape { message: String },
    Execution { error: ExecutorError },
}

impl RowFailure {
    fn from_synthesis(err: SynthError) -> (CoverageStatus, Self) {
        match err {
            SynthError::NonInstantiable { type_name } | SynthError::NoArrayElements { type_name } => (
                CoverageStatus::UncoveredNonInstantiable,
                RowFailure::NonInstantiable { type_name },
            ),
            e @ SynthError::UnsupportedShape { .. } => (
                CoverageStatus::Uncovered,
                RowFailure::UnsupportedShape {
                    message: e.to_string(),
                },
            ),
            e @ SynthError::Sequence(_) => (
                CoverageStatus::Uncovered,
                RowFailure::Structural {
                    message: e.to_string(),
                },
            ),
        }
    }
}

/// Result of covering one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub status: CoverageStatus,
    /// The extended sequence, when one was built.
    pub sequence: Option<Sequence>,
    pub execution: Option<ExecutionResult>,
    pub failure: Option<RowFailure>,
    /// Some container element could not be produced.
    pub missing_elements: bool,
    /// The sequence came from the pool unchanged.
    pub reused: bool,
}

impl RowOutcome {
    fn failed(status: CoverageStatus, failure: RowFailure) -> Self {
        Self {
            status,
            sequence: None,
            execution: None,
            failure: Some(failure),
            missing_elements: false,
            reused: false,
        }
    }
}

pub struct Extender<'a> {
    pool: &'a SequencePool,
    introspector: &'a dyn TypeIntrospector,
    hierarchy: &'a dyn TypeHierarchy,
    executor: &'a Executor,
    config: &'a SynthConfig,
    seed: u64,
    max_nesting_depth: usize,
}

impl<'a> Extender<'a> {
    pub fn new(
        pool: &'a SequencePool,
        introspector: &'a dyn TypeIntrospector,
        hierarchy: &'a dyn TypeHierarchy,
        executor: &'a Executor,
        config: &'a SynthConfig,
    ) -> Self {
        Self {
            pool,
            introspector,
            hierarchy,
            executor,
            config,
            seed: 42,
            max_nesting_depth: 3,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Resolve a plan signature to a fully typed operation.
    pub fn resolve_target(&self, signature: &str) -> Result<Operation, RowFailure> {
        let member = MemberRef::parse(signature).map_err(|e| RowFailure::Structural {
            message: e.to_string(),
        })?;
        self.introspector
            .resolve_member(&member)
            .map(|resolved| resolved.operation)
            .map_err(|e| RowFailure::Structural {
                message: e.to_string(),
            })
    }

    /// Cover one row of `target`. `stage_id` seeds the row's RNG.
    pub fn cover_row(
        &self,
        target: &Operation,
        row: &CoverageRow,
        stage_id: u64,
        diagnostics: &mut RunDiagnostics,
    ) -> RowOutcome {
        let signature = target.signature();
        let row = row.truncated(self.max_nesting_depth);
        let outcome = self.extend(target, &signature, &row, stage_id, diagnostics);
        tracing::debug!(
            signature = %signature,
            row = %row,
            status = %outcome.status,
            reused = outcome.reused,
            "covered row"
        );
        outcome
    }

    fn extend(
        &self,
        target: &Operation,
        signature: &str,
        row: &CoverageRow,
        stage_id: u64,
        diagnostics: &mut RunDiagnostics,
    ) -> RowOutcome {
        let params = target.param_types();
        if params.len() != row.len() {
            return RowOutcome::failed(
                CoverageStatus::Uncovered,
                RowFailure::Structural {
                    message: format!(
                        "row has {} parameter specs, '{signature}' takes {}",
                        row.len(),
                        params.len()
                    ),
                },
            );
        }

        if let Some(pooled) = self.exact_match(signature, row) {
            return RowOutcome {
                status: CoverageStatus::Covered,
                sequence: Some(pooled.sequence.clone()),
                execution: None,
                failure: None,
                missing_elements: false,
                reused: true,
            };
        }

        let Some((mut seq, receiver)) = self.base_sequence(target, signature) else {
            let declaring = target.declaring_type().map(erasure).unwrap_or_default();
            return RowOutcome::failed(
                CoverageStatus::UncoveredNoInitSeq,
                RowFailure::NoBaseSequence { declaring },
            );
        };

        let mut synth = Synthesizer::new(
            self.pool,
            self.introspector,
            self.hierarchy,
            self.config,
            row_rng(self.seed, stage_id),
        )
        .with_reserved(row.required_types());
        let mut inputs: Vec<VarIndex> = receiver.into_iter().collect();
        let mut complete = true;
        let mut fatal = None;
        for spec in row.params() {
            match synth.synthesize(spec, &mut seq) {
                Ok(s) => {
                    complete &= s.complete;
                    inputs.push(s.var);
                }
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }
        diagnostics
            .non_instantiable_types
            .extend(synth.non_instantiable().iter().cloned());
        if let Some(err) = fatal {
            diagnostics.record_synthesis_error(err.kind());
            let (status, failure) = RowFailure::from_synthesis(err);
            return RowOutcome::failed(status, failure);
        }

        let witness = self.config.witness_type.as_str();
        let call = target.map_types(|t| {
            if mentions_type_variable(t) {
                substitute_type_variables(t, witness)
            } else {
                t.to_string()
            }
        });
        let call_index = match seq.push(call, inputs) {
            Ok(i) => i,
            Err(e) => {
                return RowOutcome::failed(
                    CoverageStatus::Uncovered,
                    RowFailure::Structural {
                        message: e.to_string(),
                    },
                )
            }
        };

        let execution = self.executor.execute(&seq);
        diagnostics.executions += 1;
        let (status, failure) = if execution.passed {
            let status = if complete {
                CoverageStatus::Covered
            } else {
                CoverageStatus::Partial
            };
            (status, None)
        } else {
            diagnostics.execution_failures += 1;
            if execution.timed_out() {
                diagnostics.timeouts += 1;
            }
            if let Some((_, thrown)) = execution.exception() {
                diagnostics.record_exception(&thrown.type_name);
            }
            let status = match execution.exception() {
                Some((index, _)) if index == call_index => CoverageStatus::UncoveredException,
                _ => CoverageStatus::UncoveredExecFail,
            };
            let failure = execution
                .failure
                .clone()
                .map(|error| RowFailure::Execution { error });
            (status, failure)
        };

        RowOutcome {
            status,
            sequence: Some(seq),
            execution: Some(execution),
            failure,
            missing_elements: !complete,
            reused: false,
        }
    }

    /// A pooled prefix whose final call already takes arguments of exactly
    /// the row's parameter types. Rows with container or array parameters
    /// never match.
    fn exact_match(&self, signature: &str, row: &CoverageRow) -> Option<&'a PooledSequence> {
        let scalar_only = row.params().iter().all(|spec| {
            matches!(spec, TypeSpec::Scalar { type_name } if array_element(type_name).is_none())
        });
        if !scalar_only {
            return None;
        }
        self.pool.operation_prefixes(signature).iter().find(|p| {
            let Some(last) = p.sequence.last() else {
                return false;
            };
            let args = &last.inputs[usize::from(last.operation.has_receiver())..];
            args.len() == row.len()
                && args.iter().zip(row.params()).all(|(&arg, spec)| {
                    p.sequence
                        .output_type(arg)
                        .is_some_and(|t| erasure(&t) == erasure(spec.type_name()))
                })
        })
    }

    /// The sequence to extend and, for instance members, the receiver.
    fn base_sequence(
        &self,
        target: &Operation,
        signature: &str,
    ) -> Option<(Sequence, Option<VarIndex>)> {
        if !target.has_receiver() {
            return Some((Sequence::new(), None));
        }

        let from_prefix = self.pool.operation_prefixes(signature).iter().find_map(|p| {
            let receiver = p.sequence.last()?.receiver()?;
            p.sequence.slice(receiver).ok()
        });
        if let Some(slice) = from_prefix {
            let receiver = slice.len().checked_sub(1)?;
            return Some((slice, Some(receiver)));
        }

        let declaring = target.declaring_type()?;
        let pooled = self.pool.constructors_of(declaring).first().or_else(|| {
            self.hierarchy
                .concrete_types_of(declaring)
                .iter()
                .find_map(|sub| self.pool.constructors_of(sub).first())
        })?;
        let receiver = pooled.sequence.len().checked_sub(1)?;
        Some((pooled.sequence.clone(), Some(receiver)))
    }
}

/// Add constructor sequences for plan-referenced types the pool cannot
/// build yet, using direct construction only. Returns the types added.
pub fn augment_pool(
    pool: &mut SequencePool,
    types: &BTreeSet<String>,
    introspector: &dyn TypeIntrospector,
    hierarchy: &dyn TypeHierarchy,
    config: &SynthConfig,
    seed: u64,
) -> BTreeSet<String> {
    let candidates: BTreeSet<String> = types
        .iter()
        .map(|t| erasure(t))
        .filter(|t| {
            !is_primitive_like(t)
                && array_element(t).is_none()
                && !mentions_type_variable(t)
                && !pool.has_constructor(t)
        })
        .collect();

    let mut built = Vec::new();
    {
        let mut synth = Synthesizer::new(pool, introspector, hierarchy, config, row_rng(seed, 0));
        for t in &candidates {
            let mut seq = Sequence::new();
            if synth.synthesize(&TypeSpec::scalar(t.as_str()), &mut seq).is_err() {
                continue;
            }
            let constructs_itself = matches!(
                seq.last().map(|s| &s.operation),
                Some(Operation::Constructor { declaring, .. }) if erasure(declaring) == *t
            );
            if constructs_itself {
                built.push((t.clone(), seq));
            }
        }
    }

    let mut added = BTreeSet::new();
    for (t, seq) in built {
        pool.insert_constructor(&t, PooledSequence::new(seq, "<synthesized>"));
        added.insert(t);
    }
    if !added.is_empty() {
        tracing::debug!(types = added.len(), "augmented pool with direct constructions");
    }
    added
}
