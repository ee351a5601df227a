//! One whole-plan run.
//!
//! Control flow: validate the plan, index the building blocks into a pool,
//! augment the pool for plan-referenced types it cannot build, then cover
//! every row partition by partition. Nothing in here aborts the run for a
//! single bad operation or row; those end up in the coverage map and the
//! diagnostics instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tessera_assert::DiffAssertionSynthesizer;
use tessera_compiler::render;
use tessera_compiler::validate::{unresolvable_signatures, validate_plan, ValidationError};
use tessera_explore::{
    augment_pool, CoverageError, CoverageMap, Extender, RowFailure, RunDiagnostics, RowKey,
    SequencePool,
};
use tessera_ir::introspect::{TypeHierarchy, TypeIntrospector};
use tessera_ir::parse::{parse_building_blocks, parse_plan};
use tessera_ir::types::{BuildingBlocks, TestPlan};
use tessera_ir::typename::erasure;
use tessera_ir::{CoverageStatus, MemberRef, Sequence};
use tessera_sandbox::{ExecutionResult, Executor};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::external::ProcessRunner;
use crate::hierarchy::MemoizedHierarchy;
use crate::summary::RunSummary;

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Input parse error: {0}")]
    Parse(#[from] tessera_ir::parse::ParseError),

    #[error("Coverage bookkeeping error: {0}")]
    Coverage(#[from] CoverageError),
}

/// An extended sequence as handed to the code emitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedSequence {
    pub partition: String,
    pub class: String,
    pub method: String,
    /// Display form of the target signature.
    pub display: String,
    pub row: usize,
    pub status: CoverageStatus,
    pub sequence: Sequence,
    pub code: String,
    /// Code with inline assertions, when annotation was requested and possible.
    pub annotated: Option<String>,
    pub expected_exception: Option<String>,
    pub missing_elements: bool,
    pub reused: bool,
    pub segments: Vec<String>,
    pub imports: Vec<String>,
    pub execution: Option<ExecutionResult>,
}

impl ExtendedSequence {
    pub fn key(&self) -> RowKey {
        RowKey::new(&self.partition, &self.class, &self.method, self.row)
    }
}

/// Everything one run produced.
#[derive(Debug, Default)]
pub struct CampaignReport {
    pub coverage: CoverageMap,
    pub sequences: Vec<ExtendedSequence>,
    /// Why each uncovered row failed, for rows that got that far.
    pub failures: Vec<(RowKey, RowFailure)>,
    pub diagnostics: RunDiagnostics,
    pub validation_errors: Vec<ValidationError>,
    /// Types whose constructor sequences were synthesized before row processing.
    pub augmented_types: BTreeSet<String>,
}

impl CampaignReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_report(self)
    }

    pub fn sequence_for(&self, key: &RowKey) -> Option<&ExtendedSequence> {
        self.sequences.iter().find(|s| &s.key() == key)
    }
}

pub struct Campaign {
    introspector: Arc<dyn TypeIntrospector>,
    hierarchy: MemoizedHierarchy,
    config: RunConfig,
}

impl Campaign {
    pub fn new(
        introspector: Arc<dyn TypeIntrospector>,
        hierarchy: Arc<dyn TypeHierarchy>,
        config: RunConfig,
    ) -> Self {
        Self {
            introspector,
            hierarchy: MemoizedHierarchy::new(hierarchy),
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Parse JSON inputs and run.
    pub fn run_json(&self, plan_json: &str, blocks_json: &str) -> Result<CampaignReport, CampaignError> {
        let plan = parse_plan(plan_json)?;
        let blocks = parse_building_blocks(blocks_json)?;
        self.run(&plan, &blocks)
    }

    pub fn run(&self, plan: &TestPlan, blocks: &BuildingBlocks) -> Result<CampaignReport, CampaignError> {
        let mut report = CampaignReport::default();
        let intro = self.introspector.as_ref();

        let unresolvable = match validate_plan(plan, intro) {
            Ok(()) => BTreeSet::new(),
            Err(errors) => {
                for e in &errors {
                    warn!(error = %e, "test plan problem");
                }
                let bad = unresolvable_signatures(&errors);
                report.validation_errors = errors;
                bad
            }
        };
        report
            .diagnostics
            .unresolved_operations
            .extend(unresolvable.iter().cloned());

        let mut pool = SequencePool::index(
            blocks,
            &plan.targeted_signatures(),
            intro,
            &self.config.pool,
            &mut report.diagnostics,
        );
        let mut wanted = plan.referenced_types();
        wanted.extend(receiver_types(plan, intro, &unresolvable));
        report.augmented_types = augment_pool(
            &mut pool,
            &wanted,
            intro,
            &self.hierarchy,
            &self.config.synth,
            self.config.seed,
        );
        if !report.augmented_types.is_empty() {
            info!(types = ?report.augmented_types, "augmented pool");
        }

        let executor = Executor::new(self.introspector.clone(), self.config.executor.clone());
        let annotator = self
            .config
            .annotate
            .then(|| DiffAssertionSynthesizer::new(self.config.assert.clone()));

        let mut stage: u64 = 0;
        for (partition, classes) in &plan.partitions {
            self.hierarchy.reset();
            let extender = Extender::new(&pool, intro, &self.hierarchy, &executor, &self.config.synth)
                .with_seed(self.config.seed)
                .with_max_nesting_depth(self.config.max_nesting_depth);

            for (class, methods) in classes {
                let class_blocks = blocks.get(class);
                for (signature, method) in methods {
                    report
                        .coverage
                        .init_method(partition, class, signature, method.rows.len());
                    let keys = (0..method.rows.len()).map(|i| RowKey::new(partition, class, signature, i));

                    let target = if unresolvable.contains(signature.trim()) {
                        Err(RowFailure::Structural {
                            message: format!("'{signature}' failed plan validation"),
                        })
                    } else {
                        extender.resolve_target(signature)
                    };
                    let target = match target {
                        Ok(t) => t,
                        Err(failure) => {
                            warn!(signature = %signature, ?failure, "skipping operation");
                            report
                                .diagnostics
                                .unresolved_operations
                                .insert(signature.clone());
                            for key in keys {
                                report.coverage.record(&key, CoverageStatus::Uncovered)?;
                                report.failures.push((key, failure.clone()));
                            }
                            stage += method.rows.len() as u64;
                            continue;
                        }
                    };

                    for (key, row) in keys.zip(&method.rows) {
                        let outcome = extender.cover_row(&target, row, stage, &mut report.diagnostics);
                        stage += 1;
                        report.coverage.record(&key, outcome.status)?;
                        if let Some(failure) = outcome.failure.clone() {
                            report.failures.push((key.clone(), failure));
                        }
                        let Some(sequence) = outcome.sequence else {
                            continue;
                        };

                        let (annotated, expected_exception) =
                            match (&annotator, &outcome.execution) {
                                (Some(a), Some(exec)) => match a.inject(&sequence, exec) {
                                    Ok(ann) => (Some(ann.code()), ann.expected_exception),
                                    Err(e) => {
                                        debug!(row = %key, error = %e, "not annotated");
                                        (None, None)
                                    }
                                },
                                _ => (None, None),
                            };

                        report.sequences.push(ExtendedSequence {
                            partition: partition.clone(),
                            class: class.clone(),
                            method: signature.clone(),
                            display: method.display.clone(),
                            row: key.row,
                            status: outcome.status,
                            code: render(&sequence),
                            sequence,
                            annotated,
                            expected_exception,
                            missing_elements: outcome.missing_elements,
                            reused: outcome.reused,
                            segments: class_blocks.map(|b| b.segments.clone()).unwrap_or_default(),
                            imports: class_blocks.map(|b| b.imports.clone()).unwrap_or_default(),
                            execution: outcome.execution,
                        });
                    }
                }
            }
        }

        let summary = report.summary();
        info!(
            rows = summary.totals.total,
            covered = summary.totals.covered,
            partial = summary.totals.partial,
            uncovered = summary.totals.uncovered,
            "run finished"
        );
        Ok(report)
    }

    /// Re-run in-process execution failures through the secondary runner and
    /// upgrade the rows that pass there. Returns the number of upgraded rows.
    /// A runner failure for one row is logged and skipped.
    pub async fn validate_externally(
        &self,
        report: &mut CampaignReport,
        runner: &ProcessRunner,
    ) -> Result<usize, CampaignError> {
        let mut upgraded = 0;
        for ext in report
            .sequences
            .iter_mut()
            .filter(|s| s.status == CoverageStatus::UncoveredExecFail)
        {
            let key = ext.key();
            match runner.run(&ext.code).await {
                Ok(verdict) if verdict.passed() => {
                    report.coverage.upgrade_external(&key, ext.missing_elements)?;
                    ext.status = report.coverage.status(&key).unwrap_or(ext.status);
                    upgraded += 1;
                }
                Ok(verdict) => {
                    debug!(row = %key, ?verdict, "external run failed");
                }
                Err(e) => {
                    warn!(row = %key, error = %e, "external runner error");
                }
            }
        }
        Ok(upgraded)
    }
}

/// Declaring types of the plan's resolvable instance targets.
fn receiver_types(
    plan: &TestPlan,
    introspector: &dyn TypeIntrospector,
    skip: &BTreeSet<String>,
) -> BTreeSet<String> {
    plan.entries()
        .filter(|e| !skip.contains(e.signature.trim()))
        .filter_map(|e| MemberRef::parse(e.signature).ok())
        .filter_map(|member| introspector.resolve_member(&member).ok())
        .filter(|resolved| resolved.operation.has_receiver())
        .filter_map(|resolved| resolved.operation.declaring_type().map(erasure))
        .collect()
}
