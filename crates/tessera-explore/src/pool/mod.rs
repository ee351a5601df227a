//! The sequence pool: constructor slices, operation prefixes, and literal
//! values mined from building-block fragments.
//!
//! The pool is built once and read-only afterwards. Every entry list is
//! kept sorted by statement count, then rendered code length, then code,
//! so selection never depends on indexing order.

pub mod primitive;

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tessera_compiler::{parse_prefix, render, ParseContext, PrefixParse};
use tessera_ir::introspect::TypeIntrospector;
use tessera_ir::typename::erasure;
use tessera_ir::types::BuildingBlocks;
use tessera_ir::{Operation, Sequence, StatementKind};

use crate::config::PoolConfig;
use crate::diagnostics::RunDiagnostics;
use primitive::PrimitivePool;

/// An indexed sequence together with its rendered form.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledSequence {
    pub sequence: Sequence,
    pub code: String,
    /// Class whose building blocks the sequence came from.
    pub origin: String,
}

impl PooledSequence {
    pub fn new(sequence: Sequence, origin: impl Into<String>) -> Self {
        let code = render(&sequence);
        Self {
            sequence,
            code,
            origin: origin.into(),
        }
    }

    fn sort_key(&self) -> (usize, usize, &str) {
        (self.sequence.len(), self.code.len(), &self.code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequencePool {
    /// Erased type → slices ending in a constructor of that type.
    constructors: BTreeMap<String, Vec<PooledSequence>>,
    /// Operation signature → prefixes ending in a call to it.
    operations: BTreeMap<String, Vec<PooledSequence>>,
    primitives: PrimitivePool,
}

impl SequencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every fragment and index the results. Only operations in
    /// `targets` get operation-index entries.
    pub fn index(
        blocks: &BuildingBlocks,
        targets: &BTreeSet<String>,
        introspector: &dyn TypeIntrospector,
        config: &PoolConfig,
        diagnostics: &mut RunDiagnostics,
    ) -> Self {
        let jobs: Vec<(&str, &[String], &str)> = blocks
            .classes
            .iter()
            .flat_map(|(class, b)| {
                b.sequences
                    .iter()
                    .map(move |code| (class.as_str(), b.imports.as_slice(), code.as_str()))
            })
            .collect();

        let parsed: Vec<(&str, PrefixParse)> = jobs
            .par_iter()
            .map(|&(class, imports, code)| {
                let ctx = ParseContext::new(introspector)
                    .with_imports(imports)
                    .with_declaring_type(class);
                (class, parse_prefix(code, &ctx))
            })
            .collect();

        let mut pool = SequencePool::new();
        for (class, result) in parsed {
            diagnostics.sequences_seen += 1;
            let seq = result.parsed.sequence;
            match result.error {
                None if seq.is_empty() => diagnostics.skipped += 1,
                None => {
                    diagnostics.fully_parsed += 1;
                    pool.add_sequence(&seq, class, targets, introspector, diagnostics);
                }
                Some(err) => {
                    diagnostics.record_parse_error(err.kind());
                    if seq.is_empty() {
                        tracing::debug!(class, kind = err.kind(), error = %err, "dropped building block");
                        continue;
                    }
                    diagnostics.partially_parsed += 1;
                    if config.keep_partial_prefixes {
                        pool.add_sequence(&seq, class, targets, introspector, diagnostics);
                    } else {
                        tracing::debug!(
                            class,
                            kind = err.kind(),
                            statements = seq.len(),
                            "dropped partially parsed building block"
                        );
                    }
                }
            }
        }
        pool.finish();

        tracing::info!(
            sequences = diagnostics.sequences_seen,
            parsed = diagnostics.fully_parsed,
            partial = diagnostics.partially_parsed,
            errors = diagnostics.parse_error_total(),
            constructed_types = pool.constructors.len(),
            operations = pool.operations.len(),
            literals = pool.primitives.len(),
            "indexed sequence pool"
        );
        pool
    }

    /// Index one parsed sequence: constructor slices scanning backward,
    /// targeted prefixes scanning forward, then literal operands.
    pub fn add_sequence(
        &mut self,
        seq: &Sequence,
        origin: &str,
        targets: &BTreeSet<String>,
        introspector: &dyn TypeIntrospector,
        diagnostics: &mut RunDiagnostics,
    ) {
        let stmts = seq.statements();

        for (i, stmt) in stmts.iter().enumerate().rev() {
            let Operation::Constructor { declaring, .. } = &stmt.operation else {
                continue;
            };
            let Ok(slice) = seq.slice(i) else {
                continue;
            };
            if is_public_sequence(&slice, introspector) {
                self.insert_constructor(declaring, PooledSequence::new(slice, origin));
            } else {
                diagnostics.non_public_filtered += 1;
            }
        }

        for (i, stmt) in stmts.iter().enumerate() {
            if !matches!(
                stmt.kind(),
                StatementKind::MethodCall | StatementKind::ConstructorCall
            ) {
                continue;
            }
            let signature = stmt.operation.signature();
            if !targets.contains(&signature) {
                continue;
            }
            let prefix = seq.prefix(i + 1);
            if is_public_sequence(&prefix, introspector) {
                self.operations
                    .entry(signature)
                    .or_default()
                    .push(PooledSequence::new(prefix, origin));
            } else {
                diagnostics.non_public_filtered += 1;
            }
        }

        for (i, stmt) in stmts.iter().enumerate() {
            let Operation::Literal { type_name, value } = &stmt.operation else {
                continue;
            };
            let operand = seq
                .uses_of(i)
                .into_iter()
                .any(|user| stmts[user].receiver() != Some(i));
            if operand {
                self.primitives.observe(type_name, value);
            }
        }
    }

    /// Register a constructor sequence for `type_name` (erased).
    pub fn insert_constructor(&mut self, type_name: &str, pooled: PooledSequence) {
        let entries = self.constructors.entry(erasure(type_name)).or_default();
        if !entries.iter().any(|e| e.code == pooled.code) {
            entries.push(pooled);
            entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }
    }

    /// Sort and deduplicate every entry list.
    fn finish(&mut self) {
        for entries in self
            .constructors
            .values_mut()
            .chain(self.operations.values_mut())
        {
            entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            entries.dedup_by(|a, b| a.code == b.code);
        }
    }

    pub fn constructors_of(&self, type_name: &str) -> &[PooledSequence] {
        self.constructors
            .get(&erasure(type_name))
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn has_constructor(&self, type_name: &str) -> bool {
        !self.constructors_of(type_name).is_empty()
    }

    pub fn operation_prefixes(&self, signature: &str) -> &[PooledSequence] {
        self.operations.get(signature).map_or(&[][..], Vec::as_slice)
    }

    pub fn constructed_types(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn indexed_operations(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn primitives(&self) -> &PrimitivePool {
        &self.primitives
    }
}

/// Whether every member the sequence touches is publicly accessible.
pub fn is_public_sequence(seq: &Sequence, introspector: &dyn TypeIntrospector) -> bool {
    seq.statements()
        .iter()
        .all(|s| introspector.is_publicly_accessible(&s.operation))
}
