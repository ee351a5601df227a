mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera_explore::{
    augment_pool, ContainerPolicy, Extender, PooledSequence, RowFailure, RunDiagnostics,
    SequencePool, SynthConfig,
};
use tessera_ir::{CoverageRow, CoverageStatus, Literal, Operation, Sequence, StatementKind, TypeSpec};
use tessera_sandbox::ObjectModel;

fn row(specs: Vec<TypeSpec>) -> CoverageRow {
    CoverageRow(specs)
}

fn cover(
    model: &Arc<ObjectModel>,
    pool: &SequencePool,
    config: &SynthConfig,
    signature: &str,
    row: &CoverageRow,
) -> (tessera_explore::RowOutcome, RunDiagnostics) {
    let executor = common::executor(model);
    let extender = Extender::new(pool, model.as_ref(), model.as_ref(), &executor, config);
    let target = extender.resolve_target(signature).unwrap();
    let mut diag = RunDiagnostics::new();
    let outcome = extender.cover_row(&target, row, 0, &mut diag);
    (outcome, diag)
}

/// A pool holding only the given constructor sequences.
fn pool_with(entries: Vec<(&str, Sequence)>) -> SequencePool {
    let mut pool = SequencePool::new();
    for (type_name, seq) in entries {
        pool.insert_constructor(type_name, PooledSequence::new(seq, "test"));
    }
    pool
}

fn construct(type_name: &str, arg: Option<i64>) -> Sequence {
    let mut seq = Sequence::new();
    let mut inputs = Vec::new();
    let mut params = Vec::new();
    if let Some(v) = arg {
        inputs.push(
            seq.push(
                Operation::Literal {
                    type_name: "int".into(),
                    value: Literal::Int(v),
                },
                vec![],
            )
            .unwrap(),
        );
        params.push("int".to_string());
    }
    seq.push(
        Operation::Constructor {
            declaring: type_name.into(),
            params,
        },
        inputs,
    )
    .unwrap();
    seq
}

#[test]
fn test_scalar_row_on_empty_pool_is_covered() {
    let model = Arc::new(common::model());
    let (outcome, diag) = cover(
        &model,
        &SequencePool::new(),
        &SynthConfig::default(),
        "com.acme.Calc.f(int)",
        &row(vec![TypeSpec::scalar("int")]),
    );

    assert_eq!(outcome.status, CoverageStatus::Covered);
    let seq = outcome.sequence.unwrap();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.statements()[0].kind(), StatementKind::PrimitiveLiteral);
    assert_eq!(seq.statements()[1].inputs, vec![0]);
    assert!(outcome.execution.unwrap().passed);
    assert_eq!(diag.executions, 1);
}

#[test]
fn test_collection_of_non_instantiable_elements() {
    let model = Arc::new(common::model());
    let spec = TypeSpec::Collection {
        type_name: "java.util.List<com.acme.Foo>".into(),
        elements: vec![TypeSpec::scalar("com.acme.Foo")],
    };
    let the_row = row(vec![spec]);

    let (outcome, diag) = cover(
        &model,
        &SequencePool::new(),
        &SynthConfig::default(),
        "com.acme.Calc.g(java.util.List)",
        &the_row,
    );
    assert_eq!(outcome.status, CoverageStatus::UncoveredNonInstantiable);
    assert_eq!(
        outcome.failure,
        Some(RowFailure::NonInstantiable {
            type_name: "com.acme.Foo".into()
        })
    );
    assert!(diag.non_instantiable_types.contains("com.acme.Foo"));
    assert_eq!(diag.executions, 0);

    let accept = SynthConfig {
        container_policy: ContainerPolicy::AcceptEmpty,
        ..SynthConfig::default()
    };
    let (outcome, _) = cover(
        &model,
        &SequencePool::new(),
        &accept,
        "com.acme.Calc.g(java.util.List)",
        &the_row,
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    assert_eq!(outcome.sequence.unwrap().len(), 2);
}

#[test]
fn test_exception_in_target_call() {
    let model = Arc::new(common::model());
    let (outcome, diag) = cover(
        &model,
        &SequencePool::new(),
        &SynthConfig::default(),
        "com.acme.Calc.boom(int)",
        &row(vec![TypeSpec::scalar("int")]),
    );

    assert_eq!(outcome.status, CoverageStatus::UncoveredException);
    assert!(matches!(outcome.failure, Some(RowFailure::Execution { .. })));
    assert_eq!(diag.exceptions.get("java.lang.IllegalStateException"), Some(&1));
    assert_eq!(diag.execution_failures, 1);
}

#[test]
fn test_failing_setup_is_an_execution_failure() {
    let model = Arc::new(common::model());
    let pool = pool_with(vec![("com.acme.Fragile", construct("com.acme.Fragile", Some(-1)))]);
    let (outcome, _) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Fragile.poke()",
        &row(vec![]),
    );

    assert_eq!(outcome.status, CoverageStatus::UncoveredExecFail);
    let seq = outcome.sequence.unwrap();
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.statements()[2].inputs, vec![1]);
}

#[test]
fn test_instance_method_without_receiver_sequence() {
    let model = Arc::new(common::model());
    let (outcome, _) = cover(
        &model,
        &SequencePool::new(),
        &SynthConfig::default(),
        "com.acme.Gadget.spin()",
        &row(vec![]),
    );

    assert_eq!(outcome.status, CoverageStatus::UncoveredNoInitSeq);
    assert_eq!(
        outcome.failure,
        Some(RowFailure::NoBaseSequence {
            declaring: "com.acme.Gadget".into()
        })
    );
}

#[test]
fn test_exact_pool_match_is_reused() {
    let model = Arc::new(common::model());
    let targets = common::targets(&["com.acme.Widget.scale(double)"]);
    let (pool, _) = common::pool(&model, &targets);

    let (outcome, diag) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Widget.scale(double)",
        &row(vec![TypeSpec::scalar("double")]),
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    assert!(outcome.reused);
    assert!(outcome.execution.is_none());
    assert_eq!(diag.executions, 0);

    // A boxed parameter is a different row; the prefix only lends its receiver.
    let (outcome, _) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Widget.scale(double)",
        &row(vec![TypeSpec::scalar("java.lang.Double")]),
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    assert!(!outcome.reused);
    let seq = outcome.sequence.unwrap();
    assert_eq!(seq.len(), 4);
    assert_eq!(seq.statements()[3].inputs, vec![1, 2]);
}

#[test]
fn test_array_and_map_parameters() {
    let model = Arc::new(common::model());
    let (pool, _) = common::pool(&model, &BTreeSet::new());
    let the_row = row(vec![
        TypeSpec::Array {
            type_name: "com.acme.Shape[]".into(),
            elements: vec![
                TypeSpec::scalar("com.acme.Circle"),
                TypeSpec::scalar("com.acme.Square"),
            ],
        },
        TypeSpec::Map {
            type_name: "java.util.Map<java.lang.String,java.lang.Integer>".into(),
            keys: vec![TypeSpec::scalar("java.lang.String")],
            values: vec![
                TypeSpec::scalar("java.lang.Integer"),
                TypeSpec::scalar("java.lang.Integer"),
            ],
        },
    ]);

    let (outcome, _) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Canvas.draw(com.acme.Shape[],java.util.Map)",
        &the_row,
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    let seq = outcome.sequence.unwrap();
    let puts = seq
        .statements()
        .iter()
        .filter(|s| matches!(&s.operation, Operation::Method { name, .. } if name == "put"))
        .count();
    assert_eq!(puts, 2);
    assert!(seq.statements().iter().any(|s| s.operation
        == Operation::ArrayCreate {
            element: "com.acme.Shape".into(),
            length: 2
        }));
}

#[test]
fn test_missing_array_element_is_partial() {
    let model = Arc::new(common::model());
    let (pool, _) = common::pool(&model, &BTreeSet::new());
    let the_row = row(vec![
        TypeSpec::Array {
            type_name: "com.acme.Shape[]".into(),
            elements: vec![
                TypeSpec::scalar("com.acme.Circle"),
                TypeSpec::scalar("com.acme.Foo"),
            ],
        },
        TypeSpec::Map {
            type_name: "java.util.Map<java.lang.String,java.lang.Integer>".into(),
            keys: vec![],
            values: vec![],
        },
    ]);

    let (outcome, diag) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Canvas.draw(com.acme.Shape[],java.util.Map)",
        &the_row,
    );
    assert_eq!(outcome.status, CoverageStatus::Partial);
    assert!(outcome.missing_elements);
    assert!(diag.non_instantiable_types.contains("com.acme.Foo"));
}

#[test]
fn test_subtype_substitution_skips_row_required_types() {
    let model = Arc::new(common::model());
    let pool = pool_with(vec![
        ("com.acme.Circle", construct("com.acme.Circle", None)),
        ("com.acme.Square", construct("com.acme.Square", Some(2))),
    ]);

    let (outcome, _) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Calc.paint(com.acme.Shape)",
        &row(vec![TypeSpec::scalar("com.acme.Shape")]),
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    let seq = outcome.sequence.unwrap();
    assert_eq!(seq.output_type(0).as_deref(), Some("com.acme.Circle"));

    let (outcome, _) = cover(
        &model,
        &pool,
        &SynthConfig::default(),
        "com.acme.Calc.pair(com.acme.Shape,com.acme.Circle)",
        &row(vec![
            TypeSpec::scalar("com.acme.Shape"),
            TypeSpec::scalar("com.acme.Circle"),
        ]),
    );
    assert_eq!(outcome.status, CoverageStatus::Covered);
    let seq = outcome.sequence.unwrap();
    let call = seq.last().unwrap();
    assert_eq!(seq.output_type(call.inputs[0]).as_deref(), Some("com.acme.Square"));
    assert_eq!(seq.output_type(call.inputs[1]).as_deref(), Some("com.acme.Circle"));
}

#[test]
fn test_type_variables_are_replaced_by_the_witness() {
    let model = Arc::new(common::model());
    let (outcome, _) = cover(
        &model,
        &SequencePool::new(),
        &SynthConfig::default(),
        "com.acme.Calc.identity(T)",
        &row(vec![TypeSpec::scalar("T")]),
    );

    assert_eq!(outcome.status, CoverageStatus::Covered);
    let seq = outcome.sequence.unwrap();
    assert_eq!(
        seq.last().unwrap().operation,
        Operation::Method {
            declaring: "com.acme.Calc".into(),
            name: "identity".into(),
            params: vec!["java.lang.Object".into()],
            returns: "java.lang.Object".into(),
            is_static: true,
        }
    );
}

#[test]
fn test_rows_are_reproducible_per_stage() {
    let model = Arc::new(common::model());
    let pool = SequencePool::new();
    let config = SynthConfig::default();
    let executor = common::executor(&model);
    let extender = Extender::new(&pool, model.as_ref(), model.as_ref(), &executor, &config)
        .with_seed(7);
    let target = extender.resolve_target("com.acme.Calc.f(int)").unwrap();
    let the_row = row(vec![TypeSpec::scalar("int")]);

    let mut diag = RunDiagnostics::new();
    let a = extender.cover_row(&target, &the_row, 3, &mut diag);
    let b = extender.cover_row(&target, &the_row, 3, &mut diag);
    assert_eq!(a.sequence, b.sequence);
}

#[test]
fn test_unresolvable_target_is_structural() {
    let model = Arc::new(common::model());
    let pool = SequencePool::new();
    let config = SynthConfig::default();
    let executor = common::executor(&model);
    let extender = Extender::new(&pool, model.as_ref(), model.as_ref(), &executor, &config);

    assert!(matches!(
        extender.resolve_target("com.acme.Calc.nope(int)"),
        Err(RowFailure::Structural { .. })
    ));
    assert!(matches!(
        extender.resolve_target("not a signature"),
        Err(RowFailure::Structural { .. })
    ));
}

#[test]
fn test_augment_adds_direct_constructions_only() {
    let model = common::model();
    let mut pool = SequencePool::new();
    let types: BTreeSet<String> = [
        "com.acme.Circle",
        "com.acme.Foo",
        "com.acme.Shape",
        "int",
        "com.acme.Shape[]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let added = augment_pool(&mut pool, &types, &model, &model, &SynthConfig::default(), 42);
    assert_eq!(added, BTreeSet::from(["com.acme.Circle".to_string()]));
    assert!(pool.has_constructor("com.acme.Circle"));
    assert!(!pool.has_constructor("com.acme.Shape"));
}
