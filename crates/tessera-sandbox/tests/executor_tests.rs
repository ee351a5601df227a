mod common;

use std::sync::Arc;

use common::{ctor, literal, method};
use tessera_ir::runtime::ObservedValue;
use tessera_ir::{Literal, Operation, Sequence};
use tessera_sandbox::{Executor, ExecutorConfig, ExecutorError, StatementOutcome};

fn executor(config: ExecutorConfig) -> Executor {
    Executor::new(Arc::new(common::model()), config)
}

#[test]
fn test_exception_stops_execution() {
    let mut seq = Sequence::new();
    let c = seq.push(ctor("com.acme.Counter", &[]), vec![]).unwrap();
    let n = literal(&mut seq, "int", Literal::Int(-1));
    seq.push(method("com.acme.Counter", "add", &["int"], "void", false), vec![c, n])
        .unwrap();
    seq.push(method("com.acme.Counter", "getCount", &[], "int", false), vec![c])
        .unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    assert!(!result.passed);
    let (index, thrown) = result.exception().unwrap();
    assert_eq!(index, 2);
    assert_eq!(thrown.type_name, "java.lang.IllegalArgumentException");
    assert_eq!(result.statements[3].outcome, StatementOutcome::NotExecuted);
    assert!(result.statements[2].thrown().is_some());
}

#[test]
fn test_null_receiver_throws_null_pointer() {
    let mut seq = Sequence::new();
    let c = literal(&mut seq, "com.acme.Counter", Literal::Null);
    seq.push(method("com.acme.Counter", "getCount", &[], "int", false), vec![c])
        .unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    let (_, thrown) = result.exception().unwrap();
    assert_eq!(thrown.simple_name(), "NullPointerException");
}

#[test]
fn test_timeout_reports_failure() {
    let mut seq = Sequence::new();
    let ms = literal(&mut seq, "int", Literal::Int(2_000));
    seq.push(method("com.acme.Slow", "nap", &["int"], "void", true), vec![ms])
        .unwrap();

    let config = ExecutorConfig {
        timeout_ms: 50,
        ..ExecutorConfig::default()
    };
    let result = executor(config).execute(&seq);
    assert!(!result.passed);
    assert!(result.timed_out());
    assert_eq!(result.failure, Some(ExecutorError::Timeout { timeout_ms: 50 }));
}

#[test]
fn test_panic_is_contained() {
    let mut seq = Sequence::new();
    seq.push(method("com.acme.Slow", "explode", &[], "void", true), vec![])
        .unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    assert!(!result.passed);
    assert!(matches!(
        result.failure,
        Some(ExecutorError::Panicked { ref message }) if message.contains("kaboom")
    ));
}

#[test]
fn test_unknown_member_is_a_session_failure() {
    let mut seq = Sequence::new();
    seq.push(ctor("com.acme.Missing", &[]), vec![]).unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    assert!(matches!(result.failure, Some(ExecutorError::Session { .. })));
}

#[test]
fn test_trailing_void_call_captures_receiver() {
    let mut seq = Sequence::new();
    let c = seq
        .push_labeled(ctor("com.acme.Counter", &[]), vec![], Some("counter".into()))
        .unwrap();
    let n = literal(&mut seq, "int", Literal::Int(5));
    seq.push(method("com.acme.Counter", "add", &["int"], "void", false), vec![c, n])
        .unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    assert!(result.passed);
    assert!(result.statements[1].value.is_none());

    let captured = result.statements[2].state.as_ref().unwrap();
    assert_eq!(captured.variable, 0);
    assert_eq!(captured.name, "counter");
    let count = &captured.state.fields["count"];
    assert_eq!(count.value, ObservedValue::Literal(Literal::Int(5)));
    assert_eq!(count.accessor.as_deref(), Some("getCount"));
    assert!(captured.state.fields["label"].value.is_null());
}

#[test]
fn test_repeated_runs_drop_nondeterministic_fields() {
    let mut seq = Sequence::new();
    seq.push(ctor("com.acme.Clock", &[]), vec![]).unwrap();

    let config = ExecutorConfig {
        repeat_count: 3,
        ..ExecutorConfig::default()
    };
    let result = executor(config).execute(&seq);
    assert!(result.passed);
    assert_eq!(result.runs, 3);

    let states = result.captured_states();
    let clock = states["v0"];
    assert!(clock.fields.contains_key("fixed"));
    assert!(!clock.fields.contains_key("stamp"));
}

#[test]
fn test_capture_can_be_disabled() {
    let mut seq = Sequence::new();
    let n = literal(&mut seq, "int", Literal::Int(3));
    seq.push(ctor("com.acme.Counter", &["int"]), vec![n]).unwrap();

    let config = ExecutorConfig {
        capture_state: false,
        ..ExecutorConfig::default()
    };
    let result = executor(config).execute(&seq);
    assert!(result.passed);
    assert!(result.statements.iter().all(|s| s.state.is_none() && s.value.is_none()));
}

#[test]
fn test_static_factory_and_enum_constant() {
    let mut seq = Sequence::new();
    let n = literal(&mut seq, "int", Literal::Int(9));
    seq.push(method("com.acme.Counter", "of", &["int"], "com.acme.Counter", true), vec![n])
        .unwrap();
    seq.push(
        Operation::FieldGet {
            declaring: "com.acme.Color".into(),
            field: "GREEN".into(),
            field_type: "com.acme.Color".into(),
            is_static: true,
        },
        vec![],
    )
    .unwrap();

    let result = executor(ExecutorConfig::default()).execute(&seq);
    assert!(result.passed);
    let counter = result.statements[1].state.as_ref().unwrap();
    assert_eq!(
        counter.state.fields["count"].value,
        ObservedValue::Literal(Literal::Int(9))
    );
    assert_eq!(
        result.statements[2].value,
        Some(ObservedValue::Enum {
            type_name: "com.acme.Color".into(),
            constant: "GREEN".into()
        })
    );
}
