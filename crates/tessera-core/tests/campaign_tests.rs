mod common;

use tessera_core::{CampaignError, ExternalRunnerConfig, ProcessRunner, RunConfig};
use tessera_explore::RowKey;
use tessera_ir::CoverageStatus;

fn key(partition: &str, class: &str, method: &str, row: usize) -> RowKey {
    RowKey::new(partition, class, method, row)
}

#[test]
fn test_every_row_gets_a_status() {
    let campaign = common::campaign(RunConfig::default());
    let report = campaign.run_json(common::PLAN, common::BLOCKS).unwrap();

    let expect = [
        (key("basic", "com.acme.Calc", "com.acme.Calc.f(int)", 0), CoverageStatus::Covered),
        (
            key("basic", "com.acme.Calc", "com.acme.Calc.g(java.util.List)", 0),
            CoverageStatus::UncoveredNonInstantiable,
        ),
        (
            key("basic", "com.acme.Calc", "com.acme.Calc.boom(int)", 0),
            CoverageStatus::UncoveredException,
        ),
        (key("basic", "com.acme.Calc", "com.acme.Calc.nope(int)", 0), CoverageStatus::Uncovered),
        (key("basic", "com.acme.Calc", "com.acme.Calc.nope(int)", 1), CoverageStatus::Uncovered),
        (
            key("basic", "com.acme.Widget", "com.acme.Widget.rename(java.lang.String)", 0),
            CoverageStatus::Covered,
        ),
        (
            key("mutation", "com.acme.Fragile", "com.acme.Fragile.poke()", 0),
            CoverageStatus::UncoveredExecFail,
        ),
        (
            key("mutation", "com.acme.Gadget", "com.acme.Gadget.spin()", 0),
            CoverageStatus::UncoveredNoInitSeq,
        ),
        (
            key("shapes", "com.acme.Calc", "com.acme.Calc.paint(com.acme.Shape)", 0),
            CoverageStatus::Covered,
        ),
        (
            key("shapes", "com.acme.Calc", "com.acme.Calc.paint(com.acme.Shape)", 1),
            CoverageStatus::Covered,
        ),
    ];
    assert_eq!(report.coverage.len(), expect.len());
    for (k, status) in &expect {
        assert_eq!(report.coverage.status(k), Some(*status), "row {k}");
        assert!(report.coverage.is_recorded(k));
    }
}

#[test]
fn test_unresolvable_operation_does_not_stop_the_run() {
    let report = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();

    assert_eq!(report.validation_errors.len(), 1);
    assert!(report
        .diagnostics
        .unresolved_operations
        .contains("com.acme.Calc.nope(int)"));
    let nope_failures = report
        .failures
        .iter()
        .filter(|(k, _)| k.method == "com.acme.Calc.nope(int)")
        .count();
    assert_eq!(nope_failures, 2);
}

#[test]
fn test_extended_sequences_carry_class_context() {
    let report = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();

    let rename = report
        .sequence_for(&key(
            "basic",
            "com.acme.Widget",
            "com.acme.Widget.rename(java.lang.String)",
            0,
        ))
        .unwrap();
    assert!(rename.reused);
    assert!(rename.execution.is_none());
    assert_eq!(rename.segments, vec!["setUp"]);
    assert_eq!(rename.imports, vec!["import com.acme.*;"]);
    assert_eq!(rename.display, "void rename(String)");

    let f = report
        .sequence_for(&key("basic", "com.acme.Calc", "com.acme.Calc.f(int)", 0))
        .unwrap();
    assert_eq!(f.sequence.len(), 2);
    assert!(f.code.contains("com.acme.Calc.f(v0)"));
    assert!(f.segments.is_empty());
    assert!(f.annotated.is_none());

    // Rows that failed before a sequence existed have no record.
    assert!(report
        .sequence_for(&key("mutation", "com.acme.Gadget", "com.acme.Gadget.spin()", 0))
        .is_none());
}

#[test]
fn test_pool_is_augmented_for_referenced_types() {
    let report = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();
    assert!(report.augmented_types.contains("com.acme.Circle"));

    let substituted = report
        .sequence_for(&key(
            "shapes",
            "com.acme.Calc",
            "com.acme.Calc.paint(com.acme.Shape)",
            0,
        ))
        .unwrap();
    assert!(substituted.code.contains("new com.acme.Circle()"));
}

#[test]
fn test_annotation_when_requested() {
    let config = RunConfig {
        annotate: true,
        ..RunConfig::default()
    };
    let report = common::campaign(config)
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();

    let f = report
        .sequence_for(&key("basic", "com.acme.Calc", "com.acme.Calc.f(int)", 0))
        .unwrap();
    let annotated = f.annotated.as_deref().unwrap();
    assert!(annotated.contains("assertEquals("));
    assert!(annotated.contains(", v1);"));
    assert_eq!(f.expected_exception, None);

    let boom = report
        .sequence_for(&key("basic", "com.acme.Calc", "com.acme.Calc.boom(int)", 0))
        .unwrap();
    assert_eq!(
        boom.expected_exception.as_deref(),
        Some("java.lang.IllegalStateException")
    );
    assert!(boom
        .annotated
        .as_deref()
        .unwrap()
        .contains("} catch (java.lang.IllegalStateException expected) {"));
}

#[test]
fn test_runs_are_reproducible() {
    let a = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();
    let b = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();
    let codes = |r: &tessera_core::CampaignReport| -> Vec<String> {
        r.sequences.iter().map(|s| s.code.clone()).collect()
    };
    assert_eq!(codes(&a), codes(&b));
}

#[test]
fn test_summary_counts_and_triage_sets() {
    let report = common::campaign(RunConfig::default())
        .run_json(common::PLAN, common::BLOCKS)
        .unwrap();
    let summary = report.summary();

    assert_eq!(summary.totals.total, 10);
    assert_eq!(summary.totals.covered, 4);
    assert_eq!(summary.totals.partial, 0);
    assert_eq!(summary.totals.uncovered, 6);
    assert_eq!(summary.totals.get(CoverageStatus::Uncovered), 2);
    assert!(summary.errors.non_instantiable_types.contains("com.acme.Foo"));
    assert_eq!(
        summary.errors.exceptions.get("java.lang.IllegalStateException"),
        Some(&1)
    );
    assert_eq!(
        summary.errors.exceptions.get("java.lang.IllegalArgumentException"),
        Some(&1)
    );

    let calc = &summary.partitions["basic"].classes["com.acme.Calc"];
    assert_eq!(calc.counts.total, 5);
    assert_eq!(calc.methods["com.acme.Calc.nope(int)"].uncovered, 2);

    let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    assert_eq!(
        json["partitions"]["shapes"]["counts"]["by_status"]["COVERED"],
        serde_json::json!(2)
    );
}

#[test]
fn test_malformed_input_is_a_parse_error() {
    let campaign = common::campaign(RunConfig::default());
    assert!(matches!(
        campaign.run_json("not json", common::BLOCKS),
        Err(CampaignError::Parse(_))
    ));
}

fn shell_runner(script: &str) -> ProcessRunner {
    ProcessRunner::new(ExternalRunnerConfig {
        command: "sh".into(),
        args: vec!["-c".into(), script.into()],
        timeout_ms: 10_000,
    })
}

#[tokio::test]
async fn test_external_pass_upgrades_exec_failures() {
    let campaign = common::campaign(RunConfig::default());
    let mut report = campaign.run_json(common::PLAN, common::BLOCKS).unwrap();
    let runner = shell_runner("cat > /dev/null; echo 'OK (1 test)'");

    let upgraded = campaign
        .validate_externally(&mut report, &runner)
        .await
        .unwrap();
    assert_eq!(upgraded, 1);

    let poke = key("mutation", "com.acme.Fragile", "com.acme.Fragile.poke()", 0);
    assert_eq!(
        report.coverage.status(&poke),
        Some(CoverageStatus::CoveredViaExternalExecution)
    );
    assert_eq!(
        report.sequence_for(&poke).unwrap().status,
        CoverageStatus::CoveredViaExternalExecution
    );
    // Exceptions from the target call itself are not retried.
    assert_eq!(
        report
            .coverage
            .status(&key("basic", "com.acme.Calc", "com.acme.Calc.boom(int)", 0)),
        Some(CoverageStatus::UncoveredException)
    );
}

#[tokio::test]
async fn test_external_failure_leaves_rows_alone() {
    let campaign = common::campaign(RunConfig::default());
    let mut report = campaign.run_json(common::PLAN, common::BLOCKS).unwrap();
    let runner = shell_runner("cat > /dev/null; echo 'Tests run: 1,  Failures: 1'");

    let upgraded = campaign
        .validate_externally(&mut report, &runner)
        .await
        .unwrap();
    assert_eq!(upgraded, 0);
    assert_eq!(
        report
            .coverage
            .status(&key("mutation", "com.acme.Fragile", "com.acme.Fragile.poke()", 0)),
        Some(CoverageStatus::UncoveredExecFail)
    );
}

const RENAME_SPACED: &str = r#"{
  "basic": {
    "com.acme.Widget": {
      "com.acme.Widget.rename( java.lang.String )": {
        "display": "void rename(String)",
        "rows": [[{ "shape": "scalar", "type_name": "java.lang.String" }]]
      }
    }
  }
}"#;

#[test]
fn test_spaced_plan_key_reuses_pooled_call() {
    let report = common::campaign(RunConfig::default())
        .run_json(RENAME_SPACED, common::BLOCKS)
        .unwrap();
    assert!(report.validation_errors.is_empty());

    let rename = report
        .sequence_for(&key(
            "basic",
            "com.acme.Widget",
            "com.acme.Widget.rename( java.lang.String )",
            0,
        ))
        .unwrap();
    assert_eq!(rename.status, CoverageStatus::Covered);
    assert!(rename.reused);
}

#[test]
fn test_receiver_type_is_augmented_without_blocks() {
    let report = common::campaign(RunConfig::default())
        .run_json(RENAME_SPACED, "{}")
        .unwrap();
    assert!(report.augmented_types.contains("com.acme.Widget"));

    let rename_key = key(
        "basic",
        "com.acme.Widget",
        "com.acme.Widget.rename( java.lang.String )",
        0,
    );
    assert_eq!(report.coverage.status(&rename_key), Some(CoverageStatus::Covered));
    let rename = report.sequence_for(&rename_key).unwrap();
    assert!(!rename.reused);
    assert!(rename.code.contains("new com.acme.Widget("));
}
