use tessera_ir::parse::{parse_building_blocks, parse_plan, parse_targets};
use tessera_ir::{CoverageStatus, TypeSpec};

#[test]
fn test_parse_plan_from_file() {
    let plan = parse_plan(include_str!("fixtures/plan.json")).unwrap();
    assert_eq!(plan.partitions.len(), 2);
    assert_eq!(plan.row_count(), 4);

    let entries: Vec<_> = plan.entries().collect();
    assert_eq!(entries[0].partition, "core");
    assert_eq!(entries[0].signature, "com.acme.Counter.add(int)");
    assert_eq!(entries[0].plan.display, "void add(int)");

    let targets = plan.targeted_signatures();
    assert!(targets.contains("com.acme.Canvas.draw(com.acme.Shape[],java.util.Map)"));
}

#[test]
fn test_plan_row_shapes() {
    let plan = parse_plan(include_str!("fixtures/plan.json")).unwrap();
    let draw = &plan.partitions["shapes"]["com.acme.Canvas"]
        ["com.acme.Canvas.draw(com.acme.Shape[],java.util.Map)"];
    let row = &draw.rows[0];
    assert!(row.has_container());
    match &row.params()[1] {
        TypeSpec::Map { keys, values, .. } => {
            assert_eq!(keys.len(), 1);
            assert_eq!(values.len(), 2);
        }
        other => panic!("expected map spec, got {other:?}"),
    }

    // Missing element lists default to empty.
    let add_all = &plan.partitions["core"]["com.acme.Counter"]
        ["com.acme.Counter.addAll(java.util.List)"];
    assert_eq!(add_all.rows[1].params()[0].element_count(), 0);

    let referenced = plan.referenced_types();
    assert!(referenced.contains("com.acme.Circle"));
    assert!(referenced.contains("com.acme.Square"));
}

#[test]
fn test_parse_building_blocks_from_file() {
    let blocks = parse_building_blocks(include_str!("fixtures/blocks.json")).unwrap();
    assert_eq!(blocks.sequence_count(), 3);
    let counter = blocks.get("com.acme.Counter").unwrap();
    assert_eq!(counter.segments, vec!["setUp", "tearDown"]);
    let canvas = blocks.get("com.acme.Canvas").unwrap();
    assert!(canvas.imports.is_empty());
}

#[test]
fn test_parse_invalid_json() {
    assert!(parse_plan("not json at all").is_err());
    assert!(parse_building_blocks("[1, 2]").is_err());
}

#[test]
fn test_unknown_shape_is_rejected() {
    let json = r#"{ "p": { "C": { "C.m(int)": { "rows": [[{ "shape": "tuple", "type_name": "int" }]] } } } }"#;
    assert!(parse_plan(json).is_err());
}

#[test]
fn test_parse_targets() {
    let targets = parse_targets(r#"["a.B.c()", "a.B.<init>(int)"]"#).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(
        serde_json::to_string(&CoverageStatus::PartialViaExternalExecution).unwrap(),
        "\"PARTIAL_VIA_EXTERNAL_EXECUTION\""
    );
}
