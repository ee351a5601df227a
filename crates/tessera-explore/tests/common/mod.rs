#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera_explore::{PoolConfig, RunDiagnostics, SequencePool};
use tessera_ir::introspect::Visibility;
use tessera_ir::parse::parse_building_blocks;
use tessera_ir::runtime::{Thrown, Value};
use tessera_ir::types::BuildingBlocks;
use tessera_sandbox::{Executor, ExecutorConfig, ObjectModel};

fn int(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int { value }) => *value,
        _ => 0,
    }
}

/// Widgets, shapes, a canvas, and a few static helpers on top of the
/// java.util built-ins.
pub fn model() -> ObjectModel {
    let mut model = ObjectModel::with_java_util();

    model
        .class("com.acme.Widget")
        .field("name", "java.lang.String", Visibility::Public)
        .constructor(&["java.lang.String"], |heap, this, args| {
            heap.set(this, "name", args.first().cloned().unwrap_or(Value::Null));
            Ok(())
        })
        .constructor_with(&["int"], Visibility::Private, |_, _, _| Ok(()))
        .method("rename", &["java.lang.String"], "void", |heap, this, args| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            heap.set(this, "name", args.first().cloned().unwrap_or(Value::Null));
            Ok(Value::Null)
        })
        .method("scale", &["double"], "double", |_, _, args| match args.first() {
            Some(Value::Float { value }) => Ok(Value::Float { value: value * 2.0 }),
            _ => Ok(Value::Float { value: 0.0 }),
        })
        .register();

    model
        .interface("com.acme.Shape")
        .abstract_method("area", &[], "double")
        .register();
    model
        .class("com.acme.Circle")
        .implements("com.acme.Shape")
        .constructor(&[], |_, _, _| Ok(()))
        .method("area", &[], "double", |_, _, _| Ok(Value::Float { value: 3.14 }))
        .register();
    model
        .class("com.acme.Square")
        .implements("com.acme.Shape")
        .constructor(&["int"], |_, _, _| Ok(()))
        .method("area", &[], "double", |_, _, _| Ok(Value::Float { value: 1.0 }))
        .register();

    // No constructors and no subtypes.
    model.abstract_class("com.acme.Foo").register();

    model
        .class("com.acme.Calc")
        .static_method("f", &["int"], "int", |_, _, args| {
            Ok(Value::Int {
                value: int(args, 0) + 1,
            })
        })
        .static_method("g", &["java.util.List<com.acme.Foo>"], "int", |heap, _, args| {
            let n = args
                .first()
                .and_then(Value::as_object)
                .map_or(0, |list| heap.items(list).len());
            Ok(Value::Int { value: n as i64 })
        })
        .static_method("boom", &["int"], "int", |_, _, _| {
            Err(Thrown::new(
                "java.lang.IllegalStateException",
                Some("boom".into()),
            ))
        })
        .static_method("identity", &["T"], "T", |_, _, args| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        })
        .static_method("paint", &["com.acme.Shape"], "double", |_, _, _| {
            Ok(Value::Float { value: 1.0 })
        })
        .static_method(
            "pair",
            &["com.acme.Shape", "com.acme.Circle"],
            "void",
            |_, _, _| Ok(Value::Null),
        )
        .register();

    model
        .class("com.acme.Canvas")
        .constructor(&[], |_, _, _| Ok(()))
        .method(
            "draw",
            &[
                "com.acme.Shape[]",
                "java.util.Map<java.lang.String,java.lang.Integer>",
            ],
            "int",
            |heap, _, args| {
                let shapes = match args.first() {
                    Some(Value::Array { items, .. }) => items.len(),
                    _ => 0,
                };
                let entries = args
                    .get(1)
                    .and_then(Value::as_object)
                    .map_or(0, |map| heap.entries(map).len());
                Ok(Value::Int {
                    value: (shapes + entries) as i64,
                })
            },
        )
        .register();

    model
        .class("com.acme.Fragile")
        .constructor(&["int"], |_, _, args| {
            if int(args, 0) < 0 {
                return Err(Thrown::new(
                    "java.lang.IllegalArgumentException",
                    Some("negative size".into()),
                ));
            }
            Ok(())
        })
        .method("poke", &[], "void", |_, _, _| Ok(Value::Null))
        .register();

    model
        .class("com.acme.Gadget")
        .constructor(&["com.acme.Foo"], |_, _, _| Ok(()))
        .method("spin", &[], "void", |_, _, _| Ok(Value::Null))
        .register();

    model
}

pub fn blocks() -> BuildingBlocks {
    parse_building_blocks(include_str!("../fixtures/blocks.json")).unwrap()
}

pub fn targets(signatures: &[&str]) -> BTreeSet<String> {
    signatures.iter().map(|s| s.to_string()).collect()
}

pub fn pool(model: &ObjectModel, targets: &BTreeSet<String>) -> (SequencePool, RunDiagnostics) {
    let mut diagnostics = RunDiagnostics::new();
    let pool = SequencePool::index(
        &blocks(),
        targets,
        model,
        &PoolConfig::default(),
        &mut diagnostics,
    );
    (pool, diagnostics)
}

pub fn executor(model: &Arc<ObjectModel>) -> Executor {
    Executor::new(model.clone(), ExecutorConfig::default())
}
