#![allow(dead_code)]

use std::sync::Arc;

use tessera_core::{Campaign, RunConfig};
use tessera_ir::introspect::Visibility;
use tessera_ir::runtime::{Thrown, Value};
use tessera_sandbox::ObjectModel;

pub const PLAN: &str = include_str!("../fixtures/plan.json");
pub const BLOCKS: &str = include_str!("../fixtures/blocks.json");

fn int(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int { value }) => *value,
        _ => 0,
    }
}

pub fn model() -> ObjectModel {
    let mut model = ObjectModel::with_java_util();

    model
        .class("com.acme.Widget")
        .field("name", "java.lang.String", Visibility::Public)
        .constructor(&["java.lang.String"], |heap, this, args| {
            heap.set(this, "name", args.first().cloned().unwrap_or(Value::Null));
            Ok(())
        })
        .method("rename", &["java.lang.String"], "void", |heap, this, args| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            heap.set(this, "name", args.first().cloned().unwrap_or(Value::Null));
            Ok(Value::Null)
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
        .static_method("paint", &["com.acme.Shape"], "double", |_, _, _| {
            Ok(Value::Float { value: 1.0 })
        })
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

pub fn campaign(config: RunConfig) -> Campaign {
    let model = Arc::new(model());
    Campaign::new(model.clone(), model, config)
}
