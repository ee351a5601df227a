#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};

use tessera_compiler::{parse, ParseContext};
use tessera_ir::introspect::Visibility;
use tessera_ir::runtime::{Thrown, Value};
use tessera_ir::Sequence;
use tessera_sandbox::ObjectModel;

static TICKS: AtomicI64 = AtomicI64::new(1);

fn int(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int { value }) => *value,
        _ => 0,
    }
}

pub fn model() -> ObjectModel {
    let mut model = ObjectModel::with_java_util();

    model
        .class("com.acme.Counter")
        .field("count", "int", Visibility::Private)
        .field("label", "java.lang.String", Visibility::Public)
        .constructor(&["int"], |heap, this, args| {
            heap.set(this, "count", Value::Int { value: int(args, 0) });
            Ok(())
        })
        .method("add", &["int"], "void", |heap, this, args| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            let count = int(&[heap.get(this, "count")], 0);
            heap.set(this, "count", Value::Int { value: count + int(args, 0) });
            Ok(Value::Null)
        })
        .method("getCount", &[], "int", |heap, this, _| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            Ok(heap.get(this, "count"))
        })
        .method("half", &[], "double", |heap, this, _| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            let count = int(&[heap.get(this, "count")], 0);
            Ok(Value::Float { value: count as f64 / 2.0 })
        })
        .method("reset", &[], "void", |_, _, _| {
            Err(Thrown::new(
                "java.lang.IllegalStateException",
                Some("locked".into()),
            ))
        })
        .register();

    model
        .interface("com.acme.Shape")
        .abstract_method("area", &[], "double")
        .register();
    model
        .class("com.acme.Circle")
        .implements("com.acme.Shape")
        .field("radius", "double", Visibility::Public)
        .constructor(&[], |heap, this, _| {
            heap.set(this, "radius", Value::Float { value: 1.0 });
            Ok(())
        })
        .method("area", &[], "double", |_, _, _| Ok(Value::Float { value: 3.14 }))
        .register();
    model
        .class("com.acme.Shapes")
        .static_method("make", &[], "com.acme.Shape", |heap, _, _| {
            let obj = heap.alloc("com.acme.Circle");
            heap.set(&obj, "radius", Value::Float { value: 1.0 });
            Ok(Value::Object(obj))
        })
        .register();

    model
        .class("com.acme.Clock")
        .field("stamp", "long", Visibility::Public)
        .field("zone", "java.lang.String", Visibility::Public)
        .constructor(&[], |heap, this, _| {
            let tick = TICKS.fetch_add(1, Ordering::SeqCst);
            heap.set(this, "stamp", Value::Int { value: tick });
            heap.set(
                this,
                "zone",
                Value::Str {
                    value: "UTC".into(),
                },
            );
            Ok(())
        })
        .register();

    model
}

pub fn sequence(model: &ObjectModel, code: &str) -> Sequence {
    let imports = vec!["import com.acme.*;".to_string()];
    let ctx = ParseContext::new(model).with_imports(&imports);
    parse(code, &ctx).unwrap().sequence
}
