#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tessera_ir::introspect::Visibility;
use tessera_ir::runtime::{Thrown, Value};
use tessera_ir::{Literal, Operation, Sequence, VarIndex};
use tessera_sandbox::ObjectModel;

static STAMP: AtomicI64 = AtomicI64::new(0);

fn int(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int { value }) => *value,
        _ => 0,
    }
}

/// `com.acme.Counter`, `com.acme.Clock`, `com.acme.Slow`, and `com.acme.Color`
/// on top of the java.util built-ins.
pub fn model() -> ObjectModel {
    let mut model = ObjectModel::with_java_util();

    model
        .class("com.acme.Counter")
        .field("count", "int", Visibility::Private)
        .field("label", "java.lang.String", Visibility::Public)
        .constructor(&[], |_, _, _| Ok(()))
        .constructor(&["int"], |heap, this, args| {
            heap.set(this, "count", Value::Int { value: int(args, 0) });
            Ok(())
        })
        .method("add", &["int"], "void", |heap, this, args| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            let n = int(args, 0);
            if n < 0 {
                return Err(Thrown::new(
                    "java.lang.IllegalArgumentException",
                    Some(format!("negative: {n}")),
                ));
            }
            let count = int(&[heap.get(this, "count")], 0);
            heap.set(this, "count", Value::Int { value: count + n });
            Ok(Value::Null)
        })
        .method("getCount", &[], "int", |heap, this, _| {
            let this = this.ok_or_else(|| Thrown::new("java.lang.NullPointerException", None))?;
            Ok(heap.get(this, "count"))
        })
        .static_method("of", &["int"], "com.acme.Counter", |heap, _, args| {
            let obj = heap.alloc("com.acme.Counter");
            heap.set(&obj, "count", Value::Int { value: int(args, 0) });
            Ok(Value::Object(obj))
        })
        .register();

    model
        .class("com.acme.Clock")
        .field("stamp", "long", Visibility::Public)
        .field("fixed", "int", Visibility::Public)
        .constructor(&[], |heap, this, _| {
            let stamp = STAMP.fetch_add(1, Ordering::SeqCst);
            heap.set(this, "stamp", Value::Int { value: stamp });
            heap.set(this, "fixed", Value::Int { value: 7 });
            Ok(())
        })
        .register();

    model
        .class("com.acme.Slow")
        .static_method("nap", &["int"], "void", |_, _, args| {
            std::thread::sleep(Duration::from_millis(int(args, 0) as u64));
            Ok(Value::Null)
        })
        .static_method("explode", &[], "void", |_, _, _| panic!("kaboom"))
        .register();

    model.enumeration("com.acme.Color", &["RED", "GREEN"]);
    model
}

pub fn literal(seq: &mut Sequence, type_name: &str, value: Literal) -> VarIndex {
    seq.push(
        Operation::Literal {
            type_name: type_name.into(),
            value,
        },
        vec![],
    )
    .unwrap()
}

pub fn ctor(declaring: &str, params: &[&str]) -> Operation {
    Operation::Constructor {
        declaring: declaring.into(),
        params: params.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn method(declaring: &str, name: &str, params: &[&str], returns: &str, is_static: bool) -> Operation {
    Operation::Method {
        declaring: declaring.into(),
        name: name.into(),
        params: params.iter().map(|p| p.to_string()).collect(),
        returns: returns.into(),
        is_static,
    }
}
