//! Built-in `java.lang.Object` and the `java.util` collection types.
//!
//! Lists and sets keep their elements in [`Heap::items`], maps in
//! [`Heap::entries`]. Each concrete collection declares a private `size`
//! field so its `size()` accessor shows up in captured state.

use tessera_ir::introspect::Visibility;
use tessera_ir::runtime::{ObjectRef, Thrown, Value};

use crate::object_model::{Heap, ObjectModel, NULL_POINTER};

const OBJECT: &str = "java.lang.Object";

const LISTS: &[&str] = &["java.util.ArrayList", "java.util.LinkedList"];
const SETS: &[&str] = &["java.util.HashSet", "java.util.LinkedHashSet", "java.util.TreeSet"];
const MAPS: &[&str] = &["java.util.HashMap", "java.util.LinkedHashMap", "java.util.TreeMap"];

pub(crate) fn install(model: &mut ObjectModel) {
    model.class(OBJECT).constructor(&[], |_, _, _| Ok(())).register();

    model
        .interface("java.util.Collection")
        .type_params(&["E"])
        .abstract_method("add", &["E"], "boolean")
        .abstract_method("size", &[], "int")
        .abstract_method("isEmpty", &[], "boolean")
        .abstract_method("contains", &[OBJECT], "boolean")
        .register();
    model
        .interface("java.util.List")
        .type_params(&["E"])
        .implements("java.util.Collection<E>")
        .abstract_method("get", &["int"], "E")
        .register();
    model
        .interface("java.util.Set")
        .type_params(&["E"])
        .implements("java.util.Collection<E>")
        .register();
    model
        .interface("java.util.Map")
        .type_params(&["K", "V"])
        .abstract_method("put", &["K", "V"], "V")
        .abstract_method("get", &[OBJECT], "V")
        .abstract_method("containsKey", &[OBJECT], "boolean")
        .abstract_method("size", &[], "int")
        .abstract_method("isEmpty", &[], "boolean")
        .register();

    for name in LISTS {
        sequence_class(model, name, "java.util.List<E>", false)
            .method("get", &["int"], "E", |heap, this, args| {
                let this = receiver(this)?;
                let index = int_arg(args, 0);
                let items = heap.items(this);
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        Thrown::new(
                            "java.lang.IndexOutOfBoundsException",
                            Some(format!("Index {index} out of bounds for length {}", items.len())),
                        )
                    })
            })
            .register();
    }
    for name in SETS {
        sequence_class(model, name, "java.util.Set<E>", true).register();
    }
    for name in MAPS {
        model
            .class(name)
            .type_params(&["K", "V"])
            .implements("java.util.Map<K,V>")
            .field("size", "int", Visibility::Private)
            .constructor(&[], |_, _, _| Ok(()))
            .method("put", &["K", "V"], "V", |heap, this, args| {
                let this = receiver(this)?;
                let key = arg(args, 0);
                let value = arg(args, 1);
                let entries = heap.entries_mut(this).ok_or_else(dangling)?;
                let previous = match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, v)) => std::mem::replace(v, value),
                    None => {
                        entries.push((key, value));
                        Value::Null
                    }
                };
                Ok(previous)
            })
            .method("get", &[OBJECT], "V", |heap, this, args| {
                let this = receiver(this)?;
                let key = arg(args, 0);
                Ok(heap
                    .entries(this)
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or(Value::Null, |(_, v)| v.clone()))
            })
            .method("containsKey", &[OBJECT], "boolean", |heap, this, args| {
                let this = receiver(this)?;
                let key = arg(args, 0);
                let found = heap.entries(this).iter().any(|(k, _)| *k == key);
                Ok(Value::Bool { value: found })
            })
            .method("size", &[], "int", |heap, this, _| {
                let n = heap.entries(receiver(this)?).len();
                Ok(Value::Int { value: n as i64 })
            })
            .method("isEmpty", &[], "boolean", |heap, this, _| {
                let empty = heap.entries(receiver(this)?).is_empty();
                Ok(Value::Bool { value: empty })
            })
            .register();
    }
}

/// A list or set class with `add`, `size`, `isEmpty`, and `contains`.
fn sequence_class<'m>(
    model: &'m mut ObjectModel,
    name: &str,
    interface: &str,
    distinct: bool,
) -> crate::object_model::ClassBuilder<'m> {
    model
        .class(name)
        .type_params(&["E"])
        .implements(interface)
        .field("size", "int", Visibility::Private)
        .constructor(&[], |_, _, _| Ok(()))
        .method("add", &["E"], "boolean", move |heap, this, args| {
            let this = receiver(this)?;
            let item = arg(args, 0);
            let items = heap.items_mut(this).ok_or_else(dangling)?;
            if distinct && items.contains(&item) {
                return Ok(Value::Bool { value: false });
            }
            items.push(item);
            Ok(Value::Bool { value: true })
        })
        .method("size", &[], "int", |heap, this, _| {
            let n = heap.items(receiver(this)?).len();
            Ok(Value::Int { value: n as i64 })
        })
        .method("isEmpty", &[], "boolean", |heap, this, _| {
            let empty = heap.items(receiver(this)?).is_empty();
            Ok(Value::Bool { value: empty })
        })
        .method("contains", &[OBJECT], "boolean", |heap, this, args| {
            let item = arg(args, 0);
            let found = heap.items(receiver(this)?).contains(&item);
            Ok(Value::Bool { value: found })
        })
}

fn receiver(this: Option<&ObjectRef>) -> Result<&ObjectRef, Thrown> {
    this.ok_or_else(|| Thrown::new(NULL_POINTER, None))
}

fn dangling() -> Thrown {
    Thrown::new("java.lang.IllegalStateException", Some("dangling object reference".into()))
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Null)
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int { value }) => *value,
        _ => 0,
    }
}
