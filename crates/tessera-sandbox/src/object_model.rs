//! An in-memory object model whose classes are described by [`TypeInfo`]
//! and implemented by Rust closures.
//!
//! Each [`ObjectSession`] owns a fresh [`Heap`], so executions never share
//! objects or static state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tessera_ir::introspect::{
    ConstructorInfo, FieldInfo, IntrospectError, InvokeError, MethodInfo, RuntimeSession,
    TypeHierarchy, TypeInfo, TypeIntrospector, TypeKind, Visibility,
};
use tessera_ir::runtime::{ObjectRef, Thrown, Value};
use tessera_ir::typename::{array_element, erasure, is_primitive, is_type_variable, PrimitiveKind};
use tessera_ir::Operation;

use crate::java_util;

pub type ConstructorFn =
    dyn Fn(&mut Heap, &ObjectRef, &[Value]) -> Result<(), Thrown> + Send + Sync;
pub type MethodFn =
    dyn Fn(&mut Heap, Option<&ObjectRef>, &[Value]) -> Result<Value, Thrown> + Send + Sync;

pub const NULL_POINTER: &str = "java.lang.NullPointerException";

struct ClassDef {
    info: TypeInfo,
    /// Parallel to `info.constructors`.
    constructors: Vec<Arc<ConstructorFn>>,
    /// Parallel to `info.methods`; `None` for abstract methods.
    methods: Vec<Option<Arc<MethodFn>>>,
    statics: BTreeMap<String, Value>,
}

/// Registry of classes making up a program under test.
#[derive(Default)]
pub struct ObjectModel {
    classes: BTreeMap<String, ClassDef>,
}

impl ObjectModel {
    /// An empty model with no built-in types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A model preloaded with `java.lang.Object` and the `java.util`
    /// collection and map types.
    pub fn with_java_util() -> Self {
        let mut model = Self::new();
        java_util::install(&mut model);
        model
    }

    pub fn class(&mut self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, name, TypeKind::Class)
    }

    pub fn abstract_class(&mut self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, name, TypeKind::AbstractClass)
    }

    pub fn interface(&mut self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder::new(self, name, TypeKind::Interface)
    }

    /// Register an enum whose constants are public static fields of itself.
    pub fn enumeration(&mut self, name: &str, constants: &[&str]) {
        let mut builder = ClassBuilder::new(self, name, TypeKind::Enum);
        for constant in constants {
            builder.def.info.enum_constants.push(constant.to_string());
            builder.def.info.fields.push(FieldInfo {
                name: constant.to_string(),
                type_name: name.to_string(),
                visibility: Visibility::Public,
                is_static: true,
            });
            builder.def.statics.insert(
                constant.to_string(),
                Value::Enum {
                    type_name: name.to_string(),
                    constant: constant.to_string(),
                },
            );
        }
        builder.register();
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.classes.contains_key(&erasure(type_name))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    fn def(&self, type_name: &str) -> Option<&ClassDef> {
        self.classes.get(&erasure(type_name))
    }

    /// Class definitions from `type_name` up through its supertypes.
    fn chain(&self, type_name: &str) -> Vec<&ClassDef> {
        self.type_chain(type_name)
            .iter()
            .filter_map(|info| self.classes.get(&info.name))
            .collect()
    }

    /// The type's description with inherited fields and methods appended.
    fn flattened_info(&self, type_name: &str) -> Option<TypeInfo> {
        let mut chain = self.chain(type_name).into_iter();
        let mut info = chain.next()?.info.clone();
        for sup in chain {
            for f in &sup.info.fields {
                if info.field(&f.name).is_none() {
                    info.fields.push(f.clone());
                }
            }
            info.methods.extend(sup.info.methods.iter().cloned());
        }
        Some(info)
    }

    fn initial_statics(&self) -> BTreeMap<(String, String), Value> {
        let mut statics = BTreeMap::new();
        for (name, def) in &self.classes {
            for (field, value) in &def.statics {
                statics.insert((name.clone(), field.clone()), value.clone());
            }
        }
        statics
    }
}

impl TypeIntrospector for ObjectModel {
    fn type_info(&self, type_name: &str) -> Option<TypeInfo> {
        self.def(type_name).map(|d| d.info.clone())
    }

    fn new_session(&self) -> Result<Box<dyn RuntimeSession + '_>, IntrospectError> {
        Ok(Box::new(ObjectSession {
            model: self,
            heap: Heap::with_statics(self.initial_statics()),
        }))
    }
}

impl TypeHierarchy for ObjectModel {
    fn concrete_types_of(&self, type_name: &str) -> BTreeSet<String> {
        let target = erasure(type_name);
        self.classes
            .values()
            .filter(|d| d.info.is_instantiable() && d.info.is_public && d.info.name != target)
            .filter(|d| self.is_subtype(&d.info.name, &target))
            .map(|d| d.info.name.clone())
            .collect()
    }

    fn supertypes_of(&self, type_name: &str) -> BTreeSet<String> {
        let own = erasure(type_name);
        self.type_chain(type_name)
            .into_iter()
            .map(|i| i.name)
            .filter(|n| *n != own)
            .collect()
    }
}

// ── Class builder ────────────────────────────────────────────────────

pub struct ClassBuilder<'m> {
    model: &'m mut ObjectModel,
    def: ClassDef,
}

impl<'m> ClassBuilder<'m> {
    fn new(model: &'m mut ObjectModel, name: &str, kind: TypeKind) -> Self {
        Self {
            model,
            def: ClassDef {
                info: TypeInfo {
                    name: erasure(name),
                    kind,
                    is_public: true,
                    type_params: Vec::new(),
                    superclass: None,
                    interfaces: Vec::new(),
                    fields: Vec::new(),
                    constructors: Vec::new(),
                    methods: Vec::new(),
                    enum_constants: Vec::new(),
                },
                constructors: Vec::new(),
                methods: Vec::new(),
                statics: BTreeMap::new(),
            },
        }
    }

    pub fn type_params(mut self, params: &[&str]) -> Self {
        self.def.info.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.def.info.superclass = Some(superclass.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.def.info.interfaces.push(interface.to_string());
        self
    }

    /// Mark the type itself as not publicly accessible.
    pub fn non_public(mut self) -> Self {
        self.def.info.is_public = false;
        self
    }

    pub fn field(mut self, name: &str, type_name: &str, visibility: Visibility) -> Self {
        self.def.info.fields.push(FieldInfo {
            name: name.to_string(),
            type_name: type_name.to_string(),
            visibility,
            is_static: false,
        });
        self
    }

    pub fn static_field(
        mut self,
        name: &str,
        type_name: &str,
        visibility: Visibility,
        initial: Value,
    ) -> Self {
        self.def.info.fields.push(FieldInfo {
            name: name.to_string(),
            type_name: type_name.to_string(),
            visibility,
            is_static: true,
        });
        self.def.statics.insert(name.to_string(), initial);
        self
    }

    pub fn constructor<F>(self, params: &[&str], body: F) -> Self
    where
        F: Fn(&mut Heap, &ObjectRef, &[Value]) -> Result<(), Thrown> + Send + Sync + 'static,
    {
        self.constructor_with(params, Visibility::Public, body)
    }

    pub fn constructor_with<F>(mut self, params: &[&str], visibility: Visibility, body: F) -> Self
    where
        F: Fn(&mut Heap, &ObjectRef, &[Value]) -> Result<(), Thrown> + Send + Sync + 'static,
    {
        self.def.info.constructors.push(ConstructorInfo {
            params: params.iter().map(|p| p.to_string()).collect(),
            visibility,
        });
        self.def.constructors.push(Arc::new(body));
        self
    }

    /// Public instance method.
    pub fn method<F>(self, name: &str, params: &[&str], returns: &str, body: F) -> Self
    where
        F: Fn(&mut Heap, Option<&ObjectRef>, &[Value]) -> Result<Value, Thrown>
            + Send
            + Sync
            + 'static,
    {
        self.method_with(signature(name, params, returns, Visibility::Public, false), body)
    }

    /// Public static method.
    pub fn static_method<F>(self, name: &str, params: &[&str], returns: &str, body: F) -> Self
    where
        F: Fn(&mut Heap, Option<&ObjectRef>, &[Value]) -> Result<Value, Thrown>
            + Send
            + Sync
            + 'static,
    {
        self.method_with(signature(name, params, returns, Visibility::Public, true), body)
    }

    pub fn method_with<F>(mut self, info: MethodInfo, body: F) -> Self
    where
        F: Fn(&mut Heap, Option<&ObjectRef>, &[Value]) -> Result<Value, Thrown>
            + Send
            + Sync
            + 'static,
    {
        self.def.info.methods.push(info);
        self.def.methods.push(Some(Arc::new(body)));
        self
    }

    /// A public method without a body, implemented by subtypes.
    pub fn abstract_method(mut self, name: &str, params: &[&str], returns: &str) -> Self {
        self.def
            .info
            .methods
            .push(signature(name, params, returns, Visibility::Public, false));
        self.def.methods.push(None);
        self
    }

    pub fn register(self) {
        let name = self.def.info.name.clone();
        self.model.classes.insert(name, self.def);
    }
}

fn signature(
    name: &str,
    params: &[&str],
    returns: &str,
    visibility: Visibility,
    is_static: bool,
) -> MethodInfo {
    MethodInfo {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        returns: returns.to_string(),
        visibility,
        is_static,
    }
}

// ── Heap ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HeapObject {
    type_name: String,
    fields: BTreeMap<String, Value>,
    items: Vec<Value>,
    entries: Vec<(Value, Value)>,
}

/// Objects and static fields of one session.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
    statics: BTreeMap<(String, String), Value>,
}

impl Heap {
    fn with_statics(statics: BTreeMap<(String, String), Value>) -> Self {
        Self {
            objects: Vec::new(),
            statics,
        }
    }

    /// Allocate an object with no fields set.
    pub fn alloc(&mut self, type_name: &str) -> ObjectRef {
        self.objects.push(HeapObject {
            type_name: type_name.to_string(),
            ..HeapObject::default()
        });
        ObjectRef {
            id: self.objects.len() as u64,
            type_name: type_name.to_string(),
        }
    }

    fn object(&self, obj: &ObjectRef) -> Option<&HeapObject> {
        let idx = usize::try_from(obj.id).ok()?.checked_sub(1)?;
        self.objects.get(idx)
    }

    fn object_mut(&mut self, obj: &ObjectRef) -> Option<&mut HeapObject> {
        let idx = usize::try_from(obj.id).ok()?.checked_sub(1)?;
        self.objects.get_mut(idx)
    }

    /// Field value, `null` when never set.
    pub fn get(&self, obj: &ObjectRef, field: &str) -> Value {
        self.object(obj)
            .and_then(|o| o.fields.get(field).cloned())
            .unwrap_or(Value::Null)
    }

    pub fn set(&mut self, obj: &ObjectRef, field: &str, value: Value) {
        if let Some(o) = self.object_mut(obj) {
            o.fields.insert(field.to_string(), value);
        }
    }

    pub fn get_static(&self, type_name: &str, field: &str) -> Value {
        self.statics
            .get(&(erasure(type_name), field.to_string()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn set_static(&mut self, type_name: &str, field: &str, value: Value) {
        self.statics
            .insert((erasure(type_name), field.to_string()), value);
    }

    /// Sequence storage of a collection object.
    pub fn items(&self, obj: &ObjectRef) -> &[Value] {
        self.object(obj).map_or(&[][..], |o| o.items.as_slice())
    }

    pub fn items_mut(&mut self, obj: &ObjectRef) -> Option<&mut Vec<Value>> {
        self.object_mut(obj).map(|o| &mut o.items)
    }

    /// Key/value storage of a map object.
    pub fn entries(&self, obj: &ObjectRef) -> &[(Value, Value)] {
        self.object(obj).map_or(&[][..], |o| o.entries.as_slice())
    }

    pub fn entries_mut(&mut self, obj: &ObjectRef) -> Option<&mut Vec<(Value, Value)>> {
        self.object_mut(obj).map(|o| &mut o.entries)
    }

    pub fn runtime_type(&self, obj: &ObjectRef) -> Option<&str> {
        self.object(obj).map(|o| o.type_name.as_str())
    }
}

/// Zero value of a declared type: `0`, `false`, `'\0'`, or `null`.
pub fn default_value(type_name: &str) -> Value {
    if !is_primitive(type_name) {
        return Value::Null;
    }
    match PrimitiveKind::of(type_name) {
        Some(PrimitiveKind::Boolean) => Value::Bool { value: false },
        Some(PrimitiveKind::Char) => Value::Char { value: '\0' },
        Some(k) if k.is_floating() => Value::Float { value: 0.0 },
        _ => Value::Int { value: 0 },
    }
}

// ── Session ──────────────────────────────────────────────────────────

pub struct ObjectSession<'m> {
    model: &'m ObjectModel,
    heap: Heap,
}

impl ObjectSession<'_> {
    fn instantiate(&mut self, type_name: &str) -> ObjectRef {
        let obj = self.heap.alloc(type_name);
        for def in self.model.chain(type_name) {
            for f in def.info.fields.iter().filter(|f| !f.is_static) {
                self.heap.set(&obj, &f.name, default_value(&f.type_name));
            }
        }
        obj
    }

    fn construct(&mut self, declaring: &str, params: &[String], args: &[Value]) -> Result<Value, InvokeError> {
        let erased = erasure(declaring);
        let def = self
            .model
            .def(&erased)
            .ok_or_else(|| IntrospectError::UnknownType(erased.clone()))?;
        if !def.info.is_instantiable() {
            return Err(Thrown::new(
                "java.lang.InstantiationException",
                Some(erased.clone()),
            )
            .into());
        }
        let idx = def
            .info
            .constructors
            .iter()
            .position(|c| params_match(&c.params, params))
            .ok_or_else(|| IntrospectError::UnknownMember {
                declaring: erased.clone(),
                member: format!("<init>({})", params.join(",")),
            })?;
        let body = Arc::clone(&def.constructors[idx]);
        let obj = self.instantiate(&erased);
        body(&mut self.heap, &obj, args)?;
        Ok(Value::Object(obj))
    }

    fn call(
        &mut self,
        declaring: &str,
        name: &str,
        params: &[String],
        is_static: bool,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        let (dispatch_type, receiver, rest) = if is_static {
            (erasure(declaring), None, args)
        } else {
            match args.split_first() {
                Some((Value::Object(obj), rest)) => (obj.type_name.clone(), Some(obj.clone()), rest),
                Some((Value::Null, _)) => {
                    return Err(Thrown::new(
                        NULL_POINTER,
                        Some(format!("Cannot invoke \"{name}()\" on null")),
                    )
                    .into())
                }
                _ => {
                    return Err(IntrospectError::UnknownMember {
                        declaring: erasure(declaring),
                        member: name.to_string(),
                    }
                    .into())
                }
            }
        };

        let body = self
            .model
            .chain(&dispatch_type)
            .into_iter()
            .find_map(|def| {
                def.info
                    .methods
                    .iter()
                    .zip(&def.methods)
                    .find(|(m, body)| {
                        body.is_some()
                            && m.name == name
                            && m.is_static == is_static
                            && params_match(&m.params, params)
                    })
                    .and_then(|(_, body)| body.clone())
            })
            .ok_or_else(|| IntrospectError::UnknownMember {
                declaring: dispatch_type.clone(),
                member: format!("{name}({})", params.join(",")),
            })?;
        Ok(body(&mut self.heap, receiver.as_ref(), rest)?)
    }

    /// Class along the chain of `declaring` that declares static `field`.
    fn static_owner(&self, declaring: &str, field: &str) -> Option<String> {
        self.model
            .chain(declaring)
            .into_iter()
            .find(|d| d.info.fields.iter().any(|f| f.is_static && f.name == field))
            .map(|d| d.info.name.clone())
    }

    fn instance_target<'a>(&self, args: &'a [Value], field: &str) -> Result<&'a ObjectRef, InvokeError> {
        match args.first() {
            Some(Value::Object(obj)) => Ok(obj),
            Some(Value::Null) => Err(Thrown::new(
                NULL_POINTER,
                Some(format!("Cannot read field \"{field}\" of null")),
            )
            .into()),
            other => Err(IntrospectError::NoSuchField {
                value: other.map_or_else(String::new, ToString::to_string),
                field: field.to_string(),
            }
            .into()),
        }
    }
}

impl RuntimeSession for ObjectSession<'_> {
    fn invoke(&mut self, operation: &Operation, args: &[Value]) -> Result<Value, InvokeError> {
        match operation {
            Operation::Literal { type_name, value } => Ok(Value::from_literal(value, type_name)),
            Operation::ArrayCreate { element, length } => {
                let items = if args.is_empty() {
                    vec![default_value(element); *length]
                } else {
                    args.to_vec()
                };
                Ok(Value::Array {
                    element: element.clone(),
                    items,
                })
            }
            Operation::Constructor { declaring, params } => self.construct(declaring, params, args),
            Operation::Method {
                declaring,
                name,
                params,
                is_static,
                ..
            } => self.call(declaring, name, params, *is_static, args),
            Operation::FieldGet {
                declaring,
                field,
                is_static,
                ..
            } => {
                if *is_static {
                    let owner = self
                        .static_owner(declaring, field)
                        .unwrap_or_else(|| erasure(declaring));
                    Ok(self.heap.get_static(&owner, field))
                } else {
                    let obj = self.instance_target(args, field)?;
                    Ok(self.heap.get(obj, field))
                }
            }
            Operation::FieldSet {
                declaring,
                field,
                is_static,
                ..
            } => {
                if *is_static {
                    let owner = self
                        .static_owner(declaring, field)
                        .unwrap_or_else(|| erasure(declaring));
                    let value = args.first().cloned().unwrap_or(Value::Null);
                    self.heap.set_static(&owner, field, value);
                } else {
                    let obj = self.instance_target(args, field)?.clone();
                    let value = args.get(1).cloned().unwrap_or(Value::Null);
                    self.heap.set(&obj, field, value);
                }
                Ok(Value::Null)
            }
        }
    }

    fn read_field(&mut self, target: &Value, field: &FieldInfo) -> Result<Value, InvokeError> {
        match target {
            Value::Object(obj) => Ok(self.heap.get(obj, &field.name)),
            other => Err(IntrospectError::NoSuchField {
                value: other.to_string(),
                field: field.name.clone(),
            }
            .into()),
        }
    }

    fn describe(&self, value: &Value) -> Option<TypeInfo> {
        let obj = value.as_object()?;
        self.model.flattened_info(&obj.type_name)
    }
}

/// Whether declared parameters accept an operation's (possibly bound)
/// parameter types. Type variables accept anything.
fn params_match(declared: &[String], wanted: &[String]) -> bool {
    declared.len() == wanted.len()
        && declared
            .iter()
            .zip(wanted)
            .all(|(d, w)| param_matches(d, w))
}

fn param_matches(declared: &str, wanted: &str) -> bool {
    if is_type_variable(declared) || erasure(declared) == erasure(wanted) {
        return true;
    }
    match (array_element(declared), array_element(wanted)) {
        (Some(d), Some(w)) => param_matches(&d, &w),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_value("int"), Value::Int { value: 0 });
        assert_eq!(default_value("double"), Value::Float { value: 0.0 });
        assert_eq!(default_value("boolean"), Value::Bool { value: false });
        assert_eq!(default_value("java.lang.Integer"), Value::Null);
        assert_eq!(default_value("com.acme.Foo"), Value::Null);
    }

    #[test]
    fn test_params_match_type_variables_and_arrays() {
        assert!(param_matches("E", "java.lang.Integer"));
        assert!(param_matches("java.util.List<E>", "java.util.List<java.lang.String>"));
        assert!(param_matches("T[]", "java.lang.String[]"));
        assert!(!param_matches("int", "long"));
    }

    #[test]
    fn test_heap_ids_start_at_one() {
        let mut heap = Heap::default();
        let a = heap.alloc("a.A");
        let b = heap.alloc("a.B");
        assert_eq!((a.id, b.id), (1, 2));
        heap.set(&b, "x", Value::Int { value: 3 });
        assert_eq!(heap.get(&b, "x"), Value::Int { value: 3 });
        assert_eq!(heap.get(&a, "x"), Value::Null);
        assert_eq!(heap.runtime_type(&b), Some("a.B"));
    }
}
