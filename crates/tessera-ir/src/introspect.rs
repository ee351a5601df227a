//! Capability interfaces onto the program under test.
//!
//! The engine never reflects on a concrete runtime. Everything it needs to
//! know about types, and everything it needs to run, goes through these
//! traits: [`TypeIntrospector`] for static descriptions, [`RuntimeSession`]
//! for one execution's live objects, and [`TypeHierarchy`] for subtype facts
//! supplied by an external analysis.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::operation::{MemberRef, Operation};
use crate::runtime::{ObservedField, ObservedState, Thrown, Value};
use crate::typename::{
    bind_type_parameters, erasure, is_primitive, is_primitive_like, is_type_variable,
    type_arguments, PrimitiveKind,
};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum IntrospectError {
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("No member '{member}' on type '{declaring}'")]
    UnknownMember { declaring: String, member: String },

    #[error("Call '{declaring}.{name}' with {arity} arguments matches no declared overload")]
    NoMatchingOverload {
        declaring: String,
        name: String,
        arity: usize,
    },

    #[error("Value {value} has no field '{field}'")]
    NoSuchField { value: String, field: String },

    #[error("Runtime session error: {0}")]
    Session(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    AbstractClass,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub type_name: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorInfo {
    pub params: Vec<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<String>,
    pub returns: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
}

/// Static description of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Erased, fully qualified name.
    pub name: String,
    pub kind: TypeKind,
    pub is_public: bool,
    /// Declared type parameter names, in order (`E`, or `K`, `V`).
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub constructors: Vec<ConstructorInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub enum_constants: Vec<String>,
}

impl TypeInfo {
    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Class
    }

    /// Bindings of this type's parameters to the arguments of `instance`
    /// (`java.util.List<Foo>` binds `E` to `Foo`).
    pub fn bindings_for(&self, instance: &str) -> BTreeMap<String, String> {
        self.type_params
            .iter()
            .cloned()
            .zip(type_arguments(instance))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Public zero-argument instance method that reads `field`: `getX`,
    /// `isX` (booleans), or the field's own name.
    pub fn accessor_for(&self, field: &FieldInfo) -> Option<&MethodInfo> {
        let mut cap = field.name.clone();
        if let Some(first) = cap.get(0..1) {
            let upper = first.to_ascii_uppercase();
            cap.replace_range(0..1, &upper);
        }
        let boolean = PrimitiveKind::of(&field.type_name) == Some(PrimitiveKind::Boolean);
        let mut names = vec![format!("get{cap}")];
        if boolean {
            names.push(format!("is{cap}"));
        }
        names.push(field.name.clone());
        names.iter().find_map(|n| {
            self.methods.iter().find(|m| {
                &m.name == n
                    && m.params.is_empty()
                    && !m.is_static
                    && m.visibility == Visibility::Public
                    && m.returns != "void"
            })
        })
    }
}

/// A member reference resolved against the program: the fully typed
/// operation plus its accessibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMember {
    pub operation: Operation,
    pub visibility: Visibility,
    pub declaring_public: bool,
}

impl ResolvedMember {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public && self.declaring_public
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum InvokeError {
    #[error("{0}")]
    Thrown(Thrown),

    #[error(transparent)]
    Introspect(#[from] IntrospectError),
}

impl From<Thrown> for InvokeError {
    fn from(t: Thrown) -> Self {
        InvokeError::Thrown(t)
    }
}

/// Static view of the program under test.
///
/// Only [`type_info`](Self::type_info) and [`new_session`](Self::new_session)
/// are required; member resolution walks the type descriptions.
pub trait TypeIntrospector: Send + Sync {
    /// Description of an (erased) type, `None` when unknown.
    fn type_info(&self, type_name: &str) -> Option<TypeInfo>;

    /// Open a fresh runtime for one execution.
    fn new_session(&self) -> Result<Box<dyn RuntimeSession + '_>, IntrospectError>;

    /// Resolve a constructor or method reference by erased parameter types,
    /// searching supertypes for inherited methods.
    fn resolve_member(&self, member: &MemberRef) -> Result<ResolvedMember, IntrospectError> {
        let declaring = erasure(&member.declaring);
        let info = self
            .type_info(&declaring)
            .ok_or_else(|| IntrospectError::UnknownType(declaring.clone()))?;
        let wanted: Vec<String> = member.params.iter().map(|p| erasure(p)).collect();
        let unknown = || IntrospectError::UnknownMember {
            declaring: declaring.clone(),
            member: member.signature(),
        };

        if member.is_constructor() {
            let ctor = info
                .constructors
                .iter()
                .find(|c| params_match_erased(&c.params, &wanted))
                .ok_or_else(unknown)?;
            let operation = Operation::Constructor {
                declaring: member.declaring.clone(),
                params: ctor.params.clone(),
            };
            return Ok(ResolvedMember {
                operation: bind_receiver_types(&info, &member.declaring, operation),
                visibility: ctor.visibility,
                declaring_public: info.is_public,
            });
        }

        let (owner, method) = self
            .find_method(&declaring, &|m: &MethodInfo| {
                m.name == member.name && params_match_erased(&m.params, &wanted)
            })
            .ok_or_else(unknown)?;
        let operation = Operation::Method {
            declaring: member.declaring.clone(),
            name: method.name,
            params: method.params,
            returns: method.returns,
            is_static: method.is_static,
        };
        Ok(ResolvedMember {
            operation: bind_receiver_types(&info, &member.declaring, operation),
            visibility: method.visibility,
            declaring_public: info.is_public && owner.is_public,
        })
    }

    /// Resolve a call site by name and argument types. `None` argument types
    /// stand for `null`, which matches any reference parameter.
    fn resolve_call(
        &self,
        declaring: &str,
        name: &str,
        arg_types: &[Option<String>],
    ) -> Result<ResolvedMember, IntrospectError> {
        let erased = erasure(declaring);
        let info = self
            .type_info(&erased)
            .ok_or_else(|| IntrospectError::UnknownType(erased.clone()))?;
        let no_match = || IntrospectError::NoMatchingOverload {
            declaring: erased.clone(),
            name: name.to_string(),
            arity: arg_types.len(),
        };

        if name == MemberRef::CONSTRUCTOR {
            let ctor = best_overload(
                info.constructors.iter().map(|c| (&c.params, c)),
                arg_types,
                |a, b| self.is_assignable(a, b),
            )
            .ok_or_else(no_match)?;
            let operation = Operation::Constructor {
                declaring: declaring.to_string(),
                params: ctor.params.clone(),
            };
            return Ok(ResolvedMember {
                operation: bind_receiver_types(&info, declaring, operation),
                visibility: ctor.visibility,
                declaring_public: info.is_public,
            });
        }

        let mut candidates = Vec::new();
        for owner in self.type_chain(&erased) {
            for m in owner.methods.iter().filter(|m| m.name == name) {
                candidates.push((owner.is_public, m.clone()));
            }
        }
        let (owner_public, method) = best_overload(
            candidates.iter().map(|(p, m)| (&m.params, (p, m))),
            arg_types,
            |a, b| self.is_assignable(a, b),
        )
        .ok_or_else(no_match)?;
        let operation = Operation::Method {
            declaring: declaring.to_string(),
            name: method.name.clone(),
            params: method.params.clone(),
            returns: method.returns.clone(),
            is_static: method.is_static,
        };
        Ok(ResolvedMember {
            operation: bind_receiver_types(&info, declaring, operation),
            visibility: method.visibility,
            declaring_public: info.is_public && *owner_public,
        })
    }

    /// Resolve a field, searching supertypes.
    fn resolve_field(&self, declaring: &str, field: &str) -> Result<ResolvedMember, IntrospectError> {
        let erased = erasure(declaring);
        let info = self
            .type_info(&erased)
            .ok_or_else(|| IntrospectError::UnknownType(erased.clone()))?;
        for owner in self.type_chain(&erased) {
            if let Some(f) = owner.field(field) {
                let operation = Operation::FieldGet {
                    declaring: declaring.to_string(),
                    field: f.name.clone(),
                    field_type: f.type_name.clone(),
                    is_static: f.is_static,
                };
                return Ok(ResolvedMember {
                    operation: bind_receiver_types(&info, declaring, operation),
                    visibility: f.visibility,
                    declaring_public: info.is_public && owner.is_public,
                });
            }
        }
        Err(IntrospectError::UnknownMember {
            declaring: erased,
            member: field.to_string(),
        })
    }

    /// Whether every member `operation` touches is publicly accessible.
    fn is_publicly_accessible(&self, operation: &Operation) -> bool {
        let resolved = match operation {
            Operation::Literal { .. } | Operation::ArrayCreate { .. } => return true,
            Operation::FieldGet {
                declaring, field, ..
            }
            | Operation::FieldSet {
                declaring, field, ..
            } => self.resolve_field(declaring, field),
            Operation::Constructor { .. } | Operation::Method { .. } => match operation.member_ref()
            {
                Some(r) => self.resolve_member(&r),
                None => return false,
            },
        };
        resolved.map(|r| r.is_public()).unwrap_or(false)
    }

    /// Public constructors of an instantiable type, fewest parameters first.
    fn list_public_constructors(&self, type_name: &str) -> Vec<Operation> {
        let Some(info) = self.type_info(&erasure(type_name)) else {
            return Vec::new();
        };
        if !info.is_instantiable() || !info.is_public {
            return Vec::new();
        }
        let mut ctors: Vec<&ConstructorInfo> = info
            .constructors
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .collect();
        ctors.sort_by_key(|c| c.params.len());
        ctors
            .into_iter()
            .map(|c| Operation::Constructor {
                declaring: type_name.to_string(),
                params: c.params.clone(),
            })
            .collect()
    }

    fn enum_constants(&self, type_name: &str) -> Vec<String> {
        self.type_info(&erasure(type_name))
            .filter(|i| i.kind == TypeKind::Enum)
            .map(|i| i.enum_constants)
            .unwrap_or_default()
    }

    /// The type itself followed by its supertypes, breadth-first.
    fn type_chain(&self, type_name: &str) -> Vec<TypeInfo> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = std::collections::VecDeque::from([erasure(type_name)]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(info) = self.type_info(&name) {
                if let Some(sup) = &info.superclass {
                    queue.push_back(erasure(sup));
                }
                queue.extend(info.interfaces.iter().map(|i| erasure(i)));
                chain.push(info);
            }
        }
        chain
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let sup = erasure(sup);
        sup == "java.lang.Object" || self.type_chain(sub).iter().any(|i| i.name == sup)
    }

    /// Whether a value of `arg` (or `null`) can be passed where `param` is
    /// declared.
    fn is_assignable(&self, arg: Option<&str>, param: &str) -> bool {
        let param_erased = erasure(param);
        if is_type_variable(param) || param_erased == "java.lang.Object" {
            return true;
        }
        let Some(arg) = arg else {
            return !is_primitive(param);
        };
        let arg_erased = erasure(arg);
        if arg_erased == param_erased {
            return true;
        }
        match (PrimitiveKind::of(arg), PrimitiveKind::of(param)) {
            (Some(a), Some(p)) if is_primitive_like(arg) && is_primitive_like(param) => {
                numeric_widens(a, p)
            }
            _ => self.is_subtype(&arg_erased, &param_erased),
        }
    }

    /// First method matching `pred` along the type chain, with its owner.
    fn find_method(
        &self,
        type_name: &str,
        pred: &dyn Fn(&MethodInfo) -> bool,
    ) -> Option<(TypeInfo, MethodInfo)> {
        self.type_chain(type_name).into_iter().find_map(|owner| {
            let m = owner.methods.iter().find(|m| pred(m))?.clone();
            Some((owner, m))
        })
    }
}

/// Live objects of one execution.
pub trait RuntimeSession {
    /// Run one operation against already-evaluated inputs (receiver first).
    fn invoke(&mut self, operation: &Operation, args: &[Value]) -> Result<Value, InvokeError>;

    /// Read a field of an object directly, ignoring visibility.
    fn read_field(&mut self, target: &Value, field: &FieldInfo) -> Result<Value, InvokeError>;

    /// Static description of the value's runtime type.
    fn describe(&self, value: &Value) -> Option<TypeInfo>;

    /// Public fields verbatim; other fields only through a matching
    /// zero-argument accessor. `None` for primitives, null, and types the
    /// session cannot describe.
    fn read_observable_state(&mut self, value: &Value) -> Result<Option<ObservedState>, InvokeError> {
        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        let Some(info) = self.describe(value) else {
            return Ok(None);
        };
        let mut state = ObservedState::new(obj.type_name.clone());
        for field in info.fields.iter().filter(|f| !f.is_static) {
            if field.visibility == Visibility::Public {
                let v = self.read_field(value, field)?;
                state.fields.insert(
                    field.name.clone(),
                    ObservedField {
                        declared_type: field.type_name.clone(),
                        value: v.observe(),
                        accessor: None,
                    },
                );
            } else if let Some(accessor) = info.accessor_for(field) {
                let op = Operation::Method {
                    declaring: info.name.clone(),
                    name: accessor.name.clone(),
                    params: Vec::new(),
                    returns: accessor.returns.clone(),
                    is_static: false,
                };
                // An accessor that throws is simply not observed.
                match self.invoke(&op, std::slice::from_ref(value)) {
                    Ok(v) => {
                        state.fields.insert(
                            field.name.clone(),
                            ObservedField {
                                declared_type: accessor.returns.clone(),
                                value: v.observe(),
                                accessor: Some(accessor.name.clone()),
                            },
                        );
                    }
                    Err(InvokeError::Thrown(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Some(state))
    }
}

/// Subtype facts from an external class-hierarchy analysis.
pub trait TypeHierarchy: Send + Sync {
    /// Concrete types compatible with `type_name` (excluding itself).
    fn concrete_types_of(&self, type_name: &str) -> BTreeSet<String>;

    fn supertypes_of(&self, type_name: &str) -> BTreeSet<String>;
}

/// A hierarchy that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHierarchy;

impl TypeHierarchy for NoHierarchy {
    fn concrete_types_of(&self, _type_name: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn supertypes_of(&self, _type_name: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Substitute the receiver's generic arguments into a member descriptor.
fn bind_receiver_types(info: &TypeInfo, declaring: &str, operation: Operation) -> Operation {
    let bindings = info.bindings_for(declaring);
    if bindings.is_empty() {
        return operation;
    }
    operation.map_types(|t| bind_type_parameters(t, &bindings))
}

fn params_match_erased(declared: &[String], wanted: &[String]) -> bool {
    declared.len() == wanted.len()
        && declared
            .iter()
            .zip(wanted)
            .all(|(d, w)| erasure(d) == *w || (is_type_variable(d) && w == "java.lang.Object"))
}

/// Pick the applicable overload with the most exact parameter matches.
/// Ties keep declaration order.
fn best_overload<'a, T>(
    candidates: impl Iterator<Item = (&'a Vec<String>, T)>,
    args: &[Option<String>],
    assignable: impl Fn(Option<&str>, &str) -> bool,
) -> Option<T> {
    let mut best: Option<(usize, T)> = None;
    for (params, item) in candidates {
        if params.len() != args.len() {
            continue;
        }
        let applicable = params
            .iter()
            .zip(args)
            .all(|(p, a)| assignable(a.as_deref(), p));
        if !applicable {
            continue;
        }
        let exact = params
            .iter()
            .zip(args)
            .filter(|(p, a)| a.as_deref().map(erasure) == Some(erasure(p)))
            .count();
        if best.as_ref().map_or(true, |(score, _)| exact > *score) {
            best = Some((exact, item));
        }
    }
    best.map(|(_, item)| item)
}

fn numeric_widens(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    use PrimitiveKind::*;
    if from == to {
        return true;
    }
    let rank = |k: PrimitiveKind| match k {
        Byte => Some(1),
        Short | Char => Some(2),
        Int => Some(3),
        Long => Some(4),
        Float => Some(5),
        Double => Some(6),
        _ => None,
    };
    match (rank(from), rank(to)) {
        (Some(a), Some(b)) => a < b && !(from == Char && to == Short),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    struct Fixed(BTreeMap<String, TypeInfo>);

    impl TypeIntrospector for Fixed {
        fn type_info(&self, type_name: &str) -> Option<TypeInfo> {
            self.0.get(type_name).cloned()
        }

        fn new_session(&self) -> Result<Box<dyn RuntimeSession + '_>, IntrospectError> {
            Err(IntrospectError::Session("static only".into()))
        }
    }

    fn class(name: &str, superclass: Option<&str>) -> TypeInfo {
        TypeInfo {
            name: name.into(),
            kind: TypeKind::Class,
            is_public: true,
            type_params: vec![],
            superclass: superclass.map(String::from),
            interfaces: vec![],
            fields: vec![],
            constructors: vec![],
            methods: vec![],
            enum_constants: vec![],
        }
    }

    fn model() -> Fixed {
        let mut base = class("a.Base", None);
        base.methods.push(MethodInfo {
            name: "size".into(),
            params: vec![],
            returns: "int".into(),
            visibility: Visibility::Public,
            is_static: false,
        });
        let mut foo = class("a.Foo", Some("a.Base"));
        foo.constructors.push(ConstructorInfo {
            params: vec!["long".into()],
            visibility: Visibility::Public,
        });
        foo.constructors.push(ConstructorInfo {
            params: vec!["a.Base".into()],
            visibility: Visibility::Private,
        });
        foo.fields.push(FieldInfo {
            name: "secret".into(),
            type_name: "int".into(),
            visibility: Visibility::Private,
            is_static: false,
        });
        Fixed(BTreeMap::from([
            ("a.Base".to_string(), base),
            ("a.Foo".to_string(), foo),
        ]))
    }

    #[test]
    fn test_resolve_inherited_method() {
        let m = model();
        let r = m.resolve_member(&MemberRef::parse("a.Foo.size()").unwrap()).unwrap();
        assert!(r.is_public());
        assert_eq!(r.operation.output_type(), Some("int".to_string()));
    }

    #[test]
    fn test_resolve_call_widens_int_to_long() {
        let m = model();
        let r = m
            .resolve_call("a.Foo", MemberRef::CONSTRUCTOR, &[Some("int".into())])
            .unwrap();
        assert_eq!(r.operation.param_types(), vec!["long".to_string()]);
    }

    #[test]
    fn test_private_members_are_not_public() {
        let m = model();
        let ctor = Operation::Constructor {
            declaring: "a.Foo".into(),
            params: vec!["a.Base".into()],
        };
        assert!(!m.is_publicly_accessible(&ctor));
        let get = Operation::FieldGet {
            declaring: "a.Foo".into(),
            field: "secret".into(),
            field_type: "int".into(),
            is_static: false,
        };
        assert!(!m.is_publicly_accessible(&get));
        assert_eq!(m.list_public_constructors("a.Foo").len(), 1);
    }

    #[test]
    fn test_subtype_walks_superclass() {
        let m = model();
        assert!(m.is_subtype("a.Foo", "a.Base"));
        assert!(!m.is_subtype("a.Base", "a.Foo"));
    }
}
