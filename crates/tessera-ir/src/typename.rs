//! Type-name helpers.
//!
//! Type names are plain source-form strings: `int`, `java.lang.String`,
//! `java.util.List<com.acme.Foo>`, `int[]`. Nothing here knows about the
//! program under test; these helpers only classify and decompose names.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The primitive-like value families that the literal pool manufactures.
///
/// Boxed forms and `String` map onto the same family as their primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::String,
    ];

    /// Classify a type name (primitive, boxed, or string).
    pub fn of(type_name: &str) -> Option<Self> {
        let kind = match type_name.trim() {
            "boolean" | "java.lang.Boolean" | "Boolean" => PrimitiveKind::Boolean,
            "byte" | "java.lang.Byte" | "Byte" => PrimitiveKind::Byte,
            "short" | "java.lang.Short" | "Short" => PrimitiveKind::Short,
            "char" | "java.lang.Character" | "Character" => PrimitiveKind::Char,
            "int" | "java.lang.Integer" | "Integer" => PrimitiveKind::Int,
            "long" | "java.lang.Long" | "Long" => PrimitiveKind::Long,
            "float" | "java.lang.Float" | "Float" => PrimitiveKind::Float,
            "double" | "java.lang.Double" | "Double" => PrimitiveKind::Double,
            "java.lang.String" | "String" => PrimitiveKind::String,
            _ => return None,
        };
        Some(kind)
    }

    /// The canonical (unboxed) type name for this family.
    pub fn type_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "java.lang.String",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// True for the unboxed keyword types (`int`, `boolean`, ...).
pub fn is_primitive(type_name: &str) -> bool {
    matches!(
        type_name.trim(),
        "boolean" | "byte" | "short" | "char" | "int" | "long" | "float" | "double"
    )
}

/// True for primitives, their boxes, and `String`.
pub fn is_primitive_like(type_name: &str) -> bool {
    PrimitiveKind::of(type_name).is_some()
}

pub fn is_void(type_name: &str) -> bool {
    matches!(type_name.trim(), "void" | "java.lang.Void")
}

/// A parsed type name: base, generic arguments, array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTree {
    pub base: String,
    pub args: Vec<TypeTree>,
    pub dims: usize,
}

impl TypeTree {
    pub fn parse(type_name: &str) -> Self {
        let mut rest = type_name.trim();
        let mut dims = 0;
        while let Some(stripped) = rest.strip_suffix("[]") {
            dims += 1;
            rest = stripped.trim_end();
        }

        if let (Some(open), true) = (rest.find('<'), rest.ends_with('>')) {
            let base = rest[..open].trim().to_string();
            let inner = &rest[open + 1..rest.len() - 1];
            let args = split_top_level(inner, ',')
                .into_iter()
                .filter(|a| !a.trim().is_empty())
                .map(|a| TypeTree::parse(&a))
                .collect();
            TypeTree { base, args, dims }
        } else {
            TypeTree {
                base: rest.to_string(),
                args: Vec::new(),
                dims,
            }
        }
    }

    /// Replace every type variable (and wildcard) with `witness`.
    fn substitute(&self, witness: &str) -> TypeTree {
        let base = self.base.trim();
        if base.starts_with('?') {
            let text = TypeTree {
                dims: 0,
                ..self.clone()
            }
            .to_string();
            let bound = text.trim_start_matches('?').trim();
            let bounded = bound
                .strip_prefix("extends")
                .or_else(|| bound.strip_prefix("super"))
                .map(str::trim)
                .filter(|b| !b.is_empty());
            return match bounded {
                Some(b) => {
                    let mut tree = TypeTree::parse(b).substitute(witness);
                    tree.dims += self.dims;
                    tree
                }
                None => TypeTree {
                    base: witness.to_string(),
                    args: Vec::new(),
                    dims: self.dims,
                },
            };
        }
        if self.args.is_empty() && is_type_variable(base) {
            return TypeTree {
                base: witness.to_string(),
                args: Vec::new(),
                dims: self.dims,
            };
        }
        TypeTree {
            base: self.base.clone(),
            args: self.args.iter().map(|a| a.substitute(witness)).collect(),
            dims: self.dims,
        }
    }

    /// Replace named type parameters (`E` -> `java.lang.Integer`).
    pub fn bind(&self, bindings: &BTreeMap<String, String>) -> TypeTree {
        if self.args.is_empty() {
            if let Some(bound) = bindings.get(self.base.trim()) {
                let mut tree = TypeTree::parse(bound);
                tree.dims += self.dims;
                return tree;
            }
        }
        TypeTree {
            base: self.base.clone(),
            args: self.args.iter().map(|a| a.bind(bindings)).collect(),
            dims: self.dims,
        }
    }

    /// Apply `f` to the base name of every component.
    pub fn map_bases(&self, f: &dyn Fn(&str) -> String) -> TypeTree {
        TypeTree {
            base: f(&self.base),
            args: self.args.iter().map(|a| a.map_bases(f)).collect(),
            dims: self.dims,
        }
    }

    fn has_type_variable(&self) -> bool {
        let base = self.base.trim();
        base.starts_with('?')
            || (self.args.is_empty() && is_type_variable(base))
            || self.args.iter().any(TypeTree::has_type_variable)
    }
}

impl fmt::Display for TypeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Split on `sep` at generic depth zero.
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            _ => {}
        }
        if c == sep && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Strip generic arguments at every depth: `java.util.List<Foo>[]` -> `java.util.List[]`.
pub fn erasure(type_name: &str) -> String {
    let tree = TypeTree::parse(type_name);
    let mut out = tree.base;
    for _ in 0..tree.dims {
        out.push_str("[]");
    }
    out
}

/// Top-level generic arguments, in declaration order.
pub fn type_arguments(type_name: &str) -> Vec<String> {
    let tree = TypeTree::parse(type_name);
    if tree.dims > 0 {
        return Vec::new();
    }
    tree.args.iter().map(ToString::to_string).collect()
}

/// Element type of a one-level array type, `None` for non-arrays.
pub fn array_element(type_name: &str) -> Option<String> {
    let trimmed = type_name.trim();
    trimmed
        .strip_suffix("[]")
        .map(|element| element.trim_end().to_string())
}

pub fn array_dimensions(type_name: &str) -> usize {
    TypeTree::parse(type_name).dims
}

pub fn array_of(element: &str) -> String {
    format!("{}[]", element.trim())
}

/// Last dotted segment of the erased name: `java.util.List<X>` -> `List`.
pub fn simple_name(type_name: &str) -> String {
    let erased = erasure(type_name);
    match erased.rfind('.') {
        Some(dot) => erased[dot + 1..].to_string(),
        None => erased,
    }
}

/// Package prefix of a qualified name, if any.
pub fn package_of(type_name: &str) -> Option<String> {
    let erased = erasure(type_name);
    erased.rfind('.').map(|dot| erased[..dot].to_string())
}

/// Heuristic for an unresolved generic type variable (`T`, `E`, `K2`, `?`).
pub fn is_type_variable(type_name: &str) -> bool {
    let name = type_name.trim();
    if name == "?" || name.starts_with("? ") {
        return true;
    }
    if name.is_empty() || name.len() > 2 || name.contains('.') || is_primitive(name) {
        return false;
    }
    let mut chars = name.chars();
    let first_upper = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    first_upper && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// True when any component of the type (at any depth) is a type variable or wildcard.
pub fn mentions_type_variable(type_name: &str) -> bool {
    TypeTree::parse(type_name).has_type_variable()
}

/// Replace unresolved type variables with a concrete witness type.
pub fn substitute_type_variables(type_name: &str, witness: &str) -> String {
    TypeTree::parse(type_name).substitute(witness).to_string()
}

/// Substitute declared type parameters by name.
pub fn bind_type_parameters(type_name: &str, bindings: &BTreeMap<String, String>) -> String {
    if bindings.is_empty() {
        return type_name.to_string();
    }
    TypeTree::parse(type_name).bind(bindings).to_string()
}

/// Replace the generic arguments of `type_name` with those of `source`.
///
/// Used to carry `List<Foo>` arguments over to a concrete `ArrayList`.
pub fn with_arguments_of(type_name: &str, source: &str) -> String {
    let mut tree = TypeTree::parse(type_name);
    tree.args = TypeTree::parse(source).args;
    tree.to_string()
}
