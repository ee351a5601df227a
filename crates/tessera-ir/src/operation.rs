//! Operation descriptors: what a statement does.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::typename::{array_of, erasure, is_void, split_top_level, TypeTree};

/// The tag of a statement, derived from its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    ConstructorCall,
    MethodCall,
    FieldGet,
    FieldSet,
    PrimitiveLiteral,
    ArrayCreate,
}

/// An operation descriptor: declaring type plus member signature, or a
/// literal type and value.
///
/// Input conventions (indices into the owning statement's `inputs`):
/// - `Constructor`: one input per parameter.
/// - `Method`: receiver first when not static, then one per parameter.
/// - `FieldGet`: receiver when not static, otherwise none.
/// - `FieldSet`: receiver when not static, then the assigned value.
/// - `Literal`: none.
/// - `ArrayCreate`: either none (default-filled) or exactly `length` elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Constructor {
        declaring: String,
        params: Vec<String>,
    },
    Method {
        declaring: String,
        name: String,
        params: Vec<String>,
        returns: String,
        is_static: bool,
    },
    FieldGet {
        declaring: String,
        field: String,
        field_type: String,
        is_static: bool,
    },
    FieldSet {
        declaring: String,
        field: String,
        field_type: String,
        is_static: bool,
    },
    Literal {
        type_name: String,
        value: Literal,
    },
    ArrayCreate {
        element: String,
        length: usize,
    },
}

impl Operation {
    pub fn kind(&self) -> StatementKind {
        match self {
            Operation::Constructor { .. } => StatementKind::ConstructorCall,
            Operation::Method { .. } => StatementKind::MethodCall,
            Operation::FieldGet { .. } => StatementKind::FieldGet,
            Operation::FieldSet { .. } => StatementKind::FieldSet,
            Operation::Literal { .. } => StatementKind::PrimitiveLiteral,
            Operation::ArrayCreate { .. } => StatementKind::ArrayCreate,
        }
    }

    /// Stable key used by the operation index and the test plan.
    pub fn signature(&self) -> String {
        match self {
            Operation::Constructor { declaring, params } => {
                format!("{}.<init>({})", erasure(declaring), erased_list(params))
            }
            Operation::Method {
                declaring,
                name,
                params,
                ..
            } => format!("{}.{}({})", erasure(declaring), name, erased_list(params)),
            Operation::FieldGet {
                declaring, field, ..
            }
            | Operation::FieldSet {
                declaring, field, ..
            } => format!("{}.{}", erasure(declaring), field),
            Operation::Literal { type_name, .. } => {
                format!("literal:{}", TypeTree::parse(type_name))
            }
            Operation::ArrayCreate { element, .. } => {
                format!("new:{}", array_of(&erasure(element)))
            }
        }
    }

    /// Type of the produced value, `None` when the operation yields nothing.
    pub fn output_type(&self) -> Option<String> {
        match self {
            Operation::Constructor { declaring, .. } => Some(declaring.clone()),
            Operation::Method { returns, .. } => {
                if is_void(returns) {
                    None
                } else {
                    Some(returns.clone())
                }
            }
            Operation::FieldGet { field_type, .. } => Some(field_type.clone()),
            Operation::FieldSet { .. } => None,
            Operation::Literal { type_name, .. } => Some(type_name.clone()),
            Operation::ArrayCreate { element, .. } => Some(array_of(element)),
        }
    }

    pub fn declaring_type(&self) -> Option<&str> {
        match self {
            Operation::Constructor { declaring, .. }
            | Operation::Method { declaring, .. }
            | Operation::FieldGet { declaring, .. }
            | Operation::FieldSet { declaring, .. } => Some(declaring),
            Operation::Literal { .. } | Operation::ArrayCreate { .. } => None,
        }
    }

    /// Whether the first input is a receiver object.
    pub fn has_receiver(&self) -> bool {
        match self {
            Operation::Method { is_static, .. }
            | Operation::FieldGet { is_static, .. }
            | Operation::FieldSet { is_static, .. } => !is_static,
            _ => false,
        }
    }

    /// Whether this operation touches a member of a declared type.
    pub fn is_member_access(&self) -> bool {
        self.declaring_type().is_some()
    }

    /// Declared parameter types, excluding any receiver.
    pub fn param_types(&self) -> Vec<String> {
        match self {
            Operation::Constructor { params, .. } | Operation::Method { params, .. } => {
                params.clone()
            }
            Operation::FieldSet { field_type, .. } => vec![field_type.clone()],
            Operation::ArrayCreate { element, length } => vec![element.clone(); *length],
            Operation::FieldGet { .. } | Operation::Literal { .. } => Vec::new(),
        }
    }

    /// Number of inputs a statement with this operation must reference.
    ///
    /// `ArrayCreate` also accepts zero inputs; see [`Operation::accepts_arity`].
    pub fn arity(&self) -> usize {
        usize::from(self.has_receiver()) + self.param_types().len()
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        match self {
            Operation::ArrayCreate { length, .. } => count == 0 || count == *length,
            _ => count == self.arity(),
        }
    }

    /// Apply `f` to every type name in the descriptor.
    pub fn map_types(&self, f: impl Fn(&str) -> String) -> Operation {
        match self {
            Operation::Constructor { declaring, params } => Operation::Constructor {
                declaring: f(declaring),
                params: params.iter().map(|p| f(p)).collect(),
            },
            Operation::Method {
                declaring,
                name,
                params,
                returns,
                is_static,
            } => Operation::Method {
                declaring: f(declaring),
                name: name.clone(),
                params: params.iter().map(|p| f(p)).collect(),
                returns: if is_void(returns) {
                    returns.clone()
                } else {
                    f(returns)
                },
                is_static: *is_static,
            },
            Operation::FieldGet {
                declaring,
                field,
                field_type,
                is_static,
            } => Operation::FieldGet {
                declaring: f(declaring),
                field: field.clone(),
                field_type: f(field_type),
                is_static: *is_static,
            },
            Operation::FieldSet {
                declaring,
                field,
                field_type,
                is_static,
            } => Operation::FieldSet {
                declaring: f(declaring),
                field: field.clone(),
                field_type: f(field_type),
                is_static: *is_static,
            },
            Operation::Literal { type_name, value } => Operation::Literal {
                type_name: f(type_name),
                value: value.clone(),
            },
            Operation::ArrayCreate { element, length } => Operation::ArrayCreate {
                element: f(element),
                length: *length,
            },
        }
    }

    /// Member reference (declaring type, name, parameter types) for
    /// constructor and method calls.
    pub fn member_ref(&self) -> Option<MemberRef> {
        match self {
            Operation::Constructor { declaring, params } => Some(MemberRef {
                declaring: declaring.clone(),
                name: MemberRef::CONSTRUCTOR.to_string(),
                params: params.clone(),
            }),
            Operation::Method {
                declaring,
                name,
                params,
                ..
            } => Some(MemberRef {
                declaring: declaring.clone(),
                name: name.clone(),
                params: params.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn erased_list(types: &[String]) -> String {
    types
        .iter()
        .map(|t| erasure(t))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignatureError {
    #[error("Signature '{0}' has no parameter list")]
    MissingParams(String),

    #[error("Signature '{0}' has no declaring type")]
    MissingDeclaringType(String),
}

/// A parsed operation signature: `com.acme.Foo.bar(int,java.util.List)`.
///
/// Return type and staticness are not part of a signature; they come from
/// resolving the reference against the program under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub declaring: String,
    pub name: String,
    pub params: Vec<String>,
}

impl MemberRef {
    pub const CONSTRUCTOR: &'static str = "<init>";

    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let sig = signature.trim();
        let open = sig
            .find('(')
            .filter(|_| sig.ends_with(')'))
            .ok_or_else(|| SignatureError::MissingParams(sig.to_string()))?;
        let head = &sig[..open];
        let params_text = &sig[open + 1..sig.len() - 1];
        let dot = head
            .rfind('.')
            .ok_or_else(|| SignatureError::MissingDeclaringType(sig.to_string()))?;
        let params = split_top_level(params_text, ',')
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        Ok(MemberRef {
            declaring: head[..dot].trim().to_string(),
            name: head[dot + 1..].trim().to_string(),
            params,
        })
    }

    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR
    }

    pub fn signature(&self) -> String {
        format!(
            "{}.{}({})",
            erasure(&self.declaring),
            self.name,
            erased_list(&self.params)
        )
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
