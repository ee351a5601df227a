//! Lowering of parsed statements into the sequence IR.
//!
//! Every argument of an IR statement is a variable, so literal and
//! field-access arguments are hoisted into synthetic statements placed just
//! before the statement that uses them. The result records, per source
//! statement, which IR index holds its real result.

use std::collections::HashMap;

use tessera_ir::introspect::{IntrospectError, TypeIntrospector};
use tessera_ir::typename::{
    array_dimensions, array_element, erasure, is_primitive, package_of, with_arguments_of,
    PrimitiveKind, TypeTree,
};
use tessera_ir::{Literal, MemberRef, Operation, Sequence, VarIndex};

use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::parser::{Expr, Parser, SourceStmt, Stmt};

/// Simple names resolved without an import.
const JAVA_LANG: &[&str] = &[
    "Object", "String", "Integer", "Long", "Short", "Byte", "Character", "Boolean", "Float",
    "Double", "Number", "Math", "StringBuilder", "CharSequence", "Comparable", "Iterable",
    "Enum", "Exception", "RuntimeException", "Throwable", "Error", "Class", "Void",
];

/// What a fragment is parsed against.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    /// Import declarations, with or without the `import` keyword.
    pub imports: &'a [String],
    /// Type whose static members may be referenced unqualified.
    pub declaring_type: Option<&'a str>,
    pub introspector: &'a dyn TypeIntrospector,
}

impl<'a> ParseContext<'a> {
    pub fn new(introspector: &'a dyn TypeIntrospector) -> Self {
        Self {
            imports: &[],
            declaring_type: None,
            introspector,
        }
    }

    pub fn with_imports(mut self, imports: &'a [String]) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_declaring_type(mut self, declaring_type: &'a str) -> Self {
        self.declaring_type = Some(declaring_type);
        self
    }

    /// Fully qualify every component of a source type name.
    pub fn qualify(&self, type_name: &str) -> String {
        if type_name.trim_start().starts_with('?') {
            return type_name.trim().to_string();
        }
        TypeTree::parse(type_name)
            .map_bases(&|base| self.qualify_base(base))
            .to_string()
    }

    fn qualify_base(&self, base: &str) -> String {
        let base = base.trim();
        if is_primitive(base) || base == "void" || base.starts_with('?') {
            return base.to_string();
        }
        let (head, rest) = match base.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (base, None),
        };
        let known = |name: &str| self.introspector.type_info(name).is_some();

        for import in self.imports {
            let import = normalize_import(import);
            if let Some(pkg) = import.strip_suffix(".*") {
                let candidate = format!("{pkg}.{head}");
                if known(&candidate) {
                    return join(candidate, rest);
                }
            } else if import.rsplit('.').next() == Some(head) {
                return join(import.to_string(), rest);
            }
        }
        if rest.is_some() && known(base) {
            return base.to_string();
        }
        if let Some(pkg) = self.declaring_type.and_then(package_of) {
            let candidate = format!("{pkg}.{head}");
            if known(&candidate) {
                return join(candidate, rest);
            }
        }
        if rest.is_none() && JAVA_LANG.contains(&head) {
            return format!("java.lang.{head}");
        }
        if rest.is_none() && !known(base) && known(&format!("java.util.{head}")) {
            return format!("java.util.{head}");
        }
        base.to_string()
    }
}

fn normalize_import(import: &str) -> &str {
    let s = import.trim().trim_end_matches(';').trim();
    let s = s.strip_prefix("import").map_or(s, str::trim_start);
    s.strip_prefix("static ").map_or(s, str::trim_start)
}

fn join(qualified: String, rest: Option<&str>) -> String {
    match rest {
        Some(r) => format!("{qualified}.{r}"),
        None => qualified,
    }
}

/// A fragment lowered to IR.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSequence {
    pub sequence: Sequence,
    /// For each source statement, the IR index of its (non-synthetic) result.
    pub original_indices: Vec<VarIndex>,
}

impl ParsedSequence {
    /// Whether IR statement `index` was introduced by hoisting.
    pub fn is_synthetic(&self, index: VarIndex) -> bool {
        !self.original_indices.contains(&index)
    }
}

/// Result of lenient parsing: every statement before the first failure.
#[derive(Debug)]
pub struct PrefixParse {
    pub parsed: ParsedSequence,
    pub error: Option<ParseError>,
}

impl PrefixParse {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse a fragment; any failure fails the whole fragment.
pub fn parse(code: &str, ctx: &ParseContext<'_>) -> Result<ParsedSequence, ParseError> {
    let prefix = parse_prefix(code, ctx);
    match prefix.error {
        Some(err) => Err(err),
        None => Ok(prefix.parsed),
    }
}

/// Parse as many leading statements as possible.
pub fn parse_prefix(code: &str, ctx: &ParseContext<'_>) -> PrefixParse {
    let lexed = tokenize(code);
    let mut parser = Parser::new(&lexed.tokens);
    let mut lowerer = Lowerer::new(ctx);
    let mut error = None;

    while !parser.at_end() {
        let mark = lowerer.seq.len();
        let result = parser
            .parse_statement()
            .and_then(|stmt| lowerer.lower_statement(&stmt));
        if let Err(err) = result {
            lowerer.seq = lowerer.seq.prefix(mark);
            // A lex error truncates the token stream; report it rather than
            // the resulting end-of-input.
            error = match (err, lexed.error.as_ref()) {
                (ParseError::UnexpectedEof { .. }, Some(_)) => None,
                (err, _) => Some(err),
            };
            break;
        }
    }
    let error = error.or(lexed.error);

    PrefixParse {
        parsed: ParsedSequence {
            sequence: lowerer.seq,
            original_indices: lowerer.originals,
        },
        error,
    }
}

/// An argument evaluated far enough to know its static type.
enum Pending {
    Var(VarIndex),
    Literal { value: Literal, natural: String },
    Null,
}

/// Either a value-producing path or a type name used as a qualifier.
enum PathTarget {
    Value(VarIndex),
    Type(String),
}

struct Lowerer<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    seq: Sequence,
    originals: Vec<VarIndex>,
    vars: HashMap<String, VarIndex>,
    line: usize,
}

impl<'c, 'a> Lowerer<'c, 'a> {
    fn new(ctx: &'c ParseContext<'a>) -> Self {
        Self {
            ctx,
            seq: Sequence::new(),
            originals: Vec::new(),
            vars: HashMap::new(),
            line: 1,
        }
    }

    fn intro(&self) -> &'a dyn TypeIntrospector {
        self.ctx.introspector
    }

    fn resolution(&self, source: IntrospectError) -> ParseError {
        ParseError::Resolution {
            line: self.line,
            source,
        }
    }

    fn emit(
        &mut self,
        operation: Operation,
        inputs: Vec<VarIndex>,
        label: Option<String>,
    ) -> Result<VarIndex, ParseError> {
        self.seq
            .push_labeled(operation, inputs, label)
            .map_err(|source| ParseError::Sequence {
                line: self.line,
                source,
            })
    }

    fn lower_statement(&mut self, source: &SourceStmt) -> Result<(), ParseError> {
        self.line = source.line;
        let result = match &source.stmt {
            Stmt::Declare {
                type_name,
                name,
                init,
            } => {
                let declared = self.ctx.qualify(type_name);
                if array_dimensions(&declared) > 1 {
                    return Err(ParseError::MultiDimensionalArray {
                        line: self.line,
                        type_name: declared,
                    });
                }
                let index = self.lower_value(init, Some(&declared), Some(name.clone()), 0)?;
                self.vars.insert(name.clone(), index);
                index
            }
            Stmt::Assign { target, value } => self.lower_assign(target, value)?,
            Stmt::Expr(expr) => self.lower_value(expr, None, None, 0)?,
        };
        self.originals.push(result);
        Ok(())
    }

    fn lower_assign(&mut self, target: &Expr, value: &Expr) -> Result<VarIndex, ParseError> {
        // Plain variable: rebind the name to a new statement.
        if let Expr::Name(path) = target {
            if let [name] = path.as_slice() {
                let current = *self.vars.get(name).ok_or_else(|| ParseError::UnknownVariable {
                    line: self.line,
                    name: name.clone(),
                })?;
                let expected = self.seq.output_type(current);
                let index = self.lower_value(value, expected.as_deref(), Some(name.clone()), 0)?;
                self.vars.insert(name.clone(), index);
                return Ok(index);
            }
        }

        let (owner, field) = match target {
            Expr::Name(path) => {
                let (field, owner_path) = path.split_last().ok_or_else(|| {
                    ParseError::UnsupportedStatement {
                        line: self.line,
                        found: "empty assignment target".into(),
                    }
                })?;
                (self.classify_path(owner_path, None)?, field.clone())
            }
            Expr::Field { target, name } => {
                let receiver = self.lower_nested(target, 1)?;
                (PathTarget::Value(receiver), name.clone())
            }
            _ => {
                return Err(ParseError::UnsupportedStatement {
                    line: self.line,
                    found: "assignment to a non-variable".into(),
                })
            }
        };

        let (declaring, receiver) = self.target_type(&owner)?;
        let resolved = self
            .intro()
            .resolve_field(&declaring, &field)
            .map_err(|e| self.resolution(e))?;
        let Operation::FieldGet {
            declaring,
            field,
            field_type,
            is_static,
        } = resolved.operation
        else {
            return Err(ParseError::UnresolvedName {
                line: self.line,
                name: field,
            });
        };
        let pending = self.lower_pending(value, 1)?;
        let value_index = self.materialize(pending, &field_type)?;
        let mut inputs = Vec::new();
        if !is_static {
            inputs.push(receiver.ok_or_else(|| ParseError::UnresolvedName {
                line: self.line,
                name: field.clone(),
            })?);
        }
        inputs.push(value_index);
        self.emit(
            Operation::FieldSet {
                declaring,
                field,
                field_type,
                is_static,
            },
            inputs,
            None,
        )
    }

    /// Declaring type (and receiver, if any) for a member access on `target`.
    fn target_type(&self, target: &PathTarget) -> Result<(String, Option<VarIndex>), ParseError> {
        match target {
            PathTarget::Type(t) => Ok((t.clone(), None)),
            PathTarget::Value(index) => {
                let t = self.seq.output_type(*index).ok_or_else(|| {
                    ParseError::UnsupportedExpression {
                        line: self.line,
                        what: "member access on a void result".into(),
                    }
                })?;
                Ok((t, Some(*index)))
            }
        }
    }

    /// Lower an expression whose value is needed as a variable.
    fn lower_value(
        &mut self,
        expr: &Expr,
        expected: Option<&str>,
        label: Option<String>,
        depth: usize,
    ) -> Result<VarIndex, ParseError> {
        match expr {
            Expr::Literal { value, natural } => {
                let type_name = literal_type(expected, natural, value);
                self.emit(
                    Operation::Literal {
                        type_name,
                        value: value.clone(),
                    },
                    vec![],
                    label,
                )
            }
            Expr::Null => self.emit_null(expected.unwrap_or("java.lang.Object"), label),
            Expr::Cast { type_name, inner } => {
                let target = self.ctx.qualify(type_name);
                match inner.as_ref() {
                    Expr::Literal { value, .. } => {
                        let value = cast_literal(value, &target, self.line)?;
                        self.emit(
                            Operation::Literal {
                                type_name: target,
                                value,
                            },
                            vec![],
                            label,
                        )
                    }
                    Expr::Null => self.emit_null(&target, label),
                    _ => Err(ParseError::UnsupportedExpression {
                        line: self.line,
                        what: "cast of a non-literal".into(),
                    }),
                }
            }
            Expr::Name(path) => {
                if let [name] = path.as_slice() {
                    if let Some(&index) = self.vars.get(name) {
                        return Ok(index);
                    }
                }
                if let Some((value, natural)) = named_constant(path, &self.vars) {
                    let type_name = literal_type(expected, natural, &value);
                    return self.emit(Operation::Literal { type_name, value }, vec![], label);
                }
                match self.classify_path(path, label)? {
                    PathTarget::Value(index) => Ok(index),
                    PathTarget::Type(t) => Err(ParseError::UnsupportedExpression {
                        line: self.line,
                        what: format!("type name '{t}' used as a value"),
                    }),
                }
            }
            Expr::Field { target, name } => {
                let receiver = self.lower_nested(target, depth + 1)?;
                self.field_get(PathTarget::Value(receiver), name, label)
            }
            Expr::Call { target, name, args } => {
                self.lower_call(target.as_deref(), name, args, label, depth)
            }
            Expr::New { type_name, args } => self.lower_new(type_name, args, expected, label, depth),
            Expr::NewArray {
                element,
                length,
                init,
            } => {
                let element = self.ctx.qualify(element);
                if array_dimensions(&element) > 0 {
                    return Err(ParseError::MultiDimensionalArray {
                        line: self.line,
                        type_name: format!("{element}[]"),
                    });
                }
                match (length, init) {
                    (_, Some(items)) => self.lower_array_items(&element, items, label, depth),
                    (Some(len), None) => {
                        let Expr::Literal {
                            value: Literal::Int(n),
                            ..
                        } = len.as_ref()
                        else {
                            return Err(ParseError::UnsupportedExpression {
                                line: self.line,
                                what: "non-constant array length".into(),
                            });
                        };
                        let length = usize::try_from(*n).map_err(|_| ParseError::InvalidLiteral {
                            line: self.line,
                            text: n.to_string(),
                        })?;
                        self.emit(Operation::ArrayCreate { element, length }, vec![], label)
                    }
                    (None, None) => Err(ParseError::UnsupportedExpression {
                        line: self.line,
                        what: "array creation without length".into(),
                    }),
                }
            }
            Expr::ArrayInit(items) => {
                let element = expected.and_then(array_element).ok_or_else(|| {
                    ParseError::UnsupportedExpression {
                        line: self.line,
                        what: "array initializer without an array type".into(),
                    }
                })?;
                self.lower_array_items(&element, items, label, depth)
            }
        }
    }

    fn lower_array_items(
        &mut self,
        element: &str,
        items: &[Expr],
        label: Option<String>,
        depth: usize,
    ) -> Result<VarIndex, ParseError> {
        let mut inputs = Vec::with_capacity(items.len());
        for item in items {
            let pending = self.lower_pending(item, depth + 1)?;
            inputs.push(self.materialize(pending, element)?);
        }
        self.emit(
            Operation::ArrayCreate {
                element: element.to_string(),
                length: inputs.len(),
            },
            inputs,
            label,
        )
    }

    /// `null` bound to an array type becomes an empty array.
    fn emit_null(&mut self, type_name: &str, label: Option<String>) -> Result<VarIndex, ParseError> {
        match array_element(type_name) {
            Some(element) => self.emit(Operation::ArrayCreate { element, length: 0 }, vec![], label),
            None => self.emit(
                Operation::Literal {
                    type_name: type_name.to_string(),
                    value: Literal::Null,
                },
                vec![],
                label,
            ),
        }
    }

    /// Lower a compound sub-expression (receiver or argument) into a
    /// variable, enforcing the one-level nesting limit.
    fn lower_nested(&mut self, expr: &Expr, depth: usize) -> Result<VarIndex, ParseError> {
        let compound = matches!(
            expr,
            Expr::Call { .. } | Expr::New { .. } | Expr::NewArray { .. } | Expr::ArrayInit(_)
        );
        if compound && depth > 1 {
            return Err(ParseError::NestedTooDeep { line: self.line });
        }
        self.lower_value(expr, None, None, depth)
    }

    fn lower_pending(&mut self, expr: &Expr, depth: usize) -> Result<Pending, ParseError> {
        match expr {
            Expr::Literal { value, natural } => Ok(Pending::Literal {
                value: value.clone(),
                natural: natural.clone(),
            }),
            Expr::Null => Ok(Pending::Null),
            Expr::Cast { type_name, inner } => match inner.as_ref() {
                Expr::Literal { value, .. } => {
                    let target = self.ctx.qualify(type_name);
                    Ok(Pending::Literal {
                        value: cast_literal(value, &target, self.line)?,
                        natural: target,
                    })
                }
                Expr::Null => {
                    let target = self.ctx.qualify(type_name);
                    Ok(Pending::Var(self.emit_null(&target, None)?))
                }
                _ => Err(ParseError::UnsupportedExpression {
                    line: self.line,
                    what: "cast of a non-literal".into(),
                }),
            },
            Expr::Name(path) => {
                if let [name] = path.as_slice() {
                    if let Some(&index) = self.vars.get(name) {
                        return Ok(Pending::Var(index));
                    }
                }
                if let Some((value, natural)) = named_constant(path, &self.vars) {
                    return Ok(Pending::Literal {
                        value,
                        natural: natural.to_string(),
                    });
                }
                Ok(Pending::Var(self.lower_nested(expr, depth)?))
            }
            _ => Ok(Pending::Var(self.lower_nested(expr, depth)?)),
        }
    }

    fn pending_type(&self, pending: &Pending) -> Option<String> {
        match pending {
            Pending::Var(index) => self.seq.output_type(*index),
            Pending::Literal { natural, .. } => Some(natural.clone()),
            Pending::Null => None,
        }
    }

    /// Turn a pending argument into a variable of `param_type`, hoisting
    /// literals into synthetic statements.
    fn materialize(&mut self, pending: Pending, param_type: &str) -> Result<VarIndex, ParseError> {
        match pending {
            Pending::Var(index) => Ok(index),
            Pending::Literal { value, natural } => {
                let type_name = literal_type(Some(param_type), &natural, &value);
                self.emit(Operation::Literal { type_name, value }, vec![], None)
            }
            Pending::Null => self.emit_null(param_type, None),
        }
    }

    fn lower_call(
        &mut self,
        target: Option<&Expr>,
        name: &str,
        args: &[Expr],
        label: Option<String>,
        depth: usize,
    ) -> Result<VarIndex, ParseError> {
        let owner = match target {
            None => {
                let declaring = self.ctx.declaring_type.ok_or_else(|| ParseError::UnresolvedName {
                    line: self.line,
                    name: name.to_string(),
                })?;
                PathTarget::Type(declaring.to_string())
            }
            Some(Expr::Name(path)) => match path.as_slice() {
                [single] if self.vars.contains_key(single) => PathTarget::Value(self.vars[single]),
                _ => self.classify_path(path, None)?,
            },
            Some(other) => PathTarget::Value(self.lower_nested(other, depth + 1)?),
        };
        let (declaring, receiver) = self.target_type(&owner)?;

        let mut pendings = Vec::with_capacity(args.len());
        for arg in args {
            pendings.push(self.lower_pending(arg, depth + 1)?);
        }
        let arg_types: Vec<Option<String>> = pendings.iter().map(|p| self.pending_type(p)).collect();
        let resolved = self
            .intro()
            .resolve_call(&declaring, name, &arg_types)
            .map_err(|e| self.resolution(e))?;
        let operation = resolved.operation;

        let mut inputs = Vec::with_capacity(args.len() + 1);
        if operation.has_receiver() {
            inputs.push(receiver.ok_or_else(|| ParseError::UnsupportedExpression {
                line: self.line,
                what: format!("instance method '{name}' called without a receiver"),
            })?);
        }
        let params = operation.param_types();
        for (pending, param) in pendings.into_iter().zip(&params) {
            inputs.push(self.materialize(pending, param)?);
        }
        self.emit(operation, inputs, label)
    }

    fn lower_new(
        &mut self,
        type_name: &str,
        args: &[Expr],
        expected: Option<&str>,
        label: Option<String>,
        depth: usize,
    ) -> Result<VarIndex, ParseError> {
        let mut qualified = self.ctx.qualify(type_name);
        if type_name.contains("<>") {
            qualified = match expected {
                Some(exp) => with_arguments_of(&erasure(&qualified), exp),
                None => erasure(&qualified),
            };
        }
        let mut pendings = Vec::with_capacity(args.len());
        for arg in args {
            pendings.push(self.lower_pending(arg, depth + 1)?);
        }
        let arg_types: Vec<Option<String>> = pendings.iter().map(|p| self.pending_type(p)).collect();
        let resolved = self
            .intro()
            .resolve_call(&qualified, MemberRef::CONSTRUCTOR, &arg_types)
            .map_err(|e| self.resolution(e))?;
        let params = resolved.operation.param_types();
        let mut inputs = Vec::with_capacity(params.len());
        for (pending, param) in pendings.into_iter().zip(&params) {
            inputs.push(self.materialize(pending, param)?);
        }
        self.emit(resolved.operation, inputs, label)
    }

    fn field_get(
        &mut self,
        owner: PathTarget,
        field: &str,
        label: Option<String>,
    ) -> Result<VarIndex, ParseError> {
        let (declaring, receiver) = self.target_type(&owner)?;
        let resolved = self
            .intro()
            .resolve_field(&declaring, field)
            .map_err(|e| self.resolution(e))?;
        let inputs = if resolved.operation.has_receiver() {
            vec![receiver.ok_or_else(|| ParseError::UnsupportedExpression {
                line: self.line,
                what: format!("instance field '{field}' read without a receiver"),
            })?]
        } else {
            vec![]
        };
        self.emit(resolved.operation, inputs, label)
    }

    /// Resolve a dotted path: a variable followed by fields, a type followed
    /// by static fields, or a bare type. The last emitted field read gets
    /// `label`.
    fn classify_path(
        &mut self,
        path: &[String],
        label: Option<String>,
    ) -> Result<PathTarget, ParseError> {
        let Some(first) = path.first() else {
            return Err(ParseError::UnresolvedName {
                line: self.line,
                name: String::new(),
            });
        };

        let (mut current, consumed) = if let Some(&index) = self.vars.get(first) {
            (PathTarget::Value(index), 1)
        } else {
            let mut found = None;
            for k in (1..=path.len()).rev() {
                let candidate = self.ctx.qualify(&path[..k].join("."));
                if self.intro().type_info(&erasure(&candidate)).is_some() {
                    found = Some((PathTarget::Type(candidate), k));
                    break;
                }
            }
            match found {
                Some(hit) => hit,
                None => match (self.ctx.declaring_type, path.len()) {
                    (Some(declaring), 1) => (PathTarget::Type(declaring.to_string()), 0),
                    (_, 1) => {
                        return Err(ParseError::UnknownVariable {
                            line: self.line,
                            name: first.clone(),
                        })
                    }
                    _ => {
                        return Err(ParseError::UnresolvedName {
                            line: self.line,
                            name: path.join("."),
                        })
                    }
                },
            }
        };

        let rest = &path[consumed..];
        for (i, field) in rest.iter().enumerate() {
            let field_label = if i + 1 == rest.len() {
                label.clone()
            } else {
                None
            };
            let index = self.field_get(current, field, field_label)?;
            current = PathTarget::Value(index);
        }
        Ok(current)
    }
}

/// Declared type for a literal: the expected primitive-like type when the
/// literal fits it, otherwise the literal's natural type.
fn literal_type(expected: Option<&str>, natural: &str, value: &Literal) -> String {
    match expected {
        Some(exp) if value.is_null() => exp.to_string(),
        Some(exp) => match PrimitiveKind::of(exp) {
            Some(kind) if value.conforms_to(kind) => exp.to_string(),
            _ => natural.to_string(),
        },
        None => natural.to_string(),
    }
}

/// Apply a primitive cast to a literal value.
fn cast_literal(value: &Literal, target: &str, line: usize) -> Result<Literal, ParseError> {
    let invalid = || ParseError::InvalidLiteral {
        line,
        text: format!("({target}) {value}"),
    };
    let Some(kind) = PrimitiveKind::of(target) else {
        return Ok(value.clone());
    };
    let as_int = |v: &Literal| -> Option<i64> {
        match v {
            Literal::Int(i) => Some(*i),
            Literal::Char(c) => Some(i64::from(u32::from(*c))),
            Literal::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    };
    let cast = match kind {
        PrimitiveKind::Byte => Literal::Int(i64::from(as_int(value).ok_or_else(invalid)? as i8)),
        PrimitiveKind::Short => Literal::Int(i64::from(as_int(value).ok_or_else(invalid)? as i16)),
        PrimitiveKind::Int => Literal::Int(i64::from(as_int(value).ok_or_else(invalid)? as i32)),
        PrimitiveKind::Long => Literal::Int(as_int(value).ok_or_else(invalid)?),
        PrimitiveKind::Char => {
            let code = as_int(value).ok_or_else(invalid)?;
            let code = u32::try_from(code & 0xFFFF).map_err(|_| invalid())?;
            Literal::Char(char::from_u32(code).ok_or_else(invalid)?)
        }
        PrimitiveKind::Float | PrimitiveKind::Double => match value {
            Literal::Float(f) if kind == PrimitiveKind::Float => Literal::Float(f64::from(*f as f32)),
            Literal::Float(f) => Literal::Float(*f),
            other => Literal::Float(as_int(other).ok_or_else(invalid)? as f64),
        },
        PrimitiveKind::Boolean | PrimitiveKind::String => value.clone(),
    };
    Ok(cast)
}

/// Well-known constants of the boxed types, read as literals.
fn named_constant(
    path: &[String],
    vars: &HashMap<String, VarIndex>,
) -> Option<(Literal, &'static str)> {
    let [.., owner, name] = path else {
        return None;
    };
    if path.len() == 2 && vars.contains_key(owner) {
        return None;
    }
    if path.len() > 2 && path[..path.len() - 2].join(".") != "java.lang" {
        return None;
    }
    let lit = match (owner.as_str(), name.as_str()) {
        ("Double", "NaN") => (Literal::Float(f64::NAN), "double"),
        ("Double", "POSITIVE_INFINITY") => (Literal::Float(f64::INFINITY), "double"),
        ("Double", "NEGATIVE_INFINITY") => (Literal::Float(f64::NEG_INFINITY), "double"),
        ("Double", "MAX_VALUE") => (Literal::Float(f64::MAX), "double"),
        ("Double", "MIN_VALUE") => (Literal::Float(f64::from_bits(1)), "double"),
        ("Float", "NaN") => (Literal::Float(f64::NAN), "float"),
        ("Float", "POSITIVE_INFINITY") => (Literal::Float(f64::INFINITY), "float"),
        ("Float", "NEGATIVE_INFINITY") => (Literal::Float(f64::NEG_INFINITY), "float"),
        ("Float", "MAX_VALUE") => (Literal::Float(f64::from(f32::MAX)), "float"),
        ("Integer", "MAX_VALUE") => (Literal::Int(i64::from(i32::MAX)), "int"),
        ("Integer", "MIN_VALUE") => (Literal::Int(i64::from(i32::MIN)), "int"),
        ("Long", "MAX_VALUE") => (Literal::Int(i64::MAX), "long"),
        ("Long", "MIN_VALUE") => (Literal::Int(i64::MIN), "long"),
        ("Short", "MAX_VALUE") => (Literal::Int(i64::from(i16::MAX)), "short"),
        ("Short", "MIN_VALUE") => (Literal::Int(i64::from(i16::MIN)), "short"),
        ("Byte", "MAX_VALUE") => (Literal::Int(i64::from(i8::MAX)), "byte"),
        ("Byte", "MIN_VALUE") => (Literal::Int(i64::from(i8::MIN)), "byte"),
        _ => return None,
    };
    Some(lit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_literal_wraps() {
        assert_eq!(cast_literal(&Literal::Int(200), "byte", 1).unwrap(), Literal::Int(-56));
        assert_eq!(cast_literal(&Literal::Int(65), "char", 1).unwrap(), Literal::Char('A'));
        assert_eq!(
            cast_literal(&Literal::Int(2), "double", 1).unwrap(),
            Literal::Float(2.0)
        );
    }

    #[test]
    fn test_literal_type_prefers_expected_primitive() {
        assert_eq!(literal_type(Some("long"), "int", &Literal::Int(1)), "long");
        assert_eq!(
            literal_type(Some("java.lang.Object"), "int", &Literal::Int(1)),
            "int"
        );
        assert_eq!(literal_type(Some("boolean"), "int", &Literal::Int(1)), "int");
        assert_eq!(literal_type(Some("com.acme.Foo"), "null", &Literal::Null), "com.acme.Foo");
    }

    #[test]
    fn test_named_constants() {
        let vars = HashMap::new();
        let path = vec!["Double".to_string(), "NaN".to_string()];
        let (value, natural) = named_constant(&path, &vars).unwrap();
        assert!(matches!(value, Literal::Float(f) if f.is_nan()));
        assert_eq!(natural, "double");

        let mut shadowed = HashMap::new();
        shadowed.insert("Double".to_string(), 0);
        assert!(named_constant(&path, &shadowed).is_none());
    }

    #[test]
    fn test_normalize_import() {
        assert_eq!(normalize_import("import com.acme.Foo;"), "com.acme.Foo");
        assert_eq!(normalize_import("import static com.acme.Util.*;"), "com.acme.Util.*");
        assert_eq!(normalize_import("java.util.List"), "java.util.List");
    }
}
