//! Type-directed value synthesis.
//!
//! [`Synthesizer::synthesize`] appends statements producing a value of the
//! requested [`TypeSpec`] to the caller's sequence. Scalars come from the
//! literal pool, enum constants, pooled constructor slices, direct
//! construction, or a pooled subtype, in that order. Containers synthesize
//! their elements and degrade to partial coverage when some are missing.

pub mod containers;
pub mod rng;

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tessera_ir::introspect::{TypeHierarchy, TypeIntrospector};
use tessera_ir::typename::{
    array_dimensions, array_element, bind_type_parameters, erasure, mentions_type_variable,
    substitute_type_variables, type_arguments, with_arguments_of, PrimitiveKind,
};
use tessera_ir::{Literal, Operation, Sequence, SequenceError, TypeSpec, VarIndex};

use crate::config::{ContainerPolicy, SynthConfig};
use crate::pool::primitive::{fresh_literal, PrimitivePool};
use crate::pool::SequencePool;
use containers::{collection_impl, known_impl, map_impl};

/// Redraws of a fresh literal that collides with a sibling element.
const FRESH_ATTEMPTS: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SynthError {
    #[error("No construction path for type '{type_name}'")]
    NonInstantiable { type_name: String },

    #[error("No element of array type '{type_name}' could be synthesized")]
    NoArrayElements { type_name: String },

    #[error("Unsupported shape '{spec}': {reason}")]
    UnsupportedShape { spec: String, reason: String },

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl SynthError {
    pub fn kind(&self) -> &'static str {
        match self {
            SynthError::NonInstantiable { .. } => "non_instantiable",
            SynthError::NoArrayElements { .. } => "no_array_elements",
            SynthError::UnsupportedShape { .. } => "unsupported_shape",
            SynthError::Sequence(_) => "sequence",
        }
    }
}

/// A synthesized value: the variable holding it and whether every
/// requested element was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synthesized {
    pub var: VarIndex,
    pub complete: bool,
}

impl Synthesized {
    fn complete(var: VarIndex) -> Self {
        Self {
            var,
            complete: true,
        }
    }
}

pub struct Synthesizer<'a> {
    pool: &'a SequencePool,
    introspector: &'a dyn TypeIntrospector,
    hierarchy: &'a dyn TypeHierarchy,
    config: &'a SynthConfig,
    rng: ChaCha8Rng,
    /// Literals manufactured during this synthesis.
    generated: PrimitivePool,
    /// Types the current row requires in their own right; never used as
    /// subtype substitutes.
    reserved: BTreeSet<String>,
    non_instantiable: BTreeSet<String>,
    missing_elements: usize,
    /// Literals used by each open container, innermost last.
    element_scopes: Vec<BTreeSet<Literal>>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        pool: &'a SequencePool,
        introspector: &'a dyn TypeIntrospector,
        hierarchy: &'a dyn TypeHierarchy,
        config: &'a SynthConfig,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            pool,
            introspector,
            hierarchy,
            config,
            rng,
            generated: PrimitivePool::new(),
            reserved: BTreeSet::new(),
            non_instantiable: BTreeSet::new(),
            missing_elements: 0,
            element_scopes: Vec::new(),
        }
    }

    pub fn with_reserved(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.reserved = types.into_iter().map(|t| erasure(&t)).collect();
        self
    }

    /// Types found non-instantiable so far, including container elements
    /// that only degraded a row to partial.
    pub fn non_instantiable(&self) -> &BTreeSet<String> {
        &self.non_instantiable
    }

    /// Container elements that could not be produced.
    pub fn missing_elements(&self) -> usize {
        self.missing_elements
    }

    /// Append statements producing a value for `spec` to `target`. On error
    /// `target` is left as it was.
    pub fn synthesize(
        &mut self,
        spec: &TypeSpec,
        target: &mut Sequence,
    ) -> Result<Synthesized, SynthError> {
        let mark = target.len();
        let result = match spec {
            TypeSpec::Scalar { type_name } => self.scalar(type_name, target, 0),
            TypeSpec::Array {
                type_name,
                elements,
            } => self.array(type_name, elements, target),
            TypeSpec::Collection {
                type_name,
                elements,
            } => self.collection(type_name, elements, target),
            TypeSpec::Map {
                type_name,
                keys,
                values,
            } => self.map(type_name, keys, values, target),
        };
        if result.is_err() && target.len() > mark {
            *target = target.prefix(mark);
        }
        result
    }

    fn resolve(&self, type_name: &str) -> String {
        if mentions_type_variable(type_name) {
            substitute_type_variables(type_name, &self.config.witness_type)
        } else {
            type_name.trim().to_string()
        }
    }

    // ── Scalars ──────────────────────────────────────────────────────

    fn scalar(
        &mut self,
        type_name: &str,
        target: &mut Sequence,
        depth: usize,
    ) -> Result<Synthesized, SynthError> {
        let t = self.resolve(type_name);

        if let Some(kind) = PrimitiveKind::of(&t) {
            let value = self.literal(&t, kind);
            let var = target.push(Operation::Literal { type_name: t, value }, vec![])?;
            return Ok(Synthesized::complete(var));
        }
        if array_element(&t).is_some() {
            return self.array(&t, &[], target);
        }

        let constants = self.introspector.enum_constants(&t);
        if let Some(constant) = constants.choose(&mut self.rng) {
            let var = target.push(
                Operation::FieldGet {
                    declaring: t.clone(),
                    field: constant.clone(),
                    field_type: t.clone(),
                    is_static: true,
                },
                vec![],
            )?;
            return Ok(Synthesized::complete(var));
        }

        self.reference(&t, target, depth)
    }

    fn literal(&mut self, type_name: &str, kind: PrimitiveKind) -> Literal {
        let Some(mut used) = self.element_scopes.pop() else {
            return self.any_literal(type_name, kind);
        };
        let value = self.unused_literal(type_name, kind, &used);
        used.insert(value.clone());
        self.element_scopes.push(used);
        value
    }

    fn any_literal(&mut self, type_name: &str, kind: PrimitiveKind) -> Literal {
        if let Some(v) = self.pool.primitives().pick(type_name, &mut self.rng) {
            return v;
        }
        if let Some(v) = self.generated.pick(type_name, &mut self.rng) {
            return v;
        }
        let fresh = fresh_literal(kind, &mut self.rng);
        self.generated.observe(type_name, &fresh);
        fresh
    }

    /// A literal the enclosing container has not used yet. Small families
    /// (`boolean`) may still repeat once exhausted.
    fn unused_literal(
        &mut self,
        type_name: &str,
        kind: PrimitiveKind,
        used: &BTreeSet<Literal>,
    ) -> Literal {
        if let Some(v) = self.pool.primitives().pick_unused(type_name, used, &mut self.rng) {
            return v;
        }
        if let Some(v) = self.generated.pick_unused(type_name, used, &mut self.rng) {
            return v;
        }
        let mut fresh = fresh_literal(kind, &mut self.rng);
        for _ in 0..FRESH_ATTEMPTS {
            if !used.contains(&fresh) {
                break;
            }
            fresh = fresh_literal(kind, &mut self.rng);
        }
        self.generated.observe(type_name, &fresh);
        fresh
    }

    fn reference(
        &mut self,
        t: &str,
        target: &mut Sequence,
        depth: usize,
    ) -> Result<Synthesized, SynthError> {
        if let Some(pooled) = self.pool.constructors_of(t).first() {
            return Ok(Synthesized::complete(splice(target, &pooled.sequence)));
        }
        if let Some(built) = self.construct_directly(t, depth) {
            return Ok(Synthesized::complete(splice(target, &built)));
        }

        let own = erasure(t);
        for sub in self.hierarchy.concrete_types_of(t) {
            let sub = erasure(&sub);
            if sub == own || self.reserved.contains(&sub) {
                continue;
            }
            if let Some(pooled) = self.pool.constructors_of(&sub).first() {
                tracing::debug!(requested = %t, substitute = %sub, "using subtype constructor");
                return Ok(Synthesized::complete(splice(target, &pooled.sequence)));
            }
        }

        self.non_instantiable.insert(own.clone());
        Err(SynthError::NonInstantiable { type_name: own })
    }

    /// Build `t` through a low-arity public constructor whose parameters can
    /// themselves be synthesized. Returns a standalone sequence whose last
    /// statement is the constructed object.
    fn construct_directly(&mut self, t: &str, depth: usize) -> Option<Sequence> {
        if depth > self.config.max_construction_depth {
            return None;
        }
        let candidate = match known_impl(t) {
            Some(concrete) => with_arguments_of(concrete, t),
            None => t.to_string(),
        };
        let bindings = self
            .introspector
            .type_info(&erasure(&candidate))
            .map(|info| info.bindings_for(&candidate))
            .unwrap_or_default();
        let own = erasure(&candidate);
        let witness = self.config.witness_type.clone();

        'ctors: for ctor in self.introspector.list_public_constructors(&candidate) {
            let ctor = ctor.map_types(|ty| {
                substitute_type_variables(&bind_type_parameters(ty, &bindings), &witness)
            });
            let params = ctor.param_types();
            if params.len() > self.config.max_direct_arity
                || params.iter().any(|p| erasure(p) == own)
            {
                continue;
            }
            let mut scratch = Sequence::new();
            let mut inputs = Vec::with_capacity(params.len());
            for p in &params {
                match self.scalar(p, &mut scratch, depth + 1) {
                    Ok(s) => inputs.push(s.var),
                    Err(_) => continue 'ctors,
                }
            }
            if scratch.push(ctor, inputs).is_ok() {
                return Some(scratch);
            }
        }
        None
    }

    // ── Containers ───────────────────────────────────────────────────

    fn array(
        &mut self,
        type_name: &str,
        elements: &[TypeSpec],
        target: &mut Sequence,
    ) -> Result<Synthesized, SynthError> {
        let t = self.resolve(type_name);
        if array_dimensions(&t) > 1 {
            return Err(SynthError::UnsupportedShape {
                spec: t,
                reason: "multi-dimensional arrays are not supported".into(),
            });
        }
        let element = array_element(&t).ok_or_else(|| SynthError::UnsupportedShape {
            spec: t.clone(),
            reason: "array spec without an array type".into(),
        })?;

        let mut vars = Vec::with_capacity(elements.len());
        let mut complete = true;
        self.element_scopes.push(BTreeSet::new());
        for spec in elements {
            match self.synthesize(spec, target) {
                Ok(s) => {
                    complete &= s.complete;
                    vars.push(s.var);
                }
                Err(e) => {
                    self.note_missing(&e);
                    complete = false;
                }
            }
        }
        self.element_scopes.pop();
        if !elements.is_empty() && vars.is_empty() {
            return Err(SynthError::NoArrayElements { type_name: t });
        }
        let var = target.push(
            Operation::ArrayCreate {
                element,
                length: vars.len(),
            },
            vars,
        )?;
        Ok(Synthesized { var, complete })
    }

    fn collection(
        &mut self,
        type_name: &str,
        elements: &[TypeSpec],
        target: &mut Sequence,
    ) -> Result<Synthesized, SynthError> {
        let t = self.resolve(type_name);
        let concrete = with_arguments_of(&collection_impl(&t, self.introspector), &t);
        let element_type = type_arguments(&concrete)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.config.witness_type.clone());

        let (parts, mut complete, first_error) = self.standalone_parts(elements);
        if !elements.is_empty() && parts.is_empty() {
            complete = self.accept_empty(first_error)?;
        }

        let coll = target.push(
            Operation::Constructor {
                declaring: concrete.clone(),
                params: Vec::new(),
            },
            vec![],
        )?;
        for (scratch, var) in &parts {
            let offset = target.append(scratch);
            target.push(
                Operation::Method {
                    declaring: concrete.clone(),
                    name: "add".into(),
                    params: vec![element_type.clone()],
                    returns: "boolean".into(),
                    is_static: false,
                },
                vec![coll, offset + var],
            )?;
        }
        Ok(Synthesized {
            var: coll,
            complete,
        })
    }

    fn map(
        &mut self,
        type_name: &str,
        keys: &[TypeSpec],
        values: &[TypeSpec],
        target: &mut Sequence,
    ) -> Result<Synthesized, SynthError> {
        let t = self.resolve(type_name);
        let concrete = with_arguments_of(&map_impl(&t, self.introspector), &t);
        let mut args = type_arguments(&concrete).into_iter();
        let witness = &self.config.witness_type;
        let key_type = args.next().unwrap_or_else(|| witness.clone());
        let value_type = args.next().unwrap_or_else(|| witness.clone());

        let (key_parts, keys_complete, key_error) = self.standalone_parts(keys);
        let (value_parts, values_complete, value_error) = self.standalone_parts(values);
        let pairs = if key_parts.is_empty() || value_parts.is_empty() {
            0
        } else {
            key_parts.len().max(value_parts.len())
        };
        let mut complete = keys_complete && values_complete;
        if pairs == 0 && !(keys.is_empty() && values.is_empty()) {
            complete = self.accept_empty(key_error.or(value_error))?;
        }

        let map = target.push(
            Operation::Constructor {
                declaring: concrete.clone(),
                params: Vec::new(),
            },
            vec![],
        )?;
        // Each part is spliced once, when its first pair needs it; the
        // shorter stream cycles over already spliced variables.
        let mut key_vars: Vec<Option<VarIndex>> = vec![None; key_parts.len()];
        let mut value_vars: Vec<Option<VarIndex>> = vec![None; value_parts.len()];
        for i in 0..pairs {
            let k = i % key_parts.len();
            let v = i % value_parts.len();
            let key = *key_vars[k].get_or_insert_with(|| {
                let (scratch, var) = &key_parts[k];
                target.append(scratch) + var
            });
            let value = *value_vars[v].get_or_insert_with(|| {
                let (scratch, var) = &value_parts[v];
                target.append(scratch) + var
            });
            target.push(
                Operation::Method {
                    declaring: concrete.clone(),
                    name: "put".into(),
                    params: vec![key_type.clone(), value_type.clone()],
                    returns: value_type.clone(),
                    is_static: false,
                },
                vec![map, key, value],
            )?;
        }
        Ok(Synthesized { var: map, complete })
    }

    /// Synthesize each spec into its own short sequence. Returns the parts
    /// that succeeded, whether all of them did, and the first failure.
    fn standalone_parts(
        &mut self,
        specs: &[TypeSpec],
    ) -> (Vec<(Sequence, VarIndex)>, bool, Option<SynthError>) {
        let mut parts = Vec::with_capacity(specs.len());
        let mut complete = true;
        let mut first_error = None;
        self.element_scopes.push(BTreeSet::new());
        for spec in specs {
            let mut scratch = Sequence::new();
            match self.synthesize(spec, &mut scratch) {
                Ok(s) => {
                    complete &= s.complete;
                    parts.push((scratch, s.var));
                }
                Err(e) => {
                    self.note_missing(&e);
                    complete = false;
                    first_error.get_or_insert(e);
                }
            }
        }
        self.element_scopes.pop();
        (parts, complete, first_error)
    }

    /// Apply the container policy to a container that ended up empty.
    /// Returns whether the row still counts as complete.
    fn accept_empty(&self, cause: Option<SynthError>) -> Result<bool, SynthError> {
        match self.config.container_policy {
            ContainerPolicy::AcceptEmpty => Ok(true),
            ContainerPolicy::PartialWhenEmpty => Ok(false),
            ContainerPolicy::FatalWhenEmpty => Err(cause.unwrap_or(SynthError::UnsupportedShape {
                spec: String::new(),
                reason: "container produced no elements".into(),
            })),
        }
    }

    fn note_missing(&mut self, err: &SynthError) {
        self.missing_elements += 1;
        tracing::debug!(error = %err, "container element not synthesized");
    }
}

/// Append `part` to `target`; the value is the part's last statement.
fn splice(target: &mut Sequence, part: &Sequence) -> VarIndex {
    let offset = target.append(part);
    offset + part.len().saturating_sub(1)
}
