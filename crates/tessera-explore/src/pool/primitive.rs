//! Observed literal values per primitive family.
//!
//! Primitives and their boxed forms share a family (`int` and
//! `java.lang.Integer` draw from the same set). Sets are ordered, so a
//! seeded pick is reproducible.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tessera_ir::typename::PrimitiveKind;
use tessera_ir::Literal;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitivePool {
    values: BTreeMap<PrimitiveKind, BTreeSet<Literal>>,
}

impl PrimitivePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a literal seen for `type_name`. Nulls and literals that do
    /// not fit the family are ignored. Returns whether the type is pooled.
    pub fn observe(&mut self, type_name: &str, literal: &Literal) -> bool {
        let Some(kind) = PrimitiveKind::of(type_name) else {
            return false;
        };
        if literal.is_null() || !literal.conforms_to(kind) {
            return false;
        }
        self.values
            .entry(kind)
            .or_default()
            .insert(normalize(kind, literal.clone()));
        true
    }

    pub fn values(&self, type_name: &str) -> Option<&BTreeSet<Literal>> {
        PrimitiveKind::of(type_name).and_then(|k| self.values.get(&k))
    }

    pub fn len(&self) -> usize {
        self.values.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A pooled value for `type_name`, chosen with `rng`.
    pub fn pick<R: Rng>(&self, type_name: &str, rng: &mut R) -> Option<Literal> {
        self.values(type_name)?.iter().choose(rng).cloned()
    }

    /// Like [`pick`](Self::pick), skipping values in `used`.
    pub fn pick_unused<R: Rng>(
        &self,
        type_name: &str,
        used: &BTreeSet<Literal>,
        rng: &mut R,
    ) -> Option<Literal> {
        self.values(type_name)?
            .iter()
            .filter(|v| !used.contains(*v))
            .choose(rng)
            .cloned()
    }
}

/// Keep integral values inside the range of their family and store
/// floating values as `Float`.
fn normalize(kind: PrimitiveKind, literal: Literal) -> Literal {
    match (kind, literal) {
        (k, Literal::Int(i)) if k.is_floating() => Literal::Float(i as f64),
        (PrimitiveKind::Byte, Literal::Int(i)) => Literal::Int(i64::from(i as i8)),
        (PrimitiveKind::Short, Literal::Int(i)) => Literal::Int(i64::from(i as i16)),
        (PrimitiveKind::Int, Literal::Int(i)) => Literal::Int(i64::from(i as i32)),
        (_, other) => other,
    }
}

/// A fresh literal of the given family.
pub fn fresh_literal<R: Rng>(kind: PrimitiveKind, rng: &mut R) -> Literal {
    match kind {
        PrimitiveKind::Boolean => Literal::Bool(rng.gen()),
        PrimitiveKind::Byte => Literal::Int(rng.gen_range(-128..=127)),
        PrimitiveKind::Short => Literal::Int(rng.gen_range(-1000..=1000)),
        PrimitiveKind::Char => Literal::Char(rng.gen_range(b'a'..=b'z') as char),
        PrimitiveKind::Int | PrimitiveKind::Long => Literal::Int(rng.gen_range(-100..=100)),
        PrimitiveKind::Float | PrimitiveKind::Double => {
            let hundredths: i32 = rng.gen_range(-10_000..=10_000);
            Literal::Float(f64::from(hundredths) / 100.0)
        }
        PrimitiveKind::String => {
            let len = rng.gen_range(1..=8);
            let text: String = (0..len)
                .map(|_| {
                    let c = rng.gen_range(0..36u8);
                    if c < 10 {
                        (b'0' + c) as char
                    } else {
                        (b'a' + c - 10) as char
                    }
                })
                .collect();
            Literal::Str(text)
        }
    }
}
