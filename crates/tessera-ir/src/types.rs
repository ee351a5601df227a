use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operation::MemberRef;

// ── Parameter specs ──────────────────────────────────────────────────

/// The shape a coverage row requires for one parameter.
///
/// `type_name` is always the full declared type of the value at this
/// position (`int[]`, `java.util.List<com.acme.Foo>`); compound shapes also
/// list the specs of the elements they must contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TypeSpec {
    Scalar {
        type_name: String,
    },
    Array {
        type_name: String,
        #[serde(default)]
        elements: Vec<TypeSpec>,
    },
    Collection {
        type_name: String,
        #[serde(default)]
        elements: Vec<TypeSpec>,
    },
    Map {
        type_name: String,
        #[serde(default)]
        keys: Vec<TypeSpec>,
        #[serde(default)]
        values: Vec<TypeSpec>,
    },
}

impl TypeSpec {
    pub fn scalar(type_name: impl Into<String>) -> Self {
        TypeSpec::Scalar {
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            TypeSpec::Scalar { type_name }
            | TypeSpec::Array { type_name, .. }
            | TypeSpec::Collection { type_name, .. }
            | TypeSpec::Map { type_name, .. } => type_name,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, TypeSpec::Scalar { .. })
    }

    /// Number of element specs directly contained (keys plus values for maps).
    pub fn element_count(&self) -> usize {
        match self {
            TypeSpec::Scalar { .. } => 0,
            TypeSpec::Array { elements, .. } | TypeSpec::Collection { elements, .. } => {
                elements.len()
            }
            TypeSpec::Map { keys, values, .. } => keys.len() + values.len(),
        }
    }

    /// Nesting depth: 0 for a scalar, 1 for a container of scalars, ...
    pub fn depth(&self) -> usize {
        let children: Box<dyn Iterator<Item = &TypeSpec>> = match self {
            TypeSpec::Scalar { .. } => return 0,
            TypeSpec::Array { elements, .. } | TypeSpec::Collection { elements, .. } => {
                Box::new(elements.iter())
            }
            TypeSpec::Map { keys, values, .. } => Box::new(keys.iter().chain(values)),
        };
        1 + children.map(TypeSpec::depth).max().unwrap_or(0)
    }

    /// Drop element specs nested deeper than `max_depth` containers.
    /// A container at the limit keeps its type but loses its elements.
    pub fn truncated(&self, max_depth: usize) -> TypeSpec {
        let trim = |specs: &[TypeSpec]| -> Vec<TypeSpec> {
            if max_depth == 0 {
                Vec::new()
            } else {
                specs.iter().map(|s| s.truncated(max_depth - 1)).collect()
            }
        };
        match self {
            TypeSpec::Scalar { .. } => self.clone(),
            TypeSpec::Array {
                type_name,
                elements,
            } => TypeSpec::Array {
                type_name: type_name.clone(),
                elements: trim(elements),
            },
            TypeSpec::Collection {
                type_name,
                elements,
            } => TypeSpec::Collection {
                type_name: type_name.clone(),
                elements: trim(elements),
            },
            TypeSpec::Map {
                type_name,
                keys,
                values,
            } => TypeSpec::Map {
                type_name: type_name.clone(),
                keys: trim(keys),
                values: trim(values),
            },
        }
    }

    /// Every type name mentioned by this spec, itself included.
    pub fn mentioned_types(&self, out: &mut BTreeSet<String>) {
        out.insert(self.type_name().to_string());
        match self {
            TypeSpec::Scalar { .. } => {}
            TypeSpec::Array { elements, .. } | TypeSpec::Collection { elements, .. } => {
                elements.iter().for_each(|e| e.mentioned_types(out));
            }
            TypeSpec::Map { keys, values, .. } => {
                keys.iter().chain(values).for_each(|e| e.mentioned_types(out));
            }
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(specs: &[TypeSpec]) -> String {
            specs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            TypeSpec::Scalar { type_name } => write!(f, "{type_name}"),
            TypeSpec::Array {
                type_name,
                elements,
            }
            | TypeSpec::Collection {
                type_name,
                elements,
            } => write!(f, "{type_name}[{}]", list(elements)),
            TypeSpec::Map {
                type_name,
                keys,
                values,
            } => write!(f, "{type_name}{{{} => {}}}", list(keys), list(values)),
        }
    }
}

/// One combinatorial combination of parameter specs, in declared order
/// (receiver excluded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageRow(pub Vec<TypeSpec>);

impl CoverageRow {
    pub fn params(&self) -> &[TypeSpec] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_container(&self) -> bool {
        self.0.iter().any(TypeSpec::is_container)
    }

    /// Type names required anywhere in the row.
    pub fn required_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for spec in &self.0 {
            spec.mentioned_types(&mut out);
        }
        out
    }

    pub fn truncated(&self, max_depth: usize) -> CoverageRow {
        CoverageRow(self.0.iter().map(|s| s.truncated(max_depth)).collect())
    }
}

impl fmt::Display for CoverageRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

// ── Test plan ────────────────────────────────────────────────────────

/// Rows requested for one target operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodPlan {
    /// Human-readable signature, carried through to reports.
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub rows: Vec<CoverageRow>,
}

/// partition → class → operation signature → rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestPlan {
    pub partitions: BTreeMap<String, BTreeMap<String, BTreeMap<String, MethodPlan>>>,
}

/// A borrowed view of one (partition, class, operation) entry.
#[derive(Debug, Clone, Copy)]
pub struct PlanEntry<'a> {
    pub partition: &'a str,
    pub class: &'a str,
    pub signature: &'a str,
    pub plan: &'a MethodPlan,
}

impl TestPlan {
    /// Entries in deterministic (partition, class, signature) order.
    pub fn entries(&self) -> impl Iterator<Item = PlanEntry<'_>> {
        self.partitions.iter().flat_map(|(partition, classes)| {
            classes.iter().flat_map(move |(class, methods)| {
                methods.iter().map(move |(signature, plan)| PlanEntry {
                    partition,
                    class,
                    signature,
                    plan,
                })
            })
        })
    }

    /// Plan signatures in the canonical form used by the operation index.
    /// Keys that do not parse are kept verbatim.
    pub fn targeted_signatures(&self) -> BTreeSet<String> {
        self.entries()
            .map(|e| {
                MemberRef::parse(e.signature)
                    .map(|m| m.signature())
                    .unwrap_or_else(|_| e.signature.to_string())
            })
            .collect()
    }

    /// Every type name any row mentions.
    pub fn referenced_types(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for entry in self.entries() {
            for row in &entry.plan.rows {
                out.extend(row.required_types());
            }
        }
        out
    }

    pub fn row_count(&self) -> usize {
        self.entries().map(|e| e.plan.rows.len()).sum()
    }
}

// ── Building blocks ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassBlocks {
    /// Literal code fragments.
    #[serde(default)]
    pub sequences: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    /// Named setup/teardown segments available for the class.
    #[serde(default)]
    pub segments: Vec<String>,
}

/// class → building blocks for that class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingBlocks {
    pub classes: BTreeMap<String, ClassBlocks>,
}

impl BuildingBlocks {
    pub fn get(&self, class: &str) -> Option<&ClassBlocks> {
        self.classes.get(class)
    }

    pub fn sequence_count(&self) -> usize {
        self.classes.values().map(|c| c.sequences.len()).sum()
    }
}

// ── Coverage status ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    Uncovered,
    Covered,
    Partial,
    UncoveredNoInitSeq,
    UncoveredNonInstantiable,
    UncoveredExecFail,
    UncoveredException,
    CoveredViaExternalExecution,
    PartialViaExternalExecution,
}

impl CoverageStatus {
    pub const ALL: [CoverageStatus; 9] = [
        CoverageStatus::Uncovered,
        CoverageStatus::Covered,
        CoverageStatus::Partial,
        CoverageStatus::UncoveredNoInitSeq,
        CoverageStatus::UncoveredNonInstantiable,
        CoverageStatus::UncoveredExecFail,
        CoverageStatus::UncoveredException,
        CoverageStatus::CoveredViaExternalExecution,
        CoverageStatus::PartialViaExternalExecution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageStatus::Uncovered => "UNCOVERED",
            CoverageStatus::Covered => "COVERED",
            CoverageStatus::Partial => "PARTIAL",
            CoverageStatus::UncoveredNoInitSeq => "UNCOVERED_NO_INIT_SEQ",
            CoverageStatus::UncoveredNonInstantiable => "UNCOVERED_NON_INSTANTIABLE",
            CoverageStatus::UncoveredExecFail => "UNCOVERED_EXEC_FAIL",
            CoverageStatus::UncoveredException => "UNCOVERED_EXCEPTION",
            CoverageStatus::CoveredViaExternalExecution => "COVERED_VIA_EXTERNAL_EXECUTION",
            CoverageStatus::PartialViaExternalExecution => "PARTIAL_VIA_EXTERNAL_EXECUTION",
        }
    }

    /// Fully covered, in-process or externally.
    pub fn is_covered(self) -> bool {
        matches!(
            self,
            CoverageStatus::Covered | CoverageStatus::CoveredViaExternalExecution
        )
    }

    pub fn is_partial(self) -> bool {
        matches!(
            self,
            CoverageStatus::Partial | CoverageStatus::PartialViaExternalExecution
        )
    }

    /// Counts toward coverage at all.
    pub fn is_success(self) -> bool {
        self.is_covered() || self.is_partial()
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
