//! Pool and synthesis configuration.
use serde::{Deserialize, Serialize};

/// What to do when a container asked for at least one element and none
/// could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPolicy {
    /// The empty container satisfies the row.
    AcceptEmpty,
    /// The empty container is used, but the row is only partially covered.
    PartialWhenEmpty,
    /// The row fails as non-instantiable.
    #[default]
    FatalWhenEmpty,
}

/// Configuration for value synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Largest constructor arity tried when building an object directly (default: 3).
    pub max_direct_arity: usize,
    /// How many constructor calls deep direct construction may recurse (default: 2).
    pub max_construction_depth: usize,
    pub container_policy: ContainerPolicy,
    /// Substituted for unresolved type variables (default: `java.lang.Object`).
    pub witness_type: String,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            max_direct_arity: 3,
            max_construction_depth: 2,
            container_policy: ContainerPolicy::default(),
            witness_type: "java.lang.Object".to_string(),
        }
    }
}

/// Configuration for pool indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Index the valid prefix of fragments that only partially parsed.
    pub keep_partial_prefixes: bool,
}
