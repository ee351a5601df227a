//! Run configuration.
//!
//! Every section defaults independently, so a partial JSON document such as
//! `{"seed": 7, "synth": {"container_policy": "accept_empty"}}` is valid.

use serde::{Deserialize, Serialize};
use tessera_assert::AssertConfig;
use tessera_explore::{PoolConfig, SynthConfig};
use tessera_sandbox::ExecutorConfig;

/// Configuration for one whole-plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base seed; each row derives its own stream from it (default: 42).
    pub seed: u64,
    /// Container nesting kept in row specs before synthesis (default: 3).
    pub max_nesting_depth: usize,
    pub synth: SynthConfig,
    pub executor: ExecutorConfig,
    pub pool: PoolConfig,
    /// Produce assertion-annotated code for executed sequences (default: false).
    pub annotate: bool,
    #[serde(rename = "assertions")]
    pub assert: AssertConfig,
    /// Secondary out-of-process runner. None = in-process only.
    pub external: Option<ExternalRunnerConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_nesting_depth: 3,
            synth: SynthConfig::default(),
            executor: ExecutorConfig::default(),
            pool: PoolConfig::default(),
            annotate: false,
            assert: AssertConfig::default(),
            external: None,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// How to launch the secondary runner. The generated code is written to the
/// command's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalRunnerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Budget for one invocation (default: 60000 ms).
    pub timeout_ms: u64,
}

impl Default for ExternalRunnerConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            timeout_ms: 60_000,
        }
    }
}
