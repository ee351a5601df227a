//! Executor and WebAssembly runtime configuration.
use serde::{Deserialize, Serialize};

/// Configuration for in-process sequence execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock budget for one execution of a sequence (default: 5000 ms).
    pub timeout_ms: u64,
    /// Number of runs whose captured state is intersected (default: 1).
    pub repeat_count: usize,
    /// Whether to capture observable object state at all.
    pub capture_state: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            repeat_count: 1,
            capture_state: true,
        }
    }
}

/// Resource limits for the WebAssembly-backed introspector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmConfig {
    /// Maximum linear memory in bytes (default: 256 MB).
    pub memory_limit_bytes: u64,
    /// Fuel budget per call. None = unlimited.
    pub fuel_per_call: Option<u64>,
    /// Name of the class the module's exports are presented as.
    pub class_name: String,
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 256 * 1024 * 1024,
            fuel_per_call: Some(1_000_000),
            class_name: "wasm.Module".to_string(),
        }
    }
}
