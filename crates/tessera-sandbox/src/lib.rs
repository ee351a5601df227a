//! Sequence execution: bounded runs against a runtime session, observable
//! state capture, and two runtimes to run against.

pub mod capture;
pub mod config;
pub mod executor;
mod java_util;
pub mod object_model;
pub mod wasm;

pub use config::{ExecutorConfig, WasmConfig};
pub use executor::{
    CapturedState, ExecutionResult, Executor, ExecutorError, StatementOutcome, StatementResult,
};
pub use object_model::{default_value, ClassBuilder, Heap, ObjectModel};
pub use wasm::{WasmError, WasmIntrospector};
