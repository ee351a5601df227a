//! Pool, synthesis, and coverage driving.
//!
//! Building-block sequences are mined once into a [`SequencePool`]; the
//! [`Extender`] then covers each test-plan row by drawing on the pool and a
//! [`Synthesizer`], and hands the result to the executor.

pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod pool;
pub mod synth;

pub use config::{ContainerPolicy, PoolConfig, SynthConfig};
pub use diagnostics::RunDiagnostics;
pub use driver::coverage::{CoverageError, CoverageMap, RowKey};
pub use driver::{augment_pool, Extender, RowFailure, RowOutcome};
pub use pool::primitive::PrimitivePool;
pub use pool::{PooledSequence, SequencePool};
pub use synth::{SynthError, Synthesized, Synthesizer};
