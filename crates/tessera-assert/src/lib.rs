//! Regression assertions derived from captured execution state.

pub mod config;
pub mod expect;
pub mod synthesizer;

pub use config::AssertConfig;
pub use synthesizer::{Annotated, AssertError, DiffAssertionSynthesizer};
