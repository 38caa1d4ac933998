//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod compile;
pub mod expectation;
pub mod run;
pub mod sample;
pub mod version;
