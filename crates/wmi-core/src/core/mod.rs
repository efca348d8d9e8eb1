//! Internal implementation modules for `wmi-core`.
//!
//! Callers should use the re-exports at the crate root rather than reaching
//! into these modules directly.

pub mod config;
pub mod engine;
pub mod errors;
pub mod hook;
pub mod inspect;
pub mod outcome;
pub mod process;

#[cfg(test)]
pub(crate) mod test_support;
