//! The `utils` module provides shared plumbing used across the `chatcast`
//! application: the crate-wide error type and tracing setup.

pub mod error;
pub mod logging;
