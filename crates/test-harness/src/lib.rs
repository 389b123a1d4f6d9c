//! Test harness for scripting modeling sessions.
//!
//! Drives the real message dispatch path and checks the engine's invariants
//! along the way.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: Fluent API addressing features and sketch elements by name
//! - [`assertions`]: Invariant checks returning diagnostics instead of panicking
//! - [`helpers`]: Error type, tracing setup, sketch shape builders

pub mod assertions;
pub mod helpers;
pub mod workflow;

pub use helpers::{init_tracing, HarnessError};
pub use workflow::ModelBuilder;
