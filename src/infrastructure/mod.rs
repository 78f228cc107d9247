//! Infrastructure layer.
//!
//! Configuration loading and the composition root that wires adapters into
//! the application services.

pub mod bootstrap;
pub mod config;
