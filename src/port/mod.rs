//! Port definitions for the hexagonal boundary.
//!
//! Outbound ports are implemented by adapters under `crate::adapter::outbound`
//! and consumed by the application services.

pub mod outbound;
