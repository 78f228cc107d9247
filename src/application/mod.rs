//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate the outbound
//! ports to implement provisioning, refresh and the dashboard.

pub mod dashboard;
pub mod generation;
pub mod price_cache;
pub mod refresh;
pub mod service;
pub mod store;
