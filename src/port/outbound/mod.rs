//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the upstream wallet/balance/price services and
//! wallet persistence.

pub mod store;
pub mod upstream;
