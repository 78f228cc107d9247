//! HTTP adapter for the wallet creation, balance and price services.

mod client;
mod dto;

pub use client::{classify_status, HttpNetworkClient, Operation};
