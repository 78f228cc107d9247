//! Command-line adapter.

pub mod command;
pub mod generate;
pub mod output;
pub mod refresh;
pub mod run;
pub mod status;
pub mod view;
