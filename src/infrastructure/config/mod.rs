//! Infrastructure configuration modules.

pub mod generation;
pub mod logging;
pub mod refresh;
pub mod settings;
pub mod upstream;

pub use settings::Config;
