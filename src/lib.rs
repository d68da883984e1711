pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod tuner;

pub use config::Configuration;
pub use error::{Result, TunerError};
pub use logging::RunLogger;
