mod configuration;
mod persistence;

pub use configuration::Configuration;
pub use persistence::{load_config, save_config};
