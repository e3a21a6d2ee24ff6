//! Ranked resolution of configuration and secret values

mod config_resolver;

pub use config_resolver::ConfigResolver;
