//! Command handlers -- one module per subcommand

pub mod cache_key;
pub mod config;
pub mod detect;
pub mod layers;
