//! Command handlers -- one module per subcommand

pub mod config;
pub mod export;
pub mod run;
pub mod sources;
pub mod watch;
