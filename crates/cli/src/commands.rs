//! Handlers behind each `kiln` subcommand

pub mod extract;
pub mod probe;
pub mod vectors;
