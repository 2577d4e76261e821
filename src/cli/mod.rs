//! Command line surface

pub mod args;
pub mod error;
pub mod run;

pub use args::Cli;
pub use error::CliError;
pub use run::{run, RunOutcome};
