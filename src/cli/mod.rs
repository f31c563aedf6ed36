//! CLI module - argument parsing and subcommand runners

pub mod args;
pub mod bake;
pub mod validate;

pub use args::{BakeArgs, Cli, Commands, ModelKind, ValidateArgs};
pub use bake::run_bake;
pub use validate::run_validate;
