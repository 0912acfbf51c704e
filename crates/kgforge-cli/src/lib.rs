//! kgforge CLI library.
//!
//! Argument parsing, logging setup and the command implementations behind the
//! `kgforge` binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use cli::{Cli, Command};
pub use error::{CliError, Result};
