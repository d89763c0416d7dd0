//! Subcommand handlers.

pub mod config_cmd;
pub mod list;
pub mod sync;
pub mod util;
