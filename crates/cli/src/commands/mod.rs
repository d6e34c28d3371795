//! CLI command modules

pub mod config;
pub mod inspect;
pub mod serve;

pub use config::execute_config_command;
pub use inspect::{execute_inspect_command, InspectArgs};
pub use serve::{execute_serve_command, ServeArgs};
