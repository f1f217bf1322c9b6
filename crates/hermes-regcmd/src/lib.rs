//! Register command service: masked reads and writes over a line-oriented JSON protocol.

pub mod cli;
pub mod command;
mod server;

pub use command::{execute, parse_request, Command, CommandError, Reply};
pub use server::{
    start_server, CommandService, CommandServiceConfig, ServerHandle, DEFAULT_COMMAND_PORT,
};
