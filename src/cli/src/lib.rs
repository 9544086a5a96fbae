pub mod commands;
pub mod interception;
pub mod process_command;
