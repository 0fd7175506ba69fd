//! depscope command-line interface
//!
//! The binary in `main.rs` only parses arguments and maps errors to exit
//! codes; everything else lives here so integration tests can drive the
//! command handlers directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
