//! Terminal front-end for the DEX daemon's lightning API.
//!
//! The binary wires these modules together; they are exposed as a library
//! so integration tests can drive the shell and activation workflow
//! against a scripted transport.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod node;
pub mod shell;
pub mod telemetry;
pub mod updater;
