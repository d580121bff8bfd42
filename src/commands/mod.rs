//! Handlers for the subcommands. Each writes its user-facing output to the
//! given writer; `main` passes stdout.

pub mod auth;
pub mod config;
pub mod info;
pub mod version;
