//! Command Line Interface (CLI) layer for MODPRO.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the pipeline stages. It
//! wires user-provided options to the underlying library functionality
//! exposed via `modpro::api`.
//!
//! If you are embedding MODPRO into another application, prefer using
//! the high-level `modpro::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
