//! # CLI Module
//!
//! Command-line entry point for the `switchyard` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Load a YAML config, mount its file routes, API route and pages, and serve them:
//!
//! ```bash
//! switchyard serve --config switchyard.yaml
//! switchyard serve --config switchyard.yaml --addr 127.0.0.1:9090
//! ```
//!
//! ### `check`
//!
//! Run every registration step (template parsing, contract validation, directory
//! checks) without binding a port, then print the mounted routes:
//!
//! ```bash
//! switchyard check --config switchyard.yaml
//! ```
//!
//! Both commands also read the config path from `SWITCHYARD_CONFIG`.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use switchyard::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{build_router, run_cli, Cli, Commands};
