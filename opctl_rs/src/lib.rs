//! # opctl
//!
//! Command-dispatch core of a multi-service operator CLI.
//!
//! Turns an argument vector into a routed, validated invocation of one leaf
//! command in a namespace tree, applies the same cross-cutting behavior to
//! every command, and guarantees the process exits promptly however the
//! command ended.
//!
//! ## Features
//!
//! - **Command Registry** - define-then-seal registration with duplicate detection
//! - **Dispatch Pipeline** - cwd override, `.env` merge, session recording,
//!   single-value checks, log level, one-shot lifecycle telemetry
//! - **Error Taxonomy** - closed, ordered classification with per-kind recovery
//! - **Telemetry & Shutdown** - fire-and-forget events drained within one second
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use opctl::cli::commands::builtin_registry;
//! use opctl::cli::{CliParser, CommandDefinition, RegistrationEntry, Runtime};
//! use opctl::env::ProcessEnv;
//! use opctl::errors::UserError;
//! use opctl::output::Output;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let rt = Runtime::new(Output::stdio(), Arc::new(ProcessEnv));
//! let mut registry = builtin_registry(&rt)?;
//! registry.define([RegistrationEntry::new(
//!     "deploy",
//!     CommandDefinition::new("Deploy the project", |opts| async move {
//!         if opts.global.env().is_none() {
//!             return Err(UserError::new("Pick an environment with --env").into());
//!         }
//!         Ok(())
//!     }),
//! )])?;
//! registry.register_all()?;
//!
//! let parser = CliParser::new(registry, "opctl", "0.4.2")?;
//! let outcome = opctl::cli::run(vec!["deploy".into()], &parser, &rt).await;
//! std::process::exit(outcome.exit_code);
//! # }
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// Registry, parser, dispatch pipeline, built-in commands and entry point.
pub mod cli;

/// Failure classification and per-kind recovery.
pub mod taxonomy;

/// Usage telemetry: events, sinks, dispatcher and persisted permission.
pub mod telemetry;

/// Shutdown sequence and the bounded telemetry drain.
pub mod lifecycle;

// ============================================================================
// Supporting Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod env_file;
pub mod errors;
pub mod identity;
pub mod interactive;
pub mod logging;
pub mod output;
pub mod reporter;
pub mod session;

pub use cli::{CliParser, CommandRegistry, RunOutcome, Runtime};
pub use errors::{CommandLineArgsError, RegistrationError, UserError};
