//! CLI core: registry, parser, dispatch pipeline and the top-level boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      User Input (argv)                       │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ CliParser (built from the sealed CommandRegistry)            │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Pipeline: cwd → env merge → session → single-value guard →   │
//! │           log level → lifecycle hook ("started")             │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Leaf handler / namespace help / root help                    │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 ▼ ok                             ▼ err
//!         "completed" event            classify → recover → "errored"
//!                 └───────────────┬───────────────┘
//!                                 ▼
//!          shutdown: close signal, close reporter, drain (1s)
//! ```
//!
//! # Module Structure
//!
//! - [`command`] - definitions, option schema, global and resolved options
//! - [`registry`] - define-then-seal command registry and the namespace tree
//! - [`parser`] - clap parser over the sealed tree
//! - [`dispatch`] - runtime, invocation context and middleware
//! - [`commands`] - built-in commands
//! - [`entrypoint`] - the top-level boundary

pub mod command;
pub mod commands;
pub mod dispatch;
pub mod entrypoint;
pub mod parser;
pub mod registry;

pub use command::{
    CommandDefinition, GlobalOptions, NamespaceDefinition, OptionSpec, ResolvedOptions,
};
pub use dispatch::{Pipeline, RunState, Runtime};
pub use entrypoint::{RunOutcome, main, run};
pub use parser::{CliParser, ParseOutcome};
pub use registry::{CommandPath, CommandRegistry, RegistrationEntry};
