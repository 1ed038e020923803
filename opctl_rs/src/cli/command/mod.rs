//! Command definitions and the option schema.
//!
//! - `definition`: Command/Namespace/Alias definitions and the handler type
//! - `options`: declarative option specs
//! - `global`: GlobalOptions shared by every command
//! - `resolved`: ResolvedOptions handed to handlers

mod definition;
mod global;
mod options;
mod resolved;

pub use definition::{
    AliasDefinition, CommandDefinition, Definition, Handler, HandlerFuture, Metadata,
    NamespaceDefinition,
};
pub use global::GlobalOptions;
pub use options::{OptionSpec, OptionType};
pub use resolved::ResolvedOptions;
