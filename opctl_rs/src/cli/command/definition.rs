//! Command, namespace and alias definitions accepted by the registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::options::OptionSpec;
use super::resolved::ResolvedOptions;

/// Future returned by a leaf handler.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A leaf handler: receives the validated, merged options and may fail with any error.
pub type Handler = Arc<dyn Fn(ResolvedOptions) -> HandlerFuture + Send + Sync>;

/// Presentation flags shared by namespaces and commands.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub description: String,
    pub hidden: bool,
    pub deprecated: bool,
    pub deprecation_message: Option<String>,
}

/// A leaf command: handler plus option schema.
#[derive(Clone)]
pub struct CommandDefinition {
    pub metadata: Metadata,
    pub args: Vec<OptionSpec>,
    pub handler: Handler,
}

impl CommandDefinition {
    pub fn new<F, Fut>(description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ResolvedOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            metadata: Metadata {
                description: description.into(),
                ..Metadata::default()
            },
            args: Vec::new(),
            handler: Arc::new(move |opts| Box::pin(handler(opts))),
        }
    }

    pub fn arg(mut self, spec: OptionSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.metadata.hidden = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.metadata.deprecated = true;
        self.metadata.deprecation_message = Some(message.into());
        self
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("metadata", &self.metadata)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A grouping node. Invoked without a subcommand it prints its own help.
#[derive(Debug, Clone, Default)]
pub struct NamespaceDefinition {
    pub metadata: Metadata,
}

impl NamespaceDefinition {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            metadata: Metadata {
                description: description.into(),
                ..Metadata::default()
            },
        }
    }

    pub fn hidden(mut self) -> Self {
        self.metadata.hidden = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.metadata.deprecated = true;
        self.metadata.deprecation_message = Some(message.into());
        self
    }
}

/// Another name for an existing sibling node, e.g. `metrics` for `telemetry`.
#[derive(Debug, Clone)]
pub struct AliasDefinition {
    pub alias_of: String,
}

impl AliasDefinition {
    pub fn new(alias_of: impl Into<String>) -> Self {
        Self {
            alias_of: alias_of.into(),
        }
    }
}

/// Anything the registry can bind at a path.
#[derive(Debug, Clone)]
pub enum Definition {
    Command(CommandDefinition),
    Namespace(NamespaceDefinition),
    Alias(AliasDefinition),
}

impl From<CommandDefinition> for Definition {
    fn from(def: CommandDefinition) -> Self {
        Definition::Command(def)
    }
}

impl From<NamespaceDefinition> for Definition {
    fn from(def: NamespaceDefinition) -> Self {
        Definition::Namespace(def)
    }
}

impl From<AliasDefinition> for Definition {
    fn from(def: AliasDefinition) -> Self {
        Definition::Alias(def)
    }
}
