//! Command registry: define first, bind later.
//!
//! `define` buffers `(path, definition)` pairs; `register_namespace` and
//! `register_all` move them, in declaration order, from the pending buffer
//! into the bound [`NamespaceTree`]. Moving an entry is the only mutation.
//! Once `register_all` has run the registry is sealed and can be turned into
//! a [`CliParser`](crate::cli::parser::CliParser).
//!
//! ```rust
//! use opctl::cli::registry::{CommandRegistry, RegistrationEntry};
//! use opctl::cli::command::{CommandDefinition, NamespaceDefinition};
//!
//! let mut registry = CommandRegistry::new("Operator CLI");
//! registry
//!     .define([
//!         RegistrationEntry::new("kv", NamespaceDefinition::new("Manage KV")),
//!         RegistrationEntry::new(
//!             "kv list",
//!             CommandDefinition::new("List namespaces", |_| async { Ok(()) }),
//!         ),
//!     ])
//!     .unwrap();
//! registry.register_namespace("kv").unwrap();
//! registry.register_all().unwrap();
//! assert!(registry.is_sealed());
//! ```

mod path;
mod tree;

use std::collections::HashSet;

pub use path::CommandPath;
pub use tree::{NamespaceTree, Node, NodeKind};

use crate::cli::command::Definition;
use crate::errors::RegistrationError;

/// A pending `(path, definition)` pair awaiting binding.
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    pub path: CommandPath,
    pub definition: Definition,
}

impl RegistrationEntry {
    pub fn new(path: &str, definition: impl Into<Definition>) -> Self {
        Self {
            path: CommandPath::parse(path),
            definition: definition.into(),
        }
    }
}

#[derive(Debug)]
pub struct CommandRegistry {
    tree: NamespaceTree,
    defined: HashSet<String>,
    pending: Vec<RegistrationEntry>,
    bound: Vec<CommandPath>,
    registered_namespaces: HashSet<String>,
    sealed: bool,
}

impl CommandRegistry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            tree: NamespaceTree::new(description),
            defined: HashSet::new(),
            pending: Vec::new(),
            bound: Vec::new(),
            registered_namespaces: HashSet::new(),
            sealed: false,
        }
    }

    /// Buffer definitions. Fails on any path already defined in this registry;
    /// a failing batch leaves the registry untouched.
    pub fn define(
        &mut self,
        entries: impl IntoIterator<Item = RegistrationEntry>,
    ) -> Result<(), RegistrationError> {
        let entries: Vec<RegistrationEntry> = entries.into_iter().collect();
        let mut batch = HashSet::new();
        for entry in &entries {
            let key = entry.path.key();
            if self.sealed {
                return Err(RegistrationError::DefineAfterSeal(key));
            }
            if entry.path.is_root() {
                return Err(RegistrationError::EmptyPath);
            }
            if self.defined.contains(&key) || !batch.insert(key.clone()) {
                return Err(RegistrationError::Duplicate(key));
            }
        }
        self.defined.extend(batch);
        self.pending.extend(entries);
        Ok(())
    }

    /// Bind every pending entry whose first token is `root`, in declaration order.
    pub fn register_namespace(&mut self, root: &str) -> Result<(), RegistrationError> {
        if self.sealed {
            return Err(RegistrationError::AlreadySealed);
        }
        if self.registered_namespaces.contains(root) {
            return Err(RegistrationError::AlreadyRegistered(root.to_string()));
        }

        let (selected, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|entry| entry.path.first() == Some(root));
        self.pending = rest;

        if selected.is_empty() {
            return Err(RegistrationError::UnknownNamespace(root.to_string()));
        }
        self.registered_namespaces.insert(root.to_string());
        selected.into_iter().try_for_each(|entry| self.bind(entry))
    }

    /// Bind everything still pending and seal the registry. Must be called exactly once.
    pub fn register_all(&mut self) -> Result<(), RegistrationError> {
        if self.sealed {
            return Err(RegistrationError::AlreadySealed);
        }
        let pending = std::mem::take(&mut self.pending);
        pending.into_iter().try_for_each(|entry| self.bind(entry))?;
        self.sealed = true;
        Ok(())
    }

    fn bind(&mut self, entry: RegistrationEntry) -> Result<(), RegistrationError> {
        let RegistrationEntry { path, definition } = entry;
        match definition {
            Definition::Command(def) => self.tree.insert(path.clone(), NodeKind::Command(def))?,
            Definition::Namespace(def) => {
                self.tree.insert(path.clone(), NodeKind::Namespace(def))?
            }
            Definition::Alias(def) => {
                self.tree.add_alias(&path, &CommandPath::parse(&def.alias_of))?
            }
        }
        tracing::trace!(path = %path, "bound command");
        self.bound.push(path);
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Paths in the order they were bound.
    pub fn bound(&self) -> &[CommandPath] {
        &self.bound
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The bound tree; only available once sealed.
    pub fn tree(&self) -> Result<&NamespaceTree, RegistrationError> {
        if !self.sealed {
            return Err(RegistrationError::NotSealed);
        }
        Ok(&self.tree)
    }

    pub(crate) fn into_tree(self) -> Result<NamespaceTree, RegistrationError> {
        if !self.sealed {
            return Err(RegistrationError::NotSealed);
        }
        Ok(self.tree)
    }
}
