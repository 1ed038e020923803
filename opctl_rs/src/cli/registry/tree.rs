//! The bound namespace/command tree.
//!
//! Plain data: nodes are namespaces (no handler) or leaf commands. Each node
//! owns its children, kept in binding order.

use super::path::CommandPath;
use crate::cli::command::{CommandDefinition, Metadata, NamespaceDefinition};
use crate::errors::RegistrationError;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Namespace(NamespaceDefinition),
    Command(CommandDefinition),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub path: CommandPath,
    pub kind: NodeKind,
    pub aliases: Vec<String>,
    children: Vec<Node>,
}

impl Node {
    fn new(path: CommandPath, kind: NodeKind) -> Self {
        Self {
            name: path.last().unwrap_or_default().to_string(),
            path,
            kind,
            aliases: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match &self.kind {
            NodeKind::Namespace(def) => &def.metadata,
            NodeKind::Command(def) => &def.metadata,
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, NodeKind::Namespace(_))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Look up a direct child by name or alias.
    pub fn child(&self, token: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.name == token || c.aliases.iter().any(|a| a == token))
    }

    fn child_mut(&mut self, token: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == token)
    }
}

/// Tree rooted at the program itself.
#[derive(Debug, Clone)]
pub struct NamespaceTree {
    root: Node,
}

impl NamespaceTree {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            root: Node::new(
                CommandPath::root(),
                NodeKind::Namespace(NamespaceDefinition::new(description)),
            ),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn get(&self, path: &CommandPath) -> Option<&Node> {
        path.tokens()
            .iter()
            .try_fold(&self.root, |node, token| node.child(token))
    }

    fn get_mut(&mut self, path: &CommandPath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for token in path.tokens() {
            node = node.child_mut(token)?;
        }
        Some(node)
    }

    /// Attach a node under its parent. The parent must already be a bound namespace.
    pub(crate) fn insert(
        &mut self,
        path: CommandPath,
        kind: NodeKind,
    ) -> Result<(), RegistrationError> {
        let parent_path = path.parent().ok_or(RegistrationError::EmptyPath)?;
        let parent = self
            .get_mut(&parent_path)
            .ok_or_else(|| RegistrationError::MissingNamespace(parent_path.key()))?;
        if !parent.is_namespace() {
            return Err(RegistrationError::LeafParent(parent_path.key()));
        }
        let name = path.last().unwrap_or_default();
        if parent.child(name).is_some() {
            return Err(RegistrationError::Duplicate(path.key()));
        }
        parent.children.push(Node::new(path, kind));
        Ok(())
    }

    /// Register `alias` as another name for the sibling at `target`.
    pub(crate) fn add_alias(
        &mut self,
        alias: &CommandPath,
        target: &CommandPath,
    ) -> Result<(), RegistrationError> {
        if alias.parent() != target.parent() {
            return Err(RegistrationError::AliasScope {
                alias: alias.key(),
                target: target.key(),
            });
        }
        let dangling = || RegistrationError::DanglingAlias {
            alias: alias.key(),
            target: target.key(),
        };
        let parent_path = alias.parent().ok_or(RegistrationError::EmptyPath)?;
        let parent = self.get_mut(&parent_path).ok_or_else(dangling)?;
        let name = alias.last().unwrap_or_default().to_string();
        if parent.child(&name).is_some() {
            return Err(RegistrationError::Duplicate(alias.key()));
        }
        let node = parent
            .child_mut(target.last().unwrap_or_default())
            .ok_or_else(dangling)?;
        node.aliases.push(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(desc: &str) -> NodeKind {
        NodeKind::Namespace(NamespaceDefinition::new(desc))
    }

    #[test]
    fn test_insert_requires_parent() {
        let mut tree = NamespaceTree::new("root");
        let err = tree.insert(CommandPath::parse("kv key"), ns("keys")).unwrap_err();
        assert_eq!(err, RegistrationError::MissingNamespace("kv".into()));

        tree.insert(CommandPath::parse("kv"), ns("kv")).unwrap();
        tree.insert(CommandPath::parse("kv key"), ns("keys")).unwrap();
        assert!(tree.get(&CommandPath::parse("kv key")).is_some());
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let mut tree = NamespaceTree::new("root");
        tree.insert(CommandPath::parse("telemetry"), ns("telemetry")).unwrap();
        tree.add_alias(&CommandPath::parse("metrics"), &CommandPath::parse("telemetry"))
            .unwrap();
        let node = tree.get(&CommandPath::parse("metrics")).unwrap();
        assert_eq!(node.name, "telemetry");
    }

    #[test]
    fn test_alias_must_be_sibling() {
        let mut tree = NamespaceTree::new("root");
        tree.insert(CommandPath::parse("kv"), ns("kv")).unwrap();
        let err = tree
            .add_alias(&CommandPath::parse("kv store"), &CommandPath::parse("kv"))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::AliasScope { .. }));
    }
}
