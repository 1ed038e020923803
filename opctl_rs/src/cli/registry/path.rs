use std::fmt;

/// Ordered tokens identifying a node in the command tree, e.g. `kv key put`.
///
/// The program name is not part of the path; the empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(str::to_string).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<CommandPath> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, token: &str) -> CommandPath {
        let mut tokens = self.0.clone();
        tokens.push(token.to_string());
        Self(tokens)
    }

    /// Path string used for duplicate detection.
    pub fn key(&self) -> String {
        self.0.join(" ")
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for CommandPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_whitespace() {
        let path = CommandPath::parse("  kv   key put ");
        assert_eq!(path.tokens(), ["kv", "key", "put"]);
        assert_eq!(path.key(), "kv key put");
    }

    #[test]
    fn test_parent_and_child() {
        let path = CommandPath::parse("kv key");
        assert_eq!(path.child("put").key(), "kv key put");
        assert_eq!(path.parent(), Some(CommandPath::parse("kv")));
        assert_eq!(CommandPath::parse("kv").parent(), Some(CommandPath::root()));
        assert_eq!(CommandPath::root().parent(), None);
    }
}
