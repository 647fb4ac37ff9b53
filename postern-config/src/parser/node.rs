//! Configuration tree
//!
//! ```text
//! name arg0 arg1 {
//!     child0
//!     child1
//! }
//! ```

use crate::error::{ConfigError, Location};

/// One directive: a name, its arguments and an optional block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// First word on the directive line
    pub name: String,

    /// Words following the name
    pub args: Vec<String>,

    /// `None` when no block was written, `Some(vec![])` for `{ }`
    pub children: Option<Vec<Node>>,

    /// Source label the directive was read from
    pub file: String,

    /// Line of the directive name. For blocks this is the header line.
    pub line: usize,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Whether a non-empty block was written
    pub fn has_block(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn location(&self) -> Option<Location> {
        Location::of(&self.file, self.line)
    }

    pub fn parse_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::parse(self.location(), message)
    }

    pub fn expansion_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::expansion(self.location(), message)
    }

    pub fn binding_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::binding(self.location(), message)
    }

    /// Name of a `(name)` snippet declaration
    pub(crate) fn snippet_name(&self) -> Option<&str> {
        self.name.strip_prefix('(')?.strip_suffix(')')
    }

    /// Whether the name is written as a `$(...)` macro
    pub(crate) fn is_macro(&self) -> bool {
        self.name.starts_with("$(")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let node = Node::new("smtp")
            .with_args(["tcp://0.0.0.0:25"])
            .with_children(vec![Node::new("hostname").with_args(["mx.example.org"])])
            .at("postern.conf", 4);

        assert_eq!(node.args, vec!["tcp://0.0.0.0:25"]);
        assert!(node.has_block());
        assert_eq!(node.location().unwrap().to_string(), "postern.conf:4");
    }

    #[test]
    fn test_no_block_vs_empty_block() {
        let bare = Node::new("a");
        let empty = Node::new("a").with_children(Vec::new());
        assert_ne!(bare, empty);
        assert!(!bare.has_block());
        assert!(!empty.has_block());
    }

    #[test]
    fn test_snippet_name() {
        assert_eq!(Node::new("(tls)").snippet_name(), Some("tls"));
        assert_eq!(Node::new("tls").snippet_name(), None);
        assert!(Node::new("$(dir)").is_macro());
    }

    #[test]
    fn test_errors_without_file_are_unprefixed() {
        let err = Node::new("a").at("", 7).binding_error("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
