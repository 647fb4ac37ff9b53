//! Configuration reader
//!
//! Runs the whole pipeline for one document:
//!
//! 1. tokenize and build the tree,
//! 2. expand environment variables,
//! 3. collect `(name) { … }` snippets and `$(name) = …` macros,
//! 4. expand imports (imported files go through 1-4 themselves),
//! 5. substitute macro references in the final tree,
//! 6. validate directive names.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::expand::{Environment, MacroTable};
use crate::parser::{self, validate_names, Node};

/// State shared by a document and every file it imports
pub(crate) struct ParseContext<'e> {
    pub(crate) env: &'e Environment,
    pub(crate) snippets: HashMap<String, Vec<Node>>,
    pub(crate) macros: MacroTable,
}

impl<'e> ParseContext<'e> {
    pub(crate) fn new(env: &'e Environment) -> Self {
        Self {
            env,
            snippets: HashMap::new(),
            macros: MacroTable::new(),
        }
    }

    /// Read one file up to and including import expansion
    pub(crate) fn read_tree(&mut self, source: &str, file: &str, depth: usize) -> Result<Vec<Node>> {
        let mut nodes = parser::parse(source, file)?;
        self.env.expand(&mut nodes);
        self.collect_declarations(&mut nodes)?;

        let mut root = Node::new("").with_children(nodes).at(file, 1);
        self.expand_imports(&mut root, Path::new(file), depth)?;
        Ok(root.children.unwrap_or_default())
    }

    /// Move top-level snippet and macro declarations into the context
    fn collect_declarations(&mut self, nodes: &mut Vec<Node>) -> Result<()> {
        let mut kept = Vec::with_capacity(nodes.len());

        for node in nodes.drain(..) {
            if let Some(name) = node.snippet_name().map(str::to_string) {
                tracing::trace!("Snippet ({}) declared at {}:{}", name, node.file, node.line);
                self.snippets.insert(name, node.children.unwrap_or_default());
            } else if node.is_macro() {
                self.macros.define(&node)?;
            } else {
                kept.push(node);
            }
        }

        *nodes = kept;
        Ok(())
    }
}

/// Configuration reader
///
/// Holds the environment snapshot; everything else lives for one read.
#[derive(Debug, Clone)]
pub struct Reader {
    env: Environment,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    /// Reader using a snapshot of the process environment
    pub fn new() -> Self {
        Self::with_environment(Environment::from_process())
    }

    pub fn with_environment(env: Environment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Read a document. `location` labels nodes and errors and is the base
    /// for relative imports.
    pub fn read_str(&self, source: &str, location: &str) -> Result<Vec<Node>> {
        let mut ctx = ParseContext::new(&self.env);
        let mut nodes = ctx.read_tree(source, location, 0)?;

        ctx.macros.expand(&mut nodes)?;
        validate_names(&nodes)?;

        tracing::debug!(
            "✅ Read {} directives from {} ({} snippets, {} macros)",
            nodes.len(),
            location,
            ctx.snippets.len(),
            ctx.macros.len()
        );
        Ok(nodes)
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<Node>> {
        let path = path.as_ref();
        tracing::debug!("📄 Reading configuration from {}", path.display());
        let source = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        self.read_str(&source, &path.to_string_lossy())
    }
}

/// Read a document using the process environment
pub fn read(source: &str, location: &str) -> Result<Vec<Node>> {
    Reader::new().read_str(source, location)
}

/// Read a file using the process environment
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<Node>> {
    Reader::new().read_file(path)
}
