//! Parser module for Postern configuration files
//!
//! This module provides the lexer, the node tree and the tree builder.

pub mod lexer;
pub mod node;
pub mod tree;

pub use lexer::{tokenize, LexError, Spanned, Token};
pub use node::Node;
pub use tree::{validate_names, TreeBuilder, MAX_NESTING};

use crate::error::Result;

/// Build the tree of one source without any expansion
pub fn parse(source: &str, file: &str) -> Result<Vec<Node>> {
    TreeBuilder::new(source, file)?.build()
}
