//! Tree builder
//!
//! Recursive descent parser that turns the token stream into [`Node`]s.
//! A line is one directive unless it opens a block; a block closes with a
//! `}` on its own line or at the end of the last child's line.

use crate::error::{ConfigError, Location, Result};
use crate::parser::lexer::{tokenize, Spanned, Token};
use crate::parser::node::Node;

/// Deepest block nesting accepted
pub const MAX_NESTING: usize = 255;

/// Parser state
pub struct TreeBuilder {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    file: String,
    nesting: usize,
}

impl TreeBuilder {
    /// Tokenize `source`. `file` labels every node and error.
    pub fn new(source: &str, file: impl Into<String>) -> Result<Self> {
        let file = file.into();
        let tokens = tokenize(source)
            .map_err(|e| ConfigError::parse(Location::of(&file, e.line()), e.to_string()))?;
        Ok(Self {
            tokens,
            pos: 0,
            file,
            nesting: 0,
        })
    }

    /// Read every top-level directive
    pub fn build(mut self) -> Result<Vec<Node>> {
        self.read_nodes()
    }

    // ========================================
    // Blocks
    // ========================================

    /// Read directives until the `}` closing the current block, or the end
    /// of input at top level. The closing brace is consumed.
    fn read_nodes(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            while self.check(&Token::Newline) {
                self.advance();
            }

            match self.peek() {
                None if self.nesting == 0 => return Ok(nodes),
                None => return Err(self.error("unexpected EOF when looking for }")),
                Some(Token::BlockClose) => {
                    if self.nesting == 0 {
                        return Err(self.error("unexpected }"));
                    }
                    self.advance();
                    return Ok(nodes);
                }
                Some(Token::BlockOpen) => {
                    return Err(self.error("missing block header before {"));
                }
                Some(_) => {}
            }

            let (node, closes) = self.read_node()?;
            self.check_placement(&node)?;
            let had_block = node.children.is_some();
            nodes.push(node);

            if closes {
                return Ok(nodes);
            }

            // name arg {
            // } <- only a line break or another } may follow
            match self.peek() {
                None | Some(Token::Newline) => {}
                Some(Token::BlockClose) if had_block => {}
                Some(_) => return Err(self.error("newline is required after closing brace")),
            }
        }
    }

    fn read_block(&mut self) -> Result<Vec<Node>> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("nesting limit reached"));
        }
        self.nesting += 1;
        let nodes = self.read_nodes()?;
        self.nesting -= 1;
        Ok(nodes)
    }

    // ========================================
    // Directives
    // ========================================

    /// Read one directive starting at its name.
    ///
    /// Returns `true` alongside the node when a `}` at the end of its line
    /// closed the enclosing block.
    fn read_node(&mut self) -> Result<(Node, bool)> {
        let (name, line) = match self.tokens.get(self.pos) {
            Some(Spanned { value, line, .. }) => match value.text() {
                Some(text) => (text.to_string(), *line),
                None => return Err(self.error(format!("unexpected {}", value))),
            },
            None => return Err(self.error("unexpected EOF")),
        };
        self.advance();

        let mut node = Node::new(name).at(self.file.clone(), line);
        let mut last_is_word = false;

        loop {
            match self.peek() {
                Some(Token::Word(word)) => {
                    node.args.push(word.clone());
                    last_is_word = true;
                    self.advance();
                }
                Some(Token::QuotedString(text)) => {
                    node.args.push(text.clone());
                    last_is_word = false;
                    self.advance();
                }
                Some(Token::BlockOpen) => {
                    self.advance();
                    node.children = Some(self.read_block()?);
                    return Ok((node, false));
                }
                Some(Token::BlockClose) => {
                    if self.nesting == 0 {
                        return Err(self.error("unexpected }"));
                    }
                    self.advance();
                    return Ok((node, true));
                }
                Some(Token::Newline) if last_is_word && continues_line(&mut node) => {
                    last_is_word = false;
                    self.advance();
                }
                None if last_is_word => {
                    continues_line(&mut node);
                    return Ok((node, false));
                }
                _ => return Ok((node, false)),
            }
        }
    }

    fn check_placement(&self, node: &Node) -> Result<()> {
        if node.snippet_name().is_some() {
            if self.nesting != 0 {
                return Err(node.parse_error("snippet declarations are only allowed at top-level"));
            }
            if !node.args.is_empty() {
                return Err(node.parse_error("snippet declarations can't have arguments"));
            }
        }

        if node.is_macro() && self.nesting != 0 && node.args.first().is_some_and(|a| a == "=") {
            return Err(node.parse_error("macro declarations are only allowed at top-level"));
        }

        Ok(())
    }

    // ========================================
    // Helper Methods
    // ========================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::parse(Location::of(&self.file, self.current_line()), message)
    }
}

/// Handle a trailing `\` on the last argument.
///
/// ```text
/// name arg0 arg1 \
///     arg2 arg3
/// ```
fn continues_line(node: &mut Node) -> bool {
    let Some(last) = node.args.last_mut() else {
        return false;
    };
    if !last.ends_with('\\') {
        return false;
    }
    last.pop();
    if last.is_empty() {
        node.args.pop();
    }
    true
}

/// Check directive names once all expansion is done.
///
/// A name must not be empty or start with a digit, and may contain only
/// letters, digits, `.`, `-` and `_`.
pub fn validate_names(nodes: &[Node]) -> Result<()> {
    for node in nodes {
        check_name(&node.name).map_err(|message| node.parse_error(message))?;
        if let Some(children) = &node.children {
            validate_names(children)?;
        }
    }
    Ok(())
}

fn check_name(name: &str) -> std::result::Result<(), String> {
    let Some(first) = name.chars().next() else {
        return Err("empty directive name".to_string());
    };
    if first.is_numeric() {
        return Err("directive name cannot start with a digit".to_string());
    }
    if let Some(ch) = name
        .chars()
        .find(|&c| !c.is_alphanumeric() && !matches!(c, '.' | '-' | '_'))
    {
        return Err(format!("character not allowed in directive name: {}", ch));
    }
    Ok(())
}
