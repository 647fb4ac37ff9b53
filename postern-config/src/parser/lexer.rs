//! Lexer for the Postern configuration language
//!
//! Key features:
//! - Words are separated by whitespace; newlines are significant
//! - `{` and `}` are structural only when they stand alone, so `{$VAR}`
//!   and `a{` are plain words
//! - "..." for quoted strings, which may span lines; only `\"` is an escape
//! - `#` starts a comment that runs to the end of the line, even mid-word

use logos::{Logos, Span};
use std::fmt;

/// A token with its byte span and line in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
    pub line: usize,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span, line: usize) -> Self {
        Self { value, span, line }
    }
}

/// Token types
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Newlines are tokens of their own, every other blank is skipped.
    #[regex(r"[ \t\x0B\f\r]+", logos::skip)]
    Whitespace,

    // Stops before the newline so the line still terminates the directive.
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("{", priority = 5)]
    BlockOpen,

    #[token("}", priority = 5)]
    BlockClose,

    #[token("\n")]
    Newline,

    // ============================================================
    // Values
    // ============================================================

    /// Quoted string literal: "..."
    #[regex(r#""([^"\\]|\\(.|\n))*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    QuotedString(String),

    /// Unquoted word: names, arguments, `{$VAR}` references, `$(macro)`
    /// references, snippet names in parentheses.
    #[regex(r##"[^ \t\x0B\r\n\f"#][^ \t\x0B\r\n\f#]*"##, |lex| lex.slice().to_string())]
    Word(String),
}

impl Token {
    /// Text of a word or quoted string
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::QuotedString(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BlockOpen => write!(f, "{{"),
            Token::BlockClose => write!(f, "}}"),
            Token::Newline => write!(f, "newline"),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::Word(s) => write!(f, "{}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Unescape a quoted string. Only `\"` is an escape sequence, any other
/// backslash is kept as written.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some(c) => {
                result.push('\\');
                result.push(c);
            }
            None => result.push('\\'),
        }
    }

    result
}

/// Lexer result type
pub type LexResult = Result<Vec<Spanned<Token>>, LexError>;

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated quoted string starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("unexpected character at position {position}")]
    UnexpectedChar { line: usize, position: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { line } | LexError::UnexpectedChar { line, .. } => *line,
        }
    }
}

/// Tokenize a configuration source string.
///
/// A leading byte order mark is discarded.
pub fn tokenize(source: &str) -> LexResult {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    let mut line = 1;
    let mut cursor = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[cursor..span.start].matches('\n').count();
        cursor = span.start;

        match result {
            Ok(Token::Whitespace) | Ok(Token::Comment) => continue,
            Ok(token) => tokens.push(Spanned::new(token, span, line)),
            Err(()) if lexer.slice().starts_with('"') => {
                return Err(LexError::UnterminatedQuote { line });
            }
            Err(()) => {
                return Err(LexError::UnexpectedChar { line, position: span.start });
            }
        }
    }

    Ok(tokens)
}
