//! Configuration errors

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration reading and binding
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Place in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self { file: file.into(), line }
    }

    /// Location for a source label, `None` when the label is empty
    pub fn of(file: &str, line: usize) -> Option<Self> {
        (!file.is_empty()).then(|| Self::new(file, line))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

fn located(location: &Option<Location>) -> String {
    match location {
        Some(location) => format!("{}: ", location),
        None => String::new(),
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed block structure, illegal declaration placement, bad names
    #[error("{}{message}", located(.location))]
    Parse { location: Option<Location>, message: String },

    /// Unresolved import, expansion limits, malformed macros
    #[error("{}{message}", located(.location))]
    Expansion { location: Option<Location>, message: String },

    /// Duplicate, unknown or missing directives and conversion failures
    #[error("{}{message}", located(.location))]
    Binding { location: Option<Location>, message: String },

    /// Directive argument is not a valid endpoint
    #[error("{}{source}", located(.location))]
    Endpoint {
        location: Option<Location>,
        source: postern_core::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl ConfigError {
    pub fn parse(location: Option<Location>, message: impl Into<String>) -> Self {
        Self::Parse { location, message: message.into() }
    }

    pub fn expansion(location: Option<Location>, message: impl Into<String>) -> Self {
        Self::Expansion { location, message: message.into() }
    }

    pub fn binding(location: Option<Location>, message: impl Into<String>) -> Self {
        Self::Binding { location, message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Where the error happened, if known
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Parse { location, .. }
            | Self::Expansion { location, .. }
            | Self::Binding { location, .. }
            | Self::Endpoint { location, .. } => location.as_ref(),
            Self::Io { .. } => None,
        }
    }

    /// Attach `fallback` unless the error already has a location
    pub fn or_located(mut self, fallback: Option<Location>) -> Self {
        match &mut self {
            Self::Parse { location, .. }
            | Self::Expansion { location, .. }
            | Self::Binding { location, .. }
            | Self::Endpoint { location, .. } => {
                if location.is_none() {
                    *location = fallback;
                }
            }
            Self::Io { .. } => {}
        }
        self
    }

    /// The message without the location prefix
    pub fn detail(&self) -> String {
        match self {
            Self::Parse { message, .. }
            | Self::Expansion { message, .. }
            | Self::Binding { message, .. } => message.clone(),
            Self::Endpoint { source, .. } => source.to_string(),
            Self::Io { source, .. } => source.to_string(),
        }
    }
}
