//! Error types for Postern core

use thiserror::Error;

/// Result type for Postern core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Endpoint parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Scheme is not part of the address family being parsed
    #[error("unsupported scheme in address {input:?}")]
    UnsupportedScheme { input: String },

    /// Network scheme without a port and no default for it
    #[error("port is required in address {input:?}")]
    MissingPort { input: String },

    /// Port is not a number in 0..=65535
    #[error("invalid port {port:?} in address {input:?}")]
    InvalidPort { input: String, port: String },

    /// Port is itself a scheme name, e.g. `imap://host:imaps`
    #[error("scheme specified twice in address {input:?}")]
    SchemeRepeated { input: String },

    /// Plaintext scheme with the secure port or the other way around
    #[error("scheme and port violate convention in address {input:?}")]
    SchemeConflict { input: String },

    /// Address that does not have a URL shape at all
    #[error("malformed address {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
}
