//! Postern Core Library
//!
//! Leaf types shared by every Postern crate: network endpoints used by
//! listeners and dialers, the server directory layout, and their errors.

pub mod directories;
pub mod endpoint;
pub mod error;

pub use directories::Directories;
pub use endpoint::{Endpoint, Family, Scheme};
pub use error::{Error, Result};
