//! Expansion passes
//!
//! Applied per file in this order: environment variables, declaration
//! collection, imports. Macro references are substituted once the whole
//! import chain is read.

pub mod env;
pub mod imports;
pub mod macros;

pub use env::Environment;
pub use imports::MAX_IMPORT_DEPTH;
pub use macros::MacroTable;
