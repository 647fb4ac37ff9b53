//! Postern Configuration
//!
//! This crate reads the Postern configuration language and binds the
//! resulting directive tree to typed values.
//!
//! # Example
//!
//! ```rust,ignore
//! use postern_config::{read, Globals, Map};
//!
//! let source = r#"
//!     $(domain) = example.org
//!
//!     (tls) {
//!         tls /etc/postern/{$DOMAIN}.crt /etc/postern/{$DOMAIN}.key
//!     }
//!
//!     smtp tcp://0.0.0.0:25 {
//!         hostname mx.$(domain)
//!         import tls
//!     }
//! "#;
//!
//! let tree = read(source, "postern.conf")?;
//!
//! let mut hostname = String::new();
//! let mut map = Map::new();
//! map.allow_unknown();
//! map.string("hostname", true, true, None, &mut hostname);
//! map.process(&Globals::new(), &tree[0])?;
//! ```

pub mod error;
pub mod expand;
pub mod map;
pub mod parser;
pub mod reader;
pub mod report;

pub use error::{ConfigError, Location, Result};
pub use expand::{Environment, MacroTable};
pub use map::{parse_bool, parse_data_size, parse_duration, DefaultFactory, Globals, Map, Value};
pub use parser::{parse, tokenize, LexError, Node, Token, TreeBuilder};
pub use reader::{read, read_file, Reader};
pub use report::render;

pub use postern_core::{Endpoint, Family, Scheme};
