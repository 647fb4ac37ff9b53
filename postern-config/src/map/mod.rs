//! Directive binding
//!
//! A [`Map`] turns the children of one configuration block into typed
//! values. Every supported directive is registered once with a converter,
//! whether it is required, whether it may be inherited from the global
//! scope and an optional default. [`Map::process`] then walks the block:
//!
//! ```rust,ignore
//! let mut hostname = String::new();
//! let mut max_size = 0u64;
//!
//! let mut map = Map::new();
//! map.string("hostname", true, true, None, &mut hostname);
//! map.data_size("max_message_size", false, false, Some(32 << 20), &mut max_size);
//! map.process(&globals, &block)?;
//! ```
//!
//! Every matched, inherited or defaulted value is also kept in the map's
//! value bag, see [`Map::values`] and [`Map::get`].

pub mod convert;

use indexmap::IndexMap;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use postern_core::Endpoint;

use crate::error::{ConfigError, Result};
use crate::parser::Node;

pub use convert::{parse_bool, parse_data_size, parse_duration};

/// Type-erased directive value
pub type Value = Arc<dyn Any + Send + Sync>;

/// Produces the value of a directive that was not written
pub type DefaultFactory<'a, T> = Box<dyn FnMut() -> Result<T> + 'a>;

type Converter<'a> = Box<dyn FnMut(&Node) -> Result<Value> + 'a>;
type DefaultFn<'a> = Box<dyn FnMut() -> Result<Value> + 'a>;
type Store<'a> = Box<dyn FnMut(&Value) -> bool + 'a>;
type Callback<'a> = Box<dyn FnMut(&Node) -> Result<()> + 'a>;

/// Values of the enclosing global scope, by directive name
#[derive(Clone, Default)]
pub struct Globals {
    values: HashMap<String, Value>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| (**v).downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Globals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

struct Matcher<'a> {
    required: bool,
    inherit: bool,
    default: Option<DefaultFn<'a>>,
    convert: Converter<'a>,
    store: Option<Store<'a>>,
}

enum Entry<'a> {
    Matcher(Matcher<'a>),
    Callback(Callback<'a>),
}

/// Directive binder for one block
pub struct Map<'a> {
    entries: IndexMap<String, Entry<'a>>,
    values: HashMap<String, Value>,
    defaulted: HashSet<String>,
    allow_unknown: bool,
}

impl Default for Map<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Map<'a> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            values: HashMap::new(),
            defaulted: HashSet::new(),
            allow_unknown: false,
        }
    }

    /// Return unknown directives from [`Map::process`] instead of failing
    pub fn allow_unknown(&mut self) -> &mut Self {
        self.allow_unknown = true;
        self
    }

    fn register(&mut self, name: &str, entry: Entry<'a>) {
        if self.entries.contains_key(name) {
            panic!("duplicate binding for directive {:?}", name);
        }
        self.entries.insert(name.to_string(), entry);
    }

    // ========================================
    // Registration
    // ========================================

    /// Bind `name` with an arbitrary converter.
    ///
    /// All other kinds are built on this one.
    ///
    /// # Panics
    ///
    /// If `name` is already bound.
    pub fn custom<T, C>(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<DefaultFactory<'a, T>>,
        mut convert: C,
        store: impl Into<Option<&'a mut T>>,
    ) where
        T: Any + Send + Sync + Clone,
        C: FnMut(&Node) -> Result<T> + 'a,
    {
        let default = default.map(|mut factory| -> DefaultFn<'a> {
            Box::new(move || factory().map(|v| Arc::new(v) as Value))
        });

        let store = store.into().map(|dest| -> Store<'a> {
            Box::new(move |value: &Value| match (**value).downcast_ref::<T>() {
                Some(value) => {
                    *dest = value.clone();
                    true
                }
                None => false,
            })
        });

        self.register(
            name,
            Entry::Matcher(Matcher {
                required,
                inherit,
                default,
                convert: Box::new(move |node: &Node| convert(node).map(|v| Arc::new(v) as Value)),
                store,
            }),
        );
    }

    /// Call `callback` for every occurrence of `name`.
    ///
    /// The directive may appear any number of times and nothing is recorded.
    pub fn callback(&mut self, name: &str, callback: impl FnMut(&Node) -> Result<()> + 'a) {
        self.register(name, Entry::Callback(Box::new(callback)));
    }

    /// Flag directive: bare `name` is `true`, otherwise one of
    /// `yes/no/on/off/true/false/1/0`. Never required.
    pub fn bool(&mut self, name: &str, inherit: bool, default: bool, store: impl Into<Option<&'a mut bool>>) {
        self.custom(
            name,
            inherit,
            false,
            owned_default(Some(default)),
            |node| {
                reject_block(node)?;
                match node.args.as_slice() {
                    [] => Ok(true),
                    [arg] => parse_bool(arg).map_err(|e| node.binding_error(e)),
                    _ => Err(node.binding_error("expected exactly 1 argument")),
                }
            },
            store,
        );
    }

    pub fn string(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<&str>,
        store: impl Into<Option<&'a mut String>>,
    ) {
        self.custom(name, inherit, required, owned_default(default.map(str::to_string)), single_arg, store);
    }

    pub fn string_list(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<Vec<String>>,
        store: impl Into<Option<&'a mut Vec<String>>>,
    ) {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                reject_block(node)?;
                if node.args.is_empty() {
                    return Err(node.binding_error("expected at least one argument"));
                }
                Ok(node.args.clone())
            },
            store,
        );
    }

    /// Any integer type, parsed from exactly one argument
    pub fn integer<T>(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<T>,
        store: impl Into<Option<&'a mut T>>,
    ) where
        T: FromStr + Any + Send + Sync + Clone,
    {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                let arg = single_arg(node)?;
                arg.parse::<T>()
                    .map_err(|_| node.binding_error(format!("invalid integer: {}", arg)))
            },
            store,
        );
    }

    pub fn float(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<f64>,
        store: impl Into<Option<&'a mut f64>>,
    ) {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                let arg = single_arg(node)?;
                arg.parse::<f64>()
                    .map_err(|_| node.binding_error(format!("invalid float: {}", arg)))
            },
            store,
        );
    }

    /// Duration written across any number of arguments: `1h 30m` is the
    /// same as `1h30m`
    pub fn duration(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<Duration>,
        store: impl Into<Option<&'a mut Duration>>,
    ) {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                reject_block(node)?;
                if node.args.is_empty() {
                    return Err(node.binding_error("at least one argument is required"));
                }
                parse_duration(&node.args.concat()).map_err(|e| node.binding_error(e))
            },
            store,
        );
    }

    /// Size in bytes, see [`parse_data_size`]
    pub fn data_size(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<u64>,
        store: impl Into<Option<&'a mut u64>>,
    ) {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                reject_block(node)?;
                if node.args.is_empty() {
                    return Err(node.binding_error("at least one argument is required"));
                }
                parse_data_size(&node.args.join(" ")).map_err(|e| node.binding_error(e))
            },
            store,
        );
    }

    /// One argument out of `allowed`
    pub fn enumeration(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        allowed: &[&str],
        default: Option<&str>,
        store: impl Into<Option<&'a mut String>>,
    ) {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        self.custom(
            name,
            inherit,
            required,
            owned_default(default.map(str::to_string)),
            move |node| {
                let arg = single_arg(node)?;
                if !allowed.contains(&arg) {
                    return Err(invalid_choice(node, &allowed));
                }
                Ok(arg)
            },
            store,
        );
    }

    /// One or more arguments, each out of `allowed`
    pub fn enumeration_list(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        allowed: &[&str],
        default: Option<Vec<String>>,
        store: impl Into<Option<&'a mut Vec<String>>>,
    ) {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            move |node| {
                reject_block(node)?;
                if node.args.is_empty() {
                    return Err(node.binding_error("expected at least one argument"));
                }
                if node.args.iter().any(|arg| !allowed.contains(arg)) {
                    return Err(invalid_choice(node, &allowed));
                }
                Ok(node.args.clone())
            },
            store,
        );
    }

    /// One argument out of the keys of `mapping`, stored as its value
    pub fn enumeration_mapped<V>(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        mapping: &[(&str, V)],
        default: Option<V>,
        store: impl Into<Option<&'a mut V>>,
    ) where
        V: Any + Send + Sync + Clone,
    {
        let mapping: Vec<(String, V)> = mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            move |node| {
                let arg = single_arg(node)?;
                match mapping.iter().find(|(key, _)| *key == arg) {
                    Some((_, value)) => Ok(value.clone()),
                    None => {
                        let keys: Vec<String> = mapping.iter().map(|(k, _)| k.clone()).collect();
                        Err(invalid_choice(node, &keys))
                    }
                }
            },
            store,
        );
    }

    /// Listener endpoint such as `tcp://0.0.0.0:25` or `unix:///run/lmtp.sock`
    pub fn endpoint(
        &mut self,
        name: &str,
        inherit: bool,
        required: bool,
        default: Option<Endpoint>,
        store: impl Into<Option<&'a mut Endpoint>>,
    ) {
        self.custom(
            name,
            inherit,
            required,
            owned_default(default),
            |node| {
                let arg = single_arg(node)?;
                Endpoint::parse(&arg).map_err(|source| ConfigError::Endpoint {
                    location: node.location(),
                    source,
                })
            },
            store,
        );
    }

    // ========================================
    // Processing
    // ========================================

    /// Bind the children of `block`.
    ///
    /// Returns the directives that matched no binding; that list is empty
    /// unless [`Map::allow_unknown`] was called.
    pub fn process(&mut self, globals: &Globals, block: &Node) -> Result<Vec<Node>> {
        self.values.clear();
        self.defaulted.clear();

        let mut unknown = Vec::new();
        let mut matched: HashSet<&str> = HashSet::new();

        for child in block.children.iter().flatten() {
            let Some(entry) = self.entries.get_mut(&child.name) else {
                if !self.allow_unknown {
                    return Err(child.binding_error(format!("unexpected directive: {}", child.name)));
                }
                unknown.push(child.clone());
                continue;
            };

            match entry {
                Entry::Callback(callback) => {
                    callback(child).map_err(|e| e.or_located(child.location()))?;
                    matched.insert(child.name.as_str());
                }
                Entry::Matcher(matcher) => {
                    if !matched.insert(child.name.as_str()) {
                        return Err(child.binding_error(format!("duplicate directive: {}", child.name)));
                    }
                    let value = (matcher.convert)(child).map_err(|e| e.or_located(child.location()))?;
                    if let Some(store) = &mut matcher.store {
                        if !store(&value) {
                            return Err(child.binding_error(format!("unexpected value type for {}", child.name)));
                        }
                    }
                    self.values.insert(child.name.clone(), value);
                }
            }
        }

        for (name, entry) in &mut self.entries {
            if matched.contains(name.as_str()) {
                continue;
            }
            let Entry::Matcher(matcher) = entry else {
                continue;
            };

            let value = match globals.value(name) {
                Some(value) if matcher.inherit => value.clone(),
                _ if !matcher.required => match &mut matcher.default {
                    Some(default) => {
                        self.defaulted.insert(name.clone());
                        default().map_err(|e| e.or_located(block.location()))?
                    }
                    None => continue,
                },
                _ => return Err(block.binding_error(format!("missing required directive: {}", name))),
            };

            if let Some(store) = &mut matcher.store {
                if !store(&value) {
                    return Err(block.binding_error(format!("unexpected value type for inherited {}", name)));
                }
            }
            self.values.insert(name.clone(), value);
        }

        tracing::debug!(
            "Processed block {:?} at {}:{}: {} matched, {} unknown",
            block.name,
            block.file,
            block.line,
            matched.len(),
            unknown.len()
        );

        Ok(unknown)
    }

    // ========================================
    // Results
    // ========================================

    /// Values recorded by the last [`Map::process`]
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| (**v).downcast_ref::<T>())
    }

    /// Matched and inherited values, for use as the global scope of nested
    /// blocks. Defaults are left out so they never satisfy a directive the
    /// nested block requires.
    pub fn globals(&self) -> Globals {
        Globals {
            values: self
                .values
                .iter()
                .filter(|(name, _)| !self.defaulted.contains(*name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

fn owned_default<'a, T>(default: Option<T>) -> Option<DefaultFactory<'a, T>>
where
    T: Clone + 'a,
{
    default.map(|value| -> DefaultFactory<'a, T> { Box::new(move || Ok(value.clone())) })
}

fn reject_block(node: &Node) -> Result<()> {
    if node.has_block() {
        return Err(node.binding_error("can't declare a block here"));
    }
    Ok(())
}

fn single_arg(node: &Node) -> Result<String> {
    reject_block(node)?;
    match node.args.as_slice() {
        [arg] => Ok(arg.clone()),
        _ => Err(node.binding_error("expected exactly 1 argument")),
    }
}

fn invalid_choice(node: &Node, allowed: &[String]) -> ConfigError {
    node.binding_error(format!("invalid argument, valid values are: {}", allowed.join(", ")))
}
