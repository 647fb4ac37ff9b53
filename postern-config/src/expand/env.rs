//! Environment variable expansion
//!
//! Handles `{$NAME}` and `{%NAME%}` references in directive names and
//! arguments. Both syntaxes resolve against the same snapshot in a single
//! pass, so a substituted value is never expanded again; a reference to a
//! variable that is not set is deleted.
//!
//! An argument written as exactly `{env_split:NAME}` becomes one argument
//! per comma-separated item of the variable.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::parser::Node;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\$([^$}]+)\}|\{%([^%]+)%\}").expect("valid regex"));

static SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{env_split:([^$}]+)\}$").expect("valid regex"));

/// Snapshot of environment variables
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment. Variables whose name or value
    /// is not valid UTF-8 are left out.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Replace every variable reference in `text`
    pub fn expand_str<'t>(&self, text: &'t str) -> Cow<'t, str> {
        REFERENCE.replace_all(text, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            self.get(name).unwrap_or_default().to_string()
        })
    }

    /// Items of a `{env_split:NAME}` argument, `None` for any other text
    pub fn split_arg(&self, arg: &str) -> Option<Vec<String>> {
        let caps = SPLIT.captures(arg)?;
        let value = self.get(&caps[1]).unwrap_or_default();
        Some(
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Expanded text, `None` if `text` has no reference to replace
    fn expand_owned(&self, text: &str) -> Option<String> {
        match self.expand_str(text) {
            Cow::Borrowed(_) => None,
            Cow::Owned(expanded) => Some(expanded),
        }
    }

    /// Expand names and arguments of `nodes` and all their descendants.
    ///
    /// An argument that becomes empty through expansion is dropped; an
    /// argument that was written empty stays. A split argument of an unset
    /// or empty variable contributes nothing.
    pub fn expand(&self, nodes: &mut [Node]) {
        for node in nodes {
            if let Some(name) = self.expand_owned(&node.name) {
                node.name = name;
            }

            let mut args = Vec::with_capacity(node.args.len());
            for arg in std::mem::take(&mut node.args) {
                if let Some(items) = self.split_arg(&arg) {
                    args.extend(items);
                    continue;
                }
                match self.expand_owned(&arg) {
                    None => args.push(arg),
                    Some(expanded) if expanded.is_empty() => {}
                    Some(expanded) => args.push(expanded),
                }
            }
            node.args = args;

            if let Some(children) = &mut node.children {
                self.expand(children);
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
