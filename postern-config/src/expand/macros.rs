//! Macro expansion
//!
//! `$(name) = v1 v2` at top level defines a macro. An argument written as
//! exactly `$(name)` is replaced by all of its values; a reference inside a
//! longer argument (`dir/$(name)/x`) takes the single value of the macro.
//! Undefined macros expand to nothing.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::Result;
use crate::parser::Node;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([^$()]+)\)").expect("macro pattern can be compiled"));

/// Macro definitions collected from a document and its imports
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Vec<String>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.macros.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Record a `$(name) = values…` declaration.
    ///
    /// References in the values are expanded against the macros defined so
    /// far.
    pub fn define(&mut self, node: &Node) -> Result<()> {
        let Some(name) = node.name.strip_prefix("$(").and_then(|n| n.strip_suffix(')')) else {
            return Err(node.expansion_error("macro name must end with )"));
        };
        if name.is_empty() {
            return Err(node.expansion_error("empty macro name"));
        }

        let Some((eq, values)) = node.args.split_first() else {
            return Err(node.expansion_error("missing = in macro declaration"));
        };
        if eq != "=" {
            return Err(node.expansion_error("missing = in macro declaration"));
        }
        if self.contains(name) {
            return Err(node.expansion_error(format!("macro $({}) is already defined", name)));
        }

        let values = self.substitute(node, values)?;
        if values.is_empty() {
            return Err(node.expansion_error(format!("macro $({}) must have at least one value", name)));
        }

        tracing::trace!("Macro $({}) = {:?}", name, values);
        self.macros.insert(name.to_string(), values);
        Ok(())
    }

    /// Substitute references in `nodes` and all their descendants
    pub fn expand(&self, nodes: &mut [Node]) -> Result<()> {
        for node in nodes {
            if as_reference(&node.name).is_some() || node.is_macro() {
                return Err(node.expansion_error("can't use macro argument as directive name"));
            }

            node.args = self.substitute(node, &node.args)?;

            if let Some(children) = &mut node.children {
                self.expand(children)?;
            }
        }
        Ok(())
    }

    fn substitute(&self, node: &Node, args: &[String]) -> Result<Vec<String>> {
        let mut expanded = Vec::with_capacity(args.len());

        for arg in args {
            if let Some(name) = as_reference(arg) {
                if let Some(values) = self.get(name) {
                    expanded.extend(values.iter().cloned());
                }
                continue;
            }

            if !REFERENCE.is_match(arg) {
                expanded.push(arg.clone());
                continue;
            }

            for caps in REFERENCE.captures_iter(arg) {
                if self.get(&caps[1]).is_some_and(|values| values.len() > 1) {
                    return Err(node.expansion_error(
                        "can't expand macro with multiple arguments inside a string",
                    ));
                }
            }
            let inline = REFERENCE.replace_all(arg, |caps: &Captures<'_>| {
                self.get(&caps[1])
                    .and_then(|values| values.first())
                    .cloned()
                    .unwrap_or_default()
            });
            expanded.push(inline.into_owned());
        }

        Ok(expanded)
    }
}

/// Name of an argument written as exactly `$(name)`
fn as_reference(arg: &str) -> Option<&str> {
    let name = arg.strip_prefix("$(")?.strip_suffix(')')?;
    (!name.is_empty() && !name.contains(['$', '(', ')'])).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define(table: &mut MacroTable, args: &[&str]) -> Result<()> {
        let (name, args) = args.split_first().unwrap();
        table.define(&Node::new(*name).with_args(args.iter().copied()).at("test", 1))
    }

    #[test]
    fn test_whole_argument_substitution() {
        let mut table = MacroTable::new();
        define(&mut table, &["$(foo)", "=", "bar", "baz"]).unwrap();

        let mut nodes = vec![Node::new("dir").with_args(["$(foo)", "x", "$(undefined)"])];
        table.expand(&mut nodes).unwrap();
        assert_eq!(nodes[0].args, vec!["bar", "baz", "x"]);
    }

    #[test]
    fn test_inline_substitution() {
        let mut table = MacroTable::new();
        define(&mut table, &["$(foo)", "=", "bar"]).unwrap();
        define(&mut table, &["$(multi)", "=", "a", "b"]).unwrap();

        let mut nodes = vec![Node::new("dir").with_args(["aaa/$(foo)/bbb", "$(nope)-x"])];
        table.expand(&mut nodes).unwrap();
        assert_eq!(nodes[0].args, vec!["aaa/bar/bbb", "-x"]);

        let mut nodes = vec![Node::new("dir").with_args(["aaa/$(multi)/bbb"])];
        let err = table.expand(&mut nodes).unwrap_err();
        assert!(err.to_string().contains("multiple arguments inside a string"));
    }

    #[test]
    fn test_nested_definition() {
        let mut table = MacroTable::new();
        define(&mut table, &["$(foo)", "=", "a"]).unwrap();
        define(&mut table, &["$(bar)", "=", "$(foo)", "b"]).unwrap();
        assert_eq!(table.get("bar").unwrap(), ["a", "b"]);
    }

    #[test]
    fn test_descends_into_children() {
        let mut table = MacroTable::new();
        define(&mut table, &["$(host)", "=", "mx.example.org"]).unwrap();

        let mut nodes = vec![Node::new("smtp").with_children(vec![Node::new("hostname").with_args(["$(host)"])])];
        table.expand(&mut nodes).unwrap();
        assert_eq!(nodes[0].children.as_ref().unwrap()[0].args, vec!["mx.example.org"]);
    }

    #[test]
    fn test_definition_errors() {
        let mut table = MacroTable::new();

        let err = define(&mut table, &["$(foo)"]).unwrap_err();
        assert_eq!(err.to_string(), "test:1: missing = in macro declaration");

        let err = define(&mut table, &["$(foo)", "a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "test:1: missing = in macro declaration");

        let err = define(&mut table, &["$(foo)", "="]).unwrap_err();
        assert!(err.to_string().contains("at least one value"));

        let err = define(&mut table, &["$(foo", "=", "a"]).unwrap_err();
        assert!(err.to_string().contains("must end with )"));

        let err = define(&mut table, &["$(foo)", "=", "$(undefined)"]).unwrap_err();
        assert!(err.to_string().contains("at least one value"));

        define(&mut table, &["$(foo)", "=", "a"]).unwrap();
        let err = define(&mut table, &["$(foo)", "=", "b"]).unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_reference_as_name() {
        let table = MacroTable::new();
        let mut nodes = vec![Node::new("a").with_children(vec![Node::new("$(foo)").with_args(["1"])])];
        let err = table.expand(&mut nodes).unwrap_err();
        assert!(err.to_string().contains("can't use macro argument as directive name"));
    }
}
