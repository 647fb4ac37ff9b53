//! Snippet and file imports
//!
//! `import name` is replaced by the body of the `(name) { … }` snippet, or
//! by the directives of the file `name` (then `name.conf`) next to the file
//! being read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::parser::Node;
use crate::reader::ParseContext;

/// Deepest chain of imports and blocks expanded before giving up
pub const MAX_IMPORT_DEPTH: usize = 255;

impl ParseContext<'_> {
    /// Splice every `import` found below `node`.
    ///
    /// A node without a block is left alone. When a pass spliced anything
    /// the block is walked again, so imports brought in by snippets are
    /// expanded too.
    pub(crate) fn expand_imports(&mut self, node: &mut Node, origin: &Path, depth: usize) -> Result<()> {
        let Some(children) = node.children.take() else {
            return Ok(());
        };

        let mut expanded = Vec::with_capacity(children.len());
        let mut spliced = false;

        for mut child in children {
            self.expand_imports(&mut child, origin, depth + 1)?;

            if child.name != "import" {
                expanded.push(child);
                continue;
            }

            if depth > MAX_IMPORT_DEPTH {
                return Err(child.expansion_error("hit import expansion limit"));
            }
            if child.args.len() != 1 {
                return Err(child.expansion_error("import directive requires exactly 1 argument"));
            }

            spliced = true;
            expanded.extend(self.resolve_import(&child, origin, depth)?);
        }

        node.children = Some(expanded);

        if spliced {
            return self.expand_imports(node, origin, depth + 1);
        }
        Ok(())
    }

    fn resolve_import(&mut self, node: &Node, origin: &Path, depth: usize) -> Result<Vec<Node>> {
        let name = &node.args[0];

        if let Some(body) = self.snippets.get(name) {
            return Ok(body.clone());
        }

        let path = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            origin.parent().unwrap_or(Path::new("")).join(name)
        };

        let (path, source) = match read_source(&path)? {
            Some(source) => (path, source),
            None => {
                let mut conf = path.into_os_string();
                conf.push(".conf");
                let conf = PathBuf::from(conf);
                match read_source(&conf)? {
                    Some(source) => (conf, source),
                    None => return Err(node.expansion_error(format!("unknown import: {}", name))),
                }
            }
        };

        tracing::debug!("📄 Importing {}", path.display());
        self.read_tree(&source, &path.to_string_lossy(), depth + 1)
    }
}

/// File contents, `None` if there is no such file
fn read_source(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use crate::expand::Environment;
    use crate::reader::ParseContext;

    fn read(source: &str) -> crate::Result<Vec<crate::Node>> {
        let env = Environment::new();
        let mut ctx = ParseContext::new(&env);
        ctx.read_tree(source, "test", 0)
    }

    #[test]
    fn test_snippet_expansion() {
        let tree = read("(foo) { a }\n import foo").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "a");
        assert_eq!(tree[0].line, 1);
    }

    #[test]
    fn test_snippet_inside_block() {
        let tree = read(
            "(foo) { a }
            foo {
                boo
                import foo
            }",
        )
        .unwrap();

        let names: Vec<_> = tree[0].children.as_ref().unwrap().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["boo", "a"]);
    }

    #[test]
    fn test_snippet_importing_snippet() {
        let tree = read("(inner) { x }\n(outer) { import inner\n y }\nimport outer").unwrap();
        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn test_no_block_is_left_alone() {
        let tree = read("a\nb { }").unwrap();
        assert_eq!(tree[0].children, None);
        assert_eq!(tree[1].children, Some(vec![]));
    }

    #[test]
    fn test_missing_snippet() {
        let err = read("a\nimport foo").unwrap_err();
        assert_eq!(err.to_string(), "test:2: unknown import: foo");
    }

    #[test]
    fn test_recursive_snippet() {
        let err = read("(foo) { import foo }\n import foo").unwrap_err();
        assert!(err.to_string().ends_with("hit import expansion limit"));
    }

    #[test]
    fn test_import_arity() {
        let err = read("import a b").unwrap_err();
        assert_eq!(err.to_string(), "test:1: import directive requires exactly 1 argument");
    }
}
