//! Tree accessor — the key-lookup capability the engine needs from the
//! configuration tree it resolves against.
//!
//! The tree itself (storage, merging, flags, validation) is an external
//! collaborator; this module only defines the lookup contract and a
//! reference implementation over plain `Value` trees, which is what the
//! tests embed.

use std::fmt;

use weft_types::Value;

/// One navigation step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPart {
    /// A map key.
    Key(String),
    /// A list index.
    Index(usize),
}

impl fmt::Display for PathPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPart::Key(key) => write!(f, "{key}"),
            PathPart::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Render a path in dotted form, for cycle signatures and error messages.
pub fn join_path(parts: &[PathPart]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&part.to_string());
    }
    out
}

/// Key lookup into a hierarchical configuration tree.
///
/// Supplied by the owning configuration system, never a hidden global, so
/// resolution stays deterministic and independently testable.
pub trait ConfigTree {
    /// The value at `path`, or `None` if any step is absent or a
    /// non-container is navigated into. The empty path is the root.
    fn get(&self, path: &[PathPart]) -> Option<Value>;

    /// The container holding the value at `path`; the root is its own
    /// parent.
    fn get_parent(&self, path: &[PathPart]) -> Option<Value> {
        self.get(&path[..path.len().saturating_sub(1)])
    }
}

/// Plain `Value` trees support lookup directly: maps navigate by key, lists
/// by index. An index step on a map falls back to the decimal key, and a key
/// step on a list to the parsed index, so `${a.0}` works against both.
impl ConfigTree for Value {
    fn get(&self, path: &[PathPart]) -> Option<Value> {
        let mut node = self;
        for part in path {
            node = match (node, part) {
                (Value::Map(entries), PathPart::Key(key)) => entries.get(key.as_str())?,
                (Value::Map(entries), PathPart::Index(index)) => {
                    entries.get(index.to_string().as_str())?
                }
                (Value::List(items), PathPart::Index(index)) => items.get(*index)?,
                (Value::List(items), PathPart::Key(key)) => {
                    items.get(key.parse::<usize>().ok()?)?
                }
                _ => return None,
            };
        }
        Some(node.clone())
    }
}
