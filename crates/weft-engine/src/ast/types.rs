//! AST type definitions.
//!
//! Nodes are immutable once built and exclusively own their children; there
//! is no sharing and no cycles in the tree itself. Reference cycles can only
//! arise at resolution time through key paths.

use std::fmt;

/// A parsed interpolation expression (or fragment of one).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An uncoerced literal run. Escape sequences stay encoded until the
    /// literal is evaluated.
    Literal(String),
    /// Mixed literal/interpolation parts forming one string.
    Concat(Vec<Node>),
    /// A quoted string body. Resolves to a string and is never re-coerced,
    /// whatever its content looks like.
    Quoted(Box<Node>),
    /// `${a.b.0}` — a dotted config key path.
    KeyPath(KeyPath),
    /// `${name:arg1,arg2}` — a resolver call.
    Resolver(ResolverCall),
    /// `[a, b, c]` inside resolver arguments.
    List(Vec<Node>),
    /// `{key: value, ...}` inside resolver arguments.
    Dict(Vec<DictEntry>),
}

impl Node {
    /// True for the two interpolation forms.
    pub fn is_interpolation(&self) -> bool {
        matches!(self, Node::KeyPath(_) | Node::Resolver(_))
    }
}

/// A config key path: optional leading dots for a relative reference,
/// followed by dot-joined segments.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPath {
    /// Number of leading dots. Zero means absolute (from the root); one
    /// resolves against the enclosing container, each further dot goes one
    /// level up.
    pub up: usize,
    pub segments: Vec<Segment>,
}

/// One segment of a key path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A bare key: identifier or any run of permitted key characters.
    Key(String),
    /// A non-negative list index.
    Index(usize),
    /// A nested interpolation; must resolve to a string or integer.
    Inter(Box<Node>),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{k}"),
            Segment::Index(i) => write!(f, "{i}"),
            Segment::Inter(_) => write!(f, "${{...}}"),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.up {
            write!(f, ".")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A resolver invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverCall {
    pub name: ResolverName,
    pub args: Vec<Node>,
}

/// A resolver name: a (possibly dotted) identifier, or an interpolation that
/// must resolve to a string.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverName {
    Name(String),
    Inter(Box<Node>),
}

impl fmt::Display for ResolverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverName::Name(name) => write!(f, "{name}"),
            ResolverName::Inter(_) => write!(f, "${{...}}"),
        }
    }
}

/// One `key: value` entry of a dict literal. The key is a literal identifier
/// or an interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub key: Node,
    pub value: Node,
}
