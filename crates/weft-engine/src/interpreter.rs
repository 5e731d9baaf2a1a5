//! The resolution engine and its collaborators.
//!
//! `eval` holds the engine proper: recursive AST evaluation with resolver
//! caching, an explicit active-path stack for cycle detection, and an
//! explicit depth guard. `tree` holds the key-lookup trait the engine needs
//! from the external configuration tree, plus a reference implementation
//! over plain `Value` trees.

pub mod eval;
pub mod tree;

pub use eval::{resolve, resolve_element, Context, EvalError, DEFAULT_MAX_DEPTH};
pub use tree::{join_path, ConfigTree, PathPart};
