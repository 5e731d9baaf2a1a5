//! AST for the weft interpolation grammar.

mod types;

pub use types::*;
