//! weft-engine: the core of the weft interpolation language.
//!
//! This crate provides:
//!
//! - **Lexer**: Modal tokenizer for `${...}` interpolation syntax
//! - **Parser**: Builds the interpolation AST from tokens
//! - **AST**: Type definitions for interpolation expressions
//! - **Coerce**: The single literal-typing rule (null/bool/int/float/string)
//! - **Resolvers**: Resolver trait shape, registry, and built-ins (`env`, `decode`)
//! - **Interpreter**: The resolution engine, tree accessor trait, cycle and
//!   depth guards

pub mod ast;
pub mod coerce;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolvers;

pub use interpreter::{resolve, resolve_element, ConfigTree, Context, EvalError, PathPart};
pub use parser::{parse, parse_element, ParseError};
pub use resolvers::{register_builtins, ResolverError, ResolverOptions, ResolverRegistry, ResolverScope};

// The value model lives in weft-types; re-exported so embedders only need
// this crate.
pub use weft_types::Value;
