//! Resolver system for weft.
//!
//! Resolvers are the pluggable side of the language: named callables invoked
//! as `${name:args}`. Built-ins and embedder-registered resolvers go through
//! the same registry and the same canonical call shape.
//!
//! # Architecture
//!
//! ```text
//! ResolverRegistry
//! ├── Builtins (env, decode)
//! └── Embedder resolvers (registered via `register` / `register_simple`)
//! ```

mod builtin;
mod context;
mod registry;

pub use builtin::register_builtins;
pub use context::ResolverScope;
pub use registry::{ResolverEntry, ResolverError, ResolverOptions, ResolverRegistry};
