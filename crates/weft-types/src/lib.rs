//! Pure data types for weft — the typed values produced by interpolation.
//!
//! This crate is a leaf dependency with no parser and no I/O. It exists so
//! that embedders (configuration trees, loaders) can work with weft's value
//! model without pulling in the engine.

pub mod json;
pub mod value;

// Flat re-exports for convenience
pub use json::*;
pub use value::*;
