//! Execution scope handed to resolver callables.

use weft_types::Value;

use crate::interpreter::eval::{EvalState, Resolution};
use crate::interpreter::EvalError;

/// What a resolver callable can reach while it runs: the optional config and
/// parent handles its registration asked for, and the ability to push text
/// back through the grammar.
pub struct ResolverScope<'a, 'b> {
    pub(crate) resolution: &'a Resolution<'a>,
    pub(crate) state: &'b mut EvalState,
    pub(crate) config: Option<Value>,
    pub(crate) parent: Option<Value>,
}

impl ResolverScope<'_, '_> {
    /// Re-apply the full element grammar to `text` and resolve the result,
    /// sharing this call's depth budget and cycle signatures. This is how
    /// `env` turns a variable's text into lists, dicts, or further
    /// interpolations.
    pub fn decode_element(&mut self, text: &str) -> Result<Value, EvalError> {
        let node = crate::parser::parse_element(text)?;
        self.resolution.eval(&node, self.state)
    }

    /// The configuration root, when registered with `pass_config`.
    pub fn config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    /// The parent container of the resolving node, when registered with
    /// `pass_parent`.
    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_ref()
    }
}
