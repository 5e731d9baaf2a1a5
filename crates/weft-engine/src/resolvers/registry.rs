//! Resolver registry: name → (callable, options), with a per-entry result
//! cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use weft_types::Value;

use super::context::ResolverScope;
use crate::interpreter::EvalError;

/// Failure reported by a resolver callable.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// `env` with no default and the variable absent.
    #[error("environment variable {0:?} not found")]
    MissingEnvVariable(String),
    /// A nested resolution performed by the callable failed.
    #[error(transparent)]
    Eval(Box<EvalError>),
    /// Any other failure.
    #[error("{0}")]
    Message(String),
}

impl ResolverError {
    pub fn message(message: impl Into<String>) -> Self {
        ResolverError::Message(message.into())
    }
}

impl From<EvalError> for ResolverError {
    fn from(error: EvalError) -> Self {
        ResolverError::Eval(Box::new(error))
    }
}

/// Per-resolver registration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Materialize each argument to its string form instead of its typed
    /// value.
    pub args_as_strings: bool,
    /// Memoize successful results keyed on the materialized arguments.
    pub use_cache: bool,
    /// Hand the callable the configuration root.
    pub pass_config: bool,
    /// Hand the callable the parent container of the resolving node.
    pub pass_parent: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            args_as_strings: true,
            use_cache: true,
            pass_config: false,
            pass_parent: false,
        }
    }
}

impl ResolverOptions {
    /// Arguments arrive fully typed (lists and dicts resolved element-wise).
    pub fn typed_args(mut self) -> Self {
        self.args_as_strings = false;
        self
    }

    /// Invoke the callable on every access instead of memoizing.
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_config(mut self) -> Self {
        self.pass_config = true;
        self
    }

    pub fn with_parent(mut self) -> Self {
        self.pass_parent = true;
        self
    }
}

/// The canonical adapter shape every registered callable is wrapped into:
/// materialized arguments, then whatever handles the options requested on
/// the scope. The engine only ever invokes this one signature.
type AdapterFn =
    Box<dyn Fn(&[Value], &mut ResolverScope<'_, '_>) -> Result<Value, ResolverError> + Send + Sync>;

/// One registered resolver: the adapted callable, its options, and its
/// result cache.
pub struct ResolverEntry {
    adapter: AdapterFn,
    options: ResolverOptions,
    cache: Mutex<HashMap<String, Value>>,
}

impl ResolverEntry {
    fn new(options: ResolverOptions, adapter: AdapterFn) -> Self {
        Self {
            adapter,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    pub(crate) fn call(
        &self,
        args: &[Value],
        scope: &mut ResolverScope<'_, '_>,
    ) -> Result<Value, ResolverError> {
        (self.adapter)(args, scope)
    }

    /// Exclusive access to this entry's result cache. A poisoned lock is
    /// recovered: the cache only ever holds successfully computed values.
    pub(crate) fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResolverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverEntry")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Name → resolver table. Owned by the configuration root and passed into
/// every resolution call; never a process-wide global.
#[derive(Debug, Default)]
pub struct ResolverRegistry {
    entries: HashMap<String, ResolverEntry>,
}

impl ResolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in resolvers installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register `callable` under `name`. Registration builds the fixed
    /// positional adapter once, so the resolution path never branches on
    /// options. A name registered twice keeps the latest entry.
    pub fn register<F>(&mut self, name: impl Into<String>, options: ResolverOptions, callable: F)
    where
        F: Fn(&[Value], &mut ResolverScope<'_, '_>) -> Result<Value, ResolverError>
            + Send
            + Sync
            + 'static,
    {
        self.entries
            .insert(name.into(), ResolverEntry::new(options, Box::new(callable)));
    }

    /// Register a callable that only needs its materialized arguments.
    pub fn register_simple<F>(
        &mut self,
        name: impl Into<String>,
        options: ResolverOptions,
        callable: F,
    ) where
        F: Fn(&[Value]) -> Result<Value, ResolverError> + Send + Sync + 'static,
    {
        self.register(name, options, move |args, _scope| callable(args));
    }

    pub fn lookup(&self, name: &str) -> Option<&ResolverEntry> {
        self.entries.get(name)
    }
}
