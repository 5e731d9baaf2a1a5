//! AST evaluation for weft.
//!
//! The engine takes parsed interpolation expressions and reduces them to
//! typed values. Key paths are resolved through the external tree accessor,
//! resolver calls through the registry. Recursion is guarded by an explicit
//! depth limit, and reference cycles through key paths by an explicit
//! active-signature stack — neither relies on the native call stack alone.

use std::mem;

use indexmap::IndexMap;
use tracing::{debug, trace};
use weft_types::{value_to_json, Value};

use crate::ast::{DictEntry, KeyPath, Node, ResolverCall, ResolverName, Segment};
use crate::coerce;
use crate::parser::{self, ParseError};
use crate::resolvers::{ResolverEntry, ResolverError, ResolverOptions, ResolverRegistry, ResolverScope};

use super::tree::{join_path, ConfigTree, PathPart};

/// Default bound on evaluation recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Errors that can occur during resolution.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Re-parsing a raw value failed (lex errors nest inside).
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Resolver name with no registry entry.
    #[error("unsupported resolver {name:?}")]
    UnsupportedResolver { name: String },
    /// A key path segment is absent, or a non-container was navigated into.
    #[error("key not found: {path:?}")]
    KeyNotFound { path: String },
    /// A key path re-entered a value that is currently being resolved.
    #[error("recursive interpolation through {path:?}")]
    RecursiveInterpolation { path: String },
    /// Nesting exceeded the configured depth bound.
    #[error("recursion limit exceeded (max depth {limit})")]
    RecursionLimitExceeded { limit: usize },
    /// `env` without a default and the variable absent.
    #[error("environment variable {name:?} not found")]
    MissingEnvVariable { name: String },
    /// A resolver callable failed; the cause carries its error.
    #[error("resolver {name:?} failed")]
    ResolverFailed {
        name: String,
        #[source]
        cause: ResolverError,
    },
    /// A segment, resolver name, or dict key of an unusable type or shape.
    #[error("{message}")]
    InvalidKey { message: String },
}

/// Everything a resolution call needs from its surroundings.
pub struct Context<'a> {
    /// Key lookup into the owning configuration tree.
    pub tree: &'a dyn ConfigTree,
    /// Resolver registry, owned by the configuration root.
    pub registry: &'a ResolverRegistry,
    /// Path of the value being resolved. Relative references and parent
    /// handles are anchored here; empty for a detached value.
    pub current_path: Vec<PathPart>,
    /// Bound on evaluation recursion depth.
    pub max_depth: usize,
}

impl<'a> Context<'a> {
    pub fn new(tree: &'a dyn ConfigTree, registry: &'a ResolverRegistry) -> Self {
        Self {
            tree,
            registry,
            current_path: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Anchor resolution at the given tree path.
    pub fn at_path(mut self, path: Vec<PathPart>) -> Self {
        self.current_path = path;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Resolve a raw configuration value.
///
/// A value that is pure literal text, or that mixes text with
/// interpolations, resolves to a string (with escapes decoded). Only when
/// the entire input is exactly one interpolation does its typed value pass
/// through unchanged.
///
/// # Errors
///
/// All-or-nothing: a failing sub-expression aborts the whole call. Failed
/// resolver invocations are never cached.
pub fn resolve(raw: &str, ctx: &Context<'_>) -> Result<Value, EvalError> {
    let resolution = Resolution { ctx };
    let mut state = EvalState::new(ctx.current_path.clone());
    resolution.eval_raw(raw, &mut state)
}

/// Resolve an isolated argument/list/dict expression to its typed value.
///
/// Unlike [`resolve`], a bare literal here goes through coercion: `123`
/// yields an int, `[1, 2]` a list.
pub fn resolve_element(raw: &str, ctx: &Context<'_>) -> Result<Value, EvalError> {
    let node = parser::parse_element(raw)?;
    let resolution = Resolution { ctx };
    let mut state = EvalState::new(ctx.current_path.clone());
    resolution.eval(&node, &mut state)
}

/// Per-call mutable state: the path of the value under resolution, the
/// active cycle signatures, and the recursion depth.
pub(crate) struct EvalState {
    path: Vec<PathPart>,
    active: Vec<String>,
    depth: usize,
}

impl EvalState {
    fn new(path: Vec<PathPart>) -> Self {
        Self { path, active: Vec::new(), depth: 0 }
    }
}

/// The engine: immutable surroundings for one resolution call.
pub(crate) struct Resolution<'a> {
    ctx: &'a Context<'a>,
}

impl Resolution<'_> {
    /// Parse and evaluate a raw value under the toplevel rule.
    fn eval_raw(&self, raw: &str, state: &mut EvalState) -> Result<Value, EvalError> {
        let node = parser::parse(raw)?;
        match &node {
            // Pure literal text stays a string; coercion is for element
            // contexts, not toplevel text.
            Node::Literal(text) => Ok(Value::String(coerce::unescape(text))),
            other => self.eval(other, state),
        }
    }

    /// Evaluate one AST node, depth-guarded.
    pub(crate) fn eval(&self, node: &Node, state: &mut EvalState) -> Result<Value, EvalError> {
        if state.depth >= self.ctx.max_depth {
            return Err(EvalError::RecursionLimitExceeded { limit: self.ctx.max_depth });
        }
        state.depth += 1;
        let result = self.eval_inner(node, state);
        state.depth -= 1;
        result
    }

    fn eval_inner(&self, node: &Node, state: &mut EvalState) -> Result<Value, EvalError> {
        trace!(node = ?std::mem::discriminant(node), depth = state.depth, "eval");
        match node {
            Node::Literal(text) => Ok(coerce::coerce(text)),
            Node::Concat(_) | Node::Quoted(_) => {
                Ok(Value::String(self.eval_stringly(node, state)?))
            }
            Node::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, state)?);
                }
                Ok(Value::List(values))
            }
            Node::Dict(entries) => self.eval_dict(entries, state),
            Node::KeyPath(path) => self.eval_key_path(path, state),
            Node::Resolver(call) => self.eval_resolver(call, state),
        }
    }

    /// Evaluate a node to its string form: literal runs are unescaped
    /// verbatim (never coerced and re-rendered), everything else resolves
    /// and takes its canonical string form.
    fn eval_stringly(&self, node: &Node, state: &mut EvalState) -> Result<String, EvalError> {
        match node {
            Node::Literal(text) => Ok(coerce::unescape(text)),
            Node::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&self.eval_stringly(part, state)?);
                }
                Ok(out)
            }
            Node::Quoted(inner) => self.eval_stringly(inner, state),
            other => Ok(self.eval(other, state)?.to_canonical_string()),
        }
    }

    fn eval_dict(
        &self,
        entries: &[DictEntry],
        state: &mut EvalState,
    ) -> Result<Value, EvalError> {
        let mut map = IndexMap::with_capacity(entries.len());
        for DictEntry { key, value } in entries {
            let key = match key {
                Node::Literal(text) => text.clone(),
                other => dict_key(self.eval(other, state)?)?,
            };
            let value = self.eval(value, state)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn eval_key_path(&self, path: &KeyPath, state: &mut EvalState) -> Result<Value, EvalError> {
        let mut resolved: Vec<PathPart> = Vec::with_capacity(path.segments.len());
        if path.up > 0 {
            // Leading dots anchor at the enclosing container and walk up.
            if path.up > state.path.len() {
                return Err(EvalError::InvalidKey {
                    message: format!(
                        "relative reference ${{{path}}} points above the root (resolving at {:?})",
                        join_path(&state.path)
                    ),
                });
            }
            resolved.extend_from_slice(&state.path[..state.path.len() - path.up]);
        }
        for segment in &path.segments {
            match segment {
                Segment::Key(key) => resolved.push(PathPart::Key(key.clone())),
                Segment::Index(index) => resolved.push(PathPart::Index(*index)),
                Segment::Inter(node) => {
                    let value = self.eval(node, state)?;
                    resolved.push(match value {
                        Value::String(s) => PathPart::Key(s),
                        Value::Int(i) if i >= 0 => PathPart::Index(i as usize),
                        other => {
                            return Err(EvalError::InvalidKey {
                                message: format!(
                                    "an interpolation used as a config key must resolve \
                                     to a string or a non-negative int, got {}",
                                    other.type_name()
                                ),
                            })
                        }
                    });
                }
            }
        }

        let dotted = join_path(&resolved);
        trace!(path = %dotted, "navigating key path");
        let Some(value) = self.ctx.tree.get(&resolved) else {
            return Err(EvalError::KeyNotFound { path: dotted });
        };

        // A fetched string that itself contains an interpolation marker is
        // re-resolved at its own path. This is the one place reference
        // cycles can arise, so the signature stack guards it.
        if let Value::String(text) = &value {
            if text.contains("${") {
                if state.active.iter().any(|signature| *signature == dotted) {
                    return Err(EvalError::RecursiveInterpolation { path: dotted });
                }
                state.active.push(dotted);
                let saved = mem::replace(&mut state.path, resolved);
                let result = self.eval_raw(text, state);
                state.path = saved;
                state.active.pop();
                return result;
            }
        }
        Ok(value)
    }

    fn eval_resolver(
        &self,
        call: &ResolverCall,
        state: &mut EvalState,
    ) -> Result<Value, EvalError> {
        let name = match &call.name {
            ResolverName::Name(name) => name.clone(),
            ResolverName::Inter(node) => match self.eval(node, state)? {
                Value::String(s) => s,
                other => {
                    return Err(EvalError::InvalidKey {
                        message: format!(
                            "a resolver name must resolve to a string, got {}",
                            other.type_name()
                        ),
                    })
                }
            },
        };
        let Some(entry) = self.ctx.registry.lookup(&name) else {
            return Err(EvalError::UnsupportedResolver { name });
        };
        let options = entry.options();

        // Arguments materialize before lookup or invocation: nested
        // interpolations always resolve first.
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(if options.args_as_strings {
                Value::String(self.eval_stringly(arg, state)?)
            } else {
                self.eval(arg, state)?
            });
        }

        let config = if options.pass_config { self.ctx.tree.get(&[]) } else { None };
        let parent = if options.pass_parent {
            self.ctx.tree.get_parent(&state.path)
        } else {
            None
        };

        if !options.use_cache {
            return self.invoke(entry, &name, &args, config, parent, state);
        }

        let key = self.cache_key(&name, &args, options, state);
        // The guard is held across get-or-compute: at most one invocation of
        // this entry's callable runs at a time, and concurrent callers for
        // the same key observe the first result instead of re-invoking.
        let mut cache = entry.lock_cache();
        if let Some(hit) = cache.get(&key) {
            debug!(resolver = %name, "resolver cache hit");
            return Ok(hit.clone());
        }
        let value = self.invoke(entry, &name, &args, config, parent, state)?;
        cache.insert(key, value.clone());
        Ok(value)
    }

    fn invoke(
        &self,
        entry: &ResolverEntry,
        name: &str,
        args: &[Value],
        config: Option<Value>,
        parent: Option<Value>,
        state: &mut EvalState,
    ) -> Result<Value, EvalError> {
        debug!(resolver = %name, argc = args.len(), "invoking resolver");
        let mut scope = ResolverScope {
            resolution: self,
            state,
            config,
            parent,
        };
        match entry.call(args, &mut scope) {
            Ok(value) => Ok(value),
            // `env`'s missing-variable failure is first-class, not a wrap.
            Err(ResolverError::MissingEnvVariable(var)) => {
                Err(EvalError::MissingEnvVariable { name: var })
            }
            Err(cause) => Err(EvalError::ResolverFailed {
                name: name.to_string(),
                cause,
            }),
        }
    }

    /// `(name, materialized args, identity of config/parent if used)`.
    fn cache_key(
        &self,
        name: &str,
        args: &[Value],
        options: ResolverOptions,
        state: &EvalState,
    ) -> String {
        let rendered = serde_json::Value::Array(args.iter().map(value_to_json).collect());
        let mut key = format!("{name}:{rendered}");
        if options.pass_config {
            let identity = self.ctx.tree as *const dyn ConfigTree as *const () as usize;
            key.push_str(&format!("#config@{identity:x}"));
        }
        if options.pass_parent {
            let path = &state.path;
            key.push_str("#parent@");
            key.push_str(&join_path(&path[..path.len().saturating_sub(1)]));
        }
        key
    }
}

/// Canonicalize a resolved dict key. NaN keys are rejected (they are never
/// equal to themselves); containers make no sense as keys.
fn dict_key(value: Value) -> Result<String, EvalError> {
    match value {
        Value::Float(f) if f.is_nan() => Err(EvalError::InvalidKey {
            message: "cannot use nan as a dict key".to_string(),
        }),
        Value::List(_) | Value::Map(_) => Err(EvalError::InvalidKey {
            message: format!("dict keys must be scalars, got {}", value.type_name()),
        }),
        other => Ok(other.to_canonical_string()),
    }
}
