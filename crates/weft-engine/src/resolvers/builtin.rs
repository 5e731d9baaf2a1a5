//! Built-in resolvers.

use weft_types::Value;

use super::context::ResolverScope;
use super::registry::{ResolverError, ResolverOptions, ResolverRegistry};

/// Install the built-in resolvers into `registry`.
///
/// Both depend on state outside the cache key (the process environment, the
/// tree), so they are registered without caching.
pub fn register_builtins(registry: &mut ResolverRegistry) {
    registry.register("env", ResolverOptions::default().no_cache(), env);
    registry.register(
        "decode",
        ResolverOptions::default().typed_args().no_cache(),
        decode,
    );
}

/// `${env:VAR}` / `${env:VAR,default}` — process environment lookup.
///
/// The variable's text goes back through the full element grammar, so it may
/// itself contain lists, dicts, or nested interpolations. When the variable
/// is absent the default argument is returned as given, or the lookup fails
/// if there is none.
fn env(args: &[Value], scope: &mut ResolverScope<'_, '_>) -> Result<Value, ResolverError> {
    let name = match args {
        [Value::String(name)] | [Value::String(name), _] => name.clone(),
        _ => {
            return Err(ResolverError::message(
                "env expects a variable name and an optional default",
            ))
        }
    };
    match std::env::var(&name) {
        Ok(text) => scope.decode_element(&text).map_err(ResolverError::from),
        Err(_) => match args.get(1) {
            Some(default) => Ok(default.clone()),
            None => Err(ResolverError::MissingEnvVariable(name)),
        },
    }
}

/// `${decode:expr}` — re-parse a string through the element grammar and
/// resolve it. `null` passes through unchanged.
fn decode(args: &[Value], scope: &mut ResolverScope<'_, '_>) -> Result<Value, ResolverError> {
    match args {
        [Value::Null] => Ok(Value::Null),
        [Value::String(text)] => scope.decode_element(text).map_err(ResolverError::from),
        [other] => Err(ResolverError::message(format!(
            "decode can only take strings or null, got {}",
            other.type_name()
        ))),
        _ => Err(ResolverError::message("decode expects exactly one argument")),
    }
}
