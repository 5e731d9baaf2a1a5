//! Resolver registry and built-in resolver behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use weft_engine::{
    resolve, ConfigTree, Context, EvalError, PathPart, ResolverError, ResolverOptions,
    ResolverRegistry, ResolverScope, Value,
};

fn map(pairs: Vec<(&str, Value)>) -> Value {
    let mut entries = IndexMap::new();
    for (key, value) in pairs {
        entries.insert(key.to_string(), value);
    }
    Value::Map(entries)
}

fn empty_tree() -> Value {
    map(vec![])
}

// =============================================================================
// Cache semantics
// =============================================================================

#[test]
fn cached_resolver_invoked_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut registry = ResolverRegistry::new();
    registry.register_simple("count", ResolverOptions::default(), move |_args| {
        Ok(Value::Int(seen.fetch_add(1, Ordering::SeqCst) as i64))
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${count:x}", &ctx).unwrap(), Value::Int(0));
    assert_eq!(resolve("${count:x}", &ctx).unwrap(), Value::Int(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cache_keys_on_materialized_args() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut registry = ResolverRegistry::new();
    registry.register_simple("count", ResolverOptions::default(), move |_args| {
        Ok(Value::Int(seen.fetch_add(1, Ordering::SeqCst) as i64))
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${count:a}", &ctx).unwrap(), Value::Int(0));
    assert_eq!(resolve("${count:b}", &ctx).unwrap(), Value::Int(1));
    assert_eq!(resolve("${count:a}", &ctx).unwrap(), Value::Int(0));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn no_cache_resolver_invoked_every_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut registry = ResolverRegistry::new();
    registry.register_simple("tick", ResolverOptions::default().no_cache(), move |_args| {
        Ok(Value::Int(seen.fetch_add(1, Ordering::SeqCst) as i64))
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${tick:}", &ctx).unwrap(), Value::Int(0));
    assert_eq!(resolve("${tick:}", &ctx).unwrap(), Value::Int(1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_resolution_is_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut registry = ResolverRegistry::new();
    registry.register_simple("flaky", ResolverOptions::default(), move |_args| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ResolverError::message("transient"))
        } else {
            Ok(Value::String("recovered".into()))
        }
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert!(matches!(
        resolve("${flaky:x}", &ctx),
        Err(EvalError::ResolverFailed { .. })
    ));
    // Retrying after the failure reaches the callable again.
    assert_eq!(
        resolve("${flaky:x}", &ctx).unwrap(),
        Value::String("recovered".into())
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Lookup and naming
// =============================================================================

#[test]
fn unknown_resolver_is_named_in_error() {
    let registry = ResolverRegistry::new();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    match resolve("${not_registered:1}", &ctx) {
        Err(EvalError::UnsupportedResolver { name }) => assert_eq!(name, "not_registered"),
        other => panic!("expected UnsupportedResolver, got {other:?}"),
    }
}

#[test]
fn dotted_resolver_name() {
    let mut registry = ResolverRegistry::new();
    registry.register_simple("ns.upper", ResolverOptions::default(), |args| match args {
        [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
        _ => Err(ResolverError::message("expected one string")),
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${ns.upper:abc}", &ctx).unwrap(),
        Value::String("ABC".into())
    );
}

#[test]
fn interpolated_resolver_name() {
    let mut registry = ResolverRegistry::new();
    registry.register_simple("upper", ResolverOptions::default(), |args| match args {
        [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
        _ => Err(ResolverError::message("expected one string")),
    });

    let tree = map(vec![("which", Value::String("upper".into()))]);
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${${which}:abc}", &ctx).unwrap(),
        Value::String("ABC".into())
    );
}

#[test]
fn registering_same_name_replaces_entry() {
    let mut registry = ResolverRegistry::new();
    registry.register_simple("r", ResolverOptions::default(), |_| Ok(Value::Int(1)));
    registry.register_simple("r", ResolverOptions::default(), |_| Ok(Value::Int(2)));

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${r:}", &ctx).unwrap(), Value::Int(2));
}

#[test]
fn callable_failure_is_wrapped_with_resolver_name() {
    let mut registry = ResolverRegistry::new();
    registry.register_simple("boom", ResolverOptions::default(), |_| {
        Err(ResolverError::message("exploded"))
    });

    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    match resolve("${boom:}", &ctx) {
        Err(EvalError::ResolverFailed { name, cause }) => {
            assert_eq!(name, "boom");
            assert_eq!(cause.to_string(), "exploded");
        }
        other => panic!("expected ResolverFailed, got {other:?}"),
    }
}

// =============================================================================
// Config and parent handles
// =============================================================================

#[test]
fn parent_handle_reaches_siblings() {
    let mut registry = ResolverRegistry::new();
    registry.register(
        "sibling_port",
        ResolverOptions::default().with_parent(),
        |_args: &[Value], scope: &mut ResolverScope<'_, '_>| {
            let parent = scope.parent().ok_or_else(|| ResolverError::message("no parent"))?;
            parent
                .get(&[PathPart::Key("port".into())])
                .ok_or_else(|| ResolverError::message("no port sibling"))
        },
    );

    let tree = map(vec![(
        "server",
        map(vec![
            ("host", Value::String("${sibling_port:}".into())),
            ("port", Value::Int(8080)),
        ]),
    )]);
    let ctx = Context::new(&tree, &registry).at_path(vec![
        PathPart::Key("server".into()),
        PathPart::Key("host".into()),
    ]);
    assert_eq!(resolve("${sibling_port:}", &ctx).unwrap(), Value::Int(8080));
}

#[test]
fn config_handle_reaches_root() {
    let mut registry = ResolverRegistry::new();
    registry.register(
        "root_name",
        ResolverOptions::default().with_config(),
        |_args: &[Value], scope: &mut ResolverScope<'_, '_>| {
            let config = scope.config().ok_or_else(|| ResolverError::message("no config"))?;
            config
                .get(&[PathPart::Key("name".into())])
                .ok_or_else(|| ResolverError::message("no name"))
        },
    );

    let tree = map(vec![("name", Value::String("prod".into()))]);
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${root_name:}", &ctx).unwrap(),
        Value::String("prod".into())
    );
}

// =============================================================================
// Built-in: env
// =============================================================================

#[test]
fn env_reads_the_environment() {
    std::env::set_var("WEFT_TEST_BASIC", "hello");
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${env:WEFT_TEST_BASIC}", &ctx).unwrap(),
        Value::String("hello".into())
    );
}

#[test]
fn env_is_uncached_and_sees_updates() {
    std::env::set_var("WEFT_TEST_TICK", "1");
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${env:WEFT_TEST_TICK}", &ctx).unwrap(), Value::Int(1));
    std::env::set_var("WEFT_TEST_TICK", "2");
    assert_eq!(resolve("${env:WEFT_TEST_TICK}", &ctx).unwrap(), Value::Int(2));
}

#[test]
fn env_missing_without_default_fails() {
    std::env::remove_var("WEFT_TEST_MISSING");
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    match resolve("${env:WEFT_TEST_MISSING}", &ctx) {
        Err(EvalError::MissingEnvVariable { name }) => assert_eq!(name, "WEFT_TEST_MISSING"),
        other => panic!("expected MissingEnvVariable, got {other:?}"),
    }
}

#[test]
fn env_missing_with_default_returns_default() {
    std::env::remove_var("WEFT_TEST_DEFAULTED");
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${env:WEFT_TEST_DEFAULTED,fallback}", &ctx).unwrap(),
        Value::String("fallback".into())
    );
}

#[test]
fn env_text_goes_through_the_element_grammar() {
    std::env::set_var("WEFT_TEST_STRUCTURED", "[1, 2, {foo: 3}]");
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    let expected = Value::List(vec![
        Value::Int(1),
        Value::Int(2),
        map(vec![("foo", Value::Int(3))]),
    ]);
    assert_eq!(resolve("${env:WEFT_TEST_STRUCTURED}", &ctx).unwrap(), expected);
}

#[test]
fn env_text_may_interpolate_back_into_the_tree() {
    std::env::set_var("WEFT_TEST_REF", "${greeting}");
    let registry = ResolverRegistry::with_builtins();
    let tree = map(vec![("greeting", Value::String("hi".into()))]);
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${env:WEFT_TEST_REF}", &ctx).unwrap(),
        Value::String("hi".into())
    );
}

// =============================================================================
// Built-in: decode
// =============================================================================

#[test]
fn decode_reparses_strings() {
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(
        resolve("${decode:'[1, 2]'}", &ctx).unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn decode_null_passes_through() {
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert_eq!(resolve("${decode:null}", &ctx).unwrap(), Value::Null);
}

#[test]
fn decode_rejects_non_strings() {
    let registry = ResolverRegistry::with_builtins();
    let tree = empty_tree();
    let ctx = Context::new(&tree, &registry);
    assert!(matches!(
        resolve("${decode:[1]}", &ctx),
        Err(EvalError::ResolverFailed { .. })
    ));
}
