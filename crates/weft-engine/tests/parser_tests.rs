//! Parser tests: AST shapes for the interpolation grammar.

use weft_engine::ast::{DictEntry, KeyPath, Node, ResolverCall, ResolverName, Segment};
use weft_engine::parser::{parse, parse_element, ParseError};

// Small AST constructors to keep expectations readable.

fn lit(text: &str) -> Node {
    Node::Literal(text.to_string())
}

fn key_path(segments: Vec<Segment>) -> Node {
    Node::KeyPath(KeyPath { up: 0, segments })
}

fn relative(up: usize, segments: Vec<Segment>) -> Node {
    Node::KeyPath(KeyPath { up, segments })
}

fn seg(key: &str) -> Segment {
    Segment::Key(key.to_string())
}

fn resolver(name: &str, args: Vec<Node>) -> Node {
    Node::Resolver(ResolverCall {
        name: ResolverName::Name(name.to_string()),
        args,
    })
}

fn quoted(inner: Node) -> Node {
    Node::Quoted(Box::new(inner))
}

// =============================================================================
// Toplevel values
// =============================================================================

#[test]
fn toplevel_plain_text() {
    assert_eq!(parse("hello world").unwrap(), lit("hello world"));
}

#[test]
fn toplevel_empty() {
    assert_eq!(parse("").unwrap(), lit(""));
}

#[test]
fn toplevel_single_interpolation_collapses() {
    assert_eq!(parse("${a}").unwrap(), key_path(vec![seg("a")]));
}

#[test]
fn toplevel_mixed_concat() {
    assert_eq!(
        parse("a ${b} c").unwrap(),
        Node::Concat(vec![lit("a "), key_path(vec![seg("b")]), lit(" c")])
    );
}

#[test]
fn toplevel_escapes_stay_encoded() {
    // Unescaping happens at evaluation, not parse time.
    assert_eq!(parse(r"\${x}").unwrap(), lit(r"\${x}"));
}

// =============================================================================
// Key paths
// =============================================================================

#[test]
fn key_path_dotted_and_indexed() {
    assert_eq!(
        parse("${a.b.0}").unwrap(),
        key_path(vec![seg("a"), seg("b"), Segment::Index(0)])
    );
}

#[test]
fn key_path_whitespace_insignificant() {
    assert_eq!(parse("${ a.b }").unwrap(), key_path(vec![seg("a"), seg("b")]));
}

#[test]
fn key_path_relative() {
    assert_eq!(parse("${.sib}").unwrap(), relative(1, vec![seg("sib")]));
    assert_eq!(parse("${..up.x}").unwrap(), relative(2, vec![seg("up"), seg("x")]));
}

#[test]
fn key_path_non_identifier_segment() {
    assert_eq!(parse("${a-b.c_d}").unwrap(), key_path(vec![seg("a-b"), seg("c_d")]));
}

#[test]
fn key_path_nested_interpolation_segment() {
    assert_eq!(
        parse("${a.${b}.c}").unwrap(),
        key_path(vec![
            seg("a"),
            Segment::Inter(Box::new(key_path(vec![seg("b")]))),
            seg("c"),
        ])
    );
}

// =============================================================================
// Resolver calls
// =============================================================================

#[test]
fn resolver_zero_args() {
    assert_eq!(parse("${r:}").unwrap(), resolver("r", vec![]));
}

#[test]
fn resolver_primitive_args() {
    assert_eq!(
        parse("${r:1,two,3.5}").unwrap(),
        resolver("r", vec![lit("1"), lit("two"), lit("3.5")])
    );
}

#[test]
fn resolver_dotted_name() {
    assert_eq!(parse("${oc.env:VAR}").unwrap(), resolver("oc.env", vec![lit("VAR")]));
}

#[test]
fn resolver_interpolated_name() {
    assert_eq!(
        parse("${${which}:x}").unwrap(),
        Node::Resolver(ResolverCall {
            name: ResolverName::Inter(Box::new(key_path(vec![seg("which")]))),
            args: vec![lit("x")],
        })
    );
}

#[test]
fn resolver_arg_whitespace_trimmed_outside_runs() {
    // Leading/trailing whitespace around an item is stripped; interior
    // whitespace is content.
    assert_eq!(
        parse("${r: a b ,c}").unwrap(),
        resolver("r", vec![lit("a b"), lit("c")])
    );
}

#[test]
fn resolver_colon_inside_arg() {
    assert_eq!(parse("${r:a:b}").unwrap(), resolver("r", vec![lit("a:b")]));
}

#[test]
fn resolver_arg_mixing_text_and_interpolation() {
    assert_eq!(
        parse("${r:pre${x}post}").unwrap(),
        resolver(
            "r",
            vec![Node::Concat(vec![
                lit("pre"),
                key_path(vec![seg("x")]),
                lit("post"),
            ])]
        )
    );
}

// =============================================================================
// Lists, dicts, quoted items
// =============================================================================

#[test]
fn list_items() {
    assert_eq!(
        parse("${r:[1, ${x}]}").unwrap(),
        resolver(
            "r",
            vec![Node::List(vec![lit("1"), key_path(vec![seg("x")])])]
        )
    );
}

#[test]
fn empty_list_and_dict() {
    assert_eq!(parse("${r:[]}").unwrap(), resolver("r", vec![Node::List(vec![])]));
    assert_eq!(parse("${r:{}}").unwrap(), resolver("r", vec![Node::Dict(vec![])]));
}

#[test]
fn dict_entries() {
    assert_eq!(
        parse("${r:{a: 1, b: ${x}}}").unwrap(),
        resolver(
            "r",
            vec![Node::Dict(vec![
                DictEntry { key: lit("a"), value: lit("1") },
                DictEntry { key: lit("b"), value: key_path(vec![seg("x")]) },
            ])]
        )
    );
}

#[test]
fn dict_interpolated_key() {
    assert_eq!(
        parse("${r:{${k}: 2}}").unwrap(),
        resolver(
            "r",
            vec![Node::Dict(vec![DictEntry {
                key: key_path(vec![seg("k")]),
                value: lit("2"),
            }])]
        )
    );
}

#[test]
fn nested_containers() {
    assert_eq!(
        parse("${r:[1, [2, 3]]}").unwrap(),
        resolver(
            "r",
            vec![Node::List(vec![
                lit("1"),
                Node::List(vec![lit("2"), lit("3")]),
            ])]
        )
    );
}

#[test]
fn quoted_item_plain() {
    assert_eq!(
        parse("${r:'a b'}").unwrap(),
        resolver("r", vec![quoted(lit("a b"))])
    );
}

#[test]
fn quoted_item_with_interpolation() {
    assert_eq!(
        parse("${r:'v=${x}'}").unwrap(),
        resolver(
            "r",
            vec![quoted(Node::Concat(vec![lit("v="), key_path(vec![seg("x")])]))]
        )
    );
}

// =============================================================================
// Element entry point
// =============================================================================

#[test]
fn element_primitive() {
    assert_eq!(parse_element("123").unwrap(), lit("123"));
}

#[test]
fn element_list() {
    assert_eq!(
        parse_element("[1, 2]").unwrap(),
        Node::List(vec![lit("1"), lit("2")])
    );
}

#[test]
fn element_empty_input() {
    assert_eq!(parse_element("").unwrap(), lit(""));
}

#[test]
fn element_trailing_garbage_rejected() {
    assert!(matches!(
        parse_element("[1] x"),
        Err(ParseError::Unexpected { expected: "end of input", .. })
    ));
}

// =============================================================================
// Grammar violations
// =============================================================================

#[test]
fn error_empty_interpolation() {
    assert!(matches!(parse("${}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_empty_resolver_name() {
    assert!(matches!(parse("${:x}"), Err(ParseError::EmptyResolverName { .. })));
}

#[test]
fn error_non_identifier_resolver_name() {
    assert!(matches!(
        parse("${a-b:x}"),
        Err(ParseError::InvalidResolverName { .. })
    ));
}

#[test]
fn error_relative_resolver_name() {
    assert!(matches!(
        parse("${.r:x}"),
        Err(ParseError::InvalidResolverName { .. })
    ));
}

#[test]
fn error_trailing_comma_in_args() {
    assert!(matches!(parse("${r:1,}"), Err(ParseError::TrailingComma { .. })));
}

#[test]
fn error_trailing_comma_in_list() {
    assert!(matches!(parse("${r:[1,]}"), Err(ParseError::TrailingComma { .. })));
}

#[test]
fn error_trailing_comma_in_dict() {
    assert!(matches!(
        parse("${r:{a: 1,}}"),
        Err(ParseError::TrailingComma { .. })
    ));
}

#[test]
fn error_adjacent_key_segments() {
    assert!(matches!(parse("${a b}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_missing_dict_colon() {
    assert!(matches!(parse("${r:{a 1}}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_dangling_dot() {
    assert!(matches!(parse("${a.}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_quote_after_primitive() {
    assert!(matches!(parse("${r:a'b'}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_unbalanced_bracket() {
    assert!(matches!(parse("${r:[1}"), Err(ParseError::Unexpected { .. })));
}

#[test]
fn error_lex_errors_propagate() {
    assert!(matches!(parse("${a"), Err(ParseError::Lex(_))));
}

#[test]
fn error_bracket_nesting_bounded() {
    let input = "[".repeat(300);
    assert!(matches!(
        parse_element(&input),
        Err(ParseError::NestingTooDeep { .. })
    ));
}
