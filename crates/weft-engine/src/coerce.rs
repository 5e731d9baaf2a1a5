//! Literal coercion — the one place an unquoted token run becomes a typed
//! value.
//!
//! The lexer classifies runs with the same `is_int`/`is_float` grammars used
//! here, so typing rules are never duplicated across grammar rules. Applied
//! to resolver-argument primitives and to external scalars reinterpreted as
//! literals.

use std::sync::OnceLock;

use regex::Regex;
use weft_types::Value;

// Underscores are permitted as digit separators, never leading or doubled.
const UINT: &str = r"(?:0|[1-9](?:_?[0-9])*)";

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^[+-]?{UINT}$")).expect("int pattern is valid")
    })
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let frac = r"[0-9](?:_?[0-9])*";
        let point = format!(r"(?:{UINT}?\.{frac}|{UINT}\.)");
        let exp = format!(r"(?:[eE][+-]?{UINT})");
        Regex::new(&format!(
            r"^[+-]?(?:{point}{exp}?|{UINT}{exp}|[iI][nN][fF]|[nN][aA][nN])$"
        ))
        .expect("float pattern is valid")
    })
}

/// Full match against the integer grammar.
pub fn is_int(text: &str) -> bool {
    int_re().is_match(text)
}

/// Full match against the float grammar (`inf`/`nan` included).
pub fn is_float(text: &str) -> bool {
    float_re().is_match(text)
}

/// Classify and decode a raw literal run into a typed value.
///
/// Priority order: `null`, then `true`/`false` (all case-insensitive), then
/// the integer grammar, then the float grammar; anything else is a string
/// with its escape sequences decoded.
pub fn coerce(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if raw.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else if is_int(raw) {
        parse_int(raw)
    } else if is_float(raw) {
        Value::Float(parse_float(raw))
    } else {
        Value::String(unescape(raw))
    }
}

/// Parse a run already matched by the integer grammar.
///
/// Values outside the i64 range fall back to a float rather than failing.
fn parse_int(text: &str) -> Value {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    match digits.parse::<i64>() {
        Ok(i) => Value::Int(i),
        Err(_) => Value::Float(parse_float(text)),
    }
}

/// Parse a run already matched by the float grammar.
fn parse_float(text: &str) -> f64 {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (sign, rest) = match cleaned.as_bytes().first() {
        Some(b'-') => (-1.0, &cleaned[1..]),
        Some(b'+') => (1.0, &cleaned[1..]),
        _ => (1.0, cleaned.as_str()),
    };
    if rest.eq_ignore_ascii_case("inf") {
        return sign * f64::INFINITY;
    }
    if rest.eq_ignore_ascii_case("nan") {
        return f64::NAN;
    }
    sign * rest.parse::<f64>().unwrap_or(f64::NAN)
}

/// Decode escape sequences in a literal run.
///
/// `\\` becomes `\`, `\${` becomes `${`, and the argument-mode escapes
/// (`\'`, `\"`, `\,`, `\:`, `\{`, `\}`, `\[`, `\]`, `\ `, escaped tab) become
/// their literal character. A backslash before anything else stays literal.
pub fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b'\\' => {
                    out.push('\\');
                    i += 2;
                    continue;
                }
                b'$' if bytes.get(i + 2) == Some(&b'{') => {
                    out.push_str("${");
                    i += 3;
                    continue;
                }
                b'\'' | b'"' | b',' | b':' | b'{' | b'}' | b'[' | b']' | b' ' | b'\t' => {
                    out.push(bytes[i + 1] as char);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        let ch = raw[i..].chars().next().expect("index is on a char boundary");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}
