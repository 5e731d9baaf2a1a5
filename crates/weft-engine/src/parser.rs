//! Parser for weft interpolation syntax.
//!
//! Transforms the lexer's token stream into the interpolation AST by
//! recursive descent. Structural closure of every `${...}` is already
//! guaranteed by the lexer's mode stack, so the parser never backtracks; it
//! only checks grammar shape (resolver names, argument sequences, dict
//! entries) and reports the expected construct on a mismatch.

use crate::ast::{DictEntry, KeyPath, Node, ResolverCall, ResolverName, Segment};
use crate::lexer::{self, LexError, Quote, Token, TokenKind};

/// Maximum recursion depth while building the AST.
/// The lexer bounds `${` nesting, but bracket nesting like `[[[[...` does not
/// grow the mode stack, so the parser carries its own guard.
const MAX_PARSE_DEPTH: usize = 256;

/// Error produced while parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found:?} at byte {pos}")]
    Unexpected {
        expected: &'static str,
        found: String,
        pos: usize,
    },
    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: &'static str },
    #[error("empty resolver name at byte {pos}")]
    EmptyResolverName { pos: usize },
    #[error("invalid resolver name {found:?} at byte {pos}")]
    InvalidResolverName { found: String, pos: usize },
    #[error("trailing comma at byte {pos}")]
    TrailingComma { pos: usize },
    #[error("nesting depth exceeded (max {limit})")]
    NestingTooDeep { limit: usize },
}

/// Parse a raw configuration value (text freely mixed with interpolations).
///
/// The result collapses to a single `Literal` when no interpolation is
/// present, and to a single bare interpolation when the value is exactly one
/// interpolation with nothing else.
///
/// # Errors
///
/// Returns `ParseError` on any lexical or grammar violation.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let tokens = lexer::tokenize(input)?;
    Parser::new(tokens).parse_toplevel()
}

/// Parse an isolated argument/list/dict expression (one `Item`).
///
/// Used when an external scalar — e.g. an environment variable's text — is
/// reinterpreted as a structured literal. Empty input parses to an empty
/// literal.
pub fn parse_element(input: &str) -> Result<Node, ParseError> {
    let tokens = lexer::tokenize_element(input)?;
    Parser::new(tokens).parse_single_element()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn take_text(&mut self) -> String {
        let text = self.tokens[self.pos].text.clone();
        self.pos += 1;
        text
    }

    fn skip_ws(&mut self) {
        while self.peek_kind() == Some(TokenKind::Ws) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), ParseError> {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Unexpected {
                expected,
                found: token.text.clone(),
                pos: token.span.start,
            },
            None => ParseError::UnexpectedEof { expected },
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(ParseError::NestingTooDeep { limit: MAX_PARSE_DEPTH });
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    // ───────────────────────────────────────────────────────────────────
    // Entry rules
    // ───────────────────────────────────────────────────────────────────

    /// configValue: literal text mixed with interpolations.
    fn parse_toplevel(&mut self) -> Result<Node, ParseError> {
        let mut parts: Vec<Node> = Vec::new();
        let mut buf = String::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Text | TokenKind::Esc | TokenKind::EscInter => {
                    buf.push_str(&token.text);
                    self.pos += 1;
                }
                TokenKind::InterOpen => {
                    if !buf.is_empty() {
                        parts.push(Node::Literal(std::mem::take(&mut buf)));
                    }
                    let inter = self.parse_interpolation()?;
                    parts.push(inter);
                }
                _ => return Err(self.unexpected("text or interpolation")),
            }
        }
        if !buf.is_empty() {
            parts.push(Node::Literal(buf));
        }
        Ok(collapse(parts))
    }

    /// singleElement: exactly one Item, then end of input.
    fn parse_single_element(&mut self) -> Result<Node, ParseError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Ok(Node::Literal(String::new()));
        }
        let node = self.parse_element_node()?;
        self.skip_ws();
        if self.peek().is_some() {
            return Err(self.unexpected("end of input"));
        }
        Ok(node)
    }

    // ───────────────────────────────────────────────────────────────────
    // Interpolations: `${key.path}` and `${resolver:args}`
    // ───────────────────────────────────────────────────────────────────

    fn parse_interpolation(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let result = self.parse_interpolation_inner();
        self.exit();
        result
    }

    fn parse_interpolation_inner(&mut self) -> Result<Node, ParseError> {
        let open_pos = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.expect(TokenKind::InterOpen, "'${'")?;

        if self.peek_kind() == Some(TokenKind::Colon) {
            return Err(ParseError::EmptyResolverName { pos: open_pos });
        }

        // Leading dots make the path relative to the current node.
        let mut up = 0usize;
        while self.peek_kind() == Some(TokenKind::Dot) {
            up += 1;
            self.pos += 1;
        }

        let mut segments: Vec<Segment> = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Ident | TokenKind::Chars) => {
                    let text = self.take_text();
                    segments.push(Segment::Key(text));
                }
                Some(TokenKind::ListIndex) => {
                    let text = self.take_text();
                    // Digit runs too large for an index stay usable as map keys.
                    segments.push(match text.parse::<usize>() {
                        Ok(index) => Segment::Index(index),
                        Err(_) => Segment::Key(text),
                    });
                }
                Some(TokenKind::InterOpen) => {
                    let inner = self.parse_interpolation()?;
                    segments.push(Segment::Inter(Box::new(inner)));
                }
                _ => return Err(self.unexpected("config key or resolver name")),
            }

            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.pos += 1;
                }
                Some(TokenKind::Colon) => {
                    self.pos += 1;
                    return self.parse_resolver_call(up, segments, open_pos);
                }
                Some(TokenKind::InterClose) => {
                    self.pos += 1;
                    return Ok(Node::KeyPath(KeyPath { up, segments }));
                }
                _ => return Err(self.unexpected("'.', ':' or '}'")),
            }
        }
    }

    /// The part after `name:` — a comma-separated argument sequence.
    fn parse_resolver_call(
        &mut self,
        up: usize,
        segments: Vec<Segment>,
        open_pos: usize,
    ) -> Result<Node, ParseError> {
        let invalid = |segments: &[Segment]| ParseError::InvalidResolverName {
            found: KeyPath { up, segments: segments.to_vec() }.to_string(),
            pos: open_pos,
        };

        let name = if up > 0 {
            // A resolver name cannot be a relative reference.
            return Err(invalid(&segments));
        } else if segments.len() == 1 && matches!(segments[0], Segment::Inter(_)) {
            let Some(Segment::Inter(node)) = segments.into_iter().next() else {
                unreachable!("shape checked above");
            };
            ResolverName::Inter(node)
        } else {
            // Dotted identifier name, e.g. `env` or `oc.env`.
            let mut parts: Vec<String> = Vec::with_capacity(segments.len());
            for segment in &segments {
                match segment {
                    Segment::Key(k) if lexer::is_identifier(k) => parts.push(k.clone()),
                    _ => return Err(invalid(&segments)),
                }
            }
            ResolverName::Name(parts.join("."))
        };

        let args = self.parse_sequence(TokenKind::InterClose, "',' or '}'")?;
        Ok(Node::Resolver(ResolverCall { name, args }))
    }

    // ───────────────────────────────────────────────────────────────────
    // Items: primitives, quoted strings, lists, dicts
    // ───────────────────────────────────────────────────────────────────

    /// element (COMMA element)* terminator — empty sequence permitted,
    /// trailing comma not.
    fn parse_sequence(
        &mut self,
        terminator: TokenKind,
        expected: &'static str,
    ) -> Result<Vec<Node>, ParseError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek_kind() == Some(terminator) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_element_node()?);
            self.skip_ws();
            match self.peek_kind() {
                Some(kind) if kind == terminator => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(TokenKind::Comma) => {
                    let comma_pos = self.tokens[self.pos].span.start;
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek_kind() == Some(terminator) {
                        return Err(ParseError::TrailingComma { pos: comma_pos });
                    }
                }
                _ => return Err(self.unexpected(expected)),
            }
        }
    }

    fn parse_element_node(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let result = self.parse_element_inner();
        self.exit();
        result
    }

    fn parse_element_inner(&mut self) -> Result<Node, ParseError> {
        self.skip_ws();
        match self.peek_kind() {
            Some(TokenKind::BracketOpen) => {
                self.pos += 1;
                let items = self.parse_sequence(TokenKind::BracketClose, "',' or ']'")?;
                Ok(Node::List(items))
            }
            Some(TokenKind::BraceOpen) => self.parse_dict(),
            Some(TokenKind::QuoteOpen(quote)) => self.parse_quoted(quote),
            Some(_) => self.parse_primitive(),
            None => Err(ParseError::UnexpectedEof { expected: "element" }),
        }
    }

    fn parse_dict(&mut self) -> Result<Node, ParseError> {
        self.pos += 1; // '{'
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek_kind() == Some(TokenKind::BraceClose) {
            self.pos += 1;
            return Ok(Node::Dict(entries));
        }
        loop {
            self.skip_ws();
            let key = match self.peek_kind() {
                Some(TokenKind::Ident) => Node::Literal(self.take_text()),
                Some(TokenKind::InterOpen) => self.parse_interpolation()?,
                _ => return Err(self.unexpected("dict key")),
            };
            self.skip_ws();
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_element_node()?;
            entries.push(DictEntry { key, value });
            self.skip_ws();
            match self.peek_kind() {
                Some(TokenKind::BraceClose) => {
                    self.pos += 1;
                    return Ok(Node::Dict(entries));
                }
                Some(TokenKind::Comma) => {
                    let comma_pos = self.tokens[self.pos].span.start;
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek_kind() == Some(TokenKind::BraceClose) {
                        return Err(ParseError::TrailingComma { pos: comma_pos });
                    }
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }

    fn parse_quoted(&mut self, quote: Quote) -> Result<Node, ParseError> {
        self.pos += 1; // opening quote
        let mut parts: Vec<Node> = Vec::new();
        let mut buf = String::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Text | TokenKind::Esc | TokenKind::EscInter) => {
                    buf.push_str(&self.tokens[self.pos].text);
                    self.pos += 1;
                }
                Some(TokenKind::InterOpen) => {
                    if !buf.is_empty() {
                        parts.push(Node::Literal(std::mem::take(&mut buf)));
                    }
                    parts.push(self.parse_interpolation()?);
                }
                Some(TokenKind::QuoteClose(q)) if q == quote => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("quoted string content")),
            }
        }
        if !buf.is_empty() {
            parts.push(Node::Literal(buf));
        }
        Ok(Node::Quoted(Box::new(collapse(parts))))
    }

    /// An unquoted primitive: literal runs and nested interpolations up to
    /// the next structural boundary. Whitespace inside the run is content;
    /// whitespace at the end is not.
    fn parse_primitive(&mut self) -> Result<Node, ParseError> {
        let mut parts: Vec<Node> = Vec::new();
        let mut buf = String::new();
        let mut pending_ws = String::new();
        loop {
            match self.peek_kind() {
                Some(
                    TokenKind::Ident
                    | TokenKind::Chars
                    | TokenKind::Int
                    | TokenKind::Float
                    | TokenKind::Bool
                    | TokenKind::Null
                    | TokenKind::Colon
                    | TokenKind::Esc
                    | TokenKind::EscInter,
                ) => {
                    buf.push_str(&pending_ws);
                    pending_ws.clear();
                    buf.push_str(&self.tokens[self.pos].text);
                    self.pos += 1;
                }
                Some(TokenKind::Ws) => {
                    pending_ws.push_str(&self.tokens[self.pos].text);
                    self.pos += 1;
                }
                Some(TokenKind::InterOpen) => {
                    buf.push_str(&pending_ws);
                    pending_ws.clear();
                    if !buf.is_empty() {
                        parts.push(Node::Literal(std::mem::take(&mut buf)));
                    }
                    parts.push(self.parse_interpolation()?);
                }
                Some(
                    TokenKind::Comma
                    | TokenKind::InterClose
                    | TokenKind::BracketClose
                    | TokenKind::BraceClose,
                )
                | None => break,
                _ => return Err(self.unexpected("',' or end of element")),
            }
        }
        // `pending_ws` is trailing whitespace: dropped.
        if !buf.is_empty() {
            parts.push(Node::Literal(buf));
        }
        if parts.is_empty() {
            return Err(self.unexpected("element"));
        }
        Ok(collapse(parts))
    }
}

/// Collapse a part list: empty → empty literal, one part → itself, more →
/// concatenation.
fn collapse(mut parts: Vec<Node>) -> Node {
    match parts.len() {
        0 => Node::Literal(String::new()),
        1 => parts.pop().expect("length checked"),
        _ => Node::Concat(parts),
    }
}
