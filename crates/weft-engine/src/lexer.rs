//! Modal lexer for weft interpolation syntax.
//!
//! Raw configuration values are tokenized by an explicit state machine: an
//! enumerated lexical mode plus a mode stack. Every `${` pushes a mode, every
//! matching `}` pops one, and quoted strings get their own modes, so by the
//! end of input the stack must be back where it started — anything else is an
//! unterminated interpolation or quote.
//!
//! Rule precedence within a mode: escapes, then structural punctuation, then
//! keywords, then numeric literals, then identifiers, then generic runs.

use std::fmt;

use crate::coerce;

/// Byte range of a token in the source string.
pub type Span = std::ops::Range<usize>;

/// Maximum depth of the lexical mode stack.
/// Prevents stack abuse from pathologically nested inputs like `${${${...`.
const MAX_MODE_DEPTH: usize = 256;

/// Quote flavor for quoted-string modes and tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    fn byte(self) -> u8 {
        match self {
            Quote::Single => b'\'',
            Quote::Double => b'"',
        }
    }
}

/// Tokens produced by the weft lexer.
///
/// The `text` on the surrounding [`Token`] is always the exact source slice;
/// escape sequences stay encoded until coercion decodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain text at the top level or inside a quoted string.
    Text,
    /// `\${` — an escaped interpolation opener.
    EscInter,
    /// An escape sequence: a run of `\\` pairs, or a single mode escape
    /// such as `\,` or `\ `.
    Esc,
    /// `${`
    InterOpen,
    /// `}` closing an interpolation.
    InterClose,
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident,
    /// Unsigned digit run usable as a list index.
    ListIndex,
    Dot,
    Colon,
    Comma,
    /// `{` opening a dict literal.
    BraceOpen,
    /// `}` closing a dict literal.
    BraceClose,
    BracketOpen,
    BracketClose,
    QuoteOpen(Quote),
    QuoteClose(Quote),
    /// Case-insensitive `null` keyword.
    Null,
    /// Case-insensitive `true`/`false` keyword.
    Bool,
    /// Integer literal.
    Int,
    /// Float literal (including `inf`/`nan`).
    Float,
    /// Maximal run of other unquoted characters.
    Chars,
    /// Whitespace run inside resolver arguments.
    Ws,
}

/// A token with its kind, source text, and byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span }
    }
}

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// EOF while an interpolation was still open.
    UnterminatedInterpolation,
    /// EOF inside a quoted string.
    UnterminatedQuote,
    /// Byte that no rule of the active mode matches.
    UnexpectedCharacter(char),
    /// Mode stack depth exceeded.
    NestingTooDeep,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedInterpolation => write!(f, "unterminated interpolation"),
            Self::UnterminatedQuote => write!(f, "unterminated quoted string"),
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character: {ch:?}"),
            Self::NestingTooDeep => {
                write!(f, "nesting depth exceeded (max {MAX_MODE_DEPTH})")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {pos}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: usize,
}

/// Lexical modes. One is active at a time; the stack records how we got here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Plain text outside any interpolation.
    Toplevel,
    /// Right after `${`: a config key or resolver name.
    KeyOrName,
    /// After a `.` in a key: further path segments.
    DotPath,
    /// Resolver argument list. `root` distinguishes the level entered via
    /// `:` (whose `}` closes the interpolation) from levels pushed by `{`
    /// (whose `}` closes a dict literal).
    Args { root: bool },
    /// Inside a quoted string.
    Quoted(Quote),
}

/// Tokenize a raw configuration value, starting at the top level.
///
/// # Errors
///
/// Returns `LexError` on an unterminated quote or interpolation, or on a
/// character no rule of the active mode matches.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input, Mode::Toplevel).run()
}

/// Tokenize an isolated argument/list/dict expression (the lexer starts in
/// argument mode instead of top-level text mode).
///
/// This is the entry point used when an external scalar — an environment
/// variable's text, say — is reinterpreted as a structured literal.
pub fn tokenize_element(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input, Mode::Args { root: false }).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    modes: Vec<Mode>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, start: Mode) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            modes: vec![start],
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.bytes.len() {
            match self.mode() {
                Mode::Toplevel => self.lex_toplevel(),
                Mode::KeyOrName | Mode::DotPath => self.lex_key()?,
                Mode::Args { .. } => self.lex_args()?,
                Mode::Quoted(q) => self.lex_quoted(q)?,
            }
        }

        if self.modes.len() > 1 {
            let kind = match self.mode() {
                Mode::Quoted(_) => LexErrorKind::UnterminatedQuote,
                _ => LexErrorKind::UnterminatedInterpolation,
            };
            return Err(LexError { kind, pos: self.pos });
        }
        Ok(self.tokens)
    }

    fn mode(&self) -> Mode {
        *self.modes.last().expect("mode stack never empty")
    }

    fn push_mode(&mut self, mode: Mode) -> Result<(), LexError> {
        if self.modes.len() >= MAX_MODE_DEPTH {
            return Err(LexError { kind: LexErrorKind::NestingTooDeep, pos: self.pos });
        }
        self.modes.push(mode);
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// True when the next two bytes open an interpolation.
    fn at_inter_open(&self, offset: usize) -> bool {
        self.peek(offset) == Some(b'$') && self.peek(offset + 1) == Some(b'{')
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token::new(kind, &self.src[start..end], start..end));
    }

    fn emit_here(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        self.pos += len;
        self.emit(kind, start, self.pos);
    }

    fn open_interpolation(&mut self) -> Result<(), LexError> {
        self.push_mode(Mode::KeyOrName)?;
        self.emit_here(TokenKind::InterOpen, 2);
        Ok(())
    }

    fn unexpected(&self) -> LexError {
        let ch = self.src[self.pos..].chars().next().unwrap_or('\0');
        LexError { kind: LexErrorKind::UnexpectedCharacter(ch), pos: self.pos }
    }

    // ───────────────────────────────────────────────────────────────────
    // Toplevel: plain text, escapes, `${`
    // ───────────────────────────────────────────────────────────────────

    fn lex_toplevel(&mut self) {
        match self.peek(0) {
            Some(b'\\') => self.lex_backslashes(EscapeSet::Toplevel),
            Some(b'$') if self.at_inter_open(0) => {
                // Depth guard cannot trip here: toplevel is the stack base.
                let _ = self.open_interpolation();
            }
            _ => {
                // Text run up to the next backslash or `${`.
                let start = self.pos;
                self.pos += 1;
                while let Some(b) = self.peek(0) {
                    if b == b'\\' || (b == b'$' && self.at_inter_open(0)) {
                        break;
                    }
                    self.pos += 1;
                }
                self.emit(TokenKind::Text, start, self.pos);
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // KeyOrName / DotPath: identifiers, indices, path punctuation
    // ───────────────────────────────────────────────────────────────────

    fn lex_key(&mut self) -> Result<(), LexError> {
        match self.peek(0) {
            Some(b' ' | b'\t') => {
                // Whitespace is insignificant in key position.
                self.pos += 1;
                Ok(())
            }
            Some(b'}') => {
                self.modes.pop();
                self.emit_here(TokenKind::InterClose, 1);
                Ok(())
            }
            Some(b'.') => {
                *self.modes.last_mut().expect("mode stack never empty") = Mode::DotPath;
                self.emit_here(TokenKind::Dot, 1);
                Ok(())
            }
            Some(b':') => {
                *self.modes.last_mut().expect("mode stack never empty") =
                    Mode::Args { root: true };
                self.emit_here(TokenKind::Colon, 1);
                Ok(())
            }
            Some(b'$') if self.at_inter_open(0) => self.open_interpolation(),
            // The forbidden set: `: . $ { } [ ] ' " space tab backslash`.
            Some(b'$' | b'{' | b'[' | b']' | b'\'' | b'"' | b'\\') | None => {
                Err(self.unexpected())
            }
            Some(_) => {
                let start = self.pos;
                while let Some(b) = self.peek(0) {
                    if matches!(
                        b,
                        b':' | b'.' | b'$' | b'{' | b'}' | b'[' | b']' | b'\'' | b'"'
                            | b' ' | b'\t' | b'\\'
                    ) {
                        break;
                    }
                    self.pos += 1;
                }
                let text = &self.src[start..self.pos];
                let kind = if is_list_index(text) {
                    TokenKind::ListIndex
                } else if is_identifier(text) {
                    TokenKind::Ident
                } else {
                    TokenKind::Chars
                };
                self.emit(kind, start, self.pos);
                Ok(())
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Args: structural punctuation, keywords, literals, unquoted runs
    // ───────────────────────────────────────────────────────────────────

    fn lex_args(&mut self) -> Result<(), LexError> {
        match self.peek(0) {
            Some(b'\\') => {
                self.lex_backslashes(EscapeSet::Args);
                Ok(())
            }
            Some(b' ' | b'\t') => {
                let start = self.pos;
                while matches!(self.peek(0), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                self.emit(TokenKind::Ws, start, self.pos);
                Ok(())
            }
            Some(b'{') => {
                self.push_mode(Mode::Args { root: false })?;
                self.emit_here(TokenKind::BraceOpen, 1);
                Ok(())
            }
            Some(b'}') => {
                if self.modes.len() == 1 {
                    // Element-mode base level: nothing to close.
                    return Err(self.unexpected());
                }
                let closed = self.mode();
                self.modes.pop();
                let kind = match closed {
                    // The level entered via `:` ends the whole interpolation.
                    Mode::Args { root: true } => TokenKind::InterClose,
                    _ => TokenKind::BraceClose,
                };
                self.emit_here(kind, 1);
                Ok(())
            }
            Some(b'[') => {
                self.emit_here(TokenKind::BracketOpen, 1);
                Ok(())
            }
            Some(b']') => {
                self.emit_here(TokenKind::BracketClose, 1);
                Ok(())
            }
            Some(b',') => {
                self.emit_here(TokenKind::Comma, 1);
                Ok(())
            }
            Some(b':') => {
                self.emit_here(TokenKind::Colon, 1);
                Ok(())
            }
            Some(b'\'') => {
                self.push_mode(Mode::Quoted(Quote::Single))?;
                self.emit_here(TokenKind::QuoteOpen(Quote::Single), 1);
                Ok(())
            }
            Some(b'"') => {
                self.push_mode(Mode::Quoted(Quote::Double))?;
                self.emit_here(TokenKind::QuoteOpen(Quote::Double), 1);
                Ok(())
            }
            Some(b'$') if self.at_inter_open(0) => self.open_interpolation(),
            Some(_) => {
                // Maximal run of unquoted characters; `$` joins the run
                // unless it opens an interpolation.
                let start = self.pos;
                while let Some(b) = self.peek(0) {
                    match b {
                        b'{' | b'}' | b'[' | b']' | b',' | b':' | b'\'' | b'"' | b'\\'
                        | b' ' | b'\t' => break,
                        b'$' if self.at_inter_open(0) => break,
                        _ => self.pos += 1,
                    }
                }
                let text = &self.src[start..self.pos];
                self.emit(classify_run(text), start, self.pos);
                Ok(())
            }
            None => Err(self.unexpected()),
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Quoted strings: verbatim except the quote, `$`, and `\`
    // ───────────────────────────────────────────────────────────────────

    fn lex_quoted(&mut self, quote: Quote) -> Result<(), LexError> {
        match self.peek(0) {
            Some(b) if b == quote.byte() => {
                self.modes.pop();
                self.emit_here(TokenKind::QuoteClose(quote), 1);
                Ok(())
            }
            Some(b'\\') => {
                self.lex_backslashes(EscapeSet::Quoted(quote));
                Ok(())
            }
            Some(b'$') if self.at_inter_open(0) => self.open_interpolation(),
            Some(_) => {
                let start = self.pos;
                self.pos += 1;
                while let Some(b) = self.peek(0) {
                    if b == quote.byte() || b == b'\\' || (b == b'$' && self.at_inter_open(0)) {
                        break;
                    }
                    self.pos += 1;
                }
                self.emit(TokenKind::Text, start, self.pos);
                Ok(())
            }
            None => Err(self.unexpected()),
        }
    }

    /// Lex a backslash sequence under the given mode's escape rules.
    ///
    /// `\\` pairs are always escapes; `\${` is always an escaped opener; a
    /// backslash before any other character falls through to the mode's
    /// generic run (the backslash stays literal).
    fn lex_backslashes(&mut self, set: EscapeSet) {
        // `\${` first, so it wins over any single-character escape.
        if self.peek(1) == Some(b'$') && self.peek(2) == Some(b'{') {
            self.emit_here(TokenKind::EscInter, 3);
            return;
        }
        if self.peek(1) == Some(b'\\') {
            // Run of escaped backslashes: consume pairs greedily.
            let start = self.pos;
            while self.peek(0) == Some(b'\\') && self.peek(1) == Some(b'\\') {
                self.pos += 2;
            }
            self.emit(TokenKind::Esc, start, self.pos);
            return;
        }
        if let Some(next) = self.peek(1) {
            if set.escapes(next) {
                self.emit_here(TokenKind::Esc, 2);
                return;
            }
        }
        // Lone backslash: literal in text-ish modes.
        let kind = match set {
            EscapeSet::Args => TokenKind::Chars,
            _ => TokenKind::Text,
        };
        self.emit_here(kind, 1);
    }
}

/// Which single-character escapes a mode recognizes after a backslash.
#[derive(Clone, Copy)]
enum EscapeSet {
    Toplevel,
    Args,
    Quoted(Quote),
}

impl EscapeSet {
    fn escapes(self, b: u8) -> bool {
        match self {
            // Toplevel only has `\\` and `\${`, both handled before this.
            EscapeSet::Toplevel => false,
            EscapeSet::Args => matches!(
                b,
                b'{' | b'}' | b'[' | b']' | b',' | b':' | b'\'' | b'"' | b' ' | b'\t'
            ),
            EscapeSet::Quoted(q) => b == q.byte(),
        }
    }
}

/// `0`, or a digit run without a leading zero.
fn is_list_index(text: &str) -> bool {
    let bytes = text.as_bytes();
    match bytes {
        [] => false,
        [b'0'] => true,
        [first, ..] => *first != b'0' && bytes.iter().all(u8::is_ascii_digit),
    }
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Classify an unquoted run in argument position.
///
/// Keywords beat numeric literals beat identifiers beat generic runs; the
/// numeric grammars are shared with [`coerce`] so typing rules live in one
/// place.
fn classify_run(text: &str) -> TokenKind {
    if text.eq_ignore_ascii_case("null") {
        TokenKind::Null
    } else if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        TokenKind::Bool
    } else if coerce::is_int(text) {
        TokenKind::Int
    } else if coerce::is_float(text) {
        TokenKind::Float
    } else if is_identifier(text) {
        TokenKind::Ident
    } else {
        TokenKind::Chars
    }
}
