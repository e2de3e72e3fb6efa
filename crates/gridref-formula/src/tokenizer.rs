//! Lossless formula lexer
//!
//! Unlike the parser's view of a formula, the token stream produced here keeps
//! every character, whitespace included, and records byte offsets into the
//! original text (marker included). Editors use it for cursor queries and the
//! reference tools use it to rewrite formulas without disturbing formatting.

use gridref_core::FORMULA_MARKER;

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    Number,
    StringLit,
    Operator,
    OpenParen,
    CloseParen,
    Comma,
    /// Identifier immediately followed by `(`; the image includes the paren
    FunctionName,
    CellRef,
    /// `A1:B3`, whose right endpoint may carry its own sheet qualifier
    RangeRef,
    /// `Sheet2!` or `'My Sheet'!`
    SheetPrefix,
    /// Bare identifier: a defined name or a function name still being typed
    Name,
    Boolean,
    ErrorLiteral,
    Whitespace,
    Unknown,
}

/// A lexed token with its byte span in the original text
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub image: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, image: &str, start: usize) -> Self {
        Self {
            kind,
            image: image.to_string(),
            start,
            end: start + image.len(),
        }
    }

    /// Values and references, as opposed to punctuation and operators
    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number
                | TokenKind::StringLit
                | TokenKind::CellRef
                | TokenKind::RangeRef
                | TokenKind::Name
                | TokenKind::Boolean
                | TokenKind::ErrorLiteral
        )
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    /// Function name without the trailing paren, for `FunctionName` tokens
    pub fn function_name(&self) -> Option<&str> {
        match self.kind {
            TokenKind::FunctionName => self.image.strip_suffix('('),
            _ => None,
        }
    }
}

/// Result of [`tokenize`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
}

impl Tokenized {
    /// Tokens other than whitespace
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.is_whitespace())
    }
}

const ERROR_CODES: [&str; 9] = [
    "#DIV/0!", "#VALUE!", "#CYCLE!", "#ERROR!", "#NULL!", "#NAME?", "#NUM!", "#REF!", "#N/A",
];

/// Split formula text into tokens
///
/// A leading `=` is not emitted as a token, but offsets still count it.
pub fn tokenize(text: &str) -> Tokenized {
    let offset = if text.starts_with(FORMULA_MARKER) {
        FORMULA_MARKER.len_utf8()
    } else {
        0
    };
    let mut lexer = Lexer {
        text,
        pos: offset,
        tokens: Vec::new(),
    };
    lexer.run();
    Tokenized {
        tokens: lexer.tokens,
    }
}

/// Rebuild formula text from tokens
///
/// The `=` marker is emitted when the tokens start after it, as they do for
/// [`tokenize`] output of formula text. An empty token list rebuilds `=`.
pub fn detokenize(tokens: &[Token]) -> String {
    let mut out = String::new();
    if tokens.first().map_or(true, |t| t.start > 0) {
        out.push(FORMULA_MARKER);
    }
    for token in tokens {
        out.push_str(&token.image);
    }
    out
}

/// Tokenize and drop whitespace; surviving tokens keep their original offsets
pub fn normalize_tokens(text: &str) -> Vec<Token> {
    tokenize(text)
        .tokens
        .into_iter()
        .filter(|t| !t.is_whitespace())
        .collect()
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let image = &self.text[self.pos..self.pos + len];
        self.tokens.push(Token::new(kind, image, self.pos));
        self.pos += len;
    }

    fn run(&mut self) {
        while let Some(c) = self.peek_char() {
            let rest = self.rest();
            match c {
                c if c.is_whitespace() => {
                    let len = prefix_len(rest, char::is_whitespace);
                    self.push(TokenKind::Whitespace, len);
                }
                '"' => {
                    let len = scan_string(rest);
                    self.push(TokenKind::StringLit, len);
                }
                '(' => self.push(TokenKind::OpenParen, 1),
                ')' => self.push(TokenKind::CloseParen, 1),
                ',' => self.push(TokenKind::Comma, 1),
                '<' | '>' => {
                    let len = if rest[1..].starts_with('=') || rest.starts_with("<>") {
                        2
                    } else {
                        1
                    };
                    self.push(TokenKind::Operator, len);
                }
                '+' | '-' | '*' | '/' | '^' | '&' | '%' | '=' | ':' => {
                    self.push(TokenKind::Operator, 1)
                }
                '#' => match ERROR_CODES.iter().find(|code| starts_with_ignore_case(rest, code)) {
                    Some(code) => self.push(TokenKind::ErrorLiteral, code.len()),
                    None => self.push(TokenKind::Unknown, 1),
                },
                '\'' => {
                    let len = scan_quoted(rest);
                    if rest[len..].starts_with('!') {
                        self.push(TokenKind::SheetPrefix, len + 1);
                    } else {
                        self.push(TokenKind::Unknown, len);
                    }
                }
                c if c.is_ascii_digit() => {
                    let len = scan_number(rest);
                    self.push(TokenKind::Number, len);
                }
                '.' if rest[1..].starts_with(|c: char| c.is_ascii_digit()) => {
                    let len = scan_number(rest);
                    self.push(TokenKind::Number, len);
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_word(),
                c => self.push(TokenKind::Unknown, c.len_utf8()),
            }
        }
    }

    fn scan_word(&mut self) {
        let rest = self.rest();

        if let Some(len) = match_cell_ref(rest) {
            if let Some(right) = rest[len..]
                .strip_prefix(':')
                .and_then(match_qualified_ref)
            {
                self.push(TokenKind::RangeRef, len + 1 + right);
            } else {
                self.push(TokenKind::CellRef, len);
            }
            return;
        }

        let len = prefix_len(rest, is_word_char);
        let word = &rest[..len];
        match rest[len..].chars().next() {
            Some('!') => self.push(TokenKind::SheetPrefix, len + 1),
            Some('(') => self.push(TokenKind::FunctionName, len + 1),
            _ if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") => {
                self.push(TokenKind::Boolean, len)
            }
            _ => self.push(TokenKind::Name, len),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
}

fn prefix_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(s.len(), |(i, _)| i)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Length of a string literal starting at `s[0] == '"'`; `""` is an escaped quote.
/// An unterminated literal runs to the end of the text.
fn scan_string(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    s.len()
}

/// Length of a quoted sheet name starting at `s[0] == '\''`; `''` escapes a quote
fn scan_quoted(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    s.len()
}

fn scan_number(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut i = digits(0);
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        i += digits(i);
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp = digits(j);
        if exp > 0 {
            i = j + exp;
        }
    }
    i
}

/// Match `$?letters$?digits` at the start of `s`, not followed by more
/// identifier characters, a call paren or a sheet bang
pub(crate) fn match_cell_ref(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'$') {
        i += 1;
    }
    let letters = bytes[i..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if letters == 0 {
        return None;
    }
    i += letters;
    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    i += digits;

    match s[i..].chars().next() {
        Some(c) if is_word_char(c) || c == '(' || c == '!' => None,
        _ => Some(i),
    }
}

/// Match an optionally sheet-qualified cell reference (the right side of a range)
fn match_qualified_ref(s: &str) -> Option<usize> {
    let prefix = if s.starts_with('\'') {
        let len = scan_quoted(s);
        if s[len..].starts_with('!') {
            len + 1
        } else {
            return None;
        }
    } else {
        let len = prefix_len(s, |c| c.is_alphanumeric() || c == '_' || c == '.');
        if len > 0 && s[len..].starts_with('!') {
            len + 1
        } else {
            0
        }
    };
    match_cell_ref(&s[prefix..]).map(|len| prefix + len)
}
