use crate::diagnostic::{Diagnostic, Label, Span};
use crate::token::{Literal, Token, TokenKind};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub message: String,
    pub line: usize,
    pub span: Span,
}

impl ScanError {
    pub fn new(message: impl Into<String>, line: usize, span: Span) -> Self {
        Self {
            message: message.into(),
            line,
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(&self.message)
            .with_code("E0001")
            .with_line(self.line)
            .with_label(Label::primary(self.span, ""))
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.line, self.message)
    }
}

impl std::error::Error for ScanError {}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Scans the whole source. Never fails: problems are collected in `errors`
/// and scanning continues with the next character.
pub fn scan(source: &str) -> ScanResult {
    Scanner::new(source).scan_tokens()
}

/// Two-cursor scanner: `start` marks the beginning of the current lexeme and
/// `current` the next unread byte.
pub struct Scanner<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    start: usize,
    current: usize,
    line: usize,
    start_line: usize,
    /// Open brackets, used to decide whether a newline ends a statement.
    delimiters: Vec<TokenKind>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            start_line: 1,
            delimiters: Vec::new(),
        }
    }

    pub fn scan_tokens(mut self) -> ScanResult {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.scan_token();
        }

        if !self.last_is(TokenKind::End) {
            self.start = self.current;
            self.push(TokenKind::End, "", None);
        }
        let end = self.source.len();
        self.tokens.push(Token::new(TokenKind::Eof, "", None, self.line, Span::new(end, end)));

        debug!(tokens = self.tokens.len(), errors = self.errors.len(), "scanned source");
        ScanResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn scan_token(&mut self) {
        let Some(c) = self.advance() else {
            return;
        };

        match c {
            '(' => self.open(TokenKind::LeftParen),
            ')' => self.close(TokenKind::RightParen, TokenKind::LeftParen),
            '[' => self.open(TokenKind::LeftBracket),
            ']' => self.close(TokenKind::RightBracket, TokenKind::LeftBracket),
            '{' => self.open(TokenKind::LeftBrace),
            '}' => {
                if !self.last_is(TokenKind::End) && !self.last_is(TokenKind::LeftBrace) {
                    let at = self.start;
                    self.tokens.push(Token::new(TokenKind::End, "", None, self.line, Span::new(at, at)));
                }
                self.close(TokenKind::RightBrace, TokenKind::LeftBrace);
            }
            ',' => self.add(TokenKind::Comma),
            '.' => self.add(TokenKind::Dot),
            ';' => self.add(TokenKind::End),
            '+' => {
                let kind = if self.matches('=') {
                    TokenKind::PlusEqual
                } else if self.matches('+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                };
                self.add(kind);
            }
            '-' => {
                let kind = if self.matches('=') {
                    TokenKind::MinusEqual
                } else if self.matches('-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                };
                self.add(kind);
            }
            '*' => {
                let kind = if self.matches('=') { TokenKind::StarEqual } else { TokenKind::Star };
                self.add(kind);
            }
            '/' => {
                if self.matches('/') {
                    while self.peek().is_some_and(|ch| ch != '\n') {
                        self.advance();
                    }
                } else if self.matches('=') {
                    self.add(TokenKind::SlashEqual);
                } else {
                    self.add(TokenKind::Slash);
                }
            }
            '!' => {
                let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add(kind);
            }
            '=' => {
                let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.add(kind);
            }
            '<' => {
                let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add(kind);
            }
            '>' => {
                let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add(kind);
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.newline(),
            '\\' => match (self.peek(), self.peek_next()) {
                (Some('\n'), _) => {
                    self.advance();
                    self.line += 1;
                }
                (Some('\r'), Some('\n')) => {
                    self.advance();
                    self.advance();
                    self.line += 1;
                }
                _ => self.error("Unexpected character '\\'."),
            },
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.identifier(),
            other => self.error(format!("Unexpected character '{}'.", other)),
        }
    }

    fn newline(&mut self) {
        let inside_brackets = !matches!(self.delimiters.last(), None | Some(TokenKind::LeftBrace));
        let ends_statement = self
            .tokens
            .last()
            .is_some_and(|token| token.kind.ends_statement());

        if !inside_brackets && ends_statement {
            self.add(TokenKind::End);
        }
        self.line += 1;
    }

    fn open(&mut self, kind: TokenKind) {
        self.delimiters.push(kind);
        self.add(kind);
    }

    fn close(&mut self, kind: TokenKind, opener: TokenKind) {
        match self.delimiters.iter().rposition(|open| *open == opener) {
            Some(pos) => self.delimiters.truncate(pos),
            // a stray `}` means we are back at statement level
            None if opener == TokenKind::LeftBrace => self.delimiters.clear(),
            None => {}
        }
        self.add(kind);
    }

    fn string(&mut self) {
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    self.error("Unterminated string.");
                    return;
                }
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(other) => {
                            if other == '\n' {
                                self.line += 1;
                            }
                            value.push('\\');
                            value.push(other);
                        }
                        None => {}
                    }
                }
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    value.push(ch);
                    self.advance();
                }
            }
        }

        // closing quote
        self.advance();
        self.push(TokenKind::String, self.lexeme(), Some(Literal::Str(value.into())));
    }

    fn number(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(value) => self.push(TokenKind::Number, text, Some(Literal::Number(value))),
            Err(_) => self.error(format!("Invalid number literal '{}'.", text)),
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }

        let text = self.lexeme();
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        let literal = match kind {
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Nil => Some(Literal::Nil),
            _ => None,
        };
        self.push(kind, text, literal);
    }

    fn add(&mut self, kind: TokenKind) {
        self.push(kind, self.lexeme(), None);
    }

    fn push(&mut self, kind: TokenKind, lexeme: &str, literal: Option<Literal>) {
        let span = Span::new(self.start, self.current);
        self.tokens.push(Token::new(kind, lexeme, literal, self.start_line, span));
    }

    fn error(&mut self, message: impl Into<String>) {
        let error = ScanError::new(message, self.start_line, Span::new(self.start, self.current));
        debug!(line = error.line, message = %error.message, "scan error");
        self.errors.push(error);
    }

    fn lexeme(&self) -> &'src str {
        &self.source[self.start..self.current]
    }

    fn last_is(&self, kind: TokenKind) -> bool {
        self.tokens.last().is_some_and(|token| token.kind == kind)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source[self.current..].chars().next()?;
        self.current += ch.len_utf8();
        Some(ch)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next()?;
        chars.next()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
