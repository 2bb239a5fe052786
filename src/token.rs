use crate::diagnostic::Span;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,

    // Arithmetic
    Minus,
    Plus,
    Slash,
    Star,

    // Comparison and assignment
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Compound assignment and postfix
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PlusPlus,
    MinusMinus,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    As,
    Else,
    False,
    For,
    Func,
    Hyp,
    If,
    Import,
    Nil,
    Or,
    Par,
    Print,
    Return,
    True,
    Var,
    While,

    /// Statement terminator, produced by `;` or a significant newline.
    End,
    Eof,
}

impl TokenKind {
    /// Looks up the keyword spelled by `text`, including the legacy aliases.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "func" | "fun" => TokenKind::Func,
            "hyp" => TokenKind::Hyp,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "nil" | "newt" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "par" => TokenKind::Par,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether a token of this kind can be the last token of a statement.
    /// A newline after any other kind never terminates the statement.
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::Return
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Kinds that begin a declaration or statement; error recovery stops in front of them.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Var
                | TokenKind::Func
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Import
        )
    }
}

/// A literal value carried by number, string and keyword-literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => write!(f, "nil"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, literal: Option<Literal>, line: usize, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal,
            line,
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(literal) => write!(f, "{:?} {} {}", self.kind, self.lexeme.escape_debug(), literal),
            None => write!(f, "{:?} {}", self.kind, self.lexeme.escape_debug()),
        }
    }
}
