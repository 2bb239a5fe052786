use std::fmt;
use std::rc::Rc;

use crate::diagnostic::Span;
use crate::token::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixOp::Increment => write!(f, "++"),
            PostfixOp::Decrement => write!(f, "--"),
        }
    }
}

/// A function body shared between its declaration site and every closure
/// created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// `None` for function literals.
    pub name: Option<Rc<str>>,
    pub params: Vec<Rc<str>>,
    pub body: Vec<Stmt>,
    pub line: usize,
    pub span: Span,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// One `alias? "path"` entry of an import statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub alias: Option<Rc<str>>,
    pub path: Rc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize, span: Span) -> Self {
        Self { kind, line, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable(Rc<str>),
    Grouping(Box<Expr>),
    Assign {
        name: Rc<str>,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        right: Box<Expr>,
    },
    /// `x++` / `x--`: yields the value before the update.
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Function(Rc<FunctionDecl>),
    List(Vec<Expr>),
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// Property access like `items.length`
    Access {
        object: Box<Expr>,
        name: Rc<str>,
    },
    Import {
        path: Rc<str>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var {
        name: Rc<str>,
        initializer: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Function {
        name: Rc<str>,
        declaration: Rc<FunctionDecl>,
    },
    Return(Option<Expr>),
    /// `import lang ( alias? "path" ... )`
    Import {
        language: Rc<str>,
        items: Vec<ImportItem>,
    },
}
