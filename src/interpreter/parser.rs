use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDecl, ImportItem, LogicalOp, PostfixOp, Stmt, UnaryOp};
use crate::diagnostic::{Diagnostic, Label, Span};
use crate::token::{Literal, Token, TokenKind};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

const MAX_ARGUMENTS: usize = 255;
/// Combined statement and expression nesting accepted before the parser
/// reports an error instead of recursing further.
const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    /// Where the error was found, e.g. ` at 'x'` or ` at end`.
    pub location: String,
    pub span: Span,
}

impl ParseError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            TokenKind::End if token.lexeme == ";" => " at ';'".to_string(),
            TokenKind::End => " at end of line".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };
        Self {
            message: message.into(),
            line: token.line,
            location,
            span: token.span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let found = self.location.trim_start().trim_start_matches("at ");
        Diagnostic::error(&self.message)
            .with_code("E0101")
            .with_line(self.line)
            .with_label(Label::primary(self.span, format!("found {}", found)))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub statements: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses a complete token sequence, recovering after each malformed statement.
pub fn parse(tokens: Vec<Token>) -> ParseResult {
    Parser::new(tokens).parse()
}

/// Recursive-descent parser over scanned tokens.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, end) = tokens.last().map_or((1, 0), |t| (t.line, t.span.end));
            tokens.push(Token::new(TokenKind::Eof, "", None, line, Span::new(end, end)));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let mut statements = Vec::new();
        loop {
            self.skip_terminators();
            if self.is_at_end() {
                break;
            }
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        debug!(statements = statements.len(), errors = self.errors.len(), "parsed program");
        ParseResult {
            statements,
            errors: self.errors,
        }
    }

    // ---- token cursor ----

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.current + 1).is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.contains(&self.peek().kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.peek(), message)
    }

    /// Runs `rule` one nesting level deeper, failing once `MAX_NESTING` is reached.
    fn nested<T>(&mut self, rule: fn(&mut Self) -> Result<T, ParseError>, message: &str) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_at_current(message));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn skip_terminators(&mut self) {
        while self.match_kind(&[TokenKind::End]) {}
    }

    /// Ends a simple statement. The terminator may be omitted in front of `else`.
    fn terminator(&mut self, message: &str) -> Result<(), ParseError> {
        if self.match_kind(&[TokenKind::End])
            || self.check(TokenKind::Else)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
        {
            Ok(())
        } else {
            Err(self.error_at_current(message))
        }
    }

    /// Panic-mode recovery: skip to just after a terminator or to the start
    /// of the next statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::End {
                return;
            }
            if self.peek().kind.starts_statement() || self.check(TokenKind::RightBrace) {
                return;
            }
            self.advance();
        }
    }

    // ---- statements ----

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(&[TokenKind::Var]) {
            self.var_declaration()
        } else if self.check(TokenKind::Func) && self.check_next(TokenKind::Identifier) {
            self.advance();
            self.function_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                debug!(line = error.line, message = %error.message, "parse error, synchronizing");
                self.errors.push(error);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.terminator("Expect end of statement after variable declaration.")?;

        Ok(Stmt::Var {
            name: name.lexeme.as_str().into(),
            initializer,
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name_token = self.consume(TokenKind::Identifier, "Expect function name.")?;
        let name: Rc<str> = name_token.lexeme.as_str().into();
        let declaration = self.function_rest(Some(Rc::clone(&name)), &name_token, "Expect '(' after function name.")?;
        self.terminator("Expect end of statement after function body.")?;
        Ok(Stmt::Function { name, declaration })
    }

    /// Parameter list and body, shared by declarations and function literals.
    fn function_rest(&mut self, name: Option<Rc<str>>, start: &Token, open_message: &str) -> Result<Rc<FunctionDecl>, ParseError> {
        self.consume(TokenKind::LeftParen, open_message)?;
        let mut params: Vec<Rc<str>> = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let error = self.error_at_current("Can't have more than 255 parameters.");
                    self.errors.push(error);
                }
                let param = self.consume(TokenKind::Identifier, "Expect parameter name.")?;
                params.push(param.lexeme.as_str().into());
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.skip_terminators();
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body,
            line: start.line,
            span: start.span.merge(self.previous().span),
        }))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        self.nested(Self::statement_kind, "Statement nested too deeply.")
    }

    fn statement_kind(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                self.print_statement()
            }
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => {
                self.advance();
                self.while_statement()
            }
            TokenKind::For => {
                self.advance();
                self.for_statement()
            }
            TokenKind::Return => {
                self.advance();
                self.return_statement()
            }
            TokenKind::Import if self.check_next(TokenKind::Identifier) => {
                self.advance();
                self.import_statement()
            }
            TokenKind::Par | TokenKind::Hyp => {
                let keyword = self.advance().clone();
                self.errors.push(ParseError::at(
                    &keyword,
                    format!("'{}' is reserved and not supported yet.", keyword.lexeme),
                ));
                // keep parsing the guarded statement so its braces stay balanced
                self.statement()
            }
            TokenKind::LeftBrace => {
                self.advance();
                let statements = self.block()?;
                self.terminator("Expect end of statement after block.")?;
                Ok(Stmt::Block(statements))
            }
            _ => self.expression_statement(),
        }
    }

    /// Statements up to the closing brace; the opening brace is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_terminators();
            if self.check(TokenKind::RightBrace) || self.is_at_end() {
                break;
            }
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.terminator("Expect end of statement after value.")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.terminator("Expect end of statement after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = if self.check(TokenKind::End) || self.check(TokenKind::Else) || self.is_at_end() {
            None
        } else {
            Some(self.expression()?)
        };
        self.terminator("Expect end of statement after return value.")?;
        Ok(Stmt::Return(value))
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        self.skip_terminators();
        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.match_kind(&[TokenKind::Else]) {
            self.skip_terminators();
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        self.skip_terminators();
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for (init; cond; incr) body` becomes `{ init; while (cond) { body; incr } }`.
    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(&[TokenKind::End]) {
            None
        } else if self.match_kind(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::End) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::End, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;
        self.skip_terminators();

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let condition = condition
            .unwrap_or_else(|| Expr::new(ExprKind::Literal(Literal::Bool(true)), keyword.line, keyword.span));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }
        Ok(body)
    }

    fn import_statement(&mut self) -> Result<Stmt, ParseError> {
        let language = self.consume(TokenKind::Identifier, "Expect language name after 'import'.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after import language.")?;

        let mut items = Vec::new();
        loop {
            while self.match_kind(&[TokenKind::Comma, TokenKind::End]) {}
            if self.match_kind(&[TokenKind::RightParen]) {
                break;
            }
            let alias = if self.match_kind(&[TokenKind::Identifier]) {
                Some(self.previous().lexeme.as_str().into())
            } else {
                None
            };
            let path = self.consume(TokenKind::String, "Expect import path string.")?;
            items.push(ImportItem {
                alias,
                path: string_value(&path),
            });
        }
        self.terminator("Expect end of statement after import.")?;

        Ok(Stmt::Import {
            language: language.lexeme.as_str().into(),
            items,
        })
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::assignment, "Expression nested too deeply.")
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.or()?;

        let compound = match self.peek().kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Sub),
            TokenKind::StarEqual => Some(BinaryOp::Mul),
            TokenKind::SlashEqual => Some(BinaryOp::Div),
            _ => return Ok(expr),
        };
        let operator = self.advance().clone();
        let value = self.assignment()?;

        if let ExprKind::Variable(name) = &expr.kind {
            let span = expr.span.merge(value.span);
            let value = match compound {
                None => value,
                Some(op) => Expr::new(
                    ExprKind::Binary {
                        left: Box::new(expr.clone()),
                        op,
                        right: Box::new(value),
                    },
                    operator.line,
                    span,
                ),
            };
            return Ok(Expr::new(
                ExprKind::Assign {
                    name: Rc::clone(name),
                    value: Box::new(value),
                },
                operator.line,
                span,
            ));
        }

        // Reported without unwinding: the left side is still a valid expression.
        self.errors.push(ParseError::at(&operator, "Invalid assignment target."));
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;
        while self.match_kind(&[TokenKind::Or]) {
            let line = self.previous().line;
            let right = self.and()?;
            expr = logical(expr, LogicalOp::Or, right, line);
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_kind(&[TokenKind::And]) {
            let line = self.previous().line;
            let right = self.equality()?;
            expr = logical(expr, LogicalOp::And, right, line);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary(
            &[(TokenKind::BangEqual, BinaryOp::NotEq), (TokenKind::EqualEqual, BinaryOp::Eq)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary(
            &[
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEq),
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::LessEqual, BinaryOp::LessEq),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[(TokenKind::Minus, BinaryOp::Sub), (TokenKind::Plus, BinaryOp::Add)], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        self.binary(&[(TokenKind::Slash, BinaryOp::Div), (TokenKind::Star, BinaryOp::Mul)], Self::unary)
    }

    /// One left-associative precedence level.
    fn binary(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut expr = operand(self)?;
        loop {
            let kind = self.peek().kind;
            let Some(&(_, op)) = operators.iter().find(|(candidate, _)| *candidate == kind) else {
                break;
            };
            let line = self.advance().line;
            let right = operand(self)?;
            let span = expr.span.merge(right.span);
            expr = Expr::new(
                ExprKind::Binary {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
                line,
                span,
            );
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        let operator = self.advance().clone();
        let right = self.nested(Self::unary, "Expression nested too deeply.")?;
        let span = operator.span.merge(right.span);
        Ok(Expr::new(ExprKind::Unary { op, right: Box::new(right) }, operator.line, span))
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.call()?;
        let op = match self.peek().kind {
            TokenKind::PlusPlus => PostfixOp::Increment,
            TokenKind::MinusMinus => PostfixOp::Decrement,
            _ => return Ok(expr),
        };
        let operator = self.advance().clone();
        let span = expr.span.merge(operator.span);
        Ok(Expr::new(
            ExprKind::Postfix {
                op,
                operand: Box::new(expr),
            },
            operator.line,
            span,
        ))
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(&[TokenKind::LeftBracket]) {
                let index = self.expression()?;
                let bracket = self.consume(TokenKind::RightBracket, "Expect ']' after index.")?;
                let span = expr.span.merge(bracket.span);
                expr = Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    bracket.line,
                    span,
                );
            } else if self.match_kind(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                let span = expr.span.merge(name.span);
                expr = Expr::new(
                    ExprKind::Access {
                        object: Box::new(expr),
                        name: name.lexeme.as_str().into(),
                    },
                    name.line,
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    let error = self.error_at_current("Can't have more than 255 arguments.");
                    self.errors.push(error);
                }
                arguments.push(self.expression()?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        let span = callee.span.merge(paren.span);

        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            paren.line,
            span,
        ))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::False | TokenKind::True | TokenKind::Nil | TokenKind::Number | TokenKind::String => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(literal_value(&token)), token.line, token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::new(ExprKind::Variable(token.lexeme.as_str().into()), token.line, token.span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                let close = self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::new(ExprKind::Grouping(Box::new(inner)), token.line, token.span.merge(close.span)))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::RightBracket) && !self.is_at_end() {
                    elements.push(self.expression()?);
                    if !self.match_kind(&[TokenKind::Comma]) {
                        break;
                    }
                }
                let close = self.consume(TokenKind::RightBracket, "Expect ']' after list elements.")?;
                Ok(Expr::new(ExprKind::List(elements), token.line, token.span.merge(close.span)))
            }
            TokenKind::Func => {
                self.advance();
                let declaration = self.function_rest(None, &token, "Expect '(' after 'func'.")?;
                let span = declaration.span;
                Ok(Expr::new(ExprKind::Function(declaration), token.line, span))
            }
            TokenKind::Import => {
                self.advance();
                let path = self.consume(TokenKind::String, "Expect module path after 'import'.")?;
                Ok(Expr::new(
                    ExprKind::Import { path: string_value(&path) },
                    token.line,
                    token.span.merge(path.span),
                ))
            }
            _ => Err(ParseError::at(&token, "Expect expression.")),
        }
    }
}

fn logical(left: Expr, op: LogicalOp, right: Expr, line: usize) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        line,
        span,
    )
}

fn literal_value(token: &Token) -> Literal {
    match (&token.literal, token.kind) {
        (Some(literal), _) => literal.clone(),
        (None, TokenKind::True) => Literal::Bool(true),
        (None, TokenKind::False) => Literal::Bool(false),
        (None, TokenKind::String) => Literal::Str(token.lexeme.trim_matches('"').into()),
        _ => Literal::Nil,
    }
}

fn string_value(token: &Token) -> Rc<str> {
    match &token.literal {
        Some(Literal::Str(s)) => Rc::clone(s),
        _ => token.lexeme.trim_matches('"').into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> ParseResult {
        parse(scan(source).tokens)
    }

    fn only_statement(source: &str) -> Stmt {
        let result = parse_source(source);
        assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
        assert_eq!(result.statements.len(), 1);
        result.statements.into_iter().next().unwrap()
    }

    fn expression(source: &str) -> ExprKind {
        match only_statement(source) {
            Stmt::Expression(expr) => expr.kind,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let ExprKind::Binary { left, op, right } = expression("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(left.kind, ExprKind::Literal(Literal::Number(1.0)));
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_binary_is_left_associative() {
        let ExprKind::Binary { left, op, .. } = expression("8 - 4 - 2") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let ExprKind::Assign { name, value } = expression("a = b = 3") else {
            panic!("expected assignment");
        };
        assert_eq!(&*name, "a");
        assert!(matches!(value.kind, ExprKind::Assign { .. }));
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let ExprKind::Assign { name, value } = expression("x += 2") else {
            panic!("expected assignment");
        };
        assert_eq!(&*name, "x");
        let ExprKind::Binary { left, op, right } = value.kind else {
            panic!("expected binary value");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(left.kind, ExprKind::Variable("x".into()));
        assert_eq!(right.kind, ExprKind::Literal(Literal::Number(2.0)));
    }

    #[test]
    fn test_invalid_assignment_target_does_not_unwind() {
        let result = parse_source("1 + 2 = 3\nprint 4");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Invalid assignment target.");
        assert_eq!(result.errors[0].to_string(), "[line 1] Error at '=': Invalid assignment target.");
        assert_eq!(result.statements.len(), 2);
    }

    #[test]
    fn test_logical_operators() {
        let ExprKind::Logical { op, right, .. } = expression("a or b and c") else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::Or);
        assert!(matches!(right.kind, ExprKind::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn test_call_index_and_access_chain() {
        let ExprKind::Access { object, name } = expression("f(1, 2)[0].length") else {
            panic!("expected access");
        };
        assert_eq!(&*name, "length");
        let ExprKind::Index { object, .. } = object.kind else {
            panic!("expected index");
        };
        let ExprKind::Call { arguments, .. } = object.kind else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
    }

    #[test]
    fn test_postfix_and_unary() {
        assert!(matches!(expression("i++"), ExprKind::Postfix { op: PostfixOp::Increment, .. }));
        let ExprKind::Unary { op, right } = expression("-x--") else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Neg);
        assert!(matches!(right.kind, ExprKind::Postfix { op: PostfixOp::Decrement, .. }));
    }

    #[test]
    fn test_list_literal_allows_newlines_and_trailing_comma() {
        let ExprKind::List(elements) = expression("[1,\n 2,\n 3,\n]") else {
            panic!("expected list");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn test_var_declaration() {
        assert_eq!(
            only_statement("var answer = 42"),
            Stmt::Var {
                name: "answer".into(),
                initializer: Some(Expr::new(ExprKind::Literal(Literal::Number(42.0)), 1, Span::new(13, 15))),
            }
        );
        assert_eq!(only_statement("var empty"), Stmt::Var { name: "empty".into(), initializer: None });
    }

    #[test]
    fn test_function_declaration() {
        let Stmt::Function { name, declaration } = only_statement("func add(a, b) {\n  return a + b\n}") else {
            panic!("expected function");
        };
        assert_eq!(&*name, "add");
        assert_eq!(declaration.params, vec![Rc::from("a"), Rc::from("b")]);
        assert_eq!(declaration.body.len(), 1);
        assert!(matches!(declaration.body[0], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_function_literal_is_an_expression() {
        let Stmt::Var { initializer: Some(init), .. } = only_statement("var f = func (x) { return x }") else {
            panic!("expected var");
        };
        let ExprKind::Function(declaration) = init.kind else {
            panic!("expected function literal");
        };
        assert_eq!(declaration.name, None);
        assert_eq!(declaration.arity(), 1);
    }

    #[test]
    fn test_for_desugars_to_while_in_block() {
        let Stmt::Block(outer) = only_statement("for (var i = 0; i < 3; i = i + 1) print i") else {
            panic!("expected block");
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while");
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected body block");
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(_)));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let Stmt::While { condition, body } = only_statement("for (;;) { return }") else {
            panic!("expected bare while");
        };
        assert_eq!(condition.kind, ExprKind::Literal(Literal::Bool(true)));
        assert!(matches!(*body, Stmt::Block(_)));
    }

    #[test]
    fn test_if_else_across_lines() {
        let Stmt::If { else_branch, .. } = only_statement("if (x) {\n  print 1\n}\nelse {\n  print 2\n}") else {
            panic!("expected if");
        };
        assert!(else_branch.is_some());

        let Stmt::If { else_branch, .. } = only_statement("if (x) print 1 else print 2") else {
            panic!("expected if");
        };
        assert!(else_branch.is_some());
    }

    #[test]
    fn test_if_body_on_next_line() {
        assert!(matches!(only_statement("if (x)\n  print 1"), Stmt::If { .. }));
        assert!(matches!(only_statement("while (x)\n{\n  x = x - 1\n}"), Stmt::While { .. }));
    }

    #[test]
    fn test_import_statement() {
        let Stmt::Import { language, items } = only_statement("import go (\n  fmt \"fmt\"\n  \"strings\", \"os\"\n)") else {
            panic!("expected import");
        };
        assert_eq!(&*language, "go");
        assert_eq!(
            items,
            vec![
                ImportItem { alias: Some("fmt".into()), path: "fmt".into() },
                ImportItem { alias: None, path: "strings".into() },
                ImportItem { alias: None, path: "os".into() },
            ]
        );
    }

    #[test]
    fn test_import_expression() {
        let Stmt::Var { initializer: Some(init), .. } = only_statement("var m = import \"math\"") else {
            panic!("expected var");
        };
        assert_eq!(init.kind, ExprKind::Import { path: "math".into() });
    }

    #[test]
    fn test_reserved_keywords_are_rejected() {
        let result = parse_source("par { print 1 }\nprint 2");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("'par' is reserved"));
    }

    #[test]
    fn test_two_malformed_lines_give_two_errors() {
        let result = parse_source("var = 1\nprint 2\nprint 3 + * 4\nprint 5");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].line, 1);
        assert_eq!(result.errors[0].message, "Expect variable name.");
        assert_eq!(result.errors[1].line, 3);
        assert_eq!(result.statements.len(), 2);
    }

    #[test]
    fn test_error_inside_block_recovers_within_block() {
        let result = parse_source("{\n  var = 1\n  print 2\n}\nprint 3");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.statements.len(), 2);
        let Stmt::Block(inner) = &result.statements[0] else {
            panic!("expected block");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_missing_expression_reports_location() {
        let result = parse_source("print");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].to_string(), "[line 1] Error at end of line: Expect expression.");
    }

    #[test]
    fn test_unclosed_block_reports_at_end() {
        let result = parse_source("{ print 1");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Expect '}' after block.");
        assert_eq!(result.errors[0].location, " at end");
    }

    #[test]
    fn test_too_many_arguments_is_reported_without_unwinding() {
        let args = vec!["1"; 256].join(", ");
        let result = parse_source(&format!("f({})\nprint 1", args));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Can't have more than 255 arguments.");
        assert_eq!(result.statements.len(), 2);
    }

    #[test]
    fn test_parser_appends_missing_eof() {
        let result = Parser::new(Vec::new()).parse();
        assert!(result.is_ok());
        assert!(result.statements.is_empty());
    }

    #[test]
    fn test_function_body_brace_on_next_line() {
        let result = parse_source("func f()\n{\n  return 1\n}\nprint f()");
        assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
        assert_eq!(result.statements.len(), 2);
    }

    #[test]
    fn test_deeply_nested_parentheses_are_an_error() {
        let source = format!("print {}1{}\nprint 2", "(".repeat(10_000), ")".repeat(10_000));
        let result = parse_source(&source);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Expression nested too deeply.");
        assert_eq!(result.statements.len(), 1);
    }

    #[test]
    fn test_deeply_nested_unary_and_lists_are_errors() {
        let negations = parse_source(&format!("print {}true", "!".repeat(10_000)));
        assert_eq!(negations.errors.len(), 1);
        assert_eq!(negations.errors[0].message, "Expression nested too deeply.");

        let lists = parse_source(&format!("print {}{}", "[".repeat(10_000), "]".repeat(10_000)));
        assert_eq!(lists.errors.len(), 1);
    }

    #[test]
    fn test_deeply_nested_statements_are_an_error() {
        let ifs = parse_source(&format!("{}print 1", "if (true) ".repeat(5_000)));
        assert!(ifs.had_error());
        assert!(ifs.errors.iter().all(|error| error.message == "Statement nested too deeply."));

        let blocks = parse_source(&format!("{}{}", "{".repeat(5_000), "}".repeat(5_000)));
        assert!(blocks.had_error());
        assert_eq!(blocks.errors[0].message, "Statement nested too deeply.");
    }

    #[test]
    fn test_nesting_below_the_limit_parses() {
        let source = format!("print {}1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse_source(&source).is_ok());
    }
}
