use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, PostfixOp, Stmt, UnaryOp};
use crate::diagnostic::Diagnostic;
use crate::scanner::scan;
use crate::value::{Function, Value};
use super::builtins::NativeTable;
use super::control_flow::ControlFlow;
use super::environment::Environment;
use super::error::{RunError, RuntimeError};
use super::output::SharedOutput;
use super::parser::parse;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::{debug, trace};

/// Tree-walking evaluator. Holds the global scope, the scope currently in
/// effect and the sink `print` writes to.
pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout with the standard natives installed.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    pub fn with_output(out: impl Write + 'static) -> Self {
        Self::with_natives(&NativeTable::standard(), out)
    }

    pub fn with_natives(natives: &NativeTable, out: impl Write + 'static) -> Self {
        let globals = Environment::new();
        natives.install(&globals);
        Self {
            environment: Rc::clone(&globals),
            globals,
            out: Box::new(out),
        }
    }

    pub fn globals(&self) -> &Rc<Environment> {
        &self.globals
    }

    /// Runs top-level statements in order, stopping at the first runtime
    /// error. A top-level `return` ends the program without an error.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = statements.len()))]
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            if let ControlFlow::Return(value) = self.execute(statement)? {
                debug!(%value, "return outside of a function, stopping");
                break;
            }
        }
        self.out.flush().map_err(|e| RuntimeError::output(&e))
    }

    pub fn execute(&mut self, statement: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Next)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(|e| RuntimeError::output(&e))?;
                Ok(ControlFlow::Next)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(Rc::clone(name), value);
                Ok(ControlFlow::Next)
            }
            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(ControlFlow::Next)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ControlFlow::Return(value) = self.execute(body)? {
                        return Ok(ControlFlow::Return(value));
                    }
                }
                Ok(ControlFlow::Next)
            }
            Stmt::Function { name, declaration } => {
                let function = Function::new(Rc::clone(declaration), Rc::clone(&self.environment));
                self.environment.define(Rc::clone(name), Value::Callable(Rc::new(function)));
                Ok(ControlFlow::Next)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::Import { language, items } => {
                debug!(%language, items = items.len(), "import statement has no runtime effect");
                Ok(ControlFlow::Next)
            }
        }
    }

    /// Executes `statements` with `environment` as the current scope. The
    /// previous scope is restored on every exit path, errors included.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Rc<Environment>) -> Result<ControlFlow, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for statement in statements {
            if let ControlFlow::Return(value) = self.execute(statement)? {
                return Ok(ControlFlow::Return(value));
            }
        }
        Ok(ControlFlow::Next)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Value::from(literal)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Variable(name) => self
                .environment
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_variable(name.as_ref(), expr.line, expr.span)),
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                if self.environment.assign(name, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::undefined_variable(name.as_ref(), expr.line, expr.span))
                }
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, &left, &right, expr)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                let short_circuits = match op {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            ExprKind::Unary { op, right } => {
                let operand = self.evaluate(right)?;
                match (op, operand) {
                    (UnaryOp::Not, operand) => Ok(Value::Bool(!operand.is_truthy())),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Neg, _) => Err(RuntimeError::operand_type("Operand must be a number.", expr.line, expr.span)),
                }
            }
            ExprKind::Postfix { op, operand } => self.postfix(*op, operand, expr),
            ExprKind::Call { callee, arguments } => {
                let callee = self.evaluate(callee)?;
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }
                self.call_value(callee, values, expr)
            }
            ExprKind::Function(declaration) => {
                let function = Function::new(Rc::clone(declaration), Rc::clone(&self.environment));
                Ok(Value::Callable(Rc::new(function)))
            }
            ExprKind::List(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::list(items))
            }
            ExprKind::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_value(&object, &index, expr)
            }
            ExprKind::Access { object, name } => {
                let object = self.evaluate(object)?;
                access(&object, name, expr)
            }
            ExprKind::Import { path } => {
                debug!(%path, "import expression evaluates to nil");
                Ok(Value::Nil)
            }
        }
    }

    /// Applies `callee` to already evaluated arguments.
    pub fn call_value(&mut self, callee: Value, arguments: Vec<Value>, expr: &Expr) -> Result<Value, RuntimeError> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::operand_type("Can only call functions.", expr.line, expr.span));
        };
        if arguments.len() != callable.arity() {
            return Err(RuntimeError::arity_mismatch(
                callable.name(),
                callable.arity(),
                arguments.len(),
                expr.line,
                expr.span,
            ));
        }

        trace!(callee = %callable, arguments = arguments.len(), "call");
        callable
            .call(self, arguments)
            .map_err(|error| error.or_at(expr.line, expr.span))
    }

    /// `x++` / `x--` evaluate to the value before the update. Only a variable
    /// operand is written back.
    fn postfix(&mut self, op: PostfixOp, operand: &Expr, expr: &Expr) -> Result<Value, RuntimeError> {
        let original = self.evaluate(operand)?;
        let Value::Number(n) = original else {
            return Err(RuntimeError::operand_type(
                format!("Operand of '{}' must be a number.", op),
                expr.line,
                expr.span,
            ));
        };

        let updated = match op {
            PostfixOp::Increment => n + 1.0,
            PostfixOp::Decrement => n - 1.0,
        };
        if let ExprKind::Variable(name) = &operand.kind {
            if !self.environment.assign(name, Value::Number(updated)) {
                return Err(RuntimeError::undefined_variable(name.as_ref(), operand.line, operand.span));
            }
        }
        Ok(original)
    }
}

fn number_operands(left: &Value, right: &Value, expr: &Expr) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::operand_type("Operands must be numbers.", expr.line, expr.span)),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value, expr: &Expr) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{}{}", a, b))),
            _ => Err(RuntimeError::operand_type(
                "Operands must be two numbers or two strings.",
                expr.line,
                expr.span,
            )),
        },
        BinaryOp::Sub => number_operands(left, right, expr).map(|(a, b)| Value::Number(a - b)),
        BinaryOp::Mul => number_operands(left, right, expr).map(|(a, b)| Value::Number(a * b)),
        BinaryOp::Div => number_operands(left, right, expr).map(|(a, b)| Value::Number(a / b)),
        BinaryOp::Greater => number_operands(left, right, expr).map(|(a, b)| Value::Bool(a > b)),
        BinaryOp::GreaterEq => number_operands(left, right, expr).map(|(a, b)| Value::Bool(a >= b)),
        BinaryOp::Less => number_operands(left, right, expr).map(|(a, b)| Value::Bool(a < b)),
        BinaryOp::LessEq => number_operands(left, right, expr).map(|(a, b)| Value::Bool(a <= b)),
    }
}

fn to_index(key: f64, length: usize, expr: &Expr) -> Result<usize, RuntimeError> {
    if !key.is_finite() || key.fract() != 0.0 {
        return Err(RuntimeError::operand_type("Index must be an integer.", expr.line, expr.span));
    }
    if key < 0.0 || key >= length as f64 {
        return Err(RuntimeError::index_bounds(key as i64, length, expr.line, expr.span));
    }
    Ok(key as usize)
}

fn index_value(object: &Value, key: &Value, expr: &Expr) -> Result<Value, RuntimeError> {
    match (object, key) {
        (Value::List(items), Value::Number(n)) => {
            let items = items.borrow();
            let position = to_index(*n, items.len(), expr)?;
            items
                .get(position)
                .cloned()
                .ok_or_else(|| RuntimeError::index_bounds(position as i64, items.len(), expr.line, expr.span))
        }
        (Value::List(_), other) => Err(RuntimeError::operand_type(
            format!("List index must be a number, got {}.", other.type_name()),
            expr.line,
            expr.span,
        )),
        (Value::Str(text), Value::Number(n)) => {
            let length = text.chars().count();
            let position = to_index(*n, length, expr)?;
            text.chars()
                .nth(position)
                .map(|ch| Value::string(ch.to_string()))
                .ok_or_else(|| RuntimeError::index_bounds(position as i64, length, expr.line, expr.span))
        }
        (Value::Str(text), Value::Str(needle)) => match text.find(needle.as_ref()) {
            Some(byte) => Ok(Value::Number(text[..byte].chars().count() as f64)),
            None => Err(RuntimeError::not_found(
                format!("Substring \"{}\" not found.", needle),
                expr.line,
                expr.span,
            )),
        },
        (Value::Str(_), other) => Err(RuntimeError::operand_type(
            format!("String index must be a number or a string, got {}.", other.type_name()),
            expr.line,
            expr.span,
        )),
        (other, _) => Err(RuntimeError::operand_type(
            format!("Only lists and strings can be indexed, got {}.", other.type_name()),
            expr.line,
            expr.span,
        )),
    }
}

fn access(object: &Value, name: &str, expr: &Expr) -> Result<Value, RuntimeError> {
    match (object, name) {
        (Value::List(items), "length") => Ok(Value::Number(items.borrow().len() as f64)),
        (Value::Str(text), "length") => Ok(Value::Number(text.chars().count() as f64)),
        _ => Err(RuntimeError::not_found(
            format!("Undefined property '{}' on {}.", name, object.type_name()),
            expr.line,
            expr.span,
        )),
    }
}

/// Scans and parses `source`, returning the program only if both phases
/// reported no errors.
pub fn check_source(source: &str) -> Result<Vec<Stmt>, RunError> {
    let scanned = scan(source);
    let parsed = parse(scanned.tokens);
    if !scanned.errors.is_empty() || parsed.had_error() {
        return Err(RunError::Syntax {
            scan: scanned.errors,
            parse: parsed.errors,
        });
    }
    Ok(parsed.statements)
}

/// Scans, parses and runs `source` on an existing interpreter. Nothing is
/// executed when scanning or parsing reported an error.
pub fn run_source(source: &str, interpreter: &mut Interpreter) -> Result<(), RunError> {
    let statements = check_source(source)?;
    interpreter.interpret(&statements)?;
    Ok(())
}

/// Runs `source` in a fresh interpreter and returns everything it printed.
pub fn parse_and_run(source: &str) -> Result<String, String> {
    let output = SharedOutput::new();
    let mut interpreter = Interpreter::with_output(output.clone());
    run_source(source, &mut interpreter).map_err(|e| e.to_string())?;
    Ok(output.contents())
}

pub fn parse_and_run_with_diagnostics(source: &str) -> Result<String, Vec<Diagnostic>> {
    let output = SharedOutput::new();
    let mut interpreter = Interpreter::with_output(output.clone());
    run_source(source, &mut interpreter).map_err(|e| e.to_diagnostics())?;
    Ok(output.contents())
}
