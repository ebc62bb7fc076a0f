use crate::traits::Scalar;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while turning source text into bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("expected ')'")]
    MissingCloseParen,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unknown variable or parameter '{0}'")]
    UnknownIdentifier(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("expression nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
    #[error("expression has more than {} tokens", MAX_TOKENS)]
    TooLong,
}

/// Nesting limit for parentheses, calls, unary signs and exponents.
pub const MAX_DEPTH: usize = 256;
/// Token limit; bounds the recursion of compiling and dropping long operator chains.
pub const MAX_TOKENS: usize = 4096;

/// Built-in single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "exp" => Some(Function::Exp),
            "ln" | "log" => Some(Function::Ln),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    fn apply<T: Scalar>(self, a: T) -> T {
        match self {
            Function::Sin => a.sin(),
            Function::Cos => a.cos(),
            Function::Tan => a.tan(),
            Function::Exp => a.exp(),
            Function::Ln => a.ln(),
            Function::Sqrt => a.sqrt(),
            Function::Abs => a.abs(),
        }
    }
}

/// OpCodes for the stack-based virtual machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Pushes the value of a state variable (0 = x, 1 = y).
    LoadVar(usize),
    /// Pushes the value of a named constant by index.
    LoadParam(usize),
    /// Pops (b, a), pushes a + b.
    Add,
    /// Pops (b, a), pushes a - b.
    Sub,
    /// Pops (b, a), pushes a * b.
    Mul,
    /// Pops (b, a), pushes a / b.
    Div,
    /// Pops (b, a), pushes a ^ b.
    Pow,
    /// Pops a, pushes -a.
    Neg,
    /// Pops a, pushes f(a).
    Call(Function),
}

/// A compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

impl Bytecode {
    /// Bytecode that evaluates to a single constant.
    pub fn constant(value: f64) -> Self {
        Self {
            ops: vec![OpCode::LoadConst(value)],
        }
    }
}

/// Stack-based virtual machine for evaluating compiled expressions.
///
/// The VM is stateless; `execute` takes the bytecode, the state vector, the
/// parameter vector and a scratch stack that it clears before use.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(T::from_f64(val).unwrap_or_else(T::nan)),
                OpCode::LoadVar(idx) => stack.push(vars[idx]),
                OpCode::LoadParam(idx) => stack.push(params[idx]),
                OpCode::Add => binary(stack, |a, b| a + b),
                OpCode::Sub => binary(stack, |a, b| a - b),
                OpCode::Mul => binary(stack, |a, b| a * b),
                OpCode::Div => binary(stack, |a, b| a / b),
                OpCode::Pow => binary(stack, |a, b| a.powf(b)),
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
                OpCode::Call(func) => {
                    let a = pop(stack);
                    stack.push(func.apply(a));
                }
            }
        }

        // Well-formed bytecode leaves exactly one value.
        stack.pop().unwrap_or_else(T::zero)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

fn binary<T: Scalar>(stack: &mut Vec<T>, op: impl Fn(T, T) -> T) {
    let b = pop(stack);
    let a = pop(stack);
    stack.push(op(a, b));
}

// --- AST & Compiler ---

/// Abstract syntax tree for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // +, -, *, /, ^
    Unary(char, Box<Expr>),             // -
    Call(String, Box<Expr>),
}

/// Compiles an `Expr` into `Bytecode`, resolving names to indices.
///
/// Names resolve in order: state variables, parameters, then the built-in
/// constants `pi` and `e`.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String], param_names: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { var_map, param_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, ExpressionError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(
        &self,
        expr: &Expr,
        ops: &mut Vec<OpCode>,
    ) -> Result<(), ExpressionError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => ops.push(self.resolve(name)?),
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    '^' => OpCode::Pow,
                    other => {
                        return Err(ExpressionError::UnexpectedToken(format!("'{other}'")))
                    }
                });
            }
            Expr::Unary(op, operand) => {
                self.compile_recursive(operand, ops)?;
                match op {
                    '-' => ops.push(OpCode::Neg),
                    other => return Err(ExpressionError::UnexpectedToken(format!("'{other}'"))),
                }
            }
            Expr::Call(name, arg) => {
                let func = Function::lookup(name)
                    .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
                self.compile_recursive(arg, ops)?;
                ops.push(OpCode::Call(func));
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<OpCode, ExpressionError> {
        if let Some(&idx) = self.var_map.get(name) {
            return Ok(OpCode::LoadVar(idx));
        }
        if let Some(&idx) = self.param_map.get(name) {
            return Ok(OpCode::LoadParam(idx));
        }
        match name {
            "pi" => Ok(OpCode::LoadConst(std::f64::consts::PI)),
            "e" => Ok(OpCode::LoadConst(std::f64::consts::E)),
            _ => Err(ExpressionError::UnknownIdentifier(name.to_string())),
        }
    }
}

/// Parses and compiles `source` against the given variable and parameter names.
pub fn compile_expression(
    source: &str,
    var_names: &[String],
    param_names: &[String],
) -> Result<Bytecode, ExpressionError> {
    let expr = parse(source)?;
    Compiler::new(var_names, param_names).compile(&expr)
}

// --- Parser ---

/// Parses a string expression into an AST. The whole input must be consumed.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken(format!("{token:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent only when digits follow; `2e` lexes as a number then an identifier.
            let rest = &input[position + num_str.len()..];
            if let Some(exp_len) = exponent_len(rest) {
                for _ in 0..exp_len {
                    if let Some((_, d)) = chars.next() {
                        num_str.push(d);
                    }
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| ExpressionError::InvalidNumber(num_str.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                found => return Err(ExpressionError::UnexpectedChar { found, position }),
            });
            chars.next();
        }
        if tokens.len() > MAX_TOKENS {
            return Err(ExpressionError::TooLong);
        }
    }
    Ok(tokens)
}

/// Length of an `e[+-]digits` suffix at the start of `rest`, if present.
fn exponent_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e') | Some(b'E')) {
        return None;
    }
    let mut len = 1;
    if matches!(bytes.get(len), Some(b'+') | Some(b'-')) {
        len += 1;
    }
    let digits = bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    Some(len + digits)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_close(&mut self) -> Result<(), ExpressionError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err(ExpressionError::MissingCloseParen),
        }
    }

    // expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => '+',
                Some(Token::Minus) => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // term := unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => '*',
                Some(Token::Slash) => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Every nested construct re-enters here, so this is where depth is bounded.
    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        self.depth += 1;
        let expr = self.parse_signed();
        self.depth -= 1;
        expr
    }

    // unary := ('-' | '+') unary | power
    fn parse_signed(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary('-', Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power := primary ('^' unary)?, right-associative.
    fn parse_power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_expression()?;
                    self.expect_close()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_close()?;
                Ok(expr)
            }
            Some(token) => Err(ExpressionError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
