//! Arithmetic expression grammar for calculator-style parameters.
//!
//! Built on `winnow` 0.7. Accepts numbers, `+ - * / % ^`, unary signs,
//! parentheses, the constants `pi` and `e`, and single-argument calls to
//! a fixed set of functions. `^` is right-associative and binds tighter
//! than unary minus (`-2^2 == -4`).

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

const FUNCTIONS: &[&str] = &["sqrt", "sin", "cos", "tan", "log", "ln", "abs"];

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Const(&'static str),
    Neg(Box<Expr>),
    Bin(Box<Expr>, BinOp, Box<Expr>),
    Call(&'static str, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Deepest nesting of groups, signs and exponents the grammar accepts.
pub const MAX_DEPTH: usize = 64;

/// Parse a complete expression. Trailing input is an error.
pub fn parse_expression(source: &str) -> Result<Expr, String> {
    if nesting_depth(source) > MAX_DEPTH {
        return Err(format!("Expression nested too deeply (max {MAX_DEPTH} levels)"));
    }
    let mut rest = source;
    let expr = parse_sum(&mut rest, 0).map_err(|e| format!("Expression parse error: {e}"))?;
    skip_space(&mut rest);
    if !rest.is_empty() {
        return Err(format!("Unexpected input near `{}`", truncate(rest, 12)));
    }
    Ok(expr)
}

fn nesting_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for c in source.chars() {
        match c {
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

impl Expr {
    /// Evaluate with IEEE semantics (division by zero yields infinity).
    pub fn eval(&self) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Const("pi") => std::f64::consts::PI,
            Expr::Const(_) => std::f64::consts::E,
            Expr::Neg(e) => -e.eval(),
            Expr::Bin(l, op, r) => {
                let (l, r) = (l.eval(), r.eval());
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Rem => l % r,
                    BinOp::Pow => l.powf(r),
                }
            }
            Expr::Call(f, arg) => {
                let v = arg.eval();
                match *f {
                    "sqrt" => v.sqrt(),
                    "sin" => v.sin(),
                    "cos" => v.cos(),
                    "tan" => v.tan(),
                    "log" => v.log10(),
                    "ln" => v.ln(),
                    _ => v.abs(),
                }
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(input);
}

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn too_deep<T>() -> ModalResult<T> {
    Err(ErrMode::Cut(ContextError::new()))
}

fn parse_sum(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    let mut lhs = parse_product(input, depth)?;
    loop {
        skip_space(input);
        let op = match input.chars().next() {
            Some('+') => BinOp::Add,
            Some('-') => BinOp::Sub,
            _ => return Ok(lhs),
        };
        *input = &input[1..];
        let rhs = parse_product(input, depth)?;
        lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
    }
}

fn parse_product(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    let mut lhs = parse_unary(input, depth)?;
    loop {
        skip_space(input);
        let op = match input.chars().next() {
            Some('*') => BinOp::Mul,
            Some('/') => BinOp::Div,
            Some('%') => BinOp::Rem,
            _ => return Ok(lhs),
        };
        *input = &input[1..];
        let rhs = parse_unary(input, depth)?;
        lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
    }
}

// Every recursive path passes through here, so this is where depth is capped.
fn parse_unary(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    if depth > MAX_DEPTH {
        return too_deep();
    }
    skip_space(input);
    match input.chars().next() {
        Some('-') => {
            *input = &input[1..];
            Ok(Expr::Neg(Box::new(parse_unary(input, depth + 1)?)))
        }
        Some('+') => {
            *input = &input[1..];
            parse_unary(input, depth + 1)
        }
        _ => parse_power(input, depth),
    }
}

fn parse_power(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    let base = parse_atom(input, depth)?;
    skip_space(input);
    if input.starts_with('^') {
        *input = &input[1..];
        let exponent = parse_unary(input, depth + 1)?;
        return Ok(Expr::Bin(Box::new(base), BinOp::Pow, Box::new(exponent)));
    }
    Ok(base)
}

fn parse_atom(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    skip_space(input);
    alt((
        parse_number.map(Expr::Num),
        |i: &mut &str| parse_group(i, depth),
        |i: &mut &str| parse_named(i, depth),
    ))
    .parse_next(input)
}

fn parse_group(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    delimited('(', |i: &mut &str| parse_sum(i, depth + 1), (multispace0, ')')).parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    let _ = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    // Optional exponent: 1e3, 2.5E-2
    let checkpoint = *input;
    if opt(one_of(['e', 'E'])).parse_next(input)?.is_some() {
        let _ = opt(one_of(['+', '-'])).parse_next(input)?;
        let digits: ModalResult<&str> = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input);
        if digits.is_err() {
            *input = checkpoint;
        }
    }
    let matched = &start[..start.len() - input.len()];
    matched.parse::<f64>().or_else(|_| backtrack())
}

fn parse_named(input: &mut &str, depth: usize) -> ModalResult<Expr> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let lower = name.to_ascii_lowercase();
    if let Some(f) = FUNCTIONS.iter().find(|f| **f == lower) {
        skip_space(input);
        let arg = parse_group(input, depth)?;
        return Ok(Expr::Call(*f, Box::new(arg)));
    }
    match lower.as_str() {
        "pi" => Ok(Expr::Const("pi")),
        "e" => Ok(Expr::Const("e")),
        _ => backtrack(),
    }
}
