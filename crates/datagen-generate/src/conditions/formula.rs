//! Arithmetic and logic expressions evaluated by `formula` lines.
//!
//! Field references (`$name` or `${name}`) are replaced by row values before
//! evaluation: numbers and booleans verbatim, everything else as a quoted
//! string. The language covers number, string and boolean literals,
//! `+ - * / %`, comparisons, `&& || !`, the `?:` conditional and a few math
//! functions (`abs ceil floor round trunc sqrt pow min max`, optionally
//! prefixed by `Math.`). Numbers are doubles and print without a trailing
//! `.0`; `NaN` and `Infinity` print as such.

use std::collections::HashMap;
use std::fmt;

use datagen_definition::{formula_references, variable_pattern};
use thiserror::Error;
use tracing::warn;

use crate::conditions::{FieldResolver, ResolvedField};
use crate::errors::Result;
use crate::row::Row;
use crate::value::FieldValue;

/// Result of a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' cannot take {actual} argument(s)")]
    Arity { name: String, actual: usize },
}

/// Formula line of a computed field.
#[derive(Debug)]
pub struct Formula {
    expression: String,
    references: Vec<ResolvedField>,
}

impl Formula {
    pub(crate) fn build(expression: &str, resolver: &FieldResolver<'_>) -> Result<Self> {
        let mut references: Vec<ResolvedField> = Vec::new();
        for name in formula_references(expression) {
            if references.iter().all(|field| field.name != name) {
                references.push(resolver.resolve(&name)?);
            }
        }
        Ok(Self {
            expression: expression.to_string(),
            references,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Substitute row values and evaluate; evaluation errors give "".
    pub fn compute(&self, row: &Row, owner: &str) -> Result<String> {
        let mut substitutions = HashMap::with_capacity(self.references.len());
        for field in &self.references {
            let value = field.value(row, owner)?;
            let text = match value {
                FieldValue::Null => "null".to_string(),
                FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::Long(_) => {
                    field.text(row, owner)?
                }
                FieldValue::Float(number) if number.is_finite() => field.text(row, owner)?,
                _ => quote(&field.text(row, owner)?),
            };
            substitutions.insert(field.name.as_str(), text);
        }

        let substituted = match variable_pattern() {
            Some(pattern) => pattern
                .replace_all(&self.expression, |captures: &regex::Captures<'_>| {
                    captures
                        .get(1)
                        .or_else(|| captures.get(2))
                        .and_then(|name| substitutions.get(name.as_str()))
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned(),
            None => self.expression.clone(),
        };
        Ok(evaluate(&substituted))
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Evaluate `expression`, logging failures and returning an empty string.
pub fn evaluate(expression: &str) -> String {
    match try_evaluate(expression) {
        Ok(value) => value.to_string(),
        Err(err) => {
            warn!(formula = expression, error = %err, "formula could not be evaluated");
            String::new()
        }
    }
}

pub fn try_evaluate(expression: &str) -> std::result::Result<Scalar, FormulaError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.conditional()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(value),
        Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
    }
}

impl Scalar {
    fn number(&self) -> f64 {
        match self {
            Scalar::Number(value) => *value,
            Scalar::Bool(value) => f64::from(u8::from(*value)),
            Scalar::Text(text) if text.trim().is_empty() => 0.0,
            Scalar::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Scalar::Number(value) => *value != 0.0 && !value.is_nan(),
            Scalar::Text(text) => !text.is_empty(),
            Scalar::Bool(value) => *value,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(value) if value.is_nan() => f.write_str("NaN"),
            Scalar::Number(value) if value.is_infinite() => {
                f.write_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Scalar::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Scalar::Number(value) => write!(f, "{value}"),
            Scalar::Text(text) => f.write_str(text),
            Scalar::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Symbol(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{value}"),
            Token::Text(text) => write!(f, "\"{text}\""),
            Token::Ident(name) => f.write_str(name),
            Token::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

const LONG_SYMBOLS: [(&str, &str); 8] = [
    ("===", "=="),
    ("!==", "!="),
    ("==", "=="),
    ("!=", "!="),
    ("<=", "<="),
    (">=", ">="),
    ("&&", "&&"),
    ("||", "||"),
];
const SHORT_SYMBOLS: [&str; 14] = [
    "+", "-", "*", "/", "%", "(", ")", "<", ">", "!", "?", ":", ",", "=",
];

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let next_is_digit = chars.get(i + 1).is_some_and(char::is_ascii_digit);
        if c.is_ascii_digit() || (c == '.' && next_is_digit) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if matches!(chars.get(i), Some('e' | 'E')) {
                let mut j = i + 1;
                if matches!(chars.get(j), Some('+' | '-')) {
                    j += 1;
                }
                if chars.get(j).is_some_and(char::is_ascii_digit) {
                    i = j;
                    while chars.get(i).is_some_and(char::is_ascii_digit) {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| FormulaError::InvalidNumber(text.clone()))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c == '"' || c == '\'' {
            i += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(FormulaError::UnterminatedString),
                    Some(&ch) if ch == c => {
                        i += 1;
                        break;
                    }
                    Some(&'\\') => {
                        let escaped = *chars.get(i + 1).ok_or(FormulaError::UnterminatedString)?;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 2;
                    }
                    Some(&ch) => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Text(text));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let rest: String = chars[i..(i + 3).min(chars.len())].iter().collect();
        if let Some((text, symbol)) = LONG_SYMBOLS.iter().find(|(text, _)| rest.starts_with(text)) {
            tokens.push(Token::Symbol(*symbol));
            i += text.len();
            continue;
        }
        match SHORT_SYMBOLS.iter().find(|symbol| symbol.starts_with(c)) {
            Some(&"=") => tokens.push(Token::Symbol("==")),
            Some(symbol) => tokens.push(Token::Symbol(*symbol)),
            None => return Err(FormulaError::UnexpectedChar(c, i)),
        }
        i += 1;
    }
    Ok(tokens)
}

/// Recursive-descent evaluator; each level is one precedence tier.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_symbol(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Symbol(symbol)) => Some(symbol),
            _ => None,
        }
    }

    fn eat(&mut self, symbol: &str) -> bool {
        if self.peek_symbol() == Some(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, symbol: &str) -> std::result::Result<(), FormulaError> {
        if self.eat(symbol) {
            return Ok(());
        }
        match self.tokens.get(self.pos) {
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn binary(
        &mut self,
        symbols: &[&'static str],
        operand: fn(&mut Self) -> std::result::Result<Scalar, FormulaError>,
        apply: fn(&'static str, Scalar, Scalar) -> Scalar,
    ) -> std::result::Result<Scalar, FormulaError> {
        let mut left = operand(self)?;
        while let Some(symbol) = self.peek_symbol().filter(|symbol| symbols.contains(symbol)) {
            self.pos += 1;
            let right = operand(self)?;
            left = apply(symbol, left, right);
        }
        Ok(left)
    }

    fn conditional(&mut self) -> std::result::Result<Scalar, FormulaError> {
        let condition = self.or()?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let when_true = self.conditional()?;
        self.expect(":")?;
        let when_false = self.conditional()?;
        Ok(if condition.truthy() { when_true } else { when_false })
    }

    fn or(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["||"], Self::and, |_, left, right| {
            Scalar::Bool(left.truthy() || right.truthy())
        })
    }

    fn and(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["&&"], Self::equality, |_, left, right| {
            Scalar::Bool(left.truthy() && right.truthy())
        })
    }

    fn equality(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["==", "!="], Self::comparison, |symbol, left, right| {
            let equal = match (&left, &right) {
                (Scalar::Text(left), Scalar::Text(right)) => left == right,
                (Scalar::Bool(left), Scalar::Bool(right)) => left == right,
                _ => left.number() == right.number(),
            };
            Scalar::Bool(equal == (symbol == "=="))
        })
    }

    fn comparison(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["<", "<=", ">", ">="], Self::additive, |symbol, left, right| {
            let ordering = match (&left, &right) {
                (Scalar::Text(left), Scalar::Text(right)) => Some(left.cmp(right)),
                _ => left.number().partial_cmp(&right.number()),
            };
            Scalar::Bool(ordering.is_some_and(|ordering| match symbol {
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        })
    }

    fn additive(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["+", "-"], Self::multiplicative, |symbol, left, right| {
            match (symbol, &left, &right) {
                ("+", Scalar::Text(_), _) | ("+", _, Scalar::Text(_)) => {
                    Scalar::Text(format!("{left}{right}"))
                }
                ("+", _, _) => Scalar::Number(left.number() + right.number()),
                _ => Scalar::Number(left.number() - right.number()),
            }
        })
    }

    fn multiplicative(&mut self) -> std::result::Result<Scalar, FormulaError> {
        self.binary(&["*", "/", "%"], Self::unary, |symbol, left, right| {
            let (left, right) = (left.number(), right.number());
            Scalar::Number(match symbol {
                "*" => left * right,
                "/" => left / right,
                _ => left % right,
            })
        })
    }

    fn unary(&mut self) -> std::result::Result<Scalar, FormulaError> {
        if self.eat("-") {
            return Ok(Scalar::Number(-self.unary()?.number()));
        }
        if self.eat("+") {
            return Ok(Scalar::Number(self.unary()?.number()));
        }
        if self.eat("!") {
            return Ok(Scalar::Bool(!self.unary()?.truthy()));
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Scalar, FormulaError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FormulaError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Number(value) => Ok(Scalar::Number(value)),
            Token::Text(text) => Ok(Scalar::Text(text)),
            Token::Symbol("(") => {
                let value = self.conditional()?;
                self.expect(")")?;
                Ok(value)
            }
            Token::Ident(name) if self.eat("(") => {
                let mut arguments = Vec::new();
                if !self.eat(")") {
                    loop {
                        arguments.push(self.conditional()?.number());
                        if self.eat(")") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                call(&name, &arguments)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Scalar::Bool(true)),
                "false" => Ok(Scalar::Bool(false)),
                "NaN" => Ok(Scalar::Number(f64::NAN)),
                "Infinity" => Ok(Scalar::Number(f64::INFINITY)),
                "null" => Ok(Scalar::Number(0.0)),
                _ => Err(FormulaError::UnknownIdentifier(name)),
            },
            Token::Symbol(symbol) => Err(FormulaError::UnexpectedToken(symbol.to_string())),
        }
    }
}

fn call(name: &str, arguments: &[f64]) -> std::result::Result<Scalar, FormulaError> {
    let function = name.strip_prefix("Math.").unwrap_or(name);
    let arity = || FormulaError::Arity {
        name: function.to_string(),
        actual: arguments.len(),
    };
    let value = match (function, arguments) {
        ("abs", [x]) => x.abs(),
        ("ceil", [x]) => x.ceil(),
        ("floor", [x]) => x.floor(),
        ("round", [x]) => (x + 0.5).floor(),
        ("trunc", [x]) => x.trunc(),
        ("sqrt", [x]) => x.sqrt(),
        ("pow", [base, exponent]) => base.powf(*exponent),
        ("min", [first, rest @ ..]) => rest.iter().fold(*first, |acc, x| acc.min(*x)),
        ("max", [first, rest @ ..]) => rest.iter().fold(*first, |acc, x| acc.max(*x)),
        ("abs" | "ceil" | "floor" | "round" | "trunc" | "sqrt" | "pow" | "min" | "max", _) => {
            return Err(arity());
        }
        _ => return Err(FormulaError::UnknownFunction(name.to_string())),
    };
    Ok(Scalar::Number(value))
}
