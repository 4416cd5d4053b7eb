//! Condition and assignment expressions
//!
//! A deliberately small language over JSON values:
//!
//! - literals: `12`, `0.5`, `'text'`, `"text"`, `true`/`True`,
//!   `false`/`False`, `null`/`None`
//! - names, looked up in the dialogue context; unknown names are `null`
//! - `not`, `and`, `or` (the last two return one of their operands)
//! - `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - `+`, `-`, `*`, `/`, unary `-`, parentheses
//!
//! Truthiness follows the usual scripting rules: `null`, `false`, zero,
//! and empty strings, lists and objects are false.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use crate::error::{DialogueError, Result};

/// A parsed expression plus its source text
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Literal(Value),
    Name(String),
    Not(Box<Node>),
    Neg(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl Expression {
    /// Parse `source`
    pub fn parse(source: &str) -> Result<Self> {
        let parse_error = |reason: String| DialogueError::Parse {
            expr: source.to_string(),
            reason,
        };

        let tokens = tokenize(source).map_err(parse_error)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.or().map_err(parse_error)?;
        if let Some(token) = parser.peek() {
            return Err(parse_error(format!("unexpected {token} after expression")));
        }

        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// An expression that always yields `value`
    pub fn literal(value: Value) -> Self {
        Self {
            source: value.to_string(),
            root: Node::Literal(value),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `context`, with `extra` names taking precedence
    pub fn eval(&self, context: &Map<String, Value>, extra: &[(&str, Value)]) -> Result<Value> {
        let scope = Scope { context, extra };
        eval(&self.root, &scope).map_err(|reason| DialogueError::Eval {
            expr: self.source.clone(),
            reason,
        })
    }

    /// Evaluate and apply truthiness
    pub fn is_true(&self, context: &Map<String, Value>, extra: &[(&str, Value)]) -> Result<bool> {
        Ok(truthy(&self.eval(context, extra)?))
    }
}

/// Whether `value` counts as true in a condition
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(Value),
    Word(String),
    Symbol(&'static str),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Literal(value) => write!(f, "literal {value}"),
            Token::Word(word) => write!(f, "`{word}`"),
            Token::Symbol(symbol) => write!(f, "`{symbol}`"),
        }
    }
}

const SYMBOLS: &[&str] = &[
    "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "(", ")",
];

fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = if text.contains('.') {
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            } else {
                text.parse::<i64>().ok().map(Value::from)
            };
            tokens.push(Token::Literal(
                value.ok_or_else(|| format!("invalid number `{text}`"))?,
            ));
        } else if c == '\'' || c == '"' {
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string".to_string()),
                    Some('\\') => {
                        let escaped = chars
                            .get(i + 1)
                            .ok_or_else(|| "unterminated string".to_string())?;
                        text.push(*escaped);
                        i += 2;
                    }
                    Some(&q) if q == c => {
                        i += 1;
                        break;
                    }
                    Some(&other) => {
                        text.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Literal(Value::String(text)));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let symbol = SYMBOLS
                .iter()
                .find(|symbol| rest.starts_with(**symbol))
                .ok_or_else(|| format!("unexpected character `{c}`"))?;
            tokens.push(Token::Symbol(symbol));
            i += symbol.len();
        }
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses, `not` and unary minus the parser accepts
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

type ParseResult = std::result::Result<Node, String>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == word) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn nested(&mut self, parse: fn(&mut Self) -> ParseResult) -> ParseResult {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn or(&mut self) -> ParseResult {
        let mut left = self.and()?;
        while self.eat_word("or") {
            left = Node::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> ParseResult {
        let mut left = self.not()?;
        while self.eat_word("and") {
            left = Node::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> ParseResult {
        if self.eat_word("not") {
            return Ok(Node::Not(Box::new(self.nested(Self::not)?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult {
        let left = self.additive()?;
        for (symbol, op) in [
            ("==", BinOp::Eq),
            ("!=", BinOp::Ne),
            ("<=", BinOp::Le),
            (">=", BinOp::Ge),
            ("<", BinOp::Lt),
            (">", BinOp::Gt),
        ] {
            if self.eat_symbol(symbol) {
                let right = self.additive()?;
                return Ok(Node::Binary(op, Box::new(left), Box::new(right)));
            }
        }
        Ok(left)
    }

    fn additive(&mut self) -> ParseResult {
        let mut left = self.term()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinOp::Add
            } else if self.eat_symbol("-") {
                BinOp::Sub
            } else {
                return Ok(left);
            };
            left = Node::Binary(op, Box::new(left), Box::new(self.term()?));
        }
    }

    fn term(&mut self) -> ParseResult {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinOp::Mul
            } else if self.eat_symbol("/") {
                BinOp::Div
            } else {
                return Ok(left);
            };
            left = Node::Binary(op, Box::new(left), Box::new(self.unary()?));
        }
    }

    fn unary(&mut self) -> ParseResult {
        if self.eat_symbol("-") {
            return Ok(Node::Neg(Box::new(self.nested(Self::unary)?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult {
        match self.next() {
            Some(Token::Literal(value)) => Ok(Node::Literal(value)),
            Some(Token::Word(word)) => match word.as_str() {
                "true" | "True" => Ok(Node::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Node::Literal(Value::Bool(false))),
                "null" | "None" => Ok(Node::Literal(Value::Null)),
                "and" | "or" | "not" => Err(format!("unexpected `{word}`")),
                _ => Ok(Node::Name(word)),
            },
            Some(Token::Symbol("(")) => {
                let inner = self.nested(Self::or)?;
                if !self.eat_symbol(")") {
                    return Err("missing `)`".to_string());
                }
                Ok(inner)
            }
            Some(token) => Err(format!("unexpected {token}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

struct Scope<'a> {
    context: &'a Map<String, Value>,
    extra: &'a [(&'a str, Value)],
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Value {
        self.extra
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
            .or_else(|| self.context.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

type EvalResult = std::result::Result<Value, String>;

fn eval(node: &Node, scope: &Scope<'_>) -> EvalResult {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Name(name) => Ok(scope.lookup(name)),
        Node::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, scope)?))),
        Node::Neg(inner) => match eval(inner, scope)? {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i
                    .checked_neg()
                    .map(Value::from)
                    .ok_or_else(|| "integer overflow".to_string()),
                None => float(-n.as_f64().unwrap_or(f64::NAN)),
            },
            other => Err(format!("cannot negate {other}")),
        },
        Node::And(left, right) => {
            let left = eval(left, scope)?;
            if truthy(&left) {
                eval(right, scope)
            } else {
                Ok(left)
            }
        }
        Node::Or(left, right) => {
            let left = eval(left, scope)?;
            if truthy(&left) {
                Ok(left)
            } else {
                eval(right, scope)
            }
        }
        Node::Binary(op, left, right) => binary(*op, &eval(left, scope)?, &eval(right, scope)?),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinOp::Eq => Ok(Value::Bool(equal(left, right))),
        BinOp::Ne => Ok(Value::Bool(!equal(left, right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(left, right)
                .ok_or_else(|| format!("cannot compare {left} with {right}"))?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => arithmetic(op, left, right),
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> EvalResult {
    if let (BinOp::Add, Value::String(a), Value::String(b)) = (op, left, right) {
        return Ok(Value::String(format!("{a}{b}")));
    }

    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(format!("unsupported operands {left} and {right}"));
    };

    if op != BinOp::Div {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            let exact = match op {
                BinOp::Add => x.checked_add(y),
                BinOp::Sub => x.checked_sub(y),
                BinOp::Mul => x.checked_mul(y),
                _ => None,
            };
            if let Some(result) = exact {
                return Ok(Value::from(result));
            }
        }
    }

    let (x, y) = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(format!("unsupported operands {left} and {right}")),
    };
    match op {
        BinOp::Add => float(x + y),
        BinOp::Sub => float(x - y),
        BinOp::Mul => float(x * y),
        _ if y == 0.0 => Err("division by zero".to_string()),
        _ => float(x / y),
    }
}

fn float(value: f64) -> EvalResult {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| "result is not a finite number".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Map<String, Value> {
        match json!({ "met": true, "gold": 12, "name": "Ray", "items": [] }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn eval_str(source: &str) -> Value {
        Expression::parse(source).unwrap().eval(&context(), &[]).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("1 + 2 * 3"), json!(7));
        assert_eq!(eval_str("(1 + 2) * 3"), json!(9));
        assert_eq!(eval_str("-2 * -3"), json!(6));
        assert_eq!(eval_str("7 / 2"), json!(3.5));
        assert_eq!(eval_str("1 + 2 * 3 == 7"), json!(true));
    }

    #[test]
    fn test_logic_returns_operands() {
        assert_eq!(eval_str("met and gold > 10"), json!(true));
        assert_eq!(eval_str("not met"), json!(false));
        assert_eq!(eval_str("stranger or 'nobody'"), json!("nobody"));
        assert_eq!(eval_str("items and 1"), json!([]));
        assert_eq!(eval_str("not (gold >= 12) or name == \"Ray\""), json!(true));
    }

    #[test]
    fn test_unknown_names_are_null() {
        assert_eq!(eval_str("missing"), Value::Null);
        assert_eq!(eval_str("missing == None"), json!(true));
    }

    #[test]
    fn test_extra_names_shadow_context() {
        let expr = Expression::parse("_seen == 0 and gold").unwrap();
        assert!(expr.is_true(&context(), &[("_seen", json!(0))]).unwrap());
        assert!(!expr.is_true(&context(), &[("_seen", json!(1))]).unwrap());
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(eval_str("gold == 12.0"), json!(true));
        assert_eq!(eval_str("'a' + 'b' < 'b'"), json!(true));
    }

    #[test]
    fn test_parse_errors() {
        for source in ["1 +", "(1", "'open", "gold $ 2", "1 2", "and"] {
            assert!(
                matches!(Expression::parse(source), Err(DialogueError::Parse { .. })),
                "{source} should not parse"
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let nots = format!("{}x", "not ".repeat(10_000));
        let negs = format!("{}1", "-".repeat(10_000));
        for source in [&parens, &nots, &negs] {
            match Expression::parse(source) {
                Err(DialogueError::Parse { reason, .. }) => {
                    assert_eq!(reason, "expression nested too deeply")
                }
                other => panic!("expected a nesting error, got {other:?}"),
            }
        }

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(Expression::parse(&shallow).unwrap().eval(&context(), &[]).unwrap(), json!(1));
    }

    #[test]
    fn test_eval_errors() {
        for source in ["'a' - 1", "1 / 0", "name < 3", "-name"] {
            let expr = Expression::parse(source).unwrap();
            assert!(
                matches!(expr.eval(&context(), &[]), Err(DialogueError::Eval { .. })),
                "{source} should fail"
            );
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!({})));
        assert!(truthy(&json!(0.1)));
        assert!(truthy(&json!([0])));
    }
}
