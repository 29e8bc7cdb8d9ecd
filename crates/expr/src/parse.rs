//! Recursive-descent parser for expression and field source text.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! cond    := eq ( "?" eq ":" eq )?
//! eq      := add ( "==" add )*
//! add     := mul ( ("+" | "-") mul )*
//! mul     := primary ( ("*" | "/" | "%") primary )*
//! primary := number | "-" number | "-" primary | "x" | "y"
//!          | name "(" cond ( "," cond )? ")" | "(" cond ")"
//! ```
//!
//! Field source is one `dx = <cond>` line and one `dy = <cond>` line.
//! Positions in errors are byte offsets into the full input. Trees deeper
//! than [`MAX_DEPTH`] and literals that overflow to infinity are rejected.

use crate::ast::{BinOp, Expr, Func, Func2};
use crate::compile::MAX_DEPTH;
use flowfield_core::FlowError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    Question,
    Colon,
    Comma,
    LParen,
    RParen,
}

fn error(position: usize, message: impl Into<String>) -> FlowError {
    FlowError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(text: &str, base: usize) -> Result<Vec<(usize, Token)>, FlowError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let single = match c {
            b' ' | b'\t' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Some(Token::Op(BinOp::Add)),
            b'-' => Some(Token::Op(BinOp::Sub)),
            b'*' => Some(Token::Op(BinOp::Mul)),
            b'/' => Some(Token::Op(BinOp::Div)),
            b'%' => Some(Token::Op(BinOp::Rem)),
            b'?' => Some(Token::Question),
            b':' => Some(Token::Colon),
            b',' => Some(Token::Comma),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((base + start, token));
            i += 1;
            continue;
        }

        if c == b'=' {
            if bytes.get(i + 1) == Some(&b'=') {
                tokens.push((base + start, Token::Op(BinOp::Eq)));
                i += 2;
                continue;
            }
            return Err(error(base + start, "expected '=='"));
        }

        if c.is_ascii_digit() || c == b'.' {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    while j < bytes.len() && bytes[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let literal = &text[start..i];
            let value = literal
                .parse::<f64>()
                .map_err(|_| error(base + start, format!("invalid number '{literal}'")))?;
            if !value.is_finite() {
                return Err(error(base + start, format!("number out of range '{literal}'")));
            }
            tokens.push((base + start, Token::Num(value)));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push((base + start, Token::Ident(text[start..i].to_owned())));
            continue;
        }

        let ch = text[start..].chars().next().unwrap_or('?');
        return Err(error(base + start, format!("unexpected character '{ch}'")));
    }
    Ok(tokens)
}

/// An expression with its tree depth.
type Node = (Expr, usize);

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    /// Open parentheses, calls and negations around the current position.
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(at, _)| *at)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<(), FlowError> {
        let at = self.offset();
        match self.bump() {
            Some(t) if t == want => Ok(()),
            _ => Err(error(at, format!("expected {what}"))),
        }
    }

    fn binary_op(&self, allowed: &[BinOp]) -> Option<BinOp> {
        match self.peek() {
            Some(Token::Op(op)) if allowed.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn node(at: usize, expr: Expr, depth: usize) -> Result<Node, FlowError> {
        if depth > MAX_DEPTH {
            return Err(error(at, "nesting too deep"));
        }
        Ok((expr, depth))
    }

    /// Parses with `rule` one nesting level deeper.
    fn nested(
        &mut self,
        at: usize,
        rule: fn(&mut Self) -> Result<Node, FlowError>,
    ) -> Result<Node, FlowError> {
        if self.nesting >= MAX_DEPTH {
            return Err(error(at, "nesting too deep"));
        }
        self.nesting += 1;
        let out = rule(self);
        self.nesting -= 1;
        out
    }

    fn cond(&mut self) -> Result<Node, FlowError> {
        let at = self.offset();
        let (c, c_depth) = self.equality()?;
        if self.peek() != Some(&Token::Question) {
            return Ok((c, c_depth));
        }
        self.bump();
        let (then, then_depth) = self.equality()?;
        self.expect(Token::Colon, "':'")?;
        let (otherwise, otherwise_depth) = self.equality()?;
        let depth = 1 + c_depth.max(then_depth).max(otherwise_depth);
        Self::node(at, Expr::cond(c, then, otherwise), depth)
    }

    fn equality(&mut self) -> Result<Node, FlowError> {
        self.left_assoc(&[BinOp::Eq], Self::add)
    }

    fn add(&mut self) -> Result<Node, FlowError> {
        self.left_assoc(&[BinOp::Add, BinOp::Sub], Self::mul)
    }

    fn mul(&mut self) -> Result<Node, FlowError> {
        self.left_assoc(&[BinOp::Mul, BinOp::Div, BinOp::Rem], Self::primary)
    }

    fn left_assoc(
        &mut self,
        ops: &[BinOp],
        operand: fn(&mut Self) -> Result<Node, FlowError>,
    ) -> Result<Node, FlowError> {
        let (mut lhs, mut depth) = operand(self)?;
        while let Some(op) = self.binary_op(ops) {
            let at = self.offset();
            self.bump();
            let (rhs, rhs_depth) = operand(self)?;
            (lhs, depth) = Self::node(at, Expr::binary(op, lhs, rhs), 1 + depth.max(rhs_depth))?;
        }
        Ok((lhs, depth))
    }

    fn primary(&mut self) -> Result<Node, FlowError> {
        let at = self.offset();
        match self.bump() {
            Some(Token::Num(v)) => Ok((Expr::num(v), 1)),
            Some(Token::Op(BinOp::Sub)) => {
                if let Some(Token::Num(v)) = self.peek() {
                    let v = *v;
                    self.bump();
                    return Ok((Expr::num(-v), 1));
                }
                let (operand, depth) = self.nested(at, Self::primary)?;
                Self::node(at, Expr::binary(BinOp::Mul, Expr::num(-1.0), operand), depth + 1)
            }
            Some(Token::LParen) => {
                let inner = self.nested(at, Self::cond)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.ident(at, &name),
            Some(_) => Err(error(at, "expected an operand")),
            None => Err(error(at, "unexpected end of expression")),
        }
    }

    fn ident(&mut self, at: usize, name: &str) -> Result<Node, FlowError> {
        match name {
            "x" => return Ok((Expr::x(), 1)),
            "y" => return Ok((Expr::y(), 1)),
            _ => {}
        }
        if let Some(f) = Func::from_name(name) {
            self.expect(Token::LParen, "'('")?;
            let (a, depth) = self.nested(at, Self::cond)?;
            self.expect(Token::RParen, "')'")?;
            return Self::node(at, Expr::call(f, a), depth + 1);
        }
        if let Some(f) = Func2::from_name(name) {
            self.expect(Token::LParen, "'('")?;
            let (a, a_depth) = self.nested(at, Self::cond)?;
            self.expect(Token::Comma, "','")?;
            let (b, b_depth) = self.nested(at, Self::cond)?;
            self.expect(Token::RParen, "')'")?;
            return Self::node(at, Expr::call2(f, a, b), 1 + a_depth.max(b_depth));
        }
        Err(error(at, format!("unknown name '{name}'")))
    }
}

fn parse_at(text: &str, base: usize) -> Result<Expr, FlowError> {
    let tokens = tokenize(text, base)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: base + text.len(),
        nesting: 0,
    };
    let (expr, _) = parser.cond()?;
    if parser.peek().is_some() {
        return Err(error(parser.offset(), "unexpected trailing input"));
    }
    Ok(expr)
}

/// Parses a single expression.
pub fn parse_expr(text: &str) -> Result<Expr, FlowError> {
    parse_at(text, 0)
}

/// Parses field source text into its x and y expressions.
///
/// Blank lines are ignored. Each of `dx` and `dy` must appear exactly once,
/// in either order.
pub fn parse_source(text: &str) -> Result<(Expr, Expr), FlowError> {
    let mut dx = None;
    let mut dy = None;
    let mut offset = 0;
    for line in text.split('\n') {
        let line_start = offset;
        offset += line.len() + 1;

        let trimmed = line.trim_start();
        if trimmed.trim().is_empty() {
            continue;
        }
        let lead = line_start + (line.len() - trimmed.len());
        let Some(eq) = trimmed.find('=') else {
            return Err(error(lead, "expected 'dx = ...' or 'dy = ...'"));
        };
        let slot = match trimmed[..eq].trim() {
            "dx" => &mut dx,
            "dy" => &mut dy,
            other => return Err(error(lead, format!("unknown component '{other}'"))),
        };
        if slot.is_some() {
            return Err(error(lead, "component assigned twice"));
        }
        let rhs_start = eq + 1;
        *slot = Some(parse_at(&trimmed[rhs_start..], lead + rhs_start)?);
    }
    match (dx, dy) {
        (Some(x), Some(y)) => Ok((x, y)),
        (None, _) => Err(error(text.len(), "missing 'dx' line")),
        (_, None) => Err(error(text.len(), "missing 'dy' line")),
    }
}
