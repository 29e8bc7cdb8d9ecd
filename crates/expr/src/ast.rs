//! Scalar expression trees over a 2D point.
//!
//! An [`Expr`] is an immutable tree evaluated recursively against a point.
//! Rendering via `Display` produces the textual form used for persistence;
//! parentheses are emitted only where precedence requires them, and
//! [`crate::parse`] is its exact inverse.
//!
//! Operator semantics follow IEEE-754. Where host float helpers disagree
//! with the conventional scripting semantics the textual form implies,
//! the scripting semantics win: `round` rounds half up, `sign(0)` is 0,
//! and `min`/`max` propagate NaN.

use glam::DVec2;
use std::fmt;

/// Coordinate component of the evaluation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    X,
    Y,
}

/// One-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Log,
    Sqrt,
    Abs,
    Sign,
    Round,
}

/// Two-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func2 {
    Min,
    Max,
}

/// Infix operators. `Eq` yields 1.0 or 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
}

/// A scalar function of a 2D point.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Var),
    Call(Func, Box<Expr>),
    Call2(Func2, Box<Expr>, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : otherwise`; `cond` is truthy when non-zero and not NaN.
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Func {
    pub const ALL: [Func; 8] = [
        Func::Sin,
        Func::Cos,
        Func::Tan,
        Func::Log,
        Func::Sqrt,
        Func::Abs,
        Func::Sign,
        Func::Round,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Log => "log",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Sign => "sign",
            Func::Round => "round",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        Func::ALL.into_iter().find(|f| f.name() == name)
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Log => v.ln(),
            Func::Sqrt => v.sqrt(),
            Func::Abs => v.abs(),
            Func::Sign => {
                if v.is_nan() || v == 0.0 {
                    v
                } else {
                    v.signum()
                }
            }
            Func::Round => round_half_up(v),
        }
    }
}

/// Nearest integer with halves rounded up, decided on the fractional part.
/// A zero result keeps the sign of `v`.
fn round_half_up(v: f64) -> f64 {
    let floor = v.floor();
    let r = if v - floor >= 0.5 { floor + 1.0 } else { floor };
    if r == 0.0 {
        r.copysign(v)
    } else {
        r
    }
}

impl Func2 {
    pub fn name(self) -> &'static str {
        match self {
            Func2::Min => "min",
            Func2::Max => "max",
        }
    }

    pub fn from_name(name: &str) -> Option<Func2> {
        match name {
            "min" => Some(Func2::Min),
            "max" => Some(Func2::Max),
            _ => None,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            return f64::NAN;
        }
        match self {
            Func2::Min => a.min(b),
            Func2::Max => a.max(b),
        }
    }
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
        }
    }

    /// Binding strength; all infix operators are left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Eq => PREC_EQ,
            BinOp::Add | BinOp::Sub => PREC_ADD,
            BinOp::Mul | BinOp::Div | BinOp::Rem => PREC_MUL,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Rem => a % b,
            BinOp::Eq => {
                if a == b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

pub(crate) const PREC_COND: u8 = 0;
pub(crate) const PREC_EQ: u8 = 1;
pub(crate) const PREC_ADD: u8 = 2;
pub(crate) const PREC_MUL: u8 = 3;
const PREC_ATOM: u8 = 4;

impl Expr {
    pub fn num(v: f64) -> Expr {
        Expr::Num(v)
    }

    pub fn x() -> Expr {
        Expr::Var(Var::X)
    }

    pub fn y() -> Expr {
        Expr::Var(Var::Y)
    }

    pub fn call(f: Func, a: Expr) -> Expr {
        Expr::Call(f, Box::new(a))
    }

    pub fn call2(f: Func2, a: Expr, b: Expr) -> Expr {
        Expr::Call2(f, Box::new(a), Box::new(b))
    }

    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Expr {
        Expr::Binary(op, Box::new(a), Box::new(b))
    }

    pub fn cond(c: Expr, then: Expr, otherwise: Expr) -> Expr {
        Expr::Cond(Box::new(c), Box::new(then), Box::new(otherwise))
    }

    /// Evaluates the expression at `p`. May return NaN or an infinity.
    pub fn eval(&self, p: DVec2) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var(Var::X) => p.x,
            Expr::Var(Var::Y) => p.y,
            Expr::Call(f, a) => f.apply(a.eval(p)),
            Expr::Call2(f, a, b) => f.apply(a.eval(p), b.eval(p)),
            Expr::Binary(op, a, b) => op.apply(a.eval(p), b.eval(p)),
            Expr::Cond(c, then, otherwise) => {
                let c = c.eval(p);
                if c != 0.0 && !c.is_nan() {
                    then.eval(p)
                } else {
                    otherwise.eval(p)
                }
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            Expr::Num(_) | Expr::Var(_) => 1,
            Expr::Call(_, a) => 1 + a.size(),
            Expr::Call2(_, a, b) | Expr::Binary(_, a, b) => 1 + a.size() + b.size(),
            Expr::Cond(c, t, e) => 1 + c.size() + t.size() + e.size(),
        }
    }

    /// Longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Num(_) | Expr::Var(_) => 1,
            Expr::Call(_, a) => 1 + a.depth(),
            Expr::Call2(_, a, b) | Expr::Binary(_, a, b) => 1 + a.depth().max(b.depth()),
            Expr::Cond(c, t, e) => 1 + c.depth().max(t.depth()).max(e.depth()),
        }
    }

    /// Whether every numeric literal is finite. Only such trees render to
    /// text that parses back.
    pub fn literals_finite(&self) -> bool {
        match self {
            Expr::Num(v) => v.is_finite(),
            Expr::Var(_) => true,
            Expr::Call(_, a) => a.literals_finite(),
            Expr::Call2(_, a, b) | Expr::Binary(_, a, b) => {
                a.literals_finite() && b.literals_finite()
            }
            Expr::Cond(c, t, e) => c.literals_finite() && t.literals_finite() && e.literals_finite(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(op, _, _) => op.precedence(),
            Expr::Cond(..) => PREC_COND,
            _ => PREC_ATOM,
        }
    }

    fn write_with(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "(")?;
            self.write_bare(f)?;
            return write!(f, ")");
        }
        self.write_bare(f)
    }

    fn write_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Var(Var::X) => write!(f, "x"),
            Expr::Var(Var::Y) => write!(f, "y"),
            Expr::Call(func, a) => {
                write!(f, "{}(", func.name())?;
                a.write_with(f, PREC_COND)?;
                write!(f, ")")
            }
            Expr::Call2(func, a, b) => {
                write!(f, "{}(", func.name())?;
                a.write_with(f, PREC_COND)?;
                write!(f, ",")?;
                b.write_with(f, PREC_COND)?;
                write!(f, ")")
            }
            Expr::Binary(op, a, b) => {
                let prec = op.precedence();
                a.write_with(f, prec)?;
                write!(f, "{}", op.symbol())?;
                // Left-associative: an equal-precedence right operand needs parens.
                b.write_with(f, prec + 1)
            }
            Expr::Cond(c, then, otherwise) => {
                c.write_with(f, PREC_EQ)?;
                write!(f, " ? ")?;
                then.write_with(f, PREC_EQ)?;
                write!(f, " : ")?;
                otherwise.write_with(f, PREC_EQ)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, PREC_COND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    #[test]
    fn variables_read_point_components() {
        assert_eq!(Expr::x().eval(at(3.0, -2.0)), 3.0);
        assert_eq!(Expr::y().eval(at(3.0, -2.0)), -2.0);
    }

    #[test]
    fn arithmetic_evaluates() {
        let e = Expr::binary(BinOp::Div, Expr::y(), Expr::x());
        assert_eq!(e.eval(at(4.0, 2.0)), 0.5);
        assert!(e.eval(at(0.0, 0.0)).is_nan());
        assert_eq!(e.eval(at(0.0, 1.0)), f64::INFINITY);
    }

    #[test]
    fn round_is_half_up() {
        let e = Expr::call(Func::Round, Expr::x());
        assert_eq!(e.eval(at(2.5, 0.0)), 3.0);
        assert_eq!(e.eval(at(-2.5, 0.0)), -2.0);
        assert_eq!(e.eval(at(-2.6, 0.0)), -3.0);
    }

    #[test]
    fn round_decides_on_the_fraction() {
        let e = Expr::call(Func::Round, Expr::x());
        assert_eq!(e.eval(at(0.49999999999999994, 0.0)), 0.0);
        assert_eq!(e.eval(at(4503599627370497.0, 0.0)), 4503599627370497.0);
        let neg_zero = e.eval(at(-0.4, 0.0));
        assert_eq!(neg_zero, 0.0);
        assert!(neg_zero.is_sign_negative());
        assert!(e.eval(at(f64::NAN, 0.0)).is_nan());
        assert_eq!(e.eval(at(f64::INFINITY, 0.0)), f64::INFINITY);
    }

    #[test]
    fn even_odd_parity_at_the_rounding_edge() {
        let parity = Expr::binary(
            BinOp::Eq,
            Expr::binary(BinOp::Rem, Expr::call(Func::Round, Expr::x()), Expr::num(2.0)),
            Expr::num(0.0),
        );
        assert_eq!(parity.eval(at(0.49999999999999994, 0.0)), 1.0);
    }

    #[test]
    fn non_finite_literals_are_detected() {
        assert!(Expr::binary(BinOp::Add, Expr::x(), Expr::num(2.0)).literals_finite());
        let inf = Expr::call(Func::Sin, Expr::num(f64::INFINITY));
        assert!(!inf.literals_finite());
        assert!(!Expr::cond(Expr::x(), Expr::y(), Expr::num(f64::NAN)).literals_finite());
    }

    #[test]
    fn sign_of_zero_and_nan() {
        let e = Expr::call(Func::Sign, Expr::x());
        assert_eq!(e.eval(at(0.0, 0.0)), 0.0);
        assert_eq!(e.eval(at(-3.0, 0.0)), -1.0);
        assert_eq!(e.eval(at(7.0, 0.0)), 1.0);
        assert!(e.eval(at(f64::NAN, 0.0)).is_nan());
    }

    #[test]
    fn min_max_propagate_nan() {
        let min = Expr::call2(Func2::Min, Expr::x(), Expr::y());
        let max = Expr::call2(Func2::Max, Expr::x(), Expr::y());
        assert_eq!(min.eval(at(1.0, 2.0)), 1.0);
        assert_eq!(max.eval(at(1.0, 2.0)), 2.0);
        assert!(min.eval(at(f64::NAN, 2.0)).is_nan());
        assert!(max.eval(at(1.0, f64::NAN)).is_nan());
    }

    #[test]
    fn log_of_zero_is_negative_infinity() {
        let e = Expr::call(Func::Log, Expr::call(Func::Abs, Expr::x()));
        assert_eq!(e.eval(at(0.0, 0.0)), f64::NEG_INFINITY);
    }

    #[test]
    fn conditional_treats_nan_as_false() {
        let e = Expr::cond(Expr::x(), Expr::num(1.0), Expr::num(2.0));
        assert_eq!(e.eval(at(5.0, 0.0)), 1.0);
        assert_eq!(e.eval(at(0.0, 0.0)), 2.0);
        assert_eq!(e.eval(at(f64::NAN, 0.0)), 2.0);
    }

    #[test]
    fn even_odd_shape_evaluates() {
        // round(x)%2==0 ? x : x+1
        let e = Expr::cond(
            Expr::binary(
                BinOp::Eq,
                Expr::binary(BinOp::Rem, Expr::call(Func::Round, Expr::x()), Expr::num(2.0)),
                Expr::num(0.0),
            ),
            Expr::x(),
            Expr::binary(BinOp::Add, Expr::x(), Expr::num(1.0)),
        );
        assert_eq!(e.to_string(), "round(x)%2==0 ? x : x+1");
        assert_eq!(e.eval(at(2.2, 0.0)), 2.2);
        assert_eq!(e.eval(at(3.1, 0.0)), 4.1);
        assert_eq!(e.eval(at(-2.2, 0.0)), -2.2);
    }

    #[test]
    fn display_omits_redundant_parens() {
        let e = Expr::binary(
            BinOp::Add,
            Expr::binary(BinOp::Mul, Expr::x(), Expr::x()),
            Expr::binary(BinOp::Mul, Expr::y(), Expr::y()),
        );
        assert_eq!(Expr::call(Func::Sqrt, e).to_string(), "sqrt(x*x+y*y)");
    }

    #[test]
    fn display_parenthesizes_right_operand_of_equal_precedence() {
        let e = Expr::binary(
            BinOp::Div,
            Expr::y(),
            Expr::binary(BinOp::Mul, Expr::x(), Expr::y()),
        );
        assert_eq!(e.to_string(), "y/(x*y)");
        let left = Expr::binary(
            BinOp::Div,
            Expr::binary(BinOp::Mul, Expr::x(), Expr::y()),
            Expr::y(),
        );
        assert_eq!(left.to_string(), "x*y/y");
    }

    #[test]
    fn display_parenthesizes_lower_precedence_child() {
        let e = Expr::binary(
            BinOp::Mul,
            Expr::binary(BinOp::Sub, Expr::x(), Expr::y()),
            Expr::cond(Expr::x(), Expr::y(), Expr::x()),
        );
        assert_eq!(e.to_string(), "(x-y)*(x ? y : x)");
    }

    #[test]
    fn size_and_depth() {
        let e = Expr::call(
            Func::Sin,
            Expr::binary(BinOp::Div, Expr::x(), Expr::y()),
        );
        assert_eq!(e.size(), 4);
        assert_eq!(e.depth(), 3);
    }

    #[test]
    fn func_names_round_trip() {
        for f in Func::ALL {
            assert_eq!(Func::from_name(f.name()), Some(f));
        }
        assert_eq!(Func2::from_name("max"), Some(Func2::Max));
        assert_eq!(Func::from_name("exp"), None);
    }
}
