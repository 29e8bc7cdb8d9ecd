//! Weighted expression grammar.
//!
//! A [`Grammar`] is a fixed, ordered list of [`GrammarRule`]s. Each rule
//! belongs to a [`RuleClass`] whose current weight lives in a
//! [`ProbabilityTable`]. The table is mutated while the synthesizer
//! descends into a rule's children and restored afterwards.

use crate::ast::{BinOp, Expr, Func, Func2};
use flowfield_core::FlowError;

/// Weight scale shared by all classes.
pub const BASE_WEIGHT: f64 = 10.0;

/// Factor applied to a class's weight while expanding that class's children.
pub const SELF_CLASS_DAMPING: f64 = 0.25;

/// Tolerance on the normalized probability mass before a draw.
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Category of rules sharing one weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleClass {
    Point,
    Length,
    Trigonometry,
    Arithmetic,
    MinMax,
    Exponential,
    Sign,
    EvenOdd,
}

impl RuleClass {
    pub const ALL: [RuleClass; 8] = [
        RuleClass::Point,
        RuleClass::Length,
        RuleClass::Trigonometry,
        RuleClass::Arithmetic,
        RuleClass::MinMax,
        RuleClass::Exponential,
        RuleClass::Sign,
        RuleClass::EvenOdd,
    ];

    pub fn base_weight(self) -> f64 {
        match self {
            RuleClass::Point => BASE_WEIGHT,
            RuleClass::Length => BASE_WEIGHT * 0.5,
            RuleClass::Trigonometry => BASE_WEIGHT * 0.9,
            RuleClass::Arithmetic => BASE_WEIGHT * 0.6,
            RuleClass::MinMax => BASE_WEIGHT * 0.4,
            RuleClass::Exponential => BASE_WEIGHT * 0.1,
            RuleClass::Sign => BASE_WEIGHT * 0.01,
            RuleClass::EvenOdd => BASE_WEIGHT * 0.3,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// How a rule builds its expression.
#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
    /// A terminal.
    Constant(fn() -> Expr),
    /// Combines one freshly synthesized child.
    Unary(fn(Expr) -> Expr),
    /// Combines two freshly synthesized children, left first.
    Binary(fn(Expr, Expr) -> Expr),
}

#[derive(Debug, Clone, Copy)]
pub struct GrammarRule {
    pub name: &'static str,
    pub class: RuleClass,
    pub kind: RuleKind,
}

impl GrammarRule {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, RuleKind::Constant(_))
    }
}

fn length() -> Expr {
    let sq = |v: fn() -> Expr| Expr::binary(BinOp::Mul, v(), v());
    Expr::call(
        Func::Sqrt,
        Expr::binary(BinOp::Add, sq(Expr::x), sq(Expr::y)),
    )
}

fn sin_cos_tan(a: Expr) -> Expr {
    Expr::call(Func::Sin, Expr::call(Func::Cos, Expr::call(Func::Tan, a)))
}

fn sin_ratio(a: Expr, b: Expr) -> Expr {
    Expr::call(Func::Sin, Expr::binary(BinOp::Div, a, b))
}

fn log_abs(a: Expr) -> Expr {
    Expr::call(Func::Log, Expr::call(Func::Abs, a))
}

fn sqrt_abs(a: Expr) -> Expr {
    Expr::call(Func::Sqrt, Expr::call(Func::Abs, a))
}

fn min_or_same(a: Expr, b: Expr) -> Expr {
    if a == b {
        a
    } else {
        Expr::call2(Func2::Min, a, b)
    }
}

fn max_or_same(a: Expr, b: Expr) -> Expr {
    if a == b {
        a
    } else {
        Expr::call2(Func2::Max, a, b)
    }
}

/// `round(a)%2==0 ? a : a+1`
fn even_odd(a: Expr) -> Expr {
    let parity = Expr::binary(
        BinOp::Rem,
        Expr::call(Func::Round, a.clone()),
        Expr::num(2.0),
    );
    Expr::cond(
        Expr::binary(BinOp::Eq, parity, Expr::num(0.0)),
        a.clone(),
        Expr::binary(BinOp::Add, a, Expr::num(1.0)),
    )
}

/// Every rule in draw order.
#[rustfmt::skip]
pub const RULES: [GrammarRule; 18] = [
    GrammarRule { name: "x", class: RuleClass::Point, kind: RuleKind::Constant(Expr::x) },
    GrammarRule { name: "y", class: RuleClass::Point, kind: RuleKind::Constant(Expr::y) },
    GrammarRule { name: "length", class: RuleClass::Length, kind: RuleKind::Constant(length) },
    GrammarRule { name: "sin", class: RuleClass::Trigonometry, kind: RuleKind::Unary(|a| Expr::call(Func::Sin, a)) },
    GrammarRule { name: "cos", class: RuleClass::Trigonometry, kind: RuleKind::Unary(|a| Expr::call(Func::Cos, a)) },
    GrammarRule { name: "sin_cos_tan", class: RuleClass::Trigonometry, kind: RuleKind::Unary(sin_cos_tan) },
    GrammarRule { name: "sin_ratio", class: RuleClass::Trigonometry, kind: RuleKind::Binary(sin_ratio) },
    GrammarRule { name: "mul", class: RuleClass::Arithmetic, kind: RuleKind::Binary(|a, b| Expr::binary(BinOp::Mul, a, b)) },
    GrammarRule { name: "div", class: RuleClass::Arithmetic, kind: RuleKind::Binary(|a, b| Expr::binary(BinOp::Div, a, b)) },
    GrammarRule { name: "add", class: RuleClass::Arithmetic, kind: RuleKind::Binary(|a, b| Expr::binary(BinOp::Add, a, b)) },
    GrammarRule { name: "sub", class: RuleClass::Arithmetic, kind: RuleKind::Binary(|a, b| Expr::binary(BinOp::Sub, a, b)) },
    GrammarRule { name: "log_abs", class: RuleClass::Exponential, kind: RuleKind::Unary(log_abs) },
    GrammarRule { name: "sqrt_abs", class: RuleClass::Exponential, kind: RuleKind::Unary(sqrt_abs) },
    GrammarRule { name: "abs", class: RuleClass::Sign, kind: RuleKind::Unary(|a| Expr::call(Func::Abs, a)) },
    GrammarRule { name: "sign", class: RuleClass::Sign, kind: RuleKind::Unary(|a| Expr::call(Func::Sign, a)) },
    GrammarRule { name: "min", class: RuleClass::MinMax, kind: RuleKind::Binary(min_or_same) },
    GrammarRule { name: "max", class: RuleClass::MinMax, kind: RuleKind::Binary(max_or_same) },
    GrammarRule { name: "even_odd", class: RuleClass::EvenOdd, kind: RuleKind::Unary(even_odd) },
];

/// An ordered rule set. Rules keep their relative order from [`RULES`].
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<GrammarRule>,
}

impl Grammar {
    /// All rules.
    pub fn full() -> Self {
        Self {
            rules: RULES.to_vec(),
        }
    }

    /// Only rules of the given classes.
    ///
    /// Fails with [`FlowError::NoTerminalRule`] when the subset has no
    /// terminal, since expansion could then never stop.
    pub fn with_classes(classes: &[RuleClass]) -> Result<Self, FlowError> {
        let rules: Vec<GrammarRule> = RULES
            .iter()
            .filter(|r| classes.contains(&r.class))
            .copied()
            .collect();
        if !rules.iter().any(GrammarRule::is_terminal) {
            return Err(FlowError::NoTerminalRule);
        }
        Ok(Self { rules })
    }

    /// The Point + Arithmetic subset used for golden fixtures.
    pub fn pinned() -> Self {
        Self {
            rules: RULES
                .iter()
                .filter(|r| matches!(r.class, RuleClass::Point | RuleClass::Arithmetic))
                .copied()
                .collect(),
        }
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// A table holding the base weight of every class.
    pub fn base_table(&self) -> ProbabilityTable {
        ProbabilityTable::base()
    }
}

/// Current weight per class.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    weights: [f64; 8],
}

impl ProbabilityTable {
    pub fn base() -> Self {
        Self {
            weights: RuleClass::ALL.map(RuleClass::base_weight),
        }
    }

    pub fn weight(&self, class: RuleClass) -> f64 {
        self.weights[class.index()]
    }

    pub fn set_weight(&mut self, class: RuleClass, weight: f64) {
        self.weights[class.index()] = weight;
    }

    /// Normalized selection probability of each rule, in rule order.
    ///
    /// A rule's probability is its class weight divided by the sum of the
    /// class weights of all rules, so classes with more rules get more mass.
    pub fn probabilities(&self, rules: &[GrammarRule]) -> Vec<f64> {
        let total = rules
            .iter()
            .fold(0.0, |acc, r| acc + self.weight(r.class));
        rules.iter().map(|r| self.weight(r.class) / total).collect()
    }
}

/// Sum of `probabilities`, accumulated left to right.
pub fn mass(probabilities: &[f64]) -> f64 {
    probabilities.iter().fold(0.0, |acc, p| acc + p)
}

/// Picks the first index whose cumulative probability exceeds `draw * mass`.
///
/// `draw` is in `[0, 1)`. Fails with [`FlowError::SynthesisExhausted`] when
/// the mass is off by more than [`MASS_TOLERANCE`] or no rule is selected.
pub fn select(probabilities: &[f64], draw: f64) -> Result<usize, FlowError> {
    let mass = mass(probabilities);
    let normalized = (mass - 1.0).abs() <= MASS_TOLERANCE;
    if !normalized {
        return Err(FlowError::SynthesisExhausted { mass });
    }
    let threshold = draw * mass;
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if threshold < cumulative {
            return Ok(i);
        }
    }
    Err(FlowError::SynthesisExhausted { mass })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weights_are_positive() {
        for class in RuleClass::ALL {
            assert!(class.base_weight() > 0.0, "{class:?}");
        }
        assert_eq!(RuleClass::Point.base_weight(), 10.0);
        assert_eq!(RuleClass::Sign.base_weight(), BASE_WEIGHT * 0.01);
    }

    #[test]
    fn full_grammar_keeps_rule_order() {
        let g = Grammar::full();
        let names: Vec<&str> = g.rules().iter().map(|r| r.name).collect();
        assert_eq!(names[0], "x");
        assert_eq!(names[2], "length");
        assert_eq!(names[17], "even_odd");
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn pinned_grammar_has_point_and_arithmetic_only() {
        let g = Grammar::pinned();
        let names: Vec<&str> = g.rules().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["x", "y", "mul", "div", "add", "sub"]);
    }

    #[test]
    fn subset_without_terminal_is_rejected() {
        let err = Grammar::with_classes(&[RuleClass::Trigonometry, RuleClass::Arithmetic])
            .unwrap_err();
        assert!(matches!(err, FlowError::NoTerminalRule));
        assert!(Grammar::with_classes(&[RuleClass::Length]).is_ok());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let g = Grammar::full();
        let p = g.base_table().probabilities(g.rules());
        assert!((mass(&p) - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn select_walks_cumulative_mass() {
        let p = [0.25, 0.25, 0.5];
        assert_eq!(select(&p, 0.0).unwrap(), 0);
        assert_eq!(select(&p, 0.25).unwrap(), 1);
        assert_eq!(select(&p, 0.49).unwrap(), 1);
        assert_eq!(select(&p, 0.999).unwrap(), 2);
    }

    #[test]
    fn select_fails_loudly_on_bad_mass() {
        let err = select(&[0.2, 0.2], 0.5).unwrap_err();
        match err {
            FlowError::SynthesisExhausted { mass } => assert!((mass - 0.4).abs() < 1e-12),
            other => panic!("unexpected error: {other}"),
        }
        assert!(select(&[f64::NAN, 1.0], 0.5).is_err());
        assert!(select(&[], 0.5).is_err());
    }

    #[test]
    fn min_max_collapse_identical_children() {
        assert_eq!(min_or_same(Expr::x(), Expr::x()), Expr::x());
        assert_eq!(max_or_same(Expr::y(), Expr::x()).to_string(), "max(y,x)");
    }

    #[test]
    fn combinators_render_expected_shapes() {
        assert_eq!(length().to_string(), "sqrt(x*x+y*y)");
        assert_eq!(sin_cos_tan(Expr::x()).to_string(), "sin(cos(tan(x)))");
        assert_eq!(sin_ratio(Expr::x(), Expr::y()).to_string(), "sin(x/y)");
        assert_eq!(log_abs(Expr::y()).to_string(), "log(abs(y))");
        assert_eq!(even_odd(Expr::x()).to_string(), "round(x)%2==0 ? x : x+1");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn damped_tables_stay_normalized(
                damping in proptest::collection::vec(0_u32..12, 8),
            ) {
                let g = Grammar::full();
                let mut table = g.base_table();
                for (class, n) in RuleClass::ALL.iter().zip(&damping) {
                    let w = table.weight(*class) * SELF_CLASS_DAMPING.powi(*n as i32);
                    table.set_weight(*class, w);
                }
                let p = table.probabilities(g.rules());
                prop_assert!(p.iter().all(|v| *v >= 0.0));
                prop_assert!((mass(&p) - 1.0).abs() <= MASS_TOLERANCE);
            }
        }
    }
}
