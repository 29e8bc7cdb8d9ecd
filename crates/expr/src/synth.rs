//! Random expression synthesis.
//!
//! Expansion draws one rule at a time from the grammar. Before descending
//! into a unary or binary rule's children the rule's own class weight is
//! multiplied by [`SELF_CLASS_DAMPING`] and restored once the children are
//! built, so nested use of a class becomes steadily less likely and
//! expansion terminates with probability one.

use crate::ast::Expr;
use crate::grammar::{
    select, Grammar, ProbabilityTable, RuleClass, RuleKind, SELF_CLASS_DAMPING,
};
use flowfield_core::{FlowError, Xorshift64};

/// Expands expressions from one grammar with one RNG.
pub struct Synthesizer<'a> {
    grammar: &'a Grammar,
    table: ProbabilityTable,
    rng: &'a mut Xorshift64,
}

impl<'a> Synthesizer<'a> {
    pub fn new(grammar: &'a Grammar, rng: &'a mut Xorshift64) -> Self {
        Self {
            table: grammar.base_table(),
            grammar,
            rng,
        }
    }

    /// Draws one complete expression tree.
    pub fn expand(&mut self) -> Result<Expr, FlowError> {
        let probabilities = self.table.probabilities(self.grammar.rules());
        let index = select(&probabilities, self.rng.next_f64())?;
        let rule = self.grammar.rules()[index];

        match rule.kind {
            RuleKind::Constant(terminal) => Ok(terminal()),
            RuleKind::Unary(combine) => {
                let a = self.damped(rule.class, |s| s.expand())?;
                Ok(combine(a))
            }
            RuleKind::Binary(combine) => {
                let (a, b) = self.damped(rule.class, |s| Ok((s.expand()?, s.expand()?)))?;
                Ok(combine(a, b))
            }
        }
    }

    /// Runs `f` with `class` damped, restoring its weight even on error.
    fn damped<T>(
        &mut self,
        class: RuleClass,
        f: impl FnOnce(&mut Self) -> Result<T, FlowError>,
    ) -> Result<T, FlowError> {
        let saved = self.table.weight(class);
        self.table.set_weight(class, saved * SELF_CLASS_DAMPING);
        let out = f(self);
        self.table.set_weight(class, saved);
        out
    }

    /// Current class weights. Equal to the base table between expansions.
    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }
}

/// Synthesizes the x- and y-velocity expressions with the full grammar.
pub fn synthesize(rng: &mut Xorshift64) -> Result<(Expr, Expr), FlowError> {
    synthesize_with(&Grammar::full(), rng)
}

/// Synthesizes the x- and y-velocity expressions with `grammar`.
///
/// Two independent top-level draws, x first.
pub fn synthesize_with(
    grammar: &Grammar,
    rng: &mut Xorshift64,
) -> Result<(Expr, Expr), FlowError> {
    let mut synth = Synthesizer::new(grammar, rng);
    let x = synth.expand()?;
    let y = synth.expand()?;
    tracing::debug!(x_nodes = x.size(), y_nodes = y.size(), "synthesized expression pair");
    Ok((x, y))
}
