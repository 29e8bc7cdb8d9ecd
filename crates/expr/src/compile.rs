//! Expression pairs compiled into vector fields.

use crate::ast::Expr;
use crate::parse::parse_source;
use flowfield_core::{DVec2, FieldError, VectorField};

/// Node ceiling for one compiled expression pair.
pub const MAX_NODES: usize = 4096;

/// Depth ceiling for each expression, shared with the parser so every
/// compiled field's source parses back.
pub const MAX_DEPTH: usize = 128;

/// A vector field whose components are two scalar expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFunction {
    x: Expr,
    y: Expr,
    source: String,
}

impl FieldFunction {
    pub fn x(&self) -> &Expr {
        &self.x
    }

    pub fn y(&self) -> &Expr {
        &self.y
    }

    /// Source text of the pair; recompiling it yields an equal field.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node_count(&self) -> usize {
        self.x.size() + self.y.size()
    }
}

impl VectorField for FieldFunction {
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError> {
        let v = DVec2::new(self.x.eval(point), self.y.eval(point));
        if v.is_finite() {
            Ok(v)
        } else {
            Err(FieldError::NonFinite)
        }
    }
}

/// Renders an expression pair as field source text.
pub fn render_source(x: &Expr, y: &Expr) -> String {
    format!("dx = {x}\ndy = {y}\n")
}

/// Builds a field from two expressions, or `None` when the pair exceeds
/// [`MAX_NODES`] or [`MAX_DEPTH`], or holds a non-finite literal.
pub fn compile(x: Expr, y: Expr) -> Option<FieldFunction> {
    let nodes = x.size() + y.size();
    let depth = x.depth().max(y.depth());
    if nodes > MAX_NODES || depth > MAX_DEPTH {
        tracing::warn!(nodes, depth, "expression pair too large to compile");
        return None;
    }
    if !(x.literals_finite() && y.literals_finite()) {
        tracing::warn!("expression pair has a non-finite literal");
        return None;
    }
    let source = render_source(&x, &y);
    Some(FieldFunction { x, y, source })
}

/// Parses and compiles field source text. Unparsable text yields `None`.
pub fn compile_source(code: &str) -> Option<FieldFunction> {
    match parse_source(code) {
        Ok((x, y)) => compile(x, y),
        Err(e) => {
            tracing::warn!(error = %e, "rejected field source");
            None
        }
    }
}
