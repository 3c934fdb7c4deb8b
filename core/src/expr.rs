use core::fmt;
use std::collections::BTreeMap;

// VARIABLE STORE
// ================================================================================================

/// Integer-variable assignment shared by an automaton (or a whole network) during exploration.
///
/// Deterministic iteration order matters: the store participates in network-region hashing and in
/// printed reports.
pub type VariableStore = BTreeMap<String, i64>;

// ARITHMETIC OPERATOR
// ================================================================================================

/// Arithmetic operator usable inside integer expressions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticOp::Add => f.write_str("+"),
            ArithmeticOp::Sub => f.write_str("-"),
            ArithmeticOp::Mul => f.write_str("*"),
            ArithmeticOp::Div => f.write_str("/"),
        }
    }
}

// INTEGER EXPRESSIONS
// ================================================================================================

/// An integer expression over constants and variables.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum IntExpr {
    Const(i64),
    Var(String),
    Binary {
        op: ArithmeticOp,
        lhs: Box<IntExpr>,
        rhs: Box<IntExpr>,
    },
}

/// Error raised while evaluating an integer expression.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("division by zero while evaluating an assignment for '{0}'")]
    DivisionByZero(String),
}

impl IntExpr {
    pub fn var(name: impl Into<String>) -> Self {
        IntExpr::Var(name.into())
    }

    pub fn binary(op: ArithmeticOp, lhs: IntExpr, rhs: IntExpr) -> Self {
        IntExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// Evaluates the expression against the store. Unbound variables read as 0.
    fn evaluate(&self, store: &VariableStore) -> Option<i64> {
        match self {
            IntExpr::Const(v) => Some(*v),
            IntExpr::Var(name) => Some(store.get(name).copied().unwrap_or(0)),
            IntExpr::Binary { op, lhs, rhs } => {
                let (l, r) = (lhs.evaluate(store)?, rhs.evaluate(store)?);
                match op {
                    ArithmeticOp::Add => Some(l.wrapping_add(r)),
                    ArithmeticOp::Sub => Some(l.wrapping_sub(r)),
                    ArithmeticOp::Mul => Some(l.wrapping_mul(r)),
                    ArithmeticOp::Div => (r != 0).then(|| l.wrapping_div(r)),
                }
            },
        }
    }
}

impl fmt::Display for IntExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntExpr::Const(v) => write!(f, "{v}"),
            IntExpr::Var(name) => f.write_str(name),
            IntExpr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}

// ASSIGNMENTS
// ================================================================================================

/// A single assignment `target = expr` carried by a transition.
///
/// Transitions hold an ordered block of these; the block is evaluated left to right, each
/// assignment seeing the effects of the previous ones.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Assignment {
    pub target: String,
    pub expr: IntExpr,
}

impl Assignment {
    pub fn new(target: impl Into<String>, expr: IntExpr) -> Self {
        Self { target: target.into(), expr }
    }

    /// Applies the assignment to the store in place.
    pub fn apply(&self, store: &mut VariableStore) -> Result<(), EvalError> {
        let value = self
            .expr
            .evaluate(store)
            .ok_or_else(|| EvalError::DivisionByZero(self.target.clone()))?;
        store.insert(self.target.clone(), value);
        Ok(())
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.expr)
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn assignment_block_sees_previous_writes() {
        // L = L + 1 * (3 + N)
        let ass = Assignment::new(
            "L",
            IntExpr::binary(
                ArithmeticOp::Add,
                IntExpr::var("L"),
                IntExpr::binary(
                    ArithmeticOp::Mul,
                    IntExpr::Const(1),
                    IntExpr::binary(ArithmeticOp::Add, IntExpr::Const(3), IntExpr::var("N")),
                ),
            ),
        );

        let mut store = VariableStore::from([("L".to_string(), 0), ("N".to_string(), 10)]);
        ass.apply(&mut store).unwrap();
        assert_eq!(store["L"], 13);

        // second application reads the updated L
        ass.apply(&mut store).unwrap();
        assert_eq!(store["L"], 26);
    }

    #[test]
    fn unbound_variables_read_as_zero() {
        let ass = Assignment::new("x", IntExpr::binary(ArithmeticOp::Add, IntExpr::var("missing"), IntExpr::Const(4)));
        let mut store = VariableStore::new();
        ass.apply(&mut store).unwrap();
        assert_eq!(store["x"], 4);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let ass = Assignment::new("x", IntExpr::binary(ArithmeticOp::Div, IntExpr::Const(1), IntExpr::var("z")));
        let mut store = VariableStore::new();
        assert_eq!(ass.apply(&mut store), Err(EvalError::DivisionByZero("x".to_string())));
    }
}
