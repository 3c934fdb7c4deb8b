use core::fmt;

use crate::Constraint;

// FORMULA OPERATORS
// ================================================================================================

/// Unary temporal operator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    Box,
    Diamond,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Box => f.write_str("[]"),
            UnaryOp::Diamond => f.write_str("<>"),
        }
    }
}

/// Binary temporal operator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Until,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Until => f.write_str("U"),
        }
    }
}

// FORMULAE
// ================================================================================================

/// A pure (temporal-operator free) formula: a disjunction of locations conjoined with clock
/// constraints.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PureFormula {
    pub locations: Vec<String>,
    pub constraints: Vec<Constraint>,
}

/// A CLTLoc-style formula with owned children.
///
/// Region extraction admits nesting depth at most 1: `[] p`, `<> p` and `p U q` with `p`, `q`
/// pure. Deeper nesting is reported by the kernel as a named error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Formula {
    Pure(PureFormula),
    Unary { op: UnaryOp, inner: Box<Formula> },
    Binary { op: BinaryOp, left: Box<Formula>, right: Box<Formula> },
}

impl Formula {
    pub fn boxed(inner: Formula) -> Self {
        Formula::Unary { op: UnaryOp::Box, inner: Box::new(inner) }
    }

    pub fn diamond(inner: Formula) -> Self {
        Formula::Unary { op: UnaryOp::Diamond, inner: Box::new(inner) }
    }

    pub fn until(left: Formula, right: Formula) -> Self {
        Formula::Binary { op: BinaryOp::Until, left: Box::new(left), right: Box::new(right) }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Pure(pure) => {
                write!(f, "pure({} locations, {} constraints)", pure.locations.len(), pure.constraints.len())
            },
            Formula::Unary { op, inner } => write!(f, "{op} {inner}"),
            Formula::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}
