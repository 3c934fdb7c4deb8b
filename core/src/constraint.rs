use core::fmt;

// COMPARISON OPERATOR
// ================================================================================================

/// Comparison operator admissible in clock and integer-variable constraints.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ComparisonOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Lt => f.write_str("<"),
            ComparisonOp::Le => f.write_str("<="),
            ComparisonOp::Eq => f.write_str("="),
            ComparisonOp::Ge => f.write_str(">="),
            ComparisonOp::Gt => f.write_str(">"),
        }
    }
}

// CONSTRAINT
// ================================================================================================

/// An atomic constraint `name ~ bound` appearing in guards, invariants and goals.
///
/// The name may refer to a clock or to an integer variable; which one is decided at evaluation
/// time against the automaton's clock index table. Guards are conjunctions of these constraints.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Constraint {
    pub name: String,
    pub op: ComparisonOp,
    pub bound: u32,
}

impl Constraint {
    pub fn new(name: impl Into<String>, op: ComparisonOp, bound: u32) -> Self {
        Self { name: name.into(), op, bound }
    }

    /// Returns true if every clock valuation summarized by `(integer_part, has_fraction)`
    /// satisfies this constraint.
    ///
    /// A region maps each clock to its integer part together with a flag telling whether the
    /// fractional part is strictly positive. A constraint holds for the region only when it holds
    /// for all concrete values the pair stands for; with a positive fraction the value ranges over
    /// the open interval `(integer_part, integer_part + 1)`.
    pub fn is_satisfied(&self, integer_part: u32, has_fraction: bool) -> bool {
        let (h, k) = (integer_part, self.bound);
        match self.op {
            ComparisonOp::Eq => h == k && !has_fraction,
            ComparisonOp::Lt => h < k,
            ComparisonOp::Le => h < k || (h == k && !has_fraction),
            ComparisonOp::Gt => h > k || (h == k && has_fraction),
            ComparisonOp::Ge => h >= k,
        }
    }

    /// Returns true if the integer value satisfies this constraint.
    ///
    /// Used when the constrained name resolves to an integer variable rather than a clock.
    pub fn is_satisfied_by_int(&self, value: i64) -> bool {
        let k = i64::from(self.bound);
        match self.op {
            ComparisonOp::Eq => value == k,
            ComparisonOp::Lt => value < k,
            ComparisonOp::Le => value <= k,
            ComparisonOp::Gt => value > k,
            ComparisonOp::Ge => value >= k,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.name, self.op, self.bound)
    }
}

// TESTS
// ================================================================================================
