//! Model layer of the TARZAN model checker.
//!
//! This crate holds the abstract descriptions the region kernel consumes:
//! timed automata and timed arenas with their clocks, actions, locations and
//! transitions; clock and integer-variable constraints; integer expression
//! blocks attached to transitions; and CLTLoc-style temporal formulae.
//!
//! Textual front-ends are deliberately not part of this crate: models are
//! built programmatically and handed to the `tarzan-rts` kernel, which
//! derives its index tables from the accessors defined here.

mod arena;
mod automaton;
mod constraint;
mod errors;
mod expr;
mod formula;

pub use arena::TimedArena;
pub use automaton::{Action, Location, SyncTag, TimedAutomaton, Transition, constraints_satisfied};
pub use constraint::{ComparisonOp, Constraint};
pub use errors::ModelError;
pub use expr::{ArithmeticOp, Assignment, EvalError, IntExpr, VariableStore};
pub use formula::{BinaryOp, Formula, PureFormula, UnaryOp};
