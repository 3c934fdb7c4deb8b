//! Region transition system kernel of the TARZAN model checker.
//!
//! The kernel quotients the dense-time state space of a timed automaton into finitely many
//! regions, refined with the order in which clocks exceeded their maximum constants, and
//! enumerates that quotient on demand:
//!
//! - [`Region`] carries the refined datum together with its immediate delay and discrete
//!   successor/predecessor operators;
//! - [`Rts`] drives forward and backward reachability over a single automaton or arena;
//! - [`NetworkRegion`] and [`RtsNetwork`] lift regions and forward reachability to synchronous
//!   networks, with optional process-symmetry reduction;
//! - [`partition`] holds the ordered-partition combinatorics behind predecessor computation.
//!
//! All operations are synchronous and deterministic: identical inputs visit identical region
//! sequences. Empty successor or predecessor sets are ordinary results, never errors, and an
//! exhausted search is reported as an unreachable verdict rather than a failure.

mod clocks;
mod errors;
mod formula;
mod network;
mod region;
mod rts;

pub mod partition;

pub use clocks::ClockSet;
pub use errors::RtsError;
pub use network::{NetworkGoal, NetworkRegion, RtsNetwork};
pub use region::Region;
pub use rts::{Goal, ModelKind, ReachabilityReport, Rts, Strategy};
