use core::fmt;
use std::{
    collections::{BTreeMap, BTreeSet, HashSet, VecDeque},
    time::{Duration, Instant},
};

use tarzan_core::{Constraint, TimedArena, TimedAutomaton, Transition, constraints_satisfied};
use tracing::{debug, info, instrument};

use crate::{Region, RtsError};

// EXPLORATION STRATEGY
// ================================================================================================

/// Order in which the frontier is consumed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    Bfs,
    Dfs,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Bfs => f.write_str("BFS"),
            Strategy::Dfs => f.write_str("DFS"),
        }
    }
}

// MODEL KIND
// ================================================================================================

/// What the driver was built from. Arenas carry the location-to-player table game-solving
/// front-ends consult; the region semantics is identical.
#[derive(Clone, Debug)]
pub enum ModelKind {
    Automaton,
    Arena { players: BTreeMap<usize, char> },
}

// GOAL
// ================================================================================================

/// Forward reachability target.
#[derive(Clone, Debug)]
pub enum Goal {
    /// Stop on any region at this location.
    Location(usize),
    /// Stop on a region at this location whose valuation satisfies the constraints.
    Constrained { location: usize, constraints: Vec<Constraint> },
    /// Never stop early: enumerate the whole reachable quotient.
    ExploreAll,
}

// REACHABILITY REPORT
// ================================================================================================

/// Outcome of one reachability call, for a single-automaton or a network search.
///
/// An exhausted frontier is a first-class negative verdict, not an error: `witness` is `None`
/// and the counts still describe the completed exploration.
#[derive(Clone, Debug)]
pub struct ReachabilityReport<W = Region> {
    /// Number of successor (or predecessor) regions computed, counting duplicates.
    pub regions_computed: u64,
    pub elapsed: Duration,
    pub witness: Option<W>,
}

impl<W> ReachabilityReport<W> {
    pub fn is_reachable(&self) -> bool {
        self.witness.is_some()
    }
}

impl<W> fmt::Display for ReachabilityReport<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total number of computed regions: {}", self.regions_computed)?;
        if self.is_reachable() {
            writeln!(f, "Goal region is reachable!")?;
        } else {
            writeln!(f, "Goal region is not reachable!")?;
        }
        write!(f, "Took: {} microseconds.", self.elapsed.as_micros())
    }
}

// RTS
// ================================================================================================

/// Region transition system of a single timed automaton or arena.
///
/// Construction derives every lookup table once (clock and location indices, per-location
/// transition lists, invariants, per-clock max constants, urgency and initial sets) and the
/// reachability procedures treat them as immutable.
pub struct Rts {
    kind: ModelKind,
    clock_indices: BTreeMap<String, usize>,
    location_indices: BTreeMap<String, usize>,
    max_constants: Vec<u32>,
    initial_locations: Vec<usize>,
    urgent_locations: BTreeSet<usize>,
    out_transitions: Vec<Vec<Transition>>,
    in_transitions: Vec<Vec<Transition>>,
    invariants: BTreeMap<usize, Vec<Constraint>>,
    initial_regions: Vec<Region>,
}

impl Rts {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Builds the region transition system of a timed automaton.
    ///
    /// # Errors
    /// Returns an error if the automaton fails validation.
    pub fn new(automaton: &TimedAutomaton) -> Result<Self, RtsError> {
        Self::with_goal_constraints(automaton, &[])
    }

    /// Builds the region transition system, folding the bounds of `goal_constraints` into the
    /// per-clock max constants so a later constrained goal keeps its granularity.
    ///
    /// # Errors
    /// Returns an error if the automaton fails validation.
    pub fn with_goal_constraints(
        automaton: &TimedAutomaton,
        goal_constraints: &[Constraint],
    ) -> Result<Self, RtsError> {
        automaton.validate()?;
        Ok(Self::build(automaton, goal_constraints, ModelKind::Automaton))
    }

    /// Builds the region transition system of a timed arena.
    ///
    /// # Errors
    /// Returns an error if the arena fails validation.
    pub fn from_arena(arena: &TimedArena) -> Result<Self, RtsError> {
        arena.validate()?;
        let locations = arena.automaton.location_indices();
        let players = arena.players_by_location(&locations);
        Ok(Self::build(&arena.automaton, &[], ModelKind::Arena { players }))
    }

    fn build(automaton: &TimedAutomaton, goal_constraints: &[Constraint], kind: ModelKind) -> Self {
        let clock_indices = automaton.clock_indices();
        let location_indices = automaton.location_indices();
        let max_constants = automaton.max_constants_with(&clock_indices, goal_constraints);
        let initial_locations = automaton.initial_locations(&location_indices);
        let urgent_locations = automaton.urgent_locations(&location_indices);
        let out_transitions = automaton.out_transitions(&location_indices);
        let in_transitions = automaton.in_transitions(&location_indices);
        let invariants = automaton.invariant_table(&location_indices);

        let variables = automaton.initial_variables();
        let initial_regions = initial_locations
            .iter()
            .map(|&location| Region::initial(clock_indices.len(), location, variables.clone()))
            .collect();

        Self {
            kind,
            clock_indices,
            location_indices,
            max_constants,
            initial_locations,
            urgent_locations,
            out_transitions,
            in_transitions,
            invariants,
            initial_regions,
        }
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn clock_indices(&self) -> &BTreeMap<String, usize> {
        &self.clock_indices
    }

    pub fn location_indices(&self) -> &BTreeMap<String, usize> {
        &self.location_indices
    }

    pub fn max_constants(&self) -> &[u32] {
        &self.max_constants
    }

    pub fn initial_regions(&self) -> &[Region] {
        &self.initial_regions
    }

    pub(crate) fn out_transitions(&self) -> &[Vec<Transition>] {
        &self.out_transitions
    }

    pub(crate) fn in_transitions(&self) -> &[Vec<Transition>] {
        &self.in_transitions
    }

    // FORWARD REACHABILITY
    // --------------------------------------------------------------------------------------------

    /// Explores the reachable region quotient from the initial regions until the goal matches or
    /// the frontier is exhausted.
    ///
    /// The goal is tested on dequeue. From each region, the delay successor is expanded first,
    /// unless the location is urgent, which suppresses delay, followed by the discrete
    /// successors in stored transition order. Candidates violating their location's invariant
    /// are dropped; the rest are deduplicated against everything seen so far. Two calls on the
    /// same input visit identical region sequences.
    #[instrument(skip_all, fields(strategy = %strategy))]
    pub fn forward_reachability(&self, goal: &Goal, strategy: Strategy) -> ReachabilityReport {
        let mut frontier: VecDeque<Region> = VecDeque::new();
        let mut visited: HashSet<Region> = HashSet::new();

        for initial in &self.initial_regions {
            frontier.push_back(initial.clone());
            visited.insert(initial.clone());
        }

        let mut regions_computed: u64 = 0;
        let start = Instant::now();

        while let Some(current) = match strategy {
            Strategy::Bfs => frontier.pop_front(),
            Strategy::Dfs => frontier.pop_back(),
        } {
            debug!(region = %current, "dequeued");

            if self.goal_matches(&current, goal) {
                let elapsed = start.elapsed();
                info!(
                    regions = regions_computed,
                    micros = elapsed.as_micros() as u64,
                    "goal region is reachable"
                );
                return ReachabilityReport { regions_computed, elapsed, witness: Some(current) };
            }

            let delay_permitted = !self.urgent_locations.contains(&current.location());
            let delay_successor =
                delay_permitted.then(|| current.delay_successor(&self.max_constants));

            let discrete_successors = current.discrete_successors(
                &self.out_transitions[current.location()],
                &self.clock_indices,
                &self.location_indices,
            );

            regions_computed += discrete_successors.len() as u64 + u64::from(delay_permitted);

            if let Some(successor) = delay_successor {
                self.insert_if_legal(successor, &mut frontier, &mut visited);
            }
            for successor in discrete_successors {
                self.insert_if_legal(successor, &mut frontier, &mut visited);
            }
        }

        let elapsed = start.elapsed();
        info!(
            regions = regions_computed,
            micros = elapsed.as_micros() as u64,
            "goal region is not reachable"
        );
        ReachabilityReport { regions_computed, elapsed, witness: None }
    }

    // BACKWARD REACHABILITY
    // --------------------------------------------------------------------------------------------

    /// Explores delay and discrete predecessors from the starting regions until an initial
    /// region is reached (all clocks at fractional zero with integer part zero, at an initial
    /// location) or the frontier is exhausted.
    ///
    /// Integer variables are not inverted on the way back: predecessors carry the successor's
    /// store unchanged, so verdicts are only meaningful for models whose control flow does not
    /// depend on variables (dead stores are fine).
    #[instrument(skip_all, fields(strategy = %strategy))]
    pub fn backward_reachability(&self, starting: &[Region], strategy: Strategy) -> ReachabilityReport {
        let mut frontier: VecDeque<Region> = VecDeque::new();
        let mut visited: HashSet<Region> = HashSet::new();

        for region in starting {
            frontier.push_back(region.clone());
            visited.insert(region.clone());
        }

        let mut regions_computed: u64 = 0;
        let start = Instant::now();

        while let Some(current) = match strategy {
            Strategy::Bfs => frontier.pop_front(),
            Strategy::Dfs => frontier.pop_back(),
        } {
            debug!(region = %current, "dequeued");

            if current.is_initial_valuation() && self.initial_locations.contains(&current.location()) {
                let elapsed = start.elapsed();
                info!(
                    regions = regions_computed,
                    micros = elapsed.as_micros() as u64,
                    "an initial region is reachable"
                );
                return ReachabilityReport { regions_computed, elapsed, witness: Some(current) };
            }

            // locations outside the automaton (hand-built start regions) have no predecessors
            if current.location() >= self.in_transitions.len() {
                continue;
            }

            let delay_predecessors = current.delay_predecessors(&self.max_constants);
            let discrete_predecessors = current.discrete_predecessors(
                &self.in_transitions[current.location()],
                &self.clock_indices,
                &self.location_indices,
                &self.max_constants,
            );

            regions_computed += (delay_predecessors.len() + discrete_predecessors.len()) as u64;

            for predecessor in delay_predecessors {
                self.insert_if_legal(predecessor, &mut frontier, &mut visited);
            }
            for predecessor in discrete_predecessors {
                self.insert_if_legal(predecessor, &mut frontier, &mut visited);
            }
        }

        let elapsed = start.elapsed();
        info!(
            regions = regions_computed,
            micros = elapsed.as_micros() as u64,
            "an initial region is not reachable"
        );
        ReachabilityReport { regions_computed, elapsed, witness: None }
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Admits a region into the frontier if its location's invariant holds and it has not been
    /// seen before.
    fn insert_if_legal(
        &self,
        region: Region,
        frontier: &mut VecDeque<Region>,
        visited: &mut HashSet<Region>,
    ) {
        if visited.contains(&region) {
            return;
        }
        if let Some(invariant) = self.invariants.get(&region.location())
            && !constraints_satisfied(invariant, &region.valuation(), &self.clock_indices, region.variables())
        {
            return;
        }
        visited.insert(region.clone());
        frontier.push_back(region);
    }

    fn goal_matches(&self, region: &Region, goal: &Goal) -> bool {
        match goal {
            Goal::Location(location) => region.location() == *location,
            Goal::Constrained { location, constraints } => {
                region.location() == *location
                    && constraints_satisfied(
                        constraints,
                        &region.valuation(),
                        &self.clock_indices,
                        region.variables(),
                    )
            },
            Goal::ExploreAll => false,
        }
    }
}
