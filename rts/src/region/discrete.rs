use std::collections::{BTreeMap, VecDeque};

use smallvec::SmallVec;
use tarzan_core::{ComparisonOp, Constraint, Transition};

use super::Region;
use crate::{
    ClockSet,
    partition::{generate_all_deques, integer_interval_combinations, set_partitions},
};

// DISCRETE SUCCESSORS
// ================================================================================================

impl Region {
    /// Computes the regions reached by firing each enabled transition.
    ///
    /// `transitions` must hold exactly the transitions leaving this region's location. A
    /// transition is enabled when its guard holds for the current valuation and variable store;
    /// firing it evaluates the assignment block, resets the listed clocks to fractional zero and
    /// moves to the target location. A division by zero in the assignment block disables the
    /// transition. Target invariants are the caller's concern.
    pub fn discrete_successors(
        &self,
        transitions: &[Transition],
        clock_indices: &BTreeMap<String, usize>,
        location_indices: &BTreeMap<String, usize>,
    ) -> Vec<Region> {
        let valuation = self.valuation();
        let mut successors = Vec::new();

        'transitions: for transition in transitions {
            debug_assert_eq!(location_indices[&transition.source], self.location);

            if !transition.is_satisfied(&valuation, clock_indices, &self.variables) {
                continue;
            }

            let mut successor = self.clone();
            for assignment in &transition.assignments {
                if assignment.apply(&mut successor.variables).is_err() {
                    continue 'transitions;
                }
            }
            for clock in &transition.resets {
                successor.reset_clock(clock_indices[clock]);
            }
            successor.location = location_indices[&transition.target];

            successor.debug_assert_partition();
            successors.push(successor);
        }

        successors
    }

    /// Resets one clock to integer zero and fractional zero, dropping its old group if that
    /// group becomes empty.
    fn reset_clock(&mut self, clock: usize) {
        self.h[clock] = 0;
        if self.x0.contains(clock) {
            return;
        }

        for deque in [&mut self.bounded, &mut self.unbounded] {
            if let Some(pos) = deque.iter().position(|group| group.contains(clock)) {
                deque[pos].remove(clock);
                if deque[pos].is_empty() {
                    deque.remove(pos);
                }
                break;
            }
        }
        self.x0.insert(clock);
    }
}

// DISCRETE PREDECESSORS
// ================================================================================================

impl Region {
    /// Computes every region that reaches this one by firing one of the given transitions.
    ///
    /// `transitions` must hold exactly the transitions entering this region's location. For a
    /// transition to apply, its reset clocks must sit in `x0` with integer part zero here, and
    /// its guard must hold on the unchanged clocks. Each reset clock is then re-materialized: its
    /// pre-firing integer value ranges over the guard-admissible interval up to the sentinel, and
    /// every arrangement of the reset clocks is enumerated: into `x0`, between, around or joined
    /// with the surviving fractional groups, or into the unbounded crossing order. Guards
    /// at their bound pin the arrangement: `x = k` and `x <= k` at value `k` force fractional
    /// zero, `x > k` at value `k` forbids it.
    ///
    /// Integer-variable constraints and assignments are not inverted: the backward envelope
    /// ignores the variable store and carries it unchanged.
    pub fn discrete_predecessors(
        &self,
        transitions: &[Transition],
        clock_indices: &BTreeMap<String, usize>,
        location_indices: &BTreeMap<String, usize>,
        max_constants: &[u32],
    ) -> Vec<Region> {
        let num_clocks = self.num_clocks();
        let valuation = self.valuation();
        let mut predecessors = Vec::new();

        'transitions: for transition in transitions {
            debug_assert_eq!(location_indices[&transition.target], self.location);

            let reset_indices: SmallVec<[usize; 4]> =
                transition.resets.iter().map(|clock| clock_indices[clock]).collect();
            let resets = ClockSet::from_indices(num_clocks, &reset_indices);

            // a transition that just fired left every reset clock at fractional zero
            if reset_indices.iter().any(|&clock| !self.x0.contains(clock) || self.h[clock] != 0) {
                continue;
            }

            // split the guard: unchanged clocks are checked against the successor valuation,
            // reset clocks constrain the enumeration below, variable constraints are ignored
            let mut reset_guards: BTreeMap<usize, Vec<&Constraint>> =
                reset_indices.iter().map(|&clock| (clock, Vec::new())).collect();
            for constraint in &transition.guard {
                match clock_indices.get(&constraint.name) {
                    Some(&clock) if resets.contains(clock) => {
                        reset_guards.get_mut(&clock).expect("reset clock is keyed").push(constraint);
                    },
                    Some(&clock) => {
                        let (h, frac) = valuation[clock];
                        if !constraint.is_satisfied(h, frac) {
                            continue 'transitions;
                        }
                    },
                    None => (),
                }
            }

            // admissible integer intervals for the reset clocks, sentinel included
            let mut intervals = BTreeMap::new();
            for (&clock, constraints) in &reset_guards {
                match admissible_interval(constraints, max_constants[clock]) {
                    Some(interval) => {
                        intervals.insert(clock, interval);
                    },
                    None => continue 'transitions,
                }
            }

            let assignments = if reset_indices.is_empty() {
                vec![Vec::new()]
            } else {
                integer_interval_combinations(&intervals)
            };

            'assignments: for assignment in &assignments {
                let mut crossing = ClockSet::empty(num_clocks);
                let mut must_x0 = ClockSet::empty(num_clocks);
                let mut must_fraction = ClockSet::empty(num_clocks);
                let mut free: SmallVec<[usize; 4]> = SmallVec::new();

                for &(clock, value) in assignment {
                    let constraints = &reset_guards[&clock];
                    if value == max_constants[clock] + 1 {
                        // beyond the max constant the clock can only have been unbounded
                        if constraints.iter().all(|c| c.is_satisfied(value, true)) {
                            crossing.insert(clock);
                        } else {
                            continue 'assignments;
                        }
                    } else {
                        let zero_ok = constraints.iter().all(|c| c.is_satisfied(value, false));
                        let fraction_ok = constraints.iter().all(|c| c.is_satisfied(value, true));
                        match (zero_ok, fraction_ok) {
                            (true, true) => free.push(clock),
                            (true, false) => must_x0.insert(clock),
                            (false, true) => must_fraction.insert(clock),
                            (false, false) => continue 'assignments,
                        }
                    }
                }

                // each unconstrained clock independently chooses fractional zero or not
                for choice in 0u32..(1 << free.len()) {
                    let mut into_x0 = must_x0.clone();
                    let mut fractional = must_fraction.clone();
                    for (bit, &clock) in free.iter().enumerate() {
                        if choice & (1 << bit) != 0 {
                            into_x0.insert(clock);
                        } else {
                            fractional.insert(clock);
                        }
                    }

                    for bounded in interleavings(&fractional, &self.bounded) {
                        for unbounded in interleavings(&crossing, &self.unbounded) {
                            let mut h = self.h.clone();
                            for &(clock, value) in assignment {
                                h[clock] = value;
                            }
                            let mut x0 = self.x0.clone();
                            x0.difference_with(&resets);
                            x0.union_with(&into_x0);

                            let predecessor = Region::from_parts(
                                location_indices[&transition.source],
                                h,
                                unbounded,
                                x0,
                                bounded.clone(),
                                self.variables.clone(),
                            );
                            predecessors.push(predecessor);
                        }
                    }
                }
            }
        }

        predecessors
    }
}

/// Intersects the integer interval `[0, max + 1]` with every constraint on one reset clock.
///
/// Only the integer dimension is narrowed here; whether a value additionally admits or requires
/// a fractional part is decided per assignment by re-evaluating the constraints.
pub(super) fn admissible_interval(constraints: &[&Constraint], max_constant: u32) -> Option<(u32, u32)> {
    let mut lo: i64 = 0;
    let mut hi: i64 = i64::from(max_constant) + 1;

    for constraint in constraints {
        let k = i64::from(constraint.bound);
        match constraint.op {
            ComparisonOp::Eq => {
                lo = lo.max(k);
                hi = hi.min(k);
            },
            ComparisonOp::Le => hi = hi.min(k),
            ComparisonOp::Lt => hi = hi.min(k - 1),
            ComparisonOp::Ge => lo = lo.max(k),
            ComparisonOp::Gt => lo = lo.max(k),
        }
    }

    (lo <= hi).then(|| (lo as u32, hi as u32))
}

/// Enumerates every deque obtained by partitioning `clocks` into ordered blocks and placing each
/// block among the groups of `base`.
///
/// A block either becomes a group of its own in one of the gaps (including both ends), or joins
/// an existing group, standing for clocks whose fractional part coincided with survivors. Both
/// placements are needed for predecessors to cover every pre-firing arrangement; some
/// combinations coincide and come out more than once, which callers absorb by deduplication.
/// The empty clock set yields the base unchanged.
pub(super) fn interleavings(clocks: &ClockSet, base: &VecDeque<ClockSet>) -> Vec<VecDeque<ClockSet>> {
    if clocks.is_empty() {
        return vec![base.clone()];
    }

    // targets 0..=len are gaps, len+1.. address an existing group to join
    let gaps = base.len() + 1;
    let targets = (gaps + base.len()) as u32;
    let mut result = Vec::new();

    for blocks in set_partitions(clocks) {
        let positions: BTreeMap<usize, (u32, u32)> =
            (0..blocks.len()).map(|b| (b, (0, targets - 1))).collect();
        for placement in integer_interval_combinations(&positions) {
            let mut widened = base.clone();
            let mut insertions: BTreeMap<usize, Vec<ClockSet>> = BTreeMap::new();
            for &(block, target) in &placement {
                let target = target as usize;
                if target < gaps {
                    insertions.entry(target).or_default().push(blocks[block].clone());
                } else {
                    widened[target - gaps].union_with(&blocks[block]);
                }
            }
            result.extend(generate_all_deques(&insertions, &widened));
        }
    }

    result
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tarzan_core::{Action, Assignment, IntExpr, VariableStore};

    use super::super::tests::set;
    use super::*;

    const MAX: &[u32] = &[2, 1];

    fn indices() -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
        let clocks = BTreeMap::from([("x".to_string(), 0), ("y".to_string(), 1)]);
        let locations = BTreeMap::from([("p".to_string(), 0), ("q".to_string(), 1)]);
        (clocks, locations)
    }

    fn guarded(guard: Vec<Constraint>, resets: Vec<&str>) -> Transition {
        Transition::new("p", Action::internal("a"), guard, resets, "q")
    }

    #[test]
    fn successor_fires_only_when_the_guard_holds() {
        let (clocks, locations) = indices();
        // x in (1, 2), y at exactly 1
        let region = Region::from_parts(
            0,
            vec![1, 1],
            VecDeque::new(),
            set(2, &[1]),
            VecDeque::from(vec![set(2, &[0])]),
            VariableStore::new(),
        );

        let enabled = guarded(vec![Constraint::new("x", ComparisonOp::Gt, 1)], vec![]);
        let disabled = guarded(vec![Constraint::new("x", ComparisonOp::Le, 1)], vec![]);

        let successors = region.discrete_successors(&[enabled, disabled], &clocks, &locations);
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].location(), 1);
        assert_eq!(successors[0].h(), region.h());
    }

    #[test]
    fn successor_reset_rebuilds_the_partition() {
        let (clocks, locations) = indices();
        // x unbounded, y in (0, 1)
        let region = Region::from_parts(
            0,
            vec![3, 0],
            VecDeque::from(vec![set(2, &[0])]),
            set(2, &[]),
            VecDeque::from(vec![set(2, &[1])]),
            VariableStore::new(),
        );

        let transition = guarded(vec![], vec!["x"]);
        let successors = region.discrete_successors(&[transition], &clocks, &locations);
        assert_eq!(successors.len(), 1);

        let successor = &successors[0];
        assert_eq!(successor.h(), &[0, 0]);
        assert_eq!(successor.x0(), &set(2, &[0]));
        assert!(successor.unbounded().is_empty(), "emptied group must be dropped");
        assert_eq!(successor.bounded(), &VecDeque::from(vec![set(2, &[1])]));
    }

    #[test]
    fn successor_applies_the_assignment_block_in_order() {
        let (clocks, locations) = indices();
        let region = Region::initial(2, 0, VariableStore::from([("n".to_string(), 1)]));

        let transition = guarded(vec![], vec![]).with_assignments(vec![
            Assignment::new("n", IntExpr::binary(tarzan_core::ArithmeticOp::Add, IntExpr::var("n"), IntExpr::Const(1))),
            Assignment::new("m", IntExpr::binary(tarzan_core::ArithmeticOp::Mul, IntExpr::var("n"), IntExpr::Const(3))),
        ]);

        let successors = region.discrete_successors(&[transition], &clocks, &locations);
        assert_eq!(successors[0].variables()["n"], 2);
        assert_eq!(successors[0].variables()["m"], 6);
    }

    #[test]
    fn variable_guard_consults_the_store() {
        let (clocks, locations) = indices();
        let region = Region::initial(2, 0, VariableStore::from([("id".to_string(), 2)]));

        let transition = guarded(vec![Constraint::new("id", ComparisonOp::Eq, 0)], vec![]);
        assert!(region.discrete_successors(&[transition], &clocks, &locations).is_empty());

        let transition = guarded(vec![Constraint::new("id", ComparisonOp::Eq, 2)], vec![]);
        assert_eq!(region.discrete_successors(&[transition], &clocks, &locations).len(), 1);
    }

    #[test]
    fn predecessors_require_reset_clocks_at_zero() {
        let (clocks, locations) = indices();
        // x not in x0: the reset transition cannot have just fired
        let region = Region::from_parts(
            1,
            vec![1, 0],
            VecDeque::new(),
            set(2, &[1]),
            VecDeque::from(vec![set(2, &[0])]),
            VariableStore::new(),
        );
        let transition = guarded(vec![], vec!["x"]);
        assert!(region.discrete_predecessors(&[transition], &clocks, &locations, MAX).is_empty());
    }

    #[test]
    fn predecessors_enumerate_the_guard_interval() {
        let (clocks, locations) = indices();
        // successor: both clocks at zero after resetting x
        let region = Region::initial(2, 1, VariableStore::new());

        // x = 2 on firing: exactly one pre-image shape for x (x0 with h = 2), while y stays put
        let transition = guarded(vec![Constraint::new("x", ComparisonOp::Eq, 2)], vec!["x"]);
        let predecessors = region.discrete_predecessors(&[transition], &clocks, &locations, MAX);
        assert_eq!(predecessors.len(), 1);
        assert_eq!(predecessors[0].location(), 0);
        assert_eq!(predecessors[0].h(), &[2, 0]);
        assert_eq!(predecessors[0].x0(), &set(2, &[0, 1]));
    }

    #[test]
    fn predecessors_respect_the_strict_bound_mask() {
        let (clocks, locations) = indices();
        let region = Region::initial(2, 1, VariableStore::new());

        // x > 1 on firing: h = 1 demands a fractional part, h = 2 allows either, and the
        // sentinel h = 3 stands for the unbounded pre-images
        let transition = guarded(vec![Constraint::new("x", ComparisonOp::Gt, 1)], vec!["x"]);
        let predecessors = region.discrete_predecessors(&[transition], &clocks, &locations, MAX);

        for pred in &predecessors {
            let h = pred.h()[0];
            assert!(h >= 1, "interval must exclude values violating x > 1");
            if h == 1 {
                assert!(!pred.x0().contains(0), "x = 1 exactly would violate x > 1");
            }
            if h == 3 {
                assert!(pred.unbounded().iter().any(|g| g.contains(0)));
            }
        }
        // h = 1 fractional; h = 2 in x0 or fractional; h = 3 unbounded
        assert_eq!(predecessors.len(), 4);
    }

    #[test]
    fn predecessors_interleave_into_the_surviving_order() {
        let (clocks, locations) = indices();
        // successor keeps y fractional; x was just reset
        let region = Region::from_parts(
            1,
            vec![0, 0],
            VecDeque::new(),
            set(2, &[0]),
            VecDeque::from(vec![set(2, &[1])]),
            VariableStore::new(),
        );

        let transition = guarded(vec![Constraint::new("x", ComparisonOp::Eq, 1)], vec!["x"]);
        let predecessors = region.discrete_predecessors(&[transition], &clocks, &locations, MAX);

        // x sits in x0 at h = 1; y's group is untouched in every pre-image
        assert_eq!(predecessors.len(), 1);
        assert_eq!(predecessors[0].bounded(), &VecDeque::from(vec![set(2, &[1])]));
        assert_eq!(predecessors[0].h(), &[1, 0]);
    }

    #[test]
    fn unconstrained_reset_expands_every_arrangement() {
        let (clocks, locations) = indices();
        let region = Region::from_parts(
            1,
            vec![0, 0],
            VecDeque::new(),
            set(2, &[0]),
            VecDeque::from(vec![set(2, &[1])]),
            VariableStore::new(),
        );

        let transition = guarded(vec![], vec!["x"]);
        let predecessors = region.discrete_predecessors(&[transition.clone()], &clocks, &locations, MAX);

        // per integer value 0..=2: x0, fractional before/after y's group, or sharing y's
        // fraction; value 3: unbounded
        assert_eq!(predecessors.len(), 3 * 4 + 1);

        // round trip: firing the transition forward from any pre-image returns the successor
        for pred in &predecessors {
            let forward = pred.discrete_successors(
                std::slice::from_ref(&transition),
                &clocks,
                &locations,
            );
            assert_eq!(forward.len(), 1);
            assert_eq!(forward[0], region);
        }
    }

    #[test]
    fn successor_predecessor_round_trip() {
        let (clocks, locations) = indices();
        // x in (1, 2), y exactly 1
        let region = Region::from_parts(
            0,
            vec![1, 1],
            VecDeque::new(),
            set(2, &[1]),
            VecDeque::from(vec![set(2, &[0])]),
            VariableStore::new(),
        );

        let transition = guarded(vec![Constraint::new("x", ComparisonOp::Gt, 1)], vec!["y"]);
        let successors = region.discrete_successors(std::slice::from_ref(&transition), &clocks, &locations);
        assert_eq!(successors.len(), 1);

        let back = successors[0].discrete_predecessors(
            std::slice::from_ref(&transition),
            &clocks,
            &locations,
            MAX,
        );
        assert!(back.contains(&region), "source region must be among the predecessors");
    }
}
