use std::collections::{BTreeMap, HashSet, VecDeque};

use smallvec::SmallVec;
use tarzan_core::{Constraint, VariableStore};

use super::{
    Region,
    discrete::{admissible_interval, interleavings},
};
use crate::{ClockSet, partition::integer_interval_combinations};

// REGION ENUMERATION
// ================================================================================================

/// Enumerates every region over the automaton's granularity that satisfies the given constraint
/// conjunction, one copy per listed location.
///
/// This is the base case of formula-to-region extraction: a pure formula names locations and
/// clock constraints, and the matching start set for backward verification is every region whose
/// valuations all satisfy them. Integer parts range over the guard-admissible interval up to the
/// sentinel; all fractional arrangements (zero, ordered bounded groups, unbounded crossing
/// orders) are expanded exactly as in discrete predecessor computation. Constraints naming
/// integer variables are checked once against the supplied store and, when violated, empty the
/// result.
pub(crate) fn regions_satisfying(
    locations: &[usize],
    constraints: &[Constraint],
    clock_indices: &BTreeMap<String, usize>,
    max_constants: &[u32],
    variables: &VariableStore,
) -> HashSet<Region> {
    let num_clocks = max_constants.len();
    let mut regions = HashSet::new();

    // variable constraints hold or the whole set is empty
    let mut clock_guards: Vec<Vec<&Constraint>> = vec![Vec::new(); num_clocks];
    for constraint in constraints {
        match clock_indices.get(&constraint.name) {
            Some(&clock) => clock_guards[clock].push(constraint),
            None => {
                let value = variables.get(&constraint.name).copied().unwrap_or(0);
                if !constraint.is_satisfied_by_int(value) {
                    return regions;
                }
            },
        }
    }

    let mut intervals = BTreeMap::new();
    for clock in 0..num_clocks {
        match admissible_interval(&clock_guards[clock], max_constants[clock]) {
            Some(interval) => {
                intervals.insert(clock, interval);
            },
            None => return regions,
        }
    }

    let assignments = if num_clocks == 0 {
        vec![Vec::new()]
    } else {
        integer_interval_combinations(&intervals)
    };

    'assignments: for assignment in &assignments {
        let mut crossing = ClockSet::empty(num_clocks);
        let mut must_x0 = ClockSet::empty(num_clocks);
        let mut must_fraction = ClockSet::empty(num_clocks);
        let mut free: SmallVec<[usize; 8]> = SmallVec::new();

        for &(clock, value) in assignment {
            let guards = &clock_guards[clock];
            if value == max_constants[clock] + 1 {
                if guards.iter().all(|c| c.is_satisfied(value, true)) {
                    crossing.insert(clock);
                } else {
                    continue 'assignments;
                }
            } else {
                let zero_ok = guards.iter().all(|c| c.is_satisfied(value, false));
                let fraction_ok = guards.iter().all(|c| c.is_satisfied(value, true));
                match (zero_ok, fraction_ok) {
                    (true, true) => free.push(clock),
                    (true, false) => must_x0.insert(clock),
                    (false, true) => must_fraction.insert(clock),
                    (false, false) => continue 'assignments,
                }
            }
        }

        let mut h = vec![0u32; num_clocks];
        for &(clock, value) in assignment {
            h[clock] = value;
        }

        for choice in 0u32..(1 << free.len()) {
            let mut x0 = must_x0.clone();
            let mut fractional = must_fraction.clone();
            for (bit, &clock) in free.iter().enumerate() {
                if choice & (1 << bit) != 0 {
                    x0.insert(clock);
                } else {
                    fractional.insert(clock);
                }
            }

            for bounded in interleavings(&fractional, &VecDeque::new()) {
                for unbounded in interleavings(&crossing, &VecDeque::new()) {
                    for &location in locations {
                        regions.insert(Region::from_parts(
                            location,
                            h.clone(),
                            unbounded.clone(),
                            x0.clone(),
                            bounded.clone(),
                            variables.clone(),
                        ));
                    }
                }
            }
        }
    }

    regions
}

// TESTS
// ================================================================================================
