use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use crate::{Assignment, Constraint, ModelError, VariableStore};

// ACTIONS
// ================================================================================================

/// Synchronization tag of an action: `!` emits on a channel, `?` receives from it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyncTag {
    Output,
    Input,
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTag::Output => f.write_str("!"),
            SyncTag::Input => f.write_str("?"),
        }
    }
}

/// A transition label. Actions without a tag fire alone; tagged actions fire in
/// output/input pairs across two components of a network.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Action {
    pub name: String,
    pub sync: Option<SyncTag>,
}

impl Action {
    /// An action that never synchronizes.
    pub fn internal(name: impl Into<String>) -> Self {
        Self { name: name.into(), sync: None }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self { name: name.into(), sync: Some(SyncTag::Output) }
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self { name: name.into(), sync: Some(SyncTag::Input) }
    }

    /// Returns true if this action and `other` form a matched output/input pair.
    pub fn synchronizes_with(&self, other: &Action) -> bool {
        match (self.sync, other.sync) {
            (Some(a), Some(b)) => a != b && self.name == other.name,
            _ => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sync {
            Some(tag) => write!(f, "{}{}", self.name, tag),
            None => f.write_str(&self.name),
        }
    }
}

// LOCATIONS
// ================================================================================================

/// A control location. Urgent locations forbid the passage of time.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Location {
    pub name: String,
    pub initial: bool,
    pub urgent: bool,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), initial: false, urgent: false }
    }

    pub fn initial(name: impl Into<String>) -> Self {
        Self { name: name.into(), initial: true, urgent: false }
    }

    pub fn urgent(name: impl Into<String>) -> Self {
        Self { name: name.into(), initial: false, urgent: true }
    }

    pub fn initial_urgent(name: impl Into<String>) -> Self {
        Self { name: name.into(), initial: true, urgent: true }
    }
}

// TRANSITIONS
// ================================================================================================

/// An edge `(source, action, guard, resets, target)` with an optional assignment block over the
/// integer variables.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Transition {
    pub source: String,
    pub action: Action,
    pub guard: Vec<Constraint>,
    pub resets: Vec<String>,
    pub assignments: Vec<Assignment>,
    pub target: String,
}

impl Transition {
    pub fn new(
        source: impl Into<String>,
        action: Action,
        guard: Vec<Constraint>,
        resets: Vec<&str>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            action,
            guard,
            resets: resets.into_iter().map(String::from).collect(),
            assignments: Vec::new(),
            target: target.into(),
        }
    }

    pub fn with_assignments(mut self, assignments: Vec<Assignment>) -> Self {
        self.assignments = assignments;
        self
    }

    /// Returns true if the guard holds for the given clock valuation and variable store.
    ///
    /// Constraint names are resolved against `clock_indices` first; names that are not clocks are
    /// treated as integer variables.
    pub fn is_satisfied(
        &self,
        valuation: &[(u32, bool)],
        clock_indices: &BTreeMap<String, usize>,
        variables: &VariableStore,
    ) -> bool {
        constraints_satisfied(&self.guard, valuation, clock_indices, variables)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --({})--> {}", self.source, self.action, self.target)
    }
}

/// Checks a constraint conjunction against a clock valuation and a variable store.
///
/// Shared by guard checks, invariant filtering and goal tests.
pub fn constraints_satisfied(
    constraints: &[Constraint],
    valuation: &[(u32, bool)],
    clock_indices: &BTreeMap<String, usize>,
    variables: &VariableStore,
) -> bool {
    constraints.iter().all(|c| match clock_indices.get(&c.name) {
        Some(&idx) => {
            let (h, frac) = valuation[idx];
            c.is_satisfied(h, frac)
        },
        None => c.is_satisfied_by_int(variables.get(&c.name).copied().unwrap_or(0)),
    })
}

// TIMED AUTOMATON
// ================================================================================================

/// Abstract timed automaton with integer variables and urgency annotations.
///
/// Clock and location indices are positional: the i-th declared clock has index i, and likewise
/// for locations. The kernel derives all of its lookup tables through the accessors below and
/// treats them as immutable afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimedAutomaton {
    pub name: String,
    pub clocks: Vec<String>,
    pub actions: Vec<Action>,
    pub locations: Vec<Location>,
    pub transitions: Vec<Transition>,
    pub invariants: Vec<(String, Vec<Constraint>)>,
    pub variables: Vec<(String, i64)>,
}

impl TimedAutomaton {
    // VALIDATION
    // --------------------------------------------------------------------------------------------

    /// Checks referential integrity of the model.
    ///
    /// # Errors
    /// Returns an error if a clock or location is declared twice, a transition endpoint or an
    /// invariant refers to an unknown location, or a reset names an unknown clock. Guard names
    /// that are neither clocks nor declared variables are rejected as well.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen_clocks = BTreeSet::new();
        for clock in &self.clocks {
            if !seen_clocks.insert(clock.as_str()) {
                return Err(ModelError::DuplicateClock(clock.clone()));
            }
        }

        let mut seen_locations = BTreeSet::new();
        for location in &self.locations {
            if !seen_locations.insert(location.name.as_str()) {
                return Err(ModelError::DuplicateLocation(location.name.clone()));
            }
        }

        let variables: BTreeSet<&str> = self.variables.iter().map(|(n, _)| n.as_str()).collect();
        let check_constraints = |constraints: &[Constraint]| -> Result<(), ModelError> {
            for c in constraints {
                if !seen_clocks.contains(c.name.as_str()) && !variables.contains(c.name.as_str()) {
                    return Err(ModelError::UnknownConstraintName(c.name.clone()));
                }
            }
            Ok(())
        };

        for transition in &self.transitions {
            for endpoint in [&transition.source, &transition.target] {
                if !seen_locations.contains(endpoint.as_str()) {
                    return Err(ModelError::UnknownLocation(endpoint.clone()));
                }
            }
            for reset in &transition.resets {
                if !seen_clocks.contains(reset.as_str()) {
                    return Err(ModelError::UnknownClock(reset.clone()));
                }
            }
            check_constraints(&transition.guard)?;
        }

        for (location, constraints) in &self.invariants {
            if !seen_locations.contains(location.as_str()) {
                return Err(ModelError::UnknownLocation(location.clone()));
            }
            check_constraints(constraints)?;
        }

        Ok(())
    }

    // DERIVED TABLES
    // --------------------------------------------------------------------------------------------

    /// Maps each clock name to its positional index.
    pub fn clock_indices(&self) -> BTreeMap<String, usize> {
        self.clocks.iter().cloned().zip(0..).collect()
    }

    /// Maps each location name to its positional index.
    pub fn location_indices(&self) -> BTreeMap<String, usize> {
        self.locations.iter().map(|l| l.name.clone()).zip(0..).collect()
    }

    /// Indices of the locations marked initial, in declaration order.
    pub fn initial_locations(&self, locations: &BTreeMap<String, usize>) -> Vec<usize> {
        self.locations.iter().filter(|l| l.initial).map(|l| locations[&l.name]).collect()
    }

    /// Indices of the locations marked urgent.
    pub fn urgent_locations(&self, locations: &BTreeMap<String, usize>) -> BTreeSet<usize> {
        self.locations.iter().filter(|l| l.urgent).map(|l| locations[&l.name]).collect()
    }

    /// Outgoing transitions, indexed by source location.
    pub fn out_transitions(&self, locations: &BTreeMap<String, usize>) -> Vec<Vec<Transition>> {
        let mut table = vec![Vec::new(); self.locations.len()];
        for transition in &self.transitions {
            table[locations[&transition.source]].push(transition.clone());
        }
        table
    }

    /// Incoming transitions, indexed by target location.
    pub fn in_transitions(&self, locations: &BTreeMap<String, usize>) -> Vec<Vec<Transition>> {
        let mut table = vec![Vec::new(); self.locations.len()];
        for transition in &self.transitions {
            table[locations[&transition.target]].push(transition.clone());
        }
        table
    }

    /// Invariant conjunctions keyed by location index. Locations without an invariant are absent.
    pub fn invariant_table(&self, locations: &BTreeMap<String, usize>) -> BTreeMap<usize, Vec<Constraint>> {
        let mut table: BTreeMap<usize, Vec<Constraint>> = BTreeMap::new();
        for (location, constraints) in &self.invariants {
            table.entry(locations[location]).or_default().extend(constraints.iter().cloned());
        }
        table
    }

    /// Per-clock maximum constants: the largest bound comparing each clock in any guard or
    /// invariant. Clocks never compared get 0.
    pub fn max_constants(&self, clocks: &BTreeMap<String, usize>) -> Vec<u32> {
        self.max_constants_with(clocks, &[])
    }

    /// Per-clock maximum constants, additionally folding in the bounds of `extra` (goal or
    /// formula constraints), so that reachability questions stated beyond guard bounds keep
    /// their granularity.
    pub fn max_constants_with(&self, clocks: &BTreeMap<String, usize>, extra: &[Constraint]) -> Vec<u32> {
        let mut max = vec![0u32; clocks.len()];

        let mut fold = |constraints: &[Constraint]| {
            for c in constraints {
                if let Some(&idx) = clocks.get(&c.name) {
                    max[idx] = max[idx].max(c.bound);
                }
            }
        };

        for transition in &self.transitions {
            fold(&transition.guard);
        }
        for (_, constraints) in &self.invariants {
            fold(constraints);
        }
        fold(extra);

        max
    }

    /// Initial values of the declared integer variables.
    pub fn initial_variables(&self) -> VariableStore {
        self.variables.iter().map(|(n, v)| (n.clone(), *v)).collect()
    }
}

// TESTS
// ================================================================================================
