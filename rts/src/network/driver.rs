use std::{
    collections::{BTreeMap, BTreeSet, HashSet, VecDeque},
    time::Instant,
};

use tarzan_core::{Constraint, TimedAutomaton, Transition, constraints_satisfied};
use tracing::{debug, info, instrument};

use crate::{
    NetworkRegion, ReachabilityReport, Region, RtsError, Strategy, partition::cartesian_product,
};

// NETWORK GOAL
// ================================================================================================

/// Forward reachability target over a network: per component an optional location (`None` =
/// don't care) and an optional constraint conjunction (conjoined to the location match).
#[derive(Clone, Debug, Default)]
pub struct NetworkGoal {
    pub locations: Vec<Option<usize>>,
    pub constraints: Vec<Vec<Constraint>>,
}

impl NetworkGoal {
    /// A goal matching on locations only.
    pub fn at_locations(locations: Vec<Option<usize>>) -> Self {
        let components = locations.len();
        Self { locations, constraints: vec![Vec::new(); components] }
    }

    pub fn with_constraints(mut self, component: usize, constraints: Vec<Constraint>) -> Self {
        self.constraints[component] = constraints;
        self
    }
}

// RTS NETWORK
// ================================================================================================

/// Region transition system of a synchronous network of timed automata.
///
/// Per-component index tables are derived once at construction. Initial network regions are the
/// cartesian product of the components' initial locations, every clock at fractional zero, over
/// the merged initial variable stores (on a name clash the first declaration wins). Reachability
/// is forward-only at the network level; backward procedures live on the single-automaton
/// driver.
pub struct RtsNetwork {
    max_constants: Vec<Vec<u32>>,
    clock_indices: Vec<BTreeMap<String, usize>>,
    location_indices: Vec<BTreeMap<String, usize>>,
    urgent_locations: Vec<BTreeSet<usize>>,
    out_transitions: Vec<Vec<Vec<Transition>>>,
    invariants: Vec<BTreeMap<usize, Vec<Constraint>>>,
    /// Components owning each clock name; several components may declare the same name.
    clocks_to_components: BTreeMap<String, Vec<usize>>,
    initial_regions: Vec<NetworkRegion>,
    symmetry_groups: Option<Vec<Vec<usize>>>,
}

impl RtsNetwork {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Builds the network transition system from the component automata, in the given order.
    ///
    /// # Errors
    /// Returns an error if the network is empty or any component fails validation.
    pub fn new(automata: &[TimedAutomaton]) -> Result<Self, RtsError> {
        if automata.is_empty() {
            return Err(RtsError::EmptyNetwork);
        }

        let mut max_constants = Vec::with_capacity(automata.len());
        let mut clock_indices = Vec::with_capacity(automata.len());
        let mut location_indices = Vec::with_capacity(automata.len());
        let mut urgent_locations = Vec::with_capacity(automata.len());
        let mut out_transitions = Vec::with_capacity(automata.len());
        let mut invariants = Vec::with_capacity(automata.len());
        let mut initial_locations = Vec::with_capacity(automata.len());
        let mut clocks_to_components: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut network_variables = tarzan_core::VariableStore::new();

        for (component, automaton) in automata.iter().enumerate() {
            automaton.validate()?;

            let clocks = automaton.clock_indices();
            let locations = automaton.location_indices();

            max_constants.push(automaton.max_constants(&clocks));
            initial_locations.push(automaton.initial_locations(&locations));
            urgent_locations.push(automaton.urgent_locations(&locations));
            out_transitions.push(automaton.out_transitions(&locations));
            invariants.push(automaton.invariant_table(&locations));

            for clock in &automaton.clocks {
                clocks_to_components.entry(clock.clone()).or_default().push(component);
            }
            for (name, value) in &automaton.variables {
                network_variables.entry(name.clone()).or_insert(*value);
            }

            clock_indices.push(clocks);
            location_indices.push(locations);
        }

        let initial_regions = cartesian_product(&initial_locations)
            .into_iter()
            .map(|locations| {
                let regions = locations
                    .iter()
                    .enumerate()
                    .map(|(component, &location)| {
                        Region::initial(clock_indices[component].len(), location, Default::default())
                    })
                    .collect();
                NetworkRegion::new(regions, true, network_variables.clone())
            })
            .collect();

        Ok(Self {
            max_constants,
            clock_indices,
            location_indices,
            urgent_locations,
            out_transitions,
            invariants,
            clocks_to_components,
            initial_regions,
            symmetry_groups: None,
        })
    }

    /// Declares groups of interchangeable components; the visited set then deduplicates on
    /// canonical forms.
    ///
    /// # Errors
    /// Returns an error if a group member is out of range or the groups overlap.
    pub fn enable_symmetry_reduction(&mut self, groups: Vec<Vec<usize>>) -> Result<(), RtsError> {
        let components = self.clock_indices.len();
        let mut seen = BTreeSet::new();
        for group in &groups {
            for &member in group {
                if member >= components {
                    return Err(RtsError::SymmetryGroupOutOfRange(member));
                }
                if !seen.insert(member) {
                    return Err(RtsError::OverlappingSymmetryGroups(member));
                }
            }
        }
        self.symmetry_groups = Some(groups);
        Ok(())
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn components(&self) -> usize {
        self.clock_indices.len()
    }

    pub fn location_indices(&self) -> &[BTreeMap<String, usize>] {
        &self.location_indices
    }

    pub fn clock_indices(&self) -> &[BTreeMap<String, usize>] {
        &self.clock_indices
    }

    pub fn max_constants(&self) -> &[Vec<u32>] {
        &self.max_constants
    }

    pub fn initial_regions(&self) -> &[NetworkRegion] {
        &self.initial_regions
    }

    /// Components declaring the given clock name.
    pub fn components_of_clock(&self, clock: &str) -> &[usize] {
        self.clocks_to_components.get(clock).map(Vec::as_slice).unwrap_or(&[])
    }

    // FORWARD REACHABILITY
    // --------------------------------------------------------------------------------------------

    /// Explores the network's reachable region quotient until the goal matches or the frontier
    /// is exhausted.
    ///
    /// The goal is tested on dequeue. A delay successor is expanded first, but only when no
    /// component sits in an urgent location; the discrete successors follow, independent steps
    /// in component order before synchronized pairs. Candidates violating any component's
    /// location invariant are dropped. With symmetry reduction enabled every region is
    /// canonicalized before entering the frontier, so symmetric interleavings collapse.
    #[instrument(skip_all, fields(strategy = %strategy))]
    pub fn forward_reachability(
        &self,
        goal: &NetworkGoal,
        strategy: Strategy,
    ) -> ReachabilityReport<NetworkRegion> {
        debug_assert_eq!(goal.locations.len(), self.components());

        let mut frontier: VecDeque<NetworkRegion> = VecDeque::new();
        let mut visited: HashSet<NetworkRegion> = HashSet::new();

        for initial in &self.initial_regions {
            let stamped = initial
                .clone()
                .with_goal(goal.locations.clone(), goal.constraints.clone());
            let stamped = self.canonicalize(stamped);
            if visited.insert(stamped.clone()) {
                frontier.push_back(stamped);
            }
        }

        let mut regions_computed: u64 = 0;
        let start = Instant::now();

        while let Some(current) = match strategy {
            Strategy::Bfs => frontier.pop_front(),
            Strategy::Dfs => frontier.pop_back(),
        } {
            debug!(region = %current, "dequeued");

            if self.goal_matches(&current) {
                let elapsed = start.elapsed();
                info!(
                    regions = regions_computed,
                    micros = elapsed.as_micros() as u64,
                    "goal region is reachable"
                );
                return ReachabilityReport { regions_computed, elapsed, witness: Some(current) };
            }

            let delay_permitted = !current
                .regions()
                .iter()
                .enumerate()
                .any(|(component, region)| self.urgent_locations[component].contains(&region.location()));
            let delay_successor = delay_permitted.then(|| current.delay_successor(&self.max_constants));

            let transitions: Vec<&[Transition]> = current
                .regions()
                .iter()
                .enumerate()
                .map(|(component, region)| self.out_transitions[component][region.location()].as_slice())
                .collect();
            let discrete_successors =
                current.discrete_successors(&transitions, &self.clock_indices, &self.location_indices);

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

    // HELPERS
    // --------------------------------------------------------------------------------------------

    fn canonicalize(&self, region: NetworkRegion) -> NetworkRegion {
        match &self.symmetry_groups {
            Some(groups) => region.canonical_form(groups),
            None => region,
        }
    }

    fn insert_if_legal(
        &self,
        region: NetworkRegion,
        frontier: &mut VecDeque<NetworkRegion>,
        visited: &mut HashSet<NetworkRegion>,
    ) {
        let region = self.canonicalize(region);
        if visited.contains(&region) {
            return;
        }

        for (component, local) in region.regions().iter().enumerate() {
            if let Some(invariant) = self.invariants[component].get(&local.location())
                && !constraints_satisfied(
                    invariant,
                    &local.valuation(),
                    &self.clock_indices[component],
                    region.network_variables(),
                )
            {
                return;
            }
        }

        visited.insert(region.clone());
        frontier.push_back(region);
    }

    /// A region matches when every component with a goal location sits there and every
    /// per-component constraint conjunction holds. The region's own (possibly permuted) goal
    /// slots are consulted, keeping the test symmetry-consistent.
    fn goal_matches(&self, region: &NetworkRegion) -> bool {
        for (component, local) in region.regions().iter().enumerate() {
            if let Some(target) = region.goal_locations()[component]
                && local.location() != target
            {
                return false;
            }
            let constraints = &region.goal_constraints()[component];
            if !constraints.is_empty()
                && !constraints_satisfied(
                    constraints,
                    &local.valuation(),
                    &self.clock_indices[component],
                    region.network_variables(),
                )
            {
                return false;
            }
        }
        true
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tarzan_core::{Action, Location, TimedAutomaton, Transition};

    use super::*;

    fn component(name: &str, initials: &[&str], variables: Vec<(&str, i64)>) -> TimedAutomaton {
        let mut locations: Vec<Location> = initials.iter().map(|l| Location::initial(*l)).collect();
        locations.push(Location::new("other"));
        TimedAutomaton {
            name: name.to_string(),
            clocks: vec![format!("{name}_c")],
            actions: vec![Action::internal("step")],
            locations,
            transitions: vec![Transition::new(initials[0], Action::internal("step"), vec![], vec![], "other")],
            invariants: vec![],
            variables: variables.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        }
    }

    #[test]
    fn initial_regions_are_the_cartesian_product() {
        let automata = vec![
            component("a", &["i0", "i1"], vec![]),
            component("b", &["j0"], vec![]),
        ];
        let net = RtsNetwork::new(&automata).unwrap();

        let initials = net.initial_regions();
        assert_eq!(initials.len(), 2);
        for initial in initials {
            assert_eq!(initial.class_a_or_c().len(), 2, "all components start in class A");
            assert!(initial.regions().iter().all(|r| r.is_initial_valuation()));
        }

        let pairs: Vec<(usize, usize)> = initials
            .iter()
            .map(|net_region| (net_region.regions()[0].location(), net_region.regions()[1].location()))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn clashing_variable_declarations_keep_the_first_value() {
        let automata = vec![
            component("a", &["i0"], vec![("shared", 1), ("mine", 2)]),
            component("b", &["j0"], vec![("shared", 9), ("yours", 3)]),
        ];
        let net = RtsNetwork::new(&automata).unwrap();

        let store = net.initial_regions()[0].network_variables();
        assert_eq!(store["shared"], 1);
        assert_eq!(store["mine"], 2);
        assert_eq!(store["yours"], 3);
    }

    #[test]
    fn per_component_tables_track_declaration_order() {
        let automata = vec![component("a", &["i0"], vec![]), component("b", &["j0"], vec![])];
        let net = RtsNetwork::new(&automata).unwrap();

        assert_eq!(net.components(), 2);
        assert_eq!(net.clock_indices()[0]["a_c"], 0);
        assert_eq!(net.clock_indices()[1]["b_c"], 0);
        assert_eq!(net.components_of_clock("a_c"), &[0]);
        assert!(net.components_of_clock("nope").is_empty());
        assert_eq!(net.max_constants(), &[vec![0], vec![0]]);
    }
}
