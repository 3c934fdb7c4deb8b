use core::fmt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tarzan_core::{Constraint, SyncTag, Transition, VariableStore};

use crate::{ClockSet, Region};

// NETWORK REGION
// ================================================================================================

/// Product-level region of a synchronous network of timed automata.
///
/// Each component keeps its own [`Region`]; what the product adds is the information needed to
/// interleave their fractional parts correctly:
///
/// - `class_a_or_c` lists the components whose local region currently has a clock at fractional
///   zero (initial or just reset); delay advances those first;
/// - `clock_ordering` interleaves the components' bounded groups across the network: each map
///   element gathers, per component, the clocks sharing one fractional value, and the deque is
///   ordered by ascending fraction;
/// - `network_variables` is the shared integer store all components read and write.
///
/// The goal slots ride with the region so symmetry canonicalization can permute them together
/// with the components; they participate in identity like everything else. Component-local
/// variable stores do not (the network store supersedes them).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NetworkRegion {
    regions: Vec<Region>,
    class_a_or_c: BTreeSet<usize>,
    clock_ordering: VecDeque<BTreeMap<usize, ClockSet>>,
    network_variables: VariableStore,
    goal_locations: Vec<Option<usize>>,
    goal_constraints: Vec<Vec<Constraint>>,
}

impl NetworkRegion {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Wraps per-component regions into a network region. When every component is initial they
    /// all start in class A.
    pub fn new(regions: Vec<Region>, all_initial: bool, network_variables: VariableStore) -> Self {
        let components = regions.len();
        Self {
            regions,
            class_a_or_c: if all_initial { (0..components).collect() } else { BTreeSet::new() },
            clock_ordering: VecDeque::new(),
            network_variables,
            goal_locations: vec![None; components],
            goal_constraints: vec![Vec::new(); components],
        }
    }

    /// Stamps the goal slots onto this region (applied to the start regions of a search so
    /// canonicalization keeps goals aligned with permuted components).
    pub fn with_goal(mut self, locations: Vec<Option<usize>>, constraints: Vec<Vec<Constraint>>) -> Self {
        debug_assert_eq!(locations.len(), self.regions.len());
        debug_assert_eq!(constraints.len(), self.regions.len());
        self.goal_locations = locations;
        self.goal_constraints = constraints;
        self
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn components(&self) -> usize {
        self.regions.len()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn class_a_or_c(&self) -> &BTreeSet<usize> {
        &self.class_a_or_c
    }

    pub fn clock_ordering(&self) -> &VecDeque<BTreeMap<usize, ClockSet>> {
        &self.clock_ordering
    }

    pub fn network_variables(&self) -> &VariableStore {
        &self.network_variables
    }

    pub fn goal_locations(&self) -> &[Option<usize>] {
        &self.goal_locations
    }

    pub fn goal_constraints(&self) -> &[Vec<Constraint>] {
        &self.goal_constraints
    }

    // DELAY SUCCESSOR
    // --------------------------------------------------------------------------------------------

    /// Computes the immediate delay successor of the network.
    ///
    /// If some components hold clocks at fractional zero, those advance first: each such
    /// component takes its local delay step, and the clocks that stay bounded afterwards form a
    /// new front `clock_ordering` entry (they now share the smallest positive fraction in the
    /// network). Otherwise the back of `clock_ordering`, holding the globally largest fraction,
    /// reaches the next integer: the listed components take their local delay step and re-enter
    /// class A or C when clocks come back to zero. With nothing bounded anywhere the region is a
    /// fixed point.
    pub fn delay_successor(&self, max_constants: &[Vec<u32>]) -> NetworkRegion {
        let mut next = self.clone();

        if !self.class_a_or_c.is_empty() {
            let mut new_ordering: BTreeMap<usize, ClockSet> = BTreeMap::new();

            for &component in &self.class_a_or_c {
                let original_x0 = next.regions[component].x0().clone();
                next.regions[component] = next.regions[component].delay_successor(&max_constants[component]);

                if let Some(front) = next.regions[component].bounded().front() {
                    let still_bounded = original_x0.intersection(front);
                    if !still_bounded.is_empty() {
                        new_ordering.insert(component, still_bounded);
                    }
                }
            }

            next.class_a_or_c.clear();
            if !new_ordering.is_empty() {
                next.clock_ordering.push_front(new_ordering);
            }
        } else if let Some(back) = next.clock_ordering.pop_back() {
            for (&component, _) in &back {
                next.regions[component] = next.regions[component].delay_successor(&max_constants[component]);
                if !next.regions[component].x0().is_empty() {
                    next.class_a_or_c.insert(component);
                }
            }
        }

        next
    }

    // DISCRETE SUCCESSORS
    // --------------------------------------------------------------------------------------------

    /// Computes the immediate discrete successors of the network.
    ///
    /// Every non-synchronizing transition of every component may fire alone, exactly as in the
    /// single-automaton case but against the shared variable store. Every matched output/input
    /// pair across two distinct components may fire together: the output side goes first and its
    /// updated store feeds the input side's guard and assignments; the pair fires only if both
    /// sides produce a successor. `transitions[i]` must hold component `i`'s transitions leaving
    /// its current location.
    pub fn discrete_successors(
        &self,
        transitions: &[&[Transition]],
        clock_indices: &[BTreeMap<String, usize>],
        location_indices: &[BTreeMap<String, usize>],
    ) -> Vec<NetworkRegion> {
        debug_assert_eq!(transitions.len(), self.regions.len());
        let mut successors = Vec::new();

        // independent steps first, in component order
        for (component, component_transitions) in transitions.iter().enumerate() {
            for transition in component_transitions.iter().filter(|t| t.action.sync.is_none()) {
                if let Some(local) = self.fire_local(component, transition, &self.network_variables, clock_indices, location_indices) {
                    let mut next = self.clone();
                    next.network_variables = local.variables().clone();
                    next.apply_component_successor(component, local, &transition.resets, clock_indices);
                    successors.push(next);
                }
            }
        }

        // then matched output/input pairs across distinct components
        for first in 0..transitions.len() {
            for first_transition in transitions[first].iter().filter(|t| t.action.sync.is_some()) {
                for second in (first + 1)..transitions.len() {
                    for second_transition in transitions[second].iter().filter(|t| t.action.sync.is_some()) {
                        if !first_transition.action.synchronizes_with(&second_transition.action) {
                            continue;
                        }

                        let ((out_idx, out_t), (in_idx, in_t)) =
                            if first_transition.action.sync == Some(SyncTag::Output) {
                                ((first, first_transition), (second, second_transition))
                            } else {
                                ((second, second_transition), (first, first_transition))
                            };

                        let Some(out_local) =
                            self.fire_local(out_idx, out_t, &self.network_variables, clock_indices, location_indices)
                        else {
                            continue;
                        };
                        let Some(in_local) =
                            self.fire_local(in_idx, in_t, out_local.variables(), clock_indices, location_indices)
                        else {
                            continue;
                        };

                        let mut next = self.clone();
                        next.network_variables = in_local.variables().clone();
                        next.apply_component_successor(out_idx, out_local, &out_t.resets, clock_indices);
                        next.apply_component_successor(in_idx, in_local, &in_t.resets, clock_indices);
                        successors.push(next);
                    }
                }
            }
        }

        successors
    }

    /// Fires one transition of one component against the given variable store, returning the
    /// local successor region if the transition is enabled.
    fn fire_local(
        &self,
        component: usize,
        transition: &Transition,
        variables: &VariableStore,
        clock_indices: &[BTreeMap<String, usize>],
        location_indices: &[BTreeMap<String, usize>],
    ) -> Option<Region> {
        let mut local = self.regions[component].clone();
        local.set_variables(variables.clone());
        local
            .discrete_successors(
                std::slice::from_ref(transition),
                &clock_indices[component],
                &location_indices[component],
            )
            .pop()
    }

    /// Installs a component's discrete successor and scrubs its reset clocks from the
    /// inter-component ordering.
    fn apply_component_successor(
        &mut self,
        component: usize,
        successor: Region,
        resets: &[String],
        clock_indices: &[BTreeMap<String, usize>],
    ) {
        let num_clocks = successor.num_clocks();
        self.regions[component] = successor;

        if resets.is_empty() || num_clocks == 0 {
            return;
        }

        let mut reset_set = ClockSet::empty(num_clocks);
        for clock in resets {
            reset_set.insert(clock_indices[component][clock]);
        }

        for ordering in &mut self.clock_ordering {
            if let Some(clocks) = ordering.get_mut(&component) {
                clocks.difference_with(&reset_set);
                if clocks.is_empty() {
                    ordering.remove(&component);
                }
            }
        }
        self.clock_ordering.retain(|ordering| !ordering.is_empty());

        // the reset clocks sit at fractional zero now
        self.class_a_or_c.insert(component);
    }

    // CANONICAL FORM
    // --------------------------------------------------------------------------------------------

    /// Canonicalizes the region under the given symmetry groups.
    ///
    /// Within each group of components declared interchangeable, the member regions are sorted
    /// by the region total order, and the induced permutation is applied uniformly to the
    /// regions, `class_a_or_c`, every `clock_ordering` entry and the goal slots. Applying the
    /// form twice yields the same region.
    pub fn canonical_form(&self, symmetry_groups: &[Vec<usize>]) -> NetworkRegion {
        let mut canonical = self.clone();

        for group in symmetry_groups {
            if group.len() <= 1 {
                continue;
            }

            let mut members: Vec<(usize, Region)> =
                group.iter().map(|&idx| (idx, self.regions[idx].clone())).collect();
            members.sort_by(|a, b| a.1.cmp(&b.1));

            // permutation[i] = original index of the region landing at group slot i
            let permutation: Vec<usize> = members.iter().map(|(idx, _)| *idx).collect();

            for (slot, (_, region)) in group.iter().zip(members) {
                canonical.regions[*slot] = region;
            }

            let in_class: Vec<usize> = group
                .iter()
                .zip(&permutation)
                .filter(|&(_, &source)| self.class_a_or_c.contains(&source))
                .map(|(&slot, _)| slot)
                .collect();
            for &idx in group {
                canonical.class_a_or_c.remove(&idx);
            }
            canonical.class_a_or_c.extend(in_class);

            for (ordering, source_ordering) in
                canonical.clock_ordering.iter_mut().zip(&self.clock_ordering)
            {
                let remapped: Vec<(usize, ClockSet)> = group
                    .iter()
                    .zip(&permutation)
                    .filter_map(|(&slot, &source)| {
                        source_ordering.get(&source).map(|clocks| (slot, clocks.clone()))
                    })
                    .collect();
                for &idx in group {
                    ordering.remove(&idx);
                }
                ordering.extend(remapped);
            }

            for (&slot, &source) in group.iter().zip(&permutation) {
                canonical.goal_locations[slot] = self.goal_locations[source];
                canonical.goal_constraints[slot] = self.goal_constraints[source].clone();
            }
        }

        canonical
    }
}

impl fmt::Display for NetworkRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NetworkRegion {{")?;
        for (component, region) in self.regions.iter().enumerate() {
            writeln!(f, "  [{component}]: {region}")?;
        }
        write!(f, "  class A/C: {{")?;
        for (n, component) in self.class_a_or_c.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{component}")?;
        }
        writeln!(f, "}}")?;
        writeln!(f, "  ordering ({} entries):", self.clock_ordering.len())?;
        for (n, ordering) in self.clock_ordering.iter().enumerate() {
            write!(f, "    [{n}]: {{")?;
            for (m, (component, clocks)) in ordering.iter().enumerate() {
                if m > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{component} -> {clocks}")?;
            }
            writeln!(f, "}}")?;
        }
        write!(f, "  variables: {{")?;
        for (n, (name, value)) in self.network_variables.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name} -> {value}")?;
        }
        write!(f, "}}\n}}")
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tarzan_core::{Action, ComparisonOp};

    use super::*;

    fn maps(
        clocks_per_component: &[&[&str]],
        locations: &[&str],
    ) -> (Vec<BTreeMap<String, usize>>, Vec<BTreeMap<String, usize>>) {
        let clock_maps = clocks_per_component
            .iter()
            .map(|clocks| clocks.iter().map(|c| c.to_string()).zip(0..).collect())
            .collect();
        let location_map: BTreeMap<String, usize> =
            locations.iter().map(|l| l.to_string()).zip(0..).collect();
        let location_maps = vec![location_map; clocks_per_component.len()];
        (clock_maps, location_maps)
    }

    fn two_component_initial() -> NetworkRegion {
        let regions = vec![
            Region::initial(1, 0, VariableStore::new()),
            Region::initial(1, 0, VariableStore::new()),
        ];
        NetworkRegion::new(regions, true, VariableStore::new())
    }

    const MAX: &[&[u32]] = &[&[1], &[1]];

    fn max_constants() -> Vec<Vec<u32>> {
        MAX.iter().map(|m| m.to_vec()).collect()
    }

    #[test]
    fn initial_network_is_all_class_a() {
        let region = two_component_initial();
        assert_eq!(region.class_a_or_c().len(), 2);
        assert!(region.clock_ordering().is_empty());
    }

    #[test]
    fn delay_moves_class_a_clocks_into_a_shared_front_entry() {
        let region = two_component_initial();
        let next = region.delay_successor(&max_constants());

        assert!(next.class_a_or_c().is_empty());
        assert_eq!(next.clock_ordering().len(), 1);
        let front = &next.clock_ordering()[0];
        assert_eq!(front.len(), 2, "both components' clocks share the smallest fraction");
        assert!(front[&0].contains(0));
        assert!(front[&1].contains(0));
    }

    #[test]
    fn delay_pops_the_back_entry_and_restores_class_membership() {
        let region = two_component_initial();
        let stepped = region.delay_successor(&max_constants());
        let next = stepped.delay_successor(&max_constants());

        // both local clocks reached integer 1 (max 1), so both components are class A/C again
        assert!(next.clock_ordering().is_empty());
        assert_eq!(next.class_a_or_c().len(), 2);
        for component in next.regions() {
            assert_eq!(component.h(), &[1]);
            assert!(component.x0().contains(0));
        }
    }

    #[test]
    fn component_crossing_max_leaves_the_ordering_for_good() {
        let mut current = two_component_initial();
        // delay until every clock is unbounded: the network region becomes a delay fixed point
        for _ in 0..4 {
            current = current.delay_successor(&max_constants());
        }
        assert!(current.class_a_or_c().is_empty());
        assert!(current.clock_ordering().is_empty());
        for component in current.regions() {
            assert_eq!(component.h(), &[2]);
        }
        assert_eq!(current.delay_successor(&max_constants()), current);
    }

    #[test]
    fn non_sync_step_updates_store_and_ordering() {
        let (clock_maps, location_maps) = maps(&[&["x"], &["y"]], &["p", "q"]);
        let region = two_component_initial().delay_successor(&max_constants());

        let step = Transition::new(
            "p",
            Action::internal("go"),
            vec![],
            vec!["x"],
            "q",
        )
        .with_assignments(vec![tarzan_core::Assignment::new("n", tarzan_core::IntExpr::Const(7))]);

        let transitions: Vec<Vec<Transition>> = vec![vec![step], vec![]];
        let borrowed: Vec<&[Transition]> = transitions.iter().map(|t| t.as_slice()).collect();
        let successors = region.discrete_successors(&borrowed, &clock_maps, &location_maps);

        assert_eq!(successors.len(), 1);
        let next = &successors[0];
        assert_eq!(next.network_variables()["n"], 7);
        assert_eq!(next.regions()[0].location(), 1);
        // component 0's only clock was reset: its ordering entries vanish, component 1 keeps its
        assert_eq!(next.clock_ordering().len(), 1);
        assert!(!next.clock_ordering()[0].contains_key(&0));
        assert!(next.clock_ordering()[0].contains_key(&1));
        assert!(next.class_a_or_c().contains(&0));
    }

    #[test]
    fn sync_pair_fires_output_side_first() {
        let (clock_maps, location_maps) = maps(&[&["x"], &["y"]], &["p", "q"]);
        let region = two_component_initial();

        // the output side writes n = 3; the input side's guard reads it
        let sender = Transition::new("p", Action::output("ch"), vec![], vec![], "q")
            .with_assignments(vec![tarzan_core::Assignment::new("n", tarzan_core::IntExpr::Const(3))]);
        let receiver = Transition::new(
            "p",
            Action::input("ch"),
            vec![Constraint::new("n", ComparisonOp::Eq, 3)],
            vec!["y"],
            "q",
        );

        let transitions: Vec<Vec<Transition>> = vec![vec![sender], vec![receiver]];
        let borrowed: Vec<&[Transition]> = transitions.iter().map(|t| t.as_slice()).collect();
        let successors = region.discrete_successors(&borrowed, &clock_maps, &location_maps);

        assert_eq!(successors.len(), 1);
        let next = &successors[0];
        assert_eq!(next.network_variables()["n"], 3);
        assert_eq!(next.regions()[0].location(), 1);
        assert_eq!(next.regions()[1].location(), 1);
    }

    #[test]
    fn unmatched_output_never_fires() {
        let (clock_maps, location_maps) = maps(&[&["x"], &["y"]], &["p", "q"]);
        let region = two_component_initial();

        let sender = Transition::new("p", Action::output("ch"), vec![], vec![], "q");
        let other = Transition::new("p", Action::input("other"), vec![], vec![], "q");

        let transitions: Vec<Vec<Transition>> = vec![vec![sender], vec![other]];
        let borrowed: Vec<&[Transition]> = transitions.iter().map(|t| t.as_slice()).collect();
        assert!(region.discrete_successors(&borrowed, &clock_maps, &location_maps).is_empty());
    }

    #[test]
    fn canonical_form_sorts_group_members_and_is_idempotent() {
        let ahead = Region::initial(1, 3, VariableStore::new());
        let behind = Region::initial(1, 1, VariableStore::new());
        let fixed = Region::initial(1, 9, VariableStore::new());

        let region = NetworkRegion::new(vec![ahead, behind, fixed], false, VariableStore::new())
            .with_goal(vec![Some(3), None, None], vec![Vec::new(); 3]);
        let groups = vec![vec![0, 1]];

        let canonical = region.canonical_form(&groups);
        assert_eq!(canonical.regions()[0].location(), 1);
        assert_eq!(canonical.regions()[1].location(), 3);
        assert_eq!(canonical.regions()[2].location(), 9, "components outside groups stay put");
        // the goal slot follows its component
        assert_eq!(canonical.goal_locations(), &[None, Some(3), None]);

        assert_eq!(canonical.canonical_form(&groups), canonical);
    }

    #[test]
    fn canonical_form_remaps_class_and_ordering_keys() {
        let mut fast = Region::initial(1, 2, VariableStore::new());
        let slow = Region::initial(1, 0, VariableStore::new());
        fast.set_location(2);

        let mut region = NetworkRegion::new(vec![fast, slow], false, VariableStore::new());
        region.class_a_or_c.insert(0);
        region
            .clock_ordering
            .push_back(BTreeMap::from([(0, ClockSet::from_indices(1, &[0]))]));

        let canonical = region.canonical_form(&[vec![0, 1]]);
        // component 0 (location 2) sorts after component 1 (location 0) and moves to slot 1
        assert_eq!(canonical.regions()[0].location(), 0);
        assert_eq!(canonical.regions()[1].location(), 2);
        assert!(canonical.class_a_or_c().contains(&1));
        assert!(!canonical.class_a_or_c().contains(&0));
        assert!(canonical.clock_ordering()[0].contains_key(&1));
        assert!(!canonical.clock_ordering()[0].contains_key(&0));
    }
}
