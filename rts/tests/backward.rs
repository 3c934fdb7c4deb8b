//! Backward reachability and the crossing-order refinement.
//!
//! Backward analysis distinguishes regions by the order in which their clocks exceeded the max
//! constants. On a delay-only automaton the forward run is deterministic, so exactly one
//! crossing order is realizable and every other ordering claim must fail to reach an initial
//! region.

use std::collections::VecDeque;

use tarzan_core::{
    Action, ComparisonOp, Constraint, Location, TimedAutomaton, Transition, VariableStore,
};
use tarzan_rts::{ClockSet, Goal, Region, Rts, Strategy};

/// Two clocks that only ever drift: `a` crosses its max constant (1) strictly before `b`
/// crosses its own (2). No transition resets anything.
fn drift() -> TimedAutomaton {
    TimedAutomaton {
        name: "drift".to_string(),
        clocks: vec!["a".to_string(), "b".to_string()],
        actions: vec![Action::internal("observe")],
        locations: vec![Location::initial("run"), Location::new("seen")],
        transitions: vec![Transition::new(
            "run",
            Action::internal("observe"),
            vec![
                Constraint::new("a", ComparisonOp::Gt, 1),
                Constraint::new("b", ComparisonOp::Gt, 2),
            ],
            vec![],
            "seen",
        )],
        ..Default::default()
    }
}

fn drift_region(unbounded: Vec<ClockSet>, h: Vec<u32>) -> Region {
    Region::from_parts(
        0,
        h,
        VecDeque::from(unbounded),
        ClockSet::empty(2),
        VecDeque::new(),
        VariableStore::new(),
    )
}

#[test]
fn realizable_crossing_order_returns_to_initial() {
    let rts = Rts::new(&drift()).unwrap();

    // a (max 1) crossed first, then b (max 2): front = most recent = {b}
    let region = drift_region(
        vec![ClockSet::from_indices(2, &[1]), ClockSet::from_indices(2, &[0])],
        vec![2, 3],
    );

    let report = rts.backward_reachability(&[region], Strategy::Dfs);
    let initial = report.witness.expect("the only forward crossing order is a before b");
    assert!(initial.is_initial_valuation());
}

#[test]
fn inverted_crossing_order_is_unrealizable() {
    let rts = Rts::new(&drift()).unwrap();

    // the claim that a crossed after b contradicts the deterministic drift
    let region = drift_region(
        vec![ClockSet::from_indices(2, &[0]), ClockSet::from_indices(2, &[1])],
        vec![2, 3],
    );

    let report = rts.backward_reachability(&[region], Strategy::Dfs);
    assert!(!report.is_reachable());
    assert!(report.regions_computed > 0, "the search explores before concluding");
}

#[test]
fn simultaneous_crossing_claim_is_unrealizable() {
    let rts = Rts::new(&drift()).unwrap();

    // a and b in one group would have crossed together, impossible with distinct max constants
    // and no resets
    let region = drift_region(vec![ClockSet::from_indices(2, &[0, 1])], vec![2, 3]);

    let report = rts.backward_reachability(&[region], Strategy::Dfs);
    assert!(!report.is_reachable());
}

#[test]
fn forward_witness_set_and_backward_agree() {
    // the accept set reached forward equals the set from which backward returns to the start
    let rts = Rts::new(&drift()).unwrap();
    let goal = Goal::Location(1);

    let forward = rts.forward_reachability(&goal, Strategy::Bfs);
    let witness = forward.witness.expect("both clocks eventually exceed their constants");

    let backward = rts.backward_reachability(&[witness], Strategy::Bfs);
    assert!(backward.is_reachable());
}

#[test]
fn unknown_location_finds_no_initial_region() {
    let rts = Rts::new(&drift()).unwrap();
    let region = Region::initial(2, 17, VariableStore::new());

    // an initial valuation at a location outside the automaton is not an initial region
    let report = rts.backward_reachability(&[region], Strategy::Dfs);
    assert!(!report.is_reachable());

    // and a non-initial valuation there cannot step anywhere either
    let mut stuck =
        drift_region(vec![ClockSet::from_indices(2, &[0]), ClockSet::from_indices(2, &[1])], vec![2, 3]);
    stuck.set_location(17);
    assert!(!rts.backward_reachability(&[stuck], Strategy::Dfs).is_reachable());
}

#[test]
fn formula_regions_seed_backward_verification() {
    // `<> seen`: the pure subformula's region set is the start set for backward search, and at
    // least one of its regions descends from an initial region
    let rts = Rts::new(&drift()).unwrap();
    let formula = tarzan_core::Formula::diamond(tarzan_core::Formula::Pure(tarzan_core::PureFormula {
        locations: vec!["seen".to_string()],
        constraints: vec![],
    }));

    let sets = rts.regions_from_formula(&formula).unwrap();
    assert_eq!(sets.len(), 1);
    let starting: Vec<Region> = sets[0].iter().cloned().collect();
    assert!(!starting.is_empty());

    let report = rts.backward_reachability(&starting, Strategy::Bfs);
    assert!(report.is_reachable(), "some region satisfying the formula is reachable");
}

#[test]
fn three_clock_crossing_chain_reverses() {
    // x1 (max 1) crosses, then x2 (max 2), while x3 (max 3) is still bounded: the shape used by
    // flat mutual-exclusion benchmarks when stating backward start regions
    let ta = TimedAutomaton {
        name: "chain".to_string(),
        clocks: vec!["x1".to_string(), "x2".to_string(), "x3".to_string()],
        actions: vec![Action::internal("probe")],
        locations: vec![Location::initial("s0"), Location::new("s1")],
        transitions: vec![Transition::new(
            "s0",
            Action::internal("probe"),
            vec![
                Constraint::new("x1", ComparisonOp::Gt, 1),
                Constraint::new("x2", ComparisonOp::Gt, 2),
                Constraint::new("x3", ComparisonOp::Eq, 3),
            ],
            vec![],
            "s1",
        )],
        ..Default::default()
    };
    let rts = Rts::new(&ta).unwrap();

    let region = Region::from_parts(
        0,
        vec![2, 3, 3],
        VecDeque::from(vec![ClockSet::from_indices(3, &[1]), ClockSet::from_indices(3, &[0])]),
        ClockSet::empty(3),
        VecDeque::from(vec![ClockSet::from_indices(3, &[2])]),
        VariableStore::new(),
    );

    let report = rts.backward_reachability(&[region], Strategy::Dfs);
    let initial = report.witness.expect("the pure delay history reverses step by step");
    assert!(initial.is_initial_valuation());
    assert_eq!(initial.location(), 0);
}
