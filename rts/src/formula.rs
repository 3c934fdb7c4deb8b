use std::collections::{BTreeMap, HashSet};

use tarzan_core::{Formula, PureFormula};

use crate::{Region, Rts, RtsError, region::regions_satisfying};

// FORMULA-TO-REGION EXTRACTION
// ================================================================================================

impl Rts {
    /// Extracts the start sets for backward verification from a CLTLoc-style formula.
    ///
    /// Each pure subformula contributes one region set: all regions satisfying its location
    /// membership and clock constraints. A unary formula yields its child's set; `left U right`
    /// yields two sets, left first. Only depth-one nesting is admissible.
    ///
    /// # Errors
    /// Returns [`RtsError::NestedFormula`] when a temporal operator occurs under another one,
    /// and [`RtsError::UnknownLocation`] when a pure subformula names a location the model does
    /// not have.
    pub fn regions_from_formula(&self, formula: &Formula) -> Result<Vec<HashSet<Region>>, RtsError> {
        let mut sets = Vec::new();
        self.collect_formula_regions(formula, 0, &mut sets)?;
        Ok(sets)
    }

    fn collect_formula_regions(
        &self,
        formula: &Formula,
        depth: u32,
        sets: &mut Vec<HashSet<Region>>,
    ) -> Result<(), RtsError> {
        match formula {
            Formula::Pure(pure) => {
                sets.push(self.regions_from_pure(pure)?);
                Ok(())
            },
            Formula::Unary { inner, .. } => {
                if depth >= 1 {
                    return Err(RtsError::NestedFormula);
                }
                self.collect_formula_regions(inner, depth + 1, sets)
            },
            Formula::Binary { left, right, .. } => {
                if depth >= 1 {
                    return Err(RtsError::NestedFormula);
                }
                self.collect_formula_regions(left, depth + 1, sets)?;
                self.collect_formula_regions(right, depth + 1, sets)
            },
        }
    }

    /// Extends `set_g` with every discrete predecessor from which the set cannot be escaped:
    /// a predecessor qualifies when, for at least one of its action labels, every outgoing
    /// transition carrying that label leads back into `set_g`.
    ///
    /// This is the controllable-predecessor step used when solving safety objectives over
    /// arenas: picking such a label keeps the play inside the set no matter which same-labelled
    /// edge the opponent resolves. `seeds` is the work list to start from, normally the regions
    /// already in `set_g`; newly admitted regions are processed in turn until a fixed point.
    pub fn omega_filter(&self, set_g: &mut HashSet<Region>, seeds: Vec<Region>) {
        let mut to_process = seeds;
        let mut index = 0;

        while index < to_process.len() {
            let current = to_process[index].clone();
            index += 1;

            let incoming = &self.in_transitions()[current.location()];
            let candidates = current.discrete_predecessors(
                incoming,
                self.clock_indices(),
                self.location_indices(),
                self.max_constants(),
            );

            for candidate in candidates {
                if set_g.contains(&candidate) {
                    continue;
                }

                let outgoing = &self.out_transitions()[candidate.location()];
                let mut labels: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
                for (position, transition) in outgoing.iter().enumerate() {
                    labels.entry(transition.action.name.as_str()).or_default().push(position);
                }

                // one label whose every edge stays inside the set is enough
                let is_valid = labels.values().any(|positions| {
                    positions.iter().all(|&position| {
                        candidate
                            .discrete_successors(
                                std::slice::from_ref(&outgoing[position]),
                                self.clock_indices(),
                                self.location_indices(),
                            )
                            .iter()
                            .any(|successor| set_g.contains(successor))
                    })
                });

                if is_valid {
                    set_g.insert(candidate.clone());
                    to_process.push(candidate);
                }
            }
        }
    }

    fn regions_from_pure(&self, pure: &PureFormula) -> Result<HashSet<Region>, RtsError> {
        let locations = pure
            .locations
            .iter()
            .map(|name| {
                self.location_indices()
                    .get(name)
                    .copied()
                    .ok_or_else(|| RtsError::UnknownLocation(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let variables = self
            .initial_regions()
            .first()
            .map(|region| region.variables().clone())
            .unwrap_or_default();

        Ok(regions_satisfying(
            &locations,
            &pure.constraints,
            self.clock_indices(),
            self.max_constants(),
            &variables,
        ))
    }
}

// TESTS
// ================================================================================================
