use std::collections::BTreeMap;

use crate::{ModelError, TimedAutomaton};

// TIMED ARENA
// ================================================================================================

/// A two-player timed arena: a timed automaton whose locations are owned by players.
///
/// The arena carries the full automaton surface; the kernel treats it identically except for the
/// location-to-player table, which game-solving front-ends consult.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimedArena {
    pub automaton: TimedAutomaton,
    /// Location name paired with the owning player's tag.
    pub players: Vec<(String, char)>,
}

impl TimedArena {
    /// Checks referential integrity of the arena.
    ///
    /// # Errors
    /// Returns an error if the underlying automaton is malformed or a player entry names an
    /// unknown location.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.automaton.validate()?;
        let locations = self.automaton.location_indices();
        for (location, _) in &self.players {
            if !locations.contains_key(location) {
                return Err(ModelError::UnknownLocation(location.clone()));
            }
        }
        Ok(())
    }

    /// Maps location indices to player tags. Locations without an entry are unowned.
    pub fn players_by_location(&self, locations: &BTreeMap<String, usize>) -> BTreeMap<usize, char> {
        self.players.iter().map(|(name, player)| (locations[name], *player)).collect()
    }
}
