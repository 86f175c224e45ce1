use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::animal::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, (dx, dy): (i32, i32)) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single grid cell.
///
/// Rock is fixed at construction and excludes both grass and occupants. The
/// occupant is only a handle; the world owns the animal itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    position: Position,
    rock: bool,
    grass: bool,
    regrowth: u32,
    occupant: Option<AgentId>,
}

impl Tile {
    pub(crate) fn new(position: Position, regrowth: u32) -> Self {
        Self {
            position,
            rock: false,
            grass: false,
            regrowth,
            occupant: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_rock(&self) -> bool {
        self.rock
    }

    pub fn has_grass(&self) -> bool {
        self.grass
    }

    /// Ticks since the grass here was last eaten.
    pub fn regrowth(&self) -> u32 {
        self.regrowth
    }

    pub fn occupant(&self) -> Option<AgentId> {
        self.occupant
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// Empty or already held by `agent_id`.
    pub fn is_open_for(&self, agent_id: AgentId) -> bool {
        match self.occupant {
            None => true,
            Some(id) => id == agent_id,
        }
    }

    pub(crate) fn make_rock(&mut self) {
        assert!(
            self.occupant.is_none(),
            "cannot turn occupied tile {} into rock",
            self.position
        );
        self.rock = true;
        self.grass = false;
    }

    pub(crate) fn set_grass(&mut self, grass: bool) {
        self.grass = grass && !self.rock;
    }

    pub(crate) fn set_occupant(&mut self, occupant: Option<AgentId>) {
        self.occupant = occupant;
    }

    /// Clears the grass and restarts the regrowth clock. Returns whether
    /// there was anything to clear.
    pub(crate) fn crop(&mut self) -> bool {
        let had_grass = self.grass;
        self.grass = false;
        self.regrowth = 0;
        had_grass
    }

    /// Advances the regrowth clock; grass reappears once the clock passes
    /// `threshold`. The clock keeps running until the grass is eaten again.
    pub(crate) fn grow(&mut self, threshold: u32) {
        if self.rock {
            return;
        }
        self.regrowth = self.regrowth.saturating_add(1);
        if self.regrowth > threshold {
            self.grass = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grass_regrows_after_threshold() {
        let mut tile = Tile::new(Position::new(0, 0), 0);
        for _ in 0..3 {
            tile.grow(3);
            assert!(!tile.has_grass());
        }
        tile.grow(3);
        assert!(tile.has_grass());
        assert_eq!(tile.regrowth(), 4);

        tile.grow(3);
        assert_eq!(tile.regrowth(), 5, "clock keeps running until eaten");

        assert!(tile.crop());
        assert!(!tile.has_grass());
        assert_eq!(tile.regrowth(), 0);
        assert!(!tile.crop());
    }

    #[test]
    fn rock_never_bears_grass() {
        let mut tile = Tile::new(Position::new(1, 1), 0);
        tile.set_grass(true);
        tile.make_rock();
        assert!(tile.is_rock());
        assert!(!tile.has_grass());

        for _ in 0..10 {
            tile.grow(0);
        }
        tile.set_grass(true);
        assert!(!tile.has_grass());
        assert_eq!(tile.regrowth(), 0);
    }

    #[test]
    fn open_for_self_or_empty() {
        let mut tile = Tile::new(Position::new(2, 3), 0);
        assert!(tile.is_open_for(7));
        tile.set_occupant(Some(7));
        assert!(tile.is_open_for(7));
        assert!(!tile.is_open_for(8));
        assert!(!tile.is_empty());
    }
}
