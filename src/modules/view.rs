use serde::{Deserialize, Serialize};

use crate::modules::animal::{AgentId, Sex, Species};
use crate::modules::world::World;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupantView {
    pub id: AgentId,
    pub species: Species,
    pub sex: Sex,
    pub speed: u32,
    pub pregnant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub x: i32,
    pub y: i32,
    pub rock: bool,
    pub grass: bool,
    pub occupant: Option<OccupantView>,
}

/// Read-only copy of the grid, row-major from `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub tick: u64,
    pub dimension: usize,
    pub tiles: Vec<TileView>,
}

impl GridSnapshot {
    pub(crate) fn capture(world: &World) -> Self {
        let tiles = world
            .tiles()
            .iter()
            .map(|tile| {
                let position = tile.position();
                let occupant = tile
                    .occupant()
                    .and_then(|id| world.animal(id))
                    .map(|animal| OccupantView {
                        id: animal.id(),
                        species: animal.species(),
                        sex: animal.sex(),
                        speed: animal.speed(),
                        pregnant: animal.is_pregnant(),
                    });
                TileView {
                    x: position.x,
                    y: position.y,
                    rock: tile.is_rock(),
                    grass: tile.has_grass(),
                    occupant,
                }
            })
            .collect();

        Self {
            tick: world.tick_count(),
            dimension: world.dimension(),
            tiles,
        }
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&TileView> {
        if x < 0 || y < 0 || x as usize >= self.dimension || y as usize >= self.dimension {
            return None;
        }
        self.tiles.get(y as usize * self.dimension + x as usize)
    }

    /// One character per tile: `#` rock, `M`/`O` animals, `"` grass, `.` bare.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.tiles.len() + self.dimension);
        for row in self.tiles.chunks(self.dimension.max(1)) {
            for tile in row {
                let glyph = match (&tile.occupant, tile.rock, tile.grass) {
                    (_, true, _) => '#',
                    (Some(o), _, _) if o.species == Species::Mouse => 'M',
                    (Some(_), _, _) => 'O',
                    (None, _, true) => '"',
                    (None, _, false) => '.',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}
