use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::modules::animal::{AgentId, Animal, DeathReason, Limits, Parents, Sex, Species};
use crate::modules::config::{ConfigError, SimConfig};
use crate::modules::rng::SimRng;
use crate::modules::tick::Event;
use crate::modules::tile::{Position, Tile};
use crate::modules::view::GridSnapshot;

/// North, east, south, west and "stay in place".
pub const NEIGHBOR_OFFSETS: [(i32, i32); 5] = [(0, 1), (1, 0), (0, -1), (-1, 0), (0, 0)];

/// What a neighbor scan is looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileQuery {
    Empty,
    Mouse,
    Owl,
    MaleMouse,
    MaleOwl,
    /// Grass that the asking agent can step onto (empty or its own tile).
    Grass,
    /// Empty or already held by the asking agent.
    Open,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),
    #[error("position {0} is rock")]
    Rock(Position),
    #[error("position {position} is already occupied by agent {by}")]
    Occupied { position: Position, by: AgentId },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("agent {0} is registered but has no record")]
    MissingAnimal(AgentId),
    #[error("agent {0} is listed in the wrong registry")]
    WrongRegistry(AgentId),
    #[error("registries list {registered} agents but {stored} are stored")]
    RegistryMismatch { registered: usize, stored: usize },
    #[error("agent {agent_id} at {position} is not referenced by its tile")]
    NotOnTile { agent_id: AgentId, position: Position },
    #[error("tile {position} references agent {agent_id} stored elsewhere")]
    StaleTile { agent_id: AgentId, position: Position },
    #[error("tile {0} is rock but has grass or an occupant")]
    BlockedRock(Position),
}

#[derive(Debug)]
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) dimension: i32,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) animals: HashMap<AgentId, Animal>,
    pub(crate) mice: Vec<AgentId>,
    pub(crate) owls: Vec<AgentId>,
    pub(crate) tick: u64,
    pub(crate) next_agent_id: AgentId,
    pub(crate) rng: SimRng,
    pub(crate) events: Vec<Event>,
}

impl World {
    /// Builds a populated world. The config is validated first; nothing is
    /// constructed when it is rejected.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let mut world = Self::blank(config)?;
        world.seed_population();
        world.seed_terrain();
        world.events.clear();

        info!(
            dimension = world.dimension,
            mice = world.mice.len(),
            owls = world.owls.len(),
            seed = ?world.config.seed,
            "world constructed"
        );
        Ok(world)
    }

    /// Builds the terrain (rock and grass) without any animals. Population
    /// counts in the config are ignored; use [`World::place`] to add agents.
    pub fn empty(config: SimConfig) -> Result<Self, ConfigError> {
        let mut world = Self::blank(config)?;
        world.seed_terrain();
        Ok(world)
    }

    fn blank(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = SimRng::new(config.seed);
        let dimension = config.dimension as i32;

        let mut tiles = Vec::with_capacity(config.capacity());
        for y in 0..dimension {
            for x in 0..dimension {
                let regrowth = if config.start_mid_simulation {
                    rng.up_to(config.grass_regrowth)
                } else {
                    0
                };
                tiles.push(Tile::new(Position::new(x, y), regrowth));
            }
        }

        Ok(Self {
            config,
            dimension,
            tiles,
            animals: HashMap::new(),
            mice: Vec::new(),
            owls: Vec::new(),
            tick: 0,
            next_agent_id: 1,
            rng,
            events: Vec::new(),
        })
    }

    fn seed_population(&mut self) {
        let mut spots: Vec<Position> = (0..self.dimension)
            .flat_map(|x| (0..self.dimension).map(move |y| Position::new(x, y)))
            .collect();
        self.rng.shuffle(&mut spots);

        let mice = self.config.mice.count;
        let owls = self.config.owls.count;
        let mut spots = spots.into_iter();
        for (species, count) in [(Species::Mouse, mice), (Species::Owl, owls)] {
            for position in spots.by_ref().take(count) {
                let id = self.spawn(species, position, None);
                if self.config.start_mid_simulation {
                    let threshold = self.limits_for(species).hunger_threshold;
                    if threshold != 0 {
                        let hunger = self.rng.up_to(threshold - 1);
                        self.animal_mut(id).time_since_fed = hunger;
                    }
                }
            }
        }
    }

    fn seed_terrain(&mut self) {
        let rock_density = self.config.rock_density as u32;
        let threshold = self.config.grass_regrowth;
        let mid_simulation = self.config.start_mid_simulation;

        for tile in &mut self.tiles {
            if !tile.is_empty() {
                continue;
            }
            if self.rng.percent() <= rock_density {
                tile.make_rock();
            } else if mid_simulation {
                tile.set_grass(tile.regrowth() == threshold);
            } else {
                tile.set_grass(true);
            }
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.dimension as usize
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn animal(&self, id: AgentId) -> Option<&Animal> {
        self.animals.get(&id)
    }

    /// Live mice in registration order.
    pub fn mice(&self) -> &[AgentId] {
        &self.mice
    }

    /// Live owls in registration order.
    pub fn owls(&self) -> &[AgentId] {
        &self.owls
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Events recorded during the most recent tick.
    pub fn last_events(&self) -> &[Event] {
        &self.events
    }

    pub fn snapshot_grid(&self) -> GridSnapshot {
        GridSnapshot::capture(self)
    }

    pub fn is_legal(&self, position: Position) -> bool {
        (0..self.dimension).contains(&position.x) && (0..self.dimension).contains(&position.y)
    }

    fn index(&self, position: Position) -> Option<usize> {
        if !self.is_legal(position) {
            return None;
        }
        Some(position.y as usize * self.dimension as usize + position.x as usize)
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.index(position).map(|idx| &self.tiles[idx])
    }

    pub(crate) fn tile_mut(&mut self, position: Position) -> &mut Tile {
        let idx = self
            .index(position)
            .unwrap_or_else(|| panic!("tile {position} is off the grid"));
        &mut self.tiles[idx]
    }

    pub(crate) fn animal_mut(&mut self, id: AgentId) -> &mut Animal {
        self.animals
            .get_mut(&id)
            .unwrap_or_else(|| panic!("agent {id} is not alive"))
    }

    pub(crate) fn limits_for(&self, species: Species) -> Limits {
        match species {
            Species::Mouse => Limits::from(&self.config.mice),
            Species::Owl => Limits::from(&self.config.owls),
        }
    }

    fn registry_mut(&mut self, species: Species) -> &mut Vec<AgentId> {
        match species {
            Species::Mouse => &mut self.mice,
            Species::Owl => &mut self.owls,
        }
    }

    fn occupant_of(&self, tile: &Tile) -> Option<&Animal> {
        tile.occupant().and_then(|id| self.animals.get(&id))
    }

    /// Legal, non-rock tiles around `center` (including `center`) in a
    /// freshly shuffled order. Taking the first match of a later filter is
    /// the tie-break for every choice between equally good tiles.
    pub(crate) fn neighborhood(&mut self, center: Position) -> Vec<Position> {
        let mut offsets = NEIGHBOR_OFFSETS;
        self.rng.shuffle(&mut offsets);
        offsets
            .into_iter()
            .map(|offset| center.offset(offset))
            .filter(|pos| self.tile(*pos).is_some_and(|tile| !tile.is_rock()))
            .collect()
    }

    /// Keeps the tiles of `hood` that satisfy `query` from the point of view
    /// of `agent_id`, preserving order.
    pub(crate) fn select(
        &self,
        hood: &[Position],
        agent_id: AgentId,
        query: TileQuery,
    ) -> Vec<Position> {
        hood.iter()
            .copied()
            .filter(|pos| {
                self.tile(*pos)
                    .is_some_and(|tile| self.tile_matches(tile, agent_id, query))
            })
            .collect()
    }

    fn tile_matches(&self, tile: &Tile, agent_id: AgentId, query: TileQuery) -> bool {
        let occupant = self.occupant_of(tile);
        let is = |species: Species, male_only: bool| {
            occupant.is_some_and(|a| {
                a.species() == species && (!male_only || a.sex() == Sex::Male)
            })
        };
        match query {
            TileQuery::Empty => tile.is_empty(),
            TileQuery::Mouse => is(Species::Mouse, false),
            TileQuery::Owl => is(Species::Owl, false),
            TileQuery::MaleMouse => is(Species::Mouse, true),
            TileQuery::MaleOwl => is(Species::Owl, true),
            TileQuery::Grass => tile.has_grass() && tile.is_open_for(agent_id),
            TileQuery::Open => tile.is_open_for(agent_id),
        }
    }

    /// Scans the agent's neighborhood and returns matching tiles in
    /// tie-break order. An unknown agent yields no tiles.
    pub fn neighbors_matching(&mut self, agent_id: AgentId, query: TileQuery) -> Vec<Position> {
        let Some(position) = self.animal(agent_id).map(Animal::position) else {
            return Vec::new();
        };
        let hood = self.neighborhood(position);
        self.select(&hood, agent_id, query)
    }

    /// Moves an agent onto `dest`. A mouse landing on grass eats it.
    ///
    /// Panics if `dest` is rock or held by another agent.
    pub(crate) fn move_animal(&mut self, agent_id: AgentId, dest: Position) {
        let (from, species) = {
            let animal = self.animal_mut(agent_id);
            (animal.position, animal.species)
        };
        {
            let tile = self
                .tile(dest)
                .unwrap_or_else(|| panic!("agent {agent_id} cannot move off the grid"));
            assert!(
                !tile.is_rock(),
                "agent {agent_id} cannot move onto rock at {dest}"
            );
            assert!(
                tile.is_open_for(agent_id),
                "agent {agent_id} cannot move onto {dest} held by {:?}",
                tile.occupant()
            );
        }

        self.clear(agent_id);
        self.animal_mut(agent_id).position = dest;
        let tile = self.tile_mut(dest);
        tile.set_occupant(Some(agent_id));
        let ate = species == Species::Mouse && tile.crop();

        if from != dest {
            trace!(agent_id, ?from, to = ?dest, "moved");
            self.events.push(Event::Moved {
                agent_id,
                from,
                to: dest,
            });
        }
        if ate {
            self.animal_mut(agent_id).feed();
            self.events.push(Event::GrassEaten {
                agent_id,
                position: dest,
            });
        }
    }

    /// Takes an agent off its tile without placing it anywhere else.
    pub(crate) fn clear(&mut self, agent_id: AgentId) {
        let Some(position) = self.animal(agent_id).map(Animal::position) else {
            return;
        };
        let tile = self.tile_mut(position);
        if tile.occupant() == Some(agent_id) {
            tile.set_occupant(None);
        }
    }

    /// Creates and registers an animal on an empty tile. The tile's grass is
    /// trampled. Panics if the tile is rock or occupied.
    pub(crate) fn spawn(
        &mut self,
        species: Species,
        position: Position,
        parents: Option<&Parents>,
    ) -> AgentId {
        {
            let tile = self
                .tile(position)
                .unwrap_or_else(|| panic!("cannot spawn {species} off the grid at {position}"));
            assert!(
                !tile.is_rock() && tile.is_empty(),
                "cannot spawn {species} into blocked tile {position}"
            );
        }

        let id = self.next_agent_id;
        self.next_agent_id += 1;
        let limits = self.limits_for(species);
        let inheritance = self.config.inheritance;
        let animal = Animal::born(
            id,
            species,
            position,
            limits,
            parents,
            &inheritance,
            &mut self.rng,
        );

        let tile = self.tile_mut(position);
        tile.set_occupant(Some(id));
        tile.crop();
        self.registry_mut(species).push(id);

        if let Some(parents) = parents {
            debug!(
                child = id,
                %species,
                mother = parents.mother,
                father = parents.father,
                speed = animal.speed,
                "born"
            );
            self.events.push(Event::Born {
                species,
                child: id,
                mother: parents.mother,
                father: parents.father,
            });
        }
        self.animals.insert(id, animal);
        id
    }

    /// Removes an agent from its tile and registry immediately, so later
    /// scans in the same tick no longer see it. Returns false if it was
    /// already gone.
    pub fn kill(&mut self, agent_id: AgentId, reason: DeathReason) -> bool {
        if !self.animals.contains_key(&agent_id) {
            return false;
        }
        self.clear(agent_id);
        let Some(animal) = self.animals.remove(&agent_id) else {
            return false;
        };
        self.registry_mut(animal.species).retain(|id| *id != agent_id);

        debug!(agent_id, species = %animal.species, ?reason, age = animal.age, "died");
        self.events.push(Event::Died {
            agent_id,
            species: animal.species,
            reason,
        });
        true
    }

    /// Puts a new agent on a chosen empty tile, optionally with a fixed
    /// speed. Intended for scenario setup by drivers and tests.
    pub fn place(
        &mut self,
        species: Species,
        position: Position,
        speed: Option<u32>,
    ) -> Result<AgentId, PlacementError> {
        let tile = self
            .tile(position)
            .ok_or(PlacementError::OutOfBounds(position))?;
        if tile.is_rock() {
            return Err(PlacementError::Rock(position));
        }
        if let Some(by) = tile.occupant() {
            return Err(PlacementError::Occupied { position, by });
        }

        let id = self.spawn(species, position, None);
        if let Some(speed) = speed {
            self.set_speed(id, speed);
        }
        Ok(id)
    }

    /// Overrides an agent's speed (minimum 1). Returns false for unknown ids.
    pub fn set_speed(&mut self, agent_id: AgentId, speed: u32) -> bool {
        match self.animals.get_mut(&agent_id) {
            Some(animal) => {
                animal.speed = speed.max(1);
                true
            }
            None => false,
        }
    }

    pub fn set_sex(&mut self, agent_id: AgentId, sex: Sex) -> bool {
        match self.animals.get_mut(&agent_id) {
            Some(animal) => {
                animal.sex = sex;
                true
            }
            None => false,
        }
    }

    /// Sets or clears grass on a non-rock tile. Returns false for rock or
    /// off-grid positions.
    pub fn set_grass(&mut self, position: Position, grass: bool) -> bool {
        match self.tile(position) {
            Some(tile) if !tile.is_rock() => {
                self.tile_mut(position).set_grass(grass);
                true
            }
            _ => false,
        }
    }

    /// Checks that registries, animals and tiles agree with each other.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let registered = self.mice.len() + self.owls.len();
        if registered != self.animals.len() {
            return Err(InvariantViolation::RegistryMismatch {
                registered,
                stored: self.animals.len(),
            });
        }

        for (registry, species) in [(&self.mice, Species::Mouse), (&self.owls, Species::Owl)] {
            for id in registry {
                let animal = self
                    .animals
                    .get(id)
                    .ok_or(InvariantViolation::MissingAnimal(*id))?;
                if animal.species != species {
                    return Err(InvariantViolation::WrongRegistry(*id));
                }
                let on_tile = self
                    .tile(animal.position)
                    .is_some_and(|tile| tile.occupant() == Some(*id));
                if !on_tile {
                    return Err(InvariantViolation::NotOnTile {
                        agent_id: *id,
                        position: animal.position,
                    });
                }
            }
        }

        for tile in &self.tiles {
            if tile.is_rock() && (tile.has_grass() || !tile.is_empty()) {
                return Err(InvariantViolation::BlockedRock(tile.position()));
            }
            if let Some(agent_id) = tile.occupant() {
                let consistent = self
                    .animals
                    .get(&agent_id)
                    .is_some_and(|a| a.position == tile.position());
                if !consistent {
                    return Err(InvariantViolation::StaleTile {
                        agent_id,
                        position: tile.position(),
                    });
                }
            }
        }

        Ok(())
    }
}
