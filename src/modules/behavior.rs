use tracing::{debug, trace};

use crate::modules::animal::{AgentId, DeathReason, Species};
use crate::modules::config::PredationMode;
use crate::modules::tick::Event;
use crate::modules::tile::Position;
use crate::modules::world::{TileQuery, World};

/// What an animal settled on for its turn, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Flee(Position),
    GiveBirth(Position),
    Hunt(Position),
    Graze(Position),
    Wander(Position),
    Stay,
}

impl Decision {
    pub const fn label(&self) -> &'static str {
        match self {
            Decision::Flee(_) => "flee",
            Decision::GiveBirth(_) => "give_birth",
            Decision::Hunt(_) => "hunt",
            Decision::Graze(_) => "graze",
            Decision::Wander(_) => "wander",
            Decision::Stay => "stay",
        }
    }
}

/// Percent chance that an owl of `owl_speed` catches prey of `prey_speed`
/// outright.
///
/// Deterministic mode is a plain speed comparison. Probabilistic mode rolls
/// against `round(100 * owl / prey)` percent, capped at 100.
pub fn catch_chance(mode: PredationMode, owl_speed: u32, prey_speed: u32) -> u32 {
    match mode {
        PredationMode::Deterministic => {
            if prey_speed <= owl_speed {
                100
            } else {
                0
            }
        }
        PredationMode::Probabilistic => {
            let ratio = 100.0 * owl_speed as f64 / prey_speed.max(1) as f64;
            (ratio.round() as u32).min(100)
        }
    }
}

impl World {
    /// Shared turn prologue. Returns the agent's position if it lives to act
    /// this turn, after its clocks have advanced.
    fn begin_turn(&mut self, agent_id: AgentId) -> Option<Position> {
        let animal = self.animals.get(&agent_id)?;
        if animal.has_moved {
            return None;
        }
        if let Some(reason) = animal.natural_death() {
            self.kill(agent_id, reason);
            return None;
        }
        let animal = self.animal_mut(agent_id);
        animal.advance_clocks();
        Some(animal.position)
    }

    fn end_turn(&mut self, agent_id: AgentId, decision: Decision) {
        trace!(agent_id, decision = decision.label(), "turn");
        if let Some(animal) = self.animals.get_mut(&agent_id) {
            animal.has_moved = true;
        }
    }

    /// A mouse's full turn: flee, give birth, graze, then wander.
    /// Does nothing if the mouse is gone or has already acted this tick.
    pub(crate) fn mouse_turn(&mut self, mouse_id: AgentId) {
        let Some(position) = self.begin_turn(mouse_id) else {
            return;
        };
        let decision = self.decide_mouse(mouse_id, position);
        match decision {
            Decision::Flee(dest) | Decision::Graze(dest) | Decision::Wander(dest) => {
                self.move_animal(mouse_id, dest);
            }
            Decision::GiveBirth(dest) => self.give_birth(mouse_id, dest),
            Decision::Hunt(_) | Decision::Stay => {}
        }
        self.end_turn(mouse_id, decision);
    }

    fn decide_mouse(&mut self, mouse_id: AgentId, position: Position) -> Decision {
        let hood = self.neighborhood(position);
        let empty = self.select(&hood, mouse_id, TileQuery::Empty);

        let threatened = !self.select(&hood, mouse_id, TileQuery::Owl).is_empty();
        if threatened {
            if let Some(&dest) = empty.first() {
                return Decision::Flee(dest);
            }
        }

        let ready = self
            .animal(mouse_id)
            .is_some_and(|mouse| mouse.ready_to_give_birth());
        if ready {
            if let Some(&dest) = empty.first() {
                return Decision::GiveBirth(dest);
            }
        }

        if let Some(&dest) = self.select(&hood, mouse_id, TileQuery::Grass).first() {
            return Decision::Graze(dest);
        }
        match self.select(&hood, mouse_id, TileQuery::Open).first() {
            Some(&dest) => Decision::Wander(dest),
            None => Decision::Stay,
        }
    }

    /// An owl's full turn: give birth, hunt, then wander to an empty tile.
    pub(crate) fn owl_turn(&mut self, owl_id: AgentId) {
        let Some(position) = self.begin_turn(owl_id) else {
            return;
        };
        let decision = self.decide_owl(owl_id, position);
        match decision {
            Decision::GiveBirth(dest) => self.give_birth(owl_id, dest),
            Decision::Hunt(target) => self.hunt(owl_id, target),
            Decision::Wander(dest) => self.move_animal(owl_id, dest),
            Decision::Flee(_) | Decision::Graze(_) | Decision::Stay => {}
        }
        self.end_turn(owl_id, decision);
    }

    fn decide_owl(&mut self, owl_id: AgentId, position: Position) -> Decision {
        let hood = self.neighborhood(position);

        let ready = self
            .animal(owl_id)
            .is_some_and(|owl| owl.ready_to_give_birth());
        if ready {
            if let Some(&dest) = self.select(&hood, owl_id, TileQuery::Empty).first() {
                return Decision::GiveBirth(dest);
            }
        }

        let mut prey = self.select(&hood, owl_id, TileQuery::Mouse);
        if self.config.target_slow_prey {
            // Stable, so equal speeds keep their shuffled order.
            prey.sort_by_key(|pos| self.speed_at(*pos));
        }
        if let Some(&target) = prey.first() {
            return Decision::Hunt(target);
        }

        // Owls only stay put when boxed in.
        match self.select(&hood, owl_id, TileQuery::Empty).first() {
            Some(&dest) => Decision::Wander(dest),
            None => Decision::Stay,
        }
    }

    fn speed_at(&self, position: Position) -> u32 {
        self.tile(position)
            .and_then(|tile| tile.occupant())
            .and_then(|id| self.animal(id))
            .map_or(u32::MAX, |animal| animal.speed)
    }

    /// Resolves an attack on the mouse at `target`. A prey that is not
    /// caught outright gets its own turn first; if it is still on the tile
    /// afterwards it is caught anyway. The owl ends on `target` unless the
    /// tile was somehow taken by another agent.
    fn hunt(&mut self, owl_id: AgentId, target: Position) {
        let Some(prey_id) = self.tile(target).and_then(|tile| tile.occupant()) else {
            return;
        };
        let (owl_speed, prey_speed) = match (self.animal(owl_id), self.animal(prey_id)) {
            (Some(owl), Some(prey)) if prey.species == Species::Mouse => (owl.speed, prey.speed),
            _ => return,
        };

        let chance = catch_chance(self.config.predation, owl_speed, prey_speed);
        let caught_outright = match self.config.predation {
            PredationMode::Deterministic => chance == 100,
            PredationMode::Probabilistic => self.rng.percent() <= chance,
        };

        if caught_outright {
            self.eat(owl_id, prey_id);
        } else {
            self.mouse_turn(prey_id);
            let still_there = self
                .tile(target)
                .is_some_and(|tile| tile.occupant() == Some(prey_id));
            if still_there {
                self.eat(owl_id, prey_id);
            } else if self.animals.contains_key(&prey_id) {
                debug!(owl = owl_id, mouse = prey_id, owl_speed, prey_speed, "prey escaped");
                self.events.push(Event::PreyEscaped {
                    owl: owl_id,
                    mouse: prey_id,
                });
            }
        }

        if self.tile(target).is_some_and(|tile| tile.is_open_for(owl_id)) {
            self.move_animal(owl_id, target);
        }
    }

    fn eat(&mut self, owl_id: AgentId, prey_id: AgentId) {
        if self.kill(prey_id, DeathReason::Predation { by: owl_id }) {
            self.animal_mut(owl_id).feed();
        }
    }

    /// Delivers the mother's litter of one onto `dest`.
    fn give_birth(&mut self, mother_id: AgentId, dest: Position) {
        let Some((species, parents)) = self
            .animals
            .get_mut(&mother_id)
            .and_then(|mother| Some((mother.species, mother.deliver()?)))
        else {
            return;
        };
        self.spawn(species, dest, Some(&parents));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::animal::Sex;
    use crate::modules::config::SimConfig;

    fn scenario(mode: PredationMode) -> World {
        let mut config = SimConfig {
            seed: Some(3),
            dimension: 7,
            start_mid_simulation: false,
            predation: mode,
            ..SimConfig::default()
        };
        config.mice.count = 0;
        config.owls.count = 0;
        config.mice.hunger_threshold = 1_000;
        config.owls.hunger_threshold = 1_000;
        World::empty(config).unwrap()
    }

    #[test]
    fn catch_chance_matches_modes() {
        assert_eq!(catch_chance(PredationMode::Deterministic, 50, 50), 100);
        assert_eq!(catch_chance(PredationMode::Deterministic, 49, 50), 0);
        assert_eq!(catch_chance(PredationMode::Probabilistic, 25, 100), 25);
        assert_eq!(catch_chance(PredationMode::Probabilistic, 100, 30), 100);
        assert_eq!(catch_chance(PredationMode::Probabilistic, 1, 3), 33);
    }

    #[test]
    fn starving_mouse_dies_before_acting() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), None).unwrap();
        world.animal_mut(mouse).time_since_fed = 1_000;

        world.mouse_turn(mouse);

        assert!(world.animal(mouse).is_none());
        assert!(world.last_events().iter().any(|e| matches!(
            e,
            Event::Died {
                reason: DeathReason::Starvation,
                ..
            }
        )));
    }

    #[test]
    fn mouse_flees_adjacent_owl() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), None).unwrap();
        world.place(Species::Owl, Position::new(3, 4), None).unwrap();

        world.mouse_turn(mouse);

        let pos = world.animal(mouse).unwrap().position();
        assert_ne!(pos, Position::new(3, 3));
        assert_ne!(pos, Position::new(3, 4));
        assert!(world.animal(mouse).unwrap().has_moved());
    }

    #[test]
    fn cornered_mouse_stays_put() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(0, 0), None).unwrap();
        world.place(Species::Owl, Position::new(0, 1), None).unwrap();
        world.place(Species::Owl, Position::new(1, 0), None).unwrap();

        world.mouse_turn(mouse);

        assert_eq!(world.animal(mouse).unwrap().position(), Position::new(0, 0));
    }

    #[test]
    fn grazing_mouse_eats() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), None).unwrap();
        world.animal_mut(mouse).time_since_fed = 4;

        world.mouse_turn(mouse);

        let animal = world.animal(mouse).unwrap();
        assert_ne!(animal.position(), Position::new(3, 3));
        assert_eq!(animal.time_since_fed(), 0);
        assert!(!world.tile(animal.position()).unwrap().has_grass());
    }

    #[test]
    fn mouse_acts_once_per_tick() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), None).unwrap();
        world.mouse_turn(mouse);
        let after_first = world.animal(mouse).unwrap().clone();
        world.mouse_turn(mouse);
        assert_eq!(world.animal(mouse).unwrap(), &after_first);
    }

    #[test]
    fn slower_prey_is_eaten() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), Some(25)).unwrap();
        let owl = world.place(Species::Owl, Position::new(3, 4), Some(50)).unwrap();
        world.animal_mut(owl).time_since_fed = 7;

        world.owl_turn(owl);

        assert!(world.animal(mouse).is_none());
        let owl = world.animal(owl).unwrap();
        assert_eq!(owl.position(), Position::new(3, 3));
        assert_eq!(owl.time_since_fed(), 0);
    }

    #[test]
    fn faster_prey_escapes_by_fleeing() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(3, 3), Some(50)).unwrap();
        let owl = world.place(Species::Owl, Position::new(3, 4), Some(25)).unwrap();

        world.owl_turn(owl);

        let prey = world.animal(mouse).unwrap();
        assert!(prey.has_moved());
        assert_ne!(prey.position(), Position::new(3, 3));
        assert_ne!(prey.position(), Position::new(3, 4));
        assert_eq!(world.animal(owl).unwrap().position(), Position::new(3, 3));
        assert!(world
            .last_events()
            .iter()
            .any(|e| matches!(e, Event::PreyEscaped { .. })));
    }

    #[test]
    fn cornered_fast_prey_is_still_caught() {
        let mut world = scenario(PredationMode::Deterministic);
        let mouse = world.place(Species::Mouse, Position::new(0, 0), Some(90)).unwrap();
        let owl = world.place(Species::Owl, Position::new(0, 1), Some(10)).unwrap();
        world.place(Species::Owl, Position::new(1, 0), Some(10)).unwrap();

        world.owl_turn(owl);

        assert!(world.animal(mouse).is_none());
        assert_eq!(world.animal(owl).unwrap().position(), Position::new(0, 0));
    }

    #[test]
    fn idle_owl_always_leaves_its_tile() {
        let mut world = scenario(PredationMode::Deterministic);
        let owl = world.place(Species::Owl, Position::new(3, 3), None).unwrap();
        for _ in 0..20 {
            let before = world.animal(owl).unwrap().position();
            world.owl_turn(owl);
            assert_ne!(world.animal(owl).unwrap().position(), before);
            world.animal_mut(owl).has_moved = false;
        }
    }

    #[test]
    fn slow_prey_targeting_picks_slowest() {
        let mut world = scenario(PredationMode::Deterministic);
        world.config.target_slow_prey = true;
        let fast = world.place(Species::Mouse, Position::new(3, 2), Some(5)).unwrap();
        let slow = world.place(Species::Mouse, Position::new(3, 4), Some(2)).unwrap();
        let owl = world.place(Species::Owl, Position::new(3, 3), Some(50)).unwrap();

        world.owl_turn(owl);

        assert!(world.animal(slow).is_none());
        assert!(world.animal(fast).is_some());
    }

    #[test]
    fn pregnant_owl_gives_birth_before_hunting() {
        let mut world = scenario(PredationMode::Deterministic);
        let mother = world.place(Species::Owl, Position::new(3, 3), Some(30)).unwrap();
        let mouse = world.place(Species::Mouse, Position::new(3, 4), Some(1)).unwrap();
        world.set_sex(mother, Sex::Female);
        let duration = world.animal(mother).unwrap().limits().pregnancy_duration;
        {
            let owl = world.animal_mut(mother);
            owl.conceive(crate::modules::animal::Mate { id: 77, speed: 50 });
            owl.time_pregnant = duration - 1;
        }

        world.owl_turn(mother);

        assert_eq!(world.owls().len(), 2);
        assert!(world.animal(mouse).is_some());
        assert!(!world.animal(mother).unwrap().is_pregnant());
        let child = world.owls()[1];
        let speed = world.animal(child).unwrap().speed();
        assert!((32..=48).contains(&speed), "inherited speed {speed}");
        assert!(world.last_events().iter().any(|e| matches!(
            e,
            Event::Born { mother: m, father: 77, .. } if *m == mother
        )));
    }
}
