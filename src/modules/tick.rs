use std::cmp::Reverse;

use serde::Serialize;
use tracing::{debug, info_span};

use crate::modules::animal::{AgentId, DeathReason, Mate, Species};
use crate::modules::stats::TickStats;
use crate::modules::tile::Position;
use crate::modules::world::{TileQuery, World};

/// Something that happened during a tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Moved {
        agent_id: AgentId,
        from: Position,
        to: Position,
    },
    GrassEaten {
        agent_id: AgentId,
        position: Position,
    },
    Born {
        species: Species,
        child: AgentId,
        mother: AgentId,
        father: AgentId,
    },
    Died {
        agent_id: AgentId,
        species: Species,
        reason: DeathReason,
    },
    PreyEscaped {
        owl: AgentId,
        mouse: AgentId,
    },
    Conceived {
        species: Species,
        mother: AgentId,
        father: AgentId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<Event>,
}

impl TickReport {
    pub fn stats(&self) -> TickStats {
        TickStats::from_events(&self.events)
    }
}

impl World {
    /// Advances the world by one tick:
    ///
    /// 1. owls act in a shuffled order;
    /// 2. mice act fastest first;
    /// 3. every non-pregnant female looks for an adjacent male;
    /// 4. move flags reset;
    /// 5. grass regrows.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.tick + 1;
        let span = info_span!("tick", tick);
        let _guard = span.enter();
        self.events.clear();

        self.owl_phase();
        self.mouse_phase();
        self.pregnancy_phase();
        for animal in self.animals.values_mut() {
            animal.has_moved = false;
        }
        let threshold = self.config.grass_regrowth;
        for tile in &mut self.tiles {
            tile.grow(threshold);
        }

        self.tick = tick;
        debug_assert!(
            self.verify_invariants().is_ok(),
            "world invariants broken after tick {tick}: {:?}",
            self.verify_invariants()
        );
        debug!(
            mice = self.mice.len(),
            owls = self.owls.len(),
            events = self.events.len(),
            "tick complete"
        );

        TickReport {
            tick,
            events: self.events.clone(),
        }
    }

    /// Runs `count` ticks and returns their combined statistics.
    pub fn tick_n(&mut self, count: u64) -> TickStats {
        let mut total = TickStats::default();
        for _ in 0..count {
            total += self.tick().stats();
        }
        total
    }

    fn owl_phase(&mut self) {
        let mut order = self.owls.clone();
        self.rng.shuffle(&mut order);
        for owl_id in order {
            self.owl_turn(owl_id);
        }
    }

    fn mouse_phase(&mut self) {
        let mut order = self.mice.clone();
        order.sort_by_key(|id| Reverse(self.animal(*id).map_or(0, |mouse| mouse.speed)));
        for mouse_id in order {
            self.mouse_turn(mouse_id);
        }
    }

    /// Owls first, then mice. A female conceives with the first adjacent
    /// male of her species; his speed is recorded for the birth.
    fn pregnancy_phase(&mut self) {
        for (species, query) in [
            (Species::Owl, TileQuery::MaleOwl),
            (Species::Mouse, TileQuery::MaleMouse),
        ] {
            let registry = match species {
                Species::Owl => &self.owls,
                Species::Mouse => &self.mice,
            };
            let females: Vec<AgentId> = registry
                .iter()
                .copied()
                .filter(|id| {
                    self.animal(*id)
                        .is_some_and(|a| a.is_female() && !a.is_pregnant())
                })
                .collect();

            for mother in females {
                let Some(&partner_tile) = self.neighbors_matching(mother, query).first() else {
                    continue;
                };
                let Some(father) = self
                    .tile(partner_tile)
                    .and_then(|tile| tile.occupant())
                    .and_then(|id| self.animal(id))
                else {
                    continue;
                };
                let mate = Mate {
                    id: father.id,
                    speed: father.speed,
                };

                self.animal_mut(mother).conceive(mate);
                debug!(%species, mother, father = mate.id, "conceived");
                self.events.push(Event::Conceived {
                    species,
                    mother,
                    father: mate.id,
                });
            }
        }
    }
}
