use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::config::{InheritanceConfig, SpeciesConfig};
use crate::modules::rng::SimRng;
use crate::modules::tile::Position;

pub type AgentId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Mouse,
    Owl,
}

impl Species {
    pub const fn label(self) -> &'static str {
        match self {
            Species::Mouse => "mouse",
            Species::Owl => "owl",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathReason {
    Starvation,
    OldAge,
    Predation { by: AgentId },
}

/// Species constants copied onto each animal at birth. Zero disables a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub hunger_threshold: u32,
    pub pregnancy_duration: u32,
    pub max_age: u32,
}

impl From<&SpeciesConfig> for Limits {
    fn from(cfg: &SpeciesConfig) -> Self {
        Self {
            hunger_threshold: cfg.hunger_threshold,
            pregnancy_duration: cfg.pregnancy_duration,
            max_age: cfg.max_age,
        }
    }
}

/// The partner recorded at conception. The speed is captured then so the
/// birth does not depend on the father still being alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mate {
    pub id: AgentId,
    pub speed: u32,
}

/// Birth-time only: who the parents were and how fast they are. Not stored
/// on the child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parents {
    pub mother: AgentId,
    pub father: AgentId,
    pub mother_speed: u32,
    pub father_speed: u32,
}

impl Parents {
    pub fn mean_speed(&self) -> f64 {
        (self.mother_speed as f64 + self.father_speed as f64) / 2.0
    }
}

/// Offspring speed regresses to the parental mean with a perturbation of at
/// most `variance` percent of that mean, never dropping below 1.
pub fn inherited_speed(parents: &Parents, variance: u32, rng: &mut SimRng) -> u32 {
    let mean = parents.mean_speed();
    let perturbation = mean / 100.0 * rng.variance(variance) as f64;
    let speed = (mean + perturbation).round();
    if speed < 1.0 { 1 } else { speed as u32 }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Animal {
    pub(crate) id: AgentId,
    pub(crate) species: Species,
    pub(crate) sex: Sex,
    pub(crate) speed: u32,
    pub(crate) position: Position,
    pub(crate) age: u32,
    pub(crate) time_since_fed: u32,
    pub(crate) pregnant_with: Option<Mate>,
    pub(crate) time_pregnant: u32,
    pub(crate) has_moved: bool,
    pub(crate) limits: Limits,
}

impl Animal {
    /// Builds a newborn (or initial) animal. Speed is inherited when both
    /// parents are given and inheritance is on, otherwise sampled uniformly.
    pub(crate) fn born(
        id: AgentId,
        species: Species,
        position: Position,
        limits: Limits,
        parents: Option<&Parents>,
        inheritance: &InheritanceConfig,
        rng: &mut SimRng,
    ) -> Self {
        let sex = rng.sex();
        let speed = match parents {
            Some(parents) if inheritance.speed => {
                inherited_speed(parents, inheritance.variance, rng)
            }
            _ => rng.speed(),
        };

        Self {
            id,
            species,
            sex,
            speed,
            position,
            age: 0,
            time_since_fed: 0,
            pregnant_with: None,
            time_pregnant: 0,
            has_moved: false,
            limits,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn time_since_fed(&self) -> u32 {
        self.time_since_fed
    }

    pub fn is_pregnant(&self) -> bool {
        self.pregnant_with.is_some()
    }

    pub fn pregnant_with(&self) -> Option<AgentId> {
        self.pregnant_with.map(|mate| mate.id)
    }

    pub fn time_pregnant(&self) -> u32 {
        self.time_pregnant
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn is_female(&self) -> bool {
        self.sex == Sex::Female
    }

    /// Starvation is checked before old age.
    pub fn natural_death(&self) -> Option<DeathReason> {
        let Limits {
            hunger_threshold,
            max_age,
            ..
        } = self.limits;
        if hunger_threshold != 0 && self.time_since_fed >= hunger_threshold {
            return Some(DeathReason::Starvation);
        }
        if max_age != 0 && self.age >= max_age {
            return Some(DeathReason::OldAge);
        }
        None
    }

    /// Per-turn clocks: age, hunger and, if pregnant, gestation.
    pub(crate) fn advance_clocks(&mut self) {
        self.age = self.age.saturating_add(1);
        self.time_since_fed = self.time_since_fed.saturating_add(1);
        if self.is_pregnant() {
            self.time_pregnant = self.time_pregnant.saturating_add(1);
        }
    }

    pub(crate) fn feed(&mut self) {
        self.time_since_fed = 0;
    }

    pub fn ready_to_give_birth(&self) -> bool {
        self.is_pregnant()
            && self.limits.pregnancy_duration != 0
            && self.time_pregnant >= self.limits.pregnancy_duration
    }

    pub(crate) fn conceive(&mut self, mate: Mate) {
        self.pregnant_with = Some(mate);
        self.time_pregnant = 0;
    }

    /// Ends the pregnancy and hands back the parents of the child.
    pub(crate) fn deliver(&mut self) -> Option<Parents> {
        let mate = self.pregnant_with.take()?;
        self.time_pregnant = 0;
        Some(Parents {
            mother: self.id,
            father: mate.id,
            mother_speed: self.speed,
            father_speed: mate.speed,
        })
    }
}
