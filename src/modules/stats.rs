use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::modules::animal::{DeathReason, Species};
use crate::modules::tick::Event;
use crate::modules::world::World;

/// Counts of what happened over one or more ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub moves: u64,
    pub grass_eaten: u64,
    pub mice_born: u64,
    pub owls_born: u64,
    pub conceived: u64,
    pub starved: u64,
    pub old_age: u64,
    pub eaten: u64,
    pub escaped: u64,
}

impl TickStats {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::Moved { .. } => self.moves = self.moves.saturating_add(1),
            Event::GrassEaten { .. } => self.grass_eaten = self.grass_eaten.saturating_add(1),
            Event::Born {
                species: Species::Mouse,
                ..
            } => self.mice_born = self.mice_born.saturating_add(1),
            Event::Born {
                species: Species::Owl,
                ..
            } => self.owls_born = self.owls_born.saturating_add(1),
            Event::Conceived { .. } => self.conceived = self.conceived.saturating_add(1),
            Event::Died { reason, .. } => match reason {
                DeathReason::Starvation => self.starved = self.starved.saturating_add(1),
                DeathReason::OldAge => self.old_age = self.old_age.saturating_add(1),
                DeathReason::Predation { .. } => self.eaten = self.eaten.saturating_add(1),
            },
            Event::PreyEscaped { .. } => self.escaped = self.escaped.saturating_add(1),
        }
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.record(event);
        }
        stats
    }

    pub fn births(&self) -> u64 {
        self.mice_born + self.owls_born
    }

    pub fn deaths(&self) -> u64 {
        self.starved + self.old_age + self.eaten
    }
}

impl AddAssign for TickStats {
    fn add_assign(&mut self, rhs: Self) {
        self.moves += rhs.moves;
        self.grass_eaten += rhs.grass_eaten;
        self.mice_born += rhs.mice_born;
        self.owls_born += rhs.owls_born;
        self.conceived += rhs.conceived;
        self.starved += rhs.starved;
        self.old_age += rhs.old_age;
        self.eaten += rhs.eaten;
        self.escaped += rhs.escaped;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationCounts {
    pub mice: usize,
    pub owls: usize,
}

impl PopulationCounts {
    pub fn total(&self) -> usize {
        self.mice + self.owls
    }

    pub fn extinct(&self) -> bool {
        self.total() == 0
    }
}

/// Mean speed per species; `None` when the species has died out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitAverages {
    pub mice: Option<f64>,
    pub owls: Option<f64>,
}

/// One line of population output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub tick: u64,
    pub population: PopulationCounts,
    pub speed: TraitAverages,
}

fn fmt_average(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick={} mice={} owls={} mouse_speed={} owl_speed={}",
            self.tick,
            self.population.mice,
            self.population.owls,
            fmt_average(self.speed.mice),
            fmt_average(self.speed.owls),
        )
    }
}

impl World {
    pub fn population_counts(&self) -> PopulationCounts {
        PopulationCounts {
            mice: self.mice.len(),
            owls: self.owls.len(),
        }
    }

    /// Average speed of each living population.
    pub fn average_trait(&self) -> TraitAverages {
        let mean = |ids: &[u64]| {
            if ids.is_empty() {
                return None;
            }
            let total: u64 = ids
                .iter()
                .filter_map(|id| self.animals.get(id))
                .map(|animal| animal.speed as u64)
                .sum();
            Some(total as f64 / ids.len() as f64)
        };
        TraitAverages {
            mice: mean(self.mice.as_slice()),
            owls: mean(self.owls.as_slice()),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            tick: self.tick,
            population: self.population_counts(),
            speed: self.average_trait(),
        }
    }
}
