pub mod modules;

pub use modules::animal::{AgentId, Animal, DeathReason, Limits, Parents, Sex, Species, inherited_speed};
pub use modules::behavior::{Decision, catch_chance};
pub use modules::config::{
    self, ConfigError, InheritanceConfig, MAX_INHERITANCE_VARIANCE, PredationMode, SimConfig,
    SpeciesConfig,
};
pub use modules::rng::{SPEED_RANGE, SimRng};
pub use modules::stats::{PopulationCounts, Summary, TickStats, TraitAverages};
pub use modules::tick::{Event, TickReport};
pub use modules::tile::{Position, Tile};
pub use modules::view::{GridSnapshot, OccupantView, TileView};
pub use modules::world::{
    InvariantViolation, NEIGHBOR_OFFSETS, PlacementError, TileQuery, World,
};
