use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest variance bound accepted for speed inheritance.
pub const MAX_INHERITANCE_VARIANCE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("initial population of {requested} exceeds grid capacity of {capacity} tiles")]
    OverCapacity { requested: usize, capacity: usize },
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PredationMode {
    /// Prey is caught iff it is no faster than the owl.
    Deterministic,
    /// Catch chance scales with the owl/prey speed ratio.
    Probabilistic,
}

impl PredationMode {
    pub const fn label(self) -> &'static str {
        match self {
            PredationMode::Deterministic => "deterministic",
            PredationMode::Probabilistic => "probabilistic",
        }
    }
}

impl Default for PredationMode {
    fn default() -> Self {
        PredationMode::Probabilistic
    }
}

impl fmt::Display for PredationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PredationMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deterministic" | "fixed" => Ok(PredationMode::Deterministic),
            "probabilistic" | "random" => Ok(PredationMode::Probabilistic),
            _ => Err(()),
        }
    }
}

/// Per-species life-cycle limits. Zero disables the corresponding rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub count: usize,
    pub hunger_threshold: u32,
    pub pregnancy_duration: u32,
    pub max_age: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceConfig {
    pub speed: bool,
    pub variance: u32,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            speed: true,
            variance: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: Option<u64>,
    pub dimension: usize,
    pub rock_density: u8,
    pub grass_regrowth: u32,
    pub start_mid_simulation: bool,
    pub predation: PredationMode,
    pub target_slow_prey: bool,
    pub mice: SpeciesConfig,
    pub owls: SpeciesConfig,
    pub inheritance: InheritanceConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            dimension: 20,
            rock_density: 0,
            grass_regrowth: 5,
            start_mid_simulation: true,
            predation: PredationMode::Probabilistic,
            target_slow_prey: false,
            mice: SpeciesConfig {
                count: 40,
                hunger_threshold: 5,
                pregnancy_duration: 3,
                max_age: 0,
            },
            owls: SpeciesConfig {
                count: 4,
                hunger_threshold: 15,
                pregnancy_duration: 4,
                max_age: 0,
            },
            inheritance: InheritanceConfig::default(),
        }
    }
}

impl SimConfig {
    /// Number of tiles on the grid.
    pub fn capacity(&self) -> usize {
        self.dimension.saturating_mul(self.dimension)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::invalid("dimension", "must be greater than 0"));
        }
        if i32::try_from(self.dimension).is_err() {
            return Err(ConfigError::invalid(
                "dimension",
                format!("must fit in a signed 32-bit coordinate (got {})", self.dimension),
            ));
        }
        if self.rock_density > 100 {
            return Err(ConfigError::invalid(
                "rock_density",
                format!("must be a percentage in 0..=100 (got {})", self.rock_density),
            ));
        }
        if self.inheritance.variance > MAX_INHERITANCE_VARIANCE {
            return Err(ConfigError::invalid(
                "inheritance.variance",
                format!(
                    "must be at most {} (got {})",
                    MAX_INHERITANCE_VARIANCE, self.inheritance.variance
                ),
            ));
        }
        let requested = self.mice.count.saturating_add(self.owls.count);
        let capacity = self.capacity();
        if requested > capacity {
            return Err(ConfigError::OverCapacity {
                requested,
                capacity,
            });
        }
        Ok(())
    }
}

/// Loads a config from a JSON file. An empty file yields the defaults.
pub fn load(path: impl AsRef<Path>) -> Result<SimConfig, ConfigError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Ok(SimConfig::default());
    }

    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save(path: impl AsRef<Path>, config: &SimConfig) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_vec_pretty(config)?;
    fs::write(path, json)
}
