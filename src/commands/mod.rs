use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use owlmouse::{PredationMode, SimConfig, config};

mod batch;
mod run;

use batch::run_batch;
use run::{RunOptions, run_simulation};

const DEFAULT_CONFIG_PATH: &str = "owlmouse.json";

#[derive(Parser)]
#[command(
    name = "owlmouse",
    version,
    about = "Owl/mouse predator-prey grid simulation",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a default config file
    Init {
        /// Where to write the config
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        force: bool,
    },
    /// Run a single simulation and print population per tick
    Run {
        #[command(flatten)]
        overrides: ConfigOverrides,
        /// Number of ticks to run
        #[arg(short = 't', long, default_value_t = 100)]
        ticks: u64,
        /// Print a summary every N ticks
        #[arg(long, default_value_t = 1)]
        report_every: u64,
        /// Emit one JSON object per report instead of text
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        json: bool,
        /// Print the final grid as characters
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        grid: bool,
        /// Write the final grid snapshot as JSON to this path
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run many seeded repetitions in parallel and print one row per run
    Batch {
        #[command(flatten)]
        overrides: ConfigOverrides,
        /// Number of ticks per run
        #[arg(short = 't', long, default_value_t = 100)]
        ticks: u64,
        /// Number of runs
        #[arg(short = 'r', long, default_value_t = 8)]
        repetitions: u64,
    },
}

/// Flags that override fields of the loaded config.
#[derive(clap::Args, Debug, Default)]
pub struct ConfigOverrides {
    /// JSON config file (defaults apply when omitted)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// RNG seed for a reproducible run
    #[arg(short = 's', long)]
    pub seed: Option<u64>,
    /// Grid side length
    #[arg(long)]
    pub dimension: Option<usize>,
    /// Initial mouse count
    #[arg(long)]
    pub mice: Option<usize>,
    /// Initial owl count
    #[arg(long)]
    pub owls: Option<usize>,
    /// Predation rule
    #[arg(long, value_enum)]
    pub predation: Option<PredationMode>,
}

impl ConfigOverrides {
    pub fn resolve(&self) -> Result<SimConfig, String> {
        let mut cfg = match &self.config {
            Some(path) => config::load(path).map_err(|e| e.to_string())?,
            None => SimConfig::default(),
        };
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(dimension) = self.dimension {
            cfg.dimension = dimension;
        }
        if let Some(mice) = self.mice {
            cfg.mice.count = mice;
        }
        if let Some(owls) = self.owls {
            cfg.owls.count = owls;
        }
        if let Some(predation) = self.predation {
            cfg.predation = predation;
        }
        cfg.validate().map_err(|e| e.to_string())?;
        Ok(cfg)
    }
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Init { path, force } => run_init(&path, force),
        Command::Run {
            overrides,
            ticks,
            report_every,
            json,
            grid,
            snapshot,
        } => run_simulation(
            overrides.resolve()?,
            RunOptions {
                ticks,
                report_every,
                json,
                grid,
                snapshot,
            },
        ),
        Command::Batch {
            overrides,
            ticks,
            repetitions,
        } => run_batch(overrides.resolve()?, ticks, repetitions),
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ));
    }
    config::save(path, &SimConfig::default()).map_err(|e| e.to_string())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
