use std::fs;
use std::path::PathBuf;

use owlmouse::{SimConfig, TickStats, World};
use tracing::info;

pub struct RunOptions {
    pub ticks: u64,
    pub report_every: u64,
    pub json: bool,
    pub grid: bool,
    pub snapshot: Option<PathBuf>,
}

pub fn run_simulation(config: SimConfig, options: RunOptions) -> Result<(), String> {
    if options.report_every == 0 {
        return Err("report_every must be greater than 0".into());
    }

    let mut world = World::new(config).map_err(|e| e.to_string())?;
    emit(&world, options.json)?;

    let mut totals = TickStats::default();
    for _ in 0..options.ticks {
        let report = world.tick();
        totals += report.stats();

        let extinct = world.population_counts().extinct();
        if report.tick % options.report_every == 0 || extinct {
            emit(&world, options.json)?;
        }
        if extinct {
            info!(tick = report.tick, "both species extinct");
            if !options.json {
                println!("Both species extinct at tick {}", report.tick);
            }
            break;
        }
    }

    if !options.json {
        println!(
            "Totals: births={} starved={} old_age={} eaten={} escaped={} grass_eaten={}",
            totals.births(),
            totals.starved,
            totals.old_age,
            totals.eaten,
            totals.escaped,
            totals.grass_eaten
        );
    }

    let snapshot = world.snapshot_grid();
    if options.grid {
        print!("{}", snapshot.render());
    }
    if let Some(path) = options.snapshot {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }
        let json = serde_json::to_vec_pretty(&snapshot).map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| format!("write {}: {}", path.display(), e))?;
        if !options.json {
            println!("Saved snapshot to {}", path.display());
        }
    }
    Ok(())
}

fn emit(world: &World, json: bool) -> Result<(), String> {
    let summary = world.summary();
    if json {
        let line = serde_json::to_string(&summary).map_err(|e| e.to_string())?;
        println!("{}", line);
    } else {
        println!("{}", summary);
    }
    Ok(())
}
