use owlmouse::{ConfigError, SimConfig, Summary, TickStats, World};
use rayon::prelude::*;
use tracing::debug;

pub struct BatchRow {
    pub run: u64,
    pub seed: Option<u64>,
    pub summary: Summary,
    pub totals: TickStats,
}

/// Runs one repetition, stopping early once both species are gone.
pub fn run_once(mut config: SimConfig, run: u64, ticks: u64) -> Result<BatchRow, ConfigError> {
    config.seed = config.seed.map(|seed| seed.wrapping_add(run));
    let seed = config.seed;
    let mut world = World::new(config)?;

    let mut totals = TickStats::default();
    for _ in 0..ticks {
        totals += world.tick().stats();
        if world.population_counts().extinct() {
            break;
        }
    }
    debug!(run, ?seed, tick = world.tick_count(), "batch run finished");

    Ok(BatchRow {
        run,
        seed,
        summary: world.summary(),
        totals,
    })
}

pub fn run_batch(config: SimConfig, ticks: u64, repetitions: u64) -> Result<(), String> {
    let mut rows: Vec<BatchRow> = (0..repetitions)
        .into_par_iter()
        .map(|run| run_once(config.clone(), run, ticks))
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())?;
    rows.sort_by_key(|row| row.run);

    println!("run\tseed\tticks\tmice\towls\tmouse_speed\towl_speed\tbirths\tdeaths");
    for row in &rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.run,
            row.seed.map_or_else(|| "-".to_string(), |s| s.to_string()),
            row.summary.tick,
            row.summary.population.mice,
            row.summary.population.owls,
            fmt_speed(row.summary.speed.mice),
            fmt_speed(row.summary.speed.owls),
            row.totals.births(),
            row.totals.deaths(),
        );
    }
    Ok(())
}

fn fmt_speed(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}
