use std::collections::HashSet;

use owlmouse::{
    ConfigError, DeathReason, Event, Position, PredationMode, Sex, SimConfig, Species, World,
};

fn scenario_config(dimension: usize) -> SimConfig {
    let mut config = SimConfig {
        seed: Some(1234),
        dimension,
        rock_density: 0,
        start_mid_simulation: false,
        predation: PredationMode::Deterministic,
        ..SimConfig::default()
    };
    config.mice.count = 0;
    config.owls.count = 0;
    config.mice.hunger_threshold = 1_000;
    config.owls.hunger_threshold = 1_000;
    config
}

fn species_delta(events: &[Event], species: Species) -> (usize, usize) {
    let born = events
        .iter()
        .filter(|e| matches!(e, Event::Born { species: s, .. } if *s == species))
        .count();
    let died = events
        .iter()
        .filter(|e| matches!(e, Event::Died { species: s, .. } if *s == species))
        .count();
    (born, died)
}

#[test]
fn faster_owl_catches_adjacent_mouse() {
    let mut world = World::empty(scenario_config(7)).unwrap();
    let mouse = world.place(Species::Mouse, Position::new(3, 3), Some(25)).unwrap();
    let owl = world.place(Species::Owl, Position::new(3, 4), Some(50)).unwrap();

    let report = world.tick();

    assert_eq!(world.population_counts().mice, 0);
    assert!(world.animal(mouse).is_none());
    assert_eq!(world.animal(owl).unwrap().position(), Position::new(3, 3));
    assert_eq!(world.animal(owl).unwrap().time_since_fed(), 0);
    assert!(report.events.contains(&Event::Died {
        agent_id: mouse,
        species: Species::Mouse,
        reason: DeathReason::Predation { by: owl },
    }));
}

#[test]
fn faster_mouse_flees_slower_owl() {
    let mut world = World::empty(scenario_config(7)).unwrap();
    let mouse = world.place(Species::Mouse, Position::new(3, 3), Some(50)).unwrap();
    let owl = world.place(Species::Owl, Position::new(3, 4), Some(25)).unwrap();

    let report = world.tick();

    let survivor = world.animal(mouse).expect("mouse should survive");
    assert_ne!(survivor.position(), Position::new(3, 4));
    assert_ne!(survivor.position(), Position::new(3, 3));
    assert_eq!(world.animal(owl).unwrap().position(), Position::new(3, 3));
    assert_eq!(report.stats().escaped, 1);
}

#[test]
fn grazing_resets_hunger_and_crops_grass() {
    let mut world = World::empty(scenario_config(3)).unwrap();
    let mouse = world.place(Species::Mouse, Position::new(1, 1), None).unwrap();

    let report = world.tick();

    let mouse = world.animal(mouse).unwrap();
    assert_eq!(mouse.time_since_fed(), 0);
    assert_ne!(mouse.position(), Position::new(1, 1));
    assert!(!world.tile(mouse.position()).unwrap().has_grass());
    assert_eq!(report.stats().grass_eaten, 1);
}

#[test]
fn pregnancy_runs_to_birth() {
    let mut config = scenario_config(2);
    config.mice.pregnancy_duration = 3;
    let mut world = World::empty(config).unwrap();

    // A full 2x2 grid: nobody can move until a tile is freed.
    let mother = world.place(Species::Mouse, Position::new(0, 0), Some(100)).unwrap();
    let east = world.place(Species::Mouse, Position::new(1, 0), Some(1)).unwrap();
    let south = world.place(Species::Mouse, Position::new(0, 1), Some(1)).unwrap();
    let corner = world.place(Species::Mouse, Position::new(1, 1), Some(1)).unwrap();
    world.set_sex(mother, Sex::Female);
    for male in [east, south, corner] {
        world.set_sex(male, Sex::Male);
    }

    let first = world.tick();
    assert_eq!(first.stats().conceived, 1);
    let father = world.animal(mother).unwrap().pregnant_with().unwrap();
    assert!(father == east || father == south);

    world.tick();
    world.tick();
    assert!(world.animal(mother).unwrap().is_pregnant());

    world.kill(south, DeathReason::OldAge);
    let birth = world.tick();

    let child = birth
        .events
        .iter()
        .find_map(|e| match e {
            Event::Born {
                child,
                mother: m,
                father: f,
                species: Species::Mouse,
            } if *m == mother && *f == father => Some(*child),
            _ => None,
        })
        .expect("birth event");
    assert_eq!(world.animal(child).unwrap().position(), Position::new(0, 1));
    assert!(!world.animal(mother).unwrap().is_pregnant());
    assert_eq!(world.population_counts().mice, 4);
}

#[test]
fn same_seed_replays_identically() {
    let config = SimConfig {
        seed: Some(77),
        dimension: 12,
        rock_density: 10,
        ..SimConfig::default()
    };
    let mut a = World::new(config.clone()).unwrap();
    let mut b = World::new(config).unwrap();
    assert_eq!(a.snapshot_grid(), b.snapshot_grid());

    for _ in 0..30 {
        assert_eq!(a.tick(), b.tick());
    }
    assert_eq!(a.snapshot_grid(), b.snapshot_grid());
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn zero_hunger_threshold_never_starves() {
    let mut config = SimConfig {
        seed: Some(5),
        dimension: 10,
        ..SimConfig::default()
    };
    config.mice.hunger_threshold = 0;
    config.owls.hunger_threshold = 0;
    config.owls.count = 0;
    let mut world = World::new(config).unwrap();

    let totals = world.tick_n(60);
    assert_eq!(totals.starved, 0);
}

#[test]
fn populations_follow_births_and_deaths() {
    let config = SimConfig {
        seed: Some(9),
        dimension: 15,
        rock_density: 5,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();

    for _ in 0..40 {
        let before = world.population_counts();
        let report = world.tick();
        let after = world.population_counts();

        let (mice_born, mice_died) = species_delta(&report.events, Species::Mouse);
        let (owls_born, owls_died) = species_delta(&report.events, Species::Owl);
        assert_eq!(after.mice + mice_died, before.mice + mice_born);
        assert_eq!(after.owls + owls_died, before.owls + owls_born);

        world.verify_invariants().unwrap();
    }
}

#[test]
fn occupants_are_unique_and_never_on_rock() {
    let config = SimConfig {
        seed: Some(31),
        dimension: 10,
        rock_density: 25,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();

    for _ in 0..25 {
        world.tick();
        let snapshot = world.snapshot_grid();
        let mut seen = HashSet::new();
        for tile in &snapshot.tiles {
            if tile.rock {
                assert!(tile.occupant.is_none());
                assert!(!tile.grass);
            }
            if let Some(occupant) = &tile.occupant {
                assert!(seen.insert(occupant.id), "agent {} on two tiles", occupant.id);
            }
        }
        assert_eq!(seen.len(), world.population_counts().total());
    }
}

#[test]
fn overfull_config_is_rejected() {
    let mut config = scenario_config(3);
    config.mice.count = 8;
    config.owls.count = 2;
    assert!(matches!(
        World::new(config),
        Err(ConfigError::OverCapacity {
            requested: 10,
            capacity: 9
        })
    ));
}

#[test]
fn last_events_only_hold_the_latest_tick() {
    let mut world = World::empty(scenario_config(5)).unwrap();
    world.place(Species::Mouse, Position::new(2, 2), None).unwrap();

    let first = world.tick();
    assert_eq!(world.last_events(), first.events.as_slice());
    let second = world.tick();
    assert_eq!(world.last_events(), second.events.as_slice());
    assert_eq!(second.tick, 2);
}
