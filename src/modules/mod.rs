pub mod animal;
pub mod behavior;
pub mod config;
pub mod rng;
pub mod stats;
pub mod tick;
pub mod tile;
pub mod view;
pub mod world;
