// mod.rs - Trait resampling module

pub mod engine;
pub mod topology;

pub use engine::{brownian_motion, FamilyMap, ResamplingEngine, ResamplingMode, TraitTemplate};
pub use topology::PhylogeneticTopology;
