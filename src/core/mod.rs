// mod.rs - Core detection engine module

pub mod bootstrap;
pub mod discovery;
pub mod hyper;
pub mod pattern;
pub mod position;

pub use bootstrap::{bootstrap, BootstrapLine};
pub use discovery::{
    discover, CaasRecord, DiscoveryOutcome, FilterReason, PositionFilters, RejectedCandidate,
    Thresholds,
};
pub use hyper::{position_pvalue, pstate, sstate, symbol_frequencies, ScoredPvalue};
pub use pattern::{classify, Pattern, PatternResult};
pub use position::{process, GroupCounts, ProcessedPosition};
