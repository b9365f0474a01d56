// lib.rs - caascan library root

//! # caascan - Convergent amino acid substitution scanner
//!
//! This library detects Convergent Amino Acid Substitutions (CAAS):
//! alignment columns where the foreground and background partitions of a
//! binary trait converge on disjoint residue states, a possible signal of
//! molecular convergence associated with a phenotype.
//!
//! ## Features
//!
//! - **Discovery**: per-column trait aggregation, convergence classification
//!   and result records across one or many binary traits
//! - **Significance**: exact conditional hypergeometric p-values with
//!   inclusion-exclusion over the column's residue combinations
//! - **Resampling**: random and phylogeny-restricted synthetic trait
//!   ensembles for empirical null distributions, with reproducible seeding
//! - **Bootstrap**: per-position empirical p-values against a resampled
//!   ensemble
//! - **Parallel**: columns and replicates processed concurrently
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use caascan::prelude::*;
//! use std::path::Path;
//!
//! // Load the trait design and the alignment
//! let traits = TraitIndex::from_path(Path::new("trait.cfg"))?;
//! let slice = AlignmentSlice::from_file(
//!     Path::new("gene.fasta"),
//!     None,  // auto-detect format
//!     1,     // change threshold
//!     0.5,   // max gap ratio per column
//! )?;
//!
//! // Scan for convergent substitutions
//! let outcome = discover(&slice, &traits, &PositionFilters::default(), true, false);
//! for record in &outcome.records {
//!     println!("{} {} {}", record.trait_name, record.position, record.substitution);
//! }
//! # Ok::<(), String>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;
pub mod resample;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{bootstrap, discover, BootstrapLine, CaasRecord, DiscoveryOutcome};
    pub use crate::core::{classify, position_pvalue, Pattern, PatternResult, ScoredPvalue};
    pub use crate::core::{process, PositionFilters, ProcessedPosition, Thresholds};
    pub use crate::data::{AlignmentColumn, AlignmentFormat, AlignmentSlice};
    pub use crate::data::{TraitGroup, TraitIndex};
    pub use crate::output::{write_bootstrap_lines, write_caas_records, write_trait_assignments};
    pub use crate::resample::{PhylogeneticTopology, ResamplingEngine, ResamplingMode};
}

// Re-export main types at the root level for convenience
pub use crate::core::{CaasRecord, DiscoveryOutcome, Pattern, PositionFilters};
pub use crate::data::{AlignmentSlice, TraitIndex};
pub use crate::resample::{PhylogeneticTopology, ResamplingEngine, ResamplingMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "caascan v{} - Convergent amino acid substitution scanner",
        VERSION
    )
}
