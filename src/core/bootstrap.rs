// bootstrap.rs - Empirical null distribution over resampled trait ensembles

use crate::core::discovery::{evaluate_trait, PositionFilters};
use crate::core::position;
use crate::data::{AlignmentSlice, TraitIndex};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;

/// Bootstrap outcome for one alignment column: how many synthetic traits
/// reproduced a convergent call at this position.
#[derive(Debug, Clone)]
pub struct BootstrapLine {
    pub gene: String,
    pub position: usize,
    pub hits: usize,
    pub cycles: usize,
    /// Labels of the replicates that produced a call
    pub hit_traits: Vec<String>,
}

impl BootstrapLine {
    /// Fraction of replicates reproducing the call: the empirical p-value
    /// of the position under the resampled null.
    pub fn empirical_pvalue(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.hits as f64 / self.cycles as f64
    }
}

/// Run the candidate evaluation of every retained column against a
/// resampled trait ensemble. The ensemble is used exactly like a true trait
/// index; a replicate "hits" when it passes the same gap/missing/pattern
/// filters a real trait would have to pass.
pub fn bootstrap(
    slice: &AlignmentSlice,
    resampled: &TraitIndex,
    filters: &PositionFilters,
    show_progress: bool,
) -> Vec<BootstrapLine> {
    let species_set: HashSet<String> = slice.species.iter().cloned().collect();
    let cycles = resampled.cycles();

    let progress = if show_progress {
        let pb = ProgressBar::new(slice.columns.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} columns")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let lines: Vec<BootstrapLine> = slice
        .columns
        .par_iter()
        .map(|column| {
            let processed = position::process(column, resampled, &species_set);

            let hit_traits: Vec<String> = processed
                .valid_traits(resampled.trait_names())
                .into_iter()
                .filter(|name| evaluate_trait(&processed, name.as_str(), filters).is_ok())
                .cloned()
                .collect();

            if let Some(pb) = &progress {
                pb.inc(1);
            }

            BootstrapLine {
                gene: slice.gene.clone(),
                position: processed.position,
                hits: hit_traits.len(),
                cycles,
                hit_traits,
            }
        })
        .collect();

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    lines
}
