// discovery.rs - CAAS discovery across one alignment

use crate::core::hyper::{position_pvalue, ScoredPvalue};
use crate::core::pattern::{classify, Pattern};
use crate::core::position::{self, GroupCounts, ProcessedPosition};
use crate::data::{AlignmentSlice, TraitIndex, GAP};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Per-side gap or missing-species bounds. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    pub foreground: Option<usize>,
    pub background: Option<usize>,
    pub overall: Option<usize>,
}

impl Thresholds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// True when the observed counts stay inside every configured bound.
    pub fn admits(&self, counts: &GroupCounts) -> bool {
        if self.overall.is_some_and(|max| counts.total() > max) {
            return false;
        }
        if self.foreground.is_some_and(|max| counts.foreground > max) {
            return false;
        }
        if self.background.is_some_and(|max| counts.background > max) {
            return false;
        }
        true
    }

    /// Nulls a side may still carry and pass: used to derive the column
    /// change threshold.
    pub fn allowed_foreground(&self) -> usize {
        self.foreground.unwrap_or(0)
    }

    pub fn allowed_background(&self) -> usize {
        self.background.unwrap_or(0)
    }
}

/// Why a candidate (trait, column) pair produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    GapLimit,
    MissingLimit,
    NotConvergent,
    PatternNotAdmitted,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FilterReason::GapLimit => "gap limit exceeded",
            FilterReason::MissingLimit => "missing-species limit exceeded",
            FilterReason::NotConvergent => "residue sets not disjoint",
            FilterReason::PatternNotAdmitted => "pattern not admitted",
        };
        write!(f, "{}", label)
    }
}

/// Candidate evaluation filters shared by discovery and bootstrap.
#[derive(Debug, Clone)]
pub struct PositionFilters {
    pub max_gaps: Thresholds,
    pub max_missing: Thresholds,
    pub admitted_patterns: BTreeSet<Pattern>,
}

impl Default for PositionFilters {
    fn default() -> Self {
        Self {
            max_gaps: Thresholds::unbounded(),
            max_missing: Thresholds::unbounded(),
            admitted_patterns: [Pattern::OneToOne, Pattern::OneToMany, Pattern::ManyToOne]
                .into_iter()
                .collect(),
        }
    }
}

/// One convergent call.
#[derive(Debug, Clone)]
pub struct CaasRecord {
    pub gene: String,
    pub trait_name: String,
    pub position: usize,
    /// `fgResidues/bgResidues` tag, distinct residues sorted per side
    pub substitution: String,
    pub pvalue: Option<ScoredPvalue>,
    pub pattern: Pattern,
    /// Observed (ungapped, non-missing) group sizes
    pub fg_observed: usize,
    pub bg_observed: usize,
    pub gaps: GroupCounts,
    pub missing: GroupCounts,
    pub fg_species: Vec<String>,
    pub bg_species: Vec<String>,
    pub missing_species: Vec<String>,
}

/// A candidate dropped by a filter, with the reason preserved.
#[derive(Debug, Clone)]
pub struct RejectedCandidate {
    pub trait_name: String,
    pub position: usize,
    pub reason: FilterReason,
}

/// Everything one discovery pass produced.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub records: Vec<CaasRecord>,
    pub rejected: Vec<RejectedCandidate>,
}

impl DiscoveryOutcome {
    /// Rejection tally per reason, for the run summary.
    pub fn rejection_counts(&self) -> Vec<(FilterReason, usize)> {
        [
            FilterReason::GapLimit,
            FilterReason::MissingLimit,
            FilterReason::NotConvergent,
            FilterReason::PatternNotAdmitted,
        ]
        .into_iter()
        .map(|reason| {
            let count = self.rejected.iter().filter(|r| r.reason == reason).count();
            (reason, count)
        })
        .collect()
    }
}

/// Scan every retained column of one alignment for convergent calls.
///
/// Columns are independent and processed in parallel; the per-column result
/// vectors are merged in column order by the collecting thread.
pub fn discover(
    slice: &AlignmentSlice,
    traits: &TraitIndex,
    filters: &PositionFilters,
    score: bool,
    show_progress: bool,
) -> DiscoveryOutcome {
    let species_set: HashSet<String> = slice.species.iter().cloned().collect();

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

    let per_column: Vec<(Vec<CaasRecord>, Vec<RejectedCandidate>)> = slice
        .columns
        .par_iter()
        .map(|column| {
            let processed = position::process(column, traits, &species_set);
            let result = evaluate_position(&processed, slice, traits, filters, score);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            result
        })
        .collect();

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut outcome = DiscoveryOutcome::default();
    for (records, rejected) in per_column {
        outcome.records.extend(records);
        outcome.rejected.extend(rejected);
    }
    outcome
}

/// Evaluate every valid trait at one processed column.
fn evaluate_position(
    processed: &ProcessedPosition,
    slice: &AlignmentSlice,
    traits: &TraitIndex,
    filters: &PositionFilters,
    score: bool,
) -> (Vec<CaasRecord>, Vec<RejectedCandidate>) {
    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for trait_name in processed.valid_traits(traits.trait_names()) {
        match evaluate_trait(processed, trait_name, filters) {
            Err(reason) => rejected.push(RejectedCandidate {
                trait_name: trait_name.clone(),
                position: processed.position,
                reason,
            }),
            Ok((substitution, pattern)) => {
                let fg_species = processed.ungapped_foreground[trait_name].clone();
                let bg_species = processed.ungapped_background[trait_name].clone();

                let pvalue = score.then(|| {
                    let frequencies: BTreeMap<char, usize> = processed
                        .residue_species
                        .iter()
                        .filter(|(&symbol, _)| symbol != GAP)
                        .map(|(&symbol, carriers)| (symbol, carriers.len()))
                        .collect();
                    position_pvalue(
                        &frequencies,
                        fg_species.len(),
                        bg_species.len(),
                        processed.position,
                    )
                });

                records.push(CaasRecord {
                    gene: slice.gene.clone(),
                    trait_name: trait_name.clone(),
                    position: processed.position,
                    substitution,
                    pvalue,
                    pattern,
                    fg_observed: fg_species.len(),
                    bg_observed: bg_species.len(),
                    gaps: processed.gap_counts[trait_name],
                    missing: processed.miss_counts[trait_name],
                    fg_species,
                    bg_species,
                    missing_species: processed.missing_by_trait[trait_name].clone(),
                });
            }
        }
    }

    (records, rejected)
}

/// Shared candidate test: gap filter, missing filter, convergence test,
/// admitted-pattern filter, in that order.
pub(crate) fn evaluate_trait(
    processed: &ProcessedPosition,
    trait_name: &str,
    filters: &PositionFilters,
) -> Result<(String, Pattern), FilterReason> {
    if !filters.max_gaps.admits(&processed.gap_counts[trait_name]) {
        return Err(FilterReason::GapLimit);
    }
    if !filters.max_missing.admits(&processed.miss_counts[trait_name]) {
        return Err(FilterReason::MissingLimit);
    }

    let result = classify(
        &processed.foreground_residues[trait_name],
        &processed.background_residues[trait_name],
    );
    if !result.convergent {
        return Err(FilterReason::NotConvergent);
    }
    let Some(pattern) = result.pattern else {
        return Err(FilterReason::NotConvergent);
    };
    if !filters.admitted_patterns.contains(&pattern) {
        return Err(FilterReason::PatternNotAdmitted);
    }

    Ok((result.substitution(), pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AlignmentColumn, TraitGroup};
    use std::collections::HashMap;

    fn toy_slice() -> AlignmentSlice {
        let mut residues = HashMap::new();
        for (species, residue) in [("A", 'M'), ("B", 'M'), ("C", 'L'), ("D", 'L'), ("E", '-')] {
            residues.insert(species.to_string(), residue);
        }
        AlignmentSlice {
            gene: "toygene".to_string(),
            species: vec!["A", "B", "C", "D", "E"]
                .into_iter()
                .map(String::from)
                .collect(),
            columns: vec![AlignmentColumn::new(0, residues)],
            total_columns: 1,
        }
    }

    fn toy_traits() -> TraitIndex {
        TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Background, "t"),
            ("D", TraitGroup::Background, "t"),
        ])
    }

    #[test]
    fn clean_one_to_one_call_is_recorded() {
        let outcome = discover(
            &toy_slice(),
            &toy_traits(),
            &PositionFilters::default(),
            false,
            false,
        );

        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.rejected.is_empty());

        let record = &outcome.records[0];
        assert_eq!(record.gene, "toygene");
        assert_eq!(record.trait_name, "t");
        assert_eq!(record.substitution, "M/L");
        assert_eq!(record.pattern, Pattern::OneToOne);
        assert_eq!(record.fg_observed, 2);
        assert_eq!(record.bg_observed, 2);
        assert_eq!(record.gaps, GroupCounts::default());
        assert_eq!(record.missing, GroupCounts::default());
        assert!(record.pvalue.is_none());
    }

    #[test]
    fn gap_threshold_rejects_with_reason() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Background, "t"),
            ("D", TraitGroup::Background, "t"),
            ("E", TraitGroup::Background, "t"),
        ]);
        let filters = PositionFilters {
            max_gaps: Thresholds {
                background: Some(0),
                ..Thresholds::unbounded()
            },
            ..PositionFilters::default()
        };

        let outcome = discover(&toy_slice(), &traits, &filters, false, false);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, FilterReason::GapLimit);
    }

    #[test]
    fn non_convergent_candidate_is_distinguishable() {
        let mut residues = HashMap::new();
        for (species, residue) in [("A", 'M'), ("B", 'M'), ("C", 'M'), ("D", 'L')] {
            residues.insert(species.to_string(), residue);
        }
        let slice = AlignmentSlice {
            gene: "g".to_string(),
            species: vec!["A", "B", "C", "D"].into_iter().map(String::from).collect(),
            columns: vec![AlignmentColumn::new(3, residues)],
            total_columns: 1,
        };

        let outcome = discover(
            &slice,
            &toy_traits(),
            &PositionFilters::default(),
            false,
            false,
        );
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected[0].reason, FilterReason::NotConvergent);
    }

    #[test]
    fn scoring_attaches_a_pvalue() {
        let outcome = discover(
            &toy_slice(),
            &toy_traits(),
            &PositionFilters::default(),
            true,
            false,
        );
        let scored = outcome.records[0].pvalue.expect("scored run");
        assert!((0.0..=1.0).contains(&scored.value));
    }

    #[test]
    fn pattern_filter_uses_admitted_set() {
        let filters = PositionFilters {
            admitted_patterns: [Pattern::OneToMany].into_iter().collect(),
            ..PositionFilters::default()
        };
        let outcome = discover(&toy_slice(), &toy_traits(), &filters, false, false);
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.rejected[0].reason,
            FilterReason::PatternNotAdmitted
        );
    }
}
