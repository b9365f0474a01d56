// position.rs - Per-column trait aggregation

use crate::data::{AlignmentColumn, TraitGroup, TraitIndex, GAP};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Foreground/background pair of counters for one trait at one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub foreground: usize,
    pub background: usize,
}

impl GroupCounts {
    pub fn total(&self) -> usize {
        self.foreground + self.background
    }
}

/// Everything the classifier and scorer need to know about one alignment
/// column under one trait index.
///
/// For each trait, a species is in exactly one of three states: "missing"
/// (in the trait design but absent from the alignment), "gapped" (present
/// with the gap symbol at this column), or "ungapped" (observed with a
/// residue). Gapped species contribute no residue to either side's list;
/// their absence is tracked through the gap counts.
///
/// Created per column, consumed immediately, then discarded.
#[derive(Debug, Clone)]
pub struct ProcessedPosition {
    /// 0-based column index in the source alignment
    pub position: usize,
    /// residue symbol → species carrying it (gap symbol included)
    pub residue_species: HashMap<char, Vec<String>>,
    /// trait → residues observed in its foreground, one entry per species
    pub foreground_residues: HashMap<String, Vec<char>>,
    /// trait → residues observed in its background, one entry per species
    pub background_residues: HashMap<String, Vec<char>>,
    /// trait → sorted foreground species observed with a residue
    pub ungapped_foreground: HashMap<String, Vec<String>>,
    /// trait → sorted background species observed with a residue
    pub ungapped_background: HashMap<String, Vec<String>>,
    /// trait → gap counts per side
    pub gap_counts: HashMap<String, GroupCounts>,
    /// trait → missing-species counts per side
    pub miss_counts: HashMap<String, GroupCounts>,
    /// trait → sorted species of the trait absent from the alignment
    pub missing_by_trait: HashMap<String, Vec<String>>,
    /// species gapped at this column
    pub gapped: BTreeSet<String>,
    /// species in the trait design but absent from the alignment
    pub missing: BTreeSet<String>,
}

impl ProcessedPosition {
    /// Traits that recorded at least one residue on both sides at this
    /// column, restricted to `trait_names`. Only these can yield a call.
    pub fn valid_traits<'a>(&self, trait_names: &'a [String]) -> Vec<&'a String> {
        trait_names
            .iter()
            .filter(|name| {
                self.foreground_residues.contains_key(name.as_str())
                    && self.background_residues.contains_key(name.as_str())
            })
            .collect()
    }
}

/// Aggregate one alignment column against a trait index.
pub fn process(
    column: &AlignmentColumn,
    traits: &TraitIndex,
    species_in_alignment: &HashSet<String>,
) -> ProcessedPosition {
    // Species in the trait design never observed in this alignment
    let missing: BTreeSet<String> = traits
        .species()
        .filter(|s| !species_in_alignment.contains(*s))
        .cloned()
        .collect();

    // Group column entries by residue symbol
    let mut residue_species: HashMap<char, Vec<String>> = HashMap::new();
    for (species, residue) in column.entries() {
        residue_species.entry(residue).or_default().push(species.clone());
    }
    for group in residue_species.values_mut() {
        group.sort();
    }

    let gapped: BTreeSet<String> = residue_species
        .get(&GAP)
        .map(|v| v.iter().cloned().collect())
        .unwrap_or_default();

    // Route each observed residue into the trait side its carrier belongs to
    let mut foreground_residues: HashMap<String, Vec<char>> = HashMap::new();
    let mut background_residues: HashMap<String, Vec<char>> = HashMap::new();

    for (species, residue) in column.entries() {
        if residue == GAP {
            continue;
        }
        let Some(memberships) = traits.memberships(species) else {
            continue;
        };
        for membership in memberships {
            let target = match membership.group {
                TraitGroup::Foreground => &mut foreground_residues,
                TraitGroup::Background => &mut background_residues,
            };
            target
                .entry(membership.trait_name.clone())
                .or_default()
                .push(residue);
        }
    }
    for residues in foreground_residues.values_mut() {
        residues.sort();
    }
    for residues in background_residues.values_mut() {
        residues.sort();
    }

    // Per-trait gap/missing bookkeeping, for traits that recorded at least
    // one background residue
    let mut ungapped_foreground = HashMap::new();
    let mut ungapped_background = HashMap::new();
    let mut gap_counts = HashMap::new();
    let mut miss_counts = HashMap::new();
    let mut missing_by_trait = HashMap::new();

    for trait_name in background_residues.keys() {
        let Some(fg) = traits.foreground(trait_name) else {
            continue;
        };
        let Some(bg) = traits.background(trait_name) else {
            continue;
        };

        let observed = |side: &BTreeSet<String>| -> Vec<String> {
            side.iter()
                .filter(|s| !gapped.contains(*s) && !missing.contains(*s))
                .cloned()
                .collect()
        };
        ungapped_foreground.insert(trait_name.clone(), observed(fg));
        ungapped_background.insert(trait_name.clone(), observed(bg));

        gap_counts.insert(
            trait_name.clone(),
            GroupCounts {
                foreground: fg.intersection(&gapped).count(),
                background: bg.intersection(&gapped).count(),
            },
        );

        let miss_fg: Vec<String> = fg.intersection(&missing).cloned().collect();
        let miss_bg: Vec<String> = bg.intersection(&missing).cloned().collect();
        miss_counts.insert(
            trait_name.clone(),
            GroupCounts {
                foreground: miss_fg.len(),
                background: miss_bg.len(),
            },
        );

        let mut trait_missing = miss_fg;
        trait_missing.extend(miss_bg);
        trait_missing.sort();
        missing_by_trait.insert(trait_name.clone(), trait_missing);
    }

    ProcessedPosition {
        position: column.index,
        residue_species,
        foreground_residues,
        background_residues,
        ungapped_foreground,
        ungapped_background,
        gap_counts,
        miss_counts,
        missing_by_trait,
        gapped,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TraitGroup;

    fn column(entries: &[(&str, char)]) -> AlignmentColumn {
        let residues = entries
            .iter()
            .map(|(s, r)| (s.to_string(), *r))
            .collect();
        AlignmentColumn::new(7, residues)
    }

    fn alignment_species(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn residues_accumulate_per_species() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Background, "t"),
            ("D", TraitGroup::Background, "t"),
        ]);
        let col = column(&[("A", 'M'), ("B", 'M'), ("C", 'L'), ("D", 'L'), ("E", '-')]);
        let species = alignment_species(&["A", "B", "C", "D", "E"]);

        let processed = process(&col, &traits, &species);

        assert_eq!(processed.position, 7);
        assert_eq!(processed.foreground_residues["t"], vec!['M', 'M']);
        assert_eq!(processed.background_residues["t"], vec!['L', 'L']);

        // E is gapped but not in the trait, so counts stay at zero
        assert_eq!(processed.gap_counts["t"], GroupCounts::default());
        assert_eq!(processed.miss_counts["t"], GroupCounts::default());
        assert!(processed.gapped.contains("E"));
        assert!(processed.missing.is_empty());
    }

    #[test]
    fn gapped_trait_member_is_counted_not_listed() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Background, "t"),
            ("D", TraitGroup::Background, "t"),
            ("E", TraitGroup::Background, "t"),
        ]);
        let col = column(&[("A", 'M'), ("B", 'M'), ("C", 'L'), ("D", 'L'), ("E", '-')]);
        let species = alignment_species(&["A", "B", "C", "D", "E"]);

        let processed = process(&col, &traits, &species);

        // E contributes no residue to the background list
        assert_eq!(processed.background_residues["t"], vec!['L', 'L']);
        assert_eq!(processed.gap_counts["t"].background, 1);
        assert_eq!(processed.gap_counts["t"].total(), 1);
        assert_eq!(
            processed.ungapped_background["t"],
            vec!["C".to_string(), "D".to_string()]
        );
    }

    #[test]
    fn absent_species_is_missing_never_gapped() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Background, "t"),
            ("X", TraitGroup::Background, "t"),
        ]);
        // X is in the trait design but not in the alignment at all
        let col = column(&[("A", 'M'), ("B", 'M'), ("C", 'L')]);
        let species = alignment_species(&["A", "B", "C"]);

        let processed = process(&col, &traits, &species);

        assert!(processed.missing.contains("X"));
        assert!(!processed.gapped.contains("X"));
        assert_eq!(processed.miss_counts["t"].background, 1);
        assert_eq!(processed.gap_counts["t"].background, 0);
        assert_eq!(processed.missing_by_trait["t"], vec!["X".to_string()]);
    }

    #[test]
    fn trait_partition_is_disjoint_and_exhaustive() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Foreground, "t"),
            ("C", TraitGroup::Foreground, "t"),
            ("D", TraitGroup::Background, "t"),
            ("E", TraitGroup::Background, "t"),
            ("X", TraitGroup::Background, "t"),
        ]);
        let col = column(&[("A", 'M'), ("B", '-'), ("C", 'M'), ("D", 'L'), ("E", 'L')]);
        let species = alignment_species(&["A", "B", "C", "D", "E"]);

        let processed = process(&col, &traits, &species);

        for (side, ungapped) in [
            (
                traits.foreground("t").unwrap(),
                &processed.ungapped_foreground["t"],
            ),
            (
                traits.background("t").unwrap(),
                &processed.ungapped_background["t"],
            ),
        ] {
            let ungapped: BTreeSet<&String> = ungapped.iter().collect();
            let gapped: BTreeSet<&String> = side
                .iter()
                .filter(|s| processed.gapped.contains(*s))
                .collect();
            let missing: BTreeSet<&String> = side
                .iter()
                .filter(|s| processed.missing.contains(*s))
                .collect();

            // Pairwise disjoint
            assert!(ungapped.is_disjoint(&gapped));
            assert!(ungapped.is_disjoint(&missing));
            assert!(gapped.is_disjoint(&missing));

            // Exhaustive over the trait side
            let union: BTreeSet<&String> = ungapped
                .iter()
                .chain(gapped.iter())
                .chain(missing.iter())
                .copied()
                .collect();
            let side_set: BTreeSet<&String> = side.iter().collect();
            assert_eq!(union, side_set);
        }
    }

    #[test]
    fn traits_without_background_residues_are_skipped() {
        let traits = TraitIndex::from_assignments(vec![
            ("A", TraitGroup::Foreground, "t"),
            ("B", TraitGroup::Background, "t"),
        ]);
        // The whole background is gapped
        let col = column(&[("A", 'M'), ("B", '-')]);
        let species = alignment_species(&["A", "B"]);

        let processed = process(&col, &traits, &species);
        assert!(processed.background_residues.is_empty());
        assert!(processed.gap_counts.is_empty());
        assert!(processed.valid_traits(traits.trait_names()).is_empty());
    }
}
