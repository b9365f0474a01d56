// engine.rs - Synthetic trait resampling strategies

use crate::data::{TraitGroup, TraitIndex};
use crate::error::MissingConfigurationInput;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::Command;

/// Resampling strategy for building the empirical null distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplingMode {
    /// Uniform draws of fixed-size disjoint groups
    Random,
    /// Within-family permutation preserving the template's family structure
    PhylogenyByFamilies,
    /// Brownian-motion permulations through the external R process
    BrownianMotion,
}

impl ResamplingMode {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name {
            "random" => Ok(ResamplingMode::Random),
            "phylogeny-restricted-byfams" => Ok(ResamplingMode::PhylogenyByFamilies),
            "bm" => Ok(ResamplingMode::BrownianMotion),
            other => Err(format!(
                "Unrecognized resampling mode '{}'. Use: random, phylogeny-restricted-byfams, bm",
                other
            )),
        }
    }
}

/// Species → family grouping used by the family-stratified strategy.
#[derive(Debug, Clone, Default)]
pub struct FamilyMap {
    species_family: HashMap<String, String>,
    family_members: HashMap<String, Vec<String>>,
}

impl FamilyMap {
    /// Load a two-column `species <tab> family` file. Lines that do not
    /// split into two fields are skipped.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open group file '{}': {}", path.display(), e))?;
        let reader = BufReader::new(file);

        let mut map = Self::default();
        for line in reader.lines() {
            let line = line.map_err(|e| format!("Failed to read group file: {}", e))?;
            let mut fields = line.split('\t');
            if let (Some(species), Some(family)) = (fields.next(), fields.next()) {
                let species = species.trim();
                let family = family.trim();
                if species.is_empty() || family.is_empty() {
                    continue;
                }
                map.species_family
                    .insert(species.to_string(), family.to_string());
                map.family_members
                    .entry(family.to_string())
                    .or_default()
                    .push(species.to_string());
            }
        }
        for members in map.family_members.values_mut() {
            members.sort();
        }

        if map.species_family.is_empty() {
            return Err(format!(
                "Group file '{}' contains no species-family records",
                path.display()
            ));
        }
        Ok(map)
    }

    pub fn family_of(&self, species: &str) -> Option<&str> {
        self.species_family.get(species).map(|s| s.as_str())
    }

    pub fn members(&self, family: &str) -> Option<&[String]> {
        self.family_members.get(family).map(|v| v.as_slice())
    }
}

/// True foreground/background species of the trait being permuted.
#[derive(Debug, Clone)]
pub struct TraitTemplate {
    pub foreground: Vec<String>,
    pub background: Vec<String>,
}

impl TraitTemplate {
    /// Load a template from a binary trait configuration file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let index = TraitIndex::from_file(path)?;
        let name = index
            .trait_names()
            .first()
            .ok_or_else(|| format!("Template '{}' defines no trait", path.display()))?;
        Ok(Self {
            foreground: index
                .foreground(name)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default(),
            background: index
                .background(name)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default(),
        })
    }
}

/// Generator of synthetic trait partitions with the same group sizes as the
/// true trait. Seeded runs are reproducible; unseeded runs draw the seed
/// from the system RNG (same idiom as the simulation engines in this stack).
pub struct ResamplingEngine {
    rng: Xoshiro256PlusPlus,
}

impl ResamplingEngine {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_seed(rand::rng().random()),
        };
        Self { rng }
    }

    /// Uniform resampling: each replicate draws `fg_size` foreground species
    /// and `bg_size` further background species, disjoint, without
    /// replacement, labeled `b_1..b_N`.
    pub fn random(
        &mut self,
        species: &[String],
        fg_size: usize,
        bg_size: usize,
        cycles: usize,
    ) -> Result<TraitIndex, String> {
        if fg_size + bg_size > species.len() {
            return Err(format!(
                "Cannot draw {} + {} disjoint species from a pool of {}",
                fg_size,
                bg_size,
                species.len()
            ));
        }

        let mut index = TraitIndex::new();
        for cycle in 1..=cycles {
            let label = format!("b_{}", cycle);
            let draw: Vec<&String> = species
                .choose_multiple(&mut self.rng, fg_size + bg_size)
                .collect();

            for s in &draw[..fg_size] {
                index.insert(label.clone(), (*s).clone(), TraitGroup::Foreground);
            }
            for s in &draw[fg_size..] {
                index.insert(label.clone(), (*s).clone(), TraitGroup::Background);
            }
        }

        index.set_cycles(cycles);
        Ok(index)
    }

    /// Family-stratified permutation: every template species is replaced by
    /// a not-yet-used member of its own family, so each replicate keeps the
    /// template's family composition while permuting identities. Output
    /// sets are sorted before storage for reproducible downstream files.
    pub fn by_families(
        &mut self,
        template: &TraitTemplate,
        families: &FamilyMap,
        cycles: usize,
    ) -> Result<TraitIndex, String> {
        let mut index = TraitIndex::new();

        for cycle in 1..=cycles {
            let label = format!("b_{}", cycle);
            let mut used: BTreeSet<String> = BTreeSet::new();

            let mut resampled_fg = self.draw_within_families(
                &template.foreground,
                families,
                &mut used,
                &label,
            )?;
            let mut resampled_bg = self.draw_within_families(
                &template.background,
                families,
                &mut used,
                &label,
            )?;
            resampled_fg.sort();
            resampled_bg.sort();

            for s in resampled_fg {
                index.insert(label.clone(), s, TraitGroup::Foreground);
            }
            for s in resampled_bg {
                index.insert(label.clone(), s, TraitGroup::Background);
            }
        }

        index.set_cycles(cycles);
        Ok(index)
    }

    fn draw_within_families(
        &mut self,
        side: &[String],
        families: &FamilyMap,
        used: &mut BTreeSet<String>,
        label: &str,
    ) -> Result<Vec<String>, String> {
        let mut drawn = Vec::with_capacity(side.len());
        for species in side {
            let family = families.family_of(species).ok_or_else(|| {
                format!("Species '{}' has no family in the group file", species)
            })?;
            let members = families.members(family).unwrap_or(&[]);
            let pool: Vec<&String> = members.iter().filter(|m| !used.contains(*m)).collect();
            let replacement = pool.choose(&mut self.rng).ok_or_else(|| {
                format!(
                    "Family '{}' exhausted while resampling replicate {}",
                    family, label
                )
            })?;
            used.insert((*replacement).clone());
            drawn.push((*replacement).clone());
        }
        Ok(drawn)
    }
}

/// Brownian-motion permulations, delegated to the external R process.
///
/// This core only validates the inputs, drives the collaborator, and
/// revives the trait file it writes.
pub fn brownian_motion(
    tree_file: Option<&Path>,
    phenotype_file: Option<&Path>,
    template_file: &Path,
    cycles: usize,
    selection_strategy: &str,
    outfile: &Path,
) -> Result<TraitIndex, String> {
    let tree_file = tree_file.ok_or_else(|| {
        MissingConfigurationInput::new(
            "brownian motion resampling requires a rooted, fully dichotomic newick tree (--tree)",
        )
        .to_string()
    })?;
    let phenotype_file = phenotype_file.ok_or_else(|| {
        MissingConfigurationInput::new(
            "brownian motion resampling requires a tsv file with phenotype values (--phenotype)",
        )
        .to_string()
    })?;

    let status = Command::new("Rscript")
        .arg("permulations.r")
        .arg(tree_file)
        .arg(template_file)
        .arg(cycles.to_string())
        .arg(selection_strategy)
        .arg(phenotype_file)
        .arg(outfile)
        .status()
        .map_err(|e| format!("Failed to launch permulations process: {}", e))?;

    if !status.success() {
        return Err(format!(
            "Permulations process exited with status {}",
            status
        ));
    }

    TraitIndex::revive(outfile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("sp{:02}", i)).collect()
    }

    #[test]
    fn random_replicates_have_exact_disjoint_groups() {
        let species = pool(20);
        let mut engine = ResamplingEngine::new(Some(42));
        let index = engine.random(&species, 3, 4, 1000).unwrap();

        assert_eq!(index.cycles(), 1000);
        assert_eq!(index.trait_names().len(), 1000);

        for name in index.trait_names() {
            let fg = index.foreground(name).unwrap();
            let bg = index.background(name).unwrap();
            assert_eq!(fg.len(), 3);
            assert_eq!(bg.len(), 4);
            assert!(fg.is_disjoint(bg));
        }
    }

    #[test]
    fn random_replicates_spread_over_the_pool() {
        let species = pool(20);
        let mut engine = ResamplingEngine::new(Some(7));
        let index = engine.random(&species, 3, 4, 1000).unwrap();

        // No species is drawn into the foreground of every replicate
        for s in &species {
            let appearances = index
                .trait_names()
                .iter()
                .filter(|name| index.foreground(name).unwrap().contains(s))
                .count();
            assert!(appearances < 1000, "{} appears in every replicate", s);
            assert!(appearances > 0, "{} never drawn in 1000 replicates", s);
        }
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let species = pool(12);
        let a = ResamplingEngine::new(Some(9))
            .random(&species, 2, 3, 50)
            .unwrap();
        let b = ResamplingEngine::new(Some(9))
            .random(&species, 2, 3, 50)
            .unwrap();

        for name in a.trait_names() {
            assert_eq!(a.foreground(name), b.foreground(name));
            assert_eq!(a.background(name), b.background(name));
        }
    }

    #[test]
    fn oversized_draws_are_rejected() {
        let species = pool(5);
        let mut engine = ResamplingEngine::new(Some(1));
        assert!(engine.random(&species, 3, 4, 10).is_err());
    }

    #[test]
    fn family_resampling_preserves_family_structure() {
        let mut families = FamilyMap::default();
        for (species, family) in [
            ("a1", "A"),
            ("a2", "A"),
            ("a3", "A"),
            ("b1", "B"),
            ("b2", "B"),
            ("b3", "B"),
        ] {
            families
                .species_family
                .insert(species.to_string(), family.to_string());
            families
                .family_members
                .entry(family.to_string())
                .or_default()
                .push(species.to_string());
        }

        let template = TraitTemplate {
            foreground: vec!["a1".to_string(), "b1".to_string()],
            background: vec!["a2".to_string(), "b2".to_string()],
        };

        let mut engine = ResamplingEngine::new(Some(3));
        let index = engine.by_families(&template, &families, 100).unwrap();

        for name in index.trait_names() {
            let fg = index.foreground(name).unwrap();
            let bg = index.background(name).unwrap();
            assert!(fg.is_disjoint(bg));

            // One member of each family per side, mirroring the template
            for side in [fg, bg] {
                let a_count = side.iter().filter(|s| s.starts_with('a')).count();
                let b_count = side.iter().filter(|s| s.starts_with('b')).count();
                assert_eq!(a_count, 1);
                assert_eq!(b_count, 1);
            }
        }
    }

    #[test]
    fn exhausted_family_is_an_error() {
        let mut families = FamilyMap::default();
        families
            .species_family
            .insert("a1".to_string(), "A".to_string());
        families
            .family_members
            .insert("A".to_string(), vec!["a1".to_string()]);

        // Two template slots from a one-member family cannot both be filled
        let template = TraitTemplate {
            foreground: vec!["a1".to_string()],
            background: vec!["a1".to_string()],
        };

        let mut engine = ResamplingEngine::new(Some(5));
        assert!(engine.by_families(&template, &families, 1).is_err());
    }

    #[test]
    fn unknown_mode_is_fatal() {
        assert!(ResamplingMode::from_name("random").is_ok());
        assert!(ResamplingMode::from_name("jackknife").is_err());
    }
}
