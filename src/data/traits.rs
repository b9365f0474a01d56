// traits.rs - Binary trait index data structures and loaders

use crate::error::MalformedTraitRecord;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Which side of a binary trait a species belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitGroup {
    Foreground,
    Background,
}

impl TraitGroup {
    /// Parse the group tag used in trait configuration files ("1" / "0")
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "1" => Some(TraitGroup::Foreground),
            "0" => Some(TraitGroup::Background),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            TraitGroup::Foreground => "1",
            TraitGroup::Background => "0",
        }
    }
}

/// One species' membership in one trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitMembership {
    pub trait_name: String,
    pub group: TraitGroup,
}

/// Bidirectional mapping between species and binary trait memberships.
///
/// Built once per run (or once per resampling replicate) from one or many
/// trait configuration files, immutable thereafter. Every species appearing
/// in at least one valid record is present in the species map; every trait
/// name is present in both the foreground and background maps, possibly with
/// empty sets (degenerate traits simply produce no convergent calls).
#[derive(Debug, Clone, Default)]
pub struct TraitIndex {
    species_memberships: HashMap<String, Vec<TraitMembership>>,
    foreground: HashMap<String, BTreeSet<String>>,
    background: HashMap<String, BTreeSet<String>>,
    trait_names: Vec<String>,
    cycles: usize,
}

impl TraitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from (species, group, trait) assignments.
    pub fn from_assignments<I, S>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (S, TraitGroup, S)>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for (species, group, trait_name) in assignments {
            index.insert(trait_name.into(), species.into(), group);
        }
        index
    }

    /// Load a single trait from a two-column configuration file
    /// (`species <ws> 1|0` per line). The trait is named after the file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let mut index = Self::new();
        index.load_trait_file(path)?;
        index.validate()?;
        Ok(index)
    }

    /// Load traits from a path: one trait per file for a directory, a
    /// single trait for a plain file.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    /// Load one trait per file from a directory of configuration files.
    pub fn from_dir(path: &Path) -> Result<Self, String> {
        let entries = std::fs::read_dir(path)
            .map_err(|e| format!("Failed to read traits directory '{}': {}", path.display(), e))?;

        let mut files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(format!(
                "Traits directory '{}' contains no files",
                path.display()
            ));
        }

        let mut index = Self::new();
        for file in &files {
            index.load_trait_file(file)?;
        }
        index.validate()?;
        Ok(index)
    }

    /// Reload a resampled trait ensemble from its tab-separated serialization
    /// (`trait <tab> fg,comma-joined <tab> bg,comma-joined` per line).
    /// The replicate count is the number of valid lines.
    pub fn revive(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open resampled traits '{}': {}", path.display(), e))?;
        let reader = BufReader::new(file);

        let mut index = Self::new();
        let mut cycles = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Failed to read line {}: {}", line_no + 1, e))?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                if !line.trim().is_empty() {
                    let record = MalformedTraitRecord {
                        line: line_no + 1,
                        content: line.clone(),
                    };
                    eprintln!("⚠️  Skipping {}", record);
                }
                continue;
            }

            let trait_name = fields[0];
            for species in fields[1].split(',').filter(|s| !s.is_empty()) {
                index.insert(trait_name.to_string(), species.to_string(), TraitGroup::Foreground);
            }
            for species in fields[2].split(',').filter(|s| !s.is_empty()) {
                index.insert(trait_name.to_string(), species.to_string(), TraitGroup::Background);
            }
            cycles += 1;
        }

        index.cycles = cycles;
        index.validate()?;
        Ok(index)
    }

    /// Parse one trait configuration file into this index. Lines that cannot
    /// be split into species + group are skipped with a log line, never fatal.
    fn load_trait_file(&mut self, path: &Path) -> Result<(), String> {
        let trait_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("Invalid trait file name: {}", path.display()))?
            .to_string();

        let file = File::open(path)
            .map_err(|e| format!("Failed to open trait file '{}': {}", path.display(), e))?;
        let reader = BufReader::new(file);

        self.ensure_trait(&trait_name);

        for (line_no, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Failed to read line {}: {}", line_no + 1, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let parsed = match (fields.next(), fields.next()) {
                (Some(species), Some(tag)) => {
                    TraitGroup::from_tag(tag).map(|group| (species.to_string(), group))
                }
                _ => None,
            };

            match parsed {
                Some((species, group)) => {
                    self.insert(trait_name.clone(), species, group);
                }
                None => {
                    let record = MalformedTraitRecord {
                        line: line_no + 1,
                        content: line.clone(),
                    };
                    eprintln!("⚠️  Skipping {}", record);
                }
            }
        }

        Ok(())
    }

    /// Register a trait name so both group maps carry an entry even when one
    /// side ends up empty.
    fn ensure_trait(&mut self, trait_name: &str) {
        if !self.foreground.contains_key(trait_name) {
            self.trait_names.push(trait_name.to_string());
            self.foreground.insert(trait_name.to_string(), BTreeSet::new());
            self.background.insert(trait_name.to_string(), BTreeSet::new());
        }
    }

    pub(crate) fn insert(&mut self, trait_name: String, species: String, group: TraitGroup) {
        self.ensure_trait(&trait_name);

        let side = match group {
            TraitGroup::Foreground => &mut self.foreground,
            TraitGroup::Background => &mut self.background,
        };
        side.entry(trait_name.clone())
            .or_default()
            .insert(species.clone());

        let membership = TraitMembership {
            trait_name,
            group,
        };
        let memberships = self.species_memberships.entry(species).or_default();
        if !memberships.contains(&membership) {
            memberships.push(membership);
        }
    }

    /// Check the foreground/background disjointness invariant of every trait.
    pub fn validate(&self) -> Result<(), String> {
        for name in &self.trait_names {
            let fg = &self.foreground[name];
            let bg = &self.background[name];
            let shared: Vec<&String> = fg.intersection(bg).collect();
            if !shared.is_empty() {
                return Err(format!(
                    "Trait '{}' assigns species to both groups: {}",
                    name,
                    shared
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }
        Ok(())
    }

    /// All trait names, in load order.
    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    /// Every species that appears in at least one valid record.
    pub fn species(&self) -> impl Iterator<Item = &String> {
        self.species_memberships.keys()
    }

    pub fn memberships(&self, species: &str) -> Option<&[TraitMembership]> {
        self.species_memberships.get(species).map(|v| v.as_slice())
    }

    pub fn foreground(&self, trait_name: &str) -> Option<&BTreeSet<String>> {
        self.foreground.get(trait_name)
    }

    pub fn background(&self, trait_name: &str) -> Option<&BTreeSet<String>> {
        self.background.get(trait_name)
    }

    /// A copy restricted to the traits `keep` accepts. Species only present
    /// through dropped traits disappear with them.
    pub fn retain_traits<F>(&self, keep: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mut filtered = Self::new();
        for name in self.trait_names.iter().filter(|n| keep(n.as_str())) {
            filtered.ensure_trait(name);
            for species in &self.foreground[name] {
                filtered.insert(name.clone(), species.clone(), TraitGroup::Foreground);
            }
            for species in &self.background[name] {
                filtered.insert(name.clone(), species.clone(), TraitGroup::Background);
            }
        }
        filtered.cycles = self.cycles.min(filtered.trait_names.len());
        filtered
    }

    /// Replicate count for a revived resampled ensemble (0 for a true trait
    /// index loaded from configuration files).
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub(crate) fn set_cycles(&mut self, cycles: usize) {
        self.cycles = cycles;
    }

    pub fn is_empty(&self) -> bool {
        self.trait_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> TraitIndex {
        TraitIndex::from_assignments(vec![
            ("human", TraitGroup::Foreground, "longevity"),
            ("chimp", TraitGroup::Foreground, "longevity"),
            ("mouse", TraitGroup::Background, "longevity"),
            ("rat", TraitGroup::Background, "longevity"),
        ])
    }

    #[test]
    fn builds_bidirectional_maps() {
        let index = sample_index();
        assert_eq!(index.trait_names(), &["longevity".to_string()]);

        let fg = index.foreground("longevity").unwrap();
        assert!(fg.contains("human") && fg.contains("chimp"));
        let bg = index.background("longevity").unwrap();
        assert!(bg.contains("mouse") && bg.contains("rat"));

        let memberships = index.memberships("human").unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].group, TraitGroup::Foreground);
    }

    #[test]
    fn species_may_differ_across_traits() {
        let mut index = sample_index();
        index.insert(
            "hibernation".to_string(),
            "human".to_string(),
            TraitGroup::Background,
        );

        assert_eq!(index.memberships("human").unwrap().len(), 2);
        assert!(index.validate().is_ok());
    }

    #[test]
    fn disjointness_violation_is_structural() {
        let index = TraitIndex::from_assignments(vec![
            ("human", TraitGroup::Foreground, "t1"),
            ("human", TraitGroup::Background, "t1"),
        ]);
        assert!(index.validate().is_err());
    }

    #[test]
    fn group_tags_round_trip() {
        assert_eq!(TraitGroup::from_tag("1"), Some(TraitGroup::Foreground));
        assert_eq!(TraitGroup::from_tag("0"), Some(TraitGroup::Background));
        assert_eq!(TraitGroup::from_tag("x"), None);
        assert_eq!(TraitGroup::Foreground.as_tag(), "1");
    }
}
