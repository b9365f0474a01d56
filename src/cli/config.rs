// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub alignment: Option<String>,
    pub ali_format: Option<String>,
    pub traits: Option<String>,
    pub tree: Option<String>,
    pub output: Option<String>,

    // Candidate filters
    pub max_fg_gaps: Option<usize>,
    pub max_bg_gaps: Option<usize>,
    pub max_gaps: Option<usize>,
    pub max_fg_miss: Option<usize>,
    pub max_bg_miss: Option<usize>,
    pub max_miss: Option<usize>,
    pub max_gaps_per_position: Option<f64>,
    pub patterns: Option<String>,
    pub changes_threshold: Option<usize>,

    // Resampling
    pub mode: Option<String>,
    pub cycles: Option<usize>,
    pub fg_size: Option<usize>,
    pub bg_size: Option<usize>,
    pub template: Option<String>,
    pub groupfile: Option<String>,
    pub phenotype: Option<String>,
    pub strategy: Option<String>,
    pub resampled: Option<String>,

    // Trait filtering
    pub include_traits: Option<String>,
    pub exclude_traits: Option<String>,

    // Performance
    pub threads: Option<usize>,
    pub seed: Option<u64>,

    // Flags
    pub pvalue: Option<bool>,
    pub report_filtered: Option<bool>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# caascan.toml - Configuration file for caascan
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Protein alignment file
alignment = "/path/to/gene.fasta"

# Alignment format: auto, fasta, phylip
ali_format = "auto"

# Binary trait file, or directory with one trait file each
traits = "/path/to/trait.cfg"

# Newick tree file (resampling)
# tree = "/path/to/species.nwk"

# Output file
output = "caas.tsv"

# =============================================================================
# CANDIDATE FILTERS
# =============================================================================

# Gap limits per position (omit for unbounded)
# max_fg_gaps = 1
# max_bg_gaps = 1
# max_gaps = 2

# Missing-species limits (omit for unbounded)
# max_fg_miss = 0
# max_bg_miss = 0
# max_miss = 0

# Maximum gap fraction for a column to be scanned
max_gaps_per_position = 0.5

# Admitted substitution patterns
patterns = "1,2,3"

# Minimum deviating residues per column (omit to derive from group sizes)
# changes_threshold = 2

# =============================================================================
# RESAMPLING
# =============================================================================

# Resampling mode: random, phylogeny-restricted-byfams, bm
mode = "random"

# Number of replicates
cycles = 1000

# Group sizes for random resampling (omit to read them from the template)
# fg_size = 5
# bg_size = 12

# Trait configuration file used as resampling template
# template = "/path/to/trait.cfg"

# Species-to-family file (phylogeny-restricted-byfams)
# groupfile = "/path/to/sp2fam.tab"

# Phenotype value table (bm)
# phenotype = "/path/to/phenotypes.tsv"

# Permulation selection strategy (bm)
strategy = "random"

# Resampled trait file (bootstrap input)
# resampled = "resampled.tab"

# =============================================================================
# TRAIT FILTERING
# =============================================================================

# Include only traits matching regex pattern
# include_traits = "longevity.*"

# Exclude traits matching regex pattern
# exclude_traits = "control.*"

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for auto-detection)
# threads = 16

# Random seed for reproducible resampling
# seed = 42

# =============================================================================
# FLAGS
# =============================================================================

# Compute hypergeometric p-values for convergent calls
pvalue = false

# Print how many candidates each filter rejected
report_filtered = false

# Validate inputs without computation (dry run)
dry_run = false
"#
        .to_string()
    }
}
