// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.alignment.is_none() {
            self.alignment = config.alignment;
        }
        if self.ali_format == "auto" && config.ali_format.is_some() {
            self.ali_format = config.ali_format.unwrap();
        }
        if self.traits.is_none() {
            self.traits = config.traits;
        }
        if self.tree.is_none() {
            self.tree = config.tree;
        }
        if self.output.is_none() {
            self.output = config.output;
        }

        // Candidate filters
        if self.max_fg_gaps.is_none() {
            self.max_fg_gaps = config.max_fg_gaps;
        }
        if self.max_bg_gaps.is_none() {
            self.max_bg_gaps = config.max_bg_gaps;
        }
        if self.max_gaps.is_none() {
            self.max_gaps = config.max_gaps;
        }
        if self.max_fg_miss.is_none() {
            self.max_fg_miss = config.max_fg_miss;
        }
        if self.max_bg_miss.is_none() {
            self.max_bg_miss = config.max_bg_miss;
        }
        if self.max_miss.is_none() {
            self.max_miss = config.max_miss;
        }
        if self.max_gaps_per_position == 0.5 && config.max_gaps_per_position.is_some() {
            self.max_gaps_per_position = config.max_gaps_per_position.unwrap();
        }
        if self.patterns == "1,2,3" && config.patterns.is_some() {
            self.patterns = config.patterns.unwrap();
        }
        if self.changes_threshold.is_none() {
            self.changes_threshold = config.changes_threshold;
        }

        // Resampling
        if self.mode == "random" && config.mode.is_some() {
            self.mode = config.mode.unwrap();
        }
        if self.cycles == 1000 && config.cycles.is_some() {
            self.cycles = config.cycles.unwrap();
        }
        if self.fg_size.is_none() {
            self.fg_size = config.fg_size;
        }
        if self.bg_size.is_none() {
            self.bg_size = config.bg_size;
        }
        if self.template.is_none() {
            self.template = config.template;
        }
        if self.groupfile.is_none() {
            self.groupfile = config.groupfile;
        }
        if self.phenotype.is_none() {
            self.phenotype = config.phenotype;
        }
        if self.strategy == "random" && config.strategy.is_some() {
            self.strategy = config.strategy.unwrap();
        }
        if self.resampled.is_none() {
            self.resampled = config.resampled;
        }

        // Trait filtering
        if self.include_traits.is_none() {
            self.include_traits = config.include_traits;
        }
        if self.exclude_traits.is_none() {
            self.exclude_traits = config.exclude_traits;
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.seed.is_none() {
            self.seed = config.seed;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.pvalue && config.pvalue.unwrap_or(false) {
            self.pvalue = true;
        }
        if !self.report_filtered && config.report_filtered.unwrap_or(false) {
            self.report_filtered = true;
        }
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
