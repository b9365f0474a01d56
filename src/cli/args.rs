// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// caascan - Convergent amino acid substitution scanner
pub struct Args {
    /// tool to run: discovery, bootstrap, resample (default: discovery)
    #[argh(option, default = "String::from(\"discovery\")")]
    pub tool: String,

    /// path to the protein alignment file
    #[argh(option)]
    pub alignment: Option<String>,

    /// alignment format: auto, fasta, phylip (default: auto)
    #[argh(option, default = "String::from(\"auto\")")]
    pub ali_format: String,

    /// path to a binary trait file, or a directory with one trait file each
    #[argh(option)]
    pub traits: Option<String>,

    /// path to a newick tree file
    #[argh(option)]
    pub tree: Option<String>,

    /// output file
    #[argh(option)]
    pub output: Option<String>,

    /// compute hypergeometric p-values for convergent calls
    #[argh(switch)]
    pub pvalue: bool,

    /// maximum foreground gaps per position (default: unbounded)
    #[argh(option)]
    pub max_fg_gaps: Option<usize>,

    /// maximum background gaps per position (default: unbounded)
    #[argh(option)]
    pub max_bg_gaps: Option<usize>,

    /// maximum overall gaps per position (default: unbounded)
    #[argh(option)]
    pub max_gaps: Option<usize>,

    /// maximum missing foreground species (default: unbounded)
    #[argh(option)]
    pub max_fg_miss: Option<usize>,

    /// maximum missing background species (default: unbounded)
    #[argh(option)]
    pub max_bg_miss: Option<usize>,

    /// maximum missing species overall (default: unbounded)
    #[argh(option)]
    pub max_miss: Option<usize>,

    /// maximum gap fraction for a column to be scanned (default: 0.5)
    #[argh(option, default = "0.5")]
    pub max_gaps_per_position: f64,

    /// admitted substitution patterns, comma-separated (default: 1,2,3)
    #[argh(option, default = "String::from(\"1,2,3\")")]
    pub patterns: String,

    /// minimum deviating residues per column (default: derived from the
    /// trait group sizes and the gap/missing limits)
    #[argh(option)]
    pub changes_threshold: Option<usize>,

    /// resampling mode: random, phylogeny-restricted-byfams, bm (default: random)
    #[argh(option, default = "String::from(\"random\")")]
    pub mode: String,

    /// number of resampling replicates (default: 1000)
    #[argh(option, default = "1000")]
    pub cycles: usize,

    /// foreground group size for random resampling (default: from template)
    #[argh(option)]
    pub fg_size: Option<usize>,

    /// background group size for random resampling (default: from template)
    #[argh(option)]
    pub bg_size: Option<usize>,

    /// trait configuration file used as resampling template
    #[argh(option)]
    pub template: Option<String>,

    /// species-to-family file for phylogeny-restricted resampling
    #[argh(option)]
    pub groupfile: Option<String>,

    /// phenotype value table for brownian-motion permulations
    #[argh(option)]
    pub phenotype: Option<String>,

    /// permulation selection strategy (default: random)
    #[argh(option, default = "String::from(\"random\")")]
    pub strategy: String,

    /// resampled trait file produced by the resample tool (bootstrap input)
    #[argh(option)]
    pub resampled: Option<String>,

    /// include only traits matching regex pattern
    #[argh(option)]
    pub include_traits: Option<String>,

    /// exclude traits matching regex pattern
    #[argh(option)]
    pub exclude_traits: Option<String>,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// random seed for reproducible resampling
    #[argh(option)]
    pub seed: Option<u64>,

    /// print how many candidates each filter rejected
    #[argh(switch)]
    pub report_filtered: bool,

    /// validate inputs without computation (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
