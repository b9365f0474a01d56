// validation.rs - Input validation utilities

use crate::cli::args::Args;
use crate::core::{Pattern, PositionFilters, Thresholds};
use crate::data::AlignmentFormat;
use crate::error::MissingConfigurationInput;
use crate::resample::ResamplingMode;
use regex::Regex;
use std::collections::BTreeSet;

pub struct ValidationResult {
    pub filters: PositionFilters,
    /// None requests format auto-detection
    pub format: Option<AlignmentFormat>,
    pub mode: ResamplingMode,
    pub include_traits_regex: Option<Regex>,
    pub exclude_traits_regex: Option<Regex>,
}

fn require<'a>(field: &'a Option<String>, message: &str) -> Result<&'a String, String> {
    field
        .as_ref()
        .ok_or_else(|| MissingConfigurationInput::new(message).to_string())
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    if !matches!(args.tool.as_str(), "discovery" | "bootstrap" | "resample") {
        return Err(format!(
            "Unknown tool '{}'. Use: discovery, bootstrap, resample",
            args.tool
        ));
    }

    // Alignment format
    let format = if args.ali_format == "auto" {
        None
    } else {
        Some(AlignmentFormat::from_name(&args.ali_format)?)
    };

    // Admitted patterns
    let admitted_patterns: BTreeSet<Pattern> = args
        .patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(Pattern::from_code)
        .collect::<Result<_, _>>()?;
    if admitted_patterns.is_empty() {
        return Err("No admitted patterns configured (--patterns)".to_string());
    }

    if !(0.0..=1.0).contains(&args.max_gaps_per_position) {
        return Err(format!(
            "--max-gaps-per-position must lie in [0, 1], got {}",
            args.max_gaps_per_position
        ));
    }

    let mode = ResamplingMode::from_name(&args.mode)?;

    let include_traits_regex = args
        .include_traits
        .as_ref()
        .map(|p| Regex::new(p).map_err(|e| format!("Invalid --include-traits regex: {}", e)))
        .transpose()?;
    let exclude_traits_regex = args
        .exclude_traits
        .as_ref()
        .map(|p| Regex::new(p).map_err(|e| format!("Invalid --exclude-traits regex: {}", e)))
        .transpose()?;

    // Per-tool required inputs, reported immediately
    match args.tool.as_str() {
        "discovery" => {
            require(&args.alignment, "discovery requires --alignment")?;
            require(&args.traits, "discovery requires --traits")?;
            require(&args.output, "discovery requires --output")?;
        }
        "bootstrap" => {
            require(&args.alignment, "bootstrap requires --alignment")?;
            require(
                &args.resampled,
                "bootstrap requires --resampled (a file written by the resample tool)",
            )?;
            require(&args.output, "bootstrap requires --output")?;
        }
        "resample" => {
            require(&args.output, "resample requires --output")?;
            match mode {
                ResamplingMode::Random => {
                    require(&args.tree, "random resampling requires --tree")?;
                    let sized = args.fg_size.is_some() && args.bg_size.is_some();
                    if !sized && args.template.is_none() {
                        return Err(MissingConfigurationInput::new(
                            "random resampling requires --fg-size and --bg-size, or --template",
                        )
                        .to_string());
                    }
                }
                ResamplingMode::PhylogenyByFamilies => {
                    require(
                        &args.template,
                        "phylogeny-restricted resampling requires --template",
                    )?;
                    require(
                        &args.groupfile,
                        "phylogeny-restricted resampling requires --groupfile",
                    )?;
                }
                ResamplingMode::BrownianMotion => {
                    require(&args.template, "brownian motion resampling requires --template")?;
                    require(
                        &args.tree,
                        "brownian motion resampling requires a rooted, fully dichotomic newick tree (--tree)",
                    )?;
                    require(
                        &args.phenotype,
                        "brownian motion resampling requires a tsv file with phenotype values (--phenotype)",
                    )?;
                }
            }
        }
        _ => unreachable!(),
    }

    let filters = PositionFilters {
        max_gaps: Thresholds {
            foreground: args.max_fg_gaps,
            background: args.max_bg_gaps,
            overall: args.max_gaps,
        },
        max_missing: Thresholds {
            foreground: args.max_fg_miss,
            background: args.max_bg_miss,
            overall: args.max_miss,
        },
        admitted_patterns,
    };

    Ok(ValidationResult {
        filters,
        format,
        mode,
        include_traits_regex,
        exclude_traits_regex,
    })
}
