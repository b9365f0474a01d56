// main.rs - CLI entry point

use caascan::cli::Config;
use caascan::data::alignment::derive_change_threshold;
use caascan::prelude::*;
use caascan::resample::{brownian_motion, FamilyMap, TraitTemplate};
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    println!("🧬 caascan v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "🕒 Started: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        println!("🧵 Threads: {}", n);
    } else {
        println!("🧵 Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    // Validate all arguments
    let validation = validate_args(&args)?;

    let total_start = Instant::now();

    match args.tool.as_str() {
        "discovery" => run_discovery(&args, &validation)?,
        "bootstrap" => run_bootstrap(&args, &validation)?,
        "resample" => run_resample(&args, &validation)?,
        _ => unreachable!("tool validated above"),
    }

    println!(
        "✅ Completed in {:.2}s",
        total_start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// The change threshold a column must meet to be worth scanning: the
/// smallest trait group size after discounting the nulls the filters admit.
fn slice_change_threshold(args: &Args, traits: &TraitIndex, filters: &PositionFilters) -> usize {
    if let Some(threshold) = args.changes_threshold {
        return threshold;
    }

    let allowed_fg =
        filters.max_gaps.allowed_foreground() + filters.max_missing.allowed_foreground();
    let allowed_bg =
        filters.max_gaps.allowed_background() + filters.max_missing.allowed_background();

    traits
        .trait_names()
        .iter()
        .filter_map(|name| {
            let fg = traits.foreground(name)?.len();
            let bg = traits.background(name)?.len();
            Some(derive_change_threshold(fg, bg, allowed_fg, allowed_bg))
        })
        .min()
        .unwrap_or(1)
}

fn load_filtered_traits(args: &Args, validation: &ValidationResult) -> Result<TraitIndex, String> {
    let traits_path = args.traits.as_ref().ok_or("--traits is required")?;
    let mut traits = TraitIndex::from_path(Path::new(traits_path))?;

    if validation.include_traits_regex.is_some() || validation.exclude_traits_regex.is_some() {
        let before = traits.trait_names().len();
        traits = traits.retain_traits(|name| {
            if let Some(regex) = &validation.include_traits_regex {
                if !regex.is_match(name) {
                    return false;
                }
            }
            if let Some(regex) = &validation.exclude_traits_regex {
                if regex.is_match(name) {
                    return false;
                }
            }
            true
        });
        let after = traits.trait_names().len();
        if before != after {
            println!("Trait filters: kept {} traits (removed {})", after, before - after);
        }
    }

    if traits.is_empty() {
        return Err("No traits remain after filtering".to_string());
    }
    Ok(traits)
}

fn run_discovery(args: &Args, validation: &ValidationResult) -> Result<(), String> {
    let traits = load_filtered_traits(args, validation)?;
    println!("📊 Traits: {} loaded", traits.trait_names().len());

    let change_threshold = slice_change_threshold(args, &traits, &validation.filters);
    let alignment_path = args.alignment.as_ref().ok_or("--alignment is required")?;
    let slice = AlignmentSlice::from_file(
        Path::new(alignment_path),
        validation.format,
        change_threshold,
        args.max_gaps_per_position,
    )?;
    println!(
        "🧬 Alignment: gene '{}', {} species, {} of {} columns retained",
        slice.gene,
        slice.species.len(),
        slice.columns.len(),
        slice.total_columns
    );

    if args.dry_run {
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    let outcome = discover(&slice, &traits, &validation.filters, args.pvalue, true);

    let output = PathBuf::from(args.output.as_ref().ok_or("--output is required")?);
    write_caas_records(&output, &outcome.records)?;
    println!(
        "✅ {} convergent calls written to: {}",
        outcome.records.len(),
        output.display()
    );

    if args.report_filtered {
        println!("📋 Filtered candidates:");
        for (reason, count) in outcome.rejection_counts() {
            println!("  • {}: {}", reason, count);
        }
    }

    Ok(())
}

fn run_bootstrap(args: &Args, validation: &ValidationResult) -> Result<(), String> {
    let resampled_path = PathBuf::from(args.resampled.as_ref().ok_or("--resampled is required")?);
    let resampled = TraitIndex::revive(&resampled_path)?;
    println!("📊 Resampled traits: {} replicates", resampled.cycles());

    let change_threshold = slice_change_threshold(args, &resampled, &validation.filters);
    let alignment_path = args.alignment.as_ref().ok_or("--alignment is required")?;
    let slice = AlignmentSlice::from_file(
        Path::new(alignment_path),
        validation.format,
        change_threshold,
        args.max_gaps_per_position,
    )?;
    println!(
        "🧬 Alignment: gene '{}', {} species, {} of {} columns retained",
        slice.gene,
        slice.species.len(),
        slice.columns.len(),
        slice.total_columns
    );

    if args.dry_run {
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    let lines = bootstrap(&slice, &resampled, &validation.filters, true);

    let template_label = resampled_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("resampled")
        .to_string();
    let output = PathBuf::from(args.output.as_ref().ok_or("--output is required")?);
    write_bootstrap_lines(&output, &lines, &template_label)?;
    println!(
        "✅ {} positions written to: {}",
        lines.len(),
        output.display()
    );

    Ok(())
}

fn run_resample(args: &Args, validation: &ValidationResult) -> Result<(), String> {
    let output = PathBuf::from(args.output.as_ref().ok_or("--output is required")?);

    match validation.mode {
        ResamplingMode::Random => {
            let tree_path = args.tree.as_ref().ok_or("--tree is required")?;
            let topology = PhylogeneticTopology::from_newick_file(Path::new(tree_path))
                .map_err(|e| e.to_string())?;
            println!(
                "🌳 Tree: {} species, {} leaf pairs, farthest anchor '{}'",
                topology.species.len(),
                topology.pair_count(),
                topology.farthest
            );

            let (fg_size, bg_size) = match (args.fg_size, args.bg_size) {
                (Some(fg), Some(bg)) => (fg, bg),
                _ => {
                    let template_path = args.template.as_ref().ok_or("--template is required")?;
                    let template = TraitTemplate::from_file(Path::new(template_path))?;
                    (template.foreground.len(), template.background.len())
                }
            };
            println!(
                "🎲 Mode: random, {} cycles, groups {}+{}",
                args.cycles, fg_size, bg_size
            );

            if args.dry_run {
                println!("✅ Dry run completed successfully");
                return Ok(());
            }

            let mut engine = ResamplingEngine::new(args.seed);
            let index = engine.random(&topology.species, fg_size, bg_size, args.cycles)?;
            write_trait_assignments(&output, &index)?;
            println!(
                "✅ {} replicates written to: {}",
                index.cycles(),
                output.display()
            );
        }

        ResamplingMode::PhylogenyByFamilies => {
            let template_path = args.template.as_ref().ok_or("--template is required")?;
            let template = TraitTemplate::from_file(Path::new(template_path))?;
            let groupfile_path = args.groupfile.as_ref().ok_or("--groupfile is required")?;
            let families = FamilyMap::from_file(Path::new(groupfile_path))?;
            println!(
                "🎲 Mode: phylogeny-restricted-byfams, {} cycles, groups {}+{}",
                args.cycles,
                template.foreground.len(),
                template.background.len()
            );

            if args.dry_run {
                println!("✅ Dry run completed successfully");
                return Ok(());
            }

            let mut engine = ResamplingEngine::new(args.seed);
            let index = engine.by_families(&template, &families, args.cycles)?;
            write_trait_assignments(&output, &index)?;
            println!(
                "✅ {} replicates written to: {}",
                index.cycles(),
                output.display()
            );
        }

        ResamplingMode::BrownianMotion => {
            let template_path = args.template.as_ref().ok_or("--template is required")?;
            println!(
                "🎲 Mode: bm (external permulations), {} cycles, strategy '{}'",
                args.cycles, args.strategy
            );

            if args.dry_run {
                println!("✅ Dry run completed successfully");
                return Ok(());
            }

            let index = brownian_motion(
                args.tree.as_deref().map(Path::new),
                args.phenotype.as_deref().map(Path::new),
                Path::new(template_path),
                args.cycles,
                &args.strategy,
                &output,
            )?;
            println!(
                "✅ {} permulations written to: {}",
                index.cycles(),
                output.display()
            );
        }
    }

    Ok(())
}
