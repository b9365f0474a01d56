// mod.rs - Result record and trait-assignment writers

use crate::core::{BootstrapLine, CaasRecord};
use crate::data::TraitIndex;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column header of the discovery result table.
pub const RECORD_HEADER: &str =
    "Gene\tTrait\tPosition\tSubstitution\tPvalue\tPattern\tFFGN\tFBGN\tGFG\tGBG\tMFG\tMBG\tFFG\tFBG\tMS";

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &Path) -> Result<(), String> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| {
                format!(
                    "Failed to create parent directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }
    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}

/// Append convergent-call records to a TSV result file. A freshly created
/// file gets the header line first; subsequent calls append records only,
/// so one file can accumulate calls across traits and genes.
pub fn write_caas_records(file_path: &Path, records: &[CaasRecord]) -> Result<(), String> {
    if records.is_empty() {
        return Ok(());
    }
    ensure_parent_dir(file_path)?;

    let fresh = !file_path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|e| format!("Failed to open output file '{}': {}", file_path.display(), e))?;
    let mut writer = BufWriter::new(file);

    if fresh {
        writeln!(writer, "{}", RECORD_HEADER).map_err(|e| format!("Write error: {}", e))?;
    }

    for record in records {
        let pvalue = match &record.pvalue {
            None => "NA".to_string(),
            // Anomalous values are clamped but kept visibly flagged
            Some(scored) if scored.anomalous => format!("{:.6e}*", scored.value),
            Some(scored) => format!("{:.6e}", scored.value),
        };

        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.gene,
            record.trait_name,
            record.position,
            record.substitution,
            pvalue,
            record.pattern.code(),
            record.fg_observed,
            record.bg_observed,
            record.gaps.foreground,
            record.gaps.background,
            record.missing.foreground,
            record.missing.background,
            join_or_dash(&record.fg_species),
            join_or_dash(&record.bg_species),
            join_or_dash(&record.missing_species),
        )
        .map_err(|e| format!("Write error: {}", e))?;
    }

    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    Ok(())
}

/// Persist a trait index (true or resampled) as tab-separated assignments:
/// `trait <tab> fg,comma-joined <tab> bg,comma-joined` per line. Reloading
/// through `TraitIndex::revive` reconstructs equivalent group sets.
pub fn write_trait_assignments(file_path: &Path, index: &TraitIndex) -> Result<(), String> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path)
        .map_err(|e| format!("Failed to create trait file '{}': {}", file_path.display(), e))?;
    let mut writer = BufWriter::new(file);

    for name in index.trait_names() {
        let fg: Vec<String> = index
            .foreground(name)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        let bg: Vec<String> = index
            .background(name)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        writeln!(writer, "{}\t{}\t{}", name, fg.join(","), bg.join(","))
            .map_err(|e| format!("Write error: {}", e))?;
    }

    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    Ok(())
}

/// Write per-position bootstrap lines:
/// `gene@pos <tab> hits <tab> cycles <tab> empirical-p <tab> traits <tab> template`.
pub fn write_bootstrap_lines(
    file_path: &Path,
    lines: &[BootstrapLine],
    template_label: &str,
) -> Result<(), String> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path).map_err(|e| {
        format!(
            "Failed to create bootstrap output '{}': {}",
            file_path.display(),
            e
        )
    })?;
    let mut writer = BufWriter::new(file);

    for line in lines {
        writeln!(
            writer,
            "{}@{}\t{}\t{}\t{}\t{}\t{}",
            line.gene,
            line.position,
            line.hits,
            line.cycles,
            line.empirical_pvalue(),
            line.hit_traits.join(","),
            template_label,
        )
        .map_err(|e| format!("Write error: {}", e))?;
    }

    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    Ok(())
}
