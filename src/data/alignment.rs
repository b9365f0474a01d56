// alignment.rs - MSA import and column slicing

use bio::io::fasta;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Gap symbol used throughout the engine.
pub const GAP: char = '-';

/// Supported alignment input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Fasta,
    Phylip,
}

impl AlignmentFormat {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.to_lowercase().as_str() {
            "fasta" => Ok(AlignmentFormat::Fasta),
            "phylip" => Ok(AlignmentFormat::Phylip),
            other => Err(format!(
                "Unsupported alignment format: {}. Use: auto, fasta, phylip",
                other
            )),
        }
    }

    /// Detect the format from the first non-blank byte of the file.
    pub fn detect(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open alignment '{}': {}", path.display(), e))?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line.map_err(|e| format!("Failed to read alignment: {}", e))?;
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            return match trimmed.chars().next() {
                Some('>') => Ok(AlignmentFormat::Fasta),
                Some(c) if c.is_ascii_digit() => Ok(AlignmentFormat::Phylip),
                _ => Err(format!(
                    "Could not detect alignment format of '{}'",
                    path.display()
                )),
            };
        }

        Err(format!("Alignment file '{}' is empty", path.display()))
    }
}

/// One alignment column: species id → residue symbol at that column.
#[derive(Debug, Clone)]
pub struct AlignmentColumn {
    /// 0-based column index in the source alignment
    pub index: usize,
    residues: HashMap<String, char>,
}

impl AlignmentColumn {
    pub fn new(index: usize, residues: HashMap<String, char>) -> Self {
        Self { index, residues }
    }

    pub fn residue(&self, species: &str) -> Option<char> {
        self.residues.get(species).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, char)> {
        self.residues.iter().map(|(s, &r)| (s, r))
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// One imported alignment, reduced to the columns that can still yield a
/// convergent call: gene name, deduplicated species list, retained columns.
#[derive(Debug, Clone)]
pub struct AlignmentSlice {
    pub gene: String,
    pub species: Vec<String>,
    pub columns: Vec<AlignmentColumn>,
    /// Column count before filtering
    pub total_columns: usize,
}

impl AlignmentSlice {
    /// Import an alignment file and keep only the informative columns.
    ///
    /// A column is retained when its gap fraction is at most `max_gap_ratio`
    /// and the residues outside the majority symbol number at least
    /// `change_threshold` (a column more conserved than that cannot produce
    /// a convergent call worth testing).
    pub fn from_file(
        path: &Path,
        format: Option<AlignmentFormat>,
        change_threshold: usize,
        max_gap_ratio: f64,
    ) -> Result<Self, String> {
        let format = match format {
            Some(f) => f,
            None => AlignmentFormat::detect(path)?,
        };

        let records = match format {
            AlignmentFormat::Fasta => read_fasta(path)?,
            AlignmentFormat::Phylip => read_phylip(path)?,
        };

        if records.is_empty() {
            return Err(format!("Alignment '{}' has no sequences", path.display()));
        }

        let length = records[0].1.len();
        for (id, seq) in &records {
            if seq.len() != length {
                return Err(format!(
                    "Sequence '{}' has length {} but alignment length is {}",
                    id,
                    seq.len(),
                    length
                ));
            }
        }

        let gene = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.split('.').next().unwrap_or(n).to_string())
            .ok_or_else(|| format!("Invalid alignment file name: {}", path.display()))?;

        let mut seen = HashSet::new();
        let mut species = Vec::new();
        for (id, _) in &records {
            if seen.insert(id.clone()) {
                species.push(id.clone());
            }
        }

        let sequences: Vec<(&str, Vec<char>)> = records
            .iter()
            .map(|(id, seq)| (id.as_str(), seq.chars().collect()))
            .collect();

        let mut columns = Vec::new();
        for index in 0..length {
            let symbols: Vec<char> = sequences.iter().map(|(_, seq)| seq[index]).collect();
            if !column_passes(&symbols, change_threshold, max_gap_ratio) {
                continue;
            }

            let mut residues = HashMap::with_capacity(sequences.len());
            for (id, seq) in &sequences {
                residues.insert((*id).to_string(), seq[index]);
            }
            columns.push(AlignmentColumn::new(index, residues));
        }

        Ok(Self {
            gene,
            species,
            columns,
            total_columns: length,
        })
    }
}

/// Column retention test: gap ratio, then minimum residue diversity.
///
/// The diversity count is the number of residues outside the most common
/// non-gap symbol ("second-most-common and below"), matching the idea that a
/// convergent call needs at least that many deviating sequences.
pub fn column_passes(symbols: &[char], change_threshold: usize, max_gap_ratio: f64) -> bool {
    if symbols.is_empty() {
        return false;
    }

    let gaps = symbols.iter().filter(|&&c| c == GAP).count();
    let gap_ratio = gaps as f64 / symbols.len() as f64;
    if gap_ratio > max_gap_ratio {
        return false;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for &c in symbols {
        if c != GAP {
            *counts.entry(c).or_insert(0) += 1;
        }
    }

    let seconds = match counts.values().max() {
        None => 0,
        Some(&top) => counts.values().sum::<usize>() - top,
    };

    seconds >= change_threshold
}

/// Derive the column change threshold from the trait design: the smallest
/// group size after discounting the gaps and missing species the filters
/// still admit. Columns with fewer deviating residues than this cannot pass
/// the downstream gap/missing filters for any trait.
pub fn derive_change_threshold(
    fg_size: usize,
    bg_size: usize,
    allowed_fg_nulls: usize,
    allowed_bg_nulls: usize,
) -> usize {
    let fg_threshold = fg_size.saturating_sub(allowed_fg_nulls);
    let bg_threshold = bg_size.saturating_sub(allowed_bg_nulls);
    fg_threshold.min(bg_threshold)
}

fn read_fasta(path: &Path) -> Result<Vec<(String, String)>, String> {
    let reader = fasta::Reader::from_file(path)
        .map_err(|e| format!("Failed to open alignment '{}': {}", path.display(), e))?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Failed to read FASTA record: {}", e))?;
        let seq = String::from_utf8(record.seq().to_vec())
            .map_err(|e| format!("Non-UTF8 sequence in '{}': {}", record.id(), e))?;
        records.push((record.id().to_string(), seq.to_uppercase()));
    }
    Ok(records)
}

/// Relaxed sequential PHYLIP: a `<count> <length>` header line followed by
/// one `name sequence` line per species.
fn read_phylip(path: &Path) -> Result<Vec<(String, String)>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open alignment '{}': {}", path.display(), e))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or("Empty PHYLIP file")?
        .map_err(|e| format!("Failed to read PHYLIP header: {}", e))?;
    let mut header_fields = header.split_whitespace();
    let count: usize = header_fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or("PHYLIP header must start with the sequence count")?;
    let length: usize = header_fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or("PHYLIP header must carry the alignment length")?;

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.map_err(|e| format!("Failed to read line {}: {}", line_no + 2, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let id = fields
            .next()
            .ok_or_else(|| format!("Malformed PHYLIP line {}", line_no + 2))?;
        let seq: String = fields.collect::<Vec<_>>().concat().to_uppercase();
        if seq.len() != length {
            return Err(format!(
                "PHYLIP sequence '{}' has length {} but header declares {}",
                id,
                seq.len(),
                length
            ));
        }
        records.push((id.to_string(), seq));
    }

    if records.len() != count {
        return Err(format!(
            "PHYLIP header declares {} sequences but file holds {}",
            count,
            records.len()
        ));
    }
    Ok(records)
}
