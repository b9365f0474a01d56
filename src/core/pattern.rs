// pattern.rs - Convergence test and substitution pattern classification

use std::collections::BTreeSet;

/// Substitution pattern of a convergent call, by the number of distinct
/// residues on each side of the trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pattern {
    /// 1-vs-1: the cleanest convergent-substitution signal
    OneToOne,
    /// 1-vs-many
    OneToMany,
    /// many-vs-1
    ManyToOne,
    /// many-vs-many
    ManyToMany,
}

impl Pattern {
    pub fn code(&self) -> &'static str {
        match self {
            Pattern::OneToOne => "1",
            Pattern::OneToMany => "2",
            Pattern::ManyToOne => "3",
            Pattern::ManyToMany => "4",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, String> {
        match code {
            "1" => Ok(Pattern::OneToOne),
            "2" => Ok(Pattern::OneToMany),
            "3" => Ok(Pattern::ManyToOne),
            "4" => Ok(Pattern::ManyToMany),
            other => Err(format!(
                "Invalid pattern code '{}'. Use: 1, 2, 3, 4",
                other
            )),
        }
    }
}

/// Outcome of classifying one trait at one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternResult {
    /// Sorted distinct foreground residues, concatenated ("AT")
    pub foreground_tag: String,
    /// Sorted distinct background residues, concatenated
    pub background_tag: String,
    /// True iff the two distinct residue sets are disjoint
    pub convergent: bool,
    /// None when either side carries no residues (whole group gapped/missing)
    pub pattern: Option<Pattern>,
}

impl PatternResult {
    /// Substitution tag in the `fg/bg` form used in output records.
    pub fn substitution(&self) -> String {
        format!("{}/{}", self.foreground_tag, self.background_tag)
    }
}

/// Decide whether a foreground/background residue pair is a convergent
/// substitution, and classify its pattern.
///
/// Pure function of the two residue sequences; duplicates are collapsed
/// before any cardinality is taken, so `["M","M"]` vs `["L","L"]` is a
/// 1-vs-1 call.
pub fn classify(foreground: &[char], background: &[char]) -> PatternResult {
    let fg: BTreeSet<char> = foreground.iter().copied().collect();
    let bg: BTreeSet<char> = background.iter().copied().collect();

    let convergent = fg.is_disjoint(&bg);

    let pattern = match (fg.len(), bg.len()) {
        (0, _) | (_, 0) => None,
        (1, 1) => Some(Pattern::OneToOne),
        (1, _) => Some(Pattern::OneToMany),
        (_, 1) => Some(Pattern::ManyToOne),
        _ => Some(Pattern::ManyToMany),
    };

    PatternResult {
        foreground_tag: fg.iter().collect(),
        background_tag: bg.iter().collect(),
        convergent,
        pattern,
    }
}
