// hyper.rs - Hypergeometric significance scoring of residue partitions

use crate::data::GAP;
use crate::error::NumericAnomaly;
use std::collections::BTreeMap;

/// Floating tolerance for the `[0, 1]` p-value range contract.
pub const PVALUE_EPSILON: f64 = 1e-9;

/// A position p-value together with its range-check outcome.
///
/// The inclusion-exclusion correction can push the raw sum outside `[0, 1]`
/// for some symbol-frequency distributions. The stored value is clamped; the
/// flag records that the raw value violated the range contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPvalue {
    pub value: f64,
    pub anomalous: bool,
}

/// Count non-gap symbols into a frequency table.
pub fn symbol_frequencies<I>(symbols: I) -> BTreeMap<char, usize>
where
    I: IntoIterator<Item = char>,
{
    let mut frequencies = BTreeMap::new();
    for symbol in symbols {
        if symbol != GAP {
            *frequencies.entry(symbol).or_insert(0) += 1;
        }
    }
    frequencies
}

fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|i| (i as f64).ln()).sum()
}

fn ln_choose(n: usize, k: usize) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Hypergeometric probability mass: drawing `draws` cards without
/// replacement from a population of `population` cards of which `successes`
/// are marked, the probability of exactly `observed` marked cards in hand.
fn hypergeometric_pmf(population: usize, successes: usize, draws: usize, observed: usize) -> f64 {
    if observed > draws || observed > successes {
        return 0.0;
    }
    if draws - observed > population - successes || draws > population {
        return 0.0;
    }
    (ln_choose(successes, observed) + ln_choose(population - successes, draws - observed)
        - ln_choose(population, draws))
        .exp()
}

/// Probability of one group drawing exactly its own hand of the queried
/// residue subset.
///
/// The deck is the column's non-gap residue multiset. Conditioning on the
/// opposing group having already drawn `contrast_size` cards leaves a
/// population of `deck - contrast_size`; the group draws `set_size` cards
/// and must hit `set_size` cards of the queried residues, whose combined
/// frequency is the success count. Impossible configurations (more required
/// successes than the conditioned population holds) have probability 0.
pub fn pstate(
    subset: &[char],
    frequencies: &BTreeMap<char, usize>,
    set_size: usize,
    contrast_size: usize,
) -> f64 {
    let deck: usize = frequencies.values().sum();
    let conditioned = deck.saturating_sub(contrast_size);
    let successes: usize = subset
        .iter()
        .map(|s| frequencies.get(s).copied().unwrap_or(0))
        .sum();

    if successes > conditioned {
        return 0.0;
    }
    hypergeometric_pmf(conditioned, successes, set_size, set_size)
}

/// Joint probability of one exclusive residue split: foreground draws its
/// subset given the background's hand, times the symmetric term.
pub fn sstate(
    foreground_subset: &[char],
    background_subset: &[char],
    frequencies: &BTreeMap<char, usize>,
    fg_size: usize,
    bg_size: usize,
) -> f64 {
    pstate(foreground_subset, frequencies, fg_size, bg_size)
        * pstate(background_subset, frequencies, bg_size, fg_size)
}

/// Exact p-value of the observed exclusive residue partition at one column.
///
/// Enumerates every one-vs-rest split of the column's distinct non-gap
/// residues in both directions (the "comb" set); with more than two
/// residues, the summed joint probability of all ordered single-residue
/// pairs (the "ucomb" set) is subtracted to correct the double counting.
/// The raw result is range-checked against `[-ε, 1+ε]`: violations are
/// reported through the returned flag and the logged anomaly, then clamped,
/// never silently masked.
pub fn position_pvalue(
    frequencies: &BTreeMap<char, usize>,
    fg_size: usize,
    bg_size: usize,
    position: usize,
) -> ScoredPvalue {
    let symbols: Vec<char> = frequencies.keys().copied().collect();

    let mut comb_sum = 0.0;
    for symbol in &symbols {
        let rest: Vec<char> = symbols.iter().copied().filter(|s| s != symbol).collect();
        comb_sum += sstate(&[*symbol], &rest, frequencies, fg_size, bg_size);
        comb_sum += sstate(&rest, &[*symbol], frequencies, fg_size, bg_size);
    }

    let mut pvalue = comb_sum;
    if symbols.len() > 2 {
        let mut ucomb_sum = 0.0;
        for a in &symbols {
            for b in &symbols {
                if a != b {
                    ucomb_sum += sstate(&[*a], &[*b], frequencies, fg_size, bg_size);
                }
            }
        }
        pvalue = comb_sum - ucomb_sum;
    }

    let anomalous = !(-PVALUE_EPSILON..=1.0 + PVALUE_EPSILON).contains(&pvalue);
    if anomalous {
        let anomaly = NumericAnomaly {
            position,
            value: pvalue,
        };
        eprintln!("⚠️  Numeric anomaly: {}", anomaly);
    }

    ScoredPvalue {
        value: pvalue.clamp(0.0, 1.0),
        anomalous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequencies(pairs: &[(char, usize)]) -> BTreeMap<char, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn pstate_is_zero_when_impossible() {
        // 5 required successes in a conditioned population of 4
        let freqs = frequencies(&[('M', 5), ('L', 2)]);
        assert_eq!(pstate(&['M'], &freqs, 2, 3), 0.0);
    }

    #[test]
    fn pstate_matches_closed_form() {
        // Deck {M:2, L:2}, both groups of size 2: drawing the two
        // remaining non-M cards is forced, so the M-side draw is certain
        let freqs = frequencies(&[('M', 2), ('L', 2)]);
        let p = pstate(&['M'], &freqs, 2, 2);
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pstate_stays_in_unit_interval() {
        let freqs = frequencies(&[('A', 3), ('R', 2), ('W', 4)]);
        for set_size in 0..6 {
            for contrast_size in 0..6 {
                for subset in [&['A'][..], &['R', 'W'][..], &['A', 'R', 'W'][..]] {
                    let p = pstate(subset, &freqs, set_size, contrast_size);
                    assert!((0.0..=1.0).contains(&p), "p={} outside [0,1]", p);
                }
            }
        }
    }

    #[test]
    fn two_symbol_pvalue_sums_both_directions() {
        // Deck {M:4, L:4}, groups of 3: pstate of either single symbol is
        // C(4,3)/C(5,3) = 0.4, each of the four comb entries contributes
        // 0.4 * 0.4, no ucomb correction below three symbols
        let freqs = frequencies(&[('M', 4), ('L', 4)]);
        let scored = position_pvalue(&freqs, 3, 3, 0);
        assert!(!scored.anomalous);
        assert!((scored.value - 0.64).abs() < 1e-12);
    }

    #[test]
    fn three_symbol_pvalue_applies_inclusion_exclusion() {
        // Deck {A:2, B:2, C:2}, groups of 2: comb sum is 1, ucomb sum is
        // 6 * (1/36) = 1/6
        let freqs = frequencies(&[('A', 2), ('B', 2), ('C', 2)]);
        let scored = position_pvalue(&freqs, 2, 2, 0);
        assert!(!scored.anomalous);
        assert!((scored.value - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_result_is_flagged_and_clamped() {
        // Degenerate full-coverage deck: every direction is certain and the
        // comb set double-counts, pushing the raw sum to 4
        let freqs = frequencies(&[('M', 2), ('L', 2)]);
        let scored = position_pvalue(&freqs, 2, 2, 0);
        assert!(scored.anomalous);
        assert_eq!(scored.value, 1.0);
    }

    #[test]
    fn symbol_frequencies_exclude_gaps() {
        let freqs = symbol_frequencies("MML-L".chars());
        assert_eq!(freqs.get(&'M'), Some(&2));
        assert_eq!(freqs.get(&'L'), Some(&2));
        assert!(!freqs.contains_key(&GAP));
    }
}
