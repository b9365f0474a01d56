// topology.rs - Tree import and patristic distance ranking

use crate::error::TreeParseError;
use std::collections::HashMap;
use std::path::Path;

/// Species topology derived from a Newick tree: pairwise patristic
/// distances, the farthest-species anchor, and the distance-from-farthest
/// ranking used to stratify resampling groups. Built once, read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct PhylogeneticTopology {
    /// Sorted leaf labels
    pub species: Vec<String>,
    distances: HashMap<(String, String), f64>,
    /// First member of the most distant leaf pair
    pub farthest: String,
    /// Patristic distance of the most distant leaf pair
    pub max_distance: f64,
    /// (species, distance to the farthest anchor), ascending
    pub distance_from_farthest: Vec<(String, f64)>,
}

impl PhylogeneticTopology {
    pub fn from_newick_file(path: &Path) -> Result<Self, TreeParseError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TreeParseError::new(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_newick(&text)
    }

    pub fn from_newick(text: &str) -> Result<Self, TreeParseError> {
        let root = parse_newick(text)?;

        let mut distances = HashMap::new();
        let leaves = collect_leaf_distances(&root, &mut distances);

        let mut species: Vec<String> = leaves.iter().map(|(name, _)| name.clone()).collect();
        species.sort();
        species.dedup();
        if species.len() < 2 {
            return Err(TreeParseError::new("tree has fewer than two leaves"));
        }
        if species.len() != leaves.len() {
            return Err(TreeParseError::new("tree carries duplicate leaf labels"));
        }

        // Farthest pair; ties resolved on the sorted pair key so the anchor
        // is stable across runs
        let mut farthest_pair: Option<(&(String, String), f64)> = None;
        for (pair, &d) in &distances {
            let better = match farthest_pair {
                None => true,
                Some((best_pair, best_d)) => {
                    d > best_d || (d == best_d && pair < best_pair)
                }
            };
            if better {
                farthest_pair = Some((pair, d));
            }
        }
        let (pair, max_distance) =
            farthest_pair.ok_or_else(|| TreeParseError::new("no leaf pairs in tree"))?;
        let farthest = pair.0.clone();

        let mut distance_from_farthest: Vec<(String, f64)> = species
            .iter()
            .map(|s| {
                let d = if *s == farthest {
                    0.0
                } else {
                    distances[&pair_key(s, &farthest)]
                };
                (s.clone(), d)
            })
            .collect();
        distance_from_farthest
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            species,
            distances,
            farthest,
            max_distance,
            distance_from_farthest,
        })
    }

    /// Patristic distance between two leaves (unordered).
    pub fn distance(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(0.0);
        }
        self.distances.get(&pair_key(a, b)).copied()
    }

    pub fn pair_count(&self) -> usize {
        self.distances.len()
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug)]
struct Node {
    name: Option<String>,
    /// Branch length to the parent; 0 when the tree carries none
    length: f64,
    children: Vec<Node>,
}

/// Fold the tree bottom-up: each call returns (leaf, distance-to-this-node)
/// for the subtree and records every cross-child leaf pair, which meets its
/// lowest common ancestor exactly here. Summation order is fixed by the
/// recursion, so distances are deterministic for a given tree.
fn collect_leaf_distances(
    node: &Node,
    distances: &mut HashMap<(String, String), f64>,
) -> Vec<(String, f64)> {
    if node.children.is_empty() {
        let name = node.name.clone().unwrap_or_default();
        return vec![(name, 0.0)];
    }

    let mut groups: Vec<Vec<(String, f64)>> = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let mut leaves = collect_leaf_distances(child, distances);
        for leaf in &mut leaves {
            leaf.1 += child.length;
        }
        groups.push(leaves);
    }

    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            for (a, da) in &groups[i] {
                for (b, db) in &groups[j] {
                    distances.insert(pair_key(a, b), da + db);
                }
            }
        }
    }

    groups.concat()
}

/// Recursive-descent Newick reader. Accepts the usual
/// `(A:0.1,(B:0.2,C:0.3):0.4);` shape; internal node labels are allowed and
/// ignored for leaf collection; spaces inside labels become underscores.
fn parse_newick(text: &str) -> Result<Node, TreeParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;

    let node = parse_subtree(&chars, &mut pos)?;

    skip_whitespace(&chars, &mut pos);
    match chars.get(pos) {
        Some(';') => Ok(node),
        Some(c) => Err(TreeParseError::new(format!(
            "unexpected character '{}' at offset {}",
            c, pos
        ))),
        None => Err(TreeParseError::new("missing terminating ';'")),
    }
}

fn parse_subtree(chars: &[char], pos: &mut usize) -> Result<Node, TreeParseError> {
    skip_whitespace(chars, pos);

    let children = if chars.get(*pos) == Some(&'(') {
        *pos += 1;
        let mut children = vec![parse_subtree(chars, pos)?];
        loop {
            skip_whitespace(chars, pos);
            match chars.get(*pos) {
                Some(',') => {
                    *pos += 1;
                    children.push(parse_subtree(chars, pos)?);
                }
                Some(')') => {
                    *pos += 1;
                    break;
                }
                Some(c) => {
                    return Err(TreeParseError::new(format!(
                        "expected ',' or ')' but found '{}' at offset {}",
                        c, *pos
                    )))
                }
                None => return Err(TreeParseError::new("unbalanced parentheses")),
            }
        }
        children
    } else {
        Vec::new()
    };

    let name = parse_label(chars, pos);
    if children.is_empty() && name.is_none() {
        return Err(TreeParseError::new(format!(
            "leaf without a label at offset {}",
            *pos
        )));
    }

    let length = parse_branch_length(chars, pos)?;

    Ok(Node {
        name,
        length,
        children,
    })
}

fn parse_label(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if matches!(c, '(' | ')' | ',' | ':' | ';') {
            break;
        }
        *pos += 1;
    }
    let label: String = chars[start..*pos]
        .iter()
        .collect::<String>()
        .trim()
        .replace(' ', "_");
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

fn parse_branch_length(chars: &[char], pos: &mut usize) -> Result<f64, TreeParseError> {
    if chars.get(*pos) != Some(&':') {
        return Ok(0.0);
    }
    *pos += 1;

    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') {
            *pos += 1;
        } else {
            break;
        }
    }
    let token: String = chars[start..*pos].iter().collect();
    token
        .parse()
        .map_err(|_| TreeParseError::new(format!("invalid branch length '{}'", token)))
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "((A:1,B:2):1,(C:3,D:1):2);";

    #[test]
    fn patristic_distances_sum_branch_lengths() {
        let topology = PhylogeneticTopology::from_newick(TREE).unwrap();
        assert_eq!(topology.species, vec!["A", "B", "C", "D"]);
        assert_eq!(topology.pair_count(), 6);

        assert_eq!(topology.distance("A", "B"), Some(3.0));
        assert_eq!(topology.distance("A", "C"), Some(7.0));
        assert_eq!(topology.distance("A", "D"), Some(5.0));
        assert_eq!(topology.distance("B", "C"), Some(8.0));
        assert_eq!(topology.distance("B", "D"), Some(6.0));
        assert_eq!(topology.distance("C", "D"), Some(4.0));

        // Unordered lookup
        assert_eq!(topology.distance("C", "A"), topology.distance("A", "C"));
        assert_eq!(topology.distance("A", "A"), Some(0.0));
    }

    #[test]
    fn farthest_anchor_and_ranking() {
        let topology = PhylogeneticTopology::from_newick(TREE).unwrap();
        assert_eq!(topology.farthest, "B");
        assert_eq!(topology.max_distance, 8.0);

        let ranked: Vec<&str> = topology
            .distance_from_farthest
            .iter()
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(ranked, vec!["B", "A", "D", "C"]);
        assert_eq!(topology.distance_from_farthest[0].1, 0.0);
    }

    #[test]
    fn distances_are_deterministic() {
        let a = PhylogeneticTopology::from_newick(TREE).unwrap();
        let b = PhylogeneticTopology::from_newick(TREE).unwrap();
        for s1 in &a.species {
            for s2 in &a.species {
                assert_eq!(a.distance(s1, s2), b.distance(s1, s2));
            }
        }
    }

    #[test]
    fn labels_with_spaces_are_normalized() {
        let topology =
            PhylogeneticTopology::from_newick("(Homo sapiens:1,Mus musculus:2);").unwrap();
        assert_eq!(topology.species, vec!["Homo_sapiens", "Mus_musculus"]);
    }

    #[test]
    fn malformed_trees_are_rejected() {
        assert!(PhylogeneticTopology::from_newick("(A:1,B:2").is_err());
        assert!(PhylogeneticTopology::from_newick("(A:1,B:2)").is_err());
        assert!(PhylogeneticTopology::from_newick("(A:x,B:2);").is_err());
        assert!(PhylogeneticTopology::from_newick("(A:1);").is_err());
    }
}
