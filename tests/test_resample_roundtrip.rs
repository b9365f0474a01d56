//! Resampling and serialization round-trip tests over real files.

use caascan::prelude::*;
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

/// Build a ladder-shaped newick string over `n` leaves.
fn ladder_newick(n: usize) -> String {
    let mut inner = "sp00:1".to_string();
    for i in 1..n {
        inner = format!("({},sp{:02}:1):1", inner, i);
    }
    format!("{};", inner)
}

#[test]
fn topology_loads_from_a_tree_file() {
    let dir = TempDir::new().unwrap();
    let tree_path = dir.path().join("species.nwk");
    let mut file = File::create(&tree_path).unwrap();
    write!(file, "{}", ladder_newick(20)).unwrap();
    drop(file);

    let topology = PhylogeneticTopology::from_newick_file(&tree_path).unwrap();
    assert_eq!(topology.species.len(), 20);
    assert_eq!(topology.pair_count(), 20 * 19 / 2);

    // The two ends of the ladder are the most distant pair
    assert_eq!(topology.distance_from_farthest[0].1, 0.0);
    let (last, max) = topology.distance_from_farthest.last().unwrap();
    assert_eq!(*max, topology.max_distance);
    assert_ne!(last, &topology.farthest);
}

#[test]
fn random_resampling_round_trips_through_the_tab_format() {
    let dir = TempDir::new().unwrap();
    let topology = PhylogeneticTopology::from_newick(&ladder_newick(20)).unwrap();

    let mut engine = ResamplingEngine::new(Some(11));
    let index = engine.random(&topology.species, 3, 4, 1000).unwrap();
    assert_eq!(index.cycles(), 1000);

    let path = dir.path().join("resampled.tab");
    write_trait_assignments(&path, &index).unwrap();
    let revived = TraitIndex::revive(&path).unwrap();

    assert_eq!(revived.cycles(), 1000);
    assert_eq!(revived.trait_names().len(), index.trait_names().len());
    for name in index.trait_names() {
        assert_eq!(revived.foreground(name), index.foreground(name), "{}", name);
        assert_eq!(revived.background(name), index.background(name), "{}", name);
    }
}

#[test]
fn every_replicate_keeps_exact_disjoint_group_sizes() {
    let topology = PhylogeneticTopology::from_newick(&ladder_newick(20)).unwrap();
    let mut engine = ResamplingEngine::new(Some(23));
    let index = engine.random(&topology.species, 3, 4, 1000).unwrap();

    let mut always_foreground = topology.species.clone();
    for name in index.trait_names() {
        let fg = index.foreground(name).unwrap();
        let bg = index.background(name).unwrap();
        assert_eq!(fg.len(), 3);
        assert_eq!(bg.len(), 4);
        assert!(fg.is_disjoint(bg));
        always_foreground.retain(|s| fg.contains(s));
    }

    // Draws spread over the pool: no species is foreground in every replicate
    assert!(always_foreground.is_empty());
}

#[test]
fn revived_ensemble_drives_the_bootstrap() {
    let dir = TempDir::new().unwrap();

    // Alignment with a clean M/L split over four species
    let ali_path = dir.path().join("gene.fasta");
    std::fs::write(&ali_path, ">sp00\nM\n>sp01\nM\n>sp02\nL\n>sp03\nL\n").unwrap();

    // Two replicates: one matches the split, one crosses it
    let resampled_path = dir.path().join("resampled.tab");
    std::fs::write(
        &resampled_path,
        "b_1\tsp00,sp01\tsp02,sp03\nb_2\tsp00,sp02\tsp01,sp03\n",
    )
    .unwrap();

    let resampled = TraitIndex::revive(&resampled_path).unwrap();
    assert_eq!(resampled.cycles(), 2);

    let slice = AlignmentSlice::from_file(&ali_path, None, 2, 0.5).unwrap();
    let lines = bootstrap(&slice, &resampled, &PositionFilters::default(), false);

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].hits, 1);
    assert_eq!(lines[0].hit_traits, vec!["b_1".to_string()]);
    assert!((lines[0].empirical_pvalue() - 0.5).abs() < 1e-12);

    let out_path = dir.path().join("boot.tsv");
    write_bootstrap_lines(&out_path, &lines, "resampled.tab").unwrap();
    let content = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(content.trim(), "gene@0\t1\t2\t0.5\tb_1\tresampled.tab");
}
