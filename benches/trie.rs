//! Benchmarks for the PATRICIA trie using Divan.
//!
//! Run with: `cargo bench --bench trie`

use divan::{black_box, Bencher};
use patricia_trie::analyzers::BytesKeyAnalyzer;
use patricia_trie::PatriciaTrie;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn main() {
    divan::main();
}

const SIZES: &[usize] = &[1_000, 10_000, 100_000];

/// Deterministic 8-byte keys in shuffled insertion order.
fn shuffled_keys(n: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut keys: Vec<Vec<u8>> = (0..n as u64)
        .map(|i| i.to_be_bytes().to_vec())
        .collect();
    keys.shuffle(&mut rng);
    keys
}

fn random_keys(n: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    (0..n).map(|_| rng.gen::<[u8; 8]>().to_vec()).collect()
}

fn populated(keys: &[Vec<u8>]) -> PatriciaTrie<Vec<u8>, u64, BytesKeyAnalyzer> {
    let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
    for (i, k) in keys.iter().enumerate() {
        trie.insert(k.clone(), i as u64);
    }
    trie
}

// =============================================================================
// Insertion
// =============================================================================

#[divan::bench_group]
mod insert {
    use super::{populated, random_keys, shuffled_keys, Bencher, SIZES};

    #[divan::bench(args = SIZES)]
    fn sequential_shuffled(bencher: Bencher, n: usize) {
        let keys = shuffled_keys(n);

        bencher.bench(|| populated(divan::black_box(&keys)));
    }

    #[divan::bench(args = SIZES)]
    fn random(bencher: Bencher, n: usize) {
        let keys = random_keys(n);

        bencher.bench(|| populated(divan::black_box(&keys)));
    }
}

// =============================================================================
// Lookup
// =============================================================================

#[divan::bench_group]
mod get {
    use super::{black_box, populated, random_keys, Bencher, SIZES};

    #[divan::bench(args = SIZES)]
    fn hit(bencher: Bencher, n: usize) {
        let keys = random_keys(n);
        let trie = populated(&keys);

        let mut i = 0;
        bencher.bench_local(|| {
            i = (i + 1) % keys.len();
            black_box(trie.get(&keys[i]))
        });
    }

    #[divan::bench(args = SIZES)]
    fn miss(bencher: Bencher, n: usize) {
        let keys = random_keys(n);
        let trie = populated(&keys);
        let probe = vec![0xAA; 16];

        bencher.bench_local(|| black_box(trie.get(&probe)));
    }
}

// =============================================================================
// Traversal and selection
// =============================================================================

#[divan::bench_group]
mod walk {
    use super::{black_box, populated, random_keys, Bencher, SIZES};

    #[divan::bench(args = SIZES)]
    fn iterate_all(bencher: Bencher, n: usize) {
        let trie = populated(&random_keys(n));

        bencher.bench_local(|| black_box(trie.iter().count()));
    }

    #[divan::bench(args = SIZES)]
    fn select_nearest(bencher: Bencher, n: usize) {
        let keys = random_keys(n);
        let trie = populated(&keys);

        let mut i = 0;
        bencher.bench_local(|| {
            i = (i + 1) % keys.len();
            black_box(trie.select(&keys[i]))
        });
    }

    #[divan::bench(args = SIZES)]
    fn prefix_view_scan(bencher: Bencher, n: usize) {
        let mut trie = populated(&random_keys(n));

        bencher.bench_local(|| {
            let view = trie.prefix_view(vec![0x80], 0, 1).unwrap();
            black_box(view.iter().count())
        });
    }
}
