// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use champl::{HashMap, HashMapMut};

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn keys(n: usize) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(42);
    (0..n).map(|_| rng.gen()).collect()
}

fn mutable_insert(b: &mut Bencher<'_>, n: usize) {
    let keys = keys(n);
    b.iter(|| {
        let mut map: HashMapMut<u64, u64> = HashMapMut::new();
        for k in &keys {
            map.insert(*k, *k);
        }
        map
    })
}

fn immutable_update(b: &mut Bencher<'_>, n: usize) {
    let keys = keys(n);
    b.iter(|| {
        let mut map: HashMap<u64, u64> = HashMap::new();
        for k in &keys {
            map = map.update(*k, *k);
        }
        map
    })
}

fn batch_through_mutable(b: &mut Bencher<'_>, n: usize) {
    let keys = keys(n);
    let base: HashMap<u64, u64> = HashMap::new();
    b.iter(|| {
        let mut map = base.to_mutable();
        for k in &keys {
            map.insert(*k, *k);
        }
        map.to_immutable()
    })
}

fn lookup(b: &mut Bencher<'_>, n: usize) {
    let keys = keys(n);
    let map: HashMap<u64, u64> = keys.iter().map(|k| (*k, *k)).collect();
    b.iter(|| {
        let mut hits = 0;
        for k in &keys {
            if map.get(k).is_some() {
                hits += 1;
            }
        }
        hits
    })
}

fn iterate(b: &mut Bencher<'_>, n: usize) {
    let map: HashMap<u64, u64> = keys(n).iter().map(|k| (*k, *k)).collect();
    b.iter(|| map.iter().count())
}

fn bench_group(c: &mut Criterion) {
    for size in SIZES {
        c.bench_function(&format!("hashmap/mutable_insert/{}", size), |b| {
            mutable_insert(b, size)
        });
        c.bench_function(&format!("hashmap/immutable_update/{}", size), |b| {
            immutable_update(b, size)
        });
        c.bench_function(&format!("hashmap/batch_through_mutable/{}", size), |b| {
            batch_through_mutable(b, size)
        });
        c.bench_function(&format!("hashmap/lookup/{}", size), |b| lookup(b, size));
        c.bench_function(&format!("hashmap/iterate/{}", size), |b| iterate(b, size));
    }
}

criterion_group!(benches, bench_group);
criterion_main!(benches);
