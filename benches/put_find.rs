//! Sequential puts and scattered finds against a file-backed store.
//!
//! Run:
//!   cargo bench --bench put_find

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tempfile::tempdir;

use luffydb::{Db, Options};

const N_KEYS: u64 = 10_000;
// Coprime with N_KEYS, so `i * STRIDE % N_KEYS` visits every key once.
const STRIDE: u64 = 7_919;

fn key(i: u64) -> [u8; 8] {
    i.to_be_bytes()
}

fn bench_sequential_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(N_KEYS));
    group.sample_size(10);

    group.bench_function("sequential_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let db = Db::open(dir.path().join("bench.db"), Options::default()).unwrap();
                (dir, db)
            },
            |(_dir, db)| {
                let mut tx = db.write_tx();
                let mut c = tx.create_collection(b"bench").unwrap();
                for i in 0..N_KEYS {
                    c.put(&mut tx, &key(i), b"value-value-value").unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.finish();
}

fn bench_scattered_find(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Db::open(dir.path().join("bench.db"), Options::default()).unwrap();
    {
        let mut tx = db.write_tx();
        let mut c = tx.create_collection(b"bench").unwrap();
        for i in 0..N_KEYS {
            c.put(&mut tx, &key(i), b"value-value-value").unwrap();
        }
    }

    let mut group = c.benchmark_group("find");
    group.throughput(Throughput::Elements(N_KEYS));

    group.bench_function("scattered_10k", |b| {
        b.iter(|| {
            let tx = db.read_tx();
            let c = tx.get_collection(b"bench").unwrap().unwrap();
            for i in 0..N_KEYS {
                let k = key(i * STRIDE % N_KEYS);
                black_box(c.find(&tx, &k).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_sequential_put, bench_scattered_find);
criterion_main!(benches);
