use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{pow::MiningControl, Block, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_pow(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<Transaction> = (0..10)
        .map(|i| {
            Transaction::new(
                1_600_000_000_000 + i,
                Some(format!("alice-{i}")),
                Some("bob".into()),
                rng.gen_range(1..10),
            )
        })
        .collect();
    let block = Block::new(1_600_000_000_100, txs, "0");

    c.bench_function("calculate_hash", |b| b.iter(|| block.calculate_hash()));

    c.bench_function("mine_block_difficulty_3", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine(3, &MiningControl::unbounded())
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
