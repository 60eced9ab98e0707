use coaster_duel::pool::CompletedPairs;
use coaster_duel::{select_pair, EngineConfig, Item, ItemPool, PairingStrategy, RankingSession, SamplerParams};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn items(n: usize) -> Vec<Item> {
    (0..n).map(|i| Item::named(format!("coaster_{}", i))).collect()
}

fn played_session(n_items: usize, battles: usize, seed: u64) -> RankingSession {
    let mut session = RankingSession::with_seed(items(n_items), EngineConfig::default(), seed).unwrap();
    session.simulate_battles(battles);
    session
}

fn bench_select_pair(c: &mut Criterion) {
    let session = played_session(200, 2_000, 42);
    let pool = ItemPool::new(items(200)).unwrap();
    let completed: CompletedPairs = session.completed_pairs().keys().cloned().collect();

    for strategy in [PairingStrategy::Uniform, PairingStrategy::Exploration, PairingStrategy::Hybrid] {
        let params = SamplerParams {
            strategy,
            ..SamplerParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        c.bench_function(&format!("select_pair_{:?}", strategy).to_lowercase(), |b| {
            b.iter(|| black_box(select_pair(&pool, session.ratings(), &completed, &params, &mut rng)))
        });
    }
}

fn bench_record_outcomes(c: &mut Criterion) {
    c.bench_function("simulate_500_battles", |b| {
        b.iter(|| {
            let mut session = RankingSession::with_seed(items(100), EngineConfig::default(), 42).unwrap();
            black_box(session.simulate_battles(500));
        })
    });
}

fn bench_recalculate(c: &mut Criterion) {
    let session = played_session(50, 600, 42);

    c.bench_function("recalculate_from_history", |b| {
        b.iter(|| {
            let mut replay = session.clone();
            black_box(replay.recalculate_from_history());
        })
    });
}

criterion_group!(benches, bench_select_pair, bench_record_outcomes, bench_recalculate);
criterion_main!(benches);
