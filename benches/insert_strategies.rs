//! Criterion benchmark: one batch per insert strategy against in-memory SQLite.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use querybench::commands::InsertStrategy;
use querybench::db::schema::create_tables;
use querybench::db::Session;

const BATCH_SIZES: [usize; 2] = [10, 1_000];

/// Fresh in-memory database with the tables created.
fn setup_session() -> Session {
    let mut session = Session::open("sqlite::memory:").expect("Failed to open in-memory SQLite");
    create_tables(&mut session).expect("Failed to create tables");
    session
}

fn bench_insert_strategies(c: &mut Criterion) {
    for rows in BATCH_SIZES {
        let mut group = c.benchmark_group(format!("insert/{}", rows));
        group.sample_size(20);

        for strategy in InsertStrategy::ALL {
            group.bench_with_input(
                BenchmarkId::from_parameter(strategy.name()),
                &strategy,
                |b, strategy| {
                    b.iter_batched(
                        setup_session,
                        |mut session| {
                            strategy
                                .run(&mut session, "bench", rows)
                                .expect("strategy failed")
                        },
                        BatchSize::SmallInput,
                    );
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_insert_strategies);
criterion_main!(benches);
