use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};

use quizdeck::{
    core::store::QuizStore,
    quiz::Quiz,
    session::{PlaySession, Step},
};

fn bench_adds(c: &mut Criterion) {
    c.bench_function("store_add_50k", |b| {
        b.iter(|| {
            let mut store = QuizStore::new();
            for i in 0..50_000u64 {
                store.add(format!("q{i}"), format!("a{i}"));
            }
        });
    });
}

fn bench_front_deletes(c: &mut Criterion) {
    c.bench_function("store_delete_front_5k", |b| {
        b.iter(|| {
            let mut store = QuizStore::new();
            for i in 0..5_000u64 {
                store.add(format!("q{i}"), format!("a{i}"));
            }
            while !store.is_empty() {
                let _ = store.delete_by_index(0).expect("delete");
            }
        });
    });
}

fn bench_play_through(c: &mut Criterion) {
    let mut group = c.benchmark_group("play_through");
    for n in [10usize, 1_000, 10_000] {
        let quizzes: Vec<Quiz> = (0..n).map(|i| Quiz::new(format!("q{i}"), format!("a{i}"))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &quizzes, |b, quizzes| {
            b.iter(|| {
                let mut session = PlaySession::new(quizzes.clone());
                let mut rng = StdRng::seed_from_u64(7);
                while let Step::Ask(pending) = session.next_question(&mut rng) {
                    let answer = format!("A{}", pending.key());
                    pending.answer(&answer);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_adds, bench_front_deletes, bench_play_through);
criterion_main!(benches);
