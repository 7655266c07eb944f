use criterion::{Criterion, black_box, criterion_group, criterion_main};
use halcyon::board::Position;
use halcyon::eval::evaluate;
use halcyon::moves::perft::perft;
use halcyon::search::search::Searcher;
use halcyon::search::tt::PawnHashTable;
use std::str::FromStr;
use std::time::Duration;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_perft(c: &mut Criterion) {
    halcyon::init();
    c.bench_function("perft_startpos_d4", |b| {
        let mut pos = Position::startpos();
        b.iter(|| black_box(perft(&mut pos, 4)));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    halcyon::init();
    c.bench_function("evaluate_kiwipete", |b| {
        let pos = Position::from_str(KIWIPETE).unwrap();
        let mut pawn_cache = PawnHashTable::new();
        b.iter(|| black_box(evaluate(&pos, &mut pawn_cache)));
    });
}

fn bench_search(c: &mut Criterion) {
    halcyon::init();
    c.bench_function("search_kiwipete_d5", |b| {
        b.iter(|| {
            let mut pos = Position::from_str(KIWIPETE).unwrap();
            let mut searcher = Searcher::new(16);
            black_box(searcher.iterative_deepening(&mut pos, Duration::MAX, 5))
        });
    });
}

criterion_group!(benches, bench_perft, bench_evaluate, bench_search);
criterion_main!(benches);
