//! Раскладка зала и проверка выбора мест на горячем пути бронирования.

use cinema_booking::services::seating::SeatGrid;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashSet;

fn seat_map_benchmark(c: &mut Criterion) {
    let grid = SeatGrid::STANDARD;
    let mut group = c.benchmark_group("seat_map");

    for booked_count in [0_i32, 30, 150] {
        let booked: HashSet<i32> = (1..=booked_count).collect();
        group.bench_function(format!("booked_{booked_count}"), |b| {
            b.iter(|| black_box(grid.seat_map(black_box(&booked))));
        });
    }

    group.finish();
}

fn selection_benchmark(c: &mut Criterion) {
    let grid = SeatGrid::STANDARD;
    let selection = [48, 12, 150, 1, 77, 3, 99, 64, 120, 15];

    c.bench_function("validate_selection_10", |b| {
        b.iter(|| black_box(grid.validate_selection(black_box(&selection), 10)));
    });
}

criterion_group!(benches, seat_map_benchmark, selection_benchmark);
criterion_main!(benches);
