//! Benchmarks for the heuristic packers and the greedy upper bound.
//!
//! Instances are deterministic mixes of rectangles at several sizes; boxes
//! are generous enough that every packer succeeds.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rectpack_core::{Instance, Packer, SearchContext};
use rectpack_packing::generator::upper_bound::upper_bound;
use rectpack_packing::{SheetPacker, ShelfPacker};

fn mixed_instance(n: usize, rotatable: bool) -> Instance {
    let dims: Vec<(u32, u32)> = (0..n)
        .map(|i| (1 + (i as u32 * 7) % 13, 1 + (i as u32 * 11) % 17))
        .collect();
    let instance = Instance::from_dimensions(rotatable, None, &dims);
    let side = ((instance.total_area() as f64).sqrt() * 1.6).ceil() as u32;
    let (width, height) = (side.max(instance.widest()), side.max(instance.tallest()));
    instance.with_box(width, height)
}

fn bench_shelf(c: &mut Criterion) {
    let mut group = c.benchmark_group("shelf_packer");
    group.sample_size(20);

    for &n in &[25, 100, 400] {
        let instance = mixed_instance(n, false);
        group.bench_with_input(BenchmarkId::new("entries", n), &instance, |b, instance| {
            b.iter(|| {
                let mut trial = instance.clone();
                let placed = ShelfPacker::new().pack(&mut trial, &SearchContext::unbounded());
                black_box(placed)
            })
        });
    }
    group.finish();
}

fn bench_sheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("sheet_packer");
    group.sample_size(20);

    for &n in &[25, 100, 400] {
        for lookahead in [false, true] {
            let instance = mixed_instance(n, lookahead);
            let id = format!("{}{}", n, if lookahead { "_lookahead" } else { "" });
            group.bench_with_input(BenchmarkId::new("entries", id), &instance, |b, instance| {
                b.iter(|| {
                    let mut trial = instance.clone();
                    let placed = SheetPacker::new()
                        .with_lookahead(lookahead)
                        .pack(&mut trial, &SearchContext::unbounded());
                    black_box(placed)
                })
            });
        }
    }
    group.finish();
}

fn bench_upper_bound(c: &mut Criterion) {
    let instance = mixed_instance(100, true);
    c.bench_function("upper_bound_100", |b| {
        b.iter(|| black_box(upper_bound(black_box(&instance), &SearchContext::unbounded())))
    });
}

criterion_group!(benches, bench_shelf, bench_sheet, bench_upper_bound);
criterion_main!(benches);
