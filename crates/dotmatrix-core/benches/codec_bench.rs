//! Criterion benchmarks for the dot-matrix checksum and packet codec.
//!
//! A full animation is re-encoded on every transmit, so the per-packet cost
//! scales with frame size.  These benches cover the smallest and largest
//! grids the editor produces.
//!
//! Run with:
//! ```bash
//! cargo bench --package dotmatrix-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dotmatrix_core::protocol::decode_packet;
use dotmatrix_core::protocol::messages::{AnimationFrame, AnimationFramesMessage};
use dotmatrix_core::{checksum16, encode_packet, FrameSource, FrameStore, Message};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_checkerboard(rows: usize, columns: usize) -> FrameStore {
    let mut store = FrameStore::new(rows, columns).expect("valid grid");
    for row in 0..rows {
        for column in 0..columns {
            store
                .set_pixel(0, row, column, (row + column) % 2 == 0)
                .expect("pixel in range");
        }
    }
    store
}

fn make_animation(store: &FrameStore, frame_count: usize) -> Message {
    let (rows, columns) = store.grid_dimensions();
    Message::AnimationFrames(AnimationFramesMessage {
        frames: (0..frame_count)
            .map(|_| AnimationFrame {
                duration_ms: 100,
                bytes: store.frame_bytes(0),
            })
            .collect(),
        repeat_count: 0,
        rows,
        columns,
    })
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum16");
    for size in [16usize, 512, 8192] {
        let data: Vec<u8> = (0..size).map(|i| i as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| checksum16(black_box(data)))
        });
    }
    group.finish();
}

fn bench_frame_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_bytes");
    for (rows, columns) in [(8usize, 8usize), (16, 32), (64, 64)] {
        let store = make_checkerboard(rows, columns);
        group.bench_function(format!("{rows}x{columns}"), |b| {
            b.iter(|| black_box(&store).frame_bytes(0))
        });
    }
    group.finish();
}

fn bench_encode_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_packet");
    for (rows, columns) in [(8usize, 8usize), (64, 64)] {
        let store = make_checkerboard(rows, columns);
        let msg = make_animation(&store, 32);
        group.bench_function(format!("{rows}x{columns}"), |b| {
            b.iter(|| encode_packet(black_box(&msg), black_box(16)))
        });
    }
    group.finish();
}

fn bench_decode_packet(c: &mut Criterion) {
    let store = make_checkerboard(64, 64);
    let msg = make_animation(&store, 1);
    let packet = encode_packet(&msg, 0).expect("packet 0 exists");
    c.bench_function("decode_packet/64x64", |b| {
        b.iter(|| decode_packet(black_box(&packet)).is_ok())
    });
}

criterion_group!(
    benches,
    bench_checksum,
    bench_frame_packing,
    bench_encode_packet,
    bench_decode_packet
);
criterion_main!(benches);
