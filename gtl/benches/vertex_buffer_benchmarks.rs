use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gtl::cell::{C4ubV3f, V2f};
use gtl::component::{Color4ub, Vertex2f, Vertex3f};
use gtl::{DummyBackend, LogicalBuffer, PrimitiveMode, VertexBufferDescriptor};

fn v(i: usize) -> V2f {
    (Vertex2f::new([i as f32, (i % 2) as f32]),)
}

fn filled(count: usize, limit: usize) -> LogicalBuffer<V2f> {
    let mut buffer = LogicalBuffer::with_descriptor(
        Arc::new(DummyBackend::new()),
        &VertexBufferDescriptor::new().with_segment_limit(limit),
    );
    buffer.extend((0..count).map(v));
    buffer
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

fn bench_push_back(c: &mut Criterion) {
    c.bench_function("push_back_10k_c4ub_v3f", |b| {
        b.iter(|| {
            let mut buffer: LogicalBuffer<C4ubV3f> =
                LogicalBuffer::new(Arc::new(DummyBackend::new()));
            for i in 0..10_000 {
                buffer.push_back((
                    Color4ub::new([255, 0, 0, 255]),
                    Vertex3f::new([i as f32, 0.0, 0.0]),
                ));
            }
            black_box(&buffer);
        });
    });
}

fn bench_insert_front(c: &mut Criterion) {
    c.bench_function("insert_front_1k_into_16_segments", |b| {
        b.iter_batched(
            || {
                let mut buffer = filled(4096, 256);
                buffer.render_all().ok();
                buffer
            },
            |mut buffer| {
                for i in 0..1_000 {
                    buffer.insert(0, v(i));
                }
                black_box(buffer)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

fn bench_random_access(c: &mut Criterion) {
    let mut buffer = filled(65_536, 1024);
    buffer.render_all().ok();
    c.bench_function("index_64k_over_64_segments", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in (0..buffer.len()).step_by(7) {
                sum += buffer[i].0 .0[0];
            }
            black_box(sum)
        });
    });
    c.bench_function("iter_64k_over_64_segments", |b| {
        b.iter(|| black_box(buffer.iter().map(|c| c.0 .0[0]).sum::<f32>()));
    });
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn bench_render(c: &mut Criterion) {
    c.bench_function("decompose_and_render_64k_strip", |b| {
        b.iter_batched(
            || filled(65_536, 4096),
            |mut buffer| {
                buffer
                    .render(Some(PrimitiveMode::TriangleStrip), 0, None)
                    .ok();
                black_box(buffer)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    let mut buffer = filled(65_536, 4096);
    buffer.render_all().ok();
    c.bench_function("render_64k_strip_clean", |b| {
        b.iter(|| {
            buffer
                .render(Some(PrimitiveMode::TriangleStrip), 0, None)
                .ok();
        });
    });
}

criterion_group!(
    benches,
    bench_push_back,
    bench_insert_front,
    bench_random_access,
    bench_render,
);
criterion_main!(benches);
