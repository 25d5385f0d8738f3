use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use softras::bench::{draw_line, fill_triangle, FrameBuffers, ScreenVertex};
use softras::Color;

const BUFFER_WIDTH: u32 = 512;
const BUFFER_HEIGHT: u32 = 512;

fn small_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(100, 100, 0.5, Color::RED),
        ScreenVertex::new(120, 100, 0.5, Color::GREEN),
        ScreenVertex::new(110, 120, 0.5, Color::BLUE),
    ]
}

fn medium_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(100, 100, 0.5, Color::RED),
        ScreenVertex::new(300, 100, 0.5, Color::GREEN),
        ScreenVertex::new(200, 300, 0.5, Color::BLUE),
    ]
}

fn large_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::new(50, 50, 0.2, Color::RED),
        ScreenVertex::new(480, 100, 0.5, Color::GREEN),
        ScreenVertex::new(250, 480, 0.8, Color::BLUE),
    ]
}

fn benchmark_fill_triangle(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_triangle");

    for (name, tri) in [
        ("small", small_triangle()),
        ("medium", medium_triangle()),
        ("large", large_triangle()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &tri, |b, tri| {
            let mut frame = FrameBuffers::new(BUFFER_WIDTH, BUFFER_HEIGHT);
            b.iter(|| {
                frame.clear();
                let [v0, v1, v2] = *black_box(tri);
                fill_triangle(&mut frame, v0, v1, v2);
            });
        });
    }

    group.finish();
}

fn benchmark_draw_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_line");

    group.bench_function("diagonal", |b| {
        let mut frame = FrameBuffers::new(BUFFER_WIDTH, BUFFER_HEIGHT);
        b.iter(|| {
            frame.clear();
            draw_line(
                &mut frame,
                black_box(ScreenVertex::new(0, 0, 0.1, Color::WHITE)),
                black_box(ScreenVertex::new(511, 511, 0.9, Color::RED)),
            );
        });
    });

    group.bench_function("grid_of_triangle_edges", |b| {
        let triangles: Vec<[ScreenVertex; 3]> = (0..20)
            .flat_map(|row| {
                (0..20).map(move |col| {
                    let x = col * 25;
                    let y = row * 25;
                    [
                        ScreenVertex::new(x, y, 0.5, Color::WHITE),
                        ScreenVertex::new(x + 22, y, 0.5, Color::WHITE),
                        ScreenVertex::new(x + 11, y + 20, 0.5, Color::WHITE),
                    ]
                })
            })
            .collect();

        let mut frame = FrameBuffers::new(BUFFER_WIDTH, BUFFER_HEIGHT);
        b.iter(|| {
            frame.clear();
            for tri in &triangles {
                let [v0, v1, v2] = *black_box(tri);
                draw_line(&mut frame, v0, v1);
                draw_line(&mut frame, v1, v2);
                draw_line(&mut frame, v2, v0);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_fill_triangle, benchmark_draw_line);
criterion_main!(benches);
