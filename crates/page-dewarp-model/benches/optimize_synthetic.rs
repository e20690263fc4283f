use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Point2;
use page_dewarp_core::{GrayImage, Normalizer};
use page_dewarp_model::{
    Objective, OptimizerParams, Optimizer, PageExtents, Projector, RemapParams, Remapper,
    ReprojectionCost,
};
use page_dewarp_spans::{
    Contour, EdgeParams, KeypointSampler, SpanAssembler, SpanInfo, SpanParams,
};

const WIDTH: usize = 800;
const HEIGHT: usize = 600;

/// Lines of short bars bent by a gentle sine.
fn curved_contours(lines: usize, bars: usize) -> Vec<Contour> {
    let mut out = Vec::with_capacity(lines * bars);
    for line in 0..lines {
        let y0 = 80.0 + 40.0 * line as f64;
        for k in 0..bars {
            let cx = 60.0 + 40.0 * k as f64;
            let cy = y0 + 12.0 * (cx / 200.0).sin();
            let theta = (12.0 / 200.0 * (cx / 200.0).cos()).atan();
            let (s, c) = theta.sin_cos();
            let outline = [(-15.0, -3.0), (15.0, -3.0), (15.0, 3.0), (-15.0, 3.0)]
                .iter()
                .map(|&(u, v)| Point2::new(cx + c * u - s * v, cy + s * u + c * v))
                .collect();
            out.push(Contour::from_outline(outline));
        }
    }
    out
}

fn make_span_info() -> SpanInfo {
    let contours = curved_contours(10, 16);
    let spans = SpanParams::default();
    let assembly = SpanAssembler::new(&EdgeParams::default(), &spans).assemble(&contours);
    let sampled = KeypointSampler::new(&spans).sample_all(&contours, &assembly.spans);
    SpanInfo::build(&sampled, Normalizer::new(WIDTH, HEIGHT))
        .expect("synthetic page always has spans")
}

fn bench_cost(c: &mut Criterion) {
    let info = make_span_info();
    let params = info.default_params([0.0, 0.0]);
    let cost = ReprojectionCost::new(Projector::default(), &info);
    c.bench_function("reprojection_cost_10x16", |b| {
        b.iter(|| black_box(cost.evaluate(black_box(&params))))
    });
}

fn bench_optimize(c: &mut Criterion) {
    let info = make_span_info();
    let params = info.default_params([0.0, 0.0]);
    let cost = ReprojectionCost::new(Projector::default(), &info);
    let optimizer = Optimizer::new(OptimizerParams {
        max_iterations: 500,
        ..OptimizerParams::default()
    });
    c.bench_function("optimize_10x16_500it", |b| {
        b.iter(|| black_box(optimizer.optimize(black_box(&params), &cost)))
    });
}

fn bench_remap(c: &mut Criterion) {
    let info = make_span_info();
    let params = info.default_params([0.0, 0.0]);
    let source = GrayImage::filled(WIDTH, HEIGHT, 128);
    let remapper = Remapper::new(Projector::default(), info.normalizer, RemapParams::default());
    let extents = PageExtents::full_image(&info.normalizer);
    c.bench_function("remap_800x600", |b| {
        b.iter(|| black_box(remapper.remap(&source.view(), black_box(&params), &extents)).is_ok())
    });
}

criterion_group!(optimize_synthetic, bench_cost, bench_optimize, bench_remap);
criterion_main!(optimize_synthetic);
