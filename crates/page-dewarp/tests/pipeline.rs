#![cfg(feature = "image")]

use image::{GrayImage, Luma};
use page_dewarp::{detect, dewarp, DewarpError, DewarpParams, Dewarper, Outcome};

const WIDTH: u32 = 480;
const HEIGHT: u32 = 360;

fn init_logger() {
    let _ = page_dewarp::core::init_with_level(log::LevelFilter::Warn);
}

/// White page with six rows of six dark bars; rows bow down by `sag` pixels
/// in the middle.
fn page(sag: f64, bar_height: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(WIDTH, HEIGHT, Luma([255]));
    for row in 0..6u32 {
        for k in 0..6u32 {
            let x0 = 70 + 60 * k;
            let t = f64::from(x0 + 20 - 70) / 340.0;
            let y0 = 60 + 40 * row + (sag * (std::f64::consts::PI * t).sin()).round() as u32;
            for y in y0..y0 + bar_height {
                for x in x0..x0 + 40 {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
    }
    img
}

fn flat_params() -> DewarpParams {
    let mut params = DewarpParams::default();
    params.remap.crop_to_page = false;
    params.optimizer.max_iterations = 300;
    params
}

fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions());
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| u64::from(p.abs_diff(q)))
        .sum();
    total as f64 / a.as_raw().len() as f64
}

#[test]
fn detect_outlines_the_text_block() {
    init_logger();
    let outline = detect(&page(0.0, 6), &DewarpParams::default()).expect("page");

    assert!((outline.top_left.y - 62.5).abs() < 0.5, "{outline:?}");
    assert!((outline.bottom_left.y - 262.5).abs() < 0.5, "{outline:?}");
    assert!(outline.top_left.x > 60.0 && outline.top_left.x < 80.0);
    assert!(outline.top_right.x > 400.0 && outline.top_right.x < 420.0);
    assert!((outline.top_right.y - outline.top_left.y).abs() < 0.5);
}

#[test]
fn blank_photo_is_returned_unchanged() {
    init_logger();
    let blank = GrayImage::from_pixel(200, 150, Luma([230]));
    let result = dewarp(&blank, &DewarpParams::default(), None);
    assert!(matches!(
        result.outcome,
        Outcome::Unchanged(DewarpError::NoContours)
    ));
    assert_eq!(result.image, blank);

    let err = detect(&blank, &DewarpParams::default()).expect_err("no page");
    assert!(err.is_degenerate_input());
}

#[test]
fn straight_page_is_a_near_identity() {
    init_logger();
    let src = page(0.0, 6);
    let result = dewarp(&src, &flat_params(), None);
    assert!(result.outcome.is_flattened());
    assert!(mean_abs_diff(&src, &result.image) < 1.0);
}

#[test]
fn dewarping_the_output_again_changes_little() {
    init_logger();
    let mut params = flat_params();
    params.model.curvature = false;
    let once = dewarp(&page(0.0, 6), &params, None);
    assert!(once.outcome.is_flattened());
    let twice = dewarp(&once.image, &params, None);
    assert!(twice.outcome.is_flattened());
    assert!(mean_abs_diff(&once.image, &twice.image) < 1.0);
}

#[test]
fn curved_page_is_fitted_and_traced() {
    init_logger();
    let mut params = DewarpParams::default();
    params.optimizer.max_iterations = 300;
    let result = Dewarper::new(params)
        .with_trace(true)
        .dewarp_image(&page(6.0, 10), None);

    let Outcome::Flattened {
        initial_residual,
        residual,
        ..
    } = result.outcome
    else {
        panic!("expected a fit, got {:?}", result.outcome);
    };
    assert!(initial_residual > 0.0);
    assert!(residual <= initial_residual);
    assert!(result.image.width() > 0 && result.image.height() > 0);

    let trace = result.trace.expect("trace");
    assert_eq!(trace.spans.len(), 6);
    assert!(trace.spans.iter().all(|s| s.members.len() == 6));
    assert!(trace.extents.is_some());
    assert_eq!(trace.image_size, (WIDTH as usize, HEIGHT as usize));
}

#[test]
fn contour_filter_can_reject_everything() {
    init_logger();
    let none = |_: &page_dewarp::spans::Contour| false;
    let result = dewarp(&page(0.0, 6), &DewarpParams::default(), Some(&none));
    assert!(matches!(
        result.outcome,
        Outcome::Unchanged(DewarpError::NoContours)
    ));
}
