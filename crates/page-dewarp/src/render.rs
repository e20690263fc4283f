//! Debug overlays drawn from a [`DewarpTrace`].

use crate::error::DewarpError;
use crate::trace::DewarpTrace;
use ::image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra::Point2;
use std::path::Path;

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
];
const OBSERVED: Rgb<u8> = Rgb([255, 0, 0]);
const PROJECTED: Rgb<u8> = Rgb([0, 0, 255]);
const LINK: Rgb<u8> = Rgb([255, 255, 255]);

/// Which projections to compare against the observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Initial,
    Fitted,
}

fn color(i: usize) -> Rgb<u8> {
    PALETTE[i % PALETTE.len()]
}

fn to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

fn segment(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, c: Rgb<u8>) {
    draw_line_segment_mut(img, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), c);
}

fn dot(img: &mut RgbImage, p: Point2<f64>, radius: i32, c: Rgb<u8>) {
    draw_filled_circle_mut(img, (p.x.round() as i32, p.y.round() as i32), radius, c);
}

fn polyline(img: &mut RgbImage, points: &[Point2<f64>], c: Rgb<u8>) {
    for w in points.windows(2) {
        segment(img, w[0], w[1], c);
    }
}

pub fn render_contours(gray: &GrayImage, trace: &DewarpTrace) -> RgbImage {
    let mut img = to_rgb(gray);
    for (i, contour) in trace.contours.iter().enumerate() {
        let c = color(i);
        polyline(&mut img, &contour.outline, c);
        if let (Some(&first), Some(&last)) = (contour.outline.first(), contour.outline.last()) {
            segment(&mut img, last, first, c);
        }
    }
    img
}

/// Span chains through member centres, one colour per span.
pub fn render_spans(gray: &GrayImage, trace: &DewarpTrace) -> RgbImage {
    let mut img = to_rgb(gray);
    for (i, span) in trace.spans.iter().enumerate() {
        let c = color(i);
        let centres: Vec<Point2<f64>> = span
            .members
            .iter()
            .filter_map(|&m| trace.contours.get(m))
            .map(|contour| contour.center)
            .collect();
        polyline(&mut img, &centres, LINK);
        for &p in &centres {
            dot(&mut img, p, 3, c);
        }
    }
    img
}

pub fn render_keypoints(gray: &GrayImage, trace: &DewarpTrace) -> RgbImage {
    let mut img = to_rgb(gray);
    for (i, sampled) in trace.sampled.iter().enumerate() {
        let c = color(i);
        polyline(&mut img, &sampled.keypoints, c);
        for &p in &sampled.keypoints {
            dot(&mut img, p, 2, c);
        }
    }
    img
}

/// Observed keypoints (red) joined to their projections (blue).
pub fn render_correspondences(gray: &GrayImage, trace: &DewarpTrace, stage: Stage) -> RgbImage {
    let mut img = to_rgb(gray);
    let Some(info) = trace.span_info.as_ref() else {
        return img;
    };
    let projections = match stage {
        Stage::Initial => &trace.initial_projections,
        Stage::Fitted => &trace.fitted_projections,
    };
    let normalizer = &info.normalizer;
    for (&obs, &proj) in info.observed.iter().zip(projections) {
        let a = normalizer.norm_to_pix(obs);
        let b = normalizer.norm_to_pix(proj);
        segment(&mut img, a, b, LINK);
        dot(&mut img, a, 2, OBSERVED);
        dot(&mut img, b, 2, PROJECTED);
    }
    img
}

/// Write every overlay and `trace.json` into `dir`.
pub fn write_debug_images(
    dir: impl AsRef<Path>,
    gray: &GrayImage,
    trace: &DewarpTrace,
) -> Result<(), DewarpError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    render_contours(gray, trace).save(dir.join("contours.png"))?;
    render_spans(gray, trace).save(dir.join("spans.png"))?;
    render_keypoints(gray, trace).save(dir.join("keypoints.png"))?;
    render_correspondences(gray, trace, Stage::Initial).save(dir.join("initial.png"))?;
    render_correspondences(gray, trace, Stage::Fitted).save(dir.join("fitted.png"))?;
    std::fs::write(dir.join("trace.json"), trace.to_json_string()?)?;
    log::debug!("debug images written to {}", dir.display());
    Ok(())
}
