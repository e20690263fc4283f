//! Text mask and blob outlines from a grayscale page photo.

use crate::config::PreprocessParams;
use ::image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::filter::box_filter;
use nalgebra::Point2;

const INK: u8 = 255;

fn binarize(src: &GrayImage, keep: impl Fn(u8) -> bool) -> GrayImage {
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        Luma([if keep(src.get_pixel(x, y)[0]) { INK } else { 0 }])
    })
}

/// Ink mask: 255 where the page is darker than its surroundings, grown
/// horizontally into word blobs and thinned vertically to split lines.
pub fn text_mask(gray: &GrayImage, params: &PreprocessParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mean = box_filter(gray, params.block_radius, params.block_radius);
    let offset = i16::from(params.threshold_offset);
    let mut mask = GrayImage::from_fn(w, h, |x, y| {
        let v = i16::from(gray.get_pixel(x, y)[0]);
        let m = i16::from(mean.get_pixel(x, y)[0]);
        Luma([if v <= m - offset { INK } else { 0 }])
    });

    if params.dilate_radius > 0 {
        mask = binarize(&box_filter(&mask, params.dilate_radius, 0), |v| v > 0);
    }
    // Box means truncate, so only a window that is all ink stays at 255.
    if params.erode_radius > 0 {
        mask = binarize(&box_filter(&mask, 0, params.erode_radius), |v| v == INK);
    }

    let insets = &params.insets;
    let right = w.saturating_sub(insets.right);
    let bottom = h.saturating_sub(insets.bottom);
    for (x, y, p) in mask.enumerate_pixels_mut() {
        if x < insets.left || x >= right || y < insets.top || y >= bottom {
            *p = Luma([0]);
        }
    }
    mask
}

/// Outer borders of the ink blobs, one outline per blob.
pub fn blob_outlines(mask: &GrayImage) -> Vec<Vec<Point2<f64>>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| {
            c.points
                .iter()
                .map(|p| Point2::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect()
}

pub fn extract_outlines(gray: &GrayImage, params: &PreprocessParams) -> Vec<Vec<Point2<f64>>> {
    let outlines = blob_outlines(&text_mask(gray, params));
    log::debug!("extracted {} blob outlines", outlines.len());
    outlines
}
