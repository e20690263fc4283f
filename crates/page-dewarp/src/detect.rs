//! End-to-end helpers on `image::GrayImage`.

use crate::config::DewarpParams;
use crate::error::DewarpError;
use crate::pipeline::{ContourFilter, Dewarped, Dewarper, PageOutline};
use crate::preprocess::extract_outlines;
use page_dewarp_core as core;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Convert an `image::GrayImage` into the lightweight `page-dewarp-core` view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Wrap a row-major 8-bit buffer, checking its length against the dimensions.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DewarpError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DewarpError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(DewarpError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DewarpError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DewarpError::InvalidGrayDimensions { width, height })
}

fn into_image(img: core::GrayImage) -> Option<::image::GrayImage> {
    let width = u32::try_from(img.width).ok()?;
    let height = u32::try_from(img.height).ok()?;
    ::image::GrayImage::from_raw(width, height, img.data)
}

impl Dewarper {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width(), height = img.height()))
    )]
    pub fn detect_image(&self, img: &::image::GrayImage) -> Result<PageOutline, DewarpError> {
        let outlines = extract_outlines(img, &self.params().preprocess);
        self.detect_from_outlines(img.width() as usize, img.height() as usize, outlines)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, img, filter),
            fields(width = img.width(), height = img.height())
        )
    )]
    pub fn dewarp_image(
        &self,
        img: &::image::GrayImage,
        filter: Option<ContourFilter<'_>>,
    ) -> Dewarped<::image::GrayImage> {
        let outlines = extract_outlines(img, &self.params().preprocess);
        self.dewarp_from_outlines(&gray_view(img), outlines, filter)
            .map_image(|out| into_image(out).unwrap_or_else(|| img.clone()))
    }
}

/// Locate the page in a photo.
pub fn detect(img: &::image::GrayImage, params: &DewarpParams) -> Result<PageOutline, DewarpError> {
    Dewarper::new(params.clone()).detect_image(img)
}

/// Flatten a page photo. Photos without a detectable page come back unchanged.
pub fn dewarp(
    img: &::image::GrayImage,
    params: &DewarpParams,
    filter: Option<ContourFilter<'_>>,
) -> Dewarped<::image::GrayImage> {
    Dewarper::new(params.clone()).dewarp_image(img, filter)
}

pub fn detect_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: &DewarpParams,
) -> Result<PageOutline, DewarpError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    detect(&img, params)
}

pub fn dewarp_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: &DewarpParams,
) -> Result<Dewarped<::image::GrayImage>, DewarpError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    Ok(dewarp(&img, params, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_image_from_slice_checks_length() {
        let err = gray_image_from_slice(4, 3, &[0; 11]).expect_err("short buffer");
        assert!(matches!(
            err,
            DewarpError::InvalidGrayBuffer {
                expected: 12,
                got: 11
            }
        ));
        let img = gray_image_from_slice(4, 3, &[7; 12]).expect("image");
        assert_eq!(img.dimensions(), (4, 3));
    }

    #[test]
    fn gray_view_borrows_the_pixels() {
        let img = ::image::GrayImage::from_fn(5, 2, |x, y| ::image::Luma([(x + 10 * y) as u8]));
        let view = gray_view(&img);
        assert_eq!((view.width, view.height), (5, 2));
        assert_eq!(view.get(3, 1), Some(13));
    }

    #[test]
    fn blank_buffer_is_returned_unchanged() {
        let pixels = vec![240u8; 200 * 120];
        let out = dewarp_from_gray_u8(200, 120, &pixels, &DewarpParams::default()).expect("buffer");
        assert!(!out.outcome.is_flattened());
        assert_eq!(out.image.as_raw(), &pixels);
    }
}
