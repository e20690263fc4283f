//! Lightweight grayscale raster types and bilinear sampling.
//!
//! Pixel centres sit at integer coordinates: `(0.0, 0.0)` is the centre of the
//! top-left pixel and `(w - 1, h - 1)` the centre of the bottom-right one.

/// Positions this far outside the pixel-centre grid still count as inside.
const EDGE_SLACK: f64 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Allocate a `width × height` image filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.view().get(x, y)
    }

    /// Write a pixel; out-of-range writes are ignored.
    pub fn put(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

impl<'a> GrayImageView<'a> {
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// True when `(x, y)` lies inside the pixel-centre grid.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.width == 0 || self.height == 0 || !x.is_finite() || !y.is_finite() {
            return false;
        }
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        x >= -EDGE_SLACK && y >= -EDGE_SLACK && x <= max_x + EDGE_SLACK && y <= max_y + EDGE_SLACK
    }

    #[inline]
    fn at_clamped(&self, x: i64, y: i64) -> f64 {
        let xc = x.clamp(0, self.width as i64 - 1) as usize;
        let yc = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[yc * self.width + xc] as f64
    }
}

/// Bilinear sample at `(x, y)`, or `background` outside the image.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f64, y: f64, background: u8) -> f64 {
    if !src.contains(x, y) {
        return background as f64;
    }
    let max_x = (src.width - 1) as f64;
    let max_y = (src.height - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.at_clamped(x0, y0);
    let p10 = src.at_clamped(x0 + 1, y0);
    let p01 = src.at_clamped(x0, y0 + 1);
    let p11 = src.at_clamped(x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f64, y: f64, background: u8) -> u8 {
    sample_bilinear(src, x, y, background).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> GrayImage {
        let mut img = GrayImage::filled(width, height, 0);
        for y in 0..height {
            for x in 0..width {
                img.put(x, y, (x * 10 + y) as u8);
            }
        }
        img
    }

    #[test]
    fn integer_positions_hit_pixels_exactly() {
        let img = ramp(5, 4);
        let view = img.view();
        for y in 0..4 {
            for x in 0..5 {
                let v = sample_bilinear_u8(&view, x as f64, y as f64, 255);
                assert_eq!(Some(v), img.get(x, y));
            }
        }
    }

    #[test]
    fn interpolates_between_neighbours() {
        let img = ramp(5, 4);
        let v = sample_bilinear(&img.view(), 1.5, 2.0, 255);
        assert!((v - 17.0).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn outside_returns_background() {
        let img = ramp(5, 4);
        let view = img.view();
        assert_eq!(sample_bilinear_u8(&view, -0.5, 1.0, 255), 255);
        assert_eq!(sample_bilinear_u8(&view, 4.01, 1.0, 7), 7);
        assert_eq!(sample_bilinear_u8(&view, f64::NAN, 1.0, 9), 9);
    }

    #[test]
    fn tiny_overshoot_at_border_is_tolerated() {
        let img = ramp(5, 4);
        let v = sample_bilinear_u8(&img.view(), 4.0 + 1e-9, 3.0, 255);
        assert_eq!(Some(v), img.get(4, 3));
    }
}
