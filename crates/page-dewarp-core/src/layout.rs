//! Layout of the flat parameter vector fitted by the optimizer.
//!
//! ```text
//! [ rvec(3) | tvec(3) | alpha | beta | span offsets (n_spans) | columns (n_keypoints) ]
//! ```
//!
//! Span offsets hold the flat-page y of each span's baseline; columns hold the
//! flat-page x of each sampled keypoint.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Parameter slots `(x, y)` that hold the flat-page coordinates of one
/// observed point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyIndex {
    pub x: usize,
    pub y: usize,
}

impl KeyIndex {
    /// Index pair of the page anchor; its flat coordinates are always `(0, 0)`.
    pub const ANCHOR: KeyIndex = KeyIndex { x: 0, y: 0 };
}

/// Position of a keypoint within its span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeypointRef {
    pub span: usize,
    pub offset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamLayout {
    span_count: usize,
    keypoint_count: usize,
}

impl ParamLayout {
    pub const ROTATION: Range<usize> = 0..3;
    pub const TRANSLATION: Range<usize> = 3..6;
    pub const ALPHA: usize = 6;
    pub const BETA: usize = 7;
    /// Camera pose plus the two curvature coefficients.
    pub const FIXED: usize = 8;

    pub fn new(span_count: usize, keypoint_count: usize) -> Self {
        Self {
            span_count,
            keypoint_count,
        }
    }

    pub fn span_count(&self) -> usize {
        self.span_count
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoint_count
    }

    /// Total number of unknowns.
    pub fn param_count(&self) -> usize {
        Self::FIXED + self.span_count + self.keypoint_count
    }

    pub fn span_offsets(&self) -> Range<usize> {
        Self::FIXED..Self::FIXED + self.span_count
    }

    pub fn columns(&self) -> Range<usize> {
        let start = Self::FIXED + self.span_count;
        start..start + self.keypoint_count
    }

    pub fn span_offset_slot(&self, span: usize) -> usize {
        debug_assert!(span < self.span_count);
        Self::FIXED + span
    }

    pub fn column_slot(&self, keypoint: usize) -> usize {
        debug_assert!(keypoint < self.keypoint_count);
        Self::FIXED + self.span_count + keypoint
    }

    /// Slots for global keypoint `keypoint` lying on span `span`.
    pub fn key_index(&self, span: usize, keypoint: usize) -> KeyIndex {
        KeyIndex {
            x: self.column_slot(keypoint),
            y: self.span_offset_slot(span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_tile_the_vector() {
        let layout = ParamLayout::new(3, 10);
        assert_eq!(layout.param_count(), 21);
        assert_eq!(layout.span_offsets(), 8..11);
        assert_eq!(layout.columns(), 11..21);
        assert_eq!(ParamLayout::ROTATION.end, ParamLayout::TRANSLATION.start);
        assert_eq!(ParamLayout::TRANSLATION.end, ParamLayout::ALPHA);
    }

    #[test]
    fn key_index_points_at_span_and_column() {
        let layout = ParamLayout::new(2, 5);
        assert_eq!(layout.key_index(1, 4), KeyIndex { x: 14, y: 9 });
        assert_eq!(layout.key_index(0, 0), KeyIndex { x: 10, y: 8 });
    }

    #[test]
    fn empty_layout_keeps_fixed_block() {
        let layout = ParamLayout::new(0, 0);
        assert_eq!(layout.param_count(), ParamLayout::FIXED);
        assert!(layout.columns().is_empty());
    }
}
