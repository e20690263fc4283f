use serde::{Deserialize, Serialize};

/// Shape gates applied to every blob outline before it becomes a text contour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContourFilterParams {
    /// Minimal bounding-box width in pixels.
    pub min_width: f64,
    /// Minimal bounding-box height in pixels.
    pub min_height: f64,
    /// Minimal width / height ratio; text blobs are elongated.
    pub min_aspect: f64,
    /// Maximal column-wise thickness in pixels.
    pub max_thickness: f64,
}

impl Default for ContourFilterParams {
    fn default() -> Self {
        Self {
            min_width: 15.0,
            min_height: 2.0,
            min_aspect: 1.5,
            max_thickness: 10.0,
        }
    }
}

/// Thresholds and weights of the pairwise contour edge score.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeParams {
    /// Maximal gap between the right anchor of the left contour and the left
    /// anchor of the right one, in pixels.
    pub max_distance: f64,
    /// Maximal deviation of either contour from the connecting direction.
    pub max_angle_deg: f64,
    /// Minimal intersection-over-union of the two vertical extents.
    pub min_overlap: f64,
    /// Maximal overlap along either contour's own axis, in pixels.
    pub max_horizontal_overlap: f64,
    /// Score added per degree of angle deviation.
    pub angle_cost: f64,
    /// Score added for a vertical overlap of zero, scaled down linearly to
    /// nothing at full overlap.
    pub overlap_cost: f64,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            max_angle_deg: 7.5,
            min_overlap: 0.25,
            max_horizontal_overlap: 1.0,
            angle_cost: 10.0,
            overlap_cost: 10.0,
        }
    }
}

/// Span acceptance and keypoint sampling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpanParams {
    /// Minimal number of member contours.
    pub min_contours: usize,
    /// Minimal summed member width in pixels.
    pub min_width: f64,
    /// Keypoint spacing along the baseline in pixels.
    pub step: f64,
}

impl Default for SpanParams {
    fn default() -> Self {
        Self {
            min_contours: 1,
            min_width: 30.0,
            step: 20.0,
        }
    }
}
