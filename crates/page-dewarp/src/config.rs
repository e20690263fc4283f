use crate::error::DewarpError;
use page_dewarp_model::{ModelParams, OptimizerParams, RemapParams};
use page_dewarp_spans::{ContourFilterParams, EdgeParams, SpanParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixels ignored along each image border when looking for text.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskInsets {
    /// Default: 50.
    pub left: u32,
    /// Default: 50.
    pub right: u32,
    /// Default: 20.
    pub top: u32,
    /// Default: 20.
    pub bottom: u32,
}

impl Default for MaskInsets {
    fn default() -> Self {
        Self {
            left: 50,
            right: 50,
            top: 20,
            bottom: 20,
        }
    }
}

/// Binarization and morphology applied before blob extraction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Radius of the adaptive-threshold mean window. Default: 27.
    pub block_radius: u32,
    /// A pixel is ink when it is this much darker than the local mean.
    /// Default: 25.
    pub threshold_offset: u8,
    /// Horizontal dilation radius joining glyphs into words. Default: 4.
    pub dilate_radius: u32,
    /// Vertical erosion radius detaching adjacent lines. Default: 1.
    pub erode_radius: u32,
    pub insets: MaskInsets,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            block_radius: 27,
            threshold_offset: 25,
            dilate_radius: 4,
            erode_radius: 1,
            insets: MaskInsets::default(),
        }
    }
}

/// Every tunable of the dewarping pipeline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DewarpParams {
    pub preprocess: PreprocessParams,
    pub contours: ContourFilterParams,
    pub edges: EdgeParams,
    pub spans: SpanParams,
    pub model: ModelParams,
    pub optimizer: OptimizerParams,
    pub remap: RemapParams,
}

impl DewarpParams {
    /// Parse a JSON config; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DewarpError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DewarpError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, DewarpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
