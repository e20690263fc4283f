/// Errors produced by the dewarping pipeline and its helpers.
#[derive(thiserror::Error, Debug)]
pub enum DewarpError {
    #[error("no page detected: no text-like contours")]
    NoContours,

    #[error("no page detected: no text spans survived assembly")]
    NoSpans,

    #[error("no page detected: no keypoints could be sampled")]
    NoKeypoints,

    #[error(transparent)]
    Remap(#[from] page_dewarp_model::RemapError),

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl DewarpError {
    /// True for the "no page detected" family, where the input is returned
    /// unchanged instead of failing.
    pub fn is_degenerate_input(&self) -> bool {
        matches!(self, Self::NoContours | Self::NoSpans | Self::NoKeypoints)
    }
}
