//! Error type shared by every module of the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::image::PixelFormat;
use crate::render::FrameChannel;

/// Errors raised while building template banks, transforming masks, or
/// loading configuration.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The distance transform only accepts `u8` and `f32` sources.
    #[error("unsupported pixel format {0:?} for distance transform (use u8 or f32)")]
    UnsupportedPixelFormat(PixelFormat),

    /// An output buffer does not match the input image size.
    #[error("size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        /// Expected width.
        expected_width: usize,
        /// Expected height.
        expected_height: usize,
        /// Actual width.
        width: usize,
        /// Actual height.
        height: usize,
    },

    /// A color literal is not of the form `#RRGGBB`.
    #[error("invalid color literal {0:?}: expected #RRGGBB")]
    InvalidColor(String),

    /// Rotation steps or counts that cannot tile the circle.
    #[error("invalid template layout: {0}")]
    InvalidLayout(String),

    /// A composite template index left its table. Only reachable if the
    /// sampling tables and the layout disagree.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Which table was addressed.
        what: &'static str,
        /// Offending index.
        index: usize,
        /// Table length.
        len: usize,
    },

    /// In-plane rotation outside `[0, 360)` or not finite.
    #[error("invalid in-plane rotation {0} degrees")]
    InvalidRotation(f32),

    /// The external template factory refused a request.
    #[error("template factory failed: {0}")]
    Factory(String),

    /// A render surface returned a buffer from the wrong channel.
    #[error("frame channel mismatch: expected {expected:?}, got {actual:?}")]
    ChannelMismatch {
        /// Requested channel.
        expected: FrameChannel,
        /// Channel actually delivered.
        actual: FrameChannel,
    },

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the expected keys.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl TrackError {
    /// Size mismatch between `expected` and `actual` `(width, height)` pairs.
    pub fn size_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::SizeMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: actual.0,
            height: actual.1,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TrackError>;
