// render.rs — Boundary to the GPU render surface.
//
// The renderer rasterizes silhouettes, shaded models and depth for a set of
// models and hands the results back as CPU images. Rendering itself lives
// outside this crate; the overlays and any mask-to-distance-field glue only
// see this trait. The surface is an explicitly owned value passed by
// reference, never a global.

use crate::error::{Result, TrackError};
use crate::image::{Image, Rgb8};
use crate::object::{Model, ObjectId};

/// Which buffer to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameChannel {
    /// Shaded color rendering.
    Rgb,
    /// Depth buffer; 0 where nothing was drawn.
    Depth,
    /// Per-pixel object label for multi-object scenes.
    Mask,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

/// A downloaded buffer, tagged by channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBuffer {
    Rgb(Image<Rgb8>),
    Depth(Image<f32>),
    Mask(Image<u8>),
}

impl FrameBuffer {
    pub fn channel(&self) -> FrameChannel {
        match self {
            FrameBuffer::Rgb(_) => FrameChannel::Rgb,
            FrameBuffer::Depth(_) => FrameChannel::Depth,
            FrameBuffer::Mask(_) => FrameChannel::Mask,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        match self {
            FrameBuffer::Rgb(img) => img.size(),
            FrameBuffer::Depth(img) => img.size(),
            FrameBuffer::Mask(img) => img.size(),
        }
    }

    pub fn into_rgb(self) -> Result<Image<Rgb8>> {
        match self {
            FrameBuffer::Rgb(img) => Ok(img),
            other => Err(mismatch(FrameChannel::Rgb, &other)),
        }
    }

    pub fn into_depth(self) -> Result<Image<f32>> {
        match self {
            FrameBuffer::Depth(img) => Ok(img),
            other => Err(mismatch(FrameChannel::Depth, &other)),
        }
    }

    pub fn into_mask(self) -> Result<Image<u8>> {
        match self {
            FrameBuffer::Mask(img) => Ok(img),
            other => Err(mismatch(FrameChannel::Mask, &other)),
        }
    }
}

fn mismatch(expected: FrameChannel, got: &FrameBuffer) -> TrackError {
    TrackError::ChannelMismatch {
        expected,
        actual: got.channel(),
    }
}

/// Operations the presentation layer needs from a renderer.
pub trait RenderSurface {
    /// Select the pyramid level subsequent renders use.
    fn set_level(&mut self, level: usize);

    /// Rasterize silhouettes (depth + labels) of `objects`.
    fn render_silhouette(&mut self, objects: &[&Model], mode: PolygonMode);

    /// Rasterize `objects` with Phong shading, one color per object
    /// (components in `[0, 1]`, the last color repeats).
    fn render_shaded(&mut self, objects: &[&Model], mode: PolygonMode, colors: &[[f32; 3]]);

    /// Draw the wireframe of `object` directly onto `target`.
    fn render_wireframe(&mut self, object: &Model, target: &mut Image<Rgb8>, color: Rgb8);

    /// Read a buffer of the last render back to the CPU.
    fn download_frame(&mut self, channel: FrameChannel) -> FrameBuffer;

    /// Isolate one object's mask (255 inside, 0 outside) from a label or
    /// depth buffer.
    fn convert_mask(&self, masks: &FrameBuffer, object: ObjectId) -> Image<u8>;
}
