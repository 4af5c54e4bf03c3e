// overlay.rs — Composite render outputs onto the camera frame.
//
// Three styles share one entry point:
//
//   Contour   silhouette render → per-object mask → external contour pixels
//             painted in the overlay color
//   Mesh      shaded render, then the wireframe drawn straight onto the frame
//   Fragment  shaded render + depth; every pixel with non-zero depth takes
//             the rendered color
//
// The style is picked once when the overlay is set up; `draw_overlay` is the
// only per-frame call.

use crate::contour::external_contour;
use crate::error::{Result, TrackError};
use crate::image::{Image, Rgb8};
use crate::object::Model;
use crate::render::{FrameChannel, PolygonMode, RenderSurface};

/// Default overlay color, `#72e090`.
pub const DEFAULT_OVERLAY_COLOR: Rgb8 = [0x72, 0xe0, 0x90];

/// Parse a `#RRGGBB` literal.
pub fn parse_hex_color(s: &str) -> Result<Rgb8> {
    let invalid = || TrackError::InvalidColor(s.to_string());
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Overlay rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    Contour,
    Mesh,
    Fragment,
}

/// An overlay bound to a render surface and the models it draws.
pub struct Overlay<'a, R: RenderSurface> {
    style: OverlayStyle,
    surface: &'a mut R,
    objects: Vec<&'a Model>,
}

impl<'a, R: RenderSurface> Overlay<'a, R> {
    pub fn init(style: OverlayStyle, surface: &'a mut R, objects: Vec<&'a Model>) -> Self {
        Overlay {
            style,
            surface,
            objects,
        }
    }

    pub fn style(&self) -> OverlayStyle {
        self.style
    }

    /// Render the objects and composite them onto a copy of `frame`.
    ///
    /// # Errors
    /// [`TrackError::InvalidColor`] for a malformed `color`, or a channel
    /// or size mismatch from the render surface.
    pub fn draw_overlay(
        &mut self,
        frame: &Image<Rgb8>,
        mode: PolygonMode,
        color: &str,
    ) -> Result<Image<Rgb8>> {
        let color = parse_hex_color(color)?;
        self.surface.set_level(0);
        match self.style {
            OverlayStyle::Contour => self.draw_contours(frame, mode, color),
            OverlayStyle::Mesh => Ok(self.draw_mesh(frame, color)),
            OverlayStyle::Fragment => self.draw_fragments(frame, mode, color),
        }
    }

    fn draw_contours(&mut self, frame: &Image<Rgb8>, mode: PolygonMode, color: Rgb8) -> Result<Image<Rgb8>> {
        self.surface.render_silhouette(&self.objects, mode);
        // A single object is isolated from depth; several need the label buffer.
        let masks = if self.objects.len() > 1 {
            self.surface.download_frame(FrameChannel::Mask)
        } else {
            self.surface.download_frame(FrameChannel::Depth)
        };
        check_size(frame, masks.size())?;

        let mut result = frame.clone();
        for model in &self.objects {
            let mask = self.surface.convert_mask(&masks, model.id());
            check_size(frame, mask.size())?;
            for (x, y) in external_contour(&mask) {
                result.set(x, y, color);
            }
        }
        Ok(result)
    }

    fn draw_mesh(&mut self, frame: &Image<Rgb8>, color: Rgb8) -> Image<Rgb8> {
        self.surface
            .render_shaded(&self.objects, PolygonMode::Fill, &[unit_color(color)]);
        let mut result = frame.clone();
        if let Some(first) = self.objects.first() {
            self.surface.render_wireframe(first, &mut result, color);
        }
        result
    }

    fn draw_fragments(&mut self, frame: &Image<Rgb8>, mode: PolygonMode, color: Rgb8) -> Result<Image<Rgb8>> {
        self.surface.render_shaded(&self.objects, mode, &[unit_color(color)]);
        let rendering = self.surface.download_frame(FrameChannel::Rgb).into_rgb()?;
        let depth = self.surface.download_frame(FrameChannel::Depth).into_depth()?;
        check_size(frame, rendering.size())?;
        check_size(frame, depth.size())?;

        let mut result = frame.clone();
        for ((out, &rendered), &z) in result
            .as_mut_slice()
            .iter_mut()
            .zip(rendering.as_slice())
            .zip(depth.as_slice())
        {
            if z != 0.0 {
                *out = rendered;
            }
        }
        Ok(result)
    }
}

fn unit_color(c: Rgb8) -> [f32; 3] {
    [c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0]
}

fn check_size(frame: &Image<Rgb8>, size: (usize, usize)) -> Result<()> {
    if frame.size() == size {
        Ok(())
    } else {
        Err(TrackError::size_mismatch(frame.size(), size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectId, Pose};
    use crate::render::FrameBuffer;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#72e090").unwrap(), DEFAULT_OVERLAY_COLOR);
        assert_eq!(parse_hex_color("#FF0001").unwrap(), [255, 0, 1]);
        for bad in ["72e090", "#72e09", "#72e0900", "#zzzzzz", "", "#"] {
            assert!(
                matches!(parse_hex_color(bad), Err(TrackError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    /// Renders every model as the same axis-aligned square.
    struct SquareSurface {
        size: usize,
        square: (usize, usize, usize),
        level: Option<usize>,
        shaded_colors: Vec<[f32; 3]>,
        wireframes: usize,
    }

    impl SquareSurface {
        fn new() -> Self {
            SquareSurface { size: 12, square: (3, 3, 5), level: None, shaded_colors: Vec::new(), wireframes: 0 }
        }

        fn inside(&self, x: usize, y: usize) -> bool {
            let (x0, y0, s) = self.square;
            x >= x0 && x < x0 + s && y >= y0 && y < y0 + s
        }
    }

    impl RenderSurface for SquareSurface {
        fn set_level(&mut self, level: usize) {
            self.level = Some(level);
        }

        fn render_silhouette(&mut self, _objects: &[&Model], _mode: PolygonMode) {}

        fn render_shaded(&mut self, _objects: &[&Model], _mode: PolygonMode, colors: &[[f32; 3]]) {
            self.shaded_colors = colors.to_vec();
        }

        fn render_wireframe(&mut self, _object: &Model, target: &mut Image<Rgb8>, color: Rgb8) {
            self.wireframes += 1;
            target.set(0, 0, color);
        }

        fn download_frame(&mut self, channel: FrameChannel) -> FrameBuffer {
            let n = self.size;
            match channel {
                FrameChannel::Rgb => FrameBuffer::Rgb(Image::filled(n, n, [10, 20, 30])),
                FrameChannel::Depth => {
                    FrameBuffer::Depth(Image::from_fn(n, n, |x, y| if self.inside(x, y) { 0.5 } else { 0.0 }))
                }
                FrameChannel::Mask => {
                    FrameBuffer::Mask(Image::from_fn(n, n, |x, y| self.inside(x, y) as u8))
                }
            }
        }

        fn convert_mask(&self, masks: &FrameBuffer, _object: ObjectId) -> Image<u8> {
            let n = self.size;
            match masks {
                FrameBuffer::Depth(d) => d.map(|z| if z != 0.0 { 255 } else { 0 }),
                FrameBuffer::Mask(m) => m.map(|v| if v != 0 { 255 } else { 0 }),
                FrameBuffer::Rgb(_) => Image::new(n, n),
            }
        }
    }

    fn model() -> Model {
        Model::new(ObjectId(1), Pose::identity(), 1.0)
    }

    #[test]
    fn test_contour_overlay_paints_outline() {
        let m = model();
        let mut surface = SquareSurface::new();
        let frame = Image::<Rgb8>::new(12, 12);
        let mut overlay = Overlay::init(OverlayStyle::Contour, &mut surface, vec![&m]);
        let out = overlay.draw_overlay(&frame, PolygonMode::Fill, "#ff0000").unwrap();
        assert_eq!(out.get(3, 3), [255, 0, 0]);
        assert_eq!(out.get(7, 5), [255, 0, 0]);
        assert_eq!(out.get(5, 5), [0, 0, 0]); // interior untouched
        assert_eq!(out.get(0, 0), [0, 0, 0]);
        assert_eq!(surface.level, Some(0));
    }

    #[test]
    fn test_fragment_overlay_uses_depth() {
        let m = model();
        let mut surface = SquareSurface::new();
        let frame = Image::filled(12, 12, [1, 1, 1]);
        let mut overlay = Overlay::init(OverlayStyle::Fragment, &mut surface, vec![&m]);
        let out = overlay.draw_overlay(&frame, PolygonMode::Fill, "#ffffff").unwrap();
        assert_eq!(out.get(5, 5), [10, 20, 30]);
        assert_eq!(out.get(11, 11), [1, 1, 1]);
        assert_eq!(surface.shaded_colors, vec![[1.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_mesh_overlay_draws_first_object() {
        let (a, b) = (model(), model());
        let mut surface = SquareSurface::new();
        let frame = Image::<Rgb8>::new(12, 12);
        let mut overlay = Overlay::init(OverlayStyle::Mesh, &mut surface, vec![&a, &b]);
        let out = overlay.draw_overlay(&frame, PolygonMode::Line, "#010203").unwrap();
        assert_eq!(out.get(0, 0), [1, 2, 3]);
        assert_eq!(surface.wireframes, 1);
    }

    #[test]
    fn test_bad_color_renders_nothing() {
        let m = model();
        let mut surface = SquareSurface::new();
        let frame = Image::<Rgb8>::new(12, 12);
        let mut overlay = Overlay::init(OverlayStyle::Fragment, &mut surface, vec![&m]);
        assert!(overlay.draw_overlay(&frame, PolygonMode::Fill, "green").is_err());
        assert_eq!(surface.level, None);
    }

    #[test]
    fn test_frame_size_mismatch() {
        let m = model();
        let mut surface = SquareSurface::new();
        let frame = Image::<Rgb8>::new(8, 8);
        let mut overlay = Overlay::init(OverlayStyle::Contour, &mut surface, vec![&m]);
        let err = overlay.draw_overlay(&frame, PolygonMode::Fill, "#000000").unwrap_err();
        assert!(matches!(err, TrackError::SizeMismatch { .. }));
    }
}
