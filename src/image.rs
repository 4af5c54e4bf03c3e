// image.rs — Runtime-sized image container shared by every pass.
//
// Masks, label images, distance fields, nearest-boundary fields and camera
// frames are all the same shape: a width × height grid stored row-major in a
// single Vec. Keeping one container means the row and column passes of the
// distance transform can hand out disjoint chunks of the buffer to worker
// partitions with plain slice splitting.
//
// Two layers of genericity:
//   Image<T>  : any Copy + Default sample (including non-numeric ones like
//               BoundaryPoint, whose Default is the "undefined" sentinel).
//   Pixel     : numeric samples that carry a PixelFormat tag, so algorithms
//               that only accept some formats can reject the rest at runtime
//               instead of failing to compile at the call site.

use std::fmt;

// ---------------------------------------------------------------------------
// Pixel formats
// ---------------------------------------------------------------------------

/// Runtime tag describing the element type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit unsigned, single channel.
    U8,
    /// 16-bit unsigned, single channel.
    U16,
    /// 32-bit float, single channel.
    F32,
    /// 8-bit unsigned, three channels (R, G, B).
    Rgb8,
}

/// Three-channel 8-bit color sample, stored as `[r, g, b]`.
pub type Rgb8 = [u8; 3];

/// Trait for numeric sample types that can be stored in an image and
/// inspected by the transform and overlay code.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + 'static {
    /// Format tag used for runtime dispatch.
    const FORMAT: PixelFormat;

    /// Raw scalar value (not normalized). Color samples return mean intensity.
    fn to_f32(self) -> f32;

    /// True for any sample other than the zero value.
    #[inline]
    fn is_nonzero(self) -> bool {
        self != Self::default()
    }
}

impl Pixel for u8 {
    const FORMAT: PixelFormat = PixelFormat::U8;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for u16 {
    const FORMAT: PixelFormat = PixelFormat::U16;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Pixel for f32 {
    const FORMAT: PixelFormat = PixelFormat::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    // -0.0 compares equal to 0.0, NaN counts as set.
    #[inline]
    fn is_nonzero(self) -> bool {
        self != 0.0
    }
}

impl Pixel for Rgb8 {
    const FORMAT: PixelFormat = PixelFormat::Rgb8;

    #[inline]
    fn to_f32(self) -> f32 {
        (self[0] as f32 + self[1] as f32 + self[2] as f32) / 3.0
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D grid with runtime dimensions, stored row-major without padding.
#[derive(Clone, PartialEq)]
pub struct Image<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy + Default> Image<T> {
    /// Create an image filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Create an image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Wrap an existing row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height }
    }

    /// Build an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image { data, width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// # Panics
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.bounds_check(x, y);
        self.data[y * self.width + x] = value;
    }

    /// Borrow row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &mut self.data[start..start + self.width]
    }

    /// Iterate over all samples as `(x, y, value)`.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % w, i / w, v))
    }

    /// Overwrite every sample with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Apply `f` to every sample, producing a new image of the same size.
    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Image<U> {
        Image {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl<T: Copy + Default> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.width + x]
    }
}

impl<T: Copy + Default> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.bounds_check(x, y);
        &mut self.data[y * self.width + x]
    }
}

// Small images print their top-left corner; handy in assertion failures.
impl<T: Copy + Default + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(16) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 16 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}
