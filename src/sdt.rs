// sdt.rs — Parallel exact Euclidean distance transform with nearest-source
// coordinates.
//
// Given a boundary/label image, every "source" pixel (non-zero, or equal to
// a label key) has distance 0, and every other pixel gets the Euclidean
// distance to the closest source, capped at `max_dist`. Alongside the
// distance the transform reports which source pixel is closest.
//
// ALGORITHM (Felzenszwalb & Huttenlocher, separable):
//
//   Row pass     for each row, the lower envelope of parabolas rooted at the
//                source columns gives the squared horizontal distance to the
//                nearest source in that row, and that source's column.
//
//   Column pass  for each column, the lower envelope of parabolas
//                (y − p)² + rowpass[p] gives the final squared distance and
//                the source row; the source column comes from the row pass
//                at that row.
//
// Both passes are O(n) per line. Every output pixel depends only on its own
// line, so partitioning lines across threads cannot change the result.
//
// PARALLEL LAYOUT:
//
//   rows    ─ par_chunks_mut over row-major buffers, `parts` row groups
//   columns ─ par_chunks_mut over a column-major buffer, `parts` col groups
//   gather  ─ par_chunks_mut over the row-major output, reading column-major
//
// Scratch buffers (v: envelope roots, z: envelope boundaries, f: the
// column being swept) are allocated inside each partition, sized by the
// larger image dimension, and dropped when the partition finishes.
//
// SIGN CONVENTION: the transform itself never produces negative values.
// Sources are 0, everything else is positive. Region-based energies that
// want inside-negative fields apply `apply_region_sign` with the region mask.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, TrackError};
use crate::image::{Image, Pixel, PixelFormat};

/// Squared distance marking "no source on this line".
const UNREACHABLE: u64 = u64::MAX;

/// Integer coordinate of the nearest source pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    pub x: i32,
    pub y: i32,
}

impl BoundaryPoint {
    /// No source reachable.
    pub const UNDEFINED: BoundaryPoint = BoundaryPoint { x: -1, y: -1 };

    pub fn new(x: i32, y: i32) -> Self {
        BoundaryPoint { x, y }
    }

    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED
    }
}

impl Default for BoundaryPoint {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

/// Output of [`DistanceTransform::compute_transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    /// Distance to the nearest source, capped at `max_dist`.
    pub distances: Image<f32>,
    /// Nearest source pixel, or [`BoundaryPoint::UNDEFINED`].
    pub nearest: Image<BoundaryPoint>,
}

impl DistanceField {
    /// Zero distances, undefined nearest points.
    pub fn new(width: usize, height: usize) -> Self {
        DistanceField {
            distances: Image::new(width, height),
            nearest: Image::new(width, height),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        self.distances.size()
    }

    pub fn distance(&self, x: usize, y: usize) -> f32 {
        self.distances.get(x, y)
    }

    pub fn nearest(&self, x: usize, y: usize) -> BoundaryPoint {
        self.nearest.get(x, y)
    }
}

/// Central-difference derivatives of a distance field.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceGradient {
    /// ∂/∂x; zero in the first and last column.
    pub dx: Image<f32>,
    /// ∂/∂y; zero in the first and last row.
    pub dy: Image<f32>,
}

impl DistanceGradient {
    pub fn new(width: usize, height: usize) -> Self {
        DistanceGradient {
            dx: Image::new(width, height),
            dy: Image::new(width, height),
        }
    }
}

/// Distance transform with a fixed distance cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceTransform {
    max_dist: f32,
}

impl DistanceTransform {
    pub fn new(max_dist: f32) -> Self {
        DistanceTransform { max_dist }
    }

    pub fn max_dist(&self) -> f32 {
        self.max_dist
    }

    /// Transform `src` into a fresh [`DistanceField`].
    ///
    /// `threads` is the number of row/column partitions (clamped to
    /// `[1, dimension]`). With `key = Some(k)`, `k != 0`, only pixels equal
    /// to `k` are sources; otherwise every non-zero pixel is.
    ///
    /// # Errors
    /// [`TrackError::UnsupportedPixelFormat`] unless `T` is `u8` or `f32`.
    pub fn compute_transform<T: Pixel>(
        &self,
        src: &Image<T>,
        threads: usize,
        key: Option<u8>,
    ) -> Result<DistanceField> {
        let mut out = DistanceField::new(src.width(), src.height());
        self.compute_transform_into(src, threads, key, &mut out)?;
        Ok(out)
    }

    /// Like [`compute_transform`](Self::compute_transform), writing into a
    /// caller-owned field of the same size. Every pixel is overwritten.
    pub fn compute_transform_into<T: Pixel>(
        &self,
        src: &Image<T>,
        threads: usize,
        key: Option<u8>,
        out: &mut DistanceField,
    ) -> Result<()> {
        match T::FORMAT {
            PixelFormat::U8 | PixelFormat::F32 => {}
            other => {
                warn!(format = ?other, "distance transform needs u8 or f32 input");
                return Err(TrackError::UnsupportedPixelFormat(other));
            }
        }
        if out.size() != src.size() {
            return Err(TrackError::size_mismatch(src.size(), out.size()));
        }
        if src.is_empty() {
            return Ok(());
        }

        match key.filter(|&k| k != 0) {
            Some(k) => {
                let k = k as f32;
                self.transform(src, threads, |p: T| p.to_f32() == k, out);
            }
            None => self.transform(src, threads, |p: T| p.is_nonzero(), out),
        }
        Ok(())
    }

    fn transform<T: Pixel>(
        &self,
        src: &Image<T>,
        threads: usize,
        is_source: impl Fn(T) -> bool + Sync,
        out: &mut DistanceField,
    ) {
        let (w, h) = src.size();
        let n = w.max(h);
        let row_parts = partitions(threads, h);
        let col_parts = partitions(threads, w);
        debug!(width = w, height = h, row_parts, col_parts, "distance transform");

        // Row pass: squared horizontal distance + source column per pixel.
        let mut dist_sq = vec![UNREACHABLE; w * h];
        let mut x_pos = vec![-1i32; w * h];
        let rows_per_part = h.div_ceil(row_parts);
        dist_sq
            .par_chunks_mut(rows_per_part * w)
            .zip(x_pos.par_chunks_mut(rows_per_part * w))
            .enumerate()
            .for_each(|(part, (d_chunk, x_chunk))| {
                let mut v = vec![0usize; n];
                let mut z = vec![0f64; n + 1];
                let y0 = part * rows_per_part;
                for (r, (d_row, x_row)) in d_chunk.chunks_mut(w).zip(x_chunk.chunks_mut(w)).enumerate() {
                    transform_row(src.row(y0 + r), &is_source, &mut v, &mut z, d_row, x_row);
                }
            });

        // Column pass into column-major buffers.
        let mut dist_cm = vec![0f32; w * h];
        let mut near_cm = vec![BoundaryPoint::UNDEFINED; w * h];
        let cols_per_part = w.div_ceil(col_parts);
        let max_dist = self.max_dist;
        dist_cm
            .par_chunks_mut(cols_per_part * h)
            .zip(near_cm.par_chunks_mut(cols_per_part * h))
            .enumerate()
            .for_each(|(part, (d_chunk, p_chunk))| {
                let mut v = vec![0usize; n];
                let mut z = vec![0f64; n + 1];
                let mut f = vec![0u64; n];
                let x0 = part * cols_per_part;
                for (c, (d_col, p_col)) in d_chunk.chunks_mut(h).zip(p_chunk.chunks_mut(h)).enumerate() {
                    let x = x0 + c;
                    for (y, fy) in f[..h].iter_mut().enumerate() {
                        *fy = dist_sq[y * w + x];
                    }
                    let column = ColumnInput {
                        f: &f[..h],
                        x,
                        x_pos: &x_pos,
                        width: w,
                        max_dist,
                    };
                    transform_col(&column, &mut v, &mut z, d_col, p_col);
                }
            });

        // Gather back to row-major.
        out.distances
            .as_mut_slice()
            .par_chunks_mut(rows_per_part * w)
            .zip(out.nearest.as_mut_slice().par_chunks_mut(rows_per_part * w))
            .enumerate()
            .for_each(|(part, (d_rows, p_rows))| {
                let y0 = part * rows_per_part;
                for (r, (d_row, p_row)) in d_rows.chunks_mut(w).zip(p_rows.chunks_mut(w)).enumerate() {
                    let y = y0 + r;
                    for x in 0..w {
                        d_row[x] = dist_cm[x * h + y];
                        p_row[x] = near_cm[x * h + y];
                    }
                }
            });
    }

    /// Central differences of `sdt` along x and y.
    pub fn compute_derivatives(&self, sdt: &Image<f32>, threads: usize) -> DistanceGradient {
        let mut grad = DistanceGradient::new(sdt.width(), sdt.height());
        central_differences(sdt, threads, &mut grad);
        grad
    }

    /// Like [`compute_derivatives`](Self::compute_derivatives), writing into
    /// caller-owned images of the same size.
    pub fn compute_derivatives_into(
        &self,
        sdt: &Image<f32>,
        threads: usize,
        out: &mut DistanceGradient,
    ) -> Result<()> {
        for img in [&out.dx, &out.dy] {
            if img.size() != sdt.size() {
                return Err(TrackError::size_mismatch(sdt.size(), img.size()));
            }
        }
        central_differences(sdt, threads, out);
        Ok(())
    }
}

/// Negate distances of pixels inside `region` (non-zero), producing an
/// inside-negative / outside-positive field.
pub fn apply_region_sign(sdt: &mut Image<f32>, region: &Image<u8>) -> Result<()> {
    if sdt.size() != region.size() {
        return Err(TrackError::size_mismatch(sdt.size(), region.size()));
    }
    for (d, &m) in sdt.as_mut_slice().iter_mut().zip(region.as_slice()) {
        if m != 0 {
            *d = -d.abs();
        }
    }
    Ok(())
}

/// Number of partitions for `len` lines.
fn partitions(threads: usize, len: usize) -> usize {
    threads.clamp(1, len.max(1))
}

// ---------------------------------------------------------------------------
// 1-D passes
// ---------------------------------------------------------------------------

/// Row pass for one row. All sources have f = 0, so consecutive envelope
/// pieces meet at the midpoint between their roots and nothing is ever
/// popped.
fn transform_row<T: Pixel>(
    row: &[T],
    is_source: &impl Fn(T) -> bool,
    v: &mut [usize],
    z: &mut [f64],
    dist_sq: &mut [u64],
    x_pos: &mut [i32],
) {
    let mut top: Option<usize> = None;
    for (q, &p) in row.iter().enumerate() {
        if !is_source(p) {
            continue;
        }
        let k = match top {
            None => {
                z[0] = f64::NEG_INFINITY;
                0
            }
            Some(k) => {
                z[k + 1] = (q + v[k]) as f64 / 2.0;
                k + 1
            }
        };
        v[k] = q;
        z[k + 1] = f64::INFINITY;
        top = Some(k);
    }

    if top.is_none() {
        dist_sq.fill(UNREACHABLE);
        x_pos.fill(-1);
        return;
    }

    let mut k = 0;
    for q in 0..row.len() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dx = q.abs_diff(v[k]) as u64;
        dist_sq[q] = dx * dx;
        x_pos[q] = v[k] as i32;
    }
}

struct ColumnInput<'a> {
    /// Row-pass squared distances down this column.
    f: &'a [u64],
    /// Column index.
    x: usize,
    /// Row-pass source columns, row-major.
    x_pos: &'a [i32],
    width: usize,
    max_dist: f32,
}

impl ColumnInput<'_> {
    /// Abscissa where the parabola rooted at `q` overtakes the one at `p`.
    #[inline]
    fn intersect(&self, q: usize, p: usize) -> f64 {
        let fq = self.f[q] as f64 + (q * q) as f64;
        let fp = self.f[p] as f64 + (p * p) as f64;
        (fq - fp) / (2.0 * (q - p) as f64)
    }
}

/// Column pass for one column; writes final distances and nearest points.
fn transform_col(
    col: &ColumnInput<'_>,
    v: &mut [usize],
    z: &mut [f64],
    dist: &mut [f32],
    nearest: &mut [BoundaryPoint],
) {
    let h = col.f.len();
    let mut top: Option<usize> = None;
    for q in 0..h {
        if col.f[q] == UNREACHABLE {
            continue;
        }
        match top {
            None => {
                v[0] = q;
                z[0] = f64::NEG_INFINITY;
                z[1] = f64::INFINITY;
                top = Some(0);
            }
            Some(mut k) => {
                // z[0] = -inf stops the pop loop at the first piece.
                let mut s = col.intersect(q, v[k]);
                while s <= z[k] {
                    k -= 1;
                    s = col.intersect(q, v[k]);
                }
                k += 1;
                v[k] = q;
                z[k] = s;
                z[k + 1] = f64::INFINITY;
                top = Some(k);
            }
        }
    }

    if top.is_none() {
        dist.fill(col.max_dist);
        nearest.fill(BoundaryPoint::UNDEFINED);
        return;
    }

    let mut k = 0;
    for q in 0..h {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dy = q.abs_diff(p) as u64;
        let d_sq = dy * dy + col.f[p];
        dist[q] = ((d_sq as f64).sqrt() as f32).min(col.max_dist);
        nearest[q] = BoundaryPoint::new(col.x_pos[p * col.width + col.x], p as i32);
    }
}

fn central_differences(sdt: &Image<f32>, threads: usize, out: &mut DistanceGradient) {
    let (w, h) = sdt.size();
    if w == 0 || h == 0 {
        return;
    }
    let rows_per_part = h.div_ceil(partitions(threads, h));
    out.dx
        .as_mut_slice()
        .par_chunks_mut(rows_per_part * w)
        .zip(out.dy.as_mut_slice().par_chunks_mut(rows_per_part * w))
        .enumerate()
        .for_each(|(part, (dx_rows, dy_rows))| {
            let y0 = part * rows_per_part;
            for (r, (dx, dy)) in dx_rows.chunks_mut(w).zip(dy_rows.chunks_mut(w)).enumerate() {
                let y = y0 + r;
                let row = sdt.row(y);
                dx[0] = 0.0;
                dx[w - 1] = 0.0;
                for x in 1..w.saturating_sub(1) {
                    dx[x] = 0.5 * (row[x + 1] - row[x - 1]);
                }
                if y == 0 || y + 1 == h {
                    dy.fill(0.0);
                } else {
                    let above = sdt.row(y - 1);
                    let below = sdt.row(y + 1);
                    for x in 0..w {
                        dy[x] = 0.5 * (below[x] - above[x]);
                    }
                }
            }
        });
}
