// contour.rs — External contour of a binary mask.
//
// A pixel is on the external contour when it is set in the mask and either
// lies on the image border or touches (4-neighborhood) a background pixel
// that is connected to the image border. Background enclosed by the object
// (holes) does not produce contour pixels.
//
// The contour image is the usual source image for the distance transform in
// region-based tracking: its distance field measures how far every pixel is
// from the projected silhouette outline.

use std::collections::VecDeque;

use crate::image::{Image, Pixel};

/// Background pixels reachable from the image border through background.
fn outside_region<T: Pixel>(mask: &Image<T>) -> Image<bool> {
    let (w, h) = mask.size();
    let mut outside = Image::<bool>::new(w, h);
    let mut queue = VecDeque::new();

    let seed = |x: usize, y: usize, outside: &mut Image<bool>, queue: &mut VecDeque<(usize, usize)>| {
        if !mask.get(x, y).is_nonzero() && !outside.get(x, y) {
            outside.set(x, y, true);
            queue.push_back((x, y));
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, h - 1, &mut outside, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        seed(w - 1, y, &mut outside, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbors4(x, y, w, h) {
            seed(nx, ny, &mut outside, &mut queue);
        }
    }
    outside
}

fn neighbors4(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < w).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < h).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

/// External contour pixels in row-major order.
pub fn external_contour<T: Pixel>(mask: &Image<T>) -> Vec<(usize, usize)> {
    let (w, h) = mask.size();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let outside = outside_region(mask);
    mask.pixels()
        .filter(|&(x, y, v)| {
            v.is_nonzero()
                && (x == 0
                    || y == 0
                    || x + 1 == w
                    || y + 1 == h
                    || neighbors4(x, y, w, h).any(|(nx, ny)| outside.get(nx, ny)))
        })
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Contour as an image: `value` on contour pixels, 0 elsewhere.
pub fn contour_image<T: Pixel>(mask: &Image<T>, value: u8) -> Image<u8> {
    let mut out = Image::new(mask.width(), mask.height());
    for (x, y) in external_contour(mask) {
        out.set(x, y, value);
    }
    out
}
