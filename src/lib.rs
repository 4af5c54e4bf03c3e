// regiontrack: building blocks for region-based 6-DoF object tracking
//
// Two subsystems carry the tracker:
//   - viewpoint template sampling: an icosahedral covering of the viewing
//     sphere at several distances and in-plane rotations, with coarse→fine
//     neighbor links used to relocalize a lost object
//   - a parallel exact distance transform over boundary/label images, with
//     nearest-boundary coordinates and central-difference derivatives, the
//     numerical primitive of contour-distance energies
//
// Rendering, appearance models and pose optimization are external; the
// render surface and template factory traits mark those boundaries.

pub mod image;
pub mod error;
pub mod sphere;
pub mod template;
pub mod neighbors;
pub mod object;
pub mod sdt;
pub mod contour;
pub mod render;
pub mod overlay;
pub mod config;
pub mod camera;

pub use error::{Result, TrackError};
