// sphere.rs — Viewing-sphere sampling for template generation.
//
// Two fixed vertex tables cover the sphere of viewing directions around the
// object:
//
//   BASE_ICOSAHEDRON    12 vertices  : coarse tier, one base template per
//                                      vertex × in-plane rotation × distance
//   SUBDIV_ICOSAHEDRON  42 vertices  : first subdivision (12 original
//                                      directions + 30 edge midpoints pushed
//                                      out to the sphere), fine tier
//
// Template addressing and neighbor lookups depend on the exact table order
// and coordinates; do not derive or reorder them.
//
// Each vertex maps to a viewing direction:
//
//   elevation = acos(v.y / |v|) · 180/π − 90     ∈ [-90, 90]
//   azimuth   = atan2(v.x, v.z) · 180/π          ∈ (-180, 180]

use nalgebra::Vector3;

/// Golden ratio, truncated the way the base table stores it.
pub const GOLDEN_RATIO: f32 = 1.61803;

/// Vertices of the base icosahedron (12 vertices, unnormalized).
pub const BASE_ICOSAHEDRON: [[f32; 3]; 12] = [
    [0.0, 1.0, GOLDEN_RATIO],
    [1.0, GOLDEN_RATIO, 0.0],
    [-1.0, GOLDEN_RATIO, 0.0],
    [0.0, 1.0, -GOLDEN_RATIO],
    [GOLDEN_RATIO, 0.0, -1.0],
    [0.0, -1.0, -GOLDEN_RATIO],
    [-GOLDEN_RATIO, 0.0, -1.0],
    [-1.0, -GOLDEN_RATIO, 0.0],
    [-GOLDEN_RATIO, 0.0, 1.0],
    [0.0, -1.0, GOLDEN_RATIO],
    [GOLDEN_RATIO, 0.0, 1.0],
    [1.0, -GOLDEN_RATIO, 0.0],
];

/// Vertices of the once-subdivided icosahedron (42 vertices, radius ≈ 1.908).
pub const SUBDIV_ICOSAHEDRON: [[f32; 3]; 42] = [
    [0.0, 1.90811, 0.0],
    [-0.589637, 1.54369, 0.954053],
    [0.589637, 1.54369, 0.954053],
    [0.589637, 1.54369, -0.954053],
    [-0.589637, 1.54369, -0.954053],
    [0.0, 0.0, -1.90811],
    [0.954053, 0.589637, -1.54369],
    [0.954053, -0.589637, -1.54369],
    [-0.954053, -0.589637, -1.54369],
    [-0.954053, 0.589637, -1.54369],
    [-1.90811, 0.0, 0.0],
    [-1.54369, -0.954053, -0.589637],
    [-1.54369, -0.954053, 0.589637],
    [-1.54369, 0.954053, 0.589637],
    [-1.54369, 0.954053, -0.589637],
    [0.0, 0.0, 1.90811],
    [-0.954053, 0.589637, 1.54369],
    [-0.954053, -0.589637, 1.54369],
    [0.954053, -0.589637, 1.54369],
    [0.954053, 0.589637, 1.54369],
    [1.90811, 0.0, 0.0],
    [1.54369, -0.954053, 0.589637],
    [1.54369, -0.954053, -0.589637],
    [1.54369, 0.954053, -0.589637],
    [1.54369, 0.954053, 0.589637],
    [0.0, -1.90811, 0.0],
    [-0.589637, -1.54369, -0.954053],
    [0.589637, -1.54369, -0.954053],
    [0.589637, -1.54369, 0.954053],
    [-0.589637, -1.54369, 0.954053],
    [-1.00074, 1.61923, 0.0],
    [0.0, 1.00074, 1.61923],
    [1.00074, 1.61923, 0.0],
    [0.0, 1.00074, -1.61923],
    [1.61923, 0.0, -1.00074],
    [0.0, -1.00074, -1.61923],
    [-1.61923, 0.0, -1.00074],
    [-1.00074, -1.61923, 0.0],
    [-1.61923, 0.0, 1.00074],
    [0.0, -1.00074, 1.61923],
    [1.61923, 0.0, 1.00074],
    [1.00074, -1.61923, 0.0],
];

/// Camera viewing direction on the object's sphere, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDirection {
    /// Angle above (positive) or below (negative) the horizontal plane.
    pub elevation: f32,
    /// Angle around the vertical axis, measured from +z towards +x.
    pub azimuth: f32,
}

impl ViewDirection {
    /// Direction of a sphere vertex. The vertex need not be normalized.
    pub fn from_vertex(v: &Vector3<f32>) -> Self {
        let r = v.norm();
        ViewDirection {
            elevation: (v.y / r).acos().to_degrees() - 90.0,
            azimuth: v.x.atan2(v.z).to_degrees(),
        }
    }
}

/// An ordered set of sphere vertices together with their view directions.
///
/// Index `i` of [`vertex`](Self::vertex) and [`direction`](Self::direction)
/// refer to the same sample; this index is the leading term of the composite
/// template address.
#[derive(Debug, Clone)]
pub struct SphereSampling {
    vertices: Vec<Vector3<f32>>,
    directions: Vec<ViewDirection>,
}

impl SphereSampling {
    /// Build a sampling from a vertex table, keeping its order.
    pub fn from_vertices(table: &[[f32; 3]]) -> Self {
        let vertices: Vec<Vector3<f32>> = table
            .iter()
            .map(|&[x, y, z]| Vector3::new(x, y, z))
            .collect();
        let directions = vertices.iter().map(ViewDirection::from_vertex).collect();
        SphereSampling { vertices, directions }
    }

    /// The 12-vertex coarse sampling.
    pub fn base() -> Self {
        Self::from_vertices(&BASE_ICOSAHEDRON)
    }

    /// The 42-vertex fine sampling.
    pub fn subdivided() -> Self {
        Self::from_vertices(&SUBDIV_ICOSAHEDRON)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, i: usize) -> &Vector3<f32> {
        &self.vertices[i]
    }

    pub fn direction(&self, i: usize) -> ViewDirection {
        self.directions[i]
    }

    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    pub fn directions(&self) -> &[ViewDirection] {
        &self.directions
    }
}
