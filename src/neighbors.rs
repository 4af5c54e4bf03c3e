// neighbors.rs — Link base templates to their fine-tier neighbors.
//
// For each base direction i:
//
//   1. rank all subdivided vertices by Euclidean distance to base vertex i
//   2. keep the `num_nearest` closest (6 by default)
//   3. for every base rotation g and distance d, read γ₁ of base template
//      (i, g, d), take g2 = ⌊γ₁ / fine_step⌋ and attach, per kept vertex,
//      the neighbors at rotations
//
//          g2,  (g2 + steps + 1) mod steps,  (g2 + steps − 1) mod steps
//
//      where steps = 360 / fine_step.
//
// With the default tables every base template ends up with 6 × 3 = 18
// links, in nearest-vertex order then rotation-offset order. Links are not
// deduplicated.
//
// Ties in step 1 break on the vertex index so the result is deterministic.

use nalgebra::Vector3;

use crate::error::{Result, TrackError};
use crate::sphere::SphereSampling;
use crate::template::{NeighborRef, Template, TemplateBank};

/// Indices of the `k` candidates closest to `query`, nearest first.
pub fn nearest_vertices(query: &Vector3<f32>, candidates: &[Vector3<f32>], k: usize) -> Vec<usize> {
    let mut ranked: Vec<(f32, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(j, c)| ((query - c).norm(), j))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    ranked.into_iter().take(k).map(|(_, j)| j).collect()
}

/// Fine rotation indices `[g2, g2 + 1, g2 − 1]` (mod `steps`) for a base
/// rotation of `gamma` degrees.
pub fn rotation_neighbors(gamma: f32, fine_step: u32) -> Result<[usize; 3]> {
    if !gamma.is_finite() || !(0.0..360.0).contains(&gamma) || fine_step == 0 {
        return Err(TrackError::InvalidRotation(gamma));
    }
    let steps = (360 / fine_step) as usize;
    let g2 = (gamma / fine_step as f32).floor() as usize;
    if g2 >= steps {
        return Err(TrackError::IndexOutOfRange {
            what: "fine rotation",
            index: g2,
            len: steps,
        });
    }
    Ok([g2, (g2 + steps + 1) % steps, (g2 + steps - 1) % steps])
}

/// Attach neighboring templates to every base template of `bank`.
///
/// `base` and `subdiv` must be the samplings the bank was built from.
/// Returns the total number of links added.
pub fn link_neighbors<T: Template>(
    bank: &mut TemplateBank<T>,
    base: &SphereSampling,
    subdiv: &SphereSampling,
) -> Result<usize> {
    let num_directions = bank.base().num_directions();
    if base.len() != num_directions {
        return Err(TrackError::IndexOutOfRange {
            what: "base direction",
            index: base.len(),
            len: num_directions,
        });
    }
    if subdiv.len() != bank.neighbors().num_directions() {
        return Err(TrackError::IndexOutOfRange {
            what: "subdivided direction",
            index: subdiv.len(),
            len: bank.neighbors().num_directions(),
        });
    }

    let fine_step = bank.layout().fine_rotation_step;
    let num_nearest = bank.layout().num_nearest;
    let num_rotations = bank.base().num_rotations();
    let num_distances = bank.num_distances();
    let mut links = 0;

    for i in 0..num_directions {
        let nearest = nearest_vertices(base.vertex(i), subdiv.vertices(), num_nearest);
        for &j in &nearest {
            for g in 0..num_rotations {
                for d in 0..num_distances {
                    let gamma = bank.base().get(i, g, d)?.gamma();
                    let mut refs = [NeighborRef(0); 3];
                    for (slot, g_fine) in refs.iter_mut().zip(rotation_neighbors(gamma, fine_step)?) {
                        *slot = NeighborRef(bank.neighbors().index_of(j, g_fine, d)?);
                    }
                    let template = bank.base_mut().get_mut(i, g, d)?;
                    for r in refs {
                        template.add_neighbor_template(r);
                    }
                    links += refs.len();
                }
            }
        }
    }
    Ok(links)
}
