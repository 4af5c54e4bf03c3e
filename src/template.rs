// template.rs — Viewpoint template bank.
//
// A template is a reference rendering of the object from one viewpoint,
// identified by (view direction, in-plane rotation γ, distance). The payload
// (appearance histograms, rendered silhouettes at several pyramid levels) is
// produced by an external factory; this module only decides WHICH templates
// exist and WHERE each one lives.
//
// Addressing. Both tiers are flat vectors addressed by
//
//   index = i · num_rotations · num_distances + g · num_distances + d
//
//   i: sphere vertex, in table order
//   g: rotation step (γ = g · rotation_step)
//   d: position in the requested distance list
//
// Neighbor linking relies on this layout, so the bank is built in exactly
// this nested order and never reordered.
//
// Default tiers:
//   base      12 directions × 4 rotations (90°) × D distances
//   neighbors 42 directions × 12 rotations (30°) × D distances

use crate::error::{Result, TrackError};
use crate::object::{Model, ObjectId};
use crate::sphere::{SphereSampling, ViewDirection};

/// Which sampling tier a template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateTier {
    /// Coarse template matched first during relocalization.
    Base,
    /// Fine template used to refine a base match locally.
    Neighbor,
}

/// Reference from a base template to an entry of the neighboring index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeighborRef(pub usize);

/// Everything a factory needs to produce one template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateRequest {
    /// Owning object (non-owning back reference).
    pub object: ObjectId,
    pub direction: ViewDirection,
    /// In-plane rotation, degrees in `[0, 360)`.
    pub gamma: f32,
    /// Object-to-camera distance, model units.
    pub distance: f32,
    /// Number of pyramid levels the template pre-renders.
    pub num_levels: usize,
    pub tier: TemplateTier,
}

/// Operations the bank needs from a template handle.
pub trait Template {
    /// In-plane rotation the template was created with, degrees.
    fn gamma(&self) -> f32;

    /// Attach a neighboring template. Called once per link, duplicates
    /// included, in deterministic order.
    fn add_neighbor_template(&mut self, neighbor: NeighborRef);
}

/// Produces template handles. Implementations typically render the model,
/// which is why they receive it mutably.
pub trait TemplateFactory {
    type Template: Template;

    fn create(&mut self, model: &mut Model, request: &TemplateRequest) -> Result<Self::Template>;
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Angular sampling parameters of the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    /// Pyramid levels per template.
    pub num_levels: usize,
    /// Rotation step of base templates, degrees.
    pub base_rotation_step: u32,
    /// Number of base rotations (0, step, 2·step, ...).
    pub num_base_rotations: usize,
    /// Rotation step of neighboring templates, degrees. Must divide 360.
    pub fine_rotation_step: u32,
    /// Closest subdivided directions linked to each base direction.
    pub num_nearest: usize,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        TemplateLayout {
            num_levels: 4,
            base_rotation_step: 90,
            num_base_rotations: 4,
            fine_rotation_step: 30,
            num_nearest: 6,
        }
    }
}

impl TemplateLayout {
    /// Number of fine rotation steps around the circle.
    pub fn fine_rotation_steps(&self) -> usize {
        (360 / self.fine_rotation_step.max(1)) as usize
    }

    /// Check that the rotation steps tile the circle.
    pub fn validate(&self) -> Result<()> {
        if self.base_rotation_step == 0 || self.fine_rotation_step == 0 {
            return Err(TrackError::InvalidLayout("rotation step must be positive".into()));
        }
        if 360 % self.fine_rotation_step != 0 {
            return Err(TrackError::InvalidLayout(format!(
                "fine rotation step {} does not divide 360",
                self.fine_rotation_step
            )));
        }
        let span = self.base_rotation_step as usize * self.num_base_rotations;
        if span > 360 {
            return Err(TrackError::InvalidLayout(format!(
                "{} base rotations of {} degrees exceed a full turn",
                self.num_base_rotations, self.base_rotation_step
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TemplateIndex
// ---------------------------------------------------------------------------

/// Flat, ordered template table with composite `(direction, rotation,
/// distance)` addressing.
#[derive(Debug, Clone)]
pub struct TemplateIndex<T> {
    what: &'static str,
    templates: Vec<T>,
    num_directions: usize,
    num_rotations: usize,
    num_distances: usize,
}

impl<T> TemplateIndex<T> {
    fn with_shape(
        what: &'static str,
        num_directions: usize,
        num_rotations: usize,
        num_distances: usize,
    ) -> Self {
        TemplateIndex {
            what,
            templates: Vec::with_capacity(num_directions * num_rotations * num_distances),
            num_directions,
            num_rotations,
            num_distances,
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn num_directions(&self) -> usize {
        self.num_directions
    }

    pub fn num_rotations(&self) -> usize {
        self.num_rotations
    }

    pub fn num_distances(&self) -> usize {
        self.num_distances
    }

    /// Composite address of `(direction, rotation, distance)`.
    ///
    /// Every component is range-checked, and so is the flat result against
    /// the table contents.
    pub fn index_of(&self, direction: usize, rotation: usize, distance: usize) -> Result<usize> {
        check(self.what, direction, self.num_directions)?;
        check(self.what, rotation, self.num_rotations)?;
        check(self.what, distance, self.num_distances)?;
        let index = direction * self.num_rotations * self.num_distances
            + rotation * self.num_distances
            + distance;
        check(self.what, index, self.templates.len())?;
        Ok(index)
    }

    pub fn get(&self, direction: usize, rotation: usize, distance: usize) -> Result<&T> {
        let i = self.index_of(direction, rotation, distance)?;
        Ok(&self.templates[i])
    }

    pub fn get_mut(&mut self, direction: usize, rotation: usize, distance: usize) -> Result<&mut T> {
        let i = self.index_of(direction, rotation, distance)?;
        Ok(&mut self.templates[i])
    }

    /// Template at a flat position.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.templates.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.templates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.templates.iter()
    }
}

fn check(what: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(TrackError::IndexOutOfRange { what, index, len })
    }
}

// ---------------------------------------------------------------------------
// TemplateBank
// ---------------------------------------------------------------------------

/// Base and neighboring template tiers of one object.
#[derive(Debug, Clone)]
pub struct TemplateBank<T> {
    base: TemplateIndex<T>,
    neighbors: TemplateIndex<T>,
    layout: TemplateLayout,
    distances: Vec<f32>,
}

impl<T: Template> TemplateBank<T> {
    /// Instantiate every base and neighboring template, without linking.
    ///
    /// An empty `distances` list yields two empty tiers.
    pub fn build<F>(
        model: &mut Model,
        factory: &mut F,
        base: &SphereSampling,
        subdiv: &SphereSampling,
        distances: &[f32],
        layout: &TemplateLayout,
    ) -> Result<Self>
    where
        F: TemplateFactory<Template = T>,
    {
        layout.validate()?;
        let object = model.id();

        let mut base_index = TemplateIndex::with_shape(
            "base template",
            base.len(),
            layout.num_base_rotations,
            distances.len(),
        );
        for &direction in base.directions() {
            for g in 0..layout.num_base_rotations {
                let gamma = (g as u32 * layout.base_rotation_step) as f32;
                for &distance in distances {
                    let request = TemplateRequest {
                        object,
                        direction,
                        gamma,
                        distance,
                        num_levels: layout.num_levels,
                        tier: TemplateTier::Base,
                    };
                    base_index.templates.push(factory.create(model, &request)?);
                }
            }
        }

        let fine_steps = layout.fine_rotation_steps();
        let mut neighbor_index =
            TemplateIndex::with_shape("neighbor template", subdiv.len(), fine_steps, distances.len());
        for &direction in subdiv.directions() {
            for g in 0..fine_steps {
                let gamma = (g as u32 * layout.fine_rotation_step) as f32;
                for &distance in distances {
                    let request = TemplateRequest {
                        object,
                        direction,
                        gamma,
                        distance,
                        num_levels: layout.num_levels,
                        tier: TemplateTier::Neighbor,
                    };
                    neighbor_index.templates.push(factory.create(model, &request)?);
                }
            }
        }

        Ok(TemplateBank {
            base: base_index,
            neighbors: neighbor_index,
            layout: layout.clone(),
            distances: distances.to_vec(),
        })
    }
}

impl<T> TemplateBank<T> {
    pub fn base(&self) -> &TemplateIndex<T> {
        &self.base
    }

    pub fn neighbors(&self) -> &TemplateIndex<T> {
        &self.neighbors
    }

    pub(crate) fn base_mut(&mut self) -> &mut TemplateIndex<T> {
        &mut self.base
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    pub fn num_distances(&self) -> usize {
        self.distances.len()
    }

    /// Resolve a neighbor reference held by a base template.
    pub fn neighbor(&self, r: NeighborRef) -> Option<&T> {
        self.neighbors.at(r.0)
    }
}

// ---------------------------------------------------------------------------
// Default handle
// ---------------------------------------------------------------------------

/// Template handle that records its request and neighbor links. Useful when
/// the appearance payload is attached later, and as a reference
/// implementation of [`Template`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDescriptor {
    pub request: TemplateRequest,
    pub neighbors: Vec<NeighborRef>,
}

impl Template for TemplateDescriptor {
    fn gamma(&self) -> f32 {
        self.request.gamma
    }

    fn add_neighbor_template(&mut self, neighbor: NeighborRef) {
        self.neighbors.push(neighbor);
    }
}

/// Factory producing [`TemplateDescriptor`]s. Leaves the model untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DescriptorFactory;

impl TemplateFactory for DescriptorFactory {
    type Template = TemplateDescriptor;

    fn create(&mut self, _model: &mut Model, request: &TemplateRequest) -> Result<TemplateDescriptor> {
        Ok(TemplateDescriptor {
            request: *request,
            neighbors: Vec::new(),
        })
    }
}
