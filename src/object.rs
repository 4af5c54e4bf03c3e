// object.rs — Tracked rigid object and its pose.
//
// A TrackedObject owns everything that lives for the lifetime of one tracked
// model: the current and prescribed initial pose, the tracking-quality
// threshold, the tracking-lost flag, and the viewpoint template bank used to
// relocalize the object.
//
// Template generation order is fixed:
//
//   1. sample the viewing sphere (12 base / 42 subdivided directions)
//   2. allocate base and neighboring templates via the factory
//   3. link every base template to its neighbors
//   4. reset the pose; the factory renders from many viewpoints and leaves
//      the model wherever the last template put it
//
// Templates never point back at the object; they carry its ObjectId.

use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};
use tracing::info;

use crate::error::Result;
use crate::neighbors::link_neighbors;
use crate::sphere::SphereSampling;
use crate::template::{Template, TemplateBank, TemplateFactory, TemplateLayout};

/// Homogeneous rigid transform, object → camera.
pub type Pose = Matrix4<f32>;

/// Identifier of a model within a scene. Also the label value the render
/// surface writes into the multi-object mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Pose state of a rigid model.
#[derive(Debug, Clone)]
pub struct Model {
    id: ObjectId,
    initial_pose: Pose,
    pose: Pose,
    scale: f32,
}

impl Model {
    /// Model starting at `initial_pose`.
    pub fn new(id: ObjectId, initial_pose: Pose, scale: f32) -> Self {
        Model {
            id,
            initial_pose,
            pose: initial_pose,
            scale,
        }
    }

    /// Model whose initial pose is a translation followed by rotations about
    /// the x, y and z axes, in degrees:
    ///
    ///   pose = T(t) · Rx(alpha) · Ry(beta) · Rz(gamma)
    ///
    /// A point in object coordinates is rotated about z first.
    pub fn from_euler(
        id: ObjectId,
        translation: [f32; 3],
        angles_deg: [f32; 3],
        scale: f32,
    ) -> Self {
        let [tx, ty, tz] = translation;
        let [a, b, g] = angles_deg;
        let rot = Rotation3::from_axis_angle(&Vector3::x_axis(), a.to_radians())
            * Rotation3::from_axis_angle(&Vector3::y_axis(), b.to_radians())
            * Rotation3::from_axis_angle(&Vector3::z_axis(), g.to_radians());
        let pose = Translation3::new(tx, ty, tz).to_homogeneous() * rot.to_homogeneous();
        Self::new(id, pose, scale)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn initial_pose(&self) -> &Pose {
        &self.initial_pose
    }

    /// Replace the prescribed pose that [`reset`](Self::reset) returns to.
    pub fn set_initial_pose(&mut self, pose: Pose) {
        self.initial_pose = pose;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Return to the prescribed initial pose.
    pub fn reset(&mut self) {
        self.pose = self.initial_pose;
    }
}

/// A model being tracked, plus its relocalization templates.
pub struct TrackedObject<T> {
    model: Model,
    quality_threshold: f32,
    tracking_lost: bool,
    template_distances: Vec<f32>,
    templates: Option<TemplateBank<T>>,
}

impl<T> TrackedObject<T> {
    /// New object with no templates generated yet.
    pub fn new(model: Model, quality_threshold: f32, template_distances: Vec<f32>) -> Self {
        TrackedObject {
            model,
            quality_threshold,
            tracking_lost: false,
            template_distances,
            templates: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn id(&self) -> ObjectId {
        self.model.id()
    }

    pub fn quality_threshold(&self) -> f32 {
        self.quality_threshold
    }

    pub fn is_tracking_lost(&self) -> bool {
        self.tracking_lost
    }

    pub fn set_tracking_lost(&mut self, lost: bool) {
        self.tracking_lost = lost;
    }

    pub fn template_distances(&self) -> &[f32] {
        &self.template_distances
    }

    pub fn num_distances(&self) -> usize {
        self.template_distances.len()
    }

    /// Generated template bank, if [`generate_templates`](Self::generate_templates) succeeded.
    pub fn templates(&self) -> Option<&TemplateBank<T>> {
        self.templates.as_ref()
    }

    /// Base templates used for initial matching; empty before generation.
    pub fn template_views(&self) -> &[T] {
        self.templates
            .as_ref()
            .map(|bank| bank.base().as_slice())
            .unwrap_or(&[])
    }

    /// Return to the initial pose and clear the tracking-lost flag.
    pub fn reset(&mut self) {
        self.model.reset();
        self.tracking_lost = false;
    }

    /// Build and link the template bank with the default layout.
    pub fn generate_templates<F>(&mut self, factory: &mut F) -> Result<()>
    where
        T: Template,
        F: TemplateFactory<Template = T>,
    {
        self.generate_templates_with(factory, &TemplateLayout::default())
    }

    /// Build and link the template bank.
    ///
    /// On error the previous bank (if any) is kept and the pose is still
    /// reset, so the object never tracks with a partially linked bank.
    pub fn generate_templates_with<F>(
        &mut self,
        factory: &mut F,
        layout: &TemplateLayout,
    ) -> Result<()>
    where
        T: Template,
        F: TemplateFactory<Template = T>,
    {
        let base = SphereSampling::base();
        let subdiv = SphereSampling::subdivided();

        let built = TemplateBank::build(
            &mut self.model,
            factory,
            &base,
            &subdiv,
            &self.template_distances,
            layout,
        )
        .and_then(|mut bank| {
            let links = link_neighbors(&mut bank, &base, &subdiv)?;
            Ok((bank, links))
        });
        self.model.reset();

        let (bank, links) = built?;
        info!(
            object = self.model.id().0,
            base = bank.base().len(),
            neighbors = bank.neighbors().len(),
            links,
            "generated viewpoint templates"
        );
        self.templates = Some(bank);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{DescriptorFactory, TemplateDescriptor};
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_restores_initial_pose() {
        let mut m = Model::new(ObjectId(1), Pose::identity(), 1.0);
        let mut moved = Pose::identity();
        moved[(0, 3)] = 5.0;
        m.set_pose(moved);
        assert_relative_eq!(m.pose()[(0, 3)], 5.0);
        m.reset();
        assert_eq!(m.pose(), &Pose::identity());
    }

    #[test]
    fn test_from_euler_translation_and_rotation() {
        let m = Model::from_euler(ObjectId(0), [1.0, 2.0, 3.0], [0.0, 0.0, 90.0], 1.0);
        let p = m.pose();
        assert_relative_eq!(p[(0, 3)], 1.0);
        assert_relative_eq!(p[(1, 3)], 2.0);
        assert_relative_eq!(p[(2, 3)], 3.0);
        // 90° about z maps x → y.
        assert_relative_eq!(p[(1, 0)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[(0, 0)], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_object_reset_clears_lost_flag() {
        let model = Model::new(ObjectId(2), Pose::identity(), 1.0);
        let mut obj: TrackedObject<()> = TrackedObject::new(model, 0.55, vec![200.0]);
        obj.set_tracking_lost(true);
        obj.reset();
        assert!(!obj.is_tracking_lost());
        assert!(obj.template_views().is_empty());
        assert_eq!(obj.num_distances(), 1);
    }

    #[test]
    fn test_from_euler_rotates_about_x_after_z() {
        // Rx(90) · Rz(90): x → y → z, y → -x → -x.
        let m = Model::from_euler(ObjectId(0), [0.0; 3], [90.0, 0.0, 90.0], 1.0);
        let p = m.pose();
        assert_relative_eq!(p[(2, 0)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[(1, 0)], 0.0, epsilon = 1e-6);
        assert_relative_eq!(p[(0, 1)], -1.0, epsilon = 1e-6);
        assert_relative_eq!(p[(1, 2)], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_generate_templates_fills_views() {
        let model = Model::from_euler(ObjectId(3), [0.0, 0.0, 300.0], [0.0; 3], 1.0);
        let mut obj: TrackedObject<TemplateDescriptor> = TrackedObject::new(model, 0.55, vec![300.0]);
        obj.generate_templates(&mut DescriptorFactory).unwrap();
        assert_eq!(obj.template_views().len(), 12 * 4);
        assert!(obj.template_views().iter().all(|t| t.neighbors.len() == 18));
    }
}
