// tests/test_templates.rs — Integration tests for viewpoint template generation.
//
// Exercises sphere sampling, bank construction and neighbor linking through
// the TrackedObject entry point, with factories that record or misbehave.

use regiontrack::object::{Model, ObjectId, Pose, TrackedObject};
use regiontrack::sphere::SphereSampling;
use regiontrack::template::{
    DescriptorFactory, NeighborRef, Template, TemplateDescriptor, TemplateFactory, TemplateLayout,
    TemplateRequest, TemplateTier,
};
use regiontrack::{Result, TrackError};

fn tracked(distances: &[f32]) -> TrackedObject<TemplateDescriptor> {
    let model = Model::from_euler(ObjectId(7), [0.0, 0.0, 400.0], [10.0, 20.0, 30.0], 1.0);
    TrackedObject::new(model, 0.55, distances.to_vec())
}

/// Moves the model to the requested viewpoint, the way a rendering factory does.
struct PosingFactory {
    calls: usize,
}

impl TemplateFactory for PosingFactory {
    type Template = TemplateDescriptor;

    fn create(&mut self, model: &mut Model, request: &TemplateRequest) -> Result<TemplateDescriptor> {
        self.calls += 1;
        let mut pose = Pose::identity();
        pose[(2, 3)] = request.distance;
        model.set_pose(pose);
        DescriptorFactory.create(model, request)
    }
}

/// Fails on the n-th request.
struct FailingFactory {
    remaining: usize,
}

impl TemplateFactory for FailingFactory {
    type Template = TemplateDescriptor;

    fn create(&mut self, model: &mut Model, request: &TemplateRequest) -> Result<TemplateDescriptor> {
        if self.remaining == 0 {
            return Err(TrackError::Factory("render target lost".into()));
        }
        self.remaining -= 1;
        model.set_pose(Pose::zeros());
        DescriptorFactory.create(model, request)
    }
}

// ===== Sphere =====

#[test]
fn sampled_directions_lie_in_range() {
    for sampling in [SphereSampling::base(), SphereSampling::subdivided()] {
        for dir in sampling.directions() {
            assert!((-180.0..=90.0).contains(&dir.elevation), "elevation {}", dir.elevation);
            assert!(dir.azimuth > -180.0 && dir.azimuth <= 180.0, "azimuth {}", dir.azimuth);
        }
    }
}

// ===== Bank sizes =====

#[test]
fn bank_sizes_follow_distances() {
    for distances in [vec![300.0], vec![200.0, 400.0, 600.0]] {
        let mut obj = tracked(&distances);
        obj.generate_templates(&mut DescriptorFactory).unwrap();
        let bank = obj.templates().unwrap();
        let d = distances.len();
        assert_eq!(bank.base().len(), 12 * 4 * d);
        assert_eq!(bank.neighbors().len(), 42 * 12 * d);
        assert_eq!(obj.template_views().len(), 12 * 4 * d);
        assert_eq!(bank.num_distances(), d);
    }
}

#[test]
fn empty_distance_list_generates_nothing() {
    let mut obj = tracked(&[]);
    obj.generate_templates(&mut DescriptorFactory).unwrap();
    let bank = obj.templates().unwrap();
    assert!(bank.base().is_empty());
    assert!(bank.neighbors().is_empty());
}

// ===== Linking =====

#[test]
fn every_base_template_gets_eighteen_links() {
    for distances in [vec![250.0], vec![200.0, 400.0, 600.0]] {
        let mut obj = tracked(&distances);
        obj.generate_templates(&mut DescriptorFactory).unwrap();
        let bank = obj.templates().unwrap();
        for t in bank.base().iter() {
            assert_eq!(t.neighbors.len(), 18);
        }
    }
}

#[test]
fn links_match_distance_and_adjacent_rotation() {
    let mut obj = tracked(&[200.0, 400.0, 600.0]);
    obj.generate_templates(&mut DescriptorFactory).unwrap();
    let bank = obj.templates().unwrap();

    for base in bank.base().iter() {
        for &r in &base.neighbors {
            let n = bank.neighbor(r).unwrap();
            assert_eq!(n.request.tier, TemplateTier::Neighbor);
            assert_eq!(n.request.distance, base.request.distance);
            // Same fine rotation, or one 30° step either way.
            let diff = (n.request.gamma - base.request.gamma).rem_euclid(360.0);
            assert!(diff == 0.0 || diff == 30.0 || diff == 330.0, "diff {diff}");
        }
        // Links come in triples: exact, next, previous.
        for triple in base.neighbors.chunks(3) {
            let g: Vec<f32> = triple.iter().map(|&r| bank.neighbor(r).unwrap().gamma()).collect();
            assert_eq!(g[0], base.request.gamma);
            assert_eq!((g[1] - g[0]).rem_euclid(360.0), 30.0);
            assert_eq!((g[0] - g[2]).rem_euclid(360.0), 30.0);
        }
    }
}

#[test]
fn links_point_at_nearby_directions() {
    let mut obj = tracked(&[400.0]);
    obj.generate_templates(&mut DescriptorFactory).unwrap();
    let bank = obj.templates().unwrap();
    let base = SphereSampling::base();
    let subdiv = SphereSampling::subdivided();

    let index_len = bank.neighbors().len();
    let per_direction = bank.neighbors().num_rotations() * bank.num_distances();
    for i in 0..base.len() {
        let t = bank.base().get(i, 0, 0).unwrap();
        for &NeighborRef(r) in &t.neighbors {
            assert!(r < index_len);
            let j = r / per_direction;
            let angle = base.vertex(i).normalize().dot(&subdiv.vertex(j).normalize());
            // Six closest subdivided vertices are all within ~45° of a base vertex.
            assert!(angle > 0.7, "base {i} linked to distant direction {j}");
        }
    }
}

// ===== Object lifecycle =====

#[test]
fn generation_resets_pose_moved_by_factory() {
    let mut obj = tracked(&[200.0, 400.0]);
    let initial = *obj.model().initial_pose();
    let mut factory = PosingFactory { calls: 0 };
    obj.generate_templates(&mut factory).unwrap();
    assert_eq!(factory.calls, (12 * 4 + 42 * 12) * 2);
    assert_eq!(obj.model().pose(), &initial);
}

#[test]
fn factory_failure_propagates_and_resets_pose() {
    let mut obj = tracked(&[200.0, 400.0, 600.0]);
    let initial = *obj.model().initial_pose();
    let err = obj
        .generate_templates(&mut FailingFactory { remaining: 100 })
        .unwrap_err();
    assert!(matches!(err, TrackError::Factory(_)));
    assert!(obj.templates().is_none());
    assert!(obj.template_views().is_empty());
    assert_eq!(obj.model().pose(), &initial);
}

#[test]
fn failure_keeps_previous_bank() {
    let mut obj = tracked(&[300.0]);
    obj.generate_templates(&mut DescriptorFactory).unwrap();
    assert!(obj.generate_templates(&mut FailingFactory { remaining: 3 }).is_err());
    assert_eq!(obj.templates().unwrap().base().len(), 48);
}

#[test]
fn invalid_layout_is_rejected() {
    let mut obj = tracked(&[300.0]);
    let layout = TemplateLayout {
        fine_rotation_step: 35,
        ..TemplateLayout::default()
    };
    let err = obj.generate_templates_with(&mut DescriptorFactory, &layout).unwrap_err();
    assert!(matches!(err, TrackError::InvalidLayout(_)));
}

#[test]
fn tracking_lost_flag_clears_on_reset() {
    let mut obj = tracked(&[300.0]);
    obj.set_tracking_lost(true);
    obj.model_mut().set_pose(Pose::zeros());
    obj.reset();
    assert!(!obj.is_tracking_lost());
    assert_eq!(obj.model().pose(), obj.model().initial_pose());
    assert_eq!(obj.id(), ObjectId(7));
}
