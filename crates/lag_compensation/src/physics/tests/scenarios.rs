//! Scenario tests driving the whole world: register, advance, rewind, shoot

use crate::config::{Config, ConfigFormat};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::physics::body::{HitCapsuleShape, Hitbody, HitbodyLayout, HitboxShape, HitsphereShape};
use crate::physics::collision::{BodyId, CapsuleAxis, HitObject, PartId, Ray};
use crate::physics::limits::MAX_REWIND_FRAMES;
use crate::physics::world::HitboxWorld;
use approx::assert_relative_eq;

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: PartId = PartId(0);
    const TORSO: PartId = PartId(1);
    const LEGS: PartId = PartId(2);

    fn unit_box_body() -> HitbodyLayout {
        HitbodyLayout {
            proximity_radius: 2.0,
            boxes: vec![HitboxShape {
                part: TORSO,
                transform: Transform::identity(),
                center: Vec3::zeros(),
                size: Vec3::new(1.0, 1.0, 1.0),
            }],
            ..Default::default()
        }
    }

    fn soldier() -> HitbodyLayout {
        let mut layout = HitbodyLayout {
            proximity_offset: Vec3::new(0.0, 0.9, 0.0),
            spheres: vec![HitsphereShape {
                part: HEAD,
                offset: Vec3::new(0.0, 1.65, 0.0),
                radius: 0.12,
            }],
            boxes: vec![HitboxShape {
                part: TORSO,
                transform: Transform::from_position(Vec3::new(0.0, 1.2, 0.0)),
                center: Vec3::zeros(),
                size: Vec3::new(0.5, 0.6, 0.3),
            }],
            capsules: vec![HitCapsuleShape {
                part: LEGS,
                transform: Transform::from_position(Vec3::new(0.0, 0.45, 0.0)),
                center: Vec3::zeros(),
                radius: 0.15,
                height: 0.9,
                axis: CapsuleAxis::Y,
            }],
            ..Default::default()
        };
        layout.fit_proximity(0.05);
        layout
    }

    fn forward_from(origin: Vec3) -> Ray {
        Ray::new(origin, Vec3::new(0.0, 0.0, 1.0)).unwrap()
    }

    #[test]
    fn test_unit_box_hit_at_nine_and_a_half() {
        let mut world = HitboxWorld::new();
        let body = Hitbody::new(unit_box_body(), Transform::identity());
        world.register_body(BodyId(1), body).unwrap();
        world.advance_frame(1).unwrap();

        let hit = world.raycast(1, &forward_from(Vec3::new(0.0, 0.0, -10.0))).unwrap();

        assert_relative_eq!(hit.distance, 9.5);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 0.0, -0.5));
        assert_eq!(hit.hit_object, HitObject::new(BodyId(1), TORSO));
    }

    #[test]
    fn test_future_frame_behaves_as_current() {
        let mut world = HitboxWorld::new();
        let body = Hitbody::new(unit_box_body(), Transform::identity());
        world.register_body(BodyId(1), body).unwrap();
        world.advance_frame(5).unwrap();
        let ray = forward_from(Vec3::new(0.0, 0.0, -10.0));

        let current = world.raycast(5, &ray);
        let future = world.raycast(500, &ray);

        assert!(current.is_some());
        assert_eq!(current, future);
        assert_eq!(world.snapshot(500).frame(), 5);
    }

    #[test]
    fn test_empty_world_misses() {
        let mut world: HitboxWorld = HitboxWorld::new();
        world.advance_frame(1).unwrap();

        assert!(world.raycast(1, &forward_from(Vec3::new(0.0, 0.0, -10.0))).is_none());
    }

    #[test]
    fn test_world_before_first_capture_misses() {
        let mut world: HitboxWorld<Hitbody> = HitboxWorld::new();

        assert!(world.raycast(0, &forward_from(Vec3::zeros())).is_none());
    }

    #[test]
    fn test_overlapping_proximity_reports_actual_owner() {
        // Both proximity spheres lie on the ray; only the rear body has a part on it
        let mut front = unit_box_body();
        front.boxes[0].transform = Transform::from_position(Vec3::new(0.0, 1.4, 0.0));
        front.boxes[0].size = Vec3::new(0.4, 0.4, 0.4);

        let mut world = HitboxWorld::new();
        let front = Hitbody::new(front, Transform::from_position(Vec3::new(0.0, 0.0, -1.0)));
        let rear_pose = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));
        let rear = Hitbody::new(unit_box_body(), rear_pose);
        world.register_body(BodyId(1), front).unwrap();
        world.register_body(BodyId(2), rear).unwrap();
        world.advance_frame(1).unwrap();

        let hit = world.raycast(1, &forward_from(Vec3::new(0.0, 0.0, -10.0))).unwrap();

        assert_eq!(hit.hit_object.body, BodyId(2));
        assert_relative_eq!(hit.distance, 10.5);
    }

    #[test]
    fn test_rewind_follows_moving_target() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(3), Hitbody::new(soldier(), Transform::identity())).unwrap();

        for frame in 1..=20 {
            world.advance_frame(frame).unwrap();
            world.body_mut(BodyId(3)).unwrap().translate(Vec3::new(0.5, 0.0, 0.0));
        }

        // At frame 11 the soldier stood at x = 5
        let head_shot = forward_from(Vec3::new(5.0, 1.65, -20.0));
        let hit = world.raycast(11, &head_shot).unwrap();
        assert_eq!(hit.hit_object, HitObject::new(BodyId(3), HEAD));
        assert_relative_eq!(hit.distance, 20.0 - 0.12, epsilon = 1e-4);

        // Now it is elsewhere
        assert!(world.raycast(20, &head_shot).is_none());
    }

    #[test]
    fn test_capsule_legs_are_hit() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), Hitbody::new(soldier(), Transform::identity())).unwrap();
        world.advance_frame(1).unwrap();

        let hit = world.raycast(1, &forward_from(Vec3::new(0.0, 0.45, -5.0))).unwrap();

        assert_eq!(hit.hit_object.part, LEGS);
        assert_relative_eq!(hit.distance, 4.85, epsilon = 1e-4);
    }

    #[test]
    fn test_rotated_body_rotates_its_parts() {
        // Soldier lying down: rotated 90 degrees about Z, legs now along -X
        let pose = Transform::from_position_rotation(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2),
        );
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), Hitbody::new(soldier(), pose)).unwrap();
        world.advance_frame(1).unwrap();

        let hit = world.raycast(1, &forward_from(Vec3::new(-0.45, 0.0, -5.0))).unwrap();

        assert_eq!(hit.hit_object.part, LEGS);
        assert_relative_eq!(hit.distance, 4.85, epsilon = 1e-4);
    }

    #[test]
    fn test_expired_frames_serve_oldest_retained() {
        crate::foundation::logging::init_test();
        let mut world = HitboxWorld::new();
        let body = Hitbody::new(unit_box_body(), Transform::identity());
        world.register_body(BodyId(1), body).unwrap();

        let last = MAX_REWIND_FRAMES as u32 + 40;
        for frame in 1..=last {
            world.advance_frame(frame).unwrap();
            world.body_mut(BodyId(1)).unwrap().translate(Vec3::new(0.0, 1.0, 0.0));
        }

        let oldest = last - MAX_REWIND_FRAMES as u32 + 1;
        assert_eq!(world.snapshot(last).frame(), last);
        assert_eq!(world.snapshot(oldest).frame(), oldest);
        assert_eq!(world.snapshot(oldest - 1).frame(), oldest);
        assert_eq!(world.snapshot(0).frame(), oldest);

        // The body at frame `oldest` stood at y = oldest - 1
        let y = (oldest - 1) as f32;
        let hit = world.raycast(3, &forward_from(Vec3::new(0.0, y, -10.0))).unwrap();
        assert_relative_eq!(hit.distance, 9.5);
    }

    #[test]
    fn test_capture_timings_are_recorded() {
        let mut world = HitboxWorld::new();
        for id in 0..8 {
            let body = Hitbody::new(soldier(), Transform::identity());
            world.register_body(BodyId(id), body).unwrap();
        }
        world.advance_frame(1).unwrap();

        let timings = world.last_capture_timings();
        assert!(timings.total() > std::time::Duration::ZERO);
    }

    #[test]
    fn test_rig_authored_in_toml() {
        let text = r#"
            proximity_radius = 1.5

            [[spheres]]
            part = 0
            offset = [0.0, 1.0, 0.0]
            radius = 0.25

            [[boxes]]
            part = 1
            size = [0.5, 0.5, 0.5]
        "#;
        let layout = HitbodyLayout::from_str_as(text, ConfigFormat::Toml).unwrap();
        layout.validate_enclosure().unwrap();

        let mut world = HitboxWorld::new();
        world.register_body(BodyId(9), Hitbody::new(layout, Transform::identity())).unwrap();
        world.advance_frame(1).unwrap();

        let hit = world.raycast(1, &forward_from(Vec3::new(0.0, 1.0, -10.0))).unwrap();
        assert_eq!(hit.hit_object, HitObject::new(BodyId(9), PartId(0)));
        assert_relative_eq!(hit.distance, 9.75, epsilon = 1e-5);
    }
}
