//! Cross-module tests driving the full update path: queues, stepping
//! clock, propagation walks, and the contact bridge together.

use glam::Vec2;

use cinder_core::PhysicsConfig;
use cinder_scene::{Node, Scene};
use cinder_test_utils::{circle_node, ground_node, test_world, RecordingDelegate};

use crate::body::{body_ref, PhysicsBody, PhysicsMaterial};
use crate::world::PhysicsWorld;

const FRAME: f32 = 1.0 / 60.0;

#[test]
fn contact_begin_and_end_reach_the_delegate() {
    let mut scene = Scene::new();
    let mut world = test_world([0.0, -98.0]);
    let root = scene.root();

    let (ground, _) = ground_node(&mut scene, &mut world, Vec2::ZERO, Vec2::new(200.0, 10.0));
    let (ball, _) = circle_node(&mut scene, &mut world, root, Vec2::new(0.0, 30.0), 5.0);

    let (delegate, log) = RecordingDelegate::new();
    world.set_contact_delegate(Box::new(delegate));

    // Long enough for the drop plus any restitution bounces.
    for _ in 0..240 {
        world.update(&mut scene, FRAME, true);
    }

    let records = log.borrow().clone();
    assert!(!records.is_empty(), "ball never touched the ground");
    assert_eq!(records[0].event, "begin");
    for record in &records {
        let (a, b) = record.nodes;
        assert!(a == ground || a == ball);
        assert!(b == ground || b == ball);
        assert_ne!(a, b);
    }
    // One contact per arbiter: notifications strictly alternate.
    for pair in records.windows(2) {
        assert_ne!(pair[0].event, pair[1].event);
    }
}

#[test]
fn removing_a_touching_body_ends_its_contact() {
    let mut scene = Scene::new();
    let mut world = test_world([0.0, -98.0]);
    let root = scene.root();

    ground_node(&mut scene, &mut world, Vec2::ZERO, Vec2::new(200.0, 10.0));
    let (ball, _) = circle_node(&mut scene, &mut world, root, Vec2::new(0.0, 30.0), 5.0);

    let (delegate, log) = RecordingDelegate::new();
    world.set_contact_delegate(Box::new(delegate));

    for _ in 0..240 {
        world.update(&mut scene, FRAME, true);
    }
    world.detach_body(ball);
    for _ in 0..4 {
        world.update(&mut scene, FRAME, true);
    }

    let records = log.borrow().clone();
    let begins = records.iter().filter(|r| r.event == "begin").count();
    let ends = records.iter().filter(|r| r.event == "end").count();
    assert!(begins >= 1);
    assert_eq!(begins, ends, "every contact must end once the body is gone");
}

#[test]
fn queued_then_cancelled_body_never_reaches_the_engine() {
    let mut scene = Scene::new();
    let mut world = test_world([0.0, -98.0]);
    let root = scene.root();

    let (ball, body) = circle_node(&mut scene, &mut world, root, Vec2::new(0.0, 10.0), 2.0);
    world.detach_body(ball);

    for _ in 0..3 {
        world.update(&mut scene, FRAME, true);
    }
    assert!(!body.borrow().is_committed());
    assert_eq!(world.space().body_count(), 0);
    // The node itself is untouched by physics.
    assert_eq!(scene.node(ball).position(), Vec2::new(0.0, 10.0));
}

#[test]
fn three_level_tree_seeds_pose_from_ancestor_locals() {
    let mut scene = Scene::new();
    let mut world = test_world([0.0, 0.0]);

    let mut grandparent = Node::new();
    grandparent.set_position(Vec2::new(10.0, 0.0));
    let grandparent = scene.add_node(scene.root(), grandparent);

    let mut parent = Node::new();
    parent.set_position(Vec2::new(5.0, 0.0));
    let parent = scene.add_node(grandparent, parent);

    let (child, body) = circle_node(&mut scene, &mut world, parent, Vec2::new(2.0, 0.0), 1.0);

    world.update(&mut scene, FRAME, true);
    let pos = body.borrow().world_position();
    assert!(
        (pos - Vec2::new(17.0, 0.0)).length() < 1e-4,
        "seeded at {pos:?}"
    );
    assert_eq!(scene.node(child).position(), Vec2::new(2.0, 0.0));
}

#[test]
fn three_level_tree_writes_resolved_pose_back_as_local() {
    let mut scene = Scene::new();
    let mut world = test_world([0.0, -98.0]);

    let mut grandparent = Node::new();
    grandparent.set_position(Vec2::new(10.0, 0.0));
    let grandparent = scene.add_node(scene.root(), grandparent);

    let mut parent = Node::new();
    parent.set_position(Vec2::new(5.0, 0.0));
    let parent = scene.add_node(grandparent, parent);

    let (child, body) = circle_node(&mut scene, &mut world, parent, Vec2::new(2.0, 0.0), 1.0);

    for _ in 0..30 {
        world.update(&mut scene, FRAME, true);
    }

    // Gravity only moves y; x stays expressed relative to the parents.
    let local = scene.node(child).position();
    assert!((local.x - 2.0).abs() < 1e-3, "local x drifted to {local:?}");
    assert!(local.y < -1.0, "body should have fallen, local {local:?}");
    let world_pos = body.borrow().world_position();
    assert!((world_pos.x - 17.0).abs() < 1e-3);
}

#[test]
fn fixed_rate_clock_consumes_whole_steps_through_update() {
    let mut scene = Scene::new();
    let mut world = PhysicsWorld::new(&PhysicsConfig {
        fixed_rate: 60,
        ..PhysicsConfig::default()
    });

    world.update(&mut scene, 0.025, false);
    let residual = world.clock().accumulator();
    assert!((residual - (0.025 - FRAME)).abs() < 1e-6, "residual {residual}");

    // Two half-rate frames drain to (numerically) nothing.
    let mut world = PhysicsWorld::new(&PhysicsConfig {
        fixed_rate: 60,
        ..PhysicsConfig::default()
    });
    world.update(&mut scene, 1.0 / 30.0, false);
    world.update(&mut scene, 1.0 / 30.0, false);
    assert!(world.clock().accumulator() < 1e-6);
}

#[test]
fn update_rate_gates_substep_advances() {
    let mut scene = Scene::new();
    let mut world = PhysicsWorld::new(&PhysicsConfig {
        update_rate: 1,
        ..PhysicsConfig::default()
    });
    // Fixture built inline: the shared helpers construct bodies for
    // the externally linked crate, not for this one.
    let mut node = Node::new();
    node.set_position(Vec2::new(0.0, 100.0));
    let ball = scene.add_node(scene.root(), node);
    world.attach_body(
        ball,
        body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default())),
    );

    // First call is gated: queues drain, engine does not advance.
    world.update(&mut scene, FRAME, false);
    assert_eq!(world.active_body_count(), 1);
    assert_eq!(scene.node(ball).position(), Vec2::new(0.0, 100.0));

    // Second call advances with the accumulated two frames.
    world.update(&mut scene, FRAME, false);
    assert!(scene.node(ball).position().y < 100.0);
}
