//! Scene and world fixture helpers for tests.

use glam::Vec2;

use cinder_core::PhysicsConfig;
use cinder_physics::prelude::{body_ref, BodyRef, PhysicsBody, PhysicsMaterial};
use cinder_physics::PhysicsWorld;
use cinder_scene::{Node, NodeId, Scene};

/// World with the given gravity and default stepping (substep mode,
/// one substep, no update-rate gating).
#[must_use]
pub fn test_world(gravity: [f32; 2]) -> PhysicsWorld {
    PhysicsWorld::new(&PhysicsConfig {
        gravity,
        ..PhysicsConfig::default()
    })
}

/// Add a node at `position` under `parent` carrying a dynamic circle
/// body, queued on the world.
pub fn circle_node(
    scene: &mut Scene,
    world: &mut PhysicsWorld,
    parent: NodeId,
    position: Vec2,
    radius: f32,
) -> (NodeId, BodyRef) {
    let mut node = Node::new();
    node.set_position(position);
    let id = scene.add_node(parent, node);

    let body = body_ref(PhysicsBody::circle(radius, PhysicsMaterial::default()));
    world.attach_body(id, body.clone());
    (id, body)
}

/// Add a static box node at `position` under the root, queued on the
/// world. Used as a floor for contact tests.
pub fn ground_node(
    scene: &mut Scene,
    world: &mut PhysicsWorld,
    position: Vec2,
    size: Vec2,
) -> (NodeId, BodyRef) {
    let mut node = Node::new();
    node.set_position(position);
    let id = scene.add_node(scene.root(), node);

    let mut body = PhysicsBody::rect(size, PhysicsMaterial::default());
    body.set_dynamic(false);
    let body = body_ref(body);
    world.attach_body(id, body.clone());
    (id, body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_queue_bodies_on_the_world() {
        let mut scene = Scene::new();
        let mut world = test_world([0.0, -98.0]);
        let root = scene.root();

        let (ball, body) = circle_node(&mut scene, &mut world, root, Vec2::new(0.0, 50.0), 5.0);
        let (floor, _) = ground_node(&mut scene, &mut world, Vec2::ZERO, Vec2::new(200.0, 10.0));

        assert!(world.body_for(ball).is_some());
        assert!(world.body_for(floor).is_some());
        assert!(body.borrow().is_dynamic());
        assert_eq!(world.active_body_count(), 0);

        world.update(&mut scene, 1.0 / 60.0, true);
        assert_eq!(world.active_body_count(), 2);
    }
}
