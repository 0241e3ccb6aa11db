//! Physics world: queues, stepping policy, transform propagation.
//!
//! The world mediates between the scene tree and the engine. All
//! body/joint registration is deferred through pending queues so
//! gameplay code can mutate the world at any point of the frame; the
//! queues are drained exactly once per `update`, before stepping.
//! Each committed body is associated with exactly one node, and the
//! pre/post simulation walks translate between node local transforms
//! and engine world poses over the same pre-order traversal.

use std::collections::HashMap;
use std::rc::Rc;

use glam::{Affine2, Vec2};
use rapier2d::prelude::{ColliderHandle, CollisionEvent};
use tracing::{debug, warn};

use cinder_core::{PhysicsConfig, StepClock, StepPlan};
use cinder_scene::{NodeId, Scene};

use crate::body::BodyRef;
use crate::contact::{arbiter_key, Contact, ContactDelegate, ContactShape, ShapeId, ShapeTable};
use crate::joint::JointRef;
use crate::space::PhysicsSpace;

/// Scene-wide physics state: engine space, deferred registration
/// queues, stepping clock, and the contact bridge.
pub struct PhysicsWorld {
    space: PhysicsSpace,
    clock: StepClock,

    bodies: Vec<BodyRef>,
    pending_add_bodies: Vec<BodyRef>,
    pending_remove_bodies: Vec<BodyRef>,

    joints: Vec<JointRef>,
    pending_add_joints: Vec<JointRef>,
    pending_remove_joints: Vec<JointRef>,

    /// Typed body slot per node. A node carries at most one body.
    node_bodies: HashMap<NodeId, BodyRef>,

    shapes: ShapeTable,
    arbiters: HashMap<crate::contact::ArbiterKey, Contact>,
    contact_delegate: Option<Box<dyn ContactDelegate>>,
}

impl PhysicsWorld {
    /// Create a world from validated configuration.
    #[must_use]
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            space: PhysicsSpace::new(config.gravity),
            clock: StepClock::from_config(config),
            bodies: Vec::new(),
            pending_add_bodies: Vec::new(),
            pending_remove_bodies: Vec::new(),
            joints: Vec::new(),
            pending_add_joints: Vec::new(),
            pending_remove_joints: Vec::new(),
            node_bodies: HashMap::new(),
            shapes: ShapeTable::default(),
            arbiters: HashMap::new(),
            contact_delegate: None,
        }
    }

    // -- Accessors --

    #[must_use]
    pub const fn space(&self) -> &PhysicsSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut PhysicsSpace {
        &mut self.space
    }

    #[must_use]
    pub const fn clock(&self) -> &StepClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut StepClock {
        &mut self.clock
    }

    /// Bodies currently active in the engine (committed adds only).
    #[must_use]
    pub fn active_body_count(&self) -> usize {
        self.bodies.len()
    }

    /// The body occupying `node`'s slot, attached or still pending.
    #[must_use]
    pub fn body_for(&self, node: NodeId) -> Option<BodyRef> {
        self.node_bodies.get(&node).cloned()
    }

    pub fn set_contact_delegate(&mut self, delegate: Box<dyn ContactDelegate>) {
        self.contact_delegate = Some(delegate);
    }

    pub fn clear_contact_delegate(&mut self) {
        self.contact_delegate = None;
    }

    // -- Body registration --

    /// Bind `body` to `node` and queue it for engine registration at
    /// the next update. Panics if the node already carries a body;
    /// the slot is typed and singular.
    pub fn attach_body(&mut self, node: NodeId, body: BodyRef) {
        if let Some(existing) = self.node_bodies.get(&node) {
            if !Rc::ptr_eq(existing, &body) {
                panic!(
                    "node {} already carries a physics body; detach it first",
                    node.index()
                );
            }
            return;
        }
        body.borrow_mut().bind_node(node);
        self.node_bodies.insert(node, body.clone());
        self.add_body(body);
    }

    /// Empty `node`'s body slot and queue the body for removal.
    /// Returns `false` if the slot was already empty.
    pub fn detach_body(&mut self, node: NodeId) -> bool {
        let Some(body) = self.node_bodies.remove(&node) else {
            return false;
        };
        self.remove_body(&body);
        body.borrow_mut().unbind_node();
        true
    }

    /// Queue a body for engine registration. No-op when the body is
    /// already active or already pending.
    pub fn add_body(&mut self, body: BodyRef) {
        let queued = self
            .bodies
            .iter()
            .chain(self.pending_add_bodies.iter())
            .any(|b| Rc::ptr_eq(b, &body));
        if !queued {
            self.pending_add_bodies.push(body);
        }
    }

    /// Queue a body for engine removal. A body still waiting on the
    /// add queue is cancelled in place and never becomes active.
    pub fn remove_body(&mut self, body: &BodyRef) {
        let before = self.pending_add_bodies.len();
        self.pending_add_bodies.retain(|b| !Rc::ptr_eq(b, body));
        if self.pending_add_bodies.len() != before {
            return;
        }
        if self.bodies.iter().any(|b| Rc::ptr_eq(b, body)) {
            self.pending_remove_bodies.push(body.clone());
        }
    }

    // -- Joint registration --

    /// Queue a joint for engine registration. Its bodies must be
    /// active by the time the queue is drained or the joint is
    /// dropped with a warning.
    pub fn add_joint(&mut self, joint: JointRef) {
        let queued = self
            .joints
            .iter()
            .chain(self.pending_add_joints.iter())
            .any(|j| Rc::ptr_eq(j, &joint));
        if !queued {
            self.pending_add_joints.push(joint);
        }
    }

    /// Queue a joint for engine removal, cancelling a still-pending add.
    pub fn remove_joint(&mut self, joint: &JointRef) {
        let before = self.pending_add_joints.len();
        self.pending_add_joints.retain(|j| !Rc::ptr_eq(j, joint));
        if self.pending_add_joints.len() != before {
            return;
        }
        if self.joints.iter().any(|j| Rc::ptr_eq(j, joint)) {
            self.pending_remove_joints.push(joint.clone());
        }
    }

    // -- Frame update --

    /// Advance the world by `dt` seconds.
    ///
    /// Order is fixed: drain body queues, drain joint queues, bail on
    /// a degenerate dt, pre-simulation propagation, engine stepping
    /// per policy, post-simulation propagation. `user_driven` bypasses
    /// the clock and runs exactly one engine step of `dt`.
    pub fn update(&mut self, scene: &mut Scene, dt: f32, user_driven: bool) {
        self.commit_bodies();
        self.commit_joints();

        if dt <= f32::EPSILON {
            return;
        }

        let root = scene.root();
        self.before_walk(scene, root, Affine2::IDENTITY, Vec2::ONE, 0.0, false);

        if user_driven {
            self.step_engine(dt);
        } else {
            match self.clock.plan(dt) {
                StepPlan::Idle => {}
                StepPlan::Fixed { dt, count } => {
                    for _ in 0..count {
                        self.step_engine(dt);
                    }
                }
                StepPlan::Substep { dt, count } => {
                    for _ in 0..count {
                        self.step_engine(dt);
                        for body in &self.bodies {
                            body.borrow_mut().post_step(dt, &self.space);
                        }
                    }
                }
            }
        }

        self.after_walk(scene, root, Affine2::IDENTITY, 0.0);
    }

    // -- Queue commits --

    fn commit_bodies(&mut self) {
        if self.pending_remove_bodies.is_empty() && self.pending_add_bodies.is_empty() {
            return;
        }

        let removals = std::mem::take(&mut self.pending_remove_bodies);
        for body in removals {
            let shape_id = body.borrow().handles().map(|h| h.shape_id);
            if let Some(id) = shape_id {
                self.shapes.release(id);
            }
            body.borrow_mut().decommit(&mut self.space);
            self.bodies.retain(|b| !Rc::ptr_eq(b, &body));
        }

        let additions = std::mem::take(&mut self.pending_add_bodies);
        for body in additions {
            let node = body.borrow().node();
            let Some(node) = node else {
                warn!("body queued without an owning node; dropping");
                continue;
            };
            let shape_id = self.shapes.alloc(body.clone(), node);
            body.borrow_mut().commit(&mut self.space, shape_id);
            self.bodies.push(body);
        }
        debug!(active = self.bodies.len(), "body queues drained");
    }

    fn commit_joints(&mut self) {
        if self.pending_remove_joints.is_empty() && self.pending_add_joints.is_empty() {
            return;
        }

        let removals = std::mem::take(&mut self.pending_remove_joints);
        for joint in removals {
            joint.borrow_mut().decommit(&mut self.space);
            self.joints.retain(|j| !Rc::ptr_eq(j, &joint));
        }

        let additions = std::mem::take(&mut self.pending_add_joints);
        for joint in additions {
            if joint.borrow_mut().commit(&mut self.space) {
                self.joints.push(joint);
            } else {
                warn!("joint references a body that is not active; dropping joint");
            }
        }
    }

    // -- Propagation walks --

    /// Push world poses into attached bodies, accumulating the parent
    /// transform, scale, and rotation down the tree. Dirtiness also
    /// accumulates: a mutated node re-seeds every body in its subtree,
    /// since all their world poses moved with it. Clears each node's
    /// dirty flag so only fresh mutations re-seed the engine.
    fn before_walk(
        &mut self,
        scene: &mut Scene,
        id: NodeId,
        parent_to_world: Affine2,
        parent_scale: Vec2,
        parent_rotation: f32,
        parent_dirty: bool,
    ) {
        let (node_to_world, scale, rotation, anchor, dirty) = {
            let node = scene.node(id);
            (
                parent_to_world * node.node_to_parent(),
                parent_scale * node.scale(),
                parent_rotation + node.rotation(),
                node.anchor_point_in_points(),
                parent_dirty || node.transform_dirty(),
            )
        };

        if let Some(body) = self.node_bodies.get(&id).cloned() {
            body.borrow_mut()
                .before_simulation(node_to_world, scale, rotation, dirty, anchor, &mut self.space);
        }
        scene.node_mut(id).clear_transform_dirty();

        let children = scene.node(id).children().to_vec();
        for child in children {
            self.before_walk(scene, child, node_to_world, scale, rotation, dirty);
        }
    }

    /// Pull engine-resolved poses back into node local transforms.
    /// Children recurse with the transform computed before the
    /// write-back so one walk observes one consistent tree.
    fn after_walk(
        &mut self,
        scene: &mut Scene,
        id: NodeId,
        parent_to_world: Affine2,
        parent_rotation: f32,
    ) {
        let (node_to_world, rotation) = {
            let node = scene.node(id);
            (
                parent_to_world * node.node_to_parent(),
                parent_rotation + node.rotation(),
            )
        };

        if let Some(body) = self.node_bodies.get(&id).cloned() {
            let resolved = body
                .borrow_mut()
                .after_simulation(parent_to_world, parent_rotation, &self.space);
            if let Some((position, local_rotation)) = resolved {
                scene
                    .node_mut(id)
                    .apply_simulated_transform(position, local_rotation);
            }
        }

        let children = scene.node(id).children().to_vec();
        for child in children {
            self.after_walk(scene, child, node_to_world, rotation);
        }
    }

    // -- Stepping and contact dispatch --

    fn step_engine(&mut self, dt: f32) {
        let events = self.space.step(dt);
        self.dispatch_collision_events(events);
    }

    fn shape_for(&self, collider: ColliderHandle) -> Option<ContactShape> {
        let collider = self.space.collider_set.get(collider)?;
        self.shapes.get(collider.user_data as ShapeId).cloned()
    }

    /// Turn engine collision events into delegate callbacks.
    ///
    /// Exactly one `Contact` exists per active arbiter: created on
    /// `Started`, stored in the arbiter table, removed and dropped on
    /// `Stopped`. A `Stopped` carrying the removed-collider flag is
    /// handled identically since lookup goes through the key alone.
    fn dispatch_collision_events(&mut self, events: Vec<CollisionEvent>) {
        if events.is_empty() {
            return;
        }
        let mut delegate = self.contact_delegate.take();

        for event in events {
            match event {
                CollisionEvent::Started(a, b, _) => {
                    let key = arbiter_key(a, b);
                    let (Some(shape_a), Some(shape_b)) = (self.shape_for(a), self.shape_for(b))
                    else {
                        warn!("collision event for unregistered shapes; ignoring");
                        continue;
                    };
                    let contact = Contact::new(shape_a, shape_b, key);
                    if let Some(d) = delegate.as_deref_mut() {
                        d.did_begin(&contact);
                    }
                    self.arbiters.insert(key, contact);
                }
                CollisionEvent::Stopped(a, b, _) => {
                    let key = arbiter_key(a, b);
                    if let Some(contact) = self.arbiters.remove(&key) {
                        if let Some(d) = delegate.as_deref_mut() {
                            d.did_end(&contact);
                        }
                    }
                }
            }
        }

        if delegate.is_some() {
            self.contact_delegate = delegate;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{body_ref, PhysicsBody, PhysicsMaterial};
    use crate::joint::{joint_ref, PhysicsJoint};
    use cinder_scene::Node;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig::default())
    }

    fn weightless_world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig {
            gravity: [0.0, 0.0],
            ..PhysicsConfig::default()
        })
    }

    fn circle_body() -> BodyRef {
        body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default()))
    }

    #[test]
    fn attach_queues_body_until_update_commits_it() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        let body = circle_body();

        world.attach_body(node, body.clone());
        assert_eq!(world.active_body_count(), 0);
        assert!(!body.borrow().is_committed());

        world.update(&mut scene, 1.0 / 60.0, true);
        assert_eq!(world.active_body_count(), 1);
        assert!(body.borrow().is_committed());
        assert_eq!(world.space().body_count(), 1);
    }

    #[test]
    fn detach_before_commit_cancels_the_add() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        let body = circle_body();

        world.attach_body(node, body.clone());
        world.detach_body(node);
        world.update(&mut scene, 1.0 / 60.0, true);

        assert_eq!(world.active_body_count(), 0);
        assert!(!body.borrow().is_committed());
        assert_eq!(world.space().body_count(), 0);
    }

    #[test]
    fn detach_after_commit_removes_on_next_update() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        let body = circle_body();

        world.attach_body(node, body.clone());
        world.update(&mut scene, 1.0 / 60.0, true);
        assert!(body.borrow().is_committed());

        world.detach_body(node);
        assert!(body.borrow().is_committed());
        world.update(&mut scene, 1.0 / 60.0, true);
        assert!(!body.borrow().is_committed());
        assert_eq!(world.space().body_count(), 0);
    }

    #[test]
    #[should_panic(expected = "already carries a physics body")]
    fn second_body_on_one_node_is_fatal() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        world.attach_body(node, circle_body());
        world.attach_body(node, circle_body());
    }

    #[test]
    fn queues_drain_even_on_degenerate_dt() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        world.attach_body(node, circle_body());

        world.update(&mut scene, 0.0, false);
        assert_eq!(world.active_body_count(), 1);
    }

    #[test]
    fn joint_with_inactive_bodies_is_dropped() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        let a = circle_body();
        let b = circle_body();
        world.attach_body(node, a.clone());
        // b is never attached, so the joint precondition fails.
        let joint = joint_ref(PhysicsJoint::revolute(a, b, Vec2::ZERO, Vec2::ZERO));

        world.add_joint(joint.clone());
        world.update(&mut scene, 1.0 / 60.0, true);
        assert!(!joint.borrow().is_committed());
    }

    #[test]
    fn joint_commits_once_both_bodies_are_active() {
        let mut scene = Scene::new();
        let mut world = world();
        let na = scene.add_node(scene.root(), Node::new());
        let nb = scene.add_node(scene.root(), Node::new());
        let a = circle_body();
        let b = circle_body();
        world.attach_body(na, a.clone());
        world.attach_body(nb, b.clone());
        let joint = joint_ref(PhysicsJoint::fixed(a, b, Vec2::ZERO, Vec2::ZERO));
        world.add_joint(joint.clone());

        // Bodies commit first in the same drain, so the joint sees
        // active handles.
        world.update(&mut scene, 1.0 / 60.0, true);
        assert!(joint.borrow().is_committed());
    }

    #[test]
    fn body_slot_lookup_tracks_attach_detach() {
        let mut scene = Scene::new();
        let mut world = world();
        let node = scene.add_node(scene.root(), Node::new());
        let body = circle_body();

        assert!(world.body_for(node).is_none());
        world.attach_body(node, body.clone());
        assert!(Rc::ptr_eq(&world.body_for(node).unwrap(), &body));
        world.detach_body(node);
        assert!(world.body_for(node).is_none());
    }

    #[test]
    fn moving_an_ancestor_reseeds_descendant_bodies() {
        let mut scene = Scene::new();
        let mut world = weightless_world();

        let mut parent = Node::new();
        parent.set_position(Vec2::new(10.0, 0.0));
        let parent = scene.add_node(scene.root(), parent);
        let mut child = Node::new();
        child.set_position(Vec2::new(2.0, 0.0));
        let child = scene.add_node(parent, child);
        let body = circle_body();
        world.attach_body(child, body.clone());

        world.update(&mut scene, 1.0 / 60.0, true);
        let seeded = body.borrow().world_position();
        assert!((seeded - Vec2::new(12.0, 0.0)).length() < 1e-4);

        // The child's own transform is untouched; only the parent moves.
        scene.node_mut(parent).set_position(Vec2::new(50.0, 0.0));
        world.update(&mut scene, 1.0 / 60.0, true);
        let reseeded = body.borrow().world_position();
        assert!(
            (reseeded - Vec2::new(52.0, 0.0)).length() < 1e-4,
            "body not reseeded after ancestor move, at {reseeded:?}"
        );
    }

    #[test]
    fn body_on_the_scene_root_is_seeded() {
        let mut scene = Scene::new();
        let mut world = weightless_world();
        scene.node_mut(scene.root()).set_position(Vec2::new(5.0, 5.0));
        let body = circle_body();
        world.attach_body(scene.root(), body.clone());

        world.update(&mut scene, 1.0 / 60.0, true);
        let pos = body.borrow().world_position();
        assert!((pos - Vec2::new(5.0, 5.0)).length() < 1e-4, "seeded at {pos:?}");
    }

    #[test]
    fn user_driven_update_moves_a_falling_body() {
        let mut scene = Scene::new();
        let mut world = world();
        let mut node = Node::new();
        node.set_position(Vec2::new(0.0, 100.0));
        let id = scene.add_node(scene.root(), node);
        world.attach_body(id, circle_body());

        for _ in 0..10 {
            world.update(&mut scene, 1.0 / 60.0, true);
        }
        assert!(scene.node(id).position().y < 100.0);
    }
}
