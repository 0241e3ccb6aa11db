//! Physics body component.
//!
//! A `PhysicsBody` belongs to exactly one node, set at attach time.
//! Its engine handles are valid only between the commit of its queued
//! add and the commit of its queued remove; outside that window the
//! body is just a description (shape, material, flags).

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine2, Vec2};
use rapier2d::prelude::*;

use cinder_scene::NodeId;

use crate::contact::ShapeId;
use crate::space::PhysicsSpace;

/// Shared handle to a physics body, held by the owning node's slot in
/// the world and by gameplay code.
pub type BodyRef = Rc<RefCell<PhysicsBody>>;

/// Wrap a body into a [`BodyRef`].
pub fn body_ref(body: PhysicsBody) -> BodyRef {
    Rc::new(RefCell::new(body))
}

// ---------------------------------------------------------------------------
// PhysicsMaterial
// ---------------------------------------------------------------------------

/// Surface/mass properties applied to the body's collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            density: 0.1,
            friction: 0.5,
            restitution: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// ShapeDesc
// ---------------------------------------------------------------------------

/// Collision shape description, in unscaled node-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDesc {
    Circle { radius: f32 },
    Rect { size: Vec2 },
}

// ---------------------------------------------------------------------------
// PhysicsBody
// ---------------------------------------------------------------------------

/// Engine handles owned by a committed body.
#[derive(Debug, Clone, Copy)]
pub struct BodyHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub shape_id: ShapeId,
}

/// A rigid body bound to one scene node.
pub struct PhysicsBody {
    node: Option<NodeId>,
    shape: ShapeDesc,
    material: PhysicsMaterial,
    dynamic: bool,
    gravity_enabled: bool,
    category_bitmask: u32,
    collision_bitmask: u32,

    handles: Option<BodyHandles>,
    /// Combined scale currently baked into the collider shape.
    scale: Vec2,
    /// Whether the engine pose has been seeded since the last commit.
    synced: bool,

    world_position: Vec2,
    world_rotation: f32,
}

impl PhysicsBody {
    fn new(shape: ShapeDesc, material: PhysicsMaterial) -> Self {
        Self {
            node: None,
            shape,
            material,
            dynamic: true,
            gravity_enabled: true,
            category_bitmask: u32::MAX,
            collision_bitmask: u32::MAX,
            handles: None,
            scale: Vec2::ONE,
            synced: false,
            world_position: Vec2::ZERO,
            world_rotation: 0.0,
        }
    }

    /// Circular body of the given radius.
    #[must_use]
    pub fn circle(radius: f32, material: PhysicsMaterial) -> Self {
        Self::new(ShapeDesc::Circle { radius }, material)
    }

    /// Axis-aligned box body of the given size.
    #[must_use]
    pub fn rect(size: Vec2, material: PhysicsMaterial) -> Self {
        Self::new(ShapeDesc::Rect { size }, material)
    }

    // -- Flags and masks --

    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Dynamics flag; read when the queued add is committed.
    pub fn set_dynamic(&mut self, dynamic: bool) {
        self.dynamic = dynamic;
    }

    #[must_use]
    pub const fn is_gravity_enabled(&self) -> bool {
        self.gravity_enabled
    }

    pub fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity_enabled = enabled;
    }

    #[must_use]
    pub const fn category_bitmask(&self) -> u32 {
        self.category_bitmask
    }

    pub fn set_category_bitmask(&mut self, mask: u32) {
        self.category_bitmask = mask;
    }

    #[must_use]
    pub const fn collision_bitmask(&self) -> u32 {
        self.collision_bitmask
    }

    pub fn set_collision_bitmask(&mut self, mask: u32) {
        self.collision_bitmask = mask;
    }

    #[must_use]
    pub const fn material(&self) -> PhysicsMaterial {
        self.material
    }

    #[must_use]
    pub const fn shape(&self) -> ShapeDesc {
        self.shape
    }

    /// Owning node, set at attach time and immutable thereafter.
    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    #[must_use]
    pub const fn handles(&self) -> Option<BodyHandles> {
        self.handles
    }

    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.handles.is_some()
    }

    /// Engine-resolved world position as of the last step or push.
    #[must_use]
    pub const fn world_position(&self) -> Vec2 {
        self.world_position
    }

    /// Engine-resolved world rotation as of the last step or push.
    #[must_use]
    pub const fn world_rotation(&self) -> f32 {
        self.world_rotation
    }

    // -- Attach / commit lifecycle (world-driven) --

    /// Bind the body to its owning node. Panics if it already belongs
    /// to a different node: body ownership is set once.
    pub(crate) fn bind_node(&mut self, node: NodeId) {
        match self.node {
            None => self.node = Some(node),
            Some(current) if current == node => {}
            Some(current) => panic!(
                "physics body is already attached to node {}; \
                 a body cannot be attached to more than one node",
                current.index()
            ),
        }
    }

    pub(crate) fn unbind_node(&mut self) {
        self.node = None;
    }

    fn scaled_shape(&self) -> SharedShape {
        match self.shape {
            ShapeDesc::Circle { radius } => SharedShape::ball(radius * self.scale.x.abs()),
            ShapeDesc::Rect { size } => SharedShape::cuboid(
                (size.x * self.scale.x).abs() * 0.5,
                (size.y * self.scale.y).abs() * 0.5,
            ),
        }
    }

    /// Create the engine body and collider. Called only from the
    /// world's queue commit; `shape_id` is the handle-table id stored
    /// as the collider's user data.
    pub(crate) fn commit(&mut self, space: &mut PhysicsSpace, shape_id: ShapeId) {
        let builder = if self.dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder
            .translation(vector![self.world_position.x, self.world_position.y])
            .rotation(self.world_rotation)
            .gravity_scale(if self.gravity_enabled { 1.0 } else { 0.0 })
            .build();
        let body_handle = space.rigid_body_set.insert(body);

        let collider = ColliderBuilder::new(self.scaled_shape())
            .density(self.material.density)
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(self.category_bitmask),
                Group::from_bits_truncate(self.collision_bitmask),
            ))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .user_data(u128::from(shape_id))
            .build();
        let collider_handle =
            space
                .collider_set
                .insert_with_parent(collider, body_handle, &mut space.rigid_body_set);

        self.handles = Some(BodyHandles {
            body: body_handle,
            collider: collider_handle,
            shape_id,
        });
        self.synced = false;
    }

    /// Destroy the engine body (and its collider). Handles become
    /// invalid until the next commit.
    pub(crate) fn decommit(&mut self, space: &mut PhysicsSpace) {
        if let Some(handles) = self.handles.take() {
            space.rigid_body_set.remove(
                handles.body,
                &mut space.island_manager,
                &mut space.collider_set,
                &mut space.impulse_joint_set,
                &mut space.multibody_joint_set,
                true,
            );
        }
        self.synced = false;
    }

    // -- Transform propagation hooks (world-driven) --

    /// Pre-simulation push: seed or correct the engine pose from the
    /// node's world transform. Skipped when the node transform is
    /// clean and the pose was already seeded, so a resting dynamic
    /// body is not clobbered every frame.
    pub(crate) fn before_simulation(
        &mut self,
        node_to_world: Affine2,
        scale: Vec2,
        rotation: f32,
        transform_dirty: bool,
        anchor_in_points: Vec2,
        space: &mut PhysicsSpace,
    ) {
        let Some(handles) = self.handles else {
            return;
        };

        if (scale - self.scale).abs().max_element() > 1e-5 {
            self.scale = scale;
            if let Some(collider) = space.collider_set.get_mut(handles.collider) {
                collider.set_shape(self.scaled_shape());
            }
        }

        if transform_dirty || !self.synced {
            let world_pos = node_to_world.transform_point2(anchor_in_points);
            self.world_position = world_pos;
            self.world_rotation = rotation;
            if let Some(body) = space.rigid_body_set.get_mut(handles.body) {
                body.set_position(Isometry::new(vector![world_pos.x, world_pos.y], rotation), true);
            }
            self.synced = true;
        }
    }

    /// Post-simulation pull: read the engine-resolved pose and derive
    /// the node's local transform from it. Returns `None` for bodies
    /// the engine cannot have moved.
    pub(crate) fn after_simulation(
        &mut self,
        parent_to_world: Affine2,
        parent_rotation: f32,
        space: &PhysicsSpace,
    ) -> Option<(Vec2, f32)> {
        let handles = self.handles?;
        if !self.dynamic {
            return None;
        }
        let body = space.rigid_body_set.get(handles.body)?;

        let t = body.translation();
        self.world_position = Vec2::new(t.x, t.y);
        self.world_rotation = body.rotation().angle();

        let local_position = parent_to_world
            .inverse()
            .transform_point2(self.world_position);
        let local_rotation = self.world_rotation - parent_rotation;
        Some((local_position, local_rotation))
    }

    /// Substep-mode per-body hook, run after every sub-step: refresh
    /// the cached pose so gameplay reads mid-frame state. Fixed-rate
    /// mode deliberately skips this and relies on the post-simulation
    /// pass alone.
    pub(crate) fn post_step(&mut self, _dt: f32, space: &PhysicsSpace) {
        let Some(handles) = self.handles else {
            return;
        };
        if let Some(body) = space.rigid_body_set.get(handles.body) {
            let t = body.translation();
            self.world_position = Vec2::new(t.x, t.y);
            self.world_rotation = body.rotation().angle();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
