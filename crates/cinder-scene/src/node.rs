//! Arena-backed scene tree.
//!
//! `Scene` owns every node; `NodeId` is a plain index that stays unique
//! for the lifetime of the scene (slots are never reused). Children are
//! exclusively owned ordered id lists and the parent link is a
//! non-owning back id. Traversal is pre-order with children in
//! insertion order, and is identical wherever the tree is walked.

use std::cell::Cell;
use std::rc::Rc;

use glam::{Affine2, Vec2};

use cinder_core::SceneError;

use crate::component::{Capabilities, ComponentRef};
use crate::scheduler::Scheduler;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Index of a node within its scene's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A positioned, sized element of the scene hierarchy.
///
/// `position` is where the anchor point lands in the parent's
/// coordinate space; the node-to-parent matrix is derived purely from
/// the stored transform fields and cached until one of them changes.
pub struct Node {
    position: Vec2,
    scale: Vec2,
    rotation: f32,
    anchor_point: Vec2,
    content_size: Vec2,

    parent: Option<NodeId>,
    children: Vec<NodeId>,

    to_parent_cache: Cell<Option<Affine2>>,
    transform_dirty: bool,

    components: Vec<ComponentRef>,
    updatable: Vec<ComponentRef>,
    fixed_updatable: Vec<ComponentRef>,
    pending_schedule: Capabilities,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Create a node at the origin with unit scale and zero size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            anchor_point: Vec2::ZERO,
            content_size: Vec2::ZERO,
            parent: None,
            children: Vec::new(),
            to_parent_cache: Cell::new(None),
            // New nodes must seed their physics pose on the first walk.
            transform_dirty: true,
            components: Vec::new(),
            updatable: Vec::new(),
            fixed_updatable: Vec::new(),
            pending_schedule: Capabilities::empty(),
        }
    }

    // -- Transform fields --

    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.invalidate_transform();
    }

    #[must_use]
    pub const fn scale(&self) -> Vec2 {
        self.scale
    }

    #[must_use]
    pub const fn scale_x(&self) -> f32 {
        self.scale.x
    }

    #[must_use]
    pub const fn scale_y(&self) -> f32 {
        self.scale.y
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        self.invalidate_transform();
    }

    /// Rotation in radians, counter-clockwise.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.invalidate_transform();
    }

    /// Anchor point in normalized content-size units.
    #[must_use]
    pub const fn anchor_point(&self) -> Vec2 {
        self.anchor_point
    }

    pub fn set_anchor_point(&mut self, anchor_point: Vec2) {
        self.anchor_point = anchor_point;
        self.invalidate_transform();
    }

    #[must_use]
    pub const fn content_size(&self) -> Vec2 {
        self.content_size
    }

    pub fn set_content_size(&mut self, content_size: Vec2) {
        self.content_size = content_size;
        self.invalidate_transform();
    }

    /// Anchor point in points (anchor × content size).
    #[must_use]
    pub fn anchor_point_in_points(&self) -> Vec2 {
        self.anchor_point * self.content_size
    }

    /// Composed node-to-parent transform, cached until a field changes.
    #[must_use]
    pub fn node_to_parent(&self) -> Affine2 {
        if let Some(m) = self.to_parent_cache.get() {
            return m;
        }
        let m = Affine2::from_scale_angle_translation(self.scale, self.rotation, self.position)
            * Affine2::from_translation(-self.anchor_point_in_points());
        self.to_parent_cache.set(Some(m));
        m
    }

    /// Whether the transform was mutated since the last simulation
    /// write-back. Consumed by the physics pre-simulation pass to
    /// decide whether to re-seed the engine pose.
    #[must_use]
    pub const fn transform_dirty(&self) -> bool {
        self.transform_dirty
    }

    pub fn clear_transform_dirty(&mut self) {
        self.transform_dirty = false;
    }

    /// Write a simulation-resolved local transform back into the node
    /// without marking it dirty, so the next pre-simulation pass does
    /// not push it straight back into the engine.
    pub fn apply_simulated_transform(&mut self, position: Vec2, rotation: f32) {
        self.position = position;
        self.rotation = rotation;
        self.to_parent_cache.set(None);
    }

    fn invalidate_transform(&mut self) {
        self.to_parent_cache.set(None);
        self.transform_dirty = true;
    }

    // -- Tree links --

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    // -- Components --

    /// All attached components, in attach order.
    #[must_use]
    pub fn components(&self) -> &[ComponentRef] {
        &self.components
    }

    /// Capabilities whose scheduler registration is deferred until a
    /// scheduler is bound.
    #[must_use]
    pub const fn pending_schedule(&self) -> Capabilities {
        self.pending_schedule
    }

    /// Forward a frame tick to every updatable component, in order.
    pub fn update(&self, dt: f32) {
        for c in &self.updatable {
            c.borrow_mut().update(dt);
        }
    }

    /// Forward a fixed step to every fixed-updatable component, in order.
    pub fn fixed_update(&self, dt: f32) {
        for c in &self.fixed_updatable {
            c.borrow_mut().fixed_update(dt);
        }
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Arena owner of the node tree, rooted at a default node.
pub struct Scene {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene containing only a root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new())],
            root: NodeId(0),
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Insert `node` as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(Some(node));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Remove a node and its whole subtree, detaching all components.
    ///
    /// Returns `false` if the id is stale. The root cannot be removed.
    pub fn remove_node(
        &mut self,
        id: NodeId,
        mut scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) -> bool {
        if id == self.root || self.try_node(id).is_err() {
            return false;
        }
        if let Some(parent) = self.node(id).parent {
            if let Some(p) = self.slot_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        self.drop_subtree(id, &mut scheduler);
        true
    }

    fn drop_subtree(&mut self, id: NodeId, scheduler: &mut Option<&mut (dyn Scheduler + '_)>) {
        let children = self.node(id).children.clone();
        for child in children {
            self.drop_subtree(child, scheduler);
        }
        self.remove_all_components(id, scheduler.as_deref_mut());
        self.nodes[id.0] = None;
    }

    /// Borrow a node. Panics on a stale or foreign id: handing one in
    /// violates the arena contract and there is nothing to recover.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0]
            .as_ref()
            .unwrap_or_else(|| panic!("no node at index {} (removed or foreign NodeId)", id.0))
    }

    /// Mutably borrow a node; same contract as [`Scene::node`].
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0]
            .as_mut()
            .unwrap_or_else(|| panic!("no node at index {} (removed or foreign NodeId)", id.0))
    }

    /// Fallible lookup for callers that may hold stale ids.
    pub fn try_node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SceneError::NodeNotFound { index: id.0 })
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Pre-order traversal from the root, children in insertion order.
    #[must_use]
    pub fn visit_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.collect_pre_order(self.root, &mut order);
        order
    }

    fn collect_pre_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.node(id).children() {
            self.collect_pre_order(child, out);
        }
    }

    // -- Component attach/detach --

    /// Look up the first component with `tag` on `id`.
    #[must_use]
    pub fn get_component(&self, id: NodeId, tag: u32) -> Option<ComponentRef> {
        self.node(id)
            .components
            .iter()
            .find(|c| c.borrow().tag() == tag)
            .cloned()
    }

    /// Attach a component to a node.
    ///
    /// Panics if the component already has an owner — a component
    /// cannot be attached to more than one node, and silently stealing
    /// it would corrupt the previous owner's lists. Returns `false`
    /// (with no side effects) if the node already has a component with
    /// the same tag.
    ///
    /// Pass the active scheduler so the node can be registered when it
    /// gains its first updatable component; with `None` the
    /// registration is recorded as pending and flushed by
    /// [`Scene::bind_scheduler`].
    pub fn add_component(
        &mut self,
        id: NodeId,
        component: ComponentRef,
        mut scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) -> bool {
        let (tag, caps, prior_owner) = {
            let c = component.borrow();
            (c.tag(), c.capabilities(), c.owner())
        };
        if let Some(owner) = prior_owner {
            panic!(
                "component (tag {tag}) is already owned by node {}; \
                 a component cannot be attached to more than one owner",
                owner.index()
            );
        }
        if self.get_component(id, tag).is_some() {
            return false;
        }

        {
            let mut c = component.borrow_mut();
            c.set_owner(Some(id));
            c.on_add(id);
        }

        let node = self.node_mut(id);
        node.components.push(Rc::clone(&component));

        if caps.contains(Capabilities::UPDATE) {
            node.updatable.push(Rc::clone(&component));
            if node.updatable.len() == 1 {
                match scheduler.as_mut() {
                    Some(s) => s.schedule_update(id),
                    None => node.pending_schedule |= Capabilities::UPDATE,
                }
            }
        }
        if caps.contains(Capabilities::FIXED_UPDATE) {
            let node = self.node_mut(id);
            node.fixed_updatable.push(Rc::clone(&component));
            if node.fixed_updatable.len() == 1 {
                match scheduler.as_mut() {
                    Some(s) => s.schedule_fixed_update(id),
                    None => node.pending_schedule |= Capabilities::FIXED_UPDATE,
                }
            }
        }
        true
    }

    /// Remove every component with `tag` from `id`, notifying each of
    /// detachment. Returns `true` if anything was removed.
    pub fn remove_component_by_tag(
        &mut self,
        id: NodeId,
        tag: u32,
        mut scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) -> bool {
        let node = self.node_mut(id);
        let before = node.components.len();

        let removed: Vec<ComponentRef> = node
            .components
            .iter()
            .filter(|c| c.borrow().tag() == tag)
            .cloned()
            .collect();
        node.components.retain(|c| c.borrow().tag() != tag);

        let had_updatable = !node.updatable.is_empty();
        let had_fixed = !node.fixed_updatable.is_empty();
        node.updatable.retain(|c| c.borrow().tag() != tag);
        node.fixed_updatable.retain(|c| c.borrow().tag() != tag);
        let update_emptied = had_updatable && node.updatable.is_empty();
        let fixed_emptied = had_fixed && node.fixed_updatable.is_empty();

        for c in &removed {
            let mut c = c.borrow_mut();
            c.on_remove();
            c.set_owner(None);
        }

        if update_emptied {
            self.settle_unschedule(id, Capabilities::UPDATE, scheduler.as_deref_mut());
        }
        if fixed_emptied {
            self.settle_unschedule(id, Capabilities::FIXED_UPDATE, scheduler.as_deref_mut());
        }

        before != self.node(id).components.len()
    }

    /// Remove a component by identity; delegates to tag removal, so
    /// same-tag siblings are removed together.
    pub fn remove_component(
        &mut self,
        id: NodeId,
        component: &ComponentRef,
        scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) -> bool {
        let tag = component.borrow().tag();
        self.remove_component_by_tag(id, tag, scheduler)
    }

    /// Detach and drop every component on `id`, unconditionally
    /// unregistering the node from both scheduler capabilities.
    pub fn remove_all_components(
        &mut self,
        id: NodeId,
        mut scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) {
        let node = self.node_mut(id);
        let all = std::mem::take(&mut node.components);
        node.updatable.clear();
        node.fixed_updatable.clear();

        for c in &all {
            let mut c = c.borrow_mut();
            c.on_remove();
            c.set_owner(None);
        }

        self.settle_unschedule(id, Capabilities::UPDATE, scheduler.as_deref_mut());
        self.settle_unschedule(id, Capabilities::FIXED_UPDATE, scheduler.as_deref_mut());
    }

    /// Clear a capability's registration: drop the pending flag if the
    /// registration never reached a scheduler, otherwise unschedule.
    fn settle_unschedule(
        &mut self,
        id: NodeId,
        cap: Capabilities,
        scheduler: Option<&mut (dyn Scheduler + '_)>,
    ) {
        let node = self.node_mut(id);
        if node.pending_schedule.contains(cap) {
            node.pending_schedule -= cap;
            return;
        }
        if let Some(s) = scheduler {
            if cap.contains(Capabilities::UPDATE) {
                s.unschedule_update(id);
            } else {
                s.unschedule_fixed_update(id);
            }
        }
    }

    /// Flush pending registrations into a newly available scheduler.
    ///
    /// Called once when the tree becomes active. Nodes whose first
    /// updatable component arrived while no scheduler existed are
    /// registered here and their pending flags cleared.
    pub fn bind_scheduler(&mut self, scheduler: &mut dyn Scheduler) {
        for slot in 0..self.nodes.len() {
            let id = NodeId(slot);
            let Some(node) = self.slot_mut(id) else {
                continue;
            };
            let pending = node.pending_schedule;
            if pending.is_empty() {
                continue;
            }
            node.pending_schedule = Capabilities::empty();
            if pending.contains(Capabilities::UPDATE) {
                scheduler.schedule_update(id);
            }
            if pending.contains(Capabilities::FIXED_UPDATE) {
                scheduler.schedule_fixed_update(id);
            }
        }
    }

    /// Forward a frame tick to a node's updatable components.
    pub fn dispatch_update(&self, id: NodeId, dt: f32) {
        self.node(id).update(dt);
    }

    /// Forward a fixed step to a node's fixed-updatable components.
    pub fn dispatch_fixed_update(&self, id: NodeId, dt: f32) {
        self.node(id).fixed_update(dt);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
