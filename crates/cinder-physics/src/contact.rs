//! Contact bridging.
//!
//! The engine knows colliders; gameplay knows bodies and nodes. The
//! bridge is an explicit handle table: every collider carries a small
//! integer shape id as its user data, and the table maps ids back to
//! the owning body and node. No pointers cross the engine boundary.
//!
//! A [`Contact`] lives exactly as long as its arbiter: created when
//! the engine reports the pair started touching, held in the world's
//! arbiter table, released when the pair separates. The delegate only
//! ever borrows it for the duration of a callback.

use std::collections::HashMap;

use rapier2d::prelude::ColliderHandle;

use cinder_scene::NodeId;

use crate::body::BodyRef;

/// Small integer id stored as collider user data.
pub type ShapeId = u32;

/// Identity of one colliding pair's ongoing interaction, stable for
/// the lifetime of the contact. Ordered so (a, b) and (b, a) collapse
/// to the same key.
pub type ArbiterKey = ((u32, u32), (u32, u32));

/// Build the arbiter key for a collider pair.
#[must_use]
pub fn arbiter_key(a: ColliderHandle, b: ColliderHandle) -> ArbiterKey {
    let a = a.into_raw_parts();
    let b = b.into_raw_parts();
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ---------------------------------------------------------------------------
// Shape table
// ---------------------------------------------------------------------------

/// Domain-side record for one committed collider.
#[derive(Clone)]
pub struct ContactShape {
    pub shape_id: ShapeId,
    pub body: BodyRef,
    pub node: NodeId,
}

/// Handle table mapping shape ids to domain records.
///
/// Ids are allocated at body commit and released at decommit; they are
/// never reused within a world's lifetime, so a stale id simply fails
/// to resolve.
#[derive(Default)]
pub struct ShapeTable {
    next_id: ShapeId,
    entries: HashMap<ShapeId, ContactShape>,
}

impl ShapeTable {
    /// Register a committed body's shape and return its id.
    pub fn alloc(&mut self, body: BodyRef, node: NodeId) -> ShapeId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            ContactShape {
                shape_id: id,
                body,
                node,
            },
        );
        id
    }

    /// Drop a shape record at decommit time.
    pub fn release(&mut self, id: ShapeId) {
        self.entries.remove(&id);
    }

    /// Resolve a shape id back to its domain record.
    #[must_use]
    pub fn get(&self, id: ShapeId) -> Option<&ContactShape> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A collision event's domain view: the two shape-owning constructs
/// and the arbiter identity pairing begin with separate.
pub struct Contact {
    pub shape_a: ContactShape,
    pub shape_b: ContactShape,
    arbiter: ArbiterKey,
}

impl Contact {
    pub(crate) fn new(shape_a: ContactShape, shape_b: ContactShape, arbiter: ArbiterKey) -> Self {
        Self {
            shape_a,
            shape_b,
            arbiter,
        }
    }

    /// Arbiter identity this contact is scoped to.
    #[must_use]
    pub const fn arbiter(&self) -> ArbiterKey {
        self.arbiter
    }

    /// Nodes owning the two shapes, in table order.
    #[must_use]
    pub const fn nodes(&self) -> (NodeId, NodeId) {
        (self.shape_a.node, self.shape_b.node)
    }
}

/// Receiver for contact begin/end notifications.
///
/// Handlers run synchronously inside the physics step, on the calling
/// thread, with exclusive access to the world and tree. They must not
/// retain the borrowed contact past the callback's return, and must
/// not mutate the world reentrantly; deferred mutation goes through
/// the normal add/remove queues.
pub trait ContactDelegate {
    fn did_begin(&mut self, contact: &Contact);
    fn did_end(&mut self, contact: &Contact);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
