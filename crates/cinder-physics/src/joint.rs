//! Physics joint component.
//!
//! Joints reference two bodies and live through the same deferred
//! queue lifecycle as bodies, but on their own queues. A joint can
//! only be committed once both bodies hold engine handles; the world
//! checks that precondition when it drains the joint add queue.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rapier2d::prelude::*;

use crate::body::BodyRef;
use crate::space::PhysicsSpace;

/// Shared handle to a physics joint.
pub type JointRef = Rc<RefCell<PhysicsJoint>>;

/// Wrap a joint into a [`JointRef`].
pub fn joint_ref(joint: PhysicsJoint) -> JointRef {
    Rc::new(RefCell::new(joint))
}

/// Joint flavor and its body-local anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// Free relative rotation around a shared pivot.
    Revolute { anchor_a: Vec2, anchor_b: Vec2 },
    /// Rigid weld at the given anchors.
    Fixed { anchor_a: Vec2, anchor_b: Vec2 },
}

/// A constraint between two bodies, committed and removed through the
/// world's joint queues.
pub struct PhysicsJoint {
    body_a: BodyRef,
    body_b: BodyRef,
    kind: JointKind,
    handle: Option<ImpulseJointHandle>,
}

impl PhysicsJoint {
    /// Revolute joint pivoting at `anchor_a`/`anchor_b` in each body's
    /// local space.
    #[must_use]
    pub fn revolute(body_a: BodyRef, body_b: BodyRef, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            kind: JointKind::Revolute { anchor_a, anchor_b },
            handle: None,
        }
    }

    /// Fixed weld between the two bodies at the given local anchors.
    #[must_use]
    pub fn fixed(body_a: BodyRef, body_b: BodyRef, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            kind: JointKind::Fixed { anchor_a, anchor_b },
            handle: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> JointKind {
        self.kind
    }

    #[must_use]
    pub fn body_a(&self) -> BodyRef {
        self.body_a.clone()
    }

    #[must_use]
    pub fn body_b(&self) -> BodyRef {
        self.body_b.clone()
    }

    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.handle.is_some()
    }

    /// Create the engine constraint. Returns false when either body is
    /// not yet active in the engine; the caller logs and drops the
    /// joint in that case.
    pub(crate) fn commit(&mut self, space: &mut PhysicsSpace) -> bool {
        let Some(handles_a) = self.body_a.borrow().handles() else {
            return false;
        };
        let Some(handles_b) = self.body_b.borrow().handles() else {
            return false;
        };

        let joint: GenericJoint = match self.kind {
            JointKind::Revolute { anchor_a, anchor_b } => RevoluteJointBuilder::new()
                .local_anchor1(point![anchor_a.x, anchor_a.y])
                .local_anchor2(point![anchor_b.x, anchor_b.y])
                .build()
                .into(),
            JointKind::Fixed { anchor_a, anchor_b } => FixedJointBuilder::new()
                .local_anchor1(point![anchor_a.x, anchor_a.y])
                .local_anchor2(point![anchor_b.x, anchor_b.y])
                .build()
                .into(),
        };

        self.handle = Some(space.impulse_joint_set.insert(
            handles_a.body,
            handles_b.body,
            joint,
            true,
        ));
        true
    }

    /// Remove the engine constraint, if any.
    pub(crate) fn decommit(&mut self, space: &mut PhysicsSpace) {
        if let Some(handle) = self.handle.take() {
            space.impulse_joint_set.remove(handle, true);
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

    #[test]
    fn commit_fails_while_either_body_is_uncommitted() {
        let mut space = PhysicsSpace::new([0.0, 0.0]);
        let a = body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default()));
        let b = body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default()));

        let mut joint = PhysicsJoint::revolute(a.clone(), b.clone(), Vec2::ZERO, Vec2::ZERO);
        assert!(!joint.commit(&mut space));

        a.borrow_mut().commit(&mut space, 0);
        assert!(!joint.commit(&mut space));

        b.borrow_mut().commit(&mut space, 1);
        assert!(joint.commit(&mut space));
        assert!(joint.is_committed());
    }

    #[test]
    fn decommit_releases_the_engine_constraint() {
        let mut space = PhysicsSpace::new([0.0, 0.0]);
        let a = body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default()));
        let b = body_ref(PhysicsBody::circle(1.0, PhysicsMaterial::default()));
        a.borrow_mut().commit(&mut space, 0);
        b.borrow_mut().commit(&mut space, 1);

        let mut joint = PhysicsJoint::fixed(a, b, Vec2::ZERO, Vec2::new(0.0, 10.0));
        assert!(joint.commit(&mut space));
        assert_eq!(space.impulse_joint_set.len(), 1);

        joint.decommit(&mut space);
        assert!(!joint.is_committed());
        assert_eq!(space.impulse_joint_set.len(), 0);
    }
}
