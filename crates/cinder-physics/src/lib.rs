//! cinder-physics: Rigid-body simulation bridged into the cinder scene
//! tree.
//!
//! The engine (rapier2d) is an opaque stepping black box behind
//! `PhysicsSpace`; everything else here is synchronization: deferred
//! body/joint registration queues, the fixed-rate and substep stepping
//! policies, the pre/post simulation transform propagation walks, and
//! the contact bridge that turns engine collision events into domain
//! `Contact` objects for a user delegate.

pub mod body;
pub mod contact;
pub mod joint;
pub mod space;
pub mod world;

#[cfg(test)]
mod integration;

pub mod prelude {
    pub use crate::body::{body_ref, BodyRef, PhysicsBody, PhysicsMaterial, ShapeDesc};
    pub use crate::contact::{Contact, ContactDelegate, ContactShape, ShapeId};
    pub use crate::joint::{joint_ref, JointRef, PhysicsJoint};
    pub use crate::space::PhysicsSpace;
    pub use crate::world::PhysicsWorld;
}

pub use body::{BodyRef, PhysicsBody, PhysicsMaterial};
pub use contact::{Contact, ContactDelegate};
pub use world::PhysicsWorld;
