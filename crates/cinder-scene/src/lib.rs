//! cinder-scene: Hierarchical node tree with attachable components.
//!
//! Nodes live in an arena owned by `Scene` and are addressed by `NodeId`;
//! children are exclusively owned (ordered id lists) and the parent link
//! is a non-owning back id, so the tree cannot form ownership cycles.
//! Components give nodes per-frame and fixed-step behavior; the external
//! `Scheduler` collaborator is notified edge-triggered as nodes gain and
//! lose updatable components.

pub mod component;
pub mod node;
pub mod scheduler;

pub mod prelude {
    pub use crate::component::{component_ref, Capabilities, Component, ComponentRef};
    pub use crate::node::{Node, NodeId, Scene};
    pub use crate::scheduler::Scheduler;
}

pub use component::{Capabilities, Component, ComponentRef};
pub use node::{Node, NodeId, Scene};
pub use scheduler::Scheduler;
