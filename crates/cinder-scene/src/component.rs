//! Attachable behavior units.
//!
//! A [`Component`] declares its capabilities at construction time via
//! [`Capabilities`] flags; the scene queries them once at attach time
//! instead of probing the concrete type at every tick.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::node::NodeId;

bitflags! {
    /// Capability set a component declares at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        /// Receives `update(dt)` every frame.
        const UPDATE = 1 << 0;
        /// Receives `fixed_update(dt)` every fixed step.
        const FIXED_UPDATE = 1 << 1;
    }
}

/// Shared handle to an attached component.
///
/// Components are reference types: gameplay code keeps a handle to
/// mutate a component after attaching it, and removal-by-identity
/// compares handles with `Rc::ptr_eq`.
pub type ComponentRef = Rc<RefCell<dyn Component>>;

/// Wrap a concrete component into a [`ComponentRef`].
pub fn component_ref<C: Component>(component: C) -> ComponentRef {
    Rc::new(RefCell::new(component))
}

/// A unit of behavior attachable to exactly one node.
///
/// The owner is set once at attach time; attaching a component that
/// already has an owner is a programmer error and panics. Tags are used
/// for lookup and removal: they need not be unique across component
/// types, but only the first match is returned by tag lookup and all
/// matches are removed by tag removal.
pub trait Component: 'static {
    /// Identifying tag, unique among siblings for lookup purposes.
    fn tag(&self) -> u32;

    /// Capability flags, fixed at construction.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Current owner, if attached.
    fn owner(&self) -> Option<NodeId>;

    /// Record or clear the owner. Called by the scene only.
    fn set_owner(&mut self, owner: Option<NodeId>);

    /// Attachment notification, after the owner is recorded.
    fn on_add(&mut self, _owner: NodeId) {}

    /// Detachment notification, before the owner is cleared.
    fn on_remove(&mut self) {}

    /// Per-frame hook; only called when `UPDATE` is declared.
    fn update(&mut self, _dt: f32) {}

    /// Fixed-step hook; only called when `FIXED_UPDATE` is declared.
    fn fixed_update(&mut self, _dt: f32) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
