//! External scheduler seam.
//!
//! The scene does not drive its own tick; an external game loop owns a
//! scheduler and calls back into registered nodes once per frame (and
//! once per fixed step). The scene only maintains set membership, and
//! only on transitions: a node is registered while it has at least one
//! component with the matching capability.

use crate::node::NodeId;

/// Set-membership registration for per-frame and fixed-step callbacks.
///
/// Implementations need no ordering guarantee beyond invoking each
/// registered node once per tick. Registration calls are edge-triggered
/// by the scene; a node is never scheduled twice without an intervening
/// unschedule.
pub trait Scheduler {
    fn schedule_update(&mut self, node: NodeId);
    fn unschedule_update(&mut self, node: NodeId);
    fn schedule_fixed_update(&mut self, node: NodeId);
    fn unschedule_fixed_update(&mut self, node: NodeId);
}
