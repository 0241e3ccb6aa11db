//! Mock implementations of core traits for testing.
//!
//! Provides a scheduler that records registration calls and a contact
//! delegate that records begin/end notifications, both inspectable
//! after the exercise under test runs.

use std::cell::RefCell;
use std::rc::Rc;

use cinder_physics::{Contact, ContactDelegate};
use cinder_scene::{NodeId, Scheduler};

// ---------------------------------------------------------------------------
// RecordingScheduler
// ---------------------------------------------------------------------------

/// A scheduler that records every registration call.
///
/// `update` and `fixed` hold the currently registered node ids;
/// `calls` holds the full call sequence for order assertions.
#[derive(Default)]
pub struct RecordingScheduler {
    pub update: Vec<NodeId>,
    pub fixed: Vec<NodeId>,
    pub calls: Vec<String>,
}

impl Scheduler for RecordingScheduler {
    fn schedule_update(&mut self, node: NodeId) {
        self.update.push(node);
        self.calls.push(format!("schedule_update {}", node.index()));
    }

    fn unschedule_update(&mut self, node: NodeId) {
        self.update.retain(|&n| n != node);
        self.calls
            .push(format!("unschedule_update {}", node.index()));
    }

    fn schedule_fixed_update(&mut self, node: NodeId) {
        self.fixed.push(node);
        self.calls
            .push(format!("schedule_fixed_update {}", node.index()));
    }

    fn unschedule_fixed_update(&mut self, node: NodeId) {
        self.fixed.retain(|&n| n != node);
        self.calls
            .push(format!("unschedule_fixed_update {}", node.index()));
    }
}

// ---------------------------------------------------------------------------
// RecordingDelegate
// ---------------------------------------------------------------------------

/// One recorded contact notification: the event name and the two
/// involved node ids in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub event: &'static str,
    pub nodes: (NodeId, NodeId),
}

/// Shared log the [`RecordingDelegate`] writes into, kept outside the
/// delegate so tests still hold it after handing the boxed delegate to
/// the world.
pub type ContactLog = Rc<RefCell<Vec<ContactRecord>>>;

/// A contact delegate that appends every notification to a shared log.
pub struct RecordingDelegate {
    log: ContactLog,
}

impl RecordingDelegate {
    /// Create a delegate and the log it writes into.
    #[must_use]
    pub fn new() -> (Self, ContactLog) {
        let log: ContactLog = Rc::new(RefCell::new(Vec::new()));
        (Self { log: Rc::clone(&log) }, log)
    }
}

impl ContactDelegate for RecordingDelegate {
    fn did_begin(&mut self, contact: &Contact) {
        self.log.borrow_mut().push(ContactRecord {
            event: "begin",
            nodes: contact.nodes(),
        });
    }

    fn did_end(&mut self, contact: &Contact) {
        self.log.borrow_mut().push(ContactRecord {
            event: "end",
            nodes: contact.nodes(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
