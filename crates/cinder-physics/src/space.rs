//! Engine state wrapper.
//!
//! All rapier2d pipeline state lives in one struct because
//! `PhysicsPipeline::step()` needs mutable access to every set
//! simultaneously. `step(dt)` is the only way the engine advances;
//! collision events observed during the step are returned to the
//! caller for synchronous dispatch.

use std::sync::Mutex;

use rapier2d::prelude::*;

// ---------------------------------------------------------------------------
// Event and hook plumbing
// ---------------------------------------------------------------------------

/// Buffers collision events raised inside `PhysicsPipeline::step`.
///
/// Rapier hands events to an `&self` handler that must be `Sync`; the
/// mutex is uncontended since the whole subsystem is single-threaded.
#[derive(Default)]
struct CollisionEventQueue {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionEventQueue {
    fn drain(&self) -> Vec<CollisionEvent> {
        let mut events = self
            .events
            .lock()
            .expect("collision event queue lock poisoned");
        std::mem::take(&mut *events)
    }
}

impl EventHandler for CollisionEventQueue {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events
            .lock()
            .expect("collision event queue lock poisoned")
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        // Post-solve slot: reserved for per-impact-impulse logic.
    }
}

/// Pre-solve slot: every contact pair is accepted for solving.
struct AcceptAllHooks;

impl PhysicsHooks for AcceptAllHooks {
    fn filter_contact_pair(&self, _context: &PairFilterContext) -> Option<SolverFlags> {
        Some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn filter_intersection_pair(&self, _context: &PairFilterContext) -> bool {
        true
    }

    fn modify_solver_contacts(&self, _context: &mut ContactModificationContext) {}
}

// ---------------------------------------------------------------------------
// PhysicsSpace
// ---------------------------------------------------------------------------

/// All engine state in a single owner.
pub struct PhysicsSpace {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,

    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,

    pub integration_parameters: IntegrationParameters,
    pub gravity: Vector<Real>,

    events: CollisionEventQueue,
    hooks: AcceptAllHooks,
}

impl PhysicsSpace {
    /// Create an empty space with the given gravity.
    #[must_use]
    pub fn new(gravity: [f32; 2]) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters: IntegrationParameters::default(),
            gravity: vector![gravity[0], gravity[1]],
            events: CollisionEventQueue::default(),
            hooks: AcceptAllHooks,
        }
    }

    /// Advance the engine by exactly `dt` seconds and return the
    /// collision events raised during the step, in engine order.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionEvent> {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &self.hooks,
            &self.events,
        );
        self.events.drain()
    }

    /// Number of rigid bodies currently registered with the engine.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
