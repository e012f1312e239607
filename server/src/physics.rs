//! Rigid-body world for the arena.
//!
//! Wraps a rapier2d pipeline with zero gravity. Body creation, destruction and
//! stepping all go through [`PhysicsWorld`], which is owned by the game loop
//! task, so no lock is needed around it.

use rapier2d::prelude::*;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Ship hull half-extents (local X, local Y). The nose points along local +Y.
pub const SHIP_HALF_EXTENTS: (f32, f32) = (40.0, 120.0);

/// Dust collider radius.
pub const DUST_RADIUS: f32 = 5.0;

/// What to create. Each variant fixes the body type and collider shape.
#[derive(Debug, Clone, Copy)]
pub enum BodyDef {
    /// Dynamic body, rectangular collider.
    Ship {
        x: f32,
        y: f32,
        angle: f32,
        linear_damping: f32,
        angular_damping: f32,
    },
    /// Fixed body, circular sensor.
    Dust { x: f32, y: f32 },
    /// Dynamic CCD body, circular sensor, launched with `velocity`.
    Particle {
        x: f32,
        y: f32,
        angle: f32,
        radius: f32,
        velocity: [f32; 2],
    },
}

/// Position and orientation of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl BodyPose {
    /// Unit vector of the body's local +Y axis in world space.
    pub fn heading(&self) -> [f32; 2] {
        [-self.angle.sin(), self.angle.cos()]
    }
}

/// Two bodies whose contact began during a step. Order is engine-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyContact {
    pub first: RigidBodyHandle,
    pub second: RigidBodyHandle,
}

impl BodyContact {
    pub fn new(first: RigidBodyHandle, second: RigidBodyHandle) -> Self {
        Self { first, second }
    }

    /// Both orderings, first as reported then swapped.
    pub fn orderings(&self) -> [(RigidBodyHandle, RigidBodyHandle); 2] {
        [(self.first, self.second), (self.second, self.first)]
    }
}

/// Collision observer. Records began-contacts; stop and force events are ignored.
#[derive(Default)]
struct ContactRecorder {
    started: Mutex<Vec<BodyContact>>,
}

impl ContactRecorder {
    fn drain(&self) -> Vec<BodyContact> {
        match self.started.lock() {
            Ok(mut started) => std::mem::take(&mut *started),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventHandler for ContactRecorder {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let CollisionEvent::Started(a, b, _) = event else {
            return;
        };
        let parent = |h: ColliderHandle| colliders.get(h).and_then(|c| c.parent());
        let (Some(first), Some(second)) = (parent(a), parent(b)) else {
            return;
        };
        if let Ok(mut started) = self.started.lock() {
            started.push(BodyContact { first, second });
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Velocity iterations drive the solver passes; position iterations drive the
/// stabilization passes run inside each of them. Internal PGS passes keep the
/// engine default.
fn integration_parameters(
    dt: f32,
    velocity_iterations: usize,
    position_iterations: usize,
) -> IntegrationParameters {
    let mut params = IntegrationParameters::default();
    params.dt = dt;
    params.num_solver_iterations =
        NonZeroUsize::new(velocity_iterations).unwrap_or(NonZeroUsize::MIN);
    params.num_internal_stabilization_iterations = position_iterations.max(1);
    params
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    contacts: ContactRecorder,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, 0.0],
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            contacts: ContactRecorder::default(),
        }
    }

    pub fn create_body(&mut self, def: BodyDef) -> RigidBodyHandle {
        let (body, collider) = match def {
            BodyDef::Ship {
                x,
                y,
                angle,
                linear_damping,
                angular_damping,
            } => (
                RigidBodyBuilder::dynamic()
                    .translation(vector![x, y])
                    .rotation(angle)
                    .linear_damping(linear_damping)
                    .angular_damping(angular_damping)
                    .build(),
                ColliderBuilder::cuboid(SHIP_HALF_EXTENTS.0, SHIP_HALF_EXTENTS.1)
                    .density(1.0)
                    .restitution(0.0)
                    .active_events(ActiveEvents::COLLISION_EVENTS)
                    .build(),
            ),
            BodyDef::Dust { x, y } => (
                RigidBodyBuilder::fixed().translation(vector![x, y]).build(),
                ColliderBuilder::ball(DUST_RADIUS)
                    .sensor(true)
                    .active_events(ActiveEvents::COLLISION_EVENTS)
                    .build(),
            ),
            BodyDef::Particle {
                x,
                y,
                angle,
                radius,
                velocity,
            } => (
                RigidBodyBuilder::dynamic()
                    .translation(vector![x, y])
                    .rotation(angle)
                    .linvel(vector![velocity[0], velocity[1]])
                    .ccd_enabled(true)
                    .build(),
                ColliderBuilder::ball(radius)
                    .sensor(true)
                    .active_events(ActiveEvents::COLLISION_EVENTS)
                    .build(),
            ),
        };
        let handle = self.bodies.insert(body);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Remove a body and its colliders. Returns false if it was already gone.
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Advance by `dt` and return the contacts that began during this step.
    pub fn step(
        &mut self,
        dt: f32,
        velocity_iterations: usize,
        position_iterations: usize,
    ) -> Vec<BodyContact> {
        let params = integration_parameters(dt, velocity_iterations, position_iterations);

        self.pipeline.step(
            &self.gravity,
            &params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.contacts,
        );

        self.contacts.drain()
    }

    pub fn pose(&self, handle: RigidBodyHandle) -> Option<BodyPose> {
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        Some(BodyPose {
            x: t.x,
            y: t.y,
            angle: body.rotation().angle(),
        })
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, v: [f32; 2]) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_linvel(vector![v[0], v[1]], true);
                true
            }
            None => false,
        }
    }

    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, w: f32) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_angvel(w, true);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    #[cfg(test)]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
