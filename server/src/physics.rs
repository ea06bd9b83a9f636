//! rapier2d wrapper exposing the small body API the match engine needs.
//!
//! All velocities crossing this boundary are in field units per tick. rapier
//! works in units per second, so the world converts on the way in and out
//! using the tick rate it was created with.

use rapier2d::prelude::*;
use soccer_shared::vec2::Vec2;
use std::collections::HashMap;

pub type BodyHandle = RigidBodyHandle;

/// What a body is for. Contact dispatch matches on this instead of labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRole {
    Player,
    Opponent,
    /// A ball, identified by its slot in the match's ball list
    Ball(usize),
    TopGoal,
    BottomGoal,
    CenterBarrier,
    CenterLine,
    Wall,
    GoalPost,
}

impl BodyRole {
    pub fn ball_slot(self) -> Option<usize> {
        match self {
            BodyRole::Ball(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, BodyRole::Player | BodyRole::Opponent)
    }
}

/// Collision layer a body lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Players collide with everything except goal sensors.
    Player,
    /// Balls collide with everything except the center barrier.
    Ball,
    /// Blocks players only.
    CenterBarrier,
    /// Detects balls only.
    GoalSensor,
    /// Walls and goal frames.
    Solid,
    /// Visual-only geometry that never reports contacts.
    Decoration,
}

impl Layer {
    fn groups(self) -> InteractionGroups {
        match self {
            Layer::Player => InteractionGroups::new(Group::GROUP_1, Group::ALL),
            Layer::CenterBarrier => InteractionGroups::new(Group::GROUP_2, Group::GROUP_1),
            Layer::Ball => {
                InteractionGroups::new(Group::GROUP_3, Group::ALL.difference(Group::GROUP_2))
            }
            Layer::GoalSensor => InteractionGroups::new(Group::GROUP_4, Group::GROUP_3),
            Layer::Solid => InteractionGroups::new(Group::GROUP_5, Group::ALL),
            Layer::Decoration => InteractionGroups::new(Group::GROUP_6, Group::NONE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

/// Everything needed to create one body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub role: BodyRole,
    pub shape: Shape,
    pub layer: Layer,
    pub position: Vec2,
    pub velocity: Vec2,
    pub fixed: bool,
    pub sensor: bool,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Fraction of velocity lost per tick
    pub air_friction: f32,
}

impl BodyDesc {
    /// A dynamic circle with unit mass and no damping.
    pub fn circle(role: BodyRole, layer: Layer, position: Vec2, radius: f32) -> Self {
        Self {
            role,
            shape: Shape::Circle { radius },
            layer,
            position,
            velocity: Vec2::ZERO,
            fixed: false,
            sensor: false,
            mass: 1.0,
            restitution: 0.0,
            friction: 0.1,
            air_friction: 0.0,
        }
    }

    /// A static rectangle centered on `center`.
    pub fn fixed_rect(role: BodyRole, layer: Layer, center: Vec2, width: f32, height: f32) -> Self {
        Self {
            role,
            shape: Shape::Rect { width, height },
            layer,
            position: center,
            velocity: Vec2::ZERO,
            fixed: true,
            sensor: false,
            mass: 0.0,
            restitution: 0.0,
            friction: 0.1,
            air_friction: 0.0,
        }
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn air_friction(mut self, air_friction: f32) -> Self {
        self.air_friction = air_friction;
        self
    }
}

/// A pair of bodies that started touching during a step. Order is whatever
/// rapier reported; resolvers must check both orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyRole,
    pub b: BodyRole,
}

impl Contact {
    /// If one side matches `pred`, return `(matching, other)`.
    pub fn split(self, pred: impl Fn(BodyRole) -> bool) -> Option<(BodyRole, BodyRole)> {
        if pred(self.a) {
            Some((self.a, self.b))
        } else if pred(self.b) {
            Some((self.b, self.a))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BodyMeta {
    mass: f32,
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    tick_rate: f32,
    bodies: HashMap<RigidBodyHandle, BodyMeta>,
    collider_roles: HashMap<ColliderHandle, BodyRole>,
}

impl PhysicsWorld {
    /// Zero-gravity world stepping at `tick_rate` Hz.
    pub fn new(tick_rate: f32) -> Self {
        let integration_params = IntegrationParameters {
            dt: 1.0 / tick_rate,
            ..Default::default()
        };
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            tick_rate,
            bodies: HashMap::new(),
            collider_roles: HashMap::new(),
        }
    }

    pub fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    pub fn spawn(&mut self, desc: BodyDesc) -> BodyHandle {
        let translation = vector![desc.position.x, desc.position.y];
        let rb = if desc.fixed {
            RigidBodyBuilder::fixed().translation(translation).build()
        } else {
            RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(self.to_world(desc.velocity))
                .linear_damping(self.damping_for(desc.air_friction))
                .can_sleep(false)
                .ccd_enabled(desc.layer == Layer::Ball)
                .build()
        };
        let body_handle = self.rigid_body_set.insert(rb);

        let builder = match desc.shape {
            Shape::Circle { radius } => ColliderBuilder::ball(radius),
            Shape::Rect { width, height } => ColliderBuilder::cuboid(width / 2.0, height / 2.0),
        };
        let mut builder = builder
            .sensor(desc.sensor)
            .restitution(desc.restitution)
            .friction(desc.friction)
            .collision_groups(desc.layer.groups())
            .active_events(ActiveEvents::COLLISION_EVENTS);
        if !desc.fixed {
            builder = builder.mass(desc.mass);
        }
        let collider_handle = self.collider_set.insert_with_parent(
            builder.build(),
            body_handle,
            &mut self.rigid_body_set,
        );

        self.bodies.insert(body_handle, BodyMeta { mass: desc.mass });
        self.collider_roles.insert(collider_handle, desc.role);
        body_handle
    }

    /// Remove a body and its collider. Returns false if it was already gone.
    pub fn despawn(&mut self, handle: BodyHandle) -> bool {
        if self.bodies.remove(&handle).is_none() {
            return false;
        }
        if let Some(rb) = self.rigid_body_set.get(handle) {
            for collider in rb.colliders() {
                self.collider_roles.remove(collider);
            }
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        let t = self.rigid_body_set.get(handle)?.translation();
        Some(Vec2::new(t.x, t.y))
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        let v = self.rigid_body_set.get(handle)?.linvel();
        Some(Vec2::new(v.x / self.tick_rate, v.y / self.tick_rate))
    }

    pub fn angle(&self, handle: BodyHandle) -> Option<f32> {
        Some(self.rigid_body_set.get(handle)?.rotation().angle())
    }

    pub fn mass(&self, handle: BodyHandle) -> Option<f32> {
        self.bodies.get(&handle).map(|meta| meta.mass)
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_translation(vector![position.x, position.y], true);
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        let linvel = self.to_world(velocity);
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_linvel(linvel, true);
        }
    }

    pub fn set_angular_velocity(&mut self, handle: BodyHandle, angvel: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_angvel(angvel * self.tick_rate, true);
        }
    }

    /// One tick of `force` changes the body's velocity by `force / mass`.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        let Some(mass) = self.mass(handle).filter(|m| *m > 0.0) else {
            return;
        };
        if let Some(v) = self.velocity(handle) {
            self.set_velocity(handle, Vec2::new(v.x + force.x / mass, v.y + force.y / mass));
        }
    }

    pub fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        let Some(rb) = self.rigid_body_set.get(handle) else {
            return;
        };
        let colliders: Vec<ColliderHandle> = rb.colliders().to_vec();
        for collider in colliders {
            if let Some(c) = self.collider_set.get_mut(collider) {
                c.set_restitution(restitution);
            }
        }
    }

    pub fn restitution(&self, handle: BodyHandle) -> Option<f32> {
        let rb = self.rigid_body_set.get(handle)?;
        let collider = rb.colliders().first()?;
        Some(self.collider_set.get(*collider)?.restitution())
    }

    /// Advance one fixed step and return the contacts that started during it.
    pub fn step(&mut self) -> Vec<Contact> {
        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut contacts = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                let a = self.collider_roles.get(&h1).copied();
                let b = self.collider_roles.get(&h2).copied();
                if let (Some(a), Some(b)) = (a, b) {
                    contacts.push(Contact { a, b });
                }
            }
        }
        contacts
    }

    fn to_world(&self, v: Vec2) -> Vector<Real> {
        vector![v.x * self.tick_rate, v.y * self.tick_rate]
    }

    /// Convert a per-tick air friction fraction into rapier linear damping.
    fn damping_for(&self, air_friction: f32) -> f32 {
        let f = air_friction.clamp(0.0, 0.99);
        (1.0 / (1.0 - f) - 1.0) * self.tick_rate
    }
}
