use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::physics::collider::ColliderHull;

/// Physics parameters accepted from the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Vertical acceleration; negative pulls down.
    pub gravity: f32,
    pub density_multiplier: f32,
    /// [0, 1]
    pub restitution: f32,
    /// [0, 1]
    pub linear_damping: f32,
    /// [0, 1]
    pub angular_damping: f32,
    pub friction: f32,
    /// Seconds between body creation and applying the material overrides.
    pub settle_delay: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            density_multiplier: 1.0,
            restitution: 0.3,
            linear_damping: 0.1,
            angular_damping: 0.1,
            friction: 0.5,
            settle_delay: 0.1,
        }
    }
}

impl PhysicsSettings {
    /// Restricts every field to its valid range.
    #[must_use]
    pub fn clamped(self) -> Self {
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
        let d = Self::default();
        Self {
            gravity: finite_or(self.gravity, d.gravity),
            density_multiplier: finite_or(self.density_multiplier, d.density_multiplier).max(0.0),
            restitution: finite_or(self.restitution, d.restitution).clamp(0.0, 1.0),
            linear_damping: finite_or(self.linear_damping, d.linear_damping).clamp(0.0, 1.0),
            angular_damping: finite_or(self.angular_damping, d.angular_damping).clamp(0.0, 1.0),
            friction: finite_or(self.friction, d.friction).max(0.0),
            settle_delay: finite_or(self.settle_delay, d.settle_delay).max(0.0),
        }
    }
}

/// Opaque body id issued by the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// Seam to the host's rigid-body simulation.
pub trait PhysicsWorld {
    fn set_gravity(&mut self, gravity: Vec3);
    fn create_convex_body(&mut self, hull: &ColliderHull, mass: f32) -> BodyId;
    fn set_restitution(&mut self, body: BodyId, restitution: f32);
    fn set_damping(&mut self, body: BodyId, linear: f32, angular: f32);
    fn set_friction(&mut self, body: BodyId, friction: f32);
    fn remove_body(&mut self, body: BodyId);
}

/// What [`PhysicsBinding::sync`] did this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    Idle,
    /// A body was (re)built; overrides follow after the settle delay.
    Created(BodyId),
    /// Restitution, damping and friction were applied.
    Configured(BodyId),
}

/// Keeps one host body in step with the current hull and settings.
#[derive(Debug)]
pub struct PhysicsBinding {
    settings: PhysicsSettings,
    hull: Arc<ColliderHull>,
    body: Option<BodyId>,
    rebuild: bool,
    settle_remaining: f32,
    configured: bool,
}

impl PhysicsBinding {
    #[must_use]
    pub fn new(hull: Arc<ColliderHull>, settings: PhysicsSettings) -> Self {
        Self {
            settings: settings.clamped(),
            hull,
            body: None,
            rebuild: true,
            settle_remaining: 0.0,
            configured: false,
        }
    }

    #[must_use]
    pub fn hull(&self) -> &Arc<ColliderHull> {
        &self.hull
    }

    #[must_use]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    #[must_use]
    pub fn body(&self) -> Option<BodyId> {
        self.body
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Swaps in the hull of a newly materialized mesh; the body is rebuilt on
    /// the next sync.
    pub fn set_hull(&mut self, hull: Arc<ColliderHull>) {
        self.hull = hull;
        self.rebuild = true;
    }

    pub fn set_settings(&mut self, settings: PhysicsSettings) {
        let settings = settings.clamped();
        if settings.density_multiplier.to_bits() != self.settings.density_multiplier.to_bits()
            || settings.gravity.to_bits() != self.settings.gravity.to_bits()
        {
            self.rebuild = true;
        } else if self.configured {
            // Already settled: apply on the next sync.
            self.configured = false;
            self.settle_remaining = 0.0;
        }
        self.settings = settings;
    }

    /// Advances the binding by `dt` seconds against `world`.
    pub fn sync(&mut self, world: &mut dyn PhysicsWorld, dt: f32) -> SyncEvent {
        if self.rebuild || self.body.is_none() {
            if let Some(old) = self.body.take() {
                world.remove_body(old);
            }
            world.set_gravity(Vec3::new(0.0, self.settings.gravity, 0.0));
            let mass = self.hull.mass(self.settings.density_multiplier);
            let body = world.create_convex_body(&self.hull, mass);
            log::debug!(
                "Physics body {:?}: {} hull points, mass {mass:.3}{}",
                body,
                self.hull.points.len(),
                if self.hull.low_fidelity { " (low fidelity)" } else { "" }
            );
            self.body = Some(body);
            self.rebuild = false;
            self.configured = false;
            self.settle_remaining = self.settings.settle_delay;
            return SyncEvent::Created(body);
        }

        let Some(body) = self.body else {
            return SyncEvent::Idle;
        };
        if self.configured {
            return SyncEvent::Idle;
        }

        self.settle_remaining -= dt.max(0.0);
        if self.settle_remaining > 0.0 {
            return SyncEvent::Idle;
        }

        let s = self.settings;
        world.set_restitution(body, s.restitution);
        world.set_damping(body, s.linear_damping, s.angular_damping);
        world.set_friction(body, s.friction);
        self.configured = true;
        SyncEvent::Configured(body)
    }

    /// Removes the body from `world`.
    pub fn detach(self, world: &mut dyn PhysicsWorld) {
        if let Some(body) = self.body {
            world.remove_body(body);
        }
    }
}
