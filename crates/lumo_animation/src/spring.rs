//! Spring physics
//!
//! RK4-integrated damped harmonic oscillator. A spring is considered settled
//! only after its displacement and velocity stay under tolerance for
//! [`SETTLE_FRAMES`] consecutive steps, so a single quiet frame at the turning
//! point of an oscillation doesn't end the animation early.

use serde::{Deserialize, Serialize};

/// Consecutive at-rest steps required before a spring reports settled
pub const SETTLE_FRAMES: u32 = 3;

/// Rest displacement tolerance per unit of travel
///
/// The effective tolerance is `REST_DISPLACEMENT * max(1, |travel|)`, so a
/// scale spring (travel 0.1) settles within 0.001 and a 360° rotation
/// within 0.36°.
pub const REST_DISPLACEMENT: f32 = 1e-3;

/// Rest velocity tolerance, as a multiple of the displacement tolerance (per second)
pub const REST_VELOCITY_FACTOR: f32 = 10.0;

/// Largest integration step; longer frames are sub-stepped
const MAX_SUBSTEP: f32 = 1.0 / 120.0;

/// Fastest decay or oscillation rate (1/s) a sanitized spring may have
///
/// Bounds the number of RK4 sub-steps needed to keep `h * rate <= 1`.
pub const MAX_RATE: f32 = 5000.0;

pub const MIN_STIFFNESS: f32 = 1.0;
pub const MIN_DAMPING: f32 = 1.0;
pub const MIN_MASS: f32 = 0.01;

/// Configuration for a spring transition
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Slow and soft, for entrance transitions
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// Visible overshoot, for playful feedback
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// Quick with a hint of overshoot, for press feedback
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// Very quick with minimal oscillation
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }

    /// Upper bound on the magnitude of the system's eigenvalues (1/s)
    fn stiffest_rate(&self) -> f32 {
        self.damping / self.mass + (self.stiffness / self.mass).sqrt()
    }

    /// Clamp degenerate parameters so the spring always settles
    ///
    /// Zero stiffness never pulls toward the target, zero damping never loses
    /// energy, and zero mass divides by zero. Mass is also raised until
    /// `damping / mass` and `sqrt(stiffness / mass)` stay under [`MAX_RATE`].
    pub fn sanitized(self) -> Self {
        let stiffness = clamp_min(self.stiffness, MIN_STIFFNESS);
        let damping = clamp_min(self.damping, MIN_DAMPING);
        let mass = clamp_min(self.mass, MIN_MASS)
            .max(damping / MAX_RATE)
            .max(stiffness / (MAX_RATE * MAX_RATE));
        let clamped = Self {
            stiffness,
            damping,
            mass,
        };
        if clamped != self {
            tracing::warn!(
                "SpringConfig: clamped degenerate parameters {:?} -> {:?}",
                self,
                clamped
            );
        }
        clamped
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

fn clamp_min(v: f32, min: f32) -> f32 {
    if v.is_finite() {
        v.max(min)
    } else {
        min
    }
}

/// A single-lane spring animator
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    tolerance: f32,
    rest_frames: u32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config: config.sanitized(),
            value: initial,
            velocity: 0.0,
            target: initial,
            tolerance: REST_DISPLACEMENT,
            rest_frames: 0,
        }
    }

    /// Start with an inherited velocity (units per second)
    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Set a new target, keeping the current velocity
    pub fn set_target(&mut self, target: f32) {
        self.tolerance = REST_DISPLACEMENT * (target - self.value).abs().max(1.0);
        self.target = target;
        self.rest_frames = 0;
    }

    /// Within tolerance on this step (not yet necessarily settled)
    fn is_at_rest(&self) -> bool {
        (self.value - self.target).abs() < self.tolerance
            && self.velocity.abs() < self.tolerance * REST_VELOCITY_FACTOR
    }

    /// At rest for [`SETTLE_FRAMES`] consecutive steps
    pub fn is_settled(&self) -> bool {
        self.rest_frames >= SETTLE_FRAMES
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            return;
        }

        let dt = dt.max(0.0);
        let max_h = MAX_SUBSTEP.min(1.0 / self.config.stiffest_rate());
        let substeps = (dt / max_h).ceil().max(1.0) as u32;
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.integrate(h);
        }

        if !self.value.is_finite() || !self.velocity.is_finite() {
            tracing::warn!(
                "Spring: diverged with {:?}, snapping to target {}",
                self.config,
                self.target
            );
            self.value = self.target;
            self.velocity = 0.0;
            self.rest_frames = SETTLE_FRAMES;
            return;
        }

        if self.is_at_rest() {
            self.rest_frames += 1;
            if self.is_settled() {
                self.value = self.target;
                self.velocity = 0.0;
            }
        } else {
            self.rest_frames = 0;
        }
    }

    fn integrate(&mut self, dt: f32) {
        let k1_v = self.acceleration(self.value, self.velocity);
        let k1_x = self.velocity;

        let k2_v = self.acceleration(
            self.value + k1_x * dt * 0.5,
            self.velocity + k1_v * dt * 0.5,
        );
        let k2_x = self.velocity + k1_v * dt * 0.5;

        let k3_v = self.acceleration(
            self.value + k2_x * dt * 0.5,
            self.velocity + k2_v * dt * 0.5,
        );
        let k3_x = self.velocity + k2_v * dt * 0.5;

        let k4_v = self.acceleration(self.value + k3_x * dt, self.velocity + k3_v * dt);
        let k4_x = self.velocity + k3_v * dt;

        self.velocity += (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * dt / 6.0;
        self.value += (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * dt / 6.0;
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        let spring_force = -self.config.stiffness * (x - self.target);
        let damping_force = -self.config.damping * v;
        (spring_force + damping_force) / self.config.mass
    }
}
