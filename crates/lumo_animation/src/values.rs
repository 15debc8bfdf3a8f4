//! Animatable value types
//!
//! An animated value is either a single scalar (scale, opacity, rotation,
//! progress fraction) or a small (x, y) pair (translation). Transitions
//! operate component-wise, so both shapes share one solver.

use lumo_core::{Color, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal (for settling detection)
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

impl Interpolate for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(self, other, t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Color::lerp(self, other, t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.r - other.r).abs() < epsilon
            && (self.g - other.g).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
            && (self.a - other.a).abs() < epsilon
    }
}

/// The current reading of an animated value
///
/// In config files a scalar is written as a bare number and a pair as
/// `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimValue {
    Scalar(f32),
    Pair(Vec2),
}

/// Component storage used by the solvers (one or two lanes)
pub(crate) type Lanes = SmallVec<[f32; 2]>;

impl AnimValue {
    pub const fn pair(x: f32, y: f32) -> Self {
        AnimValue::Pair(Vec2::new(x, y))
    }

    /// Get the scalar reading, or the x component of a pair
    pub fn as_scalar(&self) -> f32 {
        match self {
            AnimValue::Scalar(v) => *v,
            AnimValue::Pair(p) => p.x,
        }
    }

    /// Get the pair reading, widening a scalar to `(v, v)`
    pub fn as_pair(&self) -> Vec2 {
        match self {
            AnimValue::Scalar(v) => Vec2::new(*v, *v),
            AnimValue::Pair(p) => *p,
        }
    }

    /// Whether two values have the same shape (scalar vs pair)
    pub fn same_shape(&self, other: &AnimValue) -> bool {
        matches!(
            (self, other),
            (AnimValue::Scalar(_), AnimValue::Scalar(_)) | (AnimValue::Pair(_), AnimValue::Pair(_))
        )
    }

    /// Coerce `self` to the shape of `like`
    ///
    /// Used when a transition target was written as a scalar but drives a pair
    /// (or the other way round), so a mismatched config never panics mid-tick.
    pub fn shaped_like(&self, like: &AnimValue) -> AnimValue {
        match like {
            AnimValue::Scalar(_) => AnimValue::Scalar(self.as_scalar()),
            AnimValue::Pair(_) => AnimValue::Pair(self.as_pair()),
        }
    }

    pub(crate) fn lanes(&self) -> Lanes {
        match self {
            AnimValue::Scalar(v) => smallvec::smallvec![*v],
            AnimValue::Pair(p) => smallvec::smallvec![p.x, p.y],
        }
    }

    pub(crate) fn from_lanes(lanes: &[f32], like: &AnimValue) -> AnimValue {
        match like {
            AnimValue::Scalar(_) => AnimValue::Scalar(lanes[0]),
            AnimValue::Pair(_) => AnimValue::Pair(Vec2::new(lanes[0], lanes[1])),
        }
    }

    /// Largest per-component distance to `other`
    pub fn distance(&self, other: &AnimValue) -> f32 {
        match (self, other) {
            (AnimValue::Scalar(a), AnimValue::Scalar(b)) => (a - b).abs(),
            _ => {
                let a = self.as_pair();
                let b = other.as_pair();
                (a.x - b.x).abs().max((a.y - b.y).abs())
            }
        }
    }
}

impl Interpolate for AnimValue {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        match (self, other) {
            (AnimValue::Scalar(a), AnimValue::Scalar(b)) => AnimValue::Scalar(a.lerp(b, t)),
            _ => AnimValue::Pair(self.as_pair().lerp(&other.as_pair(), t)),
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.distance(other) < epsilon
    }
}

impl From<f32> for AnimValue {
    fn from(v: f32) -> Self {
        AnimValue::Scalar(v)
    }
}

impl From<Vec2> for AnimValue {
    fn from(v: Vec2) -> Self {
        AnimValue::Pair(v)
    }
}

impl From<(f32, f32)> for AnimValue {
    fn from(v: (f32, f32)) -> Self {
        AnimValue::Pair(v.into())
    }
}
