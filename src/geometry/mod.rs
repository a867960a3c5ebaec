//! # Geometric Primitives
//!
//! Planar and Cartesian vectors are `glam`'s double precision types:
//!
//! - [`DVec2`] - flattened tracks (meters on a tangent plane)
//! - [`DVec3`] - points on or around the sphere
//!
//! Clustering, indexing and the representative sweep are written once against
//! the [`Coordinates`] trait, which both types implement.
//!
//! - [`Segment`] - a directed segment with perpendicular/parallel/angular distances
//! - [`sphere`] - spherical conversions and the tangent-plane [`LocalFrame`]

pub mod segment;
pub mod sphere;

pub use glam::{DQuat, DVec2, DVec3};
pub use segment::{DistanceComponents, PerpendicularFoot, Segment};
pub use sphere::{angle_between, great_circle_midpoint, LocalFrame, EARTH_RADIUS};

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// Tolerance used for degenerate-length checks.
pub const GEOMETRY_EPSILON: f64 = 1e-12;

/// Fixed-dimension `f64` vector the generic algorithms operate on.
///
/// Method names follow `glam`, so concrete code and generic code read the same.
pub trait Coordinates:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
{
    /// Envelope corner type stored in the R-tree.
    type Corner: rstar::Point<Scalar = f64>;
    /// Rotation mapping a direction onto the x axis.
    type Rotation: Copy + Debug;

    const ZERO: Self;

    /// All components equal to `v`.
    fn splat(v: f64) -> Self;
    fn dot(self, rhs: Self) -> f64;
    fn length_squared(self) -> f64;
    fn try_normalize(self) -> Option<Self>;
    fn lerp(self, rhs: Self, s: f64) -> Self;
    /// Component-wise minimum.
    fn min(self, rhs: Self) -> Self;
    /// Component-wise maximum.
    fn max(self, rhs: Self) -> Self;
    fn abs_diff_eq(self, rhs: Self, max_abs_diff: f64) -> bool;
    fn is_finite(self) -> bool;
    fn corner(self) -> Self::Corner;
    /// Coordinate along the x axis.
    fn x(self) -> f64;

    /// Rotation taking `direction` onto +x, `None` for a zero direction.
    fn rotation_onto_x(direction: Self) -> Option<Self::Rotation>;
    /// Apply a rotation from [`rotation_onto_x`](Self::rotation_onto_x).
    fn rotate_onto_x(rotation: &Self::Rotation, v: Self) -> Self;
    /// Inverse of [`rotate_onto_x`](Self::rotate_onto_x).
    fn rotate_from_x(rotation: &Self::Rotation, v: Self) -> Self;

    fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    fn distance(self, rhs: Self) -> f64 {
        (self - rhs).length()
    }
}

impl Coordinates for DVec2 {
    type Corner = [f64; 2];
    /// Unit direction; rotating by its conjugate maps it onto +x.
    type Rotation = DVec2;

    const ZERO: Self = DVec2::ZERO;

    fn splat(v: f64) -> Self {
        DVec2::splat(v)
    }

    fn dot(self, rhs: Self) -> f64 {
        DVec2::dot(self, rhs)
    }

    fn length_squared(self) -> f64 {
        DVec2::length_squared(self)
    }

    fn try_normalize(self) -> Option<Self> {
        DVec2::try_normalize(self)
    }

    fn lerp(self, rhs: Self, s: f64) -> Self {
        DVec2::lerp(self, rhs, s)
    }

    fn min(self, rhs: Self) -> Self {
        DVec2::min(self, rhs)
    }

    fn max(self, rhs: Self) -> Self {
        DVec2::max(self, rhs)
    }

    fn abs_diff_eq(self, rhs: Self, max_abs_diff: f64) -> bool {
        DVec2::abs_diff_eq(self, rhs, max_abs_diff)
    }

    fn is_finite(self) -> bool {
        DVec2::is_finite(self)
    }

    fn corner(self) -> [f64; 2] {
        self.to_array()
    }

    fn x(self) -> f64 {
        self.x
    }

    fn rotation_onto_x(direction: Self) -> Option<DVec2> {
        DVec2::try_normalize(direction)
    }

    fn rotate_onto_x(rotation: &DVec2, v: Self) -> Self {
        DVec2::new(rotation.x, -rotation.y).rotate(v)
    }

    fn rotate_from_x(rotation: &DVec2, v: Self) -> Self {
        rotation.rotate(v)
    }
}

impl Coordinates for DVec3 {
    type Corner = [f64; 3];
    type Rotation = DQuat;

    const ZERO: Self = DVec3::ZERO;

    fn splat(v: f64) -> Self {
        DVec3::splat(v)
    }

    fn dot(self, rhs: Self) -> f64 {
        DVec3::dot(self, rhs)
    }

    fn length_squared(self) -> f64 {
        DVec3::length_squared(self)
    }

    fn try_normalize(self) -> Option<Self> {
        DVec3::try_normalize(self)
    }

    fn lerp(self, rhs: Self, s: f64) -> Self {
        DVec3::lerp(self, rhs, s)
    }

    fn min(self, rhs: Self) -> Self {
        DVec3::min(self, rhs)
    }

    fn max(self, rhs: Self) -> Self {
        DVec3::max(self, rhs)
    }

    fn abs_diff_eq(self, rhs: Self, max_abs_diff: f64) -> bool {
        DVec3::abs_diff_eq(self, rhs, max_abs_diff)
    }

    fn is_finite(self) -> bool {
        DVec3::is_finite(self)
    }

    fn corner(self) -> [f64; 3] {
        self.to_array()
    }

    fn x(self) -> f64 {
        self.x
    }

    fn rotation_onto_x(direction: Self) -> Option<DQuat> {
        let unit = DVec3::try_normalize(direction)?;
        Some(DQuat::from_rotation_arc(unit, DVec3::X))
    }

    fn rotate_onto_x(rotation: &DQuat, v: Self) -> Self {
        *rotation * v
    }

    fn rotate_from_x(rotation: &DQuat, v: Self) -> Self {
        rotation.inverse() * v
    }
}

/// Mean of a set of vectors (`None` when empty).
pub fn mean<'a, P, I>(vectors: I) -> Option<P>
where
    P: Coordinates + 'a,
    I: IntoIterator<Item = &'a P>,
{
    let mut sum = P::ZERO;
    let mut count = 0usize;
    for v in vectors {
        sum += *v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}
