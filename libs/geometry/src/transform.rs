//! Rigid transformations of the plane.

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::wrap_angle;

/// An optional reflection about the x-axis, followed by a counter-clockwise
/// rotation, followed by a translation.
///
/// Stored as `p' = m * p + offset`. `m` is always orthogonal, so
/// transformations never scale geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// Row-major linear part.
    m: [[f64; 2]; 2],
    offset: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// Leaves every point where it is.
    pub fn identity() -> Self {
        Self::from_opts(Point::zero(), false, 0.)
    }

    /// Shifts by `(x, y)`.
    pub fn translate(x: f64, y: f64) -> Self {
        Self::from_opts(Point::new(x, y), false, 0.)
    }

    /// Rotates counter-clockwise about the origin by `angle` degrees.
    pub fn rotate(angle: f64) -> Self {
        Self::from_opts(Point::zero(), false, angle)
    }

    /// Mirrors about the x-axis.
    pub fn reflect_vert() -> Self {
        Self::from_opts(Point::zero(), true, 0.)
    }

    /// Reflects about the x-axis if `reflect_vert` is set, then rotates by
    /// `angle` degrees, then shifts by `offset`.
    pub fn from_opts(offset: Point, reflect_vert: bool, angle: f64) -> Self {
        let (sin, cos) = sin_cos_deg(angle);
        // Reflection negates the second column of the rotation.
        let flip = if reflect_vert { -1. } else { 1. };
        Self {
            m: [[cos, -sin * flip], [sin, cos * flip]],
            offset,
        }
    }

    /// Composes two transformations: `child` is applied first, then `parent`.
    ///
    /// This is how an instance nested inside another instance maps into the
    /// coordinates of the outer cell. The operation is not commutative.
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let nested = Transformation::cascade(
    ///     Transformation::reflect_vert(),
    ///     Transformation::translate(1., 1.),
    /// );
    /// assert_eq!(Point::new(1., 1.).transform(nested), Point::new(2., -2.));
    /// ```
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        let [[a, b], [c, d]] = parent.m;
        let [[e, f], [g, h]] = child.m;
        Self {
            m: [[a * e + b * g, a * f + b * h], [c * e + d * g, c * f + d * h]],
            offset: parent.apply(child.offset),
        }
    }

    /// The image of the origin.
    pub fn offset_point(&self) -> Point {
        self.offset
    }

    /// Returns `true` if this transformation mirrors geometry.
    pub fn is_reflected(&self) -> bool {
        let [[a, b], [c, d]] = self.m;
        a * d - b * c < 0.
    }

    /// The rotation component in degrees, in `[0, 360)`.
    ///
    /// The x unit vector is unaffected by the reflection, so its image gives the angle.
    pub fn rotation(&self) -> f64 {
        atan2_deg(self.m[1][0], self.m[0][0])
    }

    /// Maps `p` through this transformation.
    pub fn apply(&self, p: Point) -> Point {
        let [[a, b], [c, d]] = self.m;
        Point::new(
            a * p.x + b * p.y + self.offset.x,
            c * p.x + d * p.y + self.offset.y,
        )
    }

    /// Maps a direction angle (in degrees) through this transformation.
    ///
    /// Translation does not affect directions. The result is wrapped to `[0, 360)`.
    ///
    /// ```
    /// use geometry::transform::Transformation;
    /// use approx::assert_abs_diff_eq;
    ///
    /// let trans = Transformation::rotate(90.);
    /// assert_abs_diff_eq!(trans.transform_angle(180.), 270., epsilon = 1e-9);
    ///
    /// let trans = Transformation::reflect_vert();
    /// assert_abs_diff_eq!(trans.transform_angle(90.), 270., epsilon = 1e-9);
    /// ```
    pub fn transform_angle(&self, angle: f64) -> f64 {
        if self.is_reflected() {
            wrap_angle(self.rotation() - angle)
        } else {
            wrap_angle(self.rotation() + angle)
        }
    }

    fn components(&self) -> [f64; 6] {
        let [[a, b], [c, d]] = self.m;
        [a, b, c, d, self.offset.x, self.offset.y]
    }
}

impl AbsDiffEq for Transformation {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.components()
            .iter()
            .zip(other.components())
            .all(|(x, y)| x.abs_diff_eq(&y, epsilon))
    }
}

impl RelativeEq for Transformation {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.components()
            .iter()
            .zip(other.components())
            .all(|(x, y)| x.relative_eq(&y, epsilon, max_relative))
    }
}

/// Sine and cosine of an angle in degrees, exact at multiples of 90.
fn sin_cos_deg(angle: f64) -> (f64, f64) {
    match wrap_angle(angle) {
        a if a == 0. => (0., 1.),
        a if a == 90. => (1., 0.),
        a if a == 180. => (0., -1.),
        a if a == 270. => (-1., 0.),
        a => a.to_radians().sin_cos(),
    }
}

/// The direction of `(x, y)` in degrees, in `[0, 360)`, exact on the axes.
fn atan2_deg(y: f64, x: f64) -> f64 {
    match (x == 0., y == 0.) {
        (false, true) if x > 0. => 0.,
        (false, true) => 180.,
        (true, false) if y > 0. => 90.,
        (true, false) => 270.,
        _ => wrap_angle(y.atan2(x).to_degrees()),
    }
}

/// Mutation of an object by a [`Transformation`].
pub trait TransformMut {
    /// Applies `trans` in place.
    fn transform_mut(&mut self, trans: Transformation);
}

/// By-value counterpart of [`TransformMut`], implemented for every [`TransformMut`] type.
pub trait Transform: TransformMut + Sized {
    /// Returns `self` with `trans` applied.
    #[inline]
    fn transform(mut self, trans: Transformation) -> Self {
        self.transform_mut(trans);
        self
    }
}

impl<T: TransformMut + Sized> Transform for T {}
