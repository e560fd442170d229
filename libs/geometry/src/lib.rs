//! Floating-point 2-D geometry for composing hierarchical layouts.
//!
//! Positions are real-valued and rotations may take any angle, so mated
//! ports land exactly (to floating point tolerance) on their anchors.
//!
//! # Examples
//!
//! Rotate a [point](crate::point::Point) about the origin:
//!
//! ```
//! # use geometry::prelude::*;
//! # use approx::assert_relative_eq;
//! let p = Point::new(1., 0.).transform(Transformation::rotate(90.));
//! assert_relative_eq!(p, Point::new(0., 1.), epsilon = 1e-12);
//! ```
#![warn(missing_docs)]

extern crate self as geometry;

pub mod axis;
pub mod point;
pub mod prelude;
pub mod side;
pub mod transform;

/// Wraps the given angle to the interval `[0, 360)` degrees.
///
/// # Examples
///
/// ```
/// use geometry::wrap_angle;
///
/// assert_eq!(wrap_angle(10.), 10.);
/// assert_eq!(wrap_angle(-10.), 350.);
/// assert_eq!(wrap_angle(-740.), 340.);
/// assert_eq!(wrap_angle(-359.), 1.);
/// assert_eq!(wrap_angle(-1.), 359.);
/// assert_eq!(wrap_angle(725.), 5.);
/// assert_eq!(wrap_angle(360.), 0.);
/// assert_eq!(wrap_angle(-360.), 0.);
/// ```
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = ((angle % 360.) + 360.) % 360.;
    // `-1e-14 % 360. + 360.` rounds to exactly 360.
    if wrapped >= 360. {
        0.
    } else {
        wrapped
    }
}

/// Returns `true` if two angles (in degrees) describe the same direction
/// within `tol` degrees.
///
/// # Examples
///
/// ```
/// use geometry::angles_eq;
///
/// assert!(angles_eq(0., 360., 1e-9));
/// assert!(angles_eq(-90., 270., 1e-9));
/// assert!(angles_eq(359.9999999999, 0., 1e-9));
/// assert!(!angles_eq(0., 180., 1e-9));
/// ```
pub fn angles_eq(a: f64, b: f64, tol: f64) -> bool {
    let diff = wrap_angle(a - b);
    diff <= tol || 360. - diff <= tol
}
