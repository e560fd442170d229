//! Oriented connection points.

use std::fmt::Display;

use arcstr::ArcStr;
use geometry::prelude::*;
use geometry::{angles_eq, wrap_angle};
use serde::{Deserialize, Serialize};

use crate::error::PortMismatch;

/// A layer identifier, as a (layer, datatype) pair.
#[derive(
    Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LayerId(pub u16, pub u16);

impl LayerId {
    /// Creates a new [`LayerId`].
    pub const fn new(layer: u16, datatype: u16) -> Self {
        Self(layer, datatype)
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

impl From<(u16, u16)> for LayerId {
    fn from(value: (u16, u16)) -> Self {
        Self(value.0, value.1)
    }
}

/// The identifier of a waveguide or wire cross section.
///
/// Ports may only be connected if their cross sections match.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrossSection(ArcStr);

impl CrossSection {
    /// Creates a new [`CrossSection`] with the given name.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    /// The name of the cross section.
    pub fn name(&self) -> &ArcStr {
        &self.0
    }
}

impl Default for CrossSection {
    fn default() -> Self {
        Self(arcstr::literal!("strip"))
    }
}

impl Display for CrossSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, oriented connection point on a cell boundary.
///
/// The orientation is the outward-facing direction of the port in degrees,
/// counter-clockwise from the positive x-axis, always stored in `[0, 360)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    name: ArcStr,
    center: Point,
    orientation: f64,
    width: f64,
    layer: LayerId,
    cross_section: CrossSection,
}

impl Port {
    /// Creates a new port on the default layer and cross section.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cellkit::port::Port;
    /// let port = Port::new("o1", (0., 0.), -90., 0.5);
    /// assert_eq!(port.orientation(), 270.);
    /// ```
    pub fn new(name: impl Into<ArcStr>, center: impl Into<Point>, orientation: f64, width: f64) -> Self {
        Self {
            name: name.into(),
            center: center.into(),
            orientation: wrap_angle(orientation),
            width,
            layer: LayerId::default(),
            cross_section: CrossSection::default(),
        }
    }

    /// Returns a copy of this port with the given name.
    pub fn with_name(self, name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Returns a copy of this port with the given width.
    pub fn with_width(self, width: f64) -> Self {
        Self { width, ..self }
    }

    /// Returns a copy of this port on the given layer.
    pub fn with_layer(self, layer: impl Into<LayerId>) -> Self {
        Self {
            layer: layer.into(),
            ..self
        }
    }

    /// Returns a copy of this port with the given cross section.
    pub fn with_cross_section(self, cross_section: CrossSection) -> Self {
        Self {
            cross_section,
            ..self
        }
    }

    /// The name of the port.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The center of the port.
    #[inline]
    pub fn center(&self) -> Point {
        self.center
    }

    /// The outward-facing direction in degrees, in `[0, 360)`.
    #[inline]
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// The width of the port.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The layer of the port.
    #[inline]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// The cross section of the port.
    #[inline]
    pub fn cross_section(&self) -> &CrossSection {
        &self.cross_section
    }

    /// The side of a cell this port faces.
    pub fn facing(&self) -> Side {
        Side::facing(self.orientation)
    }

    /// Checks whether `self` may be connected to `anchor`.
    pub fn check_compatible(&self, anchor: &Port, tolerance: f64) -> Result<(), PortMismatch> {
        if (self.width - anchor.width).abs() > tolerance {
            return Err(PortMismatch::Width {
                port: self.width,
                anchor: anchor.width,
            });
        }
        if self.cross_section != anchor.cross_section {
            return Err(PortMismatch::CrossSection {
                port: self.cross_section.name().clone(),
                anchor: anchor.cross_section.name().clone(),
            });
        }
        Ok(())
    }

    /// Returns `true` if `self` sits on `other` and faces the opposite way,
    /// within `tolerance`.
    pub fn is_mated_to(&self, other: &Port, tolerance: f64) -> bool {
        self.center.distance(other.center) <= tolerance
            && angles_eq(self.orientation, other.orientation + 180., tolerance)
    }
}

impl TransformMut for Port {
    fn transform_mut(&mut self, trans: Transformation) {
        self.center.transform_mut(trans);
        self.orientation = trans.transform_angle(self.orientation);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn orientation_is_normalized() {
        assert_eq!(Port::new("a", (0., 0.), 360., 1.).orientation(), 0.);
        assert_eq!(Port::new("a", (0., 0.), -180., 1.).orientation(), 180.);
        assert_eq!(Port::new("a", (0., 0.), 450., 1.).orientation(), 90.);
    }

    #[test]
    fn transform_moves_center_and_direction() {
        let port = Port::new("o1", (1., 0.), 0., 0.5);
        let moved = port.transform(Transformation::from_opts(Point::new(2., 3.), false, 90.));
        assert_abs_diff_eq!(moved.center(), Point::new(2., 4.), epsilon = 1e-12);
        assert_abs_diff_eq!(moved.orientation(), 90., epsilon = 1e-12);
        assert_eq!(moved.facing(), Side::Top);
        assert_eq!(moved.width(), 0.5);
    }

    #[test]
    fn reflection_flips_direction() {
        let port = Port::new("o1", (0., 1.), 30., 0.5);
        let moved = port.transform(Transformation::reflect_vert());
        assert_abs_diff_eq!(moved.center(), Point::new(0., -1.), epsilon = 1e-12);
        assert_abs_diff_eq!(moved.orientation(), 330., epsilon = 1e-12);
    }

    #[test]
    fn compatibility() {
        let a = Port::new("a", (0., 0.), 0., 0.5);
        assert!(a.check_compatible(&a.clone().with_name("b"), 1e-9).is_ok());
        assert_eq!(
            a.check_compatible(&Port::new("b", (0., 0.), 0., 3.), 1e-9),
            Err(PortMismatch::Width {
                port: 0.5,
                anchor: 3.
            })
        );
        let rib = a.clone().with_cross_section(CrossSection::new("rib"));
        assert!(matches!(
            a.check_compatible(&rib, 1e-9),
            Err(PortMismatch::CrossSection { .. })
        ));
        // Layers do not take part in compatibility.
        assert!(a.check_compatible(&a.clone().with_layer((2, 0)), 1e-9).is_ok());
    }
}
