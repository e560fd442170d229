//! The four cardinal sides, used to classify which way an object faces.

use array_map::{ArrayMap, Indexable};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;

/// One of the four cardinal sides.
///
/// Declared west, south, east, north; [`Side::ALL`] and [`Sides`] follow
/// this order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[derive(Indexable)]
pub enum Side {
    /// West.
    Left,
    /// South.
    Bot,
    /// East.
    Right,
    /// North.
    Top,
}

impl Side {
    /// Every side, west first, then counter-clockwise.
    pub const ALL: [Side; 4] = [Side::Left, Side::Bot, Side::Right, Side::Top];

    /// The side an object pointing at `angle` degrees faces.
    ///
    /// Each side owns the 90 degree sector centered on its cardinal
    /// direction, including the sector's clockwise edge: east is
    /// `[315, 45)`, north `[45, 135)`, west `[135, 225)` and south
    /// `[225, 315)`.
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Side::facing(0.), Side::Right);
    /// assert_eq!(Side::facing(-90.), Side::Bot);
    /// assert_eq!(Side::facing(45.), Side::Top);
    /// assert_eq!(Side::facing(180.), Side::Left);
    /// assert_eq!(Side::facing(314.9), Side::Bot);
    /// assert_eq!(Side::facing(315.), Side::Right);
    /// ```
    pub fn facing(angle: f64) -> Side {
        match crate::wrap_angle(angle) {
            a if (45. ..135.).contains(&a) => Side::Top,
            a if (135. ..225.).contains(&a) => Side::Left,
            a if (225. ..315.).contains(&a) => Side::Bot,
            _ => Side::Right,
        }
    }

    /// The axis running along this side's edge.
    ///
    /// West and east edges run vertically; south and north edges run horizontally.
    pub fn along(&self) -> Axis {
        match self {
            Side::Left | Side::Right => Axis::Y,
            Side::Bot | Side::Top => Axis::X,
        }
    }

    /// The axis perpendicular to this side's edge.
    pub fn across(&self) -> Axis {
        match self {
            Side::Left | Side::Right => Axis::X,
            Side::Bot | Side::Top => Axis::Y,
        }
    }
}

/// One value of type `T` per [`Side`].
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Sides<T> {
    inner: ArrayMap<Side, T, 4>,
}

impl<T: Clone> Sides<T> {
    /// Assigns a clone of `value` to every side.
    pub fn uniform_cloned(value: T) -> Self {
        Self {
            inner: ArrayMap::from_value(value),
        }
    }
}

impl<T> std::ops::Index<Side> for Sides<T> {
    type Output = T;
    fn index(&self, side: Side) -> &T {
        &self.inner[side]
    }
}

impl<T> std::ops::IndexMut<Side> for Sides<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        &mut self.inner[side]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_sectors_are_centered_on_cardinals() {
        for (side, center) in Side::ALL.into_iter().zip([180., 270., 0., 90.]) {
            for offset in [-45., -44.9, -10., 0., 10., 44.9] {
                assert_eq!(Side::facing(center + offset), side);
            }
            assert_ne!(Side::facing(center + 45.), side);
        }
    }

    #[test]
    fn sides_are_indexed_independently() {
        let mut sides = Sides::uniform_cloned(Vec::new());
        for (i, side) in Side::ALL.into_iter().enumerate() {
            sides[side].push(i);
        }
        assert_eq!(sides[Side::Bot], vec![1]);
        assert_eq!(sides[Side::Top], vec![3]);
    }
}
