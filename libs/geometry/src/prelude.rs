//! An import prelude that re-exports commonly used items.

pub use crate::axis::Axis;
pub use crate::point::Point;
pub use crate::side::{Side, Sides};
pub use crate::transform::{Transform, TransformMut, Transformation};
