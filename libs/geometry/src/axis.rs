//! The two coordinate axes.

use serde::{Deserialize, Serialize};

/// A coordinate axis of the plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Axis {
    /// The x-axis.
    X,
    /// The y-axis.
    Y,
}
