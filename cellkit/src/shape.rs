//! Opaque geometry handles.
//!
//! Polygon storage belongs to an external geometry backend. Cells only hold
//! shared handles to backend data, tagged by layer, and never look inside
//! them.

use std::fmt::Debug;
use std::sync::Arc;

use downcast_rs::{impl_downcast, DowncastSync};
use geometry::transform::Transformation;

use crate::port::LayerId;

/// Backend-defined shape data.
pub trait ShapeData: DowncastSync + Debug {}
impl_downcast!(sync ShapeData);

impl<T: Debug + Send + Sync + 'static> ShapeData for T {}

/// A shared handle to backend shape data.
#[derive(Debug, Clone)]
pub struct ShapeHandle(Arc<dyn ShapeData>);

impl ShapeHandle {
    /// Wraps backend data in a handle.
    pub fn new<T: ShapeData>(data: T) -> Self {
        Self(Arc::new(data))
    }

    /// Returns the underlying data if it has type `T`.
    pub fn downcast_ref<T: ShapeData>(&self) -> Option<&T> {
        self.0.as_ref().downcast_ref::<T>()
    }

    /// Returns `true` if both handles point to the same data.
    pub fn ptr_eq(&self, other: &ShapeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A shape on a layer, local to a cell.
#[derive(Debug, Clone)]
pub struct Shape {
    layer: LayerId,
    handle: ShapeHandle,
}

impl Shape {
    /// Creates a new layout shape.
    pub fn new(layer: impl Into<LayerId>, handle: ShapeHandle) -> Self {
        Self {
            layer: layer.into(),
            handle,
        }
    }

    /// Returns the layer that this shape is on.
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Returns the backend handle of this shape.
    pub fn handle(&self) -> &ShapeHandle {
        &self.handle
    }
}

/// A shape together with the transformation that places it in a top cell.
#[derive(Debug, Clone)]
pub struct FlatShape {
    /// The shape.
    pub shape: Shape,
    /// The accumulated transformation from the shape's cell to the top cell.
    pub transformation: Transformation,
}
