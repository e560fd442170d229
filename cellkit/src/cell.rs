//! Immutable hierarchical cells and the builder used to construct them.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::params::Signature;
use crate::port::{LayerId, Port};
use crate::shape::{FlatShape, Shape, ShapeHandle};

/// The metadata key holding the number of components in a composite cell.
pub const COMPONENT_COUNT: &str = "component_count";

/// The metadata key holding the name of the cell a composite was derived from.
pub const PARENT_NAME: &str = "parent_name";

/// A metadata value attached to a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(ArcStr),
}

impl MetaValue {
    /// Returns the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&ArcStr> {
        match self {
            MetaValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Bool(v) => write!(f, "{v}"),
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<ArcStr> for MetaValue {
    fn from(value: ArcStr) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

/// An identifier for an instance within the cell being built.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    /// The position of the instance in its parent's instance list.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A placement of a shared child cell.
#[derive(Debug, Clone)]
pub struct Instance {
    cell: Arc<Cell>,
    transformation: Transformation,
}

impl Instance {
    /// Creates a new instance of `cell`.
    pub fn new(cell: Arc<Cell>, transformation: Transformation) -> Self {
        Self {
            cell,
            transformation,
        }
    }

    /// The instantiated cell.
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// The transformation from the child's coordinates to the parent's.
    pub fn transformation(&self) -> Transformation {
        self.transformation
    }

    /// Returns the named port of the child, in parent coordinates.
    pub fn port(&self, name: &str) -> Result<Port> {
        Ok(self.cell.port(name)?.clone().transform(self.transformation))
    }

    /// Returns all ports of the child, in parent coordinates.
    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.cell
            .ports()
            .map(|port| port.clone().transform(self.transformation))
    }
}

/// A frozen layout cell.
///
/// Cells are only created by a [`Context`] and are never modified
/// afterwards. Further composition places them as instances in a new cell.
#[derive(Debug)]
pub struct Cell {
    name: ArcStr,
    signature: Signature,
    ports: IndexMap<ArcStr, Port>,
    instances: Vec<Instance>,
    shapes: Vec<Shape>,
    metadata: IndexMap<ArcStr, MetaValue>,
}

impl Cell {
    /// The name of the cell.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The signature this cell was built from.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The ports of the cell, in order.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// The port names of the cell, in order.
    pub fn port_names(&self) -> impl Iterator<Item = &ArcStr> {
        self.ports.keys()
    }

    /// Returns the named port.
    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| Error::PortNotFound {
            cell: self.name.clone(),
            port: name.into(),
        })
    }

    /// Returns `true` if the cell has a port with the given name.
    pub fn has_port(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// The child instances of the cell.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The shapes drawn directly in this cell.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// All cell metadata.
    pub fn metadata(&self) -> &IndexMap<ArcStr, MetaValue> {
        &self.metadata
    }

    /// Gets a metadata value.
    pub fn info(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// The name of the cell this one was derived from, or its own name.
    pub fn parent_name(&self) -> ArcStr {
        self.info(PARENT_NAME)
            .and_then(MetaValue::as_str)
            .cloned()
            .unwrap_or_else(|| self.name.clone())
    }

    /// Every shape in the hierarchy, with the transformation into this cell.
    ///
    /// Shapes are listed depth-first: a cell's own shapes precede those of its instances.
    pub fn flat_shapes(&self) -> Vec<FlatShape> {
        let mut out = Vec::new();
        self.collect_shapes(Transformation::identity(), &mut out);
        out
    }

    fn collect_shapes(&self, trans: Transformation, out: &mut Vec<FlatShape>) {
        out.extend(self.shapes.iter().map(|shape| FlatShape {
            shape: shape.clone(),
            transformation: trans,
        }));
        for inst in self.instances.iter() {
            inst.cell
                .collect_shapes(Transformation::cascade(trans, inst.transformation), out);
        }
    }

    /// Every shape in the hierarchy, grouped by layer.
    pub fn shapes_by_layer(&self) -> BTreeMap<LayerId, Vec<FlatShape>> {
        let mut out: BTreeMap<LayerId, Vec<FlatShape>> = BTreeMap::new();
        for shape in self.flat_shapes() {
            out.entry(shape.shape.layer()).or_default().push(shape);
        }
        out
    }
}

/// A cell under construction.
///
/// Handed to builder functions by the [`Context`]; frozen into a [`Cell`]
/// when the builder returns successfully.
pub struct CellBuilder {
    ctx: Context,
    name: ArcStr,
    pub(crate) ports: IndexMap<ArcStr, Port>,
    instances: Vec<Instance>,
    shapes: Vec<Shape>,
    metadata: IndexMap<ArcStr, MetaValue>,
}

impl CellBuilder {
    pub(crate) fn new(ctx: Context, name: ArcStr) -> Self {
        Self {
            ctx,
            name,
            ports: IndexMap::new(),
            instances: Vec::new(),
            shapes: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    /// The context this cell is being built in.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// The name the finished cell will have.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds a port to the cell.
    pub fn add_port(&mut self, port: Port) -> Result<()> {
        if self.ports.contains_key(port.name()) {
            return Err(Error::PortNameCollision(port.name().clone()));
        }
        self.ports.insert(port.name().clone(), port);
        Ok(())
    }

    /// Returns the named port of the cell.
    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| Error::PortNotFound {
            cell: self.name.clone(),
            port: name.into(),
        })
    }

    /// The ports added so far, in order.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Places `cell` with the given transformation.
    pub fn place(&mut self, cell: Arc<Cell>, transformation: Transformation) -> InstanceId {
        let id = InstanceId(self.instances.len());
        self.instances.push(Instance::new(cell, transformation));
        id
    }

    /// Returns a placed instance.
    pub fn instance(&self, id: InstanceId) -> Result<&Instance> {
        self.instances
            .get(id.0)
            .ok_or(Error::InstanceNotFound(id.0))
    }

    /// The instances placed so far.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Draws a backend shape on the given layer.
    pub fn add_shape(&mut self, layer: impl Into<LayerId>, handle: ShapeHandle) {
        self.shapes.push(Shape::new(layer, handle));
    }

    /// Sets a metadata value.
    pub fn set_info(&mut self, key: impl Into<ArcStr>, value: impl Into<MetaValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Gets a metadata value.
    pub fn info(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// Copies all metadata of `child` into this cell, overwriting existing keys.
    pub fn copy_child_info(&mut self, child: &Cell) {
        for (k, v) in child.metadata.iter() {
            self.metadata.insert(k.clone(), v.clone());
        }
    }

    pub(crate) fn finish(self, signature: Signature) -> Cell {
        Cell {
            name: self.name,
            signature,
            ports: self.ports,
            instances: self.instances,
            shapes: self.shapes,
            metadata: self.metadata,
        }
    }
}
