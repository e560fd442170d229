//! Builder parameters and canonical cell signatures.

use std::collections::BTreeMap;
use std::fmt::{Display, Write};
use std::sync::Arc;

use arcstr::ArcStr;

use crate::cell::Cell;
use crate::error::{Error, Result};

/// A single builder parameter value.
#[derive(Debug, Clone)]
pub enum Param {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number. Must be finite to take part in a signature.
    Float(f64),
    /// A string.
    Str(ArcStr),
    /// An ordered list of values.
    List(Vec<Param>),
    /// A nested parameter map.
    Map(Params),
    /// A reference to another cell.
    Spec(Spec),
}

macro_rules! impl_param_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Param {
                fn from(value: $t) -> Self {
                    Param::$variant(value.into())
                }
            }
        )*
    };
}

impl_param_from!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    ArcStr => Str,
    &str => Str,
    String => Str,
    Vec<Param> => List,
    Params => Map,
    Spec => Spec,
);

impl From<usize> for Param {
    fn from(value: usize) -> Self {
        Param::Int(value as i64)
    }
}

impl From<Arc<Cell>> for Param {
    fn from(value: Arc<Cell>) -> Self {
        Param::Spec(Spec::Direct(value))
    }
}

/// A description of a cell: either a recipe or a finished cell.
#[derive(Debug, Clone)]
pub enum Spec {
    /// A registered builder and the parameters to call it with.
    Factory {
        /// The builder identifier.
        id: ArcStr,
        /// The builder parameters.
        params: Params,
    },
    /// An already-built cell.
    Direct(Arc<Cell>),
}

impl Spec {
    /// Creates a [`Spec::Factory`].
    pub fn factory(id: impl Into<ArcStr>, params: Params) -> Self {
        Spec::Factory {
            id: id.into(),
            params,
        }
    }
}

impl From<Arc<Cell>> for Spec {
    fn from(value: Arc<Cell>) -> Self {
        Spec::Direct(value)
    }
}

/// A map of builder parameters.
///
/// Keys are kept sorted, so insertion order never affects a signature.
#[derive(Debug, Clone, Default)]
pub struct Params(BTreeMap<ArcStr, Param>);

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated map.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cellkit::params::Params;
    /// let params = Params::new().with("length", 10.).with("npoints", 2);
    /// assert_eq!(params.float("length").unwrap(), 10.);
    /// ```
    pub fn with(mut self, key: impl Into<ArcStr>, value: impl Into<Param>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<ArcStr>, value: impl Into<Param>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a parameter.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.0.get(key)
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &Param)> {
        self.0.iter()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn require(&self, key: &str) -> Result<&Param> {
        self.get(key).ok_or_else(|| Error::Param {
            key: key.into(),
            reason: arcstr::literal!("missing"),
        })
    }

    /// Gets a required integer parameter.
    pub fn int(&self, key: &str) -> Result<i64> {
        match self.require(key)? {
            Param::Int(v) => Ok(*v),
            other => Err(type_error(key, "an integer", other)),
        }
    }

    /// Gets a required floating point parameter. Integers are widened.
    pub fn float(&self, key: &str) -> Result<f64> {
        match self.require(key)? {
            Param::Float(v) => Ok(*v),
            Param::Int(v) => Ok(*v as f64),
            other => Err(type_error(key, "a number", other)),
        }
    }

    /// Gets a required boolean parameter.
    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.require(key)? {
            Param::Bool(v) => Ok(*v),
            other => Err(type_error(key, "a boolean", other)),
        }
    }

    /// Gets a required string parameter.
    pub fn str(&self, key: &str) -> Result<&ArcStr> {
        match self.require(key)? {
            Param::Str(v) => Ok(v),
            other => Err(type_error(key, "a string", other)),
        }
    }

    /// Gets a required cell reference.
    pub fn spec(&self, key: &str) -> Result<&Spec> {
        match self.require(key)? {
            Param::Spec(v) => Ok(v),
            other => Err(type_error(key, "a cell spec", other)),
        }
    }

    /// Gets a float parameter, or `default` if it is absent.
    pub fn float_or(&self, key: &str, default: f64) -> Result<f64> {
        if self.get(key).is_some() {
            self.float(key)
        } else {
            Ok(default)
        }
    }

    /// Gets a string parameter, or `default` if it is absent.
    pub fn str_or(&self, key: &str, default: &str) -> Result<ArcStr> {
        if self.get(key).is_some() {
            self.str(key).cloned()
        } else {
            Ok(default.into())
        }
    }
}

impl<K: Into<ArcStr>, V: Into<Param>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn type_error(key: &str, expected: &str, found: &Param) -> Error {
    Error::Param {
        key: key.into(),
        reason: arcstr::format!("expected {expected}, found {}", found.kind()),
    }
}

impl Param {
    fn kind(&self) -> &'static str {
        match self {
            Param::Bool(_) => "a boolean",
            Param::Int(_) => "an integer",
            Param::Float(_) => "a float",
            Param::Str(_) => "a string",
            Param::List(_) => "a list",
            Param::Map(_) => "a map",
            Param::Spec(_) => "a cell spec",
        }
    }
}

/// The canonical identity of a cell: its builder and canonicalized parameters.
///
/// Two requests with equal signatures describe the same geometry and share one cell.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Signature {
    builder: ArcStr,
    params: ArcStr,
}

impl Signature {
    /// Computes the signature of calling `builder` with `params`.
    ///
    /// Does not check that nested factories are registered; see
    /// [`Context::signature`](crate::context::Context::signature).
    ///
    /// # Examples
    ///
    /// ```
    /// # use cellkit::params::{Params, Signature};
    /// let a = Signature::new("straight", &Params::new().with("width", 0.5).with("length", 10.)).unwrap();
    /// let b = Signature::new("straight", &Params::new().with("length", 10.).with("width", 0.5)).unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.to_string(), r#"straight("length"=10.0,"width"=0.5)"#);
    /// ```
    pub fn new(builder: impl Into<ArcStr>, params: &Params) -> Result<Self> {
        let builder = builder.into();
        let mut out = String::new();
        write_params(&mut out, params).map_err(|reason| Error::Identity {
            builder: builder.clone(),
            reason,
        })?;
        Ok(Self {
            builder,
            params: out.into(),
        })
    }

    /// The builder identifier.
    pub fn builder(&self) -> &ArcStr {
        &self.builder
    }

    /// The canonical rendering of the parameters.
    pub fn params(&self) -> &ArcStr {
        &self.params
    }

    /// The hex-encoded SHA-256 digest of the full signature.
    pub fn digest(&self) -> String {
        let mut out = String::new();
        write_signature(&mut out, self);
        cache::hex_digest(out.as_bytes())
    }

    /// The name given to cells with this signature.
    ///
    /// Cells without parameters are named after their builder. Otherwise the
    /// first eight hex digits of the digest are appended.
    pub fn cell_name(&self) -> ArcStr {
        if self.params.is_empty() {
            self.builder.clone()
        } else {
            arcstr::format!("{}_{}", self.builder, &self.digest()[..8])
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.builder)
        } else {
            write!(f, "{}({})", self.builder, self.params)
        }
    }
}

type CanonResult = std::result::Result<(), ArcStr>;

fn write_params(out: &mut String, params: &Params) -> CanonResult {
    for (i, (key, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_fmt(out, format_args!("{:?}=", key.as_str()));
        write_param(out, value).map_err(|reason| arcstr::format!("parameter `{key}`: {reason}"))?;
    }
    Ok(())
}

fn write_param(out: &mut String, param: &Param) -> CanonResult {
    match param {
        Param::Bool(v) => push_fmt(out, v),
        Param::Int(v) => push_fmt(out, v),
        Param::Float(v) => {
            if !v.is_finite() {
                return Err(arcstr::format!("non-finite float {v}"));
            }
            // -0.0 and 0.0 describe the same geometry.
            let v = if *v == 0. { 0. } else { *v };
            write!(out, "{v:?}").map_err(|e| arcstr::format!("{e}"))?;
        }
        Param::Str(v) => push_fmt(out, format_args!("{:?}", v.as_str())),
        Param::List(values) => {
            out.push('[');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_param(out, value)?;
            }
            out.push(']');
        }
        Param::Map(params) => {
            out.push('{');
            write_params(out, params)?;
            out.push('}');
        }
        Param::Spec(Spec::Factory { id, params }) => {
            let sig = Signature::new(id.clone(), params).map_err(|e| arcstr::format!("{e}"))?;
            write_signature(out, &sig);
        }
        Param::Spec(Spec::Direct(cell)) => write_signature(out, cell.signature()),
    }
    Ok(())
}

/// Writes `sig` with its builder quoted, so ids containing delimiters stay unambiguous.
fn write_signature(out: &mut String, sig: &Signature) {
    push_fmt(out, format_args!("{:?}({})", sig.builder.as_str(), sig.params));
}

fn push_fmt(out: &mut String, value: impl Display) {
    // Writing to a `String` cannot fail.
    let _ = write!(out, "{value}");
}

/// Calls `f` on every factory identifier referenced by `params`, recursively.
pub(crate) fn visit_factories<'a>(params: &'a Params, f: &mut impl FnMut(&'a ArcStr)) {
    for (_, param) in params.iter() {
        visit_param(param, &mut *f);
    }
}

fn visit_param<'a>(param: &'a Param, f: &mut impl FnMut(&'a ArcStr)) {
    match param {
        Param::List(values) => {
            for value in values {
                visit_param(value, &mut *f);
            }
        }
        Param::Map(params) => visit_factories(params, f),
        Param::Spec(Spec::Factory { id, params }) => {
            f(id);
            visit_factories(params, f);
        }
        _ => {}
    }
}
