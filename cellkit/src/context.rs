//! The memoizing cell context.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use arcstr::ArcStr;
use cache::mem::MemCache;
use tracing::{span, Level};

use crate::cell::{Cell, CellBuilder};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::params::{visit_factories, Params, Signature, Spec};

/// A registered cell builder function.
pub type BuilderFn = dyn Fn(&Params, &mut CellBuilder) -> Result<()> + Send + Sync;

/// The cell context.
///
/// Holds the builder registry, the configuration, and the cache of
/// finished cells keyed by [`Signature`]. Each signature is built at most
/// once; concurrent requests for the same signature wait for the first.
///
/// Cheaply clonable.
///
/// # Examples
///
/// ```
/// # use cellkit::context::Context;
/// # use cellkit::params::Params;
/// # use cellkit::port::Port;
/// let ctx = Context::new();
/// ctx.register("pad", |_params, cell| {
///     cell.add_port(Port::new("o1", (0., 0.), 180., 10.))?;
///     Ok(())
/// });
///
/// let a = ctx.get_or_build("pad", Params::new()).unwrap();
/// let b = ctx.get_or_build("pad", Params::new()).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// assert_eq!(ctx.build_count("pad"), 1);
/// ```
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<RwLock<ContextInner>>,
    config: Arc<Config>,
    cells: MemCache<Signature, Arc<Cell>>,
}

#[derive(Default)]
pub(crate) struct ContextInner {
    builders: HashMap<ArcStr, Arc<BuilderFn>>,
    build_counts: HashMap<ArcStr, u64>,
}

impl Default for Context {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("cells", &self.cells.len())
            .finish_non_exhaustive()
    }
}

/// Builder for creating a [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    config: Option<Config>,
    builders: HashMap<ArcStr, Arc<BuilderFn>>,
}

impl ContextBuilder {
    /// Creates a new, uninitialized builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Registers a builder function.
    pub fn register<F>(&mut self, id: impl Into<ArcStr>, f: F) -> &mut Self
    where
        F: Fn(&Params, &mut CellBuilder) -> Result<()> + Send + Sync + 'static,
    {
        self.builders.insert(id.into(), Arc::new(f));
        self
    }

    /// Builds the context based on the configuration in this builder.
    pub fn build(&mut self) -> Context {
        Context {
            inner: Arc::new(RwLock::new(ContextInner {
                builders: self.builders.clone(),
                build_counts: HashMap::new(),
            })),
            config: Arc::new(self.config.clone().unwrap_or_default()),
            cells: MemCache::new(),
        }
    }
}

impl Context {
    /// Creates a new [`Context`] with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing a context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// The context configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a builder function under `id`.
    ///
    /// Replaces any builder previously registered under the same id. Cells
    /// that were already built are kept.
    pub fn register<F>(&self, id: impl Into<ArcStr>, f: F)
    where
        F: Fn(&Params, &mut CellBuilder) -> Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        let mut inner = self.inner.write().unwrap();
        if inner.builders.insert(id.clone(), Arc::new(f)).is_some() {
            tracing::warn!(builder = %id, "replacing registered builder");
        }
    }

    /// Returns `true` if a builder is registered under `id`.
    pub fn is_registered(&self, id: &str) -> bool {
        self.inner.read().unwrap().builders.contains_key(id)
    }

    /// Computes the signature of calling `id` with `params`.
    ///
    /// Fails if any nested factory refers to an unregistered builder, or if
    /// a parameter cannot be canonicalized.
    pub fn signature(&self, id: impl Into<ArcStr>, params: &Params) -> Result<Signature> {
        let id = id.into();
        let inner = self.inner.read().unwrap();
        let mut unknown = None;
        visit_factories(params, &mut |factory| {
            if unknown.is_none() && !inner.builders.contains_key(factory) {
                unknown = Some(factory.clone());
            }
        });
        drop(inner);
        if let Some(factory) = unknown {
            return Err(Error::Identity {
                builder: id,
                reason: arcstr::format!("no builder registered under `{factory}`"),
            });
        }
        Signature::new(id, params)
    }

    /// Builds the cell described by registered builder `id` and `params`,
    /// or returns the cached cell if it was built before.
    pub fn get_or_build(&self, id: impl Into<ArcStr>, params: Params) -> Result<Arc<Cell>> {
        let id = id.into();
        let builder = self
            .inner
            .read()
            .unwrap()
            .builders
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::UnknownBuilder(id.clone()))?;
        self.generate(id, params, move |params, cell| builder(params, cell))
    }

    /// Memoizes an ad hoc builder closure under the signature of `id` and `params`.
    ///
    /// `f` runs only if no cell with the same signature exists. `id` need
    /// not be registered.
    pub fn generate<F>(&self, id: impl Into<ArcStr>, params: Params, f: F) -> Result<Arc<Cell>>
    where
        F: FnOnce(&Params, &mut CellBuilder) -> Result<()>,
    {
        let id = id.into();
        let signature = self.signature(id.clone(), &params)?;
        let name = signature.cell_name();
        let span = span!(Level::DEBUG, "generate", builder = %id, name = %name);
        let _guard = span.enter();

        if let Some(cell) = self.cells.peek(&signature) {
            tracing::debug!("cache hit");
            return Ok(cell);
        }

        self.cells.try_generate(signature, |signature| {
            self.record_build(&id);
            let mut cell = CellBuilder::new(self.clone(), name);
            match f(&params, &mut cell) {
                Ok(()) => {
                    tracing::debug!(ports = cell.ports.len(), "generated cell");
                    Ok(Arc::new(cell.finish(signature.clone())))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cell generation failed");
                    Err(err)
                }
            }
        })
    }

    /// Resolves a [`Spec`] to a cell.
    pub fn resolve(&self, spec: &Spec) -> Result<Arc<Cell>> {
        match spec {
            Spec::Factory { id, params } => self.get_or_build(id.clone(), params.clone()),
            Spec::Direct(cell) => Ok(cell.clone()),
        }
    }

    /// Returns `true` if the cell for `id` and `params` is cached.
    pub fn contains(&self, id: impl Into<ArcStr>, params: &Params) -> Result<bool> {
        Ok(self.cells.contains(&self.signature(id, params)?))
    }

    /// Removes the cell for `id` and `params` from the cache.
    ///
    /// Existing references to the cell stay valid. The next request rebuilds it.
    pub fn evict(&self, id: impl Into<ArcStr>, params: &Params) -> Result<Option<Arc<Cell>>> {
        Ok(self.cells.evict(&self.signature(id, params)?))
    }

    /// Removes all cells from the cache.
    pub fn clear(&self) {
        self.cells.clear();
    }

    /// The number of cached cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cells are cached.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The number of times the builder `id` has been executed.
    pub fn build_count(&self, id: &str) -> u64 {
        self.inner
            .read()
            .unwrap()
            .build_counts
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    fn record_build(&self, id: &ArcStr) {
        let mut inner = self.inner.write().unwrap();
        *inner.build_counts.entry(id.clone()).or_insert(0) += 1;
    }
}
