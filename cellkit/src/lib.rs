//! Memoized composition of hierarchical layout cells.
//!
//! Cells are built by builder functions registered on a [`Context`](context::Context),
//! which caches every finished cell under a canonical signature of its
//! builder and parameters. Builders compose children by connecting oriented
//! [ports](port::Port): the child is moved rigidly so that its port sits on
//! an anchor port, facing it.
//!
//! On top of single connections, [`sequence`] chains cells from a symbol
//! string and [`cutback`] generates serpentine test structures.
#![warn(missing_docs)]

extern crate self as cellkit;

pub use test_log::test;

pub mod cell;
pub mod config;
pub mod context;
pub mod cutback;
pub mod error;
pub mod extend;
pub mod params;
pub mod placement;
pub mod port;
pub mod rename;
pub mod sequence;
pub mod shape;


#[doc(hidden)]
pub use arcstr;
#[doc(inline)]
pub use geometry;
