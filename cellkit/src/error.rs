//! Error types and error handling utilities.

use std::sync::Arc;

use arcstr::ArcStr;

/// A result type returning cellkit errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for cellkit functions.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The parameters of a cell request could not be reduced to a canonical signature.
    #[error("cannot compute a signature for builder `{builder}`: {reason}")]
    Identity {
        /// The builder whose parameters could not be canonicalized.
        builder: ArcStr,
        /// Why canonicalization failed.
        reason: ArcStr,
    },
    /// No builder is registered under the requested identifier.
    #[error("no builder registered under `{0}`")]
    UnknownBuilder(ArcStr),
    /// A named port does not exist on a cell or instance.
    #[error("port `{port}` not found on `{cell}`")]
    PortNotFound {
        /// The cell that was searched.
        cell: ArcStr,
        /// The missing port name.
        port: ArcStr,
    },
    /// Two ports could not be mated.
    #[error("cannot connect port `{port}` to anchor `{anchor}`: {mismatch}")]
    IncompatiblePorts {
        /// The name of the port being moved.
        port: ArcStr,
        /// The name of the stationary anchor port.
        anchor: ArcStr,
        /// The property on which the ports disagree.
        mismatch: PortMismatch,
    },
    /// A port with the given name already exists.
    #[error("port `{0}` already exists")]
    PortNameCollision(ArcStr),
    /// An instance identifier does not refer to an instance of this cell.
    #[error("no instance with id {0}")]
    InstanceNotFound(usize),
    /// A sequence references a symbol with no entry in its symbol table.
    #[error("unknown symbol {symbol:?} at position {index}")]
    UnknownSymbol {
        /// The unrecognized character.
        symbol: char,
        /// Its position in the sequence.
        index: usize,
    },
    /// An error attributed to a particular position of a sequence.
    #[error("symbol {symbol:?} at position {index}: {source}")]
    Symbol {
        /// The character being realized.
        symbol: char,
        /// Its position in the sequence.
        index: usize,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
    /// Sequence or cutback parameters are out of range.
    #[error("invalid sequence configuration: {0}")]
    SequenceConfig(ArcStr),
    /// A builder parameter is missing or has the wrong type.
    #[error("invalid parameter `{key}`: {reason}")]
    Param {
        /// The parameter name.
        key: ArcStr,
        /// What was wrong with it.
        reason: ArcStr,
    },
    /// An arbitrary error raised by a user-supplied builder.
    #[error(transparent)]
    Builder(#[from] Arc<anyhow::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Builder(Arc::new(value))
    }
}

impl Error {
    /// Attributes this error to the given sequence position.
    pub(crate) fn at_symbol(self, symbol: char, index: usize) -> Self {
        match self {
            err @ (Error::UnknownSymbol { .. } | Error::Symbol { .. }) => err,
            err => Error::Symbol {
                symbol,
                index,
                source: Box::new(err),
            },
        }
    }
}

/// The property on which two ports disagree.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PortMismatch {
    /// The port widths differ by more than the tolerance.
    #[error("width {port} does not match anchor width {anchor}")]
    Width {
        /// Width of the moving port.
        port: f64,
        /// Width of the anchor port.
        anchor: f64,
    },
    /// The ports use different cross sections.
    #[error("cross section `{port}` does not match anchor cross section `{anchor}`")]
    CrossSection {
        /// Cross section of the moving port.
        port: ArcStr,
        /// Cross section of the anchor port.
        anchor: ArcStr,
    },
}
