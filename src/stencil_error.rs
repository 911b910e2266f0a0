//! StencilError: Unified error type for halo-stencil public APIs
//!
//! Every fallible operation in the crate returns this type. Most variants are
//! *precondition violations*: the caller drove an iterator past its range,
//! asked for a neighbour outside the reachable region, or called the halo
//! exchange out of order. Those are programming errors and are reported, never
//! retried. [`StencilError::Transport`] is the only variant raised by the
//! communication layer itself.

use thiserror::Error;

use crate::utils::boundary::BoundaryId;

/// Unified error type for halo-stencil operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StencilError {
    /// An iterator accessor was called while the iterator was outside its range.
    #[error("iterator is not in field (index {index}, range [{min}, {max}])")]
    NotInField { index: usize, min: usize, max: usize },
    /// A dimension index was not smaller than the dimensionality.
    #[error("dimension {dim} out of range for a {dims}-dimensional field")]
    DimensionOutOfRange { dim: usize, dims: usize },
    /// A neighbour was requested outside the region reachable by the iterator.
    #[error(
        "neighbour at offset {offset} along dimension {dim} is outside the field \
         (coordinate {coordinate}, size {size})"
    )]
    NeighborOutOfRange {
        dim: usize,
        offset: isize,
        coordinate: usize,
        size: usize,
    },
    /// A ghost region was addressed while its side iterator was not positioned.
    #[error("side region {boundary} is not attached to the boundary being iterated")]
    SideNotActive { boundary: BoundaryId },
    /// The halo-exchange state machine was driven out of order.
    #[error("cannot {operation} while communication is {phase}")]
    CommunicationOrder {
        operation: &'static str,
        phase: &'static str,
    },
    /// `receive_done_at` was called with no receive outstanding.
    #[error("no receive is outstanding")]
    NoOutstandingReceive,
    /// A persistent receive was registered a second time with another source.
    #[error("receive for {boundary} already registered from rank {existing}, not {requested}")]
    ReceiveAlreadyRegistered {
        boundary: BoundaryId,
        existing: usize,
        requested: usize,
    },
    /// A buffer had the wrong number of elements.
    #[error("size mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    /// A field was too large for 32-bit index arithmetic.
    #[error("field of {0} elements exceeds 32-bit index arithmetic")]
    IndexOverflow(u64),
    /// A block, stencil or topology was configured inconsistently.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A block was iterated before any values were attached to it.
    #[error("block has no values attached")]
    MissingValues,
    /// The message-passing layer failed.
    #[error("transport failure talking to rank {peer}: {reason}")]
    Transport { peer: usize, reason: String },
}

impl StencilError {
    /// True for programmer errors (everything except transport failures).
    pub fn is_precondition_violation(&self) -> bool {
        !matches!(self, StencilError::Transport { .. })
    }
}
