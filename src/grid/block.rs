//! Block contracts shared by the stencil scheduler and the block variants.

use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::stepper::ExecutionContext;
use crate::iterators::value::FieldData;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// A cube of `elements_per_dim^D` values that hands out iterators.
pub trait Iterable<const D: usize> {
    fn elements_per_dim(&self) -> usize;

    /// Whole-field iterator over this worker's share of the block.
    fn inner_iterator(&self, ctx: ExecutionContext)
    -> Result<Box<dyn FieldIterator<D>>, StencilError>;

    /// Face iterator over this worker's share of each face.
    fn boundary_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<Box<dyn BoundaryIterator<D>>, StencilError>;

    fn values(&self) -> Option<&FieldData>;

    /// Replace the block's buffer.
    ///
    /// # Errors
    /// `SizeMismatch` when `values` does not hold `elements_per_dim^D` values.
    fn set_values(&mut self, values: FieldData) -> Result<(), StencilError>;
}

/// Halo-exchange state of a communicative block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommPhase {
    Created,
    ReceivesArmed,
    InFlight,
    Idle,
}

impl CommPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CommPhase::Created => "created",
            CommPhase::ReceivesArmed => "armed",
            CommPhase::InFlight => "in flight",
            CommPhase::Idle => "idle",
        }
    }

    pub(crate) fn violation(self, operation: &'static str) -> StencilError {
        StencilError::CommunicationOrder {
            operation,
            phase: self.as_str(),
        }
    }
}

/// A block whose boundary iterators read ghost data from neighbouring ranks.
pub trait CommunicativeBlock<const D: usize>: Iterable<D> {
    /// Post every receive and send every boundary slab of this round.
    fn start_communication(&mut self) -> Result<(), StencilError>;

    /// Wait until some outstanding receive completes and report its face.
    fn receive_done_at(&mut self) -> Result<BoundaryId, StencilError>;

    /// Drain this round's sends.
    fn finish_communication(&mut self) -> Result<(), StencilError>;

    /// Seconds spent waiting on the transport so far.
    fn communication_time(&self) -> f64;

    fn proc_grid_coord(&self, dim: usize) -> Result<usize, StencilError>;
    fn proc_grid_size(&self, dim: usize) -> Result<usize, StencilError>;
    fn phase(&self) -> CommPhase;
}
