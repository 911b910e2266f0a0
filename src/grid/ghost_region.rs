//! Ghost regions: local copies of the neighbour's data beyond one face.

use crate::algs::communicator::Communicator;
use crate::algs::wire;
use crate::debug_invariants::DebugInvariants;
use crate::iterators::index_space::IndexSpace;
use crate::iterators::pure::{ValueFieldBoundaryIterator, ValueFieldIterator};
use crate::iterators::stepper::ExecutionContext;
use crate::iterators::value::FieldData;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// Registration of the receive that refills a ghost region every round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistentReceive {
    pub source: usize,
    pub tag: u16,
    pub len_bytes: usize,
}

/// Buffer for the data beyond one face: `extent` elements deep along the
/// face's dimension and `elements_per_dim` along every other one.
#[derive(Debug)]
pub struct GhostRegion<const D: usize> {
    boundary: BoundaryId,
    space: IndexSpace<D>,
    values: FieldData,
    receive: Option<PersistentReceive>,
}

impl<const D: usize> GhostRegion<D> {
    pub fn new(
        boundary: BoundaryId,
        elements_per_dim: usize,
        extent: usize,
    ) -> Result<Self, StencilError> {
        if boundary.dimension() >= D {
            return Err(StencilError::DimensionOutOfRange {
                dim: boundary.dimension(),
                dims: D,
            });
        }
        let mut sizes = [elements_per_dim; D];
        sizes[boundary.dimension()] = extent;
        let space = IndexSpace::new(sizes)?;
        let values = FieldData::zeros(space.total());
        Ok(Self {
            boundary,
            space,
            values,
            receive: None,
        })
    }

    pub fn boundary(&self) -> BoundaryId {
        self.boundary
    }

    pub fn index_space(&self) -> &IndexSpace<D> {
        &self.space
    }

    pub fn values(&self) -> &FieldData {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn receive(&self) -> Option<PersistentReceive> {
        self.receive
    }

    /// Register the receive that fills this region from `source` each round.
    ///
    /// Registering the same source again is a no-op.
    ///
    /// # Errors
    /// `ReceiveAlreadyRegistered` when another source was registered before.
    pub fn initialize_receive(&mut self, source: usize) -> Result<(), StencilError> {
        match self.receive {
            Some(r) if r.source == source => Ok(()),
            Some(r) => Err(StencilError::ReceiveAlreadyRegistered {
                boundary: self.boundary,
                existing: r.source,
                requested: source,
            }),
            None => {
                self.receive = Some(PersistentReceive {
                    source,
                    tag: self.boundary.receive_tag(),
                    len_bytes: self.values.len() * std::mem::size_of::<f64>(),
                });
                Ok(())
            }
        }
    }

    /// Post this round's receive.
    pub fn start_receive<C: Communicator>(&self, comm: &C) -> Result<C::RecvHandle, StencilError> {
        let r = self.receive.ok_or(StencilError::CommunicationOrder {
            operation: "start a receive",
            phase: "unregistered",
        })?;
        log::trace!(
            "rank {}: receive for {} from rank {} (tag {})",
            comm.rank(),
            self.boundary,
            r.source,
            r.tag
        );
        Ok(comm.irecv(r.source, r.tag, r.len_bytes))
    }

    /// Land a completed payload.
    ///
    /// # Errors
    /// `SizeMismatch` when the payload does not fill the region exactly.
    pub fn complete_receive(&self, bytes: &[u8]) -> Result<(), StencilError> {
        let incoming: Vec<f64> = wire::decode_exact(bytes, self.values.len())?;
        for (i, v) in incoming.into_iter().enumerate() {
            self.values.set(i, v);
        }
        Ok(())
    }

    pub fn inner_iterator(&self, ctx: ExecutionContext) -> Result<ValueFieldIterator<D>, StencilError> {
        ValueFieldIterator::over(self.space.clone(), self.values.clone(), ctx)
    }

    pub fn boundary_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<ValueFieldBoundaryIterator<D>, StencilError> {
        ValueFieldBoundaryIterator::over(self.space.clone(), self.values.clone(), ctx)
    }
}

impl<const D: usize> DebugInvariants for GhostRegion<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "GhostRegion");
    }

    fn validate_invariants(&self) -> Result<(), StencilError> {
        self.space.validate_invariants()?;
        if self.values.len() != self.space.total() {
            return Err(StencilError::SizeMismatch {
                expected: self.space.total(),
                found: self.values.len(),
            });
        }
        if let Some(r) = self.receive {
            if r.tag != self.boundary.receive_tag() {
                return Err(StencilError::InvalidConfig(format!(
                    "ghost region {} receives under tag {} instead of {}",
                    self.boundary,
                    r.tag,
                    self.boundary.receive_tag()
                )));
            }
        }
        Ok(())
    }
}
