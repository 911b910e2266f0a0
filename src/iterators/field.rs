//! Cursor contract shared by plain and composed field iterators.

use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// Cursor over one field exposing neighbour-relative access.
///
/// Every accessor fails with [`StencilError::NotInField`] once the cursor has
/// left its range, with [`StencilError::DimensionOutOfRange`] for `dim >= D`,
/// and with a neighbour error when `offset` reaches past what the iterator can
/// see (the field itself for plain iterators, field plus ghost data for
/// composed ones).
pub trait FieldIterator<const D: usize>: Send {
    /// Coordinate of the cursor along `dim`.
    fn current_index(&self, dim: usize) -> Result<usize, StencilError>;
    fn current_value(&self) -> Result<f64, StencilError>;
    fn current_neighbor(&self, dim: usize, offset: isize) -> Result<f64, StencilError>;
    fn set_current_value(&mut self, value: f64) -> Result<(), StencilError>;
    fn set_current_neighbor(
        &mut self,
        dim: usize,
        offset: isize,
        value: f64,
    ) -> Result<(), StencilError>;
    fn is_in_field(&self) -> bool;
    fn first(&mut self);
    fn next(&mut self) -> Result<(), StencilError>;
    /// Extent of the visible field along `dim`.
    fn size(&self, dim: usize) -> Result<usize, StencilError>;
}

/// Field iterator that walks one face at a time.
pub trait BoundaryIterator<const D: usize>: FieldIterator<D> {
    /// Walk `boundary` from now on and move to its first element.
    fn set_boundary_to_iterate(&mut self, boundary: BoundaryId) -> Result<(), StencilError>;
    fn current_boundary(&self) -> BoundaryId;
    /// This iterator as a plain field iterator, e.g. for weight lookups.
    fn as_field_iterator(&self) -> &dyn FieldIterator<D>;
}
