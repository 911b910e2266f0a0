//! Plain field iterators: one stepping strategy over one buffer.

use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::index_space::IndexSpace;
use crate::iterators::stepper::{
    BoundaryStepper, BoundaryStepping, ExecutionContext, SteppingStrategy, WholeFieldStepper,
};
use crate::iterators::value::{FieldData, ValueArray, ValueType};
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// A stepping strategy paired with a value accessor of matching length.
#[derive(Clone, Debug)]
pub struct PureFieldIterator<const D: usize, S, V = ValueArray> {
    stepper: S,
    values: V,
}

/// Whole-field iterator over a [`FieldData`] buffer.
pub type ValueFieldIterator<const D: usize> = PureFieldIterator<D, WholeFieldStepper<D>>;
/// Face-by-face iterator over a [`FieldData`] buffer.
pub type ValueFieldBoundaryIterator<const D: usize> = PureFieldIterator<D, BoundaryStepper<D>>;

impl<const D: usize, S, V> PureFieldIterator<D, S, V>
where
    S: SteppingStrategy<D>,
    V: ValueType,
{
    /// # Errors
    /// `SizeMismatch` when `values` does not cover the stepper's field.
    pub fn new(stepper: S, values: V) -> Result<Self, StencilError> {
        let expected = stepper.index_space().total();
        if values.len() != expected {
            return Err(StencilError::SizeMismatch {
                expected,
                found: values.len(),
            });
        }
        Ok(Self { stepper, values })
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    /// Linear index of the cursor, or `NotInField`.
    fn position(&self) -> Result<usize, StencilError> {
        if self.stepper.is_in_field() {
            Ok(self.stepper.index())
        } else {
            Err(self.stepper.not_in_field())
        }
    }

    fn neighbor_position(&self, dim: usize, offset: isize) -> Result<usize, StencilError> {
        self.position()?;
        self.stepper.linear_neighbor_index(dim, offset)
    }
}

impl<const D: usize> ValueFieldIterator<D> {
    pub fn over(
        space: IndexSpace<D>,
        data: FieldData,
        ctx: ExecutionContext,
    ) -> Result<Self, StencilError> {
        Self::new(WholeFieldStepper::new(space, ctx), ValueArray::new(data))
    }
}

impl<const D: usize> ValueFieldBoundaryIterator<D> {
    pub fn over(
        space: IndexSpace<D>,
        data: FieldData,
        ctx: ExecutionContext,
    ) -> Result<Self, StencilError> {
        Self::new(BoundaryStepper::new(space, ctx), ValueArray::new(data))
    }
}

impl<const D: usize, S, V> FieldIterator<D> for PureFieldIterator<D, S, V>
where
    S: SteppingStrategy<D>,
    V: ValueType,
{
    fn current_index(&self, dim: usize) -> Result<usize, StencilError> {
        self.stepper.index_space().check_dim(dim)?;
        self.position()?;
        self.stepper.current_index(dim)
    }

    #[inline]
    fn current_value(&self) -> Result<f64, StencilError> {
        Ok(self.values.value(self.position()?))
    }

    #[inline]
    fn current_neighbor(&self, dim: usize, offset: isize) -> Result<f64, StencilError> {
        Ok(self.values.value(self.neighbor_position(dim, offset)?))
    }

    fn set_current_value(&mut self, value: f64) -> Result<(), StencilError> {
        let i = self.position()?;
        self.values.set_value(i, value);
        Ok(())
    }

    fn set_current_neighbor(
        &mut self,
        dim: usize,
        offset: isize,
        value: f64,
    ) -> Result<(), StencilError> {
        let i = self.neighbor_position(dim, offset)?;
        self.values.set_value(i, value);
        Ok(())
    }

    #[inline]
    fn is_in_field(&self) -> bool {
        self.stepper.is_in_field()
    }

    fn first(&mut self) {
        self.stepper.first();
    }

    #[inline]
    fn next(&mut self) -> Result<(), StencilError> {
        self.stepper.next()
    }

    fn size(&self, dim: usize) -> Result<usize, StencilError> {
        let space = self.stepper.index_space();
        space.check_dim(dim)?;
        Ok(space.size(dim))
    }
}

impl<const D: usize, S, V> BoundaryIterator<D> for PureFieldIterator<D, S, V>
where
    S: BoundaryStepping<D>,
    V: ValueType,
{
    fn set_boundary_to_iterate(&mut self, boundary: BoundaryId) -> Result<(), StencilError> {
        self.stepper.set_boundary_to_iterate(boundary)
    }

    fn current_boundary(&self) -> BoundaryId {
        self.stepper.boundary()
    }

    fn as_field_iterator(&self) -> &dyn FieldIterator<D> {
        self
    }
}
