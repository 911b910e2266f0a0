//! A block without ghost data.

use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::index_space::IndexSpace;
use crate::iterators::pure::{ValueFieldBoundaryIterator, ValueFieldIterator};
use crate::iterators::stepper::ExecutionContext;
use crate::iterators::value::FieldData;
use crate::grid::block::Iterable;
use crate::stencil_error::StencilError;

#[derive(Clone, Debug)]
pub struct PureBlock<const D: usize> {
    space: IndexSpace<D>,
    values: Option<FieldData>,
}

impl<const D: usize> PureBlock<D> {
    pub fn new(elements_per_dim: usize) -> Result<Self, StencilError> {
        Ok(Self {
            space: IndexSpace::cube(elements_per_dim)?,
            values: None,
        })
    }

    pub fn with_values(elements_per_dim: usize, values: FieldData) -> Result<Self, StencilError> {
        let mut block = Self::new(elements_per_dim)?;
        block.set_values(values)?;
        Ok(block)
    }

    pub fn index_space(&self) -> &IndexSpace<D> {
        &self.space
    }

    fn data(&self) -> Result<FieldData, StencilError> {
        self.values.clone().ok_or(StencilError::MissingValues)
    }
}

impl<const D: usize> Iterable<D> for PureBlock<D> {
    fn elements_per_dim(&self) -> usize {
        self.space.size(0)
    }

    fn inner_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<Box<dyn FieldIterator<D>>, StencilError> {
        Ok(Box::new(ValueFieldIterator::over(self.space.clone(), self.data()?, ctx)?))
    }

    fn boundary_iterator(
        &self,
        ctx: ExecutionContext,
    ) -> Result<Box<dyn BoundaryIterator<D>>, StencilError> {
        Ok(Box::new(ValueFieldBoundaryIterator::over(
            self.space.clone(),
            self.data()?,
            ctx,
        )?))
    }

    fn values(&self) -> Option<&FieldData> {
        self.values.as_ref()
    }

    fn set_values(&mut self, values: FieldData) -> Result<(), StencilError> {
        if values.len() != self.space.total() {
            return Err(StencilError::SizeMismatch {
                expected: self.space.total(),
                found: values.len(),
            });
        }
        self.values = Some(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::boundary::BoundaryId;

    #[test]
    fn iterators_need_values() {
        let block = PureBlock::<2>::new(3).unwrap();
        assert!(matches!(
            block.inner_iterator(ExecutionContext::SERIAL),
            Err(StencilError::MissingValues)
        ));
        assert!(block.values().is_none());
    }

    #[test]
    fn set_values_checks_length_and_swaps_buffers() {
        let mut block = PureBlock::<2>::with_values(2, FieldData::zeros(4)).unwrap();
        assert!(block.set_values(FieldData::zeros(5)).is_err());
        let fresh = FieldData::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        block.set_values(fresh.clone()).unwrap();
        assert!(block.values().unwrap().ptr_eq(&fresh));

        let mut it = block.boundary_iterator(ExecutionContext::SERIAL).unwrap();
        it.set_boundary_to_iterate(BoundaryId::new(1, false)).unwrap();
        assert_eq!(it.current_value().unwrap(), 3.0);
        it.set_current_neighbor(1, -1, 9.0).unwrap();
        assert_eq!(fresh.get(0), 9.0);
    }

    #[test]
    fn no_ghost_data_beyond_the_edge() {
        let block = PureBlock::<1>::with_values(4, FieldData::zeros(4)).unwrap();
        let it = block.boundary_iterator(ExecutionContext::SERIAL).unwrap();
        assert!(matches!(
            it.current_neighbor(0, -1),
            Err(StencilError::NeighborOutOfRange { .. })
        ));
        assert_eq!(it.size(0).unwrap(), 4);
    }
}
