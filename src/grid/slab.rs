//! Strided sub-regions of a block that are shipped to neighbours.
//!
//! The slab next to face `(d, side)` is `width` elements thick along `d` and
//! spans the whole block along every other dimension. Packed slabs are laid
//! out exactly like the receiving ghost region (dimension 0 fastest), so the
//! receiver copies the payload verbatim.

use crate::iterators::index_space::IndexSpace;
use crate::iterators::value::FieldData;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

#[derive(Clone, Debug)]
pub struct SlabLayout<const D: usize> {
    face: BoundaryId,
    shape: IndexSpace<D>,
    start: usize,
    block_strides: [usize; D],
}

impl<const D: usize> SlabLayout<D> {
    /// # Errors
    /// `DimensionOutOfRange` for a face beyond `D`, `InvalidConfig` when the
    /// slab is thicker than the block.
    pub fn new(block: &IndexSpace<D>, face: BoundaryId, width: usize) -> Result<Self, StencilError> {
        let d = face.dimension();
        block.check_dim(d)?;
        if width > block.size(d) {
            return Err(StencilError::InvalidConfig(format!(
                "slab of width {width} does not fit a block of {} along dimension {d}",
                block.size(d)
            )));
        }
        let mut sizes = *block.sizes();
        sizes[d] = width;
        let start = if face.is_lower_side() {
            0
        } else {
            (block.size(d) - width) * block.stride(d)
        };
        Ok(Self {
            face,
            shape: IndexSpace::new(sizes)?,
            start,
            block_strides: std::array::from_fn(|k| block.stride(k)),
        })
    }

    pub fn face(&self) -> BoundaryId {
        self.face
    }

    /// Number of values in the slab.
    pub fn len(&self) -> usize {
        self.shape.total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear block index of the first slab element.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Block index of the `slab_index`-th packed element.
    pub fn block_index(&self, slab_index: usize) -> usize {
        let coords = self.shape.coordinates(slab_index);
        self.start
            + coords
                .iter()
                .zip(self.block_strides.iter())
                .map(|(c, s)| c * s)
                .sum::<usize>()
    }

    /// Gather the slab out of a block buffer.
    pub fn pack(&self, block: &FieldData) -> Vec<f64> {
        (0..self.len())
            .map(|i| block.get(self.block_index(i)))
            .collect()
    }
}
