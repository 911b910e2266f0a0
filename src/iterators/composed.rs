//! Boundary iterator that sees past the edge of its block into ghost data.
//!
//! A composed iterator owns the main iterator over the block's own buffer and
//! one side iterator per face, each walking that face's ghost region. Only the
//! side adjacent to the face currently being walked is positioned: when the
//! main iterator walks `(d, lower)`, the lower ghost region of dimension `d`
//! walks its own upper face in lockstep, so the ghost cell directly below the
//! cursor is at side-local offset 0.

use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::pure::ValueFieldBoundaryIterator;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;

/// Where a neighbour request along `dim` lands.
enum Route {
    Main,
    /// `(side index, side-local offset)`.
    Side(usize, isize),
}

pub struct ComposedFieldIterator<const D: usize> {
    main: ValueFieldBoundaryIterator<D>,
    sides: [[Box<dyn BoundaryIterator<D>>; 2]; D],
    current: BoundaryId,
}

impl<const D: usize> ComposedFieldIterator<D> {
    /// Wire `main` to its side iterators, `sides[d][0]` below and `sides[d][1]`
    /// above dimension `d`, and start walking `(0, lower)`.
    ///
    /// # Errors
    /// `SizeMismatch` when a side region does not match the main region across
    /// its face.
    pub fn new(
        main: ValueFieldBoundaryIterator<D>,
        sides: [[Box<dyn BoundaryIterator<D>>; 2]; D],
    ) -> Result<Self, StencilError> {
        for (d, pair) in sides.iter().enumerate() {
            for side in pair {
                for k in (0..D).filter(|&k| k != d) {
                    let expected = main.size(k)?;
                    let found = side.size(k)?;
                    if expected != found {
                        return Err(StencilError::SizeMismatch { expected, found });
                    }
                }
            }
        }
        let mut it = Self {
            main,
            sides,
            current: BoundaryId::default(),
        };
        it.set_boundary_to_iterate(BoundaryId::default())?;
        Ok(it)
    }

    fn active_side(&mut self) -> &mut dyn BoundaryIterator<D> {
        let b = self.current;
        self.sides[b.dimension()][b.side_index()].as_mut()
    }

    fn route(&self, dim: usize, offset: isize) -> Result<Route, StencilError> {
        let coordinate = self.main.current_index(dim)? as isize;
        let main_size = self.main.size(dim)? as isize;
        let target = coordinate + offset;
        let (side, local) = if target < 0 {
            (0, target + 1)
        } else if target >= main_size {
            (1, target - main_size)
        } else {
            return Ok(Route::Main);
        };
        if dim != self.current.dimension() || side != self.current.side_index() {
            return Err(StencilError::SideNotActive {
                boundary: BoundaryId::new(dim, side == 0),
            });
        }
        Ok(Route::Side(side, local))
    }
}

impl<const D: usize> FieldIterator<D> for ComposedFieldIterator<D> {
    fn current_index(&self, dim: usize) -> Result<usize, StencilError> {
        self.main.current_index(dim)
    }

    fn current_value(&self) -> Result<f64, StencilError> {
        self.main.current_value()
    }

    fn current_neighbor(&self, dim: usize, offset: isize) -> Result<f64, StencilError> {
        match self.route(dim, offset)? {
            Route::Main => self.main.current_neighbor(dim, offset),
            Route::Side(side, local) => self.sides[dim][side].current_neighbor(dim, local),
        }
    }

    fn set_current_value(&mut self, value: f64) -> Result<(), StencilError> {
        self.main.set_current_value(value)
    }

    fn set_current_neighbor(
        &mut self,
        dim: usize,
        offset: isize,
        value: f64,
    ) -> Result<(), StencilError> {
        match self.route(dim, offset)? {
            Route::Main => self.main.set_current_neighbor(dim, offset, value),
            Route::Side(side, local) => {
                self.sides[dim][side].set_current_neighbor(dim, local, value)
            }
        }
    }

    fn is_in_field(&self) -> bool {
        self.main.is_in_field()
    }

    fn first(&mut self) {
        self.main.first();
        self.active_side().first();
    }

    fn next(&mut self) -> Result<(), StencilError> {
        self.main.next()?;
        self.active_side().next()
    }

    /// Ghost-inclusive extent: main region plus both side regions.
    fn size(&self, dim: usize) -> Result<usize, StencilError> {
        let [lower, upper] = self
            .sides
            .get(dim)
            .ok_or(StencilError::DimensionOutOfRange { dim, dims: D })?;
        Ok(self.main.size(dim)? + lower.size(dim)? + upper.size(dim)?)
    }
}

impl<const D: usize> BoundaryIterator<D> for ComposedFieldIterator<D> {
    fn set_boundary_to_iterate(&mut self, boundary: BoundaryId) -> Result<(), StencilError> {
        self.main.set_boundary_to_iterate(boundary)?;
        self.current = boundary;
        self.active_side()
            .set_boundary_to_iterate(boundary.opposite())?;
        self.first();
        Ok(())
    }

    fn current_boundary(&self) -> BoundaryId {
        self.current
    }

    fn as_field_iterator(&self) -> &dyn FieldIterator<D> {
        self
    }
}
