//! Stencil coefficients.

use crate::iterators::field::FieldIterator;
use crate::stencil_error::StencilError;

/// Coefficients of a centred stencil of half-width [`extent`](Self::extent).
///
/// `weight(it, dim, i)` is the coefficient of the tap at offset
/// `i - extent` along `dim` for the cell under `it`, for `i` in
/// `0..=2·extent`. Constant-coefficient stencils ignore `it`.
pub trait WeightProvider<const D: usize>: Sync {
    fn extent(&self) -> usize;
    fn weight(&self, it: &dyn FieldIterator<D>, dim: usize, index: usize) -> f64;
}

/// Centred eighth-order approximation of the second derivative.
const FD8_SECOND_DERIVATIVE: [f64; 9] = [
    -1.0 / 560.0,
    8.0 / 315.0,
    -1.0 / 5.0,
    8.0 / 5.0,
    -205.0 / 72.0,
    8.0 / 5.0,
    -1.0 / 5.0,
    8.0 / 315.0,
    -1.0 / 560.0,
];

/// Eighth-order Laplacian on a uniform grid with per-dimension step lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstFd8Laplacian<const D: usize> {
    weights: [[f64; 9]; D],
}

impl<const D: usize> ConstFd8Laplacian<D> {
    pub const EXTENT: usize = 4;

    /// # Errors
    /// `InvalidConfig` when a step length is not a positive finite number.
    pub fn new(step_lengths: [f64; D]) -> Result<Self, StencilError> {
        if let Some(h) = step_lengths.iter().find(|h| !(h.is_finite() && **h > 0.0)) {
            return Err(StencilError::InvalidConfig(format!(
                "step length {h} is not positive"
            )));
        }
        let weights = std::array::from_fn(|d| {
            let inv_h2 = 1.0 / (step_lengths[d] * step_lengths[d]);
            FD8_SECOND_DERIVATIVE.map(|w| w * inv_h2)
        });
        Ok(Self { weights })
    }

    pub fn weights(&self, dim: usize) -> &[f64; 9] {
        &self.weights[dim]
    }
}

impl<const D: usize> WeightProvider<D> for ConstFd8Laplacian<D> {
    fn extent(&self) -> usize {
        Self::EXTENT
    }

    #[inline]
    fn weight(&self, _it: &dyn FieldIterator<D>, dim: usize, index: usize) -> f64 {
        self.weights[dim][index]
    }
}
