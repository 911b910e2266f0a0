#![allow(dead_code)]
use std::f64::consts::PI;

use halo_stencil::prelude::*;

/// Spacing and origin of a rank's block inside the unit cube.
pub fn geometry<const D: usize, B: CommunicativeBlock<D>>(block: &B) -> (f64, [f64; D]) {
    let n = block.elements_per_dim();
    let procs = block.proc_grid_size(0).unwrap();
    let h = 1.0 / (n * procs) as f64;
    let origin = std::array::from_fn(|d| block.proc_grid_coord(d).unwrap() as f64 * h * n as f64);
    (h, origin)
}

/// `Σ_d sin(2π x_d)` sampled over a block with spacing `h`.
pub fn sine_field<const D: usize>(n: usize, h: f64, origin: [f64; D]) -> FieldData {
    let space = IndexSpace::<D>::cube(n).unwrap();
    FieldData::from_fn(space.total(), |i| {
        let c = space.coordinates(i);
        (0..D)
            .map(|d| (2.0 * PI * (origin[d] + c[d] as f64 * h)).sin())
            .sum()
    })
}

pub fn max_deviation(got: &FieldData, want: &FieldData, scale: f64) -> f64 {
    got.to_vec()
        .iter()
        .zip(want.to_vec())
        .map(|(g, w)| (g - scale * w).abs())
        .fold(0.0, f64::max)
}

/// One halo round: start, apply, finish.
pub fn round<const D: usize, C: Communicator>(
    op: &mut BlockOperator<D, ConstFd8Laplacian<D>>,
    input: &mut ComposedBlock<D, C>,
    output: &PureBlock<D>,
) {
    input.start_communication().unwrap();
    op.apply(input, output).unwrap();
    input.finish_communication().unwrap();
}
