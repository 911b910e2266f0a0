//! Stencil scheduler: interior work first, then one boundary pass per face in
//! the order the ghost data arrives.
//!
//! The interior pass adds every tap whose footprint stays inside the block.
//! The boundary pass for face `(d, lower)` then adds the left taps along `d`
//! that the interior pass skipped for the `extent` cells next to the face
//! (reading them through the input's composed iterator, which reaches into
//! the ghost region), and symmetrically for upper faces. Corner cells get
//! contributions from several faces; passes run one face at a time.

use rayon::prelude::*;

use crate::config::BlockConfig;
use crate::grid::block::{CommunicativeBlock, Iterable};
use crate::iterators::field::{BoundaryIterator, FieldIterator};
use crate::iterators::stepper::ExecutionContext;
use crate::numerics::weights::WeightProvider;
use crate::stencil_error::StencilError;
use crate::utils::boundary::BoundaryId;
use crate::utils::timer::Timer;

/// Applies a stencil described by `W` to a communicative input block.
pub struct BlockOperator<const D: usize, W: WeightProvider<D>> {
    weights: W,
    pool: Option<rayon::ThreadPool>,
    computation_timer: Timer,
}

impl<const D: usize, W: WeightProvider<D>> BlockOperator<D, W> {
    /// Operator running its passes on the ambient rayon pool.
    pub fn new(weights: W) -> Self {
        Self {
            weights,
            pool: None,
            computation_timer: Timer::new(),
        }
    }

    /// Operator running on a dedicated pool when `config.num_threads` is set.
    pub fn with_config(weights: W, config: &BlockConfig) -> Result<Self, StencilError> {
        config.validate()?;
        if config.extent != weights.extent() {
            return Err(StencilError::InvalidConfig(format!(
                "stencil of extent {} used with ghost regions of extent {}",
                weights.extent(),
                config.extent
            )));
        }
        Ok(Self {
            weights,
            pool: config.thread_pool()?,
            computation_timer: Timer::new(),
        })
    }

    pub fn weights(&self) -> &W {
        &self.weights
    }

    /// Seconds spent in interior and boundary passes so far.
    pub fn computation_time(&self) -> f64 {
        self.computation_timer.total_elapsed()
    }

    /// Write the stencil applied to `input` into `output`.
    ///
    /// `input` must have a halo round in flight
    /// (`start_communication` called); `apply` consumes all 2·D arrivals.
    pub fn apply<I, O>(&mut self, input: &mut I, output: &O) -> Result<(), StencilError>
    where
        I: CommunicativeBlock<D> + ?Sized,
        O: Iterable<D> + ?Sized,
    {
        if input.elements_per_dim() != output.elements_per_dim() {
            return Err(StencilError::SizeMismatch {
                expected: input.elements_per_dim(),
                found: output.elements_per_dim(),
            });
        }
        let workers = self.workers();
        let weights = &self.weights;
        let pool = self.pool.as_ref();

        self.computation_timer.start();
        let interior = interior_pass(weights, pool, workers, &*input, output);
        self.computation_timer.stop();
        interior?;

        for _ in 0..2 * D {
            let face = input.receive_done_at()?;
            self.computation_timer.start();
            let pass = boundary_pass(weights, pool, workers, face, &*input, output);
            self.computation_timer.stop();
            pass?;
        }
        Ok(())
    }

    fn workers(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
        .max(1)
    }
}

fn contexts(workers: usize) -> Result<Vec<ExecutionContext>, StencilError> {
    (0..workers)
        .map(|t| ExecutionContext::new(t, workers))
        .collect()
}

fn run_on<T, F>(pool: Option<&rayon::ThreadPool>, work: Vec<T>, f: F) -> Result<(), StencilError>
where
    T: Send,
    F: Fn(T) -> Result<(), StencilError> + Sync + Send,
{
    let go = || work.into_par_iter().try_for_each(&f);
    match pool {
        Some(pool) => pool.install(go),
        None => go(),
    }
}

fn interior_pass<const D: usize, W, I, O>(
    weights: &W,
    pool: Option<&rayon::ThreadPool>,
    workers: usize,
    input: &I,
    output: &O,
) -> Result<(), StencilError>
where
    W: WeightProvider<D>,
    I: Iterable<D> + ?Sized,
    O: Iterable<D> + ?Sized,
{
    let work = contexts(workers)?
        .into_iter()
        .map(|ctx| Ok((input.inner_iterator(ctx)?, output.inner_iterator(ctx)?)))
        .collect::<Result<Vec<_>, StencilError>>()?;
    run_on(pool, work, |(input, output)| {
        apply_interior(weights, input, output)
    })
}

fn boundary_pass<const D: usize, W, I, O>(
    weights: &W,
    pool: Option<&rayon::ThreadPool>,
    workers: usize,
    face: BoundaryId,
    input: &I,
    output: &O,
) -> Result<(), StencilError>
where
    W: WeightProvider<D>,
    I: Iterable<D> + ?Sized,
    O: Iterable<D> + ?Sized,
{
    let work = contexts(workers)?
        .into_iter()
        .map(|ctx| {
            let mut input = input.boundary_iterator(ctx)?;
            input.set_boundary_to_iterate(face)?;
            let mut output = output.boundary_iterator(ctx)?;
            output.set_boundary_to_iterate(face)?;
            Ok((input, output))
        })
        .collect::<Result<Vec<_>, StencilError>>()?;
    run_on(pool, work, |(input, output)| {
        apply_boundary(weights, face, input, output)
    })
}

fn apply_interior<const D: usize, W: WeightProvider<D>>(
    w: &W,
    mut input: Box<dyn FieldIterator<D>>,
    mut output: Box<dyn FieldIterator<D>>,
) -> Result<(), StencilError> {
    let extent = w.extent();
    while input.is_in_field() {
        let it = &*input;
        let mut result = 0.0;
        for d in 0..D {
            let along = it.current_index(d)?;
            if along >= extent {
                for i in 0..extent {
                    let offset = i as isize - extent as isize;
                    result += w.weight(it, d, i) * it.current_neighbor(d, offset)?;
                }
            }
            result += w.weight(it, d, extent) * it.current_value()?;
            if along + extent < it.size(d)? {
                for i in 1..=extent {
                    result += w.weight(it, d, extent + i) * it.current_neighbor(d, i as isize)?;
                }
            }
        }
        output.set_current_value(result)?;
        input.next()?;
        output.next()?;
    }
    Ok(())
}

fn apply_boundary<const D: usize, W: WeightProvider<D>>(
    w: &W,
    face: BoundaryId,
    mut input: Box<dyn BoundaryIterator<D>>,
    mut output: Box<dyn BoundaryIterator<D>>,
) -> Result<(), StencilError> {
    let extent = w.extent() as isize;
    let dim = face.dimension();
    let (lowest, dir) = if face.is_lower_side() {
        (0, 1)
    } else {
        (extent + 1, -1)
    };
    while input.is_in_field() {
        let mut distance = 0;
        while distance != dir * extent {
            let mut result = output.current_neighbor(dim, distance)?;
            for i in 0..extent {
                let tap = w.weight(input.as_field_iterator(), dim, (lowest + i) as usize);
                result += tap * input.current_neighbor(dim, lowest - extent + distance + i)?;
            }
            output.set_current_neighbor(dim, distance, result)?;
            distance += dir;
        }
        input.next()?;
        output.next()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::RayonComm;
    use crate::grid::block::CommPhase;
    use crate::grid::composed_block::ComposedBlock;
    use crate::grid::pure_block::PureBlock;
    use crate::iterators::value::FieldData;
    use crate::numerics::weights::ConstFd8Laplacian;

    /// `[1, -2, 1]` with an `extent` of 1.
    struct SecondDifference;

    impl WeightProvider<1> for SecondDifference {
        fn extent(&self) -> usize {
            1
        }

        fn weight(&self, _it: &dyn FieldIterator<1>, _dim: usize, index: usize) -> f64 {
            [1.0, -2.0, 1.0][index]
        }
    }

    #[test]
    fn periodic_second_difference_in_one_dimension() {
        let values = FieldData::from_slice(&[0.0, 1.0, 4.0, 9.0, 16.0]);
        let mut input =
            ComposedBlock::<1, _>::with_values(RayonComm::solo(), &BlockConfig::new(5, 1), values)
                .unwrap();
        let result = FieldData::zeros(5);
        let output = PureBlock::<1>::with_values(5, result.clone()).unwrap();
        let mut op = BlockOperator::new(SecondDifference);

        input.start_communication().unwrap();
        op.apply(&mut input, &output).unwrap();
        input.finish_communication().unwrap();

        // Interior cells see x² → 2; the ends wrap around to the other side.
        assert_eq!(result.to_vec(), vec![17.0, 2.0, 2.0, 2.0, -23.0]);
        assert_eq!(input.phase(), CommPhase::Idle);
        assert!(op.computation_time() > 0.0);
    }

    #[test]
    fn apply_without_a_round_in_flight_fails() {
        let mut input = ComposedBlock::<1, _>::with_values(
            RayonComm::solo(),
            &BlockConfig::new(5, 1),
            FieldData::zeros(5),
        )
        .unwrap();
        let output = PureBlock::<1>::with_values(5, FieldData::zeros(5)).unwrap();
        let mut op = BlockOperator::new(SecondDifference);
        assert!(matches!(
            op.apply(&mut input, &output),
            Err(StencilError::NoOutstandingReceive)
        ));
    }

    #[test]
    fn block_sizes_must_agree() {
        let mut input = ComposedBlock::<1, _>::with_values(
            RayonComm::solo(),
            &BlockConfig::new(5, 1),
            FieldData::zeros(5),
        )
        .unwrap();
        let output = PureBlock::<1>::with_values(4, FieldData::zeros(4)).unwrap();
        let mut op = BlockOperator::new(SecondDifference);
        assert!(matches!(
            op.apply(&mut input, &output),
            Err(StencilError::SizeMismatch { expected: 5, found: 4 })
        ));
    }

    #[test]
    fn config_extent_must_match_the_stencil() {
        let fd8 = ConstFd8Laplacian::<2>::new([0.1, 0.1]).unwrap();
        assert!(BlockOperator::with_config(fd8.clone(), &BlockConfig::new(10, 2)).is_err());
        let op = BlockOperator::with_config(fd8, &BlockConfig::new(10, 4).with_threads(3)).unwrap();
        assert_eq!(op.workers(), 3);
    }
}
