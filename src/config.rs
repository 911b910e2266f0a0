//! Block and worker-pool configuration.

use serde::{Deserialize, Serialize};

use crate::stencil_error::StencilError;

/// Shape of one block and the worker pool that iterates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Grid points per dimension owned by one rank.
    pub elements_per_dim: usize,
    /// Ghost depth; half the stencil order.
    pub extent: usize,
    /// Worker threads per pass. `None` uses the ambient rayon pool.
    pub num_threads: Option<usize>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            elements_per_dim: 10,
            extent: 4,
            num_threads: None,
        }
    }
}

impl BlockConfig {
    pub fn new(elements_per_dim: usize, extent: usize) -> Self {
        Self {
            elements_per_dim,
            extent,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn validate(&self) -> Result<(), StencilError> {
        if self.elements_per_dim == 0 {
            return Err(StencilError::InvalidConfig(
                "a block needs at least one element per dimension".into(),
            ));
        }
        if self.extent == 0 || self.extent > self.elements_per_dim {
            return Err(StencilError::InvalidConfig(format!(
                "extent {} must lie in 1..={}",
                self.extent, self.elements_per_dim
            )));
        }
        if self.num_threads == Some(0) {
            return Err(StencilError::InvalidConfig("num_threads must be positive".into()));
        }
        Ok(())
    }

    /// Dedicated pool when `num_threads` is set.
    pub fn thread_pool(&self) -> Result<Option<rayon::ThreadPool>, StencilError> {
        self.num_threads
            .map(|n| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| StencilError::InvalidConfig(e.to_string()))
            })
            .transpose()
    }
}
