//! Per-pixel parallel evaluation.
//!
//! Every output cell of [`align`](crate::align) and [`combine`](crate::combine)
//! depends only on the inputs at that position, so cells can be computed in
//! any order. Results are collected in index order, which keeps the parallel
//! path bit-identical to the sequential one.

use rayon::prelude::*;

/// Default pixel count below which evaluation stays on the calling thread.
pub const DEFAULT_MIN_PARALLEL_PIXELS: usize = 1 << 16;

/// Configuration for parallel pixel evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Whether parallel evaluation is enabled.
    pub enabled: bool,
    /// Minimum number of output pixels to trigger parallel processing.
    /// Below this threshold, sequential processing is used.
    pub min_parallel_pixels: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            enabled: true,
            min_parallel_pixels: DEFAULT_MIN_PARALLEL_PIXELS,
        }
    }
}

impl ParallelConfig {
    /// Configuration that always evaluates on the calling thread.
    pub fn sequential() -> Self {
        ParallelConfig {
            enabled: false,
            ..Default::default()
        }
    }

    /// Whether a job of `pixels` cells should be split across threads.
    pub fn use_parallel(&self, pixels: usize) -> bool {
        self.enabled && pixels >= self.min_parallel_pixels
    }
}

/// Evaluate `f` for every cell index in `0..len`, in index order.
///
/// Work is handed to rayon in runs of at least `row_len` cells so that a
/// worker processes whole rows.
pub(crate) fn map_cells<O, F>(len: usize, row_len: usize, config: &ParallelConfig, f: F) -> Vec<O>
where
    O: Send,
    F: Fn(usize) -> O + Sync + Send,
{
    if config.use_parallel(len) {
        (0..len)
            .into_par_iter()
            .with_min_len(row_len.max(1))
            .map(f)
            .collect()
    } else {
        (0..len).map(f).collect()
    }
}
