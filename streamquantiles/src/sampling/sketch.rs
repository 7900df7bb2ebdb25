// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use tracing::debug;
use tracing::trace;

use super::bit_sampler::BitSampler;
use super::helper::compute_limits;
use super::helper::merge_alternating;
use super::helper::merge_weighted;
use super::layers::LayerStack;
use super::pool::Buffer;
use super::pool::BufferPool;
use crate::common::MinMax;
use crate::common::QuantileItem;
use crate::common::QuantileSketch;
use crate::common::QueryIndex;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::common::check_epsilon;
use crate::common::check_rank;
use crate::error::Error;

/// Randomized quantile sketch built from weighted sample buffers.
///
/// See the [sampling module level documentation](crate::sampling) for more.
#[derive(Debug, Clone)]
pub struct SamplingSketch<T: QuantileItem, R: RandomSource = XorShift64> {
    epsilon: f64,
    buffer_size_limit: usize,
    layer_count_limit: usize,
    n: u64,
    num_discarded: u64,
    num_collapses: u64,
    rng: R,
    sampler: BitSampler,
    pool: BufferPool<T>,
    active: Buffer<T>,
    layers: LayerStack<T>,
    bounds: MinMax<T>,
    summary: Option<QueryIndex<T>>,
    poisoned: Option<Error>,
}

impl<T: QuantileItem> SamplingSketch<T, XorShift64> {
    /// Creates a new sketch seeded from the clock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `epsilon` is not in `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamquantiles::sampling::SamplingSketch;
    /// let sketch = SamplingSketch::<f64>::new(0.01).unwrap();
    /// assert_eq!(sketch.buffer_size_limit(), 258);
    /// assert_eq!(sketch.layer_count_limit(), 7);
    /// assert!(SamplingSketch::<f64>::new(0.0).is_err());
    /// ```
    pub fn new(epsilon: f64) -> Result<Self, Error> {
        Self::with_rng(epsilon, XorShift64::default())
    }

    /// Creates a new sketch with a reproducible random sequence.
    pub fn with_seed(epsilon: f64, seed: u64) -> Result<Self, Error> {
        Self::with_rng(epsilon, XorShift64::seeded(seed))
    }
}

impl<T: QuantileItem, R: RandomSource> SamplingSketch<T, R> {
    /// Creates a new sketch drawing its random bits from `rng`.
    ///
    /// All buffers are allocated here; ingesting never allocates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `epsilon` is not in `(0, 1)` or the
    /// derived limits are not positive.
    pub fn with_rng(epsilon: f64, rng: R) -> Result<Self, Error> {
        check_epsilon(epsilon)?;
        let limits = compute_limits(epsilon)?;

        let mut pool = BufferPool::new(limits.layer_count + 2, limits.buffer_size);
        let active = pool
            .acquire_spare()
            .ok_or_else(|| Error::invariant_violation("fresh buffer pool has no spare buffer"))?;

        debug!(
            epsilon,
            buffer_size_limit = limits.buffer_size,
            layer_count_limit = limits.layer_count,
            "created sampling quantile sketch"
        );
        Ok(Self {
            epsilon,
            buffer_size_limit: limits.buffer_size,
            layer_count_limit: limits.layer_count,
            n: 0,
            num_discarded: 0,
            num_collapses: 0,
            rng,
            sampler: BitSampler::new(limits.layer_count),
            pool,
            active,
            layers: LayerStack::new(limits.layer_count),
            bounds: MinMax::default(),
            summary: None,
            poisoned: None,
        })
    }

    /// Returns the configured error bound.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the number of items each buffer holds when full.
    pub fn buffer_size_limit(&self) -> usize {
        self.buffer_size_limit
    }

    /// Returns the number of weighted layers.
    pub fn layer_count_limit(&self) -> usize {
        self.layer_count_limit
    }

    /// Returns the number of items ingested.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns the number of NaN items dropped on ingest.
    pub fn num_discarded(&self) -> u64 {
        self.num_discarded
    }

    /// Returns true if the sketch has not ingested any item.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true once [`SamplingSketch::finalize`] has been called.
    pub fn is_finalized(&self) -> bool {
        self.summary.is_some()
    }

    /// Returns the number of sampled items currently retained.
    pub fn num_retained(&self) -> usize {
        self.active.len() + self.layers.num_items()
    }

    /// Returns the number of buffers out of the pool, the active one included.
    pub fn live_buffers(&self) -> usize {
        self.pool.num_live()
    }

    /// Returns `k` for the current sampling rate `2^-k`.
    pub fn sample_rate_exponent(&self) -> u32 {
        self.sampler.rate_exponent()
    }

    /// Returns the number of collapses performed so far.
    pub fn num_collapses(&self) -> u64 {
        self.num_collapses
    }

    /// Returns the total weight of the finalized summary.
    pub fn summary_weight_sum(&self) -> Option<u64> {
        self.summary.as_ref().map(QueryIndex::total_weight)
    }

    /// Returns the minimum item ingested.
    pub fn min_item(&self) -> Option<&T> {
        self.bounds.min()
    }

    /// Returns the maximum item ingested.
    pub fn max_item(&self) -> Option<&T> {
        self.bounds.max()
    }

    /// Updates the sketch with a new item.
    ///
    /// NaN items are dropped.
    ///
    /// # Panics
    ///
    /// Panics if the sketch has already been finalized.
    pub fn feed(&mut self, item: T) {
        assert!(
            self.summary.is_none(),
            "cannot feed a sketch after finalize()"
        );
        if self.poisoned.is_some() {
            return;
        }
        if T::is_nan(&item) {
            self.num_discarded += 1;
            return;
        }

        self.n += 1;
        self.bounds.update(&item);
        if !self.sampler.is_sampled(&mut self.rng) {
            return;
        }

        self.active.push(item);
        if self.active.len() < self.buffer_size_limit {
            return;
        }
        if let Err(err) = self.seal_active() {
            self.poisoned = Some(err.report_violation("sampling"));
        }
    }

    /// Builds the query index by merging every retained buffer by weight.
    ///
    /// # Panics
    ///
    /// Panics if the sketch has already been finalized.
    pub fn finalize(&mut self) {
        assert!(self.summary.is_none(), "finalize() must be called only once");

        let base_weight = self.sampler.weight();
        self.active.sort();
        for (_, buffer) in self.layers.iter_mut() {
            buffer.sort();
        }

        let mut streams = Vec::with_capacity(self.layers.num_buffers() + 1);
        if !self.active.is_empty() {
            streams.push((self.active.as_slice(), base_weight));
        }
        for (level, buffer) in self.layers.iter() {
            streams.push((buffer.as_slice(), base_weight << level));
        }

        let mut index = QueryIndex::with_capacity(self.num_retained());
        let total_weight = merge_weighted(&streams, &mut index);
        index.set_total_weight(total_weight);

        debug!(
            n = self.n,
            num_retained = index.len(),
            total_weight,
            sample_rate_exponent = self.sampler.rate_exponent(),
            num_collapses = self.num_collapses,
            "finalized sampling quantile sketch"
        );
        self.summary = Some(index);
    }

    /// Returns an item whose rank is within `epsilon * n` of `rank * n` with
    /// probability at least `1 - DELTA`.
    ///
    /// Ranks `0.0` and `1.0` return the exact minimum and maximum items.
    ///
    /// # Errors
    ///
    /// * `NotFinalized` if [`SamplingSketch::finalize`] has not been called.
    /// * `EmptyStream` if no item was ingested.
    /// * `InvalidParameter` if `rank` is not in `[0.0, 1.0]`.
    /// * `CapacityInvariantViolation` if the sketch detected an internal
    ///   inconsistency while ingesting.
    pub fn query_for_value(&self, rank: f64) -> Result<T, Error> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        let index = self.summary.as_ref().ok_or_else(Error::not_finalized)?;
        if self.is_empty() {
            return Err(Error::empty_stream());
        }
        check_rank(rank)?;

        // the extremes are tracked exactly, sampling may have dropped them
        let item = if rank == 0.0 {
            self.bounds.min()
        } else if rank == 1.0 {
            self.bounds.max()
        } else {
            let target = (rank * index.total_weight() as f64).ceil() as u64;
            index.floor_position(target).map(|pos| index.item(pos))
        };
        item.cloned().ok_or_else(|| {
            Error::invariant_violation("summary has no entry for the query")
                .with_context("rank", rank)
        })
    }

    // Moves the full active buffer into the bottom layer and replaces it,
    // collapsing when the pool has no spare buffer.
    fn seal_active(&mut self) -> Result<(), Error> {
        let mut full = std::mem::take(&mut self.active);
        full.sort();
        self.layers.push(0, full)?;
        self.active = match self.pool.acquire_spare() {
            Some(buffer) => buffer,
            None => self.collapse()?,
        };
        Ok(())
    }

    // Merges the two oldest buffers of the lowest collapsible layer into one
    // buffer of twice the weight, and returns a fresh active buffer.
    fn collapse(&mut self) -> Result<Buffer<T>, Error> {
        let mut merged = self
            .pool
            .acquire()
            .ok_or_else(|| Error::invariant_violation("no buffer left to collapse into"))?;
        let top_was_empty = self.layers.is_top_empty();

        let level = self
            .layers
            .pop_collapsible()
            .ok_or_else(|| Error::invariant_violation("no collapsible layer"))?;
        if level + 1 >= self.layers.num_layers() {
            return Err(Error::invariant_violation("the top layer cannot be collapsed")
                .with_context("level", level));
        }
        let (first, second) = self.layers.take_oldest_pair(level).ok_or_else(|| {
            Error::invariant_violation("collapsible layer holds fewer than two buffers")
                .with_context("level", level)
        })?;

        let keep = self.sampler.toss_coin(&mut self.rng);
        merge_alternating(first.as_slice(), second.as_slice(), keep, &mut merged);
        self.pool.release(first);
        self.pool.release(second);
        self.layers.push(level + 1, merged)?;
        self.num_collapses += 1;

        if !top_was_empty {
            if level != 0 {
                return Err(Error::invariant_violation(
                    "a full stack must collapse its bottom layer",
                )
                .with_context("level", level));
            }
            self.layers.rotate()?;
            if !self.sampler.halve_rate() {
                return Err(Error::invariant_violation("sampling rate cannot be halved further"));
            }
            debug!(
                n = self.n,
                sample_rate_exponent = self.sampler.rate_exponent(),
                "halved sampling rate"
            );
        } else if self.layers.layer_len(level) > 1 {
            self.layers.mark_collapsible(level);
        }
        trace!(level, num_collapses = self.num_collapses, "collapsed layer");

        self.pool
            .acquire()
            .ok_or_else(|| Error::invariant_violation("no buffer left after collapse"))
    }
}

impl<T: QuantileItem, R: RandomSource> QuantileSketch<T> for SamplingSketch<T, R> {
    fn feed(&mut self, item: T) {
        SamplingSketch::feed(self, item)
    }

    fn finalize(&mut self) {
        SamplingSketch::finalize(self)
    }

    fn query_for_value(&self, rank: f64) -> Result<T, Error> {
        SamplingSketch::query_for_value(self, rank)
    }

    fn n(&self) -> u64 {
        self.n
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn is_finalized(&self) -> bool {
        SamplingSketch::is_finalized(self)
    }

    fn num_retained(&self) -> usize {
        SamplingSketch::num_retained(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(sketch: &mut SamplingSketch<i64>, n: i64) {
        for i in 0..n {
            sketch.feed((i * 7919) % n);
        }
    }

    #[test]
    fn test_no_sampling_before_first_collapse() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.01, 3).unwrap();
        feed_all(&mut sketch, 1000);
        assert_eq!(sketch.num_collapses(), 0);
        assert_eq!(sketch.sample_rate_exponent(), 0);
        assert_eq!(sketch.num_retained(), 1000);
        assert_eq!(sketch.layers.layer_len(0), 3);
    }

    #[test]
    fn test_collapse_halves_rate_once_stack_is_full() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.3, 11).unwrap();
        let limit = sketch.layer_count_limit();
        feed_all(&mut sketch, 50_000);
        assert!(sketch.num_collapses() > 0);
        assert!(sketch.sample_rate_exponent() > 0);
        assert!(sketch.live_buffers() <= limit + 1);
        assert!(sketch.num_retained() <= (limit + 1) * sketch.buffer_size_limit());
    }

    #[test]
    fn test_weights_sum_close_to_n() {
        let n = 20_000i64;
        let mut sketch = SamplingSketch::<i64>::with_seed(0.05, 5).unwrap();
        feed_all(&mut sketch, n);
        sketch.finalize();

        // every block of 2^k items contributes one sample of weight 2^k, so
        // the total weight overshoots n by less than one block per layer
        let total = sketch.summary_weight_sum().unwrap();
        let slack = (sketch.buffer_size_limit() as u64) << (sketch.sample_rate_exponent() + 1);
        assert!(total.abs_diff(n as u64) <= slack, "total = {total}");
    }

    #[test]
    fn test_collapse_keeps_every_buffer_sorted() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.2, 1).unwrap();
        feed_all(&mut sketch, 10_000);
        for (_, buffer) in sketch.layers.iter() {
            assert!(buffer.as_slice().windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(buffer.len(), sketch.buffer_size_limit());
        }
    }

    #[test]
    fn test_layer_weights_fit_at_minimum_rate() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.001, 1).unwrap();
        let top_shift = sketch.layer_count_limit() - 1;
        assert!(top_shift >= 10);
        while sketch.sampler.halve_rate() {}
        assert!(sketch.sampler.weight().checked_mul(1u64 << top_shift).is_some());
    }

    #[test]
    fn test_extremes_are_exact_after_sampling() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.2, 3).unwrap();
        feed_all(&mut sketch, 20_000);
        sketch.finalize();
        assert!(sketch.sample_rate_exponent() > 0);
        assert_eq!(sketch.query_for_value(0.0).unwrap(), 0);
        assert_eq!(sketch.query_for_value(1.0).unwrap(), 19_999);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_poisoned_sketch_ignores_feeds_and_refuses_queries() {
        let mut sketch = SamplingSketch::<i64>::with_seed(0.1, 1).unwrap();
        feed_all(&mut sketch, 100);
        sketch.poisoned =
            Some(Error::invariant_violation("no collapsible layer").report_violation("sampling"));
        sketch.feed(100);
        assert_eq!(sketch.n(), 100);

        sketch.finalize();
        let err = sketch.query_for_value(0.5).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CapacityInvariantViolation);
        assert_eq!(err.message(), "no collapsible layer");
    }
}
