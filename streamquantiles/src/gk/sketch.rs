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

use super::scheduler::CompressionScheduler;
use super::tuples::Tuple;
use super::tuples::TupleSet;
use crate::DEFAULT_EPSILON;
use crate::common::MinMax;
use crate::common::QuantileItem;
use crate::common::QuantileSketch;
use crate::common::QueryIndex;
use crate::common::check_epsilon;
use crate::common::check_rank;
use crate::common::is_less;
use crate::error::Error;

/// Deterministic Greenwald-Khanna quantile sketch.
///
/// See the [gk module level documentation](crate::gk) for more.
#[derive(Debug, Clone)]
pub struct GkSketch<T: QuantileItem> {
    epsilon: f64,
    sentinel: T,
    n: u64,
    num_discarded: u64,
    tuples: TupleSet<T>,
    scheduler: CompressionScheduler<T>,
    bounds: MinMax<T>,
    summary: Option<Summary<T>>,
    poisoned: Option<Error>,
}

#[derive(Debug, Clone)]
struct Summary<T> {
    index: QueryIndex<T>,
    // Half of the widest rank interval, added to every query target.
    max_gd: u64,
}

impl<T: QuantileItem> Default for GkSketch<T> {
    fn default() -> Self {
        Self::make(DEFAULT_EPSILON, T::upper_sentinel())
    }
}

impl<T: QuantileItem> GkSketch<T> {
    /// Creates a new sketch with the type's default sentinel.
    ///
    /// Items comparing greater than or equal to [`QuantileItem::upper_sentinel`]
    /// are dropped on ingest.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `epsilon` is not in `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamquantiles::gk::GkSketch;
    /// let sketch = GkSketch::<u32>::new(0.01).unwrap();
    /// assert_eq!(sketch.epsilon(), 0.01);
    /// assert_eq!(*sketch.sentinel(), u32::MAX);
    /// assert!(GkSketch::<u32>::new(1.0).is_err());
    /// ```
    pub fn new(epsilon: f64) -> Result<Self, Error> {
        Self::with_sentinel(epsilon, T::upper_sentinel())
    }

    /// Creates a new sketch anchored at the given sentinel.
    ///
    /// The sentinel must lie strictly above every item of interest: items
    /// comparing greater than or equal to it are dropped on ingest.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `epsilon` is not in `(0, 1)` or the
    /// sentinel is NaN.
    pub fn with_sentinel(epsilon: f64, sentinel: T) -> Result<Self, Error> {
        check_epsilon(epsilon)?;
        if T::is_nan(&sentinel) {
            return Err(Error::invalid_parameter("sentinel must not be NaN"));
        }
        Ok(Self::make(epsilon, sentinel))
    }

    fn make(epsilon: f64, sentinel: T) -> Self {
        debug!(epsilon, "created deterministic quantile sketch");
        Self {
            epsilon,
            tuples: TupleSet::new(sentinel.clone()),
            sentinel,
            n: 0,
            num_discarded: 0,
            scheduler: CompressionScheduler::default(),
            bounds: MinMax::default(),
            summary: None,
            poisoned: None,
        }
    }

    /// Returns the configured error bound.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the sentinel anchoring the upper end of the summary.
    pub fn sentinel(&self) -> &T {
        &self.sentinel
    }

    /// Returns the number of items ingested, excluding dropped ones.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns the number of items dropped on ingest: NaN, or not below the
    /// sentinel.
    pub fn num_discarded(&self) -> u64 {
        self.num_discarded
    }

    /// Returns true if the sketch has not ingested any item.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true once [`GkSketch::finalize`] has been called.
    pub fn is_finalized(&self) -> bool {
        self.summary.is_some()
    }

    /// Returns the number of tuples, sentinel included.
    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }

    /// Returns the number of tuples representing ingested items.
    pub fn num_retained(&self) -> usize {
        self.tuples.len() - 1
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
    /// NaN items and items not strictly below the sentinel are dropped.
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
        if T::is_nan(&item) || !is_less(&item, &self.sentinel) {
            self.num_discarded += 1;
            return;
        }

        self.n += 1;
        self.bounds.update(&item);
        let threshold = self.threshold();

        let Some(successor) = self.tuples.upper_bound_mut(&item) else {
            self.poison(Error::invariant_violation(
                "no tuple above the item, the sentinel is missing",
            ));
            return;
        };
        let span = successor.span();
        if span < threshold {
            successor.g += 1;
            return;
        }

        let key = self.tuples.insert(
            item,
            Tuple {
                g: 1,
                delta: span - 1,
            },
        );
        self.scheduler.schedule(span + 1, key);
        if let Err(err) = self.compress(threshold) {
            self.poison(err);
        }
    }

    /// Builds the query index.
    ///
    /// # Panics
    ///
    /// Panics if the sketch has already been finalized.
    pub fn finalize(&mut self) {
        assert!(self.summary.is_none(), "finalize() must be called only once");

        let mut index = QueryIndex::with_capacity(self.tuples.len());
        let mut cumulative_g = 0u64;
        let mut max_span = 0u64;
        for (item, tuple) in self.tuples.iter() {
            max_span = max_span.max(tuple.span());
            cumulative_g += tuple.g;
            index.push(item.clone(), cumulative_g + tuple.delta);
        }
        index.set_total_weight(cumulative_g);

        debug!(
            n = self.n,
            num_tuples = self.tuples.len(),
            pending_merges = self.scheduler.len(),
            max_span,
            "finalized deterministic quantile sketch"
        );
        self.summary = Some(Summary {
            index,
            max_gd: max_span / 2,
        });
    }

    /// Returns an item whose rank is within `epsilon * n` of `rank * n`.
    ///
    /// # Errors
    ///
    /// * `NotFinalized` if [`GkSketch::finalize`] has not been called.
    /// * `EmptyStream` if no item was ingested.
    /// * `InvalidParameter` if `rank` is not in `[0.0, 1.0]`.
    /// * `CapacityInvariantViolation` if the sketch detected an internal
    ///   inconsistency while ingesting.
    pub fn query_for_value(&self, rank: f64) -> Result<T, Error> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        let summary = self.summary.as_ref().ok_or_else(Error::not_finalized)?;
        if self.is_empty() {
            return Err(Error::empty_stream());
        }
        check_rank(rank)?;

        // cumulative g counts are 1-based ranks
        let target = (rank * self.n as f64).round() as u64 + summary.max_gd + 1;
        let item = match summary.index.floor_position(target) {
            None => self.bounds.min(),
            // the last entry is the sentinel, which never answers a query
            Some(pos) if pos + 1 == summary.index.len() => self.bounds.max(),
            Some(pos) => Some(summary.index.item(pos)),
        };
        item.cloned()
            .ok_or_else(|| Error::invariant_violation("non-empty sketch has no min/max item"))
    }

    fn threshold(&self) -> u64 {
        (2.0 * self.epsilon * self.n as f64).floor() as u64
    }

    // Merges at most one eligible tuple into its successor.
    fn compress(&mut self, threshold: u64) -> Result<(), Error> {
        while let Some(entry) = self.scheduler.pop_eligible(threshold) {
            let Some(first) = self.tuples.get(&entry.key).copied() else {
                return Err(Error::invariant_violation(
                    "scheduled tuple is missing from the summary",
                ));
            };
            let Some(second) = self.tuples.successor_mut(&entry.key) else {
                return Err(Error::invariant_violation(
                    "scheduled tuple has no successor",
                ));
            };

            let merged_span = first.g + second.span();
            if merged_span <= threshold {
                second.g += first.g;
                self.tuples.remove(&entry.key);
                return Ok(());
            }
            self.scheduler.schedule(merged_span, entry.key);
        }
        Ok(())
    }

    fn poison(&mut self, err: Error) {
        self.poisoned = Some(err.report_violation("gk"));
    }
}

impl<T: QuantileItem> QuantileSketch<T> for GkSketch<T> {
    fn feed(&mut self, item: T) {
        GkSketch::feed(self, item)
    }

    fn finalize(&mut self) {
        GkSketch::finalize(self)
    }

    fn query_for_value(&self, rank: f64) -> Result<T, Error> {
        GkSketch::query_for_value(self, rank)
    }

    fn n(&self) -> u64 {
        self.n
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn is_finalized(&self) -> bool {
        GkSketch::is_finalized(self)
    }

    fn num_retained(&self) -> usize {
        GkSketch::num_retained(self)
    }
}
