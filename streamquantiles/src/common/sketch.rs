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

use super::QuantileItem;
use crate::error::Error;

/// The contract shared by every quantile sketch in this crate.
///
/// A sketch is owned by a single caller for its whole life: it is built, fed
/// any number of items, finalized exactly once, and then queried any number
/// of times.
///
/// # Examples
///
/// ```
/// # use streamquantiles::QuantileSketch;
/// # use streamquantiles::gk::GkSketch;
/// # use streamquantiles::sampling::SamplingSketch;
/// fn median<S: QuantileSketch<i64>>(mut sketch: S, items: &[i64]) -> i64 {
///     for item in items {
///         sketch.feed(*item);
///     }
///     sketch.finalize();
///     sketch.query_for_value(0.5).unwrap()
/// }
///
/// let items: Vec<i64> = (0..1000).collect();
/// assert!((median(GkSketch::new(0.01).unwrap(), &items) - 500).abs() <= 10);
/// assert!((median(SamplingSketch::new(0.01).unwrap(), &items) - 500).abs() <= 10);
/// ```
pub trait QuantileSketch<T: QuantileItem> {
    /// Ingests one stream item.
    ///
    /// # Panics
    ///
    /// Panics if the sketch has already been finalized.
    fn feed(&mut self, item: T);

    /// Builds the query index. Must be called exactly once, after the last
    /// `feed`.
    ///
    /// # Panics
    ///
    /// Panics if the sketch has already been finalized.
    fn finalize(&mut self);

    /// Returns an item whose rank approximates `rank * n`.
    fn query_for_value(&self, rank: f64) -> Result<T, Error>;

    /// Returns the number of items ingested.
    fn n(&self) -> u64;

    /// Returns the configured error bound.
    fn epsilon(&self) -> f64;

    /// Returns true once `finalize` has been called.
    fn is_finalized(&self) -> bool;

    /// Returns the number of items currently retained by the summary.
    fn num_retained(&self) -> usize;

    /// Returns true if the sketch has not ingested any item.
    fn is_empty(&self) -> bool {
        self.n() == 0
    }

    /// Answers a batch of rank queries, failing on the first invalid one.
    fn query_many(&self, ranks: &[f64]) -> Result<Vec<T>, Error> {
        ranks.iter().map(|rank| self.query_for_value(*rank)).collect()
    }
}
