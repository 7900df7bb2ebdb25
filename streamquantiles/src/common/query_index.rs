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

/// Sorted, rank-annotated items produced once by `finalize`.
///
/// Each entry carries a non-decreasing rank key. For the deterministic sketch
/// the key is `cumulative_g + delta` (the rank upper bound of the tuple); for
/// the sampling sketch it is the weighted rank of the item in the merged
/// sample.
#[derive(Debug, Clone)]
pub(crate) struct QueryIndex<T> {
    entries: Vec<IndexEntry<T>>,
    total_weight: u64,
}

#[derive(Debug, Clone)]
struct IndexEntry<T> {
    item: T,
    rank: u64,
}

impl<T: QuantileItem> QueryIndex<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            total_weight: 0,
        }
    }

    pub fn push(&mut self, item: T, rank: u64) {
        self.entries.push(IndexEntry { item, rank });
    }

    pub fn set_total_weight(&mut self, total_weight: u64) {
        self.total_weight = total_weight;
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn item(&self, idx: usize) -> &T {
        &self.entries[idx].item
    }

    /// Returns the position of the last entry whose rank key is at most
    /// `target`, or `None` if even the first entry lies above it.
    pub fn floor_position(&self, target: u64) -> Option<usize> {
        upper_bound_by_rank(&self.entries, target).checked_sub(1)
    }
}

/// Validates a normalized query rank.
pub(crate) fn check_rank(rank: f64) -> Result<(), Error> {
    if (0.0..=1.0).contains(&rank) {
        Ok(())
    } else {
        Err(Error::invalid_parameter("rank must be in [0.0, 1.0]").with_context("rank", rank))
    }
}

/// Validates the error bound of a sketch.
pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), Error> {
    if epsilon > 0.0 && epsilon < 1.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter("epsilon must be in (0, 1)").with_context("epsilon", epsilon))
    }
}

fn upper_bound_by_rank<T>(entries: &[IndexEntry<T>], rank: u64) -> usize {
    let mut left = 0usize;
    let mut right = entries.len();
    while left < right {
        let mid = left + (right - left) / 2;
        if entries[mid].rank > rank {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn index() -> QueryIndex<i64> {
        let mut index = QueryIndex::with_capacity(4);
        index.push(10, 0);
        index.push(20, 2);
        index.push(30, 2);
        index.push(40, 5);
        index.set_total_weight(6);
        index
    }

    #[test]
    fn test_floor_position() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.total_weight(), 6);
        assert_eq!(index.floor_position(0), Some(0));
        assert_eq!(index.floor_position(1), Some(0));
        // equal keys resolve to the last of the run
        assert_eq!(index.floor_position(2), Some(2));
        assert_eq!(index.floor_position(4), Some(2));
        assert_eq!(index.floor_position(100), Some(3));
        assert_eq!(*index.item(3), 40);
    }

    #[test]
    fn test_floor_position_below_first() {
        let mut index = QueryIndex::with_capacity(1);
        index.push(1i64, 3);
        assert_eq!(index.floor_position(2), None);
        assert_eq!(index.floor_position(3), Some(0));
    }

    #[test]
    fn test_check_rank() {
        assert!(check_rank(0.0).is_ok());
        assert!(check_rank(1.0).is_ok());
        let err = check_rank(1.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(check_rank(f64::NAN).is_err());
        assert!(check_rank(-0.1).is_err());
    }

    #[test]
    fn test_check_epsilon() {
        assert!(check_epsilon(0.01).is_ok());
        for epsilon in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            let err = check_epsilon(epsilon).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }
}
