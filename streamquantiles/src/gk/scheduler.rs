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

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::tuples::TupleKey;

/// A candidate merge of a tuple into its successor.
///
/// The merge may happen only once the global threshold `floor(2 * eps * n)`
/// has reached `threshold`. The recorded threshold never overstates how soon
/// the pair becomes mergeable; the true value is recomputed when the entry
/// is popped.
#[derive(Debug, Clone)]
pub(super) struct ThresholdEntry<T> {
    pub threshold: u64,
    pub key: TupleKey<T>,
}

impl<T> PartialEq for ThresholdEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for ThresholdEntry<T> {}

impl<T> PartialOrd for ThresholdEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ThresholdEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.threshold
            .cmp(&other.threshold)
            .then(self.key.seq().cmp(&other.key.seq()))
    }
}

/// Min-heap of merge candidates keyed by threshold.
///
/// Entries are never invalidated eagerly: when the tuples around a candidate
/// change, its entry stays queued with a stale (too low) threshold and the
/// caller re-derives the real one at pop time, pushing it back if needed.
#[derive(Debug, Clone)]
pub(super) struct CompressionScheduler<T> {
    heap: BinaryHeap<Reverse<ThresholdEntry<T>>>,
}

impl<T> Default for CompressionScheduler<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }
}

impl<T> CompressionScheduler<T> {
    pub fn schedule(&mut self, threshold: u64, key: TupleKey<T>) {
        self.heap.push(Reverse(ThresholdEntry { threshold, key }));
    }

    /// Pops the minimum entry if the global threshold has reached it.
    pub fn pop_eligible(&mut self, global_threshold: u64) -> Option<ThresholdEntry<T>> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.threshold <= global_threshold => {
                self.heap.pop().map(|Reverse(entry)| entry)
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tuples::Tuple;
    use super::super::tuples::TupleSet;
    use super::*;

    #[test]
    fn test_pops_in_threshold_order() {
        let mut set = TupleSet::new(i64::MAX);
        let mut scheduler = CompressionScheduler::default();
        for (item, threshold) in [(1i64, 7u64), (2, 3), (3, 5)] {
            let key = set.insert(item, Tuple { g: 1, delta: 0 });
            scheduler.schedule(threshold, key);
        }
        assert_eq!(scheduler.len(), 3);

        assert!(scheduler.pop_eligible(2).is_none());
        let entry = scheduler.pop_eligible(6).unwrap();
        assert_eq!((entry.threshold, *entry.key.item()), (3, 2));
        let entry = scheduler.pop_eligible(6).unwrap();
        assert_eq!((entry.threshold, *entry.key.item()), (5, 3));
        assert!(scheduler.pop_eligible(6).is_none());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_requeue_with_corrected_threshold() {
        let mut set = TupleSet::new(i64::MAX);
        let mut scheduler = CompressionScheduler::default();
        let key = set.insert(10, Tuple { g: 1, delta: 0 });
        scheduler.schedule(2, key);

        let stale = scheduler.pop_eligible(4).unwrap();
        scheduler.schedule(9, stale.key);
        assert!(scheduler.pop_eligible(4).is_none());
        assert_eq!(scheduler.pop_eligible(9).unwrap().threshold, 9);
    }
}
