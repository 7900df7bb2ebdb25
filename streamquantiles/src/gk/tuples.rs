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
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::common::QuantileItem;

/// Stable handle of a tuple: its item plus the insertion sequence number.
///
/// Equal items are ordered by insertion, so a handle stays valid however the
/// set changes around it, until the tuple itself is removed.
#[derive(Debug, Clone)]
pub(super) struct TupleKey<T> {
    item: T,
    seq: u64,
}

impl<T> TupleKey<T> {
    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl<T: QuantileItem> PartialEq for TupleKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: QuantileItem> Eq for TupleKey<T> {}

impl<T: QuantileItem> PartialOrd for TupleKey<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: QuantileItem> Ord for TupleKey<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        T::cmp(&self.item, &other.item).then(self.seq.cmp(&other.seq))
    }
}

/// Rank bookkeeping of one tuple.
///
/// `g` is the number of observations captured since the previous tuple and
/// `delta` bounds the extra rank uncertainty of this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Tuple {
    pub g: u64,
    pub delta: u64,
}

impl Tuple {
    pub fn span(&self) -> u64 {
        self.g + self.delta
    }
}

/// Ordered tuples of the deterministic sketch, anchored by a sentinel.
#[derive(Debug, Clone)]
pub(super) struct TupleSet<T: QuantileItem> {
    tuples: BTreeMap<TupleKey<T>, Tuple>,
    next_seq: u64,
}

// Sentinel sequence number; real tuples start at 1 and the probe uses MAX.
const SENTINEL_SEQ: u64 = 0;
const PROBE_SEQ: u64 = u64::MAX;

impl<T: QuantileItem> TupleSet<T> {
    pub fn new(sentinel: T) -> Self {
        let mut tuples = BTreeMap::new();
        tuples.insert(
            TupleKey {
                item: sentinel,
                seq: SENTINEL_SEQ,
            },
            Tuple { g: 1, delta: 0 },
        );
        Self {
            tuples,
            next_seq: SENTINEL_SEQ + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Returns the first tuple whose item is strictly greater than `item`.
    pub fn upper_bound_mut(&mut self, item: &T) -> Option<&mut Tuple> {
        let probe = TupleKey {
            item: item.clone(),
            seq: PROBE_SEQ,
        };
        self.tuples
            .range_mut((Bound::Excluded(probe), Bound::Unbounded))
            .next()
            .map(|(_, tuple)| tuple)
    }

    /// Inserts a tuple after every tuple with an equal item and returns its
    /// handle.
    pub fn insert(&mut self, item: T, tuple: Tuple) -> TupleKey<T> {
        let key = TupleKey {
            item,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tuples.insert(key.clone(), tuple);
        key
    }

    pub fn get(&self, key: &TupleKey<T>) -> Option<&Tuple> {
        self.tuples.get(key)
    }

    /// Returns the tuple immediately following `key`.
    pub fn successor_mut(&mut self, key: &TupleKey<T>) -> Option<&mut Tuple> {
        self.tuples
            .range_mut((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(_, tuple)| tuple)
    }

    pub fn remove(&mut self, key: &TupleKey<T>) -> Option<Tuple> {
        self.tuples.remove(key)
    }

    /// Iterates tuples in item order, sentinel last.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &Tuple)> {
        self.tuples.iter().map(|(key, tuple)| (key.item(), tuple))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_anchors_every_lookup() {
        let mut set = TupleSet::new(i64::MAX);
        assert_eq!(set.len(), 1);
        let tuple = set.upper_bound_mut(&42).unwrap();
        assert_eq!(*tuple, Tuple { g: 1, delta: 0 });
        assert!(set.upper_bound_mut(&i64::MAX).is_none());
    }

    #[test]
    fn test_equal_items_keep_insertion_order() {
        let mut set = TupleSet::new(i64::MAX);
        let first = set.insert(5, Tuple { g: 1, delta: 0 });
        let second = set.insert(5, Tuple { g: 2, delta: 0 });
        assert!(first < second);
        assert_eq!(set.successor_mut(&first).unwrap().g, 2);

        // the upper bound of 5 skips both tuples holding 5
        set.insert(9, Tuple { g: 3, delta: 0 });
        assert_eq!(set.upper_bound_mut(&5).unwrap().g, 3);
        assert_eq!(set.upper_bound_mut(&4).unwrap().g, 1);
    }

    #[test]
    fn test_remove_keeps_other_handles_valid() {
        let mut set = TupleSet::new(u32::MAX);
        let a = set.insert(1, Tuple { g: 1, delta: 0 });
        let b = set.insert(2, Tuple { g: 1, delta: 0 });
        let c = set.insert(3, Tuple { g: 1, delta: 0 });
        assert!(set.remove(&b).is_some());
        assert!(set.get(&b).is_none());
        assert!(set.get(&a).is_some());
        set.successor_mut(&a).unwrap().g += 1;
        assert_eq!(set.get(&c).unwrap().g, 2);
        let items: Vec<u32> = set.iter().map(|(item, _)| *item).collect();
        assert_eq!(items, vec![1, 3, u32::MAX]);
        assert_eq!(c.seq(), 3);
        assert_eq!(*c.item(), 3);
    }
}
