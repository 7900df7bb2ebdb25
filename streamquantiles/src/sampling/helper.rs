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
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;

use super::DELTA;
use super::MIN_LAYER_COUNT;
use super::pool::Buffer;
use crate::common::QuantileItem;
use crate::common::QueryIndex;
use crate::common::is_less;
use crate::error::Error;

/// Buffer and layer limits derived from epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Limits {
    pub buffer_size: usize,
    pub layer_count: usize,
}

/// Computes the buffer size and layer count for the given error bound.
///
/// With `eps' = eps / sqrt(2)` and `s = sqrt(log2(1 / DELTA)) / eps'`, the
/// buffer holds `ceil(s)` items and the stack has `ceil(log2(5 * s / 12))`
/// layers, at least [`MIN_LAYER_COUNT`].
pub(super) fn compute_limits(epsilon: f64) -> Result<Limits, Error> {
    let scaled_epsilon = epsilon / SQRT_2;
    let scale = (1.0 / DELTA).log2().sqrt() / scaled_epsilon;

    let buffer_size = scale.ceil();
    if !(buffer_size.is_finite() && buffer_size >= 1.0) {
        return Err(Error::invalid_parameter("buffer size limit must be positive")
            .with_context("epsilon", epsilon)
            .with_context("buffer_size", buffer_size));
    }
    let layer_count = (scale * 5.0 / 12.0).log2().ceil();
    if !(layer_count.is_finite() && layer_count >= 1.0) {
        return Err(Error::invalid_parameter("layer count limit must be positive")
            .with_context("epsilon", epsilon)
            .with_context("layer_count", layer_count));
    }

    let limits = Limits {
        buffer_size: buffer_size as usize,
        layer_count: (layer_count as usize).max(MIN_LAYER_COUNT),
    };
    if limits
        .buffer_size
        .checked_mul(limits.layer_count + 2)
        .is_none()
    {
        return Err(Error::invalid_parameter("buffer pool size overflows")
            .with_context("epsilon", epsilon));
    }
    Ok(limits)
}

/// Merges two sorted buffers into `out`, keeping every other item of the
/// merged order.
///
/// `keep` is the coin toss deciding the parity: the first merged item is kept
/// iff `keep` is false. On ties the item of `second` goes first. With equal
/// input lengths exactly half of the items survive.
pub(super) fn merge_alternating<T: QuantileItem>(
    first: &[T],
    second: &[T],
    mut keep: bool,
    out: &mut Buffer<T>,
) {
    let mut i = 0usize;
    let mut j = 0usize;
    while i < first.len() || j < second.len() {
        let take_first = j == second.len() || (i < first.len() && is_less(&first[i], &second[j]));
        let item = if take_first {
            i += 1;
            &first[i - 1]
        } else {
            j += 1;
            &second[j - 1]
        };
        keep = !keep;
        if keep {
            out.push(item.clone());
        }
    }
}

struct Head<'a, T> {
    item: &'a T,
    stream: usize,
    pos: usize,
}

impl<T: QuantileItem> PartialEq for Head<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: QuantileItem> Eq for Head<'_, T> {}

impl<T: QuantileItem> PartialOrd for Head<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: QuantileItem> Ord for Head<'_, T> {
    // reversed so that the max-heap yields the smallest item
    fn cmp(&self, other: &Self) -> Ordering {
        T::cmp(other.item, self.item).then(other.stream.cmp(&self.stream))
    }
}

/// K-way merges sorted weighted streams into `index`.
///
/// Each item is recorded with the total weight of the items merged before
/// it. Returns the total weight of all streams.
pub(super) fn merge_weighted<T: QuantileItem>(
    streams: &[(&[T], u64)],
    index: &mut QueryIndex<T>,
) -> u64 {
    let mut heap = BinaryHeap::with_capacity(streams.len());
    for (stream, (items, _)) in streams.iter().enumerate() {
        if let Some(item) = items.first() {
            heap.push(Head {
                item,
                stream,
                pos: 0,
            });
        }
    }

    let mut rank = 0u64;
    while let Some(head) = heap.pop() {
        let (items, weight) = streams[head.stream];
        index.push(head.item.clone(), rank);
        rank += weight;
        if let Some(item) = items.get(head.pos + 1) {
            heap.push(Head {
                item,
                stream: head.stream,
                pos: head.pos + 1,
            });
        }
    }
    rank
}
