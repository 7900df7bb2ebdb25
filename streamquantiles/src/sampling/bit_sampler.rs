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

use crate::common::RandomSource;

/// Largest exponent a layer weight may reach and still fit in a `u64`.
pub(super) const MAX_WEIGHT_EXPONENT: u32 = u64::BITS - 1;

/// Leftover bits of one 64-bit draw, consumed from the low end.
#[derive(Debug, Clone, Copy, Default)]
struct BitCursor {
    bits: u64,
    remaining: u32,
}

impl BitCursor {
    /// Takes `width` bits, topping up from `rng` only when the leftover bits
    /// run short. Leftover bits are never thrown away.
    fn take<R: RandomSource>(&mut self, width: u32, rng: &mut R) -> u64 {
        debug_assert!((1..u64::BITS).contains(&width), "width out of range: {width}");
        if width <= self.remaining {
            let out = self.bits & low_mask(width);
            self.bits >>= width;
            self.remaining -= width;
            return out;
        }

        let have = self.remaining;
        let need = width - have;
        let fresh = rng.next_u64();
        let out = self.bits | ((fresh & low_mask(need)) << have);
        self.bits = fresh >> need;
        self.remaining = u64::BITS - need;
        out
    }
}

fn low_mask(width: u32) -> u64 {
    (1u64 << width) - 1
}

/// Sampling decisions and coin tosses drawn in batches from a random source.
///
/// Items are sampled at rate `2^-k`: the stream is cut into blocks of `2^k`
/// items and exactly one uniformly chosen item per block is kept. The offset
/// of that item is drawn with `k` bits when a block starts. Sampling and coin
/// tosses keep separate leftover bits, so neither consumer's batching affects
/// the other's.
#[derive(Debug, Clone)]
pub(super) struct BitSampler {
    rate_exponent: u32,
    max_rate_exponent: u32,
    // items left in the current block after the current one
    block_remaining: u64,
    // items left before the sampled one of the current block
    next_sampled: Option<u64>,
    sample_bits: BitCursor,
    coin_bits: BitCursor,
}

impl BitSampler {
    /// Creates a sampler at full rate for a stack of `layer_count` layers.
    ///
    /// The rate stops halving once the top layer weight `2^(k + layer_count - 1)`
    /// would no longer fit in a `u64`.
    pub fn new(layer_count: usize) -> Self {
        let layer_count = u32::try_from(layer_count).unwrap_or(u32::MAX);
        Self {
            rate_exponent: 0,
            max_rate_exponent: MAX_WEIGHT_EXPONENT.saturating_sub(layer_count),
            block_remaining: 0,
            next_sampled: None,
            sample_bits: BitCursor::default(),
            coin_bits: BitCursor::default(),
        }
    }

    /// Returns whether the next stream item is kept.
    pub fn is_sampled<R: RandomSource>(&mut self, rng: &mut R) -> bool {
        if self.rate_exponent == 0 {
            return true;
        }

        if self.block_remaining == 0 {
            self.next_sampled = Some(self.sample_bits.take(self.rate_exponent, rng));
            self.block_remaining = low_mask(self.rate_exponent);
        } else {
            self.block_remaining -= 1;
        }

        match self.next_sampled {
            Some(0) => {
                self.next_sampled = None;
                true
            }
            Some(left) => {
                self.next_sampled = Some(left - 1);
                false
            }
            None => false,
        }
    }

    /// Returns a fair coin toss.
    pub fn toss_coin<R: RandomSource>(&mut self, rng: &mut R) -> bool {
        self.coin_bits.take(1, rng) == 1
    }

    /// Halves the sampling rate. The block in progress keeps its old length.
    ///
    /// Returns false if the rate is already at its minimum.
    pub fn halve_rate(&mut self) -> bool {
        if self.rate_exponent >= self.max_rate_exponent {
            return false;
        }
        self.rate_exponent += 1;
        true
    }

    /// Returns `k` for the current sampling rate `2^-k`.
    pub fn rate_exponent(&self) -> u32 {
        self.rate_exponent
    }

    /// Returns the weight of one freshly sampled item, `2^k`.
    pub fn weight(&self) -> u64 {
        1u64 << self.rate_exponent
    }
}
