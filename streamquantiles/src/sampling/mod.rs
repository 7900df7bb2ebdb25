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

//! Randomized sampling sketch for epsilon-approximate quantiles.
//!
//! Sampled items are collected into fixed-size buffers. A full buffer is
//! sorted and pushed onto the bottom of a stack of weighted layers; whenever
//! the fixed pool of buffers runs dry, the two oldest buffers of the lowest
//! collapsible layer are merged into one buffer of twice the weight, keeping
//! every other item of their merged order from a random starting parity.
//! Once the top layer is occupied, a collapse also halves the sampling rate
//! and the layer ring rotates, so memory stays bounded by
//! `(layer_count_limit + 2) * buffer_size_limit` items for any stream length.
//!
//! Buffer size and layer count follow from `epsilon` and the fixed failure
//! probability [`DELTA`]: an answer is within `epsilon * n` ranks of the
//! request with probability at least `1 - DELTA`.
//!
//! For background, see Wang, Luo, Yi and Cormode, "Quantiles over Data
//! Streams: An Experimental Study", SIGMOD 2013.
//!
//! # Usage
//!
//! ```rust
//! # use streamquantiles::sampling::SamplingSketch;
//! let mut sketch = SamplingSketch::<f64>::with_seed(0.01, 42).unwrap();
//! for i in 0..1000 {
//!     sketch.feed(i as f64);
//! }
//! sketch.finalize();
//! let median = sketch.query_for_value(0.5).unwrap();
//! assert!((490.0..=510.0).contains(&median));
//! ```

mod bit_sampler;
mod helper;
mod layers;
mod pool;
mod sketch;

pub use self::sketch::SamplingSketch;

/// Failure probability the buffer and layer limits are derived for.
pub const DELTA: f64 = 0.1;

/// Minimum number of layers: a collapse always needs a layer above it.
pub const MIN_LAYER_COUNT: usize = 2;
