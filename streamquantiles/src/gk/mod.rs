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

//! Deterministic Greenwald-Khanna sketch for epsilon-approximate quantiles.
//!
//! The sketch keeps an ordered set of tuples `(v, g, delta)`. `g` counts the
//! observations captured by a tuple since its predecessor and `delta` bounds
//! how far the true rank of `v` may exceed the sum of the `g`s up to it. The
//! compression invariant `g + delta <= floor(2 * eps * n)` holds after every
//! update, which bounds the rank error of any answer by `eps * n` with no
//! randomness involved.
//!
//! An upper sentinel tuple anchors the set, so every item has a successor.
//! Merge candidates are kept in a lazily revalidated min-heap: an entry may
//! carry a stale threshold, and the real one is recomputed when it is popped.
//!
//! For background, see Greenwald and Khanna, "Space-efficient Online
//! Computation of Quantile Summaries", SIGMOD 2001.
//!
//! # Usage
//!
//! ```rust
//! # use streamquantiles::gk::GkSketch;
//! let mut sketch = GkSketch::<i64>::new(0.01).unwrap();
//! for i in 0..1000 {
//!     sketch.feed(i);
//! }
//! sketch.finalize();
//! let median = sketch.query_for_value(0.5).unwrap();
//! assert!((490..=510).contains(&median));
//! ```

mod scheduler;
mod sketch;
mod tuples;

pub use self::sketch::GkSketch;
