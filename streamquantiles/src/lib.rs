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

//! One-pass epsilon-approximate quantile sketches.
//!
//! Both sketches answer "which item sits at normalized rank `phi` of the
//! stream" over a stream too large to store, using memory bounded in terms of
//! the error bound `epsilon`:
//!
//! * [`gk::GkSketch`] is deterministic: every answer is within `epsilon * n`
//!   ranks of the request.
//! * [`sampling::SamplingSketch`] is randomized: the same bound holds with
//!   probability at least `1 - DELTA`, using less space asymptotically.
//!
//! Both follow the [`QuantileSketch`] lifecycle: `feed` every item, call
//! `finalize` once, then issue any number of `query_for_value` calls.
//!
//! ```rust
//! use streamquantiles::QuantileSketch;
//! use streamquantiles::gk::GkSketch;
//!
//! let mut sketch = GkSketch::<u32>::new(0.05).unwrap();
//! for i in (0..200).rev() {
//!     sketch.feed(i);
//! }
//! sketch.finalize();
//! let quartiles = sketch.query_many(&[0.25, 0.5, 0.75]).unwrap();
//! assert!(quartiles.windows(2).all(|w| w[0] <= w[1]));
//! ```

pub mod common;
pub mod error;
pub mod gk;
pub mod sampling;

pub use self::common::QuantileItem;
pub use self::common::QuantileSketch;

/// Default error bound used by [`gk::GkSketch::default`].
pub const DEFAULT_EPSILON: f64 = 0.01;
