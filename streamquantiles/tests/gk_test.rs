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

use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::le;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use streamquantiles::error::ErrorKind;
use streamquantiles::gk::GkSketch;

fn shuffled(n: u64, seed: u64) -> Vec<u64> {
    let mut values: Vec<u64> = (0..n).collect();
    values.shuffle(&mut StdRng::seed_from_u64(seed));
    values
}

fn finalized(epsilon: f64, values: &[u64]) -> GkSketch<u64> {
    let mut sketch = GkSketch::new(epsilon).unwrap();
    for value in values {
        sketch.feed(*value);
    }
    sketch.finalize();
    sketch
}

// Values are a permutation of 0..n, so every value is its own rank.
fn assert_rank_error_within(sketch: &GkSketch<u64>, n: u64, epsilon: f64) {
    let max_error = (epsilon * n as f64).floor() as u64;
    for percent in 0..=100u64 {
        let value = sketch.query_for_value(percent as f64 / 100.0).unwrap();
        let expected = percent * n / 100;
        assert_that!(value.abs_diff(expected), le(max_error));
    }
}

#[test]
fn test_invalid_epsilon() {
    for epsilon in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
        let err = GkSketch::<u64>::new(epsilon).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_that!(err.message(), contains_substring("epsilon"));
    }
}

#[test]
fn test_nan_sentinel_rejected() {
    let err = GkSketch::<f64>::with_sentinel(0.01, f64::NAN).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_query_before_finalize() {
    let mut sketch = GkSketch::<u64>::new(0.01).unwrap();
    sketch.feed(1);
    let err = sketch.query_for_value(0.5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFinalized);
}

#[test]
fn test_empty_stream() {
    let mut sketch = GkSketch::<u64>::new(0.01).unwrap();
    assert!(sketch.is_empty());
    sketch.finalize();
    assert!(sketch.is_finalized());
    let err = sketch.query_for_value(0.5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyStream);
}

#[test]
fn test_invalid_rank() {
    let sketch = finalized(0.01, &[1, 2, 3]);
    for rank in [-0.1, 1.1, f64::NAN] {
        let err = sketch.query_for_value(rank).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_that!(err.message(), contains_substring("rank"));
    }
}

#[test]
fn test_one_value() {
    let sketch = finalized(0.01, &[42]);
    assert_eq!(sketch.n(), 1);
    assert_eq!(sketch.min_item(), Some(&42));
    assert_eq!(sketch.max_item(), Some(&42));
    for rank in [0.0, 0.25, 0.5, 1.0] {
        assert_eq!(sketch.query_for_value(rank).unwrap(), 42);
    }
}

#[test]
fn test_small_stream_is_exact() {
    let values = shuffled(50, 3);
    let sketch = finalized(0.01, &values);
    assert_eq!(sketch.num_retained(), 50);
    for i in 0..50u64 {
        let rank = i as f64 / 50.0;
        assert_eq!(sketch.query_for_value(rank).unwrap(), i);
    }
    assert_eq!(sketch.query_for_value(1.0).unwrap(), 49);
}

#[test]
fn test_shuffled_thousand() {
    let values = shuffled(1000, 1);
    let sketch = finalized(0.01, &values);
    assert_eq!(sketch.n(), 1000);
    assert_rank_error_within(&sketch, 1000, 0.01);
}

#[test]
fn test_rank_error_bound() {
    for (epsilon, n) in [(0.1, 1000), (0.05, 10_000), (0.01, 10_000), (0.001, 20_000)] {
        let values = shuffled(n, n ^ 0x5eed);
        let sketch = finalized(epsilon, &values);
        assert_rank_error_within(&sketch, n, epsilon);
    }
}

#[test]
fn test_sorted_and_reversed_input() {
    let n = 10_000u64;
    let ascending: Vec<u64> = (0..n).collect();
    let descending: Vec<u64> = (0..n).rev().collect();
    for values in [ascending, descending] {
        let sketch = finalized(0.01, &values);
        assert_rank_error_within(&sketch, n, 0.01);
    }
}

#[test]
fn test_retains_fraction_of_stream() {
    let n = 100_000u64;
    let sketch = finalized(0.01, &shuffled(n, 11));
    assert_that!(sketch.num_retained(), le(n as usize / 10));
}

#[test]
fn test_monotonic_answers() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut values: Vec<u64> = (0..20_000u64).map(|i| (i * i) % 977).collect();
    values.shuffle(&mut rng);
    let sketch = finalized(0.02, &values);
    let mut previous = 0;
    for step in 0..=200 {
        let value = sketch.query_for_value(step as f64 / 200.0).unwrap();
        assert_that!(previous, le(value));
        previous = value;
    }
}

#[test]
fn test_query_many_matches_single_queries() {
    use streamquantiles::QuantileSketch;

    let sketch = finalized(0.01, &shuffled(5000, 5));
    let ranks = [0.0, 0.1, 0.5, 0.9, 1.0];
    let many = sketch.query_many(&ranks).unwrap();
    for (rank, value) in ranks.iter().zip(many) {
        assert_that!(sketch.query_for_value(*rank).unwrap(), eq(value));
    }
}

#[test]
fn test_default_sentinel_dropped() {
    let mut sketch = GkSketch::<u64>::new(0.01).unwrap();
    sketch.feed(u64::MAX);
    sketch.feed(u64::MAX);
    assert!(sketch.is_empty());
    assert_eq!(sketch.num_discarded(), 2);
    sketch.feed(5);
    sketch.finalize();
    assert_eq!(sketch.n(), 1);
    assert_eq!(sketch.query_for_value(1.0).unwrap(), 5);
}

#[test]
fn test_custom_sentinel_never_returned() {
    let mut sketch = GkSketch::with_sentinel(0.01, 1000u64).unwrap();
    for value in shuffled(2000, 9) {
        sketch.feed(value);
    }
    sketch.finalize();
    assert_eq!(sketch.n(), 1000);
    assert_eq!(sketch.num_discarded(), 1000);
    assert_eq!(sketch.max_item(), Some(&999));
    for step in 0..=100 {
        let value = sketch.query_for_value(step as f64 / 100.0).unwrap();
        assert_that!(value, le(999));
    }
    assert_rank_error_within(&sketch, 1000, 0.01);
}

#[test]
fn test_nan_dropped() {
    let mut sketch = GkSketch::<f64>::new(0.01).unwrap();
    for i in 0..1000 {
        sketch.feed(i as f64);
        if i % 10 == 0 {
            sketch.feed(f64::NAN);
        }
    }
    sketch.feed(f64::INFINITY);
    sketch.finalize();
    assert_eq!(sketch.n(), 1000);
    assert_eq!(sketch.num_discarded(), 101);
    let median = sketch.query_for_value(0.5).unwrap();
    assert!(!median.is_nan());
    assert_that!((median - 500.0).abs(), le(10.0));
    assert_eq!(sketch.query_for_value(1.0).unwrap(), 999.0);
}

#[test]
fn test_negative_integers() {
    let mut sketch = GkSketch::<i64>::new(0.01).unwrap();
    for value in shuffled(2000, 13) {
        sketch.feed(value as i64 - 1000);
    }
    sketch.finalize();
    let median = sketch.query_for_value(0.5).unwrap();
    assert_that!(median.abs(), le(20));
    assert_eq!(sketch.min_item(), Some(&-1000));
}

#[test]
#[should_panic(expected = "cannot feed a sketch after finalize()")]
fn test_feed_after_finalize_panics() {
    let mut sketch = finalized(0.01, &[1, 2, 3]);
    sketch.feed(4);
}

#[test]
#[should_panic(expected = "finalize() must be called only once")]
fn test_finalize_twice_panics() {
    let mut sketch = finalized(0.01, &[1, 2, 3]);
    sketch.finalize();
}
