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

/// Trait implemented by item types supported by the quantile sketches.
///
/// Items are compared with [`QuantileItem::cmp`], which must be a total
/// order over every value that passes [`QuantileItem::is_nan`].
pub trait QuantileItem: Clone {
    /// Compare two items.
    fn cmp(a: &Self, b: &Self) -> Ordering;

    /// Returns true if the item is NaN. NaN items are never ingested.
    fn is_nan(_value: &Self) -> bool {
        false
    }

    /// The default upper sentinel of the deterministic sketch.
    ///
    /// Items comparing greater than or equal to it cannot be represented by
    /// [`GkSketch`](crate::gk::GkSketch) and are dropped on ingest.
    fn upper_sentinel() -> Self;
}

macro_rules! impl_integer_item {
    ($($name:ty),*) => {
        $(
            impl QuantileItem for $name {
                #[inline(always)]
                fn cmp(a: &Self, b: &Self) -> Ordering {
                    Ord::cmp(a, b)
                }

                fn upper_sentinel() -> Self {
                    <$name>::MAX
                }
            }
        )*
    };
}

macro_rules! impl_float_item {
    ($($name:ty),*) => {
        $(
            impl QuantileItem for $name {
                #[inline(always)]
                fn cmp(a: &Self, b: &Self) -> Ordering {
                    a.partial_cmp(b).unwrap_or(Ordering::Greater)
                }

                fn is_nan(value: &Self) -> bool {
                    value.is_nan()
                }

                fn upper_sentinel() -> Self {
                    <$name>::INFINITY
                }
            }
        )*
    };
}

impl_integer_item!(i32, i64, u32, u64);
impl_float_item!(f32, f64);

/// Returns true if `a` sorts strictly before `b`.
#[inline]
pub(crate) fn is_less<T: QuantileItem>(a: &T, b: &T) -> bool {
    T::cmp(a, b) == Ordering::Less
}

/// Tracks the exact minimum and maximum items ingested.
#[derive(Debug, Clone)]
pub(crate) struct MinMax<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T> Default for MinMax<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: QuantileItem> MinMax<T> {
    pub fn update(&mut self, item: &T) {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => {
                if is_less(item, min) {
                    self.min = Some(item.clone());
                }
                if is_less(max, item) {
                    self.max = Some(item.clone());
                }
            }
            _ => {
                self.min = Some(item.clone());
                self.max = Some(item.clone());
            }
        }
    }

    pub fn min(&self) -> Option<&T> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&T> {
        self.max.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_order_and_nan() {
        assert_eq!(<f64 as QuantileItem>::cmp(&1.0, &2.0), Ordering::Less);
        assert!(<f64 as QuantileItem>::is_nan(&f64::NAN));
        assert!(!<i64 as QuantileItem>::is_nan(&0));
        assert_eq!(<f32 as QuantileItem>::upper_sentinel(), f32::INFINITY);
        assert_eq!(<u32 as QuantileItem>::upper_sentinel(), u32::MAX);
    }

    #[test]
    fn test_min_max() {
        let mut bounds = MinMax::default();
        assert!(bounds.min().is_none());
        for item in [5i64, -3, 12, 7] {
            bounds.update(&item);
        }
        assert_eq!(bounds.min(), Some(&-3));
        assert_eq!(bounds.max(), Some(&12));
    }
}
