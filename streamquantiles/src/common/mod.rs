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

//! Items, randomness and query plumbing shared by both sketches.

mod item;
mod query_index;
mod random;
mod sketch;

pub use self::item::QuantileItem;
pub use self::random::RandomSource;
pub use self::random::XorShift64;
pub use self::sketch::QuantileSketch;

pub(crate) use self::item::MinMax;
pub(crate) use self::item::is_less;
pub(crate) use self::query_index::QueryIndex;
pub(crate) use self::query_index::check_epsilon;
pub(crate) use self::query_index::check_rank;
