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

//! Doubles quantiles sketches: approximate rank, quantile, CDF, and PMF
//! queries over a streamed sequence of 64-bit floats, with error bounds
//! parameterized by `k` and independent of the stream's value range.
//!
//! Items land in an unsorted base buffer of capacity `2k`. Once full, the
//! buffer is sorted and folded into a ladder of levels by a fair-coin
//! subsample, where level `i` represents `2^i` stream items per retained
//! value and every level holds exactly `k` items once populated.

mod accessor;
mod builder;
mod serialization;
mod sketch;

pub use builder::DoublesSketchBuilder;
pub use sketch::DoublesSketch;

/// Default value of parameter k.
pub const DEFAULT_K: u16 = 128;
/// Minimum value of parameter k.
pub const MIN_K: u16 = 2;
/// Maximum value of parameter k.
pub const MAX_K: u16 = 32_768;
