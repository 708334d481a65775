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

//! Theta sketches: distinct-count estimation over bottom-k hashed inputs,
//! plus the Union, Intersection, and AnotB set operations that compose
//! sketches built under the same hash seed.

mod anotb;
mod compact;
mod hash_table;
mod intersection;
mod serialization;
mod sketch;
mod union;

pub use anotb::AnotB;
pub use compact::CompactThetaSketch;
pub use hash_table::DEFAULT_LG_K;
pub use hash_table::MAX_LG_K;
pub use hash_table::MIN_LG_K;
pub use intersection::ThetaIntersection;
pub use sketch::ThetaSketch;
pub use sketch::ThetaSketchBuilder;
pub use union::ThetaUnion;

/// Read-only view shared by [`ThetaSketch`] and [`CompactThetaSketch`], used
/// by the set operations so they can accept either as an operand without
/// caring whether it is still updatable.
pub trait ThetaSketchView {
    /// Whether the sketch has received no updates.
    fn is_empty(&self) -> bool;
    /// The 16-bit hash of the seed this sketch's hashes were computed under.
    fn seed_hash(&self) -> u16;
    /// Theta in its raw 64-bit form.
    fn theta64(&self) -> u64;
    /// Number of hashes currently retained.
    fn num_retained(&self) -> usize;
    /// Iterates over the retained hashes.
    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_>;
    /// Whether the retained hashes are guaranteed sorted ascending.
    fn is_ordered(&self) -> bool;
}
