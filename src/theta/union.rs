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

use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::DEFAULT_LG_K;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;

/// Stateful set union over a sequence of Theta sketches.
///
/// Unlike [`ThetaIntersection`](super::ThetaIntersection), a union always
/// has a well-defined result (the empty set before any update). Each
/// [`update`](Self::update) lowers theta to the minimum seen so far, evicts
/// anything that no longer qualifies, and folds in the operand's remaining
/// hashes through the accumulator's own resize/rebuild table.
#[derive(Debug)]
pub struct ThetaUnion {
    table: ThetaHashTable,
}

impl ThetaUnion {
    /// Starts building a union operator with a [`ThetaUnionBuilder`].
    pub fn builder() -> ThetaUnionBuilder {
        ThetaUnionBuilder::default()
    }

    /// Folds `sketch` into the accumulated union.
    ///
    /// # Errors
    ///
    /// Returns an error if a prior non-empty operand was seeded differently
    /// than this one.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() && sketch.num_retained() == 0 {
            return Ok(());
        }

        if sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: expected {}, got {}",
                self.table.seed_hash(),
                sketch.seed_hash()
            )));
        }

        self.table.set_empty(false);

        let incoming_theta = sketch.theta64();
        if incoming_theta < self.table.theta() {
            self.table.lower_theta_and_evict(incoming_theta);
        }

        for hash in sketch.iter() {
            if hash >= self.table.theta() {
                if sketch.is_ordered() {
                    break;
                }
                continue;
            }
            self.table.try_insert_hash(hash);
        }

        Ok(())
    }

    /// Returns the union so far as an ordered compact sketch.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the union so far as a compact sketch, optionally skipping the
    /// final sort.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let mut hashes: Vec<u64> = self.table.iter().collect();
        if ordered {
            hashes.sort_unstable();
        }
        CompactThetaSketch::from_parts(
            hashes,
            self.table.theta(),
            self.table.seed_hash(),
            ordered,
            self.table.is_empty(),
        )
    }

    /// Returns the union's sketch to its just-built, empty state.
    pub fn reset(&mut self) {
        self.table.reset();
    }
}

/// Builder for [`ThetaUnion`].
#[derive(Debug)]
pub struct ThetaUnionBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    seed: u64,
}

impl Default for ThetaUnionBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::X8,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaUnionBuilder {
    /// Sets `lg_k`, the log2 of the union accumulator's nominal entry count.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is outside `[5, 26]`.
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
        );
        self.lg_k = lg_k;
        self
    }

    /// Sets the growth factor used when the accumulator resizes.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Sets the hash seed; every non-empty operand must share it.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the union operator.
    pub fn build(self) -> ThetaUnion {
        ThetaUnion {
            table: ThetaHashTable::new(self.lg_k, self.resize_factor, 1.0, self.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theta::ThetaSketch;

    #[test]
    fn test_union_of_no_operands_is_empty() {
        let union = ThetaUnion::builder().build();
        assert_eq!(union.result().num_retained(), 0);
        assert!(union.result().is_empty());
    }

    #[test]
    fn test_union_of_disjoint_sets_sums_cardinality() {
        let mut a = ThetaSketch::builder().lg_k(12).build();
        let mut b = ThetaSketch::builder().lg_k(12).build();
        for i in 0..500u64 {
            a.update(i);
        }
        for i in 1000..1500u64 {
            b.update(i);
        }

        let mut union = ThetaUnion::builder().lg_k(12).build();
        union.update(&a).unwrap();
        union.update(&b).unwrap();
        let estimate = union.result().estimate();
        assert!((estimate - 1000.0).abs() / 1000.0 < 0.1);
    }

    #[test]
    fn test_union_of_overlapping_sets_dedupes() {
        let mut a = ThetaSketch::builder().lg_k(12).build();
        let mut b = ThetaSketch::builder().lg_k(12).build();
        for i in 0..1000u64 {
            a.update(i);
        }
        for i in 500..1500u64 {
            b.update(i);
        }

        let mut union = ThetaUnion::builder().lg_k(12).build();
        union.update(&a).unwrap();
        union.update(&b).unwrap();
        let estimate = union.result().estimate();
        assert!((estimate - 1500.0).abs() / 1500.0 < 0.1);
    }

    #[test]
    fn test_union_rejects_incompatible_seed() {
        let mut a = ThetaSketch::builder().seed(1).build();
        a.update("apple");

        let mut union = ThetaUnion::builder().seed(2).build();
        assert!(union.update(&a).is_err());
    }

    #[test]
    fn test_union_narrows_theta_to_sampled_operand() {
        let mut a = ThetaSketch::builder().lg_k(12).build();
        for i in 0..1000u64 {
            a.update(i);
        }
        let mut b = ThetaSketch::builder()
            .lg_k(12)
            .sampling_probability(0.1)
            .build();
        for i in 0..1000u64 {
            b.update(i);
        }

        let mut union = ThetaUnion::builder().lg_k(12).build();
        union.update(&a).unwrap();
        union.update(&b).unwrap();
        assert!(union.result().theta64() <= a.theta64());
    }
}
