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
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::REBUILD_THRESHOLD;
use crate::theta::hash_table::ThetaHashTable;

/// Stateful set intersection over a sequence of Theta sketches.
///
/// Each [`update`](Self::update) narrows the accumulator to the hashes it
/// shares with the incoming sketch. Before the first update the result is
/// undefined; check [`has_result`](Self::has_result) before calling
/// [`result`](Self::result).
#[derive(Debug)]
pub struct ThetaIntersection {
    is_valid: bool,
    table: ThetaHashTable,
}

impl ThetaIntersection {
    /// Creates an intersection operator under `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            is_valid: false,
            table: ThetaHashTable::from_raw_parts(
                0,
                0,
                ResizeFactor::X1,
                1.0,
                MAX_THETA,
                seed,
                false,
            ),
        }
    }

    /// Creates an intersection operator under the default update seed.
    pub fn new_with_default_seed() -> Self {
        Self::new(DEFAULT_UPDATE_SEED)
    }

    /// Narrows the accumulator to its overlap with `sketch`.
    ///
    /// # Errors
    ///
    /// Returns an error if `sketch`'s seed hash is incompatible, or if
    /// `sketch`'s reported entry count doesn't match what its iterator
    /// actually yields (a corrupted or mismatched-seed input).
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        let reset_to_empty_shell = |table: &ThetaHashTable| {
            ThetaHashTable::from_raw_parts(
                0,
                0,
                ResizeFactor::X1,
                1.0,
                table.theta(),
                table.hash_seed(),
                table.is_empty(),
            )
        };

        if self.table.is_empty() {
            return Ok(());
        }

        if !sketch.is_empty() && sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: expected {}, got {}",
                self.table.seed_hash(),
                sketch.seed_hash()
            )));
        }

        self.table
            .set_empty(self.table.is_empty() || sketch.is_empty());
        let theta = if self.table.is_empty() {
            MAX_THETA
        } else {
            self.table.theta().min(sketch.theta64())
        };
        self.table.set_theta(theta);

        if self.is_valid && self.table.num_retained() == 0 {
            return Ok(());
        }

        if sketch.num_retained() == 0 {
            self.is_valid = true;
            self.table = reset_to_empty_shell(&self.table);
            return Ok(());
        }

        if !self.is_valid {
            // First operand: the intersection of "everything" with `sketch`
            // is just `sketch`, sized into a table large enough that
            // inserting it won't trigger an immediate rebuild.
            self.is_valid = true;
            let lg_size = ThetaHashTable::lg_size_from_count_for_rebuild(
                sketch.num_retained(),
                REBUILD_THRESHOLD,
            );
            self.table = ThetaHashTable::from_raw_parts(
                lg_size,
                lg_size - 1,
                ResizeFactor::X1,
                1.0,
                self.table.theta(),
                self.table.hash_seed(),
                self.table.is_empty(),
            );
            for hash in sketch.iter() {
                if !self.table.try_insert_hash(hash) {
                    return Err(Error::invalid_argument(
                        "failed to insert entry from operand, possibly corrupted input sketch",
                    ));
                }
            }
            if self.table.num_retained() != sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "entry count mismatch, possibly corrupted input sketch",
                ));
            }
        } else {
            let max_matches = self.table.num_retained().min(sketch.num_retained());
            let mut matched = Vec::with_capacity(max_matches);
            let mut scanned = 0;
            for hash in sketch.iter() {
                if hash < self.table.theta() {
                    if self.table.contains_hash(hash) {
                        if matched.len() == max_matches {
                            return Err(Error::invalid_argument(
                                "more matches than possible, likely corrupted input sketch",
                            ));
                        }
                        matched.push(hash);
                    }
                } else if sketch.is_ordered() {
                    break;
                }
                scanned += 1;
            }
            if scanned > sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "scanned more entries than reported, likely corrupted input sketch",
                ));
            } else if !sketch.is_ordered() && scanned < sketch.num_retained() {
                return Err(Error::invalid_argument(
                    "scanned fewer entries than reported, likely corrupted input sketch",
                ));
            }

            if matched.is_empty() {
                self.table = reset_to_empty_shell(&self.table);
                if self.table.theta() == MAX_THETA {
                    self.table.set_empty(true);
                }
            } else {
                let lg_size =
                    ThetaHashTable::lg_size_from_count_for_rebuild(matched.len(), REBUILD_THRESHOLD);
                self.table = ThetaHashTable::from_raw_parts(
                    lg_size,
                    lg_size - 1,
                    ResizeFactor::X1,
                    1.0,
                    self.table.theta(),
                    self.table.hash_seed(),
                    self.table.is_empty(),
                );
                for hash in matched {
                    if !self.table.try_insert_hash(hash) {
                        return Err(Error::invalid_argument(
                            "duplicate match entry, likely corrupted input sketch",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns whether at least one [`update`](Self::update) has run.
    pub fn has_result(&self) -> bool {
        self.is_valid
    }

    /// Returns the intersection so far as an ordered compact sketch.
    ///
    /// # Panics
    ///
    /// Panics if called before the first [`update`](Self::update).
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the intersection so far as a compact sketch, optionally
    /// skipping the final sort.
    ///
    /// # Panics
    ///
    /// Panics if called before the first [`update`](Self::update).
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        assert!(
            self.is_valid,
            "ThetaIntersection::result() called before the first update()"
        );
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theta::ThetaSketch;

    #[test]
    fn test_no_result_before_first_update() {
        let inter = ThetaIntersection::new_with_default_seed();
        assert!(!inter.has_result());
    }

    #[test]
    fn test_single_update_returns_operand() {
        let mut a = ThetaSketch::builder().build();
        for i in 0..20u64 {
            a.update(i);
        }

        let mut inter = ThetaIntersection::new_with_default_seed();
        inter.update(&a).unwrap();
        let result = inter.result();
        assert_eq!(result.num_retained(), a.num_retained());
    }

    #[test]
    fn test_disjoint_sets_intersect_to_empty() {
        let mut a = ThetaSketch::builder().build();
        let mut b = ThetaSketch::builder().build();
        for i in 0..100u64 {
            a.update(i);
        }
        for i in 1000..1100u64 {
            b.update(i);
        }

        let mut inter = ThetaIntersection::new_with_default_seed();
        inter.update(&a).unwrap();
        inter.update(&b).unwrap();
        assert_eq!(inter.result().num_retained(), 0);
        assert_eq!(inter.result().estimate(), 0.0);
    }

    #[test]
    fn test_overlapping_sets_estimate_overlap() {
        let mut a = ThetaSketch::builder().lg_k(12).build();
        let mut b = ThetaSketch::builder().lg_k(12).build();
        for i in 0..2000u64 {
            a.update(i);
        }
        for i in 1000..3000u64 {
            b.update(i);
        }

        let mut inter = ThetaIntersection::new_with_default_seed();
        inter.update(&a).unwrap();
        inter.update(&b).unwrap();
        let estimate = inter.result().estimate();
        assert!((estimate - 1000.0).abs() / 1000.0 < 0.2);
    }

    #[test]
    fn test_incompatible_seed_is_rejected() {
        let mut a = ThetaSketch::builder().seed(7).build();
        a.update("apple");

        let mut inter = ThetaIntersection::new_with_default_seed();
        assert!(inter.update(&a).is_err());
    }

    #[test]
    fn test_intersecting_with_self_is_identity() {
        let mut a = ThetaSketch::builder().lg_k(10).build();
        for i in 0..500u64 {
            a.update(i);
        }

        let mut inter = ThetaIntersection::new_with_default_seed();
        inter.update(&a).unwrap();
        inter.update(&a).unwrap();
        assert_eq!(inter.result().num_retained(), a.num_retained());
    }
}
