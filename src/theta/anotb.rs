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

use std::collections::HashSet;

use crate::error::Error;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;

/// Stateless set-difference operator: `A` minus `B`.
///
/// Unlike [`ThetaUnion`](super::ThetaUnion) and
/// [`ThetaIntersection`](super::ThetaIntersection), AnotB takes both
/// operands in a single call rather than accumulating state across updates,
/// since the difference isn't commutative or associative the way union and
/// intersection are.
#[derive(Debug, Default)]
pub struct AnotB;

impl AnotB {
    /// Creates an AnotB operator.
    pub fn new() -> Self {
        Self
    }

    /// Computes `a - b`: the hashes retained by `a` under the combined
    /// theta that are not also retained by `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if both operands are non-empty and their seed
    /// hashes differ.
    pub fn compute<A: ThetaSketchView, B: ThetaSketchView>(
        &self,
        a: &A,
        b: &B,
    ) -> Result<CompactThetaSketch, Error> {
        if !a.is_empty() && !b.is_empty() && a.seed_hash() != b.seed_hash() {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: a has {}, b has {}",
                a.seed_hash(),
                b.seed_hash()
            )));
        }

        let theta = a.theta64().min(b.theta64());
        let is_empty = a.is_empty();

        if a.num_retained() == 0 {
            return Ok(CompactThetaSketch::from_parts(
                Vec::new(),
                theta,
                a.seed_hash(),
                true,
                is_empty,
            ));
        }

        let b_hashes: HashSet<u64> = b.iter().filter(|&h| h < theta).collect();
        let mut result: Vec<u64> = a
            .iter()
            .filter(|&h| h < theta && !b_hashes.contains(&h))
            .collect();
        result.sort_unstable();

        Ok(CompactThetaSketch::from_parts(
            result,
            theta,
            a.seed_hash(),
            true,
            is_empty,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theta::ThetaSketch;

    #[test]
    fn test_anotb_with_disjoint_sets_returns_a() {
        let mut a = ThetaSketch::builder().build();
        let mut b = ThetaSketch::builder().build();
        for i in 0..100u64 {
            a.update(i);
        }
        for i in 1000..1100u64 {
            b.update(i);
        }

        let result = AnotB::new().compute(&a, &b).unwrap();
        assert_eq!(result.num_retained(), a.num_retained());
    }

    #[test]
    fn test_anotb_with_identical_sets_is_empty() {
        let mut a = ThetaSketch::builder().build();
        for i in 0..100u64 {
            a.update(i);
        }

        let result = AnotB::new().compute(&a, &a).unwrap();
        assert_eq!(result.num_retained(), 0);
        assert_eq!(result.estimate(), 0.0);
    }

    #[test]
    fn test_anotb_with_empty_a_is_empty() {
        let a = ThetaSketch::builder().build();
        let mut b = ThetaSketch::builder().build();
        b.update("apple");

        let result = AnotB::new().compute(&a, &b).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_anotb_with_partial_overlap() {
        let mut a = ThetaSketch::builder().lg_k(12).build();
        let mut b = ThetaSketch::builder().lg_k(12).build();
        for i in 0..2000u64 {
            a.update(i);
        }
        for i in 1000..3000u64 {
            b.update(i);
        }

        let estimate = AnotB::new().compute(&a, &b).unwrap().estimate();
        assert!((estimate - 1000.0).abs() / 1000.0 < 0.2);
    }

    #[test]
    fn test_anotb_rejects_incompatible_seed() {
        let mut a = ThetaSketch::builder().seed(1).build();
        a.update("apple");
        let mut b = ThetaSketch::builder().seed(2).build();
        b.update("banana");

        assert!(AnotB::new().compute(&a, &b).is_err());
    }
}
