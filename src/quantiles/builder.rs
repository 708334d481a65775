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

use crate::hash::DEFAULT_UPDATE_SEED;
use crate::quantiles::DEFAULT_K;
use crate::quantiles::MAX_K;
use crate::quantiles::MIN_K;
use crate::quantiles::sketch::DoublesSketch;

/// Builder for [`DoublesSketch`].
#[derive(Debug)]
pub struct DoublesSketchBuilder {
    k: u16,
    seed: u64,
}

impl Default for DoublesSketchBuilder {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl DoublesSketchBuilder {
    /// Sets `k`, the accuracy parameter; rank error scales roughly as
    /// `1.7 / k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is odd or outside `[2, 32768]`.
    pub fn k(mut self, k: u16) -> Self {
        assert!(k % 2 == 0, "k must be even, got {k}");
        assert!(
            (MIN_K..=MAX_K).contains(&k),
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        );
        self.k = k;
        self
    }

    /// Seeds the deterministic coin-flip generator used during compaction.
    /// Tests pin this for reproducible carries; production callers usually
    /// leave it at the default.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the sketch.
    pub fn build(self) -> DoublesSketch {
        DoublesSketch::new(self.k, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder_uses_default_k() {
        let sketch = DoublesSketchBuilder::default().build();
        assert_eq!(sketch.k(), DEFAULT_K);
    }

    #[test]
    #[should_panic(expected = "k must be even")]
    fn test_odd_k_panics() {
        DoublesSketchBuilder::default().k(5);
    }

    #[test]
    #[should_panic(expected = "k must be in")]
    fn test_k_out_of_range_panics() {
        DoublesSketchBuilder::default().k(0);
    }
}
