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

//! The compact, read-only Theta sketch form produced by `compact()` and by
//! every set operation's `result()`.

use crate::codec::SketchBytes;
use crate::common::NumStdDev;
use crate::common::binomial_bounds;
use crate::error::Error;
use crate::family::Family;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::memory::HeapMemory;
use crate::memory::MemoryView;
use crate::memory::ReadOnlyMemory;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::serialization::*;

/// An immutable, serialized-shape Theta sketch: a sorted-or-unsorted list of
/// retained hashes plus theta and the seed hash needed to validate set-op
/// compatibility.
///
/// Produced by [`ThetaSketch::compact`](super::ThetaSketch), or as the
/// `result()` of a union, intersection, or AnotB.
#[derive(Debug, Clone)]
pub struct CompactThetaSketch {
    theta: u64,
    entries: Vec<u64>,
    seed_hash: u16,
    is_empty: bool,
    is_ordered: bool,
}

impl CompactThetaSketch {
    /// Builds a compact sketch from already-screened, unordered hashes.
    pub(crate) fn new(theta: u64, entries: Vec<u64>, seed_hash: u16, is_empty: bool) -> Self {
        Self {
            theta,
            entries,
            seed_hash,
            is_empty,
            is_ordered: false,
        }
    }

    /// Builds a compact sketch with explicit order bookkeeping, used by set
    /// operations whose `result()` may or may not sort the output.
    pub(crate) fn from_parts(
        entries: Vec<u64>,
        theta: u64,
        seed_hash: u16,
        is_ordered: bool,
        is_empty: bool,
    ) -> Self {
        Self {
            theta,
            entries,
            seed_hash,
            is_empty,
            is_ordered,
        }
    }

    /// Returns whether the sketch holds no updates.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Returns the cardinality estimate.
    pub fn estimate(&self) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        self.entries.len() as f64 / self.theta()
    }

    /// Returns theta as a fraction in `(0.0, 1.0]`.
    pub fn theta(&self) -> f64 {
        self.theta as f64 / MAX_THETA as f64
    }

    /// Returns theta in its raw 64-bit form.
    pub fn theta64(&self) -> u64 {
        self.theta
    }

    /// Returns whether theta has shrunk below 1.0.
    pub fn is_estimation_mode(&self) -> bool {
        self.theta < MAX_THETA
    }

    /// Returns the number of retained hashes.
    pub fn num_retained(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the retained hashes are stored sorted ascending.
    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    /// Iterates over the retained hashes, in stored order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied()
    }

    /// Returns the seed hash this sketch was built under.
    pub fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    /// Returns the lower confidence bound on the estimate at `num_std_dev`
    /// standard deviations.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .expect("theta should always be valid")
    }

    /// Returns the upper confidence bound on the estimate at `num_std_dev`
    /// standard deviations.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            self.is_empty,
        )
        .expect("theta should always be valid")
    }

    /// Serializes the sketch to its compact binary form.
    ///
    /// A single-entry, exact-mode sketch is written with the abbreviated
    /// single-item layout (1 preamble long followed by the one hash).
    pub fn serialize(&self) -> Vec<u8> {
        let is_estimation_mode = self.is_estimation_mode();
        let num_entries = self.entries.len();
        let is_single_item = !self.is_empty && !is_estimation_mode && num_entries == 1;

        let preamble_longs = if self.is_empty || is_single_item {
            PREAMBLE_LONGS_EMPTY
        } else if is_estimation_mode {
            PREAMBLE_LONGS_ESTIMATION
        } else {
            PREAMBLE_LONGS_EXACT
        };

        let preamble_bytes = (preamble_longs as usize) * 8;
        let total_size = preamble_bytes + num_entries * HASH_SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(total_size);

        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::COMPACT.id);

        let mut flags = FLAG_READ_ONLY | FLAG_COMPACT;
        if self.is_empty {
            flags |= FLAG_EMPTY;
        }
        if self.is_ordered || is_single_item {
            flags |= FLAG_ORDERED;
        }
        if is_single_item {
            flags |= FLAG_SINGLE_ITEM;
        }
        bytes.write_u8(flags);
        bytes.write_u16_le(0);
        bytes.write_u16_le(self.seed_hash);

        if is_single_item {
            bytes.write_u64_le(self.entries[0]);
            return bytes.into_bytes();
        }

        if preamble_longs >= PREAMBLE_LONGS_EXACT {
            bytes.write_u32_le(num_entries as u32);
            bytes.write_u32_le(0);
        }

        if preamble_longs >= PREAMBLE_LONGS_ESTIMATION {
            bytes.write_u64_le(self.theta);
        }

        for hash in &self.entries {
            bytes.write_u64_le(*hash);
        }

        bytes.into_bytes()
    }

    /// Deserializes a compact sketch under the default update seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Deserializes a compact sketch built under a non-default seed, reading
    /// it through a borrowed, read-only [`MemoryView`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are truncated, the family id or serial
    /// version is unsupported, or the seed hash doesn't match (a stored
    /// seed hash of `0` is a legacy marker and skips this check).
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        Self::wrap_with_seed(&ReadOnlyMemory::new(bytes), seed)
    }

    /// Copies `bytes` onto the heap and reads a compact sketch from them
    /// under the default update seed.
    pub fn heapify(bytes: &[u8]) -> Result<Self, Error> {
        Self::heapify_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Copies `bytes` onto the heap and reads a compact sketch from them
    /// under a non-default hash seed.
    pub fn heapify_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        let mem = HeapMemory::from_vec(bytes.to_vec());
        Self::wrap_with_seed(&mem, seed)
    }

    /// Reads a compact sketch from a caller-owned [`MemoryView`], in place,
    /// under the default update seed.
    pub fn wrap(mem: &dyn MemoryView) -> Result<Self, Error> {
        Self::wrap_with_seed(mem, DEFAULT_UPDATE_SEED)
    }

    /// Reads a compact sketch from a caller-owned [`MemoryView`], in place,
    /// under a non-default hash seed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::deserialize_with_seed`].
    pub fn wrap_with_seed(mem: &dyn MemoryView, seed: u64) -> Result<Self, Error> {
        if mem.capacity() < 8 {
            return Err(Error::insufficient_data("preamble"));
        }

        let preamble_longs = mem.get_byte(0)?;
        let serial_version = mem.get_byte(1)?;
        let family_id = mem.get_byte(2)?;
        let flags = mem.get_byte(3)?;
        let _lg_k_field = mem.get_short(4)?;
        let stored_seed_hash = mem.get_short(6)?;

        Family::COMPACT.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }

        let expected_seed_hash = compute_seed_hash(seed);
        if stored_seed_hash != 0 && stored_seed_hash != expected_seed_hash {
            return Err(Error::invalid_argument(format!(
                "seed hash mismatch: expected {expected_seed_hash}, got {stored_seed_hash}"
            )));
        }
        let seed_hash = if stored_seed_hash == 0 {
            expected_seed_hash
        } else {
            stored_seed_hash
        };

        let is_empty = (flags & FLAG_EMPTY) != 0;
        let is_compact = (flags & FLAG_COMPACT) != 0;
        let is_ordered = (flags & FLAG_ORDERED) != 0;
        let is_single_item = (flags & FLAG_SINGLE_ITEM) != 0;

        if !is_compact {
            return Err(Error::invalid_argument(
                "only compact sketches are supported",
            ));
        }

        if is_empty {
            return Ok(Self {
                theta: MAX_THETA,
                entries: Vec::new(),
                seed_hash,
                is_empty: true,
                is_ordered: true,
            });
        }

        if preamble_longs == PREAMBLE_LONGS_EMPTY && is_single_item {
            let hash = mem.get_long(8)?;
            return Ok(Self {
                theta: MAX_THETA,
                entries: vec![hash],
                seed_hash,
                is_empty: false,
                is_ordered: true,
            });
        }

        if preamble_longs < PREAMBLE_LONGS_EXACT {
            return Err(Error::invalid_argument(format!(
                "non-empty sketch requires at least {PREAMBLE_LONGS_EXACT} preamble longs, got {preamble_longs}"
            )));
        }

        let num_entries = mem.get_int(8)? as usize;

        let theta = if preamble_longs >= PREAMBLE_LONGS_ESTIMATION {
            mem.get_long(16)?
        } else {
            MAX_THETA
        };

        let data_start = if preamble_longs >= PREAMBLE_LONGS_ESTIMATION { 24 } else { 16 };
        let mut entries = Vec::with_capacity(num_entries);
        for i in 0..num_entries {
            let hash = mem.get_long(data_start + i * HASH_SIZE_BYTES).map_err(|_| {
                Error::insufficient_data(format!(
                    "expected {num_entries} entries, failed at index {i}"
                ))
            })?;
            entries.push(hash);
        }

        Ok(Self {
            theta,
            entries,
            seed_hash,
            is_empty: false,
            is_ordered,
        })
    }
}

impl ThetaSketchView for CompactThetaSketch {
    fn is_empty(&self) -> bool {
        CompactThetaSketch::is_empty(self)
    }

    fn seed_hash(&self) -> u16 {
        CompactThetaSketch::seed_hash(self)
    }

    fn theta64(&self) -> u64 {
        self.theta
    }

    fn num_retained(&self) -> usize {
        CompactThetaSketch::num_retained(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        Box::new(CompactThetaSketch::iter(self))
    }

    fn is_ordered(&self) -> bool {
        CompactThetaSketch::is_ordered(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_compact_sketch() {
        let sketch = CompactThetaSketch::new(
            MAX_THETA,
            Vec::new(),
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            true,
        );
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        assert_eq!(sketch.num_retained(), 0);
        assert!(!sketch.is_estimation_mode());
    }

    #[test]
    fn test_compact_sketch_with_entries() {
        let entries = vec![100, 200, 300];
        let sketch = CompactThetaSketch::new(
            MAX_THETA,
            entries.clone(),
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            false,
        );
        assert!(!sketch.is_empty());
        assert_eq!(sketch.num_retained(), 3);
        assert_eq!(sketch.estimate(), 3.0);
        assert!(!sketch.is_estimation_mode());
    }

    #[test]
    fn test_compact_sketch_estimation_mode() {
        let entries = vec![100, 200, 300];
        let theta = MAX_THETA / 2;
        let sketch = CompactThetaSketch::new(
            theta,
            entries,
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            false,
        );
        assert!(sketch.is_estimation_mode());
        assert!(sketch.estimate() > 3.0);
    }

    #[test]
    fn test_serialize_deserialize_empty() {
        let sketch = CompactThetaSketch::new(
            MAX_THETA,
            Vec::new(),
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            true,
        );
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

        assert!(restored.is_empty());
        assert_eq!(sketch.theta64(), restored.theta64());
        assert_eq!(sketch.seed_hash(), restored.seed_hash());
    }

    #[test]
    fn test_serialize_deserialize_exact_mode() {
        let entries = vec![100, 200, 300, 400, 500];
        let sketch = CompactThetaSketch::from_parts(
            entries.clone(),
            MAX_THETA,
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            true,
            false,
        );
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

        assert!(!restored.is_empty());
        assert!(!restored.is_estimation_mode());
        assert_eq!(sketch.num_retained(), restored.num_retained());
        assert_eq!(sketch.estimate(), restored.estimate());
        assert_eq!(sketch.theta64(), restored.theta64());

        let restored_entries: Vec<u64> = restored.iter().collect();
        assert_eq!(entries, restored_entries);
    }

    #[test]
    fn test_wrap_and_heapify_round_trip() {
        let entries = vec![100, 200, 300, 400, 500];
        let sketch = CompactThetaSketch::from_parts(
            entries.clone(),
            MAX_THETA,
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            true,
            false,
        );
        let bytes = sketch.serialize();

        let mem = crate::memory::ReadOnlyMemory::new(&bytes);
        let wrapped = CompactThetaSketch::wrap(&mem).unwrap();
        assert_eq!(wrapped.iter().collect::<Vec<u64>>(), entries);

        let heapified = CompactThetaSketch::heapify(&bytes).unwrap();
        assert_eq!(heapified.num_retained(), sketch.num_retained());
        assert_eq!(heapified.theta64(), sketch.theta64());
    }

    #[test]
    fn test_serialize_deserialize_estimation_mode() {
        let entries = vec![100, 200, 300];
        let theta = MAX_THETA / 2;
        let sketch = CompactThetaSketch::new(
            theta,
            entries.clone(),
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            false,
        );
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

        assert!(!restored.is_empty());
        assert!(restored.is_estimation_mode());
        assert_eq!(sketch.num_retained(), restored.num_retained());
        assert_eq!(sketch.estimate(), restored.estimate());
        assert_eq!(sketch.theta64(), restored.theta64());
    }

    #[test]
    fn test_serialize_deserialize_single_item() {
        let sketch = CompactThetaSketch::new(
            MAX_THETA,
            vec![42],
            compute_seed_hash(DEFAULT_UPDATE_SEED),
            false,
        );
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), 8 + HASH_SIZE_BYTES);
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored.num_retained(), 1);
        assert_eq!(restored.iter().next(), Some(42));
    }

    #[test]
    fn test_deserialize_invalid_family() {
        let mut bytes = vec![
            1,
            SERIAL_VERSION,
            99,
            0,
            0,
            FLAG_EMPTY | FLAG_COMPACT | FLAG_ORDERED,
        ];
        bytes.extend_from_slice(&compute_seed_hash(DEFAULT_UPDATE_SEED).to_le_bytes());

        let result = CompactThetaSketch::deserialize(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_invalid_seed() {
        let mut bytes = vec![
            1,
            SERIAL_VERSION,
            Family::COMPACT.id,
            0,
            0,
            FLAG_EMPTY | FLAG_COMPACT | FLAG_ORDERED,
        ];
        bytes.extend_from_slice(&9999u16.to_le_bytes());

        let result = CompactThetaSketch::deserialize(&bytes);
        assert!(result.is_err());
    }
}
