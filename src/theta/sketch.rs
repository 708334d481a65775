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

//! The update-form Theta sketch: an open-addressed hash table over hashed
//! inputs with a shrinking acceptance threshold (theta), giving an
//! unbiased distinct-count estimate under uniform hashing.

use std::hash::Hash;

use crate::codec::SketchBytes;
use crate::common::NumStdDev;
use crate::common::ResizeFactor;
use crate::common::binomial_bounds;
use crate::common::canonical_double;
use crate::error::Error;
use crate::family::Family;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::memory::HeapMemory;
use crate::memory::MemoryView;
use crate::memory::ReadOnlyMemory;
use crate::theta::CompactThetaSketch;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::DEFAULT_LG_K;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;
use crate::theta::serialization::FLAG_COMPACT;
use crate::theta::serialization::FLAG_EMPTY;
use crate::theta::serialization::FLAG_ORDERED;
use crate::theta::serialization::FLAG_READ_ONLY;
use crate::theta::serialization::HASH_SIZE_BYTES;
use crate::theta::serialization::PREAMBLE_LONGS_EMPTY;
use crate::theta::serialization::PREAMBLE_LONGS_ESTIMATION;
use crate::theta::serialization::PREAMBLE_LONGS_EXACT;
use crate::theta::serialization::SERIAL_VERSION;

/// Mutable, updatable Theta sketch.
///
/// Every `update` hashes its input, discards the hash if it lands at or
/// above `theta`, and otherwise inserts it into an open-addressed table
/// that periodically resizes (below `lg_k + 1` slots) or rebuilds (at
/// `lg_k + 1` slots, shrinking theta to the `k`-th smallest retained hash).
#[derive(Debug)]
pub struct ThetaSketch {
    table: ThetaHashTable,
}

impl ThetaSketch {
    /// Starts building a sketch with a [`ThetaSketchBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use sketchcore::theta::ThetaSketch;
    /// let sketch = ThetaSketch::builder().lg_k(12).build();
    /// assert_eq!(sketch.lg_k(), 12);
    /// ```
    pub fn builder() -> ThetaSketchBuilder {
        ThetaSketchBuilder::default()
    }

    /// Updates the sketch with a hashable value.
    ///
    /// For `f32`/`f64` values use [`update_f32`](Self::update_f32) /
    /// [`update_f64`](Self::update_f64) instead, so that `-0.0`/`0.0` and
    /// every `NaN` bit pattern hash identically.
    pub fn update<T: Hash>(&mut self, value: T) {
        let hash = self.table.hash(value);
        self.table.try_insert_hash(hash);
    }

    /// Updates the sketch with a `f64` value.
    pub fn update_f64(&mut self, value: f64) {
        self.update(canonical_double(value));
    }

    /// Updates the sketch with a `f32` value.
    pub fn update_f32(&mut self, value: f32) {
        self.update_f64(value as f64);
    }

    /// Returns the cardinality estimate.
    pub fn estimate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.num_retained() as f64 / self.theta()
    }

    /// Returns theta as a fraction in `(0.0, 1.0]`.
    pub fn theta(&self) -> f64 {
        self.table.theta() as f64 / MAX_THETA as f64
    }

    /// Returns theta in its raw 64-bit form.
    pub fn theta64(&self) -> u64 {
        self.table.theta()
    }

    /// Returns whether the sketch has received no updates.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns whether theta has shrunk below 1.0, meaning `estimate()` is
    /// approximate rather than exact.
    pub fn is_estimation_mode(&self) -> bool {
        self.table.theta() < MAX_THETA
    }

    /// Returns the number of hashes currently retained in the table.
    pub fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    /// Returns `lg_k`, the log2 of the nominal entry count.
    pub fn lg_k(&self) -> u8 {
        self.table.lg_nom_size()
    }

    /// Forces a rebuild down to at most `2^lg_k` retained entries.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Returns the sketch to its just-built, empty state.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Iterates over the retained hashes in table order (unsorted).
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.table.iter()
    }

    /// Returns the lower confidence bound on the estimate at `num_std_dev`
    /// standard deviations.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .expect("sampling_probability > 0 guarantees theta > 0")
    }

    /// Returns the upper confidence bound on the estimate at `num_std_dev`
    /// standard deviations.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            self.is_empty(),
        )
        .expect("sampling_probability > 0 guarantees theta > 0")
    }

    /// Converts this update-form sketch into a read-only, ordered
    /// [`CompactThetaSketch`].
    pub fn compact(&self) -> CompactThetaSketch {
        let mut entries: Vec<u64> = self.iter().collect();
        entries.sort_unstable();
        CompactThetaSketch::from_parts(
            entries,
            self.theta64(),
            self.seed_hash(),
            true,
            self.is_empty(),
        )
    }

    /// Serializes the sketch to its compact, ordered binary form.
    pub fn serialize(&self) -> Vec<u8> {
        let is_empty = self.is_empty();
        let is_estimation_mode = self.is_estimation_mode();

        let preamble_longs = if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else if is_estimation_mode {
            PREAMBLE_LONGS_ESTIMATION
        } else {
            PREAMBLE_LONGS_EXACT
        };

        let num_entries = self.num_retained();
        let total_bytes = (preamble_longs as usize) * 8 + num_entries * HASH_SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(total_bytes);

        let mut flags: u8 = FLAG_COMPACT | FLAG_READ_ONLY | FLAG_ORDERED;
        if is_empty {
            flags |= FLAG_EMPTY;
        }

        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::COMPACT.id);
        bytes.write_u8(flags);
        bytes.write_u16_le(self.lg_k() as u16);
        bytes.write_u16_le(self.seed_hash());

        if !is_empty {
            bytes.write_u32_le(num_entries as u32);
            bytes.write_u32_le(0);
        }

        if is_estimation_mode {
            bytes.write_u64_le(self.theta64());
        }

        let mut entries: Vec<u64> = self.iter().collect();
        entries.sort_unstable();
        for entry in entries {
            bytes.write_u64_le(entry);
        }

        bytes.into_bytes()
    }

    /// Deserializes a sketch under the default update seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed, truncated, or were
    /// serialized with a different seed; use
    /// [`deserialize_with_seed`](Self::deserialize_with_seed) for the latter.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Deserializes a sketch produced with a non-default hash seed, reading
    /// it through a borrowed, read-only [`MemoryView`].
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        Self::wrap_with_seed(&ReadOnlyMemory::new(bytes), seed)
    }

    /// Copies `bytes` onto the heap and reads a sketch from them under the
    /// default update seed.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::wrap_with_seed`].
    pub fn heapify(bytes: &[u8]) -> Result<Self, Error> {
        Self::heapify_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Copies `bytes` onto the heap and reads a sketch from them under a
    /// non-default hash seed.
    pub fn heapify_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        let mem = HeapMemory::from_vec(bytes.to_vec());
        Self::wrap_with_seed(&mem, seed)
    }

    /// Reads a sketch from a caller-owned [`MemoryView`], in place, under
    /// the default update seed.
    pub fn wrap(mem: &dyn MemoryView) -> Result<Self, Error> {
        Self::wrap_with_seed(mem, DEFAULT_UPDATE_SEED)
    }

    /// Reads a sketch from a caller-owned [`MemoryView`], in place, under a
    /// non-default hash seed.
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown family, unsupported serial version,
    /// an `lg_k` out of range, a seed-hash mismatch, or a region too small
    /// for the declared payload.
    pub fn wrap_with_seed(mem: &dyn MemoryView, seed: u64) -> Result<Self, Error> {
        if mem.capacity() < 8 {
            return Err(Error::insufficient_data("preamble"));
        }

        let preamble_longs = mem.get_byte(0)?;
        let serial_version = mem.get_byte(1)?;
        let family_id = mem.get_byte(2)?;
        let flags = mem.get_byte(3)?;
        let lg_k_field = mem.get_short(4)?;
        let stored_seed_hash = mem.get_short(6)?;

        Family::COMPACT.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION && serial_version != 1 && serial_version != 2 {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if lg_k_field > u8::MAX as u16 || !(MIN_LG_K..=MAX_LG_K).contains(&(lg_k_field as u8)) {
            return Err(Error::out_of_range(
                "lg_k",
                lg_k_field,
                &format!("[{MIN_LG_K}, {MAX_LG_K}]"),
            ));
        }
        let lg_k = lg_k_field as u8;

        let expected_seed_hash = compute_seed_hash(seed);
        if stored_seed_hash != expected_seed_hash {
            return Err(Error::invalid_argument(format!(
                "seed hash mismatch: expected 0x{expected_seed_hash:04X}, got 0x{stored_seed_hash:04X}"
            )));
        }

        let is_empty = (flags & FLAG_EMPTY) != 0;
        if is_empty {
            return Ok(ThetaSketch::builder().lg_k(lg_k).seed(seed).build());
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
            entries.push(mem.get_long(data_start + i * HASH_SIZE_BYTES)?);
        }

        let table = ThetaHashTable::from_entries(lg_k, seed, theta, entries);
        Ok(ThetaSketch { table })
    }

    fn seed_hash(&self) -> u16 {
        self.table.seed_hash()
    }
}

impl ThetaSketchView for ThetaSketch {
    fn is_empty(&self) -> bool {
        ThetaSketch::is_empty(self)
    }

    fn seed_hash(&self) -> u16 {
        self.table.seed_hash()
    }

    fn theta64(&self) -> u64 {
        self.table.theta()
    }

    fn num_retained(&self) -> usize {
        ThetaSketch::num_retained(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        Box::new(self.table.iter())
    }

    fn is_ordered(&self) -> bool {
        false
    }
}

/// Builder for [`ThetaSketch`].
#[derive(Debug)]
pub struct ThetaSketchBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    seed: u64,
}

impl Default for ThetaSketchBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::X8,
            sampling_probability: 1.0,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaSketchBuilder {
    /// Sets `lg_k`, the log2 of the nominal entry count.
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

    /// Sets the growth factor used when the table resizes below `lg_k + 1`.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Sets the sampling probability `p`: the fraction of hashed inputs
    /// retained before any rebuild-driven shrinkage.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not in `(0.0, 1.0]`; a probability of exactly `0.0`
    /// would make theta permanently `0`, which `binomial_bounds` cannot
    /// evaluate.
    pub fn sampling_probability(mut self, probability: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability) && probability > 0.0,
            "sampling_probability must be in (0.0, 1.0], got {probability}"
        );
        self.sampling_probability = probability;
        self
    }

    /// Sets the hash seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the sketch.
    pub fn build(self) -> ThetaSketch {
        let table = ThetaHashTable::new(
            self.lg_k,
            self.resize_factor,
            self.sampling_probability,
            self.seed,
        );
        ThetaSketch { table }
    }
}
