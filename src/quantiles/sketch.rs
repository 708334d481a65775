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

use crate::codec::SketchBytes;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::family::Family;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::memory::HeapMemory;
use crate::memory::MemoryView;
use crate::memory::ReadOnlyMemory;
use crate::quantiles::MAX_K;
use crate::quantiles::MIN_K;
use crate::quantiles::accessor::CompactAccessor;
use crate::quantiles::accessor::DoublesAccessor;
use crate::quantiles::accessor::FullAccessor;
use crate::quantiles::builder::DoublesSketchBuilder;
use crate::quantiles::serialization::FLAG_BIG_ENDIAN;
use crate::quantiles::serialization::FLAG_COMPACT;
use crate::quantiles::serialization::FLAG_EMPTY;
use crate::quantiles::serialization::PRE_LONGS_EMPTY;
use crate::quantiles::serialization::PRE_LONGS_FULL;
use crate::quantiles::serialization::SERIAL_VERSION;

/// Approximate quantiles sketch over a stream of 64-bit floats.
///
/// Updates land in an unsorted base buffer of capacity `2k`; once full, the
/// buffer is sorted and folded into a ladder of `levels`, each a sorted
/// array of exactly `k` items where level `i` represents `2^i` stream items
/// per retained value. `bit_pattern`'s bit `i` tracks whether `levels[i]` is
/// currently populated — it always equals `floor(n / (2k))`.
#[derive(Debug, Clone)]
pub struct DoublesSketch {
    k: u16,
    n: u64,
    min_value: f64,
    max_value: f64,
    bit_pattern: u64,
    base_buffer: Vec<f64>,
    levels: Vec<Vec<f64>>,
    rng: XorShift64,
}

impl DoublesSketch {
    /// Starts building a sketch with a [`DoublesSketchBuilder`].
    pub fn builder() -> DoublesSketchBuilder {
        DoublesSketchBuilder::default()
    }

    pub(crate) fn new(k: u16, seed: u64) -> Self {
        Self {
            k,
            n: 0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
            bit_pattern: 0,
            base_buffer: Vec::with_capacity(2 * k as usize),
            levels: Vec::new(),
            rng: XorShift64::seeded(seed),
        }
    }

    /// Returns the accuracy parameter `k`.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns the number of items ever inserted.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if no item has been inserted.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true once the sketch holds more than one compacted level.
    pub fn is_estimation_mode(&self) -> bool {
        self.bit_pattern != 0
    }

    /// Returns the minimum item seen, or `+inf` if empty.
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Returns the maximum item seen, or `-inf` if empty.
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Returns the number of items currently retained in memory.
    pub fn num_retained(&self) -> usize {
        self.base_buffer.len() + self.k as usize * self.bit_pattern.count_ones() as usize
    }

    /// Inserts `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` is NaN; `n`, `min`, and `max` are left
    /// unchanged.
    pub fn update(&mut self, item: f64) -> Result<(), Error> {
        if item.is_nan() {
            return Err(Error::invalid_argument("cannot update a doubles sketch with NaN"));
        }
        self.min_value = self.min_value.min(item);
        self.max_value = self.max_value.max(item);
        self.internal_update(item);
        Ok(())
    }

    fn internal_update(&mut self, item: f64) {
        self.base_buffer.push(item);
        self.n += 1;
        if self.base_buffer.len() == 2 * self.k as usize {
            self.compact();
        }
    }

    /// Sorts the full base buffer, halves it by a fair coin flip, and
    /// carries the result up through any already-populated levels.
    fn compact(&mut self) {
        self.base_buffer.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let buffer = std::mem::take(&mut self.base_buffer);
        let coin = self.rng.next_bool();
        let carry = downsample_to_half(buffer, coin);
        self.propagate_carry(0, carry);
    }

    /// Folds a `k`-item sorted array into `levels[lvl]`, recursively
    /// carrying into higher levels on collision — the same zip-and-halve
    /// step `compact` uses, just entered above level 0.
    fn propagate_carry(&mut self, mut lvl: usize, mut carry: Vec<f64>) {
        loop {
            while self.levels.len() <= lvl {
                self.levels.push(Vec::new());
            }
            if self.bit_pattern & (1 << lvl) == 0 {
                self.levels[lvl] = carry;
                self.bit_pattern |= 1 << lvl;
                return;
            }
            let existing = std::mem::take(&mut self.levels[lvl]);
            self.bit_pattern &= !(1 << lvl);
            let merged = merge_sorted(existing, carry);
            let coin = self.rng.next_bool();
            carry = downsample_to_half(merged, coin);
            lvl += 1;
        }
    }

    /// Returns the normalized rank of `value`: the fraction of inserted
    /// items less than or equal to it. Returns `None` if the sketch is
    /// empty.
    pub fn rank(&self, value: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let mut weighted = self.base_buffer.iter().filter(|&&x| x <= value).count() as u64;
        for lvl in 0..self.levels.len() {
            if self.bit_pattern & (1 << lvl) == 0 {
                continue;
            }
            let weight = 1u64 << lvl;
            let count = self.levels[lvl].iter().filter(|&&x| x <= value).count() as u64;
            weighted += count * weight;
        }
        Some(weighted as f64 / self.n as f64)
    }

    /// Returns the item at normalized rank `q`.
    ///
    /// For an empty sketch: `q = 0` yields `+inf`, `q = 1` yields `-inf`,
    /// and any other `q` yields `NaN` — the sketch's own sentinel values,
    /// not a missing-data signal.
    ///
    /// # Errors
    ///
    /// Returns an error if `q` is not in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Result<f64, Error> {
        if q.is_nan() || !(0.0..=1.0).contains(&q) {
            return Err(Error::out_of_range("q", q, "[0, 1]"));
        }
        if self.is_empty() {
            return Ok(if q == 0.0 {
                f64::INFINITY
            } else if q == 1.0 {
                f64::NEG_INFINITY
            } else {
                f64::NAN
            });
        }
        if q == 0.0 {
            return Ok(self.min_value);
        }
        if q == 1.0 {
            return Ok(self.max_value);
        }

        let items = self.merged_weighted_values();
        let target = ((q * self.n as f64).ceil() as u64).clamp(1, self.n);
        let mut cumulative = 0u64;
        for &(value, weight) in &items {
            cumulative += weight;
            if cumulative >= target {
                return Ok(value);
            }
        }
        Ok(items.last().map(|&(value, _)| value).unwrap_or(self.max_value))
    }

    /// Batched [`Self::quantile`], preserving input order.
    pub fn quantiles(&self, qs: &[f64]) -> Result<Vec<f64>, Error> {
        qs.iter().map(|&q| self.quantile(q)).collect()
    }

    /// Returns the approximate CDF at each split point, plus a final `1.0`.
    /// Returns `None` if the sketch is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `split_points` is not strictly increasing and
    /// finite.
    pub fn cdf(&self, split_points: &[f64]) -> Result<Option<Vec<f64>>, Error> {
        validate_split_points(split_points)?;
        if self.is_empty() {
            return Ok(None);
        }
        let items = self.merged_weighted_values();
        let mut result = Vec::with_capacity(split_points.len() + 1);
        let mut cumulative = 0u64;
        let mut idx = 0usize;
        for &split in split_points {
            while idx < items.len() && items[idx].0 <= split {
                cumulative += items[idx].1;
                idx += 1;
            }
            result.push(cumulative as f64 / self.n as f64);
        }
        result.push(1.0);
        Ok(Some(result))
    }

    /// Returns the approximate PMF over the buckets split points define.
    /// Returns `None` if the sketch is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `split_points` is not strictly increasing and
    /// finite.
    pub fn pmf(&self, split_points: &[f64]) -> Result<Option<Vec<f64>>, Error> {
        let Some(cdf) = self.cdf(split_points)? else {
            return Ok(None);
        };
        let mut pmf = Vec::with_capacity(cdf.len());
        let mut prev = 0.0;
        for c in cdf {
            pmf.push(c - prev);
            prev = c;
        }
        Ok(Some(pmf))
    }

    /// Every retained value paired with the stream-item weight it stands
    /// in for (`1` for base-buffer items, `2^level` for a level item),
    /// sorted ascending by value.
    fn merged_weighted_values(&self) -> Vec<(f64, u64)> {
        let mut items: Vec<(f64, u64)> = self.base_buffer.iter().map(|&v| (v, 1u64)).collect();
        for lvl in 0..self.levels.len() {
            if self.bit_pattern & (1 << lvl) == 0 {
                continue;
            }
            let weight = 1u64 << lvl;
            items.extend(self.levels[lvl].iter().map(|&v| (v, weight)));
        }
        items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        items
    }

    /// Merges `other` into this sketch.
    ///
    /// When `k`s match, absorbs `other`'s base buffer item-by-item and then
    /// carries each of its populated levels in ascending order using the
    /// same coin-flip compaction `update` uses — exact up to the shared
    /// PRNG draws. When `k`s differ, the larger-`k` side is first replayed
    /// through a fresh sketch at the smaller `k` (each retained value
    /// reinserted once per stream item it stands in for), since the two
    /// sketches' level ladders aren't directly comparable.
    pub fn merge(&mut self, other: &DoublesSketch) {
        if other.is_empty() {
            return;
        }
        if self.k != other.k {
            self.merge_with_downsample(other);
            return;
        }

        self.min_value = self.min_value.min(other.min_value);
        self.max_value = self.max_value.max(other.max_value);

        let absorbed = other.base_buffer.len() as u64;
        for &v in &other.base_buffer {
            self.internal_update(v);
        }
        for lvl in 0..other.levels.len() {
            if other.bit_pattern & (1 << lvl) == 0 {
                continue;
            }
            self.propagate_carry(lvl, other.levels[lvl].clone());
        }
        self.n += other.n - absorbed;
    }

    fn merge_with_downsample(&mut self, other: &DoublesSketch) {
        let target_k = self.k.min(other.k);
        if self.k != target_k {
            *self = self.replay_at_k(target_k);
        }
        let other_at_k = if other.k == target_k {
            other.clone()
        } else {
            other.replay_at_k(target_k)
        };
        self.min_value = self.min_value.min(other_at_k.min_value);
        self.max_value = self.max_value.max(other_at_k.max_value);
        for (value, weight) in other_at_k.merged_weighted_values() {
            for _ in 0..weight {
                self.internal_update(value);
            }
        }
    }

    /// Rebuilds a fresh sketch at `target_k` by replaying every retained
    /// value once per stream item it represents. Statistically faithful to
    /// the coin-flip subsampling that produced the original weights, at
    /// the cost of `O(n)` work instead of `O(retained)`.
    fn replay_at_k(&self, target_k: u16) -> DoublesSketch {
        let mut rng = self.rng;
        let reseed = rng.next_u64();
        let mut fresh = DoublesSketch::new(target_k, reseed);
        for (value, weight) in self.merged_weighted_values() {
            for _ in 0..weight {
                fresh.internal_update(value);
            }
        }
        fresh.min_value = self.min_value;
        fresh.max_value = self.max_value;
        fresh
    }

    /// Size in bytes of the updatable (heap, uncompacted) layout.
    pub fn updatable_storage_bytes(&self) -> usize {
        32 + 16 + 8 * (2 * self.k as usize + self.k as usize * self.bit_pattern.count_ones() as usize)
    }

    /// Size in bytes the compact serialized form would occupy.
    pub fn compact_storage_bytes(&self) -> usize {
        if self.is_empty() {
            return 8;
        }
        32 + 16 + 8 * (self.base_buffer.len() + self.k as usize * self.bit_pattern.count_ones() as usize)
    }

    /// Serializes the sketch to its compact byte image: unpopulated levels
    /// are skipped entirely, so the image is exactly as large as the
    /// retained data.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.compact_storage_bytes());
        let is_empty = self.is_empty();

        bytes.write_u8(if is_empty { PRE_LONGS_EMPTY } else { PRE_LONGS_FULL });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::QUANTILES.id);
        bytes.write_u8(if is_empty { FLAG_EMPTY } else { FLAG_COMPACT });
        bytes.write_u16_le(self.k);
        bytes.write_u16_le(0);

        if is_empty {
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        bytes.write_f64_le(self.min_value);
        bytes.write_f64_le(self.max_value);

        let mut base_buffer = self.base_buffer.clone();
        let mut levels = self.levels.clone();
        let num_levels = levels.len();
        let mut accessor = CompactAccessor::new(&mut base_buffer, &mut levels, self.k as usize);
        accessor.set_level(0);
        for i in 0..accessor.num_items() {
            bytes.write_f64_le(accessor.get(i));
        }
        for lvl in 0..num_levels {
            if self.bit_pattern & (1 << lvl) == 0 {
                continue;
            }
            accessor.set_level(lvl + 1);
            for i in 0..accessor.num_items() {
                bytes.write_f64_le(accessor.get(i));
            }
        }

        bytes.into_bytes()
    }

    /// Serializes the sketch to the updatable (heap) byte image: every
    /// level through the highest populated one is written at its full
    /// width `k`, including unpopulated gaps padded with zeros, so a
    /// direct/off-heap consumer can grow the image in place without
    /// re-indexing what follows it.
    pub fn serialize_updatable(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.updatable_storage_bytes());
        let is_empty = self.is_empty();

        bytes.write_u8(if is_empty { PRE_LONGS_EMPTY } else { PRE_LONGS_FULL });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::QUANTILES.id);
        bytes.write_u8(if is_empty { FLAG_EMPTY } else { 0 });
        bytes.write_u16_le(self.k);
        bytes.write_u16_le(0);

        if is_empty {
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        bytes.write_f64_le(self.min_value);
        bytes.write_f64_le(self.max_value);

        let mut base_buffer = self.base_buffer.clone();
        let mut levels = self.levels.clone();
        for lvl in levels.iter_mut() {
            if lvl.is_empty() {
                lvl.resize(self.k as usize, 0.0);
            }
        }
        let num_levels = levels.len();
        let mut accessor = FullAccessor::new(&mut base_buffer, &mut levels, self.k as usize);
        accessor.set_level(0);
        for i in 0..accessor.num_items() {
            bytes.write_f64_le(accessor.get(i));
        }
        for lvl in 0..num_levels {
            accessor.set_level(lvl + 1);
            for i in 0..accessor.num_items() {
                bytes.write_f64_le(accessor.get(i));
            }
        }

        bytes.into_bytes()
    }

    /// Reads a sketch from a caller-owned [`MemoryView`], in place — no
    /// copy of the payload bytes is made. Accepts both the compact and
    /// updatable layouts, distinguished by the compact flag bit.
    ///
    /// # Errors
    ///
    /// Returns an error on an unknown family, unsupported serial version,
    /// a `k` out of range, a big-endian image, an empty-flag/`N`
    /// inconsistency, or a region too small for the declared payload.
    pub fn wrap(mem: &dyn MemoryView) -> Result<Self, Error> {
        if mem.capacity() < 8 {
            return Err(Error::insufficient_data("preamble"));
        }
        let pre_longs = mem.get_byte(0)?;
        let serial_version = mem.get_byte(1)?;
        let family_id = mem.get_byte(2)?;
        let flags = mem.get_byte(3)?;
        let k = mem.get_short(4)?;
        let _reserved = mem.get_short(6)?;

        Family::QUANTILES.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(SERIAL_VERSION, serial_version));
        }
        if flags & FLAG_BIG_ENDIAN != 0 {
            return Err(Error::invalid_argument("big-endian images are not supported"));
        }
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::out_of_range("k", k, &format!("[{MIN_K}, {MAX_K}]")));
        }

        let is_empty = flags & FLAG_EMPTY != 0;
        if is_empty {
            if pre_longs != PRE_LONGS_EMPTY {
                return Err(Error::invalid_argument(format!(
                    "invalid preamble longs for an empty sketch: {pre_longs}"
                )));
            }
            return Ok(DoublesSketch::new(k, DEFAULT_UPDATE_SEED));
        }
        if pre_longs != PRE_LONGS_FULL {
            return Err(Error::invalid_argument(format!(
                "invalid preamble longs: expected {PRE_LONGS_FULL}, got {pre_longs}"
            )));
        }

        let n = mem.get_long(8)?;
        if n == 0 {
            return Err(Error::invalid_argument("empty flag inconsistent with n = 0"));
        }
        let min_value = mem.get_double(16)?;
        let max_value = mem.get_double(24)?;

        let two_k = 2 * k as u64;
        let base_count = (n % two_k) as usize;
        let bit_pattern = n / two_k;
        let num_levels = if bit_pattern == 0 {
            0
        } else {
            (64 - bit_pattern.leading_zeros()) as usize
        };
        let compact = flags & FLAG_COMPACT != 0;

        let mut base_buffer = vec![0.0; base_count];
        let mut levels: Vec<Vec<f64>> = vec![Vec::new(); num_levels];

        let mut offset = 32usize;
        for slot in base_buffer.iter_mut() {
            *slot = mem.get_double(offset)?;
            offset += 8;
        }
        for (lvl, slot) in levels.iter_mut().enumerate() {
            let populated = bit_pattern & (1 << lvl) != 0;
            if compact && !populated {
                continue;
            }
            let mut values = vec![0.0; k as usize];
            for v in values.iter_mut() {
                *v = mem.get_double(offset)?;
                offset += 8;
            }
            if populated {
                *slot = values;
            }
        }

        Ok(Self {
            k,
            n,
            min_value,
            max_value,
            bit_pattern,
            base_buffer,
            levels,
            rng: XorShift64::seeded(DEFAULT_UPDATE_SEED ^ n),
        })
    }

    /// Copies `bytes` onto the heap and reads a sketch from them.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::wrap`].
    pub fn heapify(bytes: &[u8]) -> Result<Self, Error> {
        let mem = HeapMemory::from_vec(bytes.to_vec());
        Self::wrap(&mem)
    }

    /// Deserializes a sketch from a compact or updatable byte image,
    /// reading it through a borrowed, read-only [`MemoryView`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::wrap`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::wrap(&ReadOnlyMemory::new(bytes))
    }
}

fn validate_split_points(split_points: &[f64]) -> Result<(), Error> {
    for &s in split_points {
        if !s.is_finite() {
            return Err(Error::invalid_argument("split points must be finite"));
        }
    }
    for window in split_points.windows(2) {
        if !(window[0] < window[1]) {
            return Err(Error::invalid_argument("split points must be strictly increasing"));
        }
    }
    Ok(())
}

/// Merges two sorted arrays into one sorted array.
fn merge_sorted(left: Vec<f64>, right: Vec<f64>) -> Vec<f64> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();
    while let (Some(&l), Some(&r)) = (left_iter.peek(), right_iter.peek()) {
        if l <= r {
            merged.push(left_iter.next().unwrap());
        } else {
            merged.push(right_iter.next().unwrap());
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

/// Halves a sorted, even-length array by a fair coin flip: keeps either
/// every even-indexed or every odd-indexed item. This is the sketch's
/// unbiasedness primitive — the choice must come from the sketch-local
/// PRNG, never a fixed parity.
fn downsample_to_half(items: Vec<f64>, take_odd: bool) -> Vec<f64> {
    debug_assert!(items.len() % 2 == 0, "length must be even");
    let offset = usize::from(take_odd);
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| if idx % 2 == offset { Some(item) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sketch_boundary_behaviors() {
        let sketch = DoublesSketch::builder().k(4).build();
        assert!(sketch.is_empty());
        assert_eq!(sketch.n(), 0);
        assert_eq!(sketch.min_value(), f64::INFINITY);
        assert_eq!(sketch.max_value(), f64::NEG_INFINITY);
        assert_eq!(sketch.quantile(0.0).unwrap(), f64::INFINITY);
        assert_eq!(sketch.quantile(1.0).unwrap(), f64::NEG_INFINITY);
        assert!(sketch.quantile(0.5).unwrap().is_nan());
        assert_eq!(sketch.serialize().len(), 8);
    }

    #[test]
    fn test_update_rejects_nan() {
        let mut sketch = DoublesSketch::builder().k(4).build();
        sketch.update(1.0).unwrap();
        assert!(sketch.update(f64::NAN).is_err());
        assert_eq!(sketch.n(), 1);
        assert_eq!(sketch.min_value(), 1.0);
        assert_eq!(sketch.max_value(), 1.0);
    }

    #[test]
    fn test_scenario_a_small_k_reverse_stream_compacts() {
        let mut sketch = DoublesSketch::builder().k(4).seed(42).build();
        for v in (1..=13).rev() {
            sketch.update(v as f64).unwrap();
        }
        assert_eq!(sketch.n(), 13);
        assert_eq!(sketch.min_value(), 1.0);
        assert_eq!(sketch.max_value(), 13.0);
        assert!(sketch.is_estimation_mode());
    }

    #[test]
    fn test_scenario_b_median_within_tolerance() {
        let mut sketch = DoublesSketch::builder().k(128).seed(7).build();
        for v in 0..1000 {
            sketch.update(v as f64).unwrap();
        }
        assert_eq!(sketch.min_value(), 0.0);
        assert_eq!(sketch.max_value(), 999.0);
        let median = sketch.quantile(0.5).unwrap();
        assert!((median - 500.0).abs() <= 4.0, "median was {median}");
    }

    #[test]
    fn test_scenario_c_serialize_wrap_continue_updating() {
        let mut sketch = DoublesSketch::builder().k(128).seed(3).build();
        for v in 0..1000 {
            sketch.update(v as f64).unwrap();
        }
        let bytes = sketch.serialize();
        let mut resumed = DoublesSketch::deserialize(&bytes).unwrap();
        for v in 1000..2000 {
            resumed.update(v as f64).unwrap();
        }
        assert_eq!(resumed.min_value(), 0.0);
        assert_eq!(resumed.max_value(), 1999.0);
        let median = resumed.quantile(0.5).unwrap();
        assert!((median - 1000.0).abs() <= 10.0, "median was {median}");
    }

    #[test]
    fn test_rank_and_quantile_agree_within_error_bound() {
        let mut sketch = DoublesSketch::builder().k(200).seed(11).build();
        for v in 0..10_000 {
            sketch.update(v as f64).unwrap();
        }
        for &q in &[0.1, 0.25, 0.5, 0.75, 0.9] {
            let value = sketch.quantile(q).unwrap();
            let rank = sketch.rank(value).unwrap();
            assert!((rank - q).abs() < 0.02, "q={q} rank={rank}");
        }
    }

    #[test]
    fn test_cdf_and_pmf_sum_to_one() {
        let mut sketch = DoublesSketch::builder().k(64).seed(5).build();
        for v in 0..500 {
            sketch.update(v as f64).unwrap();
        }
        let cdf = sketch.cdf(&[100.0, 250.0, 400.0]).unwrap().unwrap();
        assert_eq!(cdf.len(), 4);
        assert!((cdf[3] - 1.0).abs() < 1e-9);
        let pmf = sketch.pmf(&[100.0, 250.0, 400.0]).unwrap().unwrap();
        let total: f64 = pmf.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cdf_rejects_non_increasing_split_points() {
        let sketch = DoublesSketch::builder().k(4).build();
        assert!(sketch.cdf(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_merge_matching_k_is_union_of_ranges() {
        let mut a = DoublesSketch::builder().k(128).seed(1).build();
        let mut b = DoublesSketch::builder().k(128).seed(2).build();
        for v in 0..500 {
            a.update(v as f64).unwrap();
        }
        for v in 500..1000 {
            b.update(v as f64).unwrap();
        }
        a.merge(&b);
        assert_eq!(a.n(), 1000);
        assert_eq!(a.min_value(), 0.0);
        assert_eq!(a.max_value(), 999.0);
        let median = a.quantile(0.5).unwrap();
        assert!((median - 500.0).abs() <= 10.0, "median was {median}");
    }

    #[test]
    fn test_merge_downsamples_to_smaller_k() {
        let mut a = DoublesSketch::builder().k(256).seed(1).build();
        let mut b = DoublesSketch::builder().k(64).seed(2).build();
        for v in 0..2000 {
            a.update(v as f64).unwrap();
        }
        for v in 2000..4000 {
            b.update(v as f64).unwrap();
        }
        a.merge(&b);
        assert_eq!(a.k(), 64);
        assert_eq!(a.n(), 4000);
        assert_eq!(a.min_value(), 0.0);
        assert_eq!(a.max_value(), 3999.0);
    }

    #[test]
    fn test_empty_merge_is_noop() {
        let mut a = DoublesSketch::builder().k(32).build();
        a.update(1.0).unwrap();
        let b = DoublesSketch::builder().k(32).build();
        a.merge(&b);
        assert_eq!(a.n(), 1);
    }

    #[test]
    fn test_updatable_round_trip_via_wrap_and_heapify() {
        let mut sketch = DoublesSketch::builder().k(32).seed(9).build();
        for v in 0..400 {
            sketch.update(v as f64).unwrap();
        }
        assert!(sketch.is_estimation_mode());

        let updatable = sketch.serialize_updatable();
        assert!(updatable.len() > sketch.compact_storage_bytes(), "updatable image pads unpopulated levels");

        let from_heapify = DoublesSketch::heapify(&updatable).unwrap();
        assert_eq!(from_heapify.n(), sketch.n());
        assert_eq!(from_heapify.min_value(), sketch.min_value());
        assert_eq!(from_heapify.max_value(), sketch.max_value());
        assert_eq!(from_heapify.quantile(0.5).unwrap(), sketch.quantile(0.5).unwrap());

        let mem = crate::memory::ReadOnlyMemory::new(&updatable);
        let from_wrap = DoublesSketch::wrap(&mem).unwrap();
        assert_eq!(from_wrap.n(), sketch.n());
        assert_eq!(from_wrap.quantile(0.5).unwrap(), sketch.quantile(0.5).unwrap());
    }

    #[test]
    fn test_storage_sizing_formulas() {
        let mut sketch = DoublesSketch::builder().k(8).seed(1).build();
        assert_eq!(sketch.compact_storage_bytes(), 8);
        for v in 0..40 {
            sketch.update(v as f64).unwrap();
        }
        assert_eq!(
            sketch.compact_storage_bytes(),
            32 + 16 + 8 * (sketch.base_buffer.len() + sketch.k as usize * sketch.bit_pattern.count_ones() as usize)
        );
    }
}
