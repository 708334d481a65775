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

use std::hash::Hash;

use crate::common::ResizeFactor;
use crate::hash::compute_seed_hash;
use crate::hash::hash_value;

/// Maximum theta value: the top of the half-open interval `(0, MAX_THETA]`.
pub const MAX_THETA: u64 = i64::MAX as u64;

pub const MIN_LG_K: u8 = 5;
pub const MAX_LG_K: u8 = 26;
pub const DEFAULT_LG_K: u8 = 12;

const RESIZE_THRESHOLD: f64 = 0.5;

/// Load factor above which growth switches from resize to rebuild.
pub(crate) const REBUILD_THRESHOLD: f64 = 15.0 / 16.0;

const STRIDE_HASH_BITS: u8 = 7;
const STRIDE_MASK: u64 = (1 << STRIDE_HASH_BITS) - 1;

/// Open-addressed table of 64-bit hashes backing every theta sketch form
/// (update sketches and the accumulators inside union/intersection/AnotB).
///
/// Below `lg_nom_size + 1` slots it grows by `resize_factor` on reaching 50%
/// load. At `lg_nom_size + 1` slots it rebuilds instead: finds the
/// `nomEntries`-th smallest retained hash via `select_nth_unstable`, makes
/// that the new theta, and evicts everything at or above it.
#[derive(Debug)]
pub(crate) struct ThetaHashTable {
    lg_cur_size: u8,
    lg_nom_size: u8,
    lg_max_size: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    hash_seed: u64,

    // Logical emptiness of the source set. Can be false even when
    // `num_retained` is 0 (e.g. every update was screened by theta).
    is_empty: bool,

    theta: u64,
    entries: Vec<u64>,
    num_retained: usize,
}

impl ThetaHashTable {
    pub fn new(
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        hash_seed: u64,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        let lg_cur_size = starting_sub_multiple(lg_max_size, MIN_LG_K, resize_factor.lg_value());
        Self::from_raw_parts_with_cur_size(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            sampling_probability,
            starting_theta_from_sampling_probability(sampling_probability),
            hash_seed,
            true,
        )
    }

    /// Builds a table with explicit starting state. Used by union,
    /// intersection, and AnotB to seed accumulator tables whose starting
    /// theta and emptiness come from the operands rather than a builder.
    ///
    /// # Panics
    ///
    /// Panics if `lg_cur_size > lg_nom_size + 1`.
    pub fn from_raw_parts(
        lg_cur_size: u8,
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        theta: u64,
        hash_seed: u64,
        is_empty: bool,
    ) -> Self {
        Self::from_raw_parts_with_cur_size(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            sampling_probability,
            theta,
            hash_seed,
            is_empty,
        )
    }

    fn from_raw_parts_with_cur_size(
        lg_cur_size: u8,
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        theta: u64,
        hash_seed: u64,
        is_empty: bool,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        assert!(
            lg_cur_size <= lg_max_size,
            "lg_cur_size must be <= lg_nom_size + 1, got lg_cur_size={lg_cur_size}, lg_nom_size={lg_nom_size}"
        );
        let size = if lg_cur_size > 0 { 1usize << lg_cur_size } else { 0 };
        Self {
            lg_cur_size,
            lg_nom_size,
            lg_max_size,
            resize_factor,
            sampling_probability,
            hash_seed,
            is_empty,
            theta,
            entries: vec![0u64; size],
            num_retained: 0,
        }
    }

    /// Rebuilds a table from a flat, already-screened list of retained
    /// hashes (e.g. a deserialized compact image being reopened for updates).
    pub fn from_entries(lg_nom_size: u8, hash_seed: u64, theta: u64, entries: Vec<u64>) -> Self {
        let resize_factor = ResizeFactor::default();
        let lg_cur_size = lg_size_from_count_for_rebuild(entries.len(), RESIZE_THRESHOLD)
            .clamp(MIN_LG_K, lg_nom_size + 1);
        let is_empty = entries.is_empty() && theta == MAX_THETA;
        let mut table = Self::from_raw_parts_with_cur_size(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            1.0,
            theta,
            hash_seed,
            is_empty,
        );
        for hash in entries {
            table.try_insert_hash(hash);
        }
        table
    }

    /// Hashes a value under this table's seed without screening it against
    /// theta.
    pub fn hash<T: Hash>(&self, value: T) -> u64 {
        hash_value(value, self.hash_seed)
    }

    fn find_in_curr_entries(&self, key: u64) -> Option<usize> {
        Self::find_in_entries(&self.entries, key, self.lg_cur_size)
    }

    fn find_in_entries(entries: &[u64], key: u64, lg_size: u8) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let size = entries.len();
        let mask = size - 1;
        let stride = Self::get_stride(key, lg_size);
        let mut index = (key as usize) & mask;
        let loop_index = index;

        loop {
            let probe = entries[index];
            if probe == 0 || probe == key {
                return Some(index);
            }
            index = (index + stride) & mask;
            if index == loop_index {
                return None;
            }
        }
    }

    /// Membership probe without insertion, used by intersection and AnotB.
    pub fn contains_hash(&self, key: u64) -> bool {
        match self.find_in_curr_entries(key) {
            Some(idx) => self.entries[idx] == key,
            None => false,
        }
    }

    pub fn try_insert<T: Hash>(&mut self, value: T) -> bool {
        let hash = self.hash(value);
        self.try_insert_hash(hash)
    }

    pub fn try_insert_hash(&mut self, hash: u64) -> bool {
        self.is_empty = false;

        if hash == 0 || hash >= self.theta {
            return false;
        }

        let Some(index) = self.find_in_curr_entries(hash) else {
            unreachable!(
                "resize or rebuild should be called before the table can fill up completely"
            );
        };

        if self.entries[index] == hash {
            return false;
        }

        assert_eq!(self.entries[index], 0, "entry should be empty");
        self.entries[index] = hash;
        self.num_retained += 1;

        let capacity = self.get_capacity();
        if self.num_retained > capacity {
            if self.lg_cur_size <= self.lg_nom_size {
                self.resize();
            } else {
                self.rebuild();
            }
        }
        true
    }

    fn get_capacity(&self) -> usize {
        let fraction = if self.lg_cur_size <= self.lg_nom_size {
            RESIZE_THRESHOLD
        } else {
            REBUILD_THRESHOLD
        };
        (fraction * self.entries.len() as f64) as usize
    }

    fn resize(&mut self) {
        let new_lg_size = std::cmp::min(
            self.lg_cur_size + self.resize_factor.lg_value(),
            self.lg_max_size,
        );
        let new_size = 1usize << new_lg_size;

        let mut new_entries = vec![0u64; new_size];
        for &entry in &self.entries {
            if entry != 0 {
                let idx = Self::find_in_entries(&new_entries, entry, new_lg_size)
                    .expect("find_in_entries should always find room for a non-empty entry");
                new_entries[idx] = entry;
            }
        }

        self.entries = new_entries;
        self.lg_cur_size = new_lg_size;
    }

    fn rebuild(&mut self) {
        self.entries.retain(|&e| e != 0);
        let k = 1u64 << self.lg_nom_size;
        let (lesser, kth, _) = self.entries.select_nth_unstable(k as usize);
        self.theta = *kth;

        let size = 1usize << self.lg_cur_size;
        let mut new_entries = vec![0u64; size];
        let mut num_inserted = 0;
        for entry in lesser.iter() {
            let idx = Self::find_in_entries(&new_entries, *entry, self.lg_cur_size)
                .expect("find_in_entries should always find room for a non-empty entry");
            new_entries[idx] = *entry;
            num_inserted += 1;
        }

        assert_eq!(
            num_inserted, k as usize,
            "number of inserted entries should equal k after rebuild"
        );
        self.num_retained = num_inserted;
        self.entries = new_entries;
    }

    /// Lowers theta to `new_theta` and evicts every retained entry that no
    /// longer qualifies, without touching table size. Used by
    /// [`ThetaUnion`](super::ThetaUnion) when an operand's theta (e.g. from
    /// sampling) is below the accumulator's current theta.
    ///
    /// No-ops if `new_theta >= self.theta`.
    pub fn lower_theta_and_evict(&mut self, new_theta: u64) {
        if new_theta >= self.theta {
            return;
        }
        self.theta = new_theta;

        let mut new_entries = vec![0u64; self.entries.len()];
        let mut num_retained = 0;
        for &entry in &self.entries {
            if entry != 0 && entry < new_theta {
                let idx = Self::find_in_entries(&new_entries, entry, self.lg_cur_size)
                    .expect("find_in_entries should always find room for a non-empty entry");
                new_entries[idx] = entry;
                num_retained += 1;
            }
        }
        self.entries = new_entries;
        self.num_retained = num_retained;
    }

    pub fn trim(&mut self) {
        if self.num_retained > (1usize << self.lg_nom_size) {
            self.rebuild();
        }
    }

    pub fn reset(&mut self) {
        let init_theta = starting_theta_from_sampling_probability(self.sampling_probability);
        let init_lg_cur = starting_sub_multiple(
            self.lg_nom_size + 1,
            MIN_LG_K,
            self.resize_factor.lg_value(),
        );

        if self.entries.len() != 1usize << init_lg_cur {
            self.entries = vec![0u64; 1usize << init_lg_cur];
        } else {
            self.entries.fill(0);
        }
        self.num_retained = 0;
        self.theta = init_theta;
        self.is_empty = true;
        self.lg_cur_size = init_lg_cur;
    }

    pub fn num_entries(&self) -> usize {
        self.num_retained
    }

    pub fn num_retained(&self) -> usize {
        self.num_retained
    }

    pub fn theta(&self) -> u64 {
        self.theta
    }

    pub fn set_theta(&mut self, theta: u64) {
        self.theta = theta;
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn set_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied().filter(|&e| e != 0)
    }

    pub fn lg_nom_size(&self) -> u8 {
        self.lg_nom_size
    }

    pub fn seed(&self) -> u64 {
        self.hash_seed
    }

    pub fn hash_seed(&self) -> u64 {
        self.hash_seed
    }

    pub fn seed_hash(&self) -> u16 {
        compute_seed_hash(self.hash_seed)
    }

    fn get_stride(key: u64, lg_size: u8) -> usize {
        (2 * ((key >> lg_size) & STRIDE_MASK) + 1) as usize
    }

    /// Picks the smallest `lg_size` whose rebuild-threshold capacity covers
    /// `count` entries, used when seeding a set-operation accumulator table
    /// sized to hold an incoming operand without an immediate rebuild.
    pub fn lg_size_from_count_for_rebuild(count: usize, load_factor: f64) -> u8 {
        lg_size_from_count_for_rebuild(count, load_factor)
    }
}

fn lg_size_from_count_for_rebuild(count: usize, load_factor: f64) -> u8 {
    let mut lg_size = MIN_LG_K;
    while ((1u64 << lg_size) as f64 * load_factor) < count as f64 {
        lg_size += 1;
    }
    lg_size
}

fn starting_sub_multiple(lg_target: u8, lg_min: u8, lg_resize_factor: u8) -> u8 {
    if lg_target <= lg_min {
        lg_min
    } else if lg_resize_factor == 0 {
        lg_target
    } else {
        ((lg_target - lg_min) % lg_resize_factor) + lg_min
    }
}

fn starting_theta_from_sampling_probability(sampling_probability: f32) -> u64 {
    if sampling_probability < 1.0 {
        (MAX_THETA as f64 * sampling_probability as f64) as u64
    } else {
        MAX_THETA
    }
}
