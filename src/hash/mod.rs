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

//! Hash primitives shared by every sketch family.

mod xxhash;

pub use xxhash::XxHash64;

use std::hash::Hash;
use std::hash::Hasher;

/// Default update seed used when a sketch builder does not override it.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

#[inline]
pub(crate) fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Hashes an arbitrary `Hash` value under `seed`, returning a 63-bit positive
/// hash (top bit cleared) as required by the open-addressed hash table, which
/// uses `0` as its empty-slot sentinel and needs hashes to fit in the signed
/// range shared with `theta::hash_table::MAX_THETA`.
pub(crate) fn hash_value<T: Hash>(value: T, seed: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    value.hash(&mut hasher);
    hasher.finish() >> 1
}

/// Computes the 16-bit seed hash stored in a serialized image so that
/// deserializing with a mismatched seed is detected instead of silently
/// producing garbage estimates.
pub fn compute_seed_hash(seed: u64) -> u16 {
    let h = XxHash64::hash_u64(seed, 0);
    let seed_hash = (h & 0xffff) as u16;
    if seed_hash == 0 { 1 } else { seed_hash }
}
