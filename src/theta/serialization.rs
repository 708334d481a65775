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

//! Preamble layout constants for the Theta sketch binary format.
//!
//! Flag bits are the shared ones in [`crate::family`]; this module only
//! holds the layout details specific to Theta: serial version, preamble
//! lengths per mode, and the single-item special case.

pub use crate::family::FLAG_BIG_ENDIAN;
pub use crate::family::FLAG_COMPACT;
pub use crate::family::FLAG_EMPTY;
pub use crate::family::FLAG_ORDERED;
pub use crate::family::FLAG_READ_ONLY;

/// Current serialization version.
pub const SERIAL_VERSION: u8 = 3;

/// Preamble size for an empty sketch (8 bytes = 1 long).
pub const PREAMBLE_LONGS_EMPTY: u8 = 1;

/// Preamble size for an exact-mode or single-item sketch (16 bytes = 2
/// longs).
pub const PREAMBLE_LONGS_EXACT: u8 = 2;

/// Preamble size for an estimation-mode sketch (24 bytes = 3 longs).
pub const PREAMBLE_LONGS_ESTIMATION: u8 = 3;

/// Flag: the compact image holds exactly one retained hash, encoded with
/// [`PREAMBLE_LONGS_EMPTY`] longs of preamble followed by that one hash.
pub const FLAG_SINGLE_ITEM: u8 = 1 << 5;

/// Size of a single hash entry in bytes.
pub const HASH_SIZE_BYTES: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_masks_are_distinct() {
        let flags = [
            FLAG_BIG_ENDIAN,
            FLAG_READ_ONLY,
            FLAG_EMPTY,
            FLAG_COMPACT,
            FLAG_ORDERED,
            FLAG_SINGLE_ITEM,
        ];
        for (i, &a) in flags.iter().enumerate() {
            for &b in &flags[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }
}
