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

//! Family identifiers and shared preamble flag bits.

use crate::error::Error;

/// Defines a family of sketch classes that share a serialized preamble shape
/// and fundamental algorithm, even when update-form and compact-form members
/// differ in storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    /// The byte ID for this family, written into preamble byte 2.
    pub id: u8,
    /// The name for this family, used in error messages.
    pub name: &'static str,
    /// The minimum preamble size for this family, in 8-byte longs.
    pub min_pre_longs: u8,
    /// The maximum preamble size for this family, in 8-byte longs.
    pub max_pre_longs: u8,
}

impl Family {
    /// The alpha-sketch theta family, before the first compaction forces a
    /// switch to quickselect.
    pub const ALPHA: Family = Family {
        id: 1,
        name: "ALPHA",
        min_pre_longs: 1,
        max_pre_longs: 3,
    };

    /// The quickselect theta family: open-addressed update-form sketches.
    pub const QUICKSELECT: Family = Family {
        id: 2,
        name: "QUICKSELECT",
        min_pre_longs: 1,
        max_pre_longs: 3,
    };

    /// Compact, read-only theta sketches produced by `compact()` or a set
    /// operation's `result()`.
    pub const COMPACT: Family = Family {
        id: 3,
        name: "COMPACT",
        min_pre_longs: 1,
        max_pre_longs: 3,
    };

    /// The Doubles quantiles family.
    pub const QUANTILES: Family = Family {
        id: 8,
        name: "QUANTILES",
        min_pre_longs: 1,
        max_pre_longs: 2,
    };

    /// Tuple sketches (summary-carrying theta variant); recognized so that
    /// `validate_id` rejects them with a specific name rather than a bare
    /// mismatch, but otherwise out of scope.
    pub const TUPLE: Family = Family {
        id: 9,
        name: "TUPLE",
        min_pre_longs: 1,
        max_pre_longs: 4,
    };

    /// Validates a preamble byte against this family's id.
    pub fn validate_id(&self, family_id: u8) -> Result<(), Error> {
        if family_id != self.id {
            Err(Error::invalid_family(self.id, family_id, self.name))
        } else {
            Ok(())
        }
    }
}

/// Flag: data is stored big-endian. Always written `0`; a `1` on read is a
/// fatal decode error since this crate only ever serializes little-endian.
pub const FLAG_BIG_ENDIAN: u8 = 1 << 0;
/// Flag: the sketch is read-only (every compact image is).
pub const FLAG_READ_ONLY: u8 = 1 << 1;
/// Flag: the sketch holds no updates.
pub const FLAG_EMPTY: u8 = 1 << 2;
/// Flag: the sketch is in compact (densely packed, immutable) form.
pub const FLAG_COMPACT: u8 = 1 << 3;
/// Flag: retained hashes are sorted ascending.
pub const FLAG_ORDERED: u8 = 1 << 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(Family::QUANTILES.validate_id(8).is_ok());
        assert!(Family::QUANTILES.validate_id(2).is_err());
    }

    #[test]
    fn test_flags_are_distinct_bits() {
        let flags = [
            FLAG_BIG_ENDIAN,
            FLAG_READ_ONLY,
            FLAG_EMPTY,
            FLAG_COMPACT,
            FLAG_ORDERED,
        ];
        for (i, &a) in flags.iter().enumerate() {
            for &b in &flags[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }
}
