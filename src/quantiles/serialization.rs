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

//! Preamble layout constants for the doubles family. Flag bits are shared
//! with `theta` via [`crate::family`]; only the preamble-longs counts and
//! serial version are specific to doubles.

pub(crate) use crate::family::FLAG_BIG_ENDIAN;
pub(crate) use crate::family::FLAG_COMPACT;
pub(crate) use crate::family::FLAG_EMPTY;

/// Only serial version this crate accepts; legacy decoders live outside the
/// core.
pub(crate) const SERIAL_VERSION: u8 = 1;

/// Preamble size, in 8-byte longs, for an empty sketch: just the header.
pub(crate) const PRE_LONGS_EMPTY: u8 = 1;

/// Preamble size, in 8-byte longs, once `N`, `min`, and `max` are present.
pub(crate) const PRE_LONGS_FULL: u8 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_longs_empty_is_smaller_than_full() {
        assert!(PRE_LONGS_EMPTY < PRE_LONGS_FULL);
    }
}
