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

//! Uniform positional view over a doubles sketch's payload: the base buffer
//! at "level 0" and each compacted level above it. Serialization code walks
//! both via the same `get`/`set`/`set_level` contract instead of branching
//! on which part of the sketch it's touching.

/// Positional accessor over a doubles sketch's base buffer and levels.
///
/// `level == 0` addresses the base buffer; `level == i` for `i >= 1`
/// addresses `levels[i - 1]`.
pub(crate) trait DoublesAccessor {
    /// Number of addressable items at the current level.
    fn num_items(&self) -> usize;

    /// Reads the item at `index` within the current level.
    fn get(&self, index: usize) -> f64;

    /// Writes `value` at `index` within the current level, growing the
    /// backing vector if needed.
    fn set(&mut self, index: usize, value: f64);

    /// Copies out `count` contiguous items starting at `start`.
    fn get_array(&self, start: usize, count: usize) -> Vec<f64> {
        (start..start + count).map(|i| self.get(i)).collect()
    }

    /// Switches the window the accessor reads and writes through.
    fn set_level(&mut self, level: usize);
}

/// Reports every populated level at its full width `k`, padding with zeros
/// as needed. Used for the updatable layout, where capacity (not current
/// occupancy) determines the addressable range.
pub(crate) struct FullAccessor<'a> {
    k: usize,
    base_buffer: &'a mut Vec<f64>,
    levels: &'a mut Vec<Vec<f64>>,
    level: usize,
}

impl<'a> FullAccessor<'a> {
    pub fn new(base_buffer: &'a mut Vec<f64>, levels: &'a mut Vec<Vec<f64>>, k: usize) -> Self {
        Self {
            k,
            base_buffer,
            levels,
            level: 0,
        }
    }
}

impl DoublesAccessor for FullAccessor<'_> {
    fn num_items(&self) -> usize {
        if self.level == 0 {
            self.base_buffer.len()
        } else {
            self.k
        }
    }

    fn get(&self, index: usize) -> f64 {
        if self.level == 0 {
            self.base_buffer[index]
        } else {
            self.levels[self.level - 1][index]
        }
    }

    fn set(&mut self, index: usize, value: f64) {
        if self.level == 0 {
            if index >= self.base_buffer.len() {
                self.base_buffer.resize(index + 1, 0.0);
            }
            self.base_buffer[index] = value;
        } else {
            let lvl = &mut self.levels[self.level - 1];
            if lvl.len() < self.k {
                lvl.resize(self.k, 0.0);
            }
            lvl[index] = value;
        }
    }

    fn set_level(&mut self, level: usize) {
        if level > 0 {
            while self.levels.len() < level {
                self.levels.push(Vec::new());
            }
        }
        self.level = level;
    }
}

/// Reports only the populated window of the current level: the base
/// buffer's actual occupancy, or exactly `k` for a populated level. Used
/// for the compact layout, which skips unpopulated levels entirely.
pub(crate) struct CompactAccessor<'a> {
    k: usize,
    base_buffer: &'a mut Vec<f64>,
    levels: &'a mut Vec<Vec<f64>>,
    level: usize,
}

impl<'a> CompactAccessor<'a> {
    pub fn new(base_buffer: &'a mut Vec<f64>, levels: &'a mut Vec<Vec<f64>>, k: usize) -> Self {
        Self {
            k,
            base_buffer,
            levels,
            level: 0,
        }
    }
}

impl DoublesAccessor for CompactAccessor<'_> {
    fn num_items(&self) -> usize {
        if self.level == 0 {
            self.base_buffer.len()
        } else {
            self.levels[self.level - 1].len()
        }
    }

    fn get(&self, index: usize) -> f64 {
        if self.level == 0 {
            self.base_buffer[index]
        } else {
            self.levels[self.level - 1][index]
        }
    }

    fn set(&mut self, index: usize, value: f64) {
        if self.level == 0 {
            if index >= self.base_buffer.len() {
                self.base_buffer.resize(index + 1, 0.0);
            }
            self.base_buffer[index] = value;
        } else {
            let lvl = &mut self.levels[self.level - 1];
            if index >= lvl.len() {
                lvl.resize(self.k, 0.0);
            }
            lvl[index] = value;
        }
    }

    fn set_level(&mut self, level: usize) {
        if level > 0 {
            while self.levels.len() < level {
                self.levels.push(Vec::new());
            }
        }
        self.level = level;
    }
}
