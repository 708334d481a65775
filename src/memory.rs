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

//! Positional byte-region access shared by the heap and direct sketch forms.
//!
//! A [`MemoryView`] gives both `quantiles` and `theta` the same typed
//! get/put contract regardless of whether the backing bytes are owned
//! (`HeapMemory`) or borrowed from the caller (`DirectMemory`). Every
//! accessor is little-endian; offsets are plain byte positions by
//! convention, never raw pointers.

use crate::error::Error;

/// Positional little-endian access over a byte region.
pub trait MemoryView {
    /// Total capacity of the region in bytes.
    fn capacity(&self) -> usize;

    /// True if this view is not backed by a heap-allocated `Vec<u8>` (i.e. it
    /// wraps a caller-supplied region).
    fn is_direct(&self) -> bool;

    /// True if writes are rejected.
    fn is_read_only(&self) -> bool;

    fn get_byte(&self, offset: usize) -> Result<u8, Error>;
    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), Error>;

    fn get_short(&self, offset: usize) -> Result<u16, Error>;
    fn put_short(&mut self, offset: usize, value: u16) -> Result<(), Error>;

    fn get_int(&self, offset: usize) -> Result<u32, Error>;
    fn put_int(&mut self, offset: usize, value: u32) -> Result<(), Error>;

    fn get_long(&self, offset: usize) -> Result<u64, Error>;
    fn put_long(&mut self, offset: usize, value: u64) -> Result<(), Error>;

    fn get_double(&self, offset: usize) -> Result<f64, Error>;
    fn put_double(&mut self, offset: usize, value: f64) -> Result<(), Error>;

    /// Copies `count` longs starting at `offset` into `out`.
    fn get_long_array(&self, offset: usize, out: &mut [u64]) -> Result<(), Error> {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.get_long(offset + i * 8)?;
        }
        Ok(())
    }

    /// Writes `values` starting at `offset`.
    fn put_long_array(&mut self, offset: usize, values: &[u64]) -> Result<(), Error> {
        for (i, &v) in values.iter().enumerate() {
            self.put_long(offset + i * 8, v)?;
        }
        Ok(())
    }

    /// Two views alias iff they wrap the same underlying region at the same
    /// offset with the same capacity. The default (conservative) answer is
    /// `false`: only same-type views with shared backing can prove aliasing.
    fn is_same_resource(&self, _other: &dyn MemoryView) -> bool {
        false
    }
}

fn bounds_check(offset: usize, width: usize, capacity: usize) -> Result<(), Error> {
    if offset.checked_add(width).is_none_or(|end| end > capacity) {
        return Err(Error::out_of_range(
            "offset",
            offset,
            &format!("[0, {})", capacity.saturating_sub(width).saturating_add(1)),
        ));
    }
    Ok(())
}

/// A heap-owned byte region.
#[derive(Debug, Clone)]
pub struct HeapMemory {
    bytes: Vec<u8>,
}

impl HeapMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity],
        }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

macro_rules! impl_heap_accessors {
    ($ty:ty, $width:expr, $get:ident, $put:ident, $from_le:path, $to_le:ident) => {
        fn $get(&self, offset: usize) -> Result<$ty, Error> {
            bounds_check(offset, $width, self.bytes.len())?;
            let mut buf = [0u8; $width];
            buf.copy_from_slice(&self.bytes[offset..offset + $width]);
            Ok($from_le(buf))
        }

        fn $put(&mut self, offset: usize, value: $ty) -> Result<(), Error> {
            bounds_check(offset, $width, self.bytes.len())?;
            self.bytes[offset..offset + $width].copy_from_slice(&value.$to_le());
            Ok(())
        }
    };
}

impl MemoryView for HeapMemory {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn is_direct(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn get_byte(&self, offset: usize) -> Result<u8, Error> {
        bounds_check(offset, 1, self.bytes.len())?;
        Ok(self.bytes[offset])
    }

    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        bounds_check(offset, 1, self.bytes.len())?;
        self.bytes[offset] = value;
        Ok(())
    }

    impl_heap_accessors!(u16, 2, get_short, put_short, u16::from_le_bytes, to_le_bytes);
    impl_heap_accessors!(u32, 4, get_int, put_int, u32::from_le_bytes, to_le_bytes);
    impl_heap_accessors!(u64, 8, get_long, put_long, u64::from_le_bytes, to_le_bytes);

    fn get_double(&self, offset: usize) -> Result<f64, Error> {
        self.get_long(offset).map(f64::from_bits)
    }

    fn put_double(&mut self, offset: usize, value: f64) -> Result<(), Error> {
        self.put_long(offset, value.to_bits())
    }

    fn is_same_resource(&self, other: &dyn MemoryView) -> bool {
        let _ = other;
        false
    }
}

/// A caller-supplied, mutable byte region (models off-heap storage without
/// exposing raw pointers).
pub struct DirectMemory<'a> {
    bytes: &'a mut [u8],
}

impl<'a> DirectMemory<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }
}

impl MemoryView for DirectMemory<'_> {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn is_direct(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn get_byte(&self, offset: usize) -> Result<u8, Error> {
        bounds_check(offset, 1, self.bytes.len())?;
        Ok(self.bytes[offset])
    }

    fn put_byte(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        bounds_check(offset, 1, self.bytes.len())?;
        self.bytes[offset] = value;
        Ok(())
    }

    fn get_short(&self, offset: usize) -> Result<u16, Error> {
        bounds_check(offset, 2, self.bytes.len())?;
        Ok(u16::from_le_bytes(
            self.bytes[offset..offset + 2].try_into().unwrap(),
        ))
    }

    fn put_short(&mut self, offset: usize, value: u16) -> Result<(), Error> {
        bounds_check(offset, 2, self.bytes.len())?;
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn get_int(&self, offset: usize) -> Result<u32, Error> {
        bounds_check(offset, 4, self.bytes.len())?;
        Ok(u32::from_le_bytes(
            self.bytes[offset..offset + 4].try_into().unwrap(),
        ))
    }

    fn put_int(&mut self, offset: usize, value: u32) -> Result<(), Error> {
        bounds_check(offset, 4, self.bytes.len())?;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn get_long(&self, offset: usize) -> Result<u64, Error> {
        bounds_check(offset, 8, self.bytes.len())?;
        Ok(u64::from_le_bytes(
            self.bytes[offset..offset + 8].try_into().unwrap(),
        ))
    }

    fn put_long(&mut self, offset: usize, value: u64) -> Result<(), Error> {
        bounds_check(offset, 8, self.bytes.len())?;
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn get_double(&self, offset: usize) -> Result<f64, Error> {
        self.get_long(offset).map(f64::from_bits)
    }

    fn put_double(&mut self, offset: usize, value: f64) -> Result<(), Error> {
        self.put_long(offset, value.to_bits())
    }

    fn is_same_resource(&self, other: &dyn MemoryView) -> bool {
        let _ = other;
        false
    }
}

/// A read-only view over borrowed bytes; every `put_*` call fails with
/// [`ErrorKind::IllegalState`](crate::error::ErrorKind::IllegalState).
pub struct ReadOnlyMemory<'a> {
    bytes: &'a [u8],
}

impl<'a> ReadOnlyMemory<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl MemoryView for ReadOnlyMemory<'_> {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn is_direct(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn get_byte(&self, offset: usize) -> Result<u8, Error> {
        bounds_check(offset, 1, self.bytes.len())?;
        Ok(self.bytes[offset])
    }

    fn put_byte(&mut self, _offset: usize, _value: u8) -> Result<(), Error> {
        Err(Error::illegal_state("cannot write to a read-only memory view"))
    }

    fn get_short(&self, offset: usize) -> Result<u16, Error> {
        bounds_check(offset, 2, self.bytes.len())?;
        Ok(u16::from_le_bytes(
            self.bytes[offset..offset + 2].try_into().unwrap(),
        ))
    }

    fn put_short(&mut self, _offset: usize, _value: u16) -> Result<(), Error> {
        Err(Error::illegal_state("cannot write to a read-only memory view"))
    }

    fn get_int(&self, offset: usize) -> Result<u32, Error> {
        bounds_check(offset, 4, self.bytes.len())?;
        Ok(u32::from_le_bytes(
            self.bytes[offset..offset + 4].try_into().unwrap(),
        ))
    }

    fn put_int(&mut self, _offset: usize, _value: u32) -> Result<(), Error> {
        Err(Error::illegal_state("cannot write to a read-only memory view"))
    }

    fn get_long(&self, offset: usize) -> Result<u64, Error> {
        bounds_check(offset, 8, self.bytes.len())?;
        Ok(u64::from_le_bytes(
            self.bytes[offset..offset + 8].try_into().unwrap(),
        ))
    }

    fn put_long(&mut self, _offset: usize, _value: u64) -> Result<(), Error> {
        Err(Error::illegal_state("cannot write to a read-only memory view"))
    }

    fn get_double(&self, offset: usize) -> Result<f64, Error> {
        self.get_long(offset).map(f64::from_bits)
    }

    fn put_double(&mut self, _offset: usize, _value: f64) -> Result<(), Error> {
        Err(Error::illegal_state("cannot write to a read-only memory view"))
    }

    fn is_same_resource(&self, other: &dyn MemoryView) -> bool {
        let _ = other;
        false
    }
}
