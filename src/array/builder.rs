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

//! Mutable builders that accumulate values and nulls, then freeze into the
//! immutable arrays of the parent module. `finish` hands the accumulated
//! buffers out and leaves the builder empty, ready for the next chunk.

use std::fmt;
use std::mem;

use array::{Bitmap, BinaryArray, FixedSizeBinaryArray, PrimitiveArray, StringArray};
use errors::{DremelError, Result};
use util::bit_util;

// Appends one validity bit, growing the byte vector as needed. Cleared bits
// need no write since new bytes start zeroed.
fn append_validity_bit(bits: &mut Vec<u8>, len: usize, valid: bool) {
  if bits.len() < bit_util::bytes_for_bits(len + 1) {
    bits.push(0);
  }
  if valid {
    bit_util::set_bit(bits, len);
  }
}

fn take_validity(bits: &mut Vec<u8>, len: usize, null_count: usize) -> Option<Bitmap> {
  let bits = mem::replace(bits, vec![]);
  if null_count > 0 {
    Some(Bitmap::new(bits, len))
  } else {
    None
  }
}

// ----------------------------------------------------------------------
// Fixed-width builder

/// Builder for arrays of a fixed-width native type. Null slots hold the
/// type's default value as a placeholder.
pub struct PrimitiveBuilder<N> {
  values: Vec<N>,
  valid_bits: Vec<u8>,
  null_count: usize
}

impl<N: Copy + Default + PartialEq + fmt::Debug> PrimitiveBuilder<N> {
  pub fn new() -> Self {
    PrimitiveBuilder { values: vec![], valid_bits: vec![], null_count: 0 }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn append(&mut self, value: N) {
    append_validity_bit(&mut self.valid_bits, self.values.len(), true);
    self.values.push(value);
  }

  pub fn append_null(&mut self) {
    append_validity_bit(&mut self.valid_bits, self.values.len(), false);
    self.values.push(N::default());
    self.null_count += 1;
  }

  pub fn append_option(&mut self, value: Option<N>) {
    match value {
      Some(v) => self.append(v),
      None => self.append_null()
    }
  }

  /// Freezes the accumulated values into an array and resets the builder.
  pub fn finish(&mut self) -> PrimitiveArray<N> {
    let len = self.values.len();
    let null_count = self.null_count;
    let values = mem::replace(&mut self.values, vec![]);
    let validity = take_validity(&mut self.valid_bits, len, null_count);
    self.null_count = 0;
    PrimitiveArray::from_data(values, validity, null_count)
  }
}

// ----------------------------------------------------------------------
// Variable-length builders

/// Builder for arrays of variable length byte values.
pub struct BinaryBuilder {
  offsets: Vec<i32>,
  data: Vec<u8>,
  valid_bits: Vec<u8>,
  null_count: usize
}

impl BinaryBuilder {
  pub fn new() -> Self {
    BinaryBuilder {
      offsets: vec![0],
      data: vec![],
      valid_bits: vec![],
      null_count: 0
    }
  }

  pub fn len(&self) -> usize {
    self.offsets.len() - 1
  }

  pub fn append(&mut self, value: &[u8]) -> Result<()> {
    let end = (self.data.len() as u64)
      .checked_add(value.len() as u64)
      .ok_or(corrupt_err!("Binary array data overflows u64"))?;
    if end > i32::max_value() as u64 {
      return Err(corrupt_err!("Binary array data exceeds 2^31 bytes"));
    }
    let len = self.len();
    append_validity_bit(&mut self.valid_bits, len, true);
    self.data.extend_from_slice(value);
    self.offsets.push(end as i32);
    Ok(())
  }

  pub fn append_null(&mut self) {
    let len = self.len();
    append_validity_bit(&mut self.valid_bits, len, false);
    let end = self.data.len() as i32;
    self.offsets.push(end);
    self.null_count += 1;
  }

  pub fn finish(&mut self) -> BinaryArray {
    let (offsets, data, validity, null_count) = self.take_parts();
    BinaryArray::from_data(offsets, data, validity, null_count)
  }

  fn take_parts(&mut self) -> (Vec<i32>, Vec<u8>, Option<Bitmap>, usize) {
    let len = self.len();
    let null_count = self.null_count;
    let offsets = mem::replace(&mut self.offsets, vec![0]);
    let data = mem::replace(&mut self.data, vec![]);
    let validity = take_validity(&mut self.valid_bits, len, null_count);
    self.null_count = 0;
    (offsets, data, validity, null_count)
  }
}

/// Builder for string arrays. Shares the binary layout but only accepts
/// valid utf8.
pub struct StringBuilder {
  inner: BinaryBuilder
}

impl StringBuilder {
  pub fn new() -> Self {
    StringBuilder { inner: BinaryBuilder::new() }
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn append(&mut self, value: &str) -> Result<()> {
    self.inner.append(value.as_bytes())
  }

  pub fn append_null(&mut self) {
    self.inner.append_null()
  }

  pub fn finish(&mut self) -> StringArray {
    let (offsets, data, validity, null_count) = self.inner.take_parts();
    StringArray::from_data(offsets, data, validity, null_count)
  }
}

/// Builder for fixed-width byte values. Null slots hold zeroed bytes.
pub struct FixedSizeBinaryBuilder {
  width: i32,
  data: Vec<u8>,
  valid_bits: Vec<u8>,
  null_count: usize
}

impl FixedSizeBinaryBuilder {
  pub fn new(width: i32) -> Self {
    assert!(width > 0);
    FixedSizeBinaryBuilder {
      width: width,
      data: vec![],
      valid_bits: vec![],
      null_count: 0
    }
  }

  pub fn len(&self) -> usize {
    self.data.len() / self.width as usize
  }

  pub fn append(&mut self, value: &[u8]) -> Result<()> {
    if value.len() != self.width as usize {
      return Err(corrupt_err!(
        "Value has {} bytes, expected exactly {}", value.len(), self.width));
    }
    let len = self.len();
    append_validity_bit(&mut self.valid_bits, len, true);
    self.data.extend_from_slice(value);
    Ok(())
  }

  pub fn append_null(&mut self) {
    let len = self.len();
    append_validity_bit(&mut self.valid_bits, len, false);
    let new_len = self.data.len() + self.width as usize;
    self.data.resize(new_len, 0);
    self.null_count += 1;
  }

  pub fn finish(&mut self) -> FixedSizeBinaryArray {
    let len = self.len();
    let null_count = self.null_count;
    let data = mem::replace(&mut self.data, vec![]);
    let validity = take_validity(&mut self.valid_bits, len, null_count);
    self.null_count = 0;
    FixedSizeBinaryArray::from_data(self.width, data, validity, null_count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_primitive_builder() {
    let mut builder = PrimitiveBuilder::<i32>::new();
    builder.append(5);
    builder.append_null();
    builder.append_option(Some(7));
    builder.append_option(None);
    assert_eq!(builder.len(), 4);

    let array = builder.finish();
    assert_eq!(array.len(), 4);
    assert_eq!(array.null_count(), 2);
    assert_eq!(array.value(0), 5);
    assert!(array.is_null(1));
    assert_eq!(array.value(2), 7);
    assert!(array.is_null(3));

    // builder is reusable after finish
    builder.append(1);
    let array = builder.finish();
    assert_eq!(array.len(), 1);
    assert_eq!(array.null_count(), 0);
    assert!(array.validity().is_none());
  }

  #[test]
  fn test_binary_builder() {
    let mut builder = BinaryBuilder::new();
    builder.append(b"ab").unwrap();
    builder.append_null();
    builder.append(b"cde").unwrap();

    let array = builder.finish();
    assert_eq!(array.len(), 3);
    assert_eq!(array.null_count(), 1);
    assert_eq!(array.value(0), b"ab");
    assert!(array.is_null(1));
    assert_eq!(array.value(1), b"");
    assert_eq!(array.value(2), b"cde");
    assert_eq!(array.offsets(), &[0, 2, 2, 5]);
  }

  #[test]
  fn test_string_builder() {
    let mut builder = StringBuilder::new();
    builder.append("hi").unwrap();
    builder.append("").unwrap();
    builder.append_null();

    let array = builder.finish();
    assert_eq!(array.len(), 3);
    assert_eq!(array.value(0), "hi");
    assert_eq!(array.value(1), "");
    assert!(array.is_valid(1));
    assert!(array.is_null(2));
  }

  #[test]
  fn test_fixed_size_binary_builder() {
    let mut builder = FixedSizeBinaryBuilder::new(2);
    builder.append(&[1, 2]).unwrap();
    builder.append_null();
    builder.append(&[5, 6]).unwrap();
    assert!(builder.append(&[9]).is_err());

    let array = builder.finish();
    assert_eq!(array.len(), 3);
    assert_eq!(array.value(0), &[1, 2]);
    assert!(array.is_null(1));
    assert_eq!(array.value(1), &[0, 0]);
    assert_eq!(array.value(2), &[5, 6]);
  }
}
