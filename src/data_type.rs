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

//! Data types that connect the physical type enum with the native Rust types
//! values decode into.

use std::fmt;
use std::mem;

use basic::Type;
use util::memory::ByteBufferPtr;

/// A 96-bit value, stored as three little-endian 32-bit words. Kept as plain
/// old data so it can live in the packed values buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Int96 {
  value: [u32; 3]
}

impl Int96 {
  pub fn new() -> Self {
    Int96 { value: [0; 3] }
  }

  pub fn data(&self) -> &[u32] {
    &self.value
  }

  pub fn set_data(&mut self, elem0: u32, elem1: u32, elem2: u32) {
    self.value = [elem0, elem1, elem2];
  }
}

impl From<[u32; 3]> for Int96 {
  fn from(value: [u32; 3]) -> Int96 {
    Int96 { value: value }
  }
}

impl fmt::Display for Int96 {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self.data())
  }
}

/// A variable (or fixed) length byte value, pointing into the buffer it was
/// decoded from.
#[derive(Clone, Debug, Default)]
pub struct ByteArray {
  data: Option<ByteBufferPtr>
}

impl ByteArray {
  pub fn new() -> Self {
    ByteArray { data: None }
  }

  pub fn len(&self) -> usize {
    self.data.as_ref().map(|d| d.len()).unwrap_or(0)
  }

  pub fn data(&self) -> &[u8] {
    self.data.as_ref().expect("set_data should have been called").data()
  }

  pub fn set_data(&mut self, data: ByteBufferPtr) {
    self.data = Some(data);
  }
}

impl From<Vec<u8>> for ByteArray {
  fn from(buf: Vec<u8>) -> ByteArray {
    ByteArray { data: Some(ByteBufferPtr::new(buf)) }
  }
}

impl<'a> From<&'a str> for ByteArray {
  fn from(s: &'a str) -> ByteArray {
    ByteArray::from(s.as_bytes().to_vec())
  }
}

impl PartialEq for ByteArray {
  fn eq(&self, other: &ByteArray) -> bool {
    match (self.data.as_ref(), other.data.as_ref()) {
      (Some(v1), Some(v2)) => v1.data() == v2.data(),
      (None, None) => true,
      _ => false
    }
  }
}

impl fmt::Display for ByteArray {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self.data.as_ref().map(|d| d.data()))
  }
}

// ----------------------------------------------------------------------
// Data type traits

/// Contains the physical data type and the native Rust type values of a
/// column decode into.
pub trait DataType: 'static {
  type T: PartialEq + fmt::Debug + Default + Clone;

  fn get_physical_type() -> Type;

  /// Size of a single value in bytes when stored in the packed values buffer.
  /// Only meaningful for fixed-width physical types.
  fn get_type_size() -> usize;
}

macro_rules! make_type {
  ($name:ident, $physical_ty:path, $native_ty:ty, $size:expr) => {
    pub struct $name {}

    impl DataType for $name {
      type T = $native_ty;

      fn get_physical_type() -> Type {
        $physical_ty
      }

      fn get_type_size() -> usize {
        $size
      }
    }
  };
}

make_type!(BoolType, Type::BOOLEAN, bool, 1);
make_type!(Int32Type, Type::INT32, i32, 4);
make_type!(Int64Type, Type::INT64, i64, 8);
make_type!(Int96Type, Type::INT96, Int96, mem::size_of::<Int96>());
make_type!(FloatType, Type::FLOAT, f32, 4);
make_type!(DoubleType, Type::DOUBLE, f64, 8);
make_type!(ByteArrayType, Type::BYTE_ARRAY, ByteArray, mem::size_of::<ByteArray>());
make_type!(
  FixedLenByteArrayType,
  Type::FIXED_LEN_BYTE_ARRAY,
  ByteArray,
  mem::size_of::<ByteArray>()
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_int96() {
    let mut value = Int96::new();
    assert_eq!(value.data(), &[0, 0, 0]);
    value.set_data(1, 22, 333);
    assert_eq!(value.data(), &[1, 22, 333]);
    assert_eq!(mem::size_of::<Int96>(), 12);
    assert_eq!(Int96Type::get_type_size(), 12);
  }

  #[test]
  fn test_byte_array() {
    let mut value = ByteArray::new();
    assert_eq!(value.len(), 0);
    value.set_data(ByteBufferPtr::new(vec![1, 2, 3]));
    assert_eq!(value.len(), 3);
    assert_eq!(value.data(), &[1, 2, 3]);
    assert_eq!(value, ByteArray::from(vec![1, 2, 3]));
    assert_eq!(ByteArray::from("abc").data(), "abc".as_bytes());
  }

  #[test]
  fn test_physical_types() {
    assert_eq!(BoolType::get_physical_type(), Type::BOOLEAN);
    assert_eq!(Int32Type::get_physical_type(), Type::INT32);
    assert_eq!(Int64Type::get_physical_type(), Type::INT64);
    assert_eq!(Int96Type::get_physical_type(), Type::INT96);
    assert_eq!(FloatType::get_physical_type(), Type::FLOAT);
    assert_eq!(DoubleType::get_physical_type(), Type::DOUBLE);
    assert_eq!(ByteArrayType::get_physical_type(), Type::BYTE_ARRAY);
    assert_eq!(FixedLenByteArrayType::get_physical_type(), Type::FIXED_LEN_BYTE_ARRAY);
  }

  #[test]
  fn test_type_sizes() {
    assert_eq!(BoolType::get_type_size(), 1);
    assert_eq!(Int32Type::get_type_size(), 4);
    assert_eq!(Int64Type::get_type_size(), 8);
    assert_eq!(FloatType::get_type_size(), 4);
    assert_eq!(DoubleType::get_type_size(), 8);
  }
}
