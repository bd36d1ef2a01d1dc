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

//! Utilities for tests: random data generation, value serialization and an
//! in-memory page reader.

use rand::{thread_rng, Rng};
use rand::distributions::range::SampleRange;

use byteorder::{ByteOrder, LittleEndian};

use column::page::{Page, PageReader};
use data_type::*;
use errors::Result;
use util::bit_util;
use util::memory::ByteBufferPtr;

// ----------------------------------------------------------------------
// Random generation

pub trait RandGen<T: DataType> {
  fn gen(len: i32) -> T::T;

  fn gen_vec(len: i32, total: usize) -> Vec<T::T> {
    let mut result = vec![];
    for _ in 0..total {
      result.push(Self::gen(len))
    }
    result
  }
}

macro_rules! impl_rand_gen {
  ($ty:ident) => {
    impl RandGen<$ty> for $ty {
      fn gen(_: i32) -> <$ty as DataType>::T {
        let mut rng = thread_rng();
        rng.gen()
      }
    }
  };
}

impl_rand_gen!(BoolType);
impl_rand_gen!(Int32Type);
impl_rand_gen!(Int64Type);
impl_rand_gen!(FloatType);
impl_rand_gen!(DoubleType);

impl RandGen<Int96Type> for Int96Type {
  fn gen(_: i32) -> Int96 {
    let mut rng = thread_rng();
    let mut result = Int96::new();
    result.set_data(rng.gen::<u32>(), rng.gen::<u32>(), rng.gen::<u32>());
    result
  }
}

impl RandGen<ByteArrayType> for ByteArrayType {
  fn gen(_: i32) -> ByteArray {
    let mut rng = thread_rng();
    let mut result = ByteArray::new();
    let mut value = vec![];
    let len = rng.gen_range::<usize>(0, 128);
    for _ in 0..len {
      value.push(rng.gen_range(0, 255) & 0xFF);
    }
    result.set_data(ByteBufferPtr::new(value));
    result
  }
}

impl RandGen<FixedLenByteArrayType> for FixedLenByteArrayType {
  fn gen(len: i32) -> ByteArray {
    let mut rng = thread_rng();
    let value_len = if len < 0 {
      rng.gen_range::<usize>(0, 128)
    } else {
      len as usize
    };
    let value = random_bytes(value_len);
    ByteArray::from(value)
  }
}

pub fn random_bytes(n: usize) -> Vec<u8> {
  let mut result = vec![];
  let mut rng = thread_rng();
  for _ in 0..n {
    result.push(rng.gen_range(0, 255) & 0xFF);
  }
  result
}

pub fn random_numbers_range<T>(
  n: usize,
  low: T,
  high: T,
  result: &mut Vec<T>
) where T: PartialOrd + SampleRange + Copy {
  let mut rng = thread_rng();
  for _ in 0..n {
    result.push(rng.gen_range(low, high));
  }
}

// ----------------------------------------------------------------------
// Value serialization into plain page bytes

/// Converts a slice of values into the plain byte layout [`PlainDecoder`]
/// understands.
pub trait ToByteArray: DataType {
  fn to_byte_array(data: &[Self::T]) -> Vec<u8>;
}

macro_rules! impl_to_byte_array {
  ($ty:ident, $native_ty:ty, $size:expr, $write_into:ident) => {
    impl ToByteArray for $ty {
      fn to_byte_array(data: &[$native_ty]) -> Vec<u8> {
        let mut v = vec![0u8; $size * data.len()];
        LittleEndian::$write_into(data, &mut v[..]);
        v
      }
    }
  };
}

impl_to_byte_array!(Int32Type, i32, 4, write_i32_into);
impl_to_byte_array!(Int64Type, i64, 8, write_i64_into);
impl_to_byte_array!(FloatType, f32, 4, write_f32_into);
impl_to_byte_array!(DoubleType, f64, 8, write_f64_into);

impl ToByteArray for BoolType {
  fn to_byte_array(data: &[bool]) -> Vec<u8> {
    let mut v = vec![0u8; bit_util::bytes_for_bits(data.len())];
    for i in 0..data.len() {
      if data[i] {
        bit_util::set_bit(&mut v[..], i);
      }
    }
    v
  }
}

impl ToByteArray for Int96Type {
  fn to_byte_array(data: &[Int96]) -> Vec<u8> {
    let mut v = vec![0u8; 12 * data.len()];
    for (i, value) in data.iter().enumerate() {
      LittleEndian::write_u32_into(value.data(), &mut v[12 * i..12 * (i + 1)]);
    }
    v
  }
}

impl ToByteArray for ByteArrayType {
  fn to_byte_array(data: &[ByteArray]) -> Vec<u8> {
    let mut v = vec![];
    for value in data {
      let mut len = [0u8; 4];
      LittleEndian::write_u32(&mut len, value.len() as u32);
      v.extend_from_slice(&len);
      v.extend_from_slice(value.data());
    }
    v
  }
}

impl ToByteArray for FixedLenByteArrayType {
  fn to_byte_array(data: &[ByteArray]) -> Vec<u8> {
    let mut v = vec![];
    for value in data {
      v.extend_from_slice(value.data());
    }
    v
  }
}

// ----------------------------------------------------------------------
// In-memory pages

/// A utility struct for building data pages. Levels are attached decoded and
/// values in plain layout, which is the form pages reach this crate in.
pub struct DataPageBuilder {
  num_values: u32,
  def_levels: Option<Vec<i16>>,
  rep_levels: Option<Vec<i16>>,
  buffer: Vec<u8>
}

impl DataPageBuilder {
  pub fn new(num_values: usize) -> Self {
    DataPageBuilder {
      num_values: num_values as u32,
      def_levels: None,
      rep_levels: None,
      buffer: vec![]
    }
  }

  pub fn def_levels(mut self, levels: &[i16]) -> Self {
    self.def_levels = Some(levels.to_vec());
    self
  }

  pub fn rep_levels(mut self, levels: &[i16]) -> Self {
    self.rep_levels = Some(levels.to_vec());
    self
  }

  pub fn values<T: ToByteArray>(mut self, values: &[T::T]) -> Self {
    self.buffer = T::to_byte_array(values);
    self
  }

  pub fn consume(self) -> Page {
    Page {
      buf: ByteBufferPtr::new(self.buffer),
      num_values: self.num_values,
      def_levels: self.def_levels,
      rep_levels: self.rep_levels
    }
  }
}

/// A utility page reader which stores pages in memory.
pub struct InMemoryPageReader {
  pages: ::std::vec::IntoIter<Page>
}

impl InMemoryPageReader {
  pub fn new(pages: Vec<Page>) -> Self {
    InMemoryPageReader { pages: pages.into_iter() }
  }
}

impl PageReader for InMemoryPageReader {
  fn get_next_page(&mut self) -> Result<Option<Page>> {
    Ok(self.pages.next())
  }
}
