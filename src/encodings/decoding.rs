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

//! Value decoders. The record assembly layer only depends on the [`Decoder`]
//! trait; [`PlainDecoder`] is the bundled reference implementation for pages
//! whose values are stored back to back in little endian.

use std::cmp;
use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};

use data_type::*;
use errors::{DremelError, Result};
use util::bit_util;
use util::memory::ByteBufferPtr;

// ----------------------------------------------------------------------
// Decoders

/// A decoder for the data type `T`.
pub trait Decoder<T: DataType> {
  /// Sets the data to decode to be `data`, which should contain `num_values`
  /// of values to decode.
  fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()>;

  /// Consumes values from this decoder and writes the results to `buffer`.
  /// This will try to fill up `buffer`.
  ///
  /// Returns the actual number of values decoded, which should be equal to
  /// `buffer.len()` unless the remaining number of values is less than
  /// `buffer.len()`.
  fn get(&mut self, buffer: &mut [T::T]) -> Result<usize>;

  /// Consumes `buffer.len() - null_count` values from this decoder and places
  /// them at the positions in `buffer` whose bit in `valid_bits` (starting at
  /// bit `offset`) is set. Positions with a cleared bit are left untouched:
  /// type-valid but unspecified.
  ///
  /// Returns the total number of slots covered, including the null slots.
  fn get_spaced(
    &mut self,
    buffer: &mut [T::T],
    null_count: usize,
    valid_bits: &[u8],
    offset: usize
  ) -> Result<usize> {
    assert!(null_count <= buffer.len());
    let values_to_read = buffer.len() - null_count;
    let values_read = self.get(&mut buffer[..values_to_read])?;
    if values_read != values_to_read {
      return Err(eof_err!(
        "Expected to decode {} values, but decoded {}", values_to_read, values_read));
    }
    if null_count == 0 {
      return Ok(values_read);
    }

    // Spread the dense prefix towards the back of the buffer, so that each
    // decoded value ends up at a position with a set validity bit. Walking
    // backwards guarantees a value is never overwritten before it moves.
    let mut values_idx = values_read;
    for i in (0..buffer.len()).rev() {
      if bit_util::get_bit(valid_bits, offset + i) {
        values_idx -= 1;
        if i != values_idx {
          let value = buffer[values_idx].clone();
          buffer[i] = value;
        }
      }
    }
    Ok(buffer.len())
  }

  /// Returns the number of values left in this decoder stream.
  fn values_left(&self) -> usize;
}

// ----------------------------------------------------------------------
// PLAIN decoding

/// Plain decoding that supports all physical types.
/// Values are stored back to back. Numeric types are little endian, booleans
/// are bit-packed, byte arrays are prefixed with a 4 byte length and
/// fixed-length byte arrays are stored without one.
pub struct PlainDecoder<T: DataType> {
  // The remaining number of values in the byte array
  num_values: usize,

  // The current starting byte offset in the byte array
  start: usize,

  // The current bit offset, for bit-packed booleans
  bit_pos: usize,

  // The value width. Only used when `T` is `FixedLenByteArrayType`
  type_length: i32,

  // The byte array to decode from
  data: Option<ByteBufferPtr>,

  // To allow `T` in the generic parameter for this struct. This doesn't take
  // any space.
  _phantom: PhantomData<T>
}

impl<T: DataType> PlainDecoder<T> {
  /// Creates new plain decoder.
  pub fn new(type_length: i32) -> Self {
    PlainDecoder {
      data: None,
      type_length: type_length,
      num_values: 0,
      start: 0,
      bit_pos: 0,
      _phantom: PhantomData
    }
  }

  #[inline]
  fn reset(&mut self, data: ByteBufferPtr, num_values: usize) {
    self.num_values = num_values;
    self.start = 0;
    self.bit_pos = 0;
    self.data = Some(data);
  }

  #[inline]
  fn data(&self) -> &ByteBufferPtr {
    self.data.as_ref().expect("set_data should have been called")
  }
}

macro_rules! impl_plain_numeric {
  ($ty:ident, $native_ty:ty, $size:expr, $read_into:ident) => {
    impl Decoder<$ty> for PlainDecoder<$ty> {
      #[inline]
      fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
        self.reset(data, num_values);
        Ok(())
      }

      #[inline]
      fn get(&mut self, buffer: &mut [$native_ty]) -> Result<usize> {
        let num_values = cmp::min(buffer.len(), self.num_values);
        let bytes_to_decode = $size * num_values;
        {
          let data = self.data.as_ref().expect("set_data should have been called");
          if data.len() - self.start < bytes_to_decode {
            return Err(eof_err!("Not enough bytes to decode"));
          }
          LittleEndian::$read_into(
            data.range(self.start, bytes_to_decode).as_ref(),
            &mut buffer[..num_values]
          );
        }
        self.start += bytes_to_decode;
        self.num_values -= num_values;
        Ok(num_values)
      }

      #[inline]
      fn values_left(&self) -> usize {
        self.num_values
      }
    }
  };
}

impl_plain_numeric!(Int32Type, i32, 4, read_i32_into);
impl_plain_numeric!(Int64Type, i64, 8, read_i64_into);
impl_plain_numeric!(FloatType, f32, 4, read_f32_into);
impl_plain_numeric!(DoubleType, f64, 8, read_f64_into);

impl Decoder<BoolType> for PlainDecoder<BoolType> {
  fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
    self.reset(data, num_values);
    Ok(())
  }

  fn get(&mut self, buffer: &mut [bool]) -> Result<usize> {
    let num_values = cmp::min(buffer.len(), self.num_values);
    {
      let data = self.data.as_ref().expect("set_data should have been called");
      if bit_util::bytes_for_bits(self.bit_pos + num_values) > data.len() {
        return Err(eof_err!("Not enough bytes to decode"));
      }
      for i in 0..num_values {
        buffer[i] = bit_util::get_bit(data.as_ref(), self.bit_pos + i);
      }
    }
    self.bit_pos += num_values;
    self.num_values -= num_values;
    Ok(num_values)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }
}

impl Decoder<Int96Type> for PlainDecoder<Int96Type> {
  fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
    self.reset(data, num_values);
    Ok(())
  }

  fn get(&mut self, buffer: &mut [Int96]) -> Result<usize> {
    let num_values = cmp::min(buffer.len(), self.num_values);
    {
      let data = self.data.as_ref().expect("set_data should have been called");
      if data.len() - self.start < 12 * num_values {
        return Err(eof_err!("Not enough bytes to decode"));
      }
      for i in 0..num_values {
        let mut words = [0u32; 3];
        LittleEndian::read_u32_into(
          data.range(self.start + 12 * i, 12).as_ref(), &mut words);
        buffer[i] = Int96::from(words);
      }
    }
    self.start += 12 * num_values;
    self.num_values -= num_values;
    Ok(num_values)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }
}

impl Decoder<ByteArrayType> for PlainDecoder<ByteArrayType> {
  fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
    self.reset(data, num_values);
    Ok(())
  }

  fn get(&mut self, buffer: &mut [ByteArray]) -> Result<usize> {
    let num_values = cmp::min(buffer.len(), self.num_values);
    for i in 0..num_values {
      if self.data().len() < self.start + 4 {
        return Err(eof_err!("Not enough bytes to decode"));
      }
      let len = LittleEndian::read_u32(self.data().range(self.start, 4).as_ref()) as usize;
      self.start += 4;
      if self.data().len() < self.start + len {
        return Err(eof_err!("Not enough bytes to decode"));
      }
      buffer[i].set_data(self.data().range(self.start, len));
      self.start += len;
    }
    self.num_values -= num_values;
    Ok(num_values)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }
}

impl Decoder<FixedLenByteArrayType> for PlainDecoder<FixedLenByteArrayType> {
  fn set_data(&mut self, data: ByteBufferPtr, num_values: usize) -> Result<()> {
    self.reset(data, num_values);
    Ok(())
  }

  fn get(&mut self, buffer: &mut [ByteArray]) -> Result<usize> {
    assert!(self.type_length > 0);

    let type_length = self.type_length as usize;
    let num_values = cmp::min(buffer.len(), self.num_values);
    for i in 0..num_values {
      if self.data().len() < self.start + type_length {
        return Err(eof_err!("Not enough bytes to decode"));
      }
      buffer[i].set_data(self.data().range(self.start, type_length));
      self.start += type_length;
    }
    self.num_values -= num_values;
    Ok(num_values)
  }

  fn values_left(&self) -> usize {
    self.num_values
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use util::test_common::ToByteArray;

  fn test_plain_decode<T: DataType>(
    data: ByteBufferPtr,
    num_values: usize,
    type_length: i32,
    buffer: &mut [T::T],
    expected: &[T::T]
  ) where PlainDecoder<T>: Decoder<T> {
    let mut decoder: PlainDecoder<T> = PlainDecoder::new(type_length);
    decoder.set_data(data, num_values).expect("set_data() should be OK");
    let result = decoder.get(buffer);
    assert!(result.is_ok());
    assert_eq!(decoder.values_left(), 0);
    assert_eq!(buffer, expected);
  }

  #[test]
  fn test_plain_decode_int32() {
    let data = vec![42, 18, 52];
    let data_bytes = Int32Type::to_byte_array(&data[..]);
    let mut buffer = vec![0; 3];
    test_plain_decode::<Int32Type>(
      ByteBufferPtr::new(data_bytes), 3, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_int64() {
    let data = vec![42, 18, 52];
    let data_bytes = Int64Type::to_byte_array(&data[..]);
    let mut buffer = vec![0; 3];
    test_plain_decode::<Int64Type>(
      ByteBufferPtr::new(data_bytes), 3, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_float() {
    let data = vec![3.14, 2.414, 12.51];
    let data_bytes = FloatType::to_byte_array(&data[..]);
    let mut buffer = vec![0.0; 3];
    test_plain_decode::<FloatType>(
      ByteBufferPtr::new(data_bytes), 3, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_double() {
    let data = vec![3.14f64, 2.414f64, 12.51f64];
    let data_bytes = DoubleType::to_byte_array(&data[..]);
    let mut buffer = vec![0.0f64; 3];
    test_plain_decode::<DoubleType>(
      ByteBufferPtr::new(data_bytes), 3, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_bool() {
    let data = vec![false, true, false, false, true, false, true, true, false, true];
    let data_bytes = BoolType::to_byte_array(&data[..]);
    let mut buffer = vec![false; 10];
    test_plain_decode::<BoolType>(
      ByteBufferPtr::new(data_bytes), 10, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_int96() {
    let mut data = vec![Int96::new(); 4];
    data[0].set_data(11, 22, 33);
    data[1].set_data(44, 55, 66);
    data[2].set_data(10, 20, 30);
    data[3].set_data(40, 50, 60);
    let data_bytes = Int96Type::to_byte_array(&data[..]);
    let mut buffer = vec![Int96::new(); 4];
    test_plain_decode::<Int96Type>(
      ByteBufferPtr::new(data_bytes), 4, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_byte_array() {
    let mut data = vec![ByteArray::new(); 2];
    data[0].set_data(ByteBufferPtr::new(String::from("hello").into_bytes()));
    data[1].set_data(ByteBufferPtr::new(String::from("columnar").into_bytes()));
    let data_bytes = ByteArrayType::to_byte_array(&data[..]);
    let mut buffer = vec![ByteArray::new(); 2];
    test_plain_decode::<ByteArrayType>(
      ByteBufferPtr::new(data_bytes), 2, -1, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_fixed_len_byte_array() {
    let mut data = vec![ByteArray::default(); 3];
    data[0].set_data(ByteBufferPtr::new(String::from("bird").into_bytes()));
    data[1].set_data(ByteBufferPtr::new(String::from("come").into_bytes()));
    data[2].set_data(ByteBufferPtr::new(String::from("flow").into_bytes()));
    let data_bytes = FixedLenByteArrayType::to_byte_array(&data[..]);
    let mut buffer = vec![ByteArray::default(); 3];
    test_plain_decode::<FixedLenByteArrayType>(
      ByteBufferPtr::new(data_bytes), 3, 4, &mut buffer[..], &data[..]
    );
  }

  #[test]
  fn test_plain_decode_not_enough_bytes() {
    let mut decoder: PlainDecoder<Int32Type> = PlainDecoder::new(-1);
    decoder.set_data(ByteBufferPtr::new(vec![0, 1, 2]), 2).unwrap();
    let mut buffer = vec![0; 2];
    match decoder.get(&mut buffer) {
      Err(DremelError::Eof(_)) => {},
      other => panic!("Expected EOF error, got {:?}", other)
    }
  }

  #[test]
  fn test_get_spaced() {
    let data = vec![7i64, 9, 11];
    let data_bytes = Int64Type::to_byte_array(&data[..]);
    let mut decoder: PlainDecoder<Int64Type> = PlainDecoder::new(-1);
    decoder.set_data(ByteBufferPtr::new(data_bytes), 3).unwrap();

    // positions 0, 2 and 3 hold values, positions 1 and 4 are nulls
    let valid_bits = vec![0b00001101u8];
    let mut buffer = vec![0i64; 5];
    let n = decoder.get_spaced(&mut buffer[..], 2, &valid_bits, 0).unwrap();
    assert_eq!(n, 5);
    assert_eq!(buffer[0], 7);
    assert_eq!(buffer[2], 9);
    assert_eq!(buffer[3], 11);
  }

  #[test]
  fn test_get_spaced_offset() {
    let data = vec![5i32, 6];
    let data_bytes = Int32Type::to_byte_array(&data[..]);
    let mut decoder: PlainDecoder<Int32Type> = PlainDecoder::new(-1);
    decoder.set_data(ByteBufferPtr::new(data_bytes), 2).unwrap();

    // bits 3 and 5 (relative offset 3) are set, bit 4 is a null
    let valid_bits = vec![0b00101000u8];
    let mut buffer = vec![0i32; 3];
    let n = decoder.get_spaced(&mut buffer[..], 1, &valid_bits, 3).unwrap();
    assert_eq!(n, 3);
    assert_eq!(buffer[0], 5);
    assert_eq!(buffer[2], 6);
  }
}
