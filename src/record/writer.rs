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

//! Value materialization strategies for record readers.
//!
//! Fixed-width types decode into a packed byte buffer; byte arrays and
//! fixed-length byte arrays decode into a scratch slice and are appended to
//! an array builder, turning cleared validity bits into explicit nulls.

use std::marker::PhantomData;
use std::mem;
use std::str;

use array::Array;
use array::builder::{BinaryBuilder, FixedSizeBinaryBuilder, StringBuilder};
use basic::LogicalType;
use column::reader::ColumnChunkDecoder;
use data_type::*;
use encodings::decoding::{Decoder, PlainDecoder};
use errors::{DremelError, Result};
use schema::ColumnDescPtr;
use util::bit_util;
use util::memory::{ByteBuffer, MemTrackerPtr};

/// How a record reader materializes decoded values.
///
/// `values_written` always refers to the number of value slots (including
/// null placeholders) the owning reader has committed so far; it doubles as
/// the bit offset of the current batch in the validity bitmap.
pub trait ValuesWriter<T: DataType> where PlainDecoder<T>: Decoder<T> {
  fn new(descr: &ColumnDescPtr, mem_tracker: Option<MemTrackerPtr>) -> Self
    where Self: Sized;

  /// Grows storage to hold `capacity` value slots in total.
  fn reserve(&mut self, capacity: usize) -> Result<()>;

  /// Densely decodes exactly `num_values` values at slot `values_written`.
  fn read_dense(
    &mut self,
    column: &mut ColumnChunkDecoder<T>,
    num_values: usize,
    values_written: usize
  ) -> Result<usize>;

  /// Decodes `num_slots - null_count` values into the `num_slots` wide window
  /// at slot `values_written`, leaving slots with a cleared validity bit as
  /// nulls.
  fn read_spaced(
    &mut self,
    column: &mut ColumnChunkDecoder<T>,
    num_slots: usize,
    null_count: usize,
    valid_bits: &[u8],
    values_written: usize
  ) -> Result<usize>;

  /// Discards per-batch scratch state. Committed storage is kept.
  fn reset(&mut self);

  /// Borrowed view of the populated prefix of the packed values buffer.
  /// Empty for variable-length writers, which have no packed buffer.
  fn values_bytes(&self, values_written: usize) -> &[u8];

  /// Trims the packed values buffer to the populated byte count, hands it
  /// out and installs a fresh replacement.
  fn release_values(&mut self, values_written: usize) -> Result<ByteBuffer>;
}

// ----------------------------------------------------------------------
// Fixed-width values

/// Writer for physical types with a fixed byte width. Values are tightly
/// packed; the valid prefix is `values_written * size_of::<T::T>()` bytes.
pub struct FixedValuesWriter<T: DataType> {
  values: ByteBuffer,
  mem_tracker: Option<MemTrackerPtr>,
  _phantom: PhantomData<T>
}

impl<T: DataType> FixedValuesWriter<T> {
  fn new_buffer(&self) -> ByteBuffer {
    match self.mem_tracker {
      Some(ref mc) => ByteBuffer::with_mem_tracker(mc.clone()),
      None => ByteBuffer::new()
    }
  }

  pub fn typed_values(&self, values_written: usize) -> &[T::T] {
    &self.values.typed_data::<T::T>()[..values_written]
  }
}

impl<T: DataType> ValuesWriter<T> for FixedValuesWriter<T>
    where PlainDecoder<T>: Decoder<T> {
  fn new(_descr: &ColumnDescPtr, mem_tracker: Option<MemTrackerPtr>) -> Self {
    let values = match mem_tracker {
      Some(ref mc) => ByteBuffer::with_mem_tracker(mc.clone()),
      None => ByteBuffer::new()
    };
    FixedValuesWriter {
      values: values,
      mem_tracker: mem_tracker,
      _phantom: PhantomData
    }
  }

  fn reserve(&mut self, capacity: usize) -> Result<()> {
    let num_bytes = capacity
      .checked_mul(T::get_type_size())
      .ok_or(corrupt_err!("Values buffer size overflows usize"))?;
    self.values.resize(num_bytes)
  }

  fn read_dense(
    &mut self,
    column: &mut ColumnChunkDecoder<T>,
    num_values: usize,
    values_written: usize
  ) -> Result<usize> {
    let values_read = {
      let values = self.values.typed_data_mut::<T::T>();
      column.read_values(&mut values[values_written..values_written + num_values])?
    };
    if values_read != num_values {
      return Err(decode_err!(
        "Expected to read {} values, but read {}", num_values, values_read));
    }
    Ok(values_read)
  }

  fn read_spaced(
    &mut self,
    column: &mut ColumnChunkDecoder<T>,
    num_slots: usize,
    null_count: usize,
    valid_bits: &[u8],
    values_written: usize
  ) -> Result<usize> {
    let slots_read = {
      let values = self.values.typed_data_mut::<T::T>();
      column.read_values_spaced(
        &mut values[values_written..values_written + num_slots],
        null_count,
        valid_bits,
        values_written
      )?
    };
    if slots_read != num_slots {
      return Err(decode_err!(
        "Expected to cover {} slots, but covered {}", num_slots, slots_read));
    }
    Ok(slots_read)
  }

  fn reset(&mut self) {}

  fn values_bytes(&self, values_written: usize) -> &[u8] {
    &self.values.data()[..values_written * T::get_type_size()]
  }

  fn release_values(&mut self, values_written: usize) -> Result<ByteBuffer> {
    let replacement = self.new_buffer();
    let mut values = mem::replace(&mut self.values, replacement);
    values.resize(values_written * T::get_type_size())?;
    Ok(values)
  }
}

// ----------------------------------------------------------------------
// Variable-length values

enum VarLenBuilder {
  Binary(BinaryBuilder),
  Utf8(StringBuilder)
}

impl VarLenBuilder {
  fn append(&mut self, value: &ByteArray) -> Result<()> {
    match *self {
      VarLenBuilder::Binary(ref mut builder) => builder.append(value.data()),
      VarLenBuilder::Utf8(ref mut builder) => {
        let value = str::from_utf8(value.data())
          .map_err(|e| corrupt_err!("String value is not valid utf8: {}", e))?;
        builder.append(value)
      }
    }
  }

  fn append_null(&mut self) {
    match *self {
      VarLenBuilder::Binary(ref mut builder) => builder.append_null(),
      VarLenBuilder::Utf8(ref mut builder) => builder.append_null()
    }
  }

  fn finish(&mut self) -> Array {
    match *self {
      VarLenBuilder::Binary(ref mut builder) => Array::Binary(builder.finish()),
      VarLenBuilder::Utf8(ref mut builder) => Array::Str(builder.finish())
    }
  }
}

/// Writer for `BYTE_ARRAY` columns. Decodes into a scratch slice, appends
/// into a binary or string builder (chosen by the column's logical type) and
/// resets the scratch after every read.
pub struct ByteArrayValuesWriter {
  scratch: Vec<ByteArray>,
  builder: VarLenBuilder
}

impl ByteArrayValuesWriter {
  /// Finalizes the builder into immutable arrays. The builder is left empty
  /// and keeps accumulating from the next read.
  pub fn get_builder_chunks(&mut self) -> Vec<Array> {
    vec![self.builder.finish()]
  }
}

impl ValuesWriter<ByteArrayType> for ByteArrayValuesWriter {
  fn new(descr: &ColumnDescPtr, _mem_tracker: Option<MemTrackerPtr>) -> Self {
    let builder = if descr.logical_type() == LogicalType::UTF8 {
      VarLenBuilder::Utf8(StringBuilder::new())
    } else {
      VarLenBuilder::Binary(BinaryBuilder::new())
    };
    ByteArrayValuesWriter { scratch: vec![], builder: builder }
  }

  fn reserve(&mut self, _capacity: usize) -> Result<()> {
    Ok(())
  }

  fn read_dense(
    &mut self,
    column: &mut ColumnChunkDecoder<ByteArrayType>,
    num_values: usize,
    _values_written: usize
  ) -> Result<usize> {
    self.scratch.resize(num_values, ByteArray::default());
    let values_read = column.read_values(&mut self.scratch[..num_values])?;
    if values_read != num_values {
      return Err(decode_err!(
        "Expected to read {} values, but read {}", num_values, values_read));
    }
    for value in &self.scratch[..num_values] {
      self.builder.append(value)?;
    }
    self.scratch.clear();
    Ok(values_read)
  }

  fn read_spaced(
    &mut self,
    column: &mut ColumnChunkDecoder<ByteArrayType>,
    num_slots: usize,
    null_count: usize,
    valid_bits: &[u8],
    values_written: usize
  ) -> Result<usize> {
    self.scratch.resize(num_slots, ByteArray::default());
    let slots_read = column.read_values_spaced(
      &mut self.scratch[..num_slots], null_count, valid_bits, values_written)?;
    if slots_read != num_slots {
      return Err(decode_err!(
        "Expected to cover {} slots, but covered {}", num_slots, slots_read));
    }
    for i in 0..num_slots {
      if bit_util::get_bit(valid_bits, values_written + i) {
        let value = self.scratch[i].clone();
        self.builder.append(&value)?;
      } else {
        self.builder.append_null();
      }
    }
    self.scratch.clear();
    Ok(slots_read)
  }

  fn reset(&mut self) {
    self.scratch.clear();
  }

  fn values_bytes(&self, _values_written: usize) -> &[u8] {
    &[]
  }

  fn release_values(&mut self, _values_written: usize) -> Result<ByteBuffer> {
    // variable-length readers have no packed values buffer
    Ok(ByteBuffer::new())
  }
}

/// Writer for `FIXED_LEN_BYTE_ARRAY` columns, appending into a
/// fixed-size-binary builder.
pub struct FixedLenByteArrayValuesWriter {
  scratch: Vec<ByteArray>,
  builder: FixedSizeBinaryBuilder
}

impl FixedLenByteArrayValuesWriter {
  /// Finalizes the builder into immutable arrays. The builder is left empty
  /// and keeps accumulating from the next read.
  pub fn get_builder_chunks(&mut self) -> Vec<Array> {
    vec![Array::FixedSizeBinary(self.builder.finish())]
  }
}

impl ValuesWriter<FixedLenByteArrayType> for FixedLenByteArrayValuesWriter {
  fn new(descr: &ColumnDescPtr, _mem_tracker: Option<MemTrackerPtr>) -> Self {
    FixedLenByteArrayValuesWriter {
      scratch: vec![],
      builder: FixedSizeBinaryBuilder::new(descr.type_length())
    }
  }

  fn reserve(&mut self, _capacity: usize) -> Result<()> {
    Ok(())
  }

  fn read_dense(
    &mut self,
    column: &mut ColumnChunkDecoder<FixedLenByteArrayType>,
    num_values: usize,
    _values_written: usize
  ) -> Result<usize> {
    self.scratch.resize(num_values, ByteArray::default());
    let values_read = column.read_values(&mut self.scratch[..num_values])?;
    if values_read != num_values {
      return Err(decode_err!(
        "Expected to read {} values, but read {}", num_values, values_read));
    }
    for value in &self.scratch[..num_values] {
      self.builder.append(value.data())?;
    }
    self.scratch.clear();
    Ok(values_read)
  }

  fn read_spaced(
    &mut self,
    column: &mut ColumnChunkDecoder<FixedLenByteArrayType>,
    num_slots: usize,
    null_count: usize,
    valid_bits: &[u8],
    values_written: usize
  ) -> Result<usize> {
    self.scratch.resize(num_slots, ByteArray::default());
    let slots_read = column.read_values_spaced(
      &mut self.scratch[..num_slots], null_count, valid_bits, values_written)?;
    if slots_read != num_slots {
      return Err(decode_err!(
        "Expected to cover {} slots, but covered {}", num_slots, slots_read));
    }
    for i in 0..num_slots {
      if bit_util::get_bit(valid_bits, values_written + i) {
        let value = self.scratch[i].clone();
        self.builder.append(value.data())?;
      } else {
        self.builder.append_null();
      }
    }
    self.scratch.clear();
    Ok(slots_read)
  }

  fn reset(&mut self) {
    self.scratch.clear();
  }

  fn values_bytes(&self, _values_written: usize) -> &[u8] {
    &[]
  }

  fn release_values(&mut self, _values_written: usize) -> Result<ByteBuffer> {
    Ok(ByteBuffer::new())
  }
}
