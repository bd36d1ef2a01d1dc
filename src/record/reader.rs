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

//! Contains record readers: the state machine that turns level and value
//! streams into row-aligned columnar batches.
//!
//! A record reader pulls levels in batches from the column chunk decoder,
//! delimits complete records by scanning repetition levels, projects
//! definition levels into validity bits and decodes exactly the physical
//! values the delimited window calls for. Finished buffers can be detached;
//! the reader allocates fresh ones on demand.

use std::cmp;
use std::sync::atomic::{AtomicUsize, Ordering};

use basic::Type;
use column::page::PageReader;
use column::reader::ColumnChunkDecoder;
use data_type::*;
use encodings::decoding::{Decoder, PlainDecoder};
use errors::{DremelError, Result};
use record::levels::{def_levels_to_bitmap, ValidityIO};
use record::writer::*;
use schema::ColumnDescPtr;
use util::bit_util;
use util::memory::{update_capacity, ByteBuffer, MemTrackerPtr};

/// Smallest number of levels requested from the column chunk decoder per
/// batch. Larger record requests read in correspondingly larger batches.
const MIN_LEVEL_BATCH_SIZE: usize = 1024;

/// A typed record reader for one leaf column.
///
/// Not safe for concurrent mutation: `read_records`, `reset`, reserve and
/// buffer release calls must be serialized by the caller. Distinct readers
/// may run on distinct threads.
pub struct RecordReaderImpl<T: DataType, W: ValuesWriter<T>>
    where PlainDecoder<T>: Decoder<T> {
  descr: ColumnDescPtr,
  column: ColumnChunkDecoder<T>,
  writer: W,

  // Level buffers. `rep_levels` is allocated only when the column is
  // repeated. Invariant: levels_pos <= levels_written <= levels_cap.
  def_levels: ByteBuffer,
  rep_levels: ByteBuffer,
  levels_cap: usize,
  levels_written: usize,
  levels_pos: usize,

  // Validity bitmap, allocated only when the column is nullable. Bit i
  // covers value slot i.
  valid_bits: ByteBuffer,
  values_cap: usize,
  values_written: usize,
  null_count: usize,

  // Records completed since the last reset
  records_read: usize,

  // True iff the delimiter sits at a record boundary
  at_record_start: bool,

  // Set on the first fatal error; the reader is drained afterwards
  failed: bool,

  mem_tracker: Option<MemTrackerPtr>,
  ref_count: AtomicUsize
}

/// Record reader for columns with a fixed-width physical type.
pub type PrimitiveRecordReader<T> = RecordReaderImpl<T, FixedValuesWriter<T>>;

/// Record reader for `BYTE_ARRAY` columns, materializing into a binary or
/// string builder.
pub type ByteArrayRecordReader = RecordReaderImpl<ByteArrayType, ByteArrayValuesWriter>;

/// Record reader for `FIXED_LEN_BYTE_ARRAY` columns, materializing into a
/// fixed-size-binary builder.
pub type FixedLenByteArrayRecordReader =
  RecordReaderImpl<FixedLenByteArrayType, FixedLenByteArrayValuesWriter>;

impl<T: DataType, W: ValuesWriter<T>> RecordReaderImpl<T, W>
    where PlainDecoder<T>: Decoder<T> {
  pub fn new(descr: ColumnDescPtr, page_reader: Box<PageReader>) -> Self {
    Self::with_mem_tracker(descr, page_reader, None)
  }

  pub fn with_mem_tracker(
    descr: ColumnDescPtr,
    page_reader: Box<PageReader>,
    mem_tracker: Option<MemTrackerPtr>
  ) -> Self {
    let writer = W::new(&descr, mem_tracker.clone());
    let column = ColumnChunkDecoder::new(descr.clone(), page_reader);
    let new_buffer = || match mem_tracker {
      Some(ref mc) => ByteBuffer::with_mem_tracker(mc.clone()),
      None => ByteBuffer::new()
    };
    RecordReaderImpl {
      descr: descr,
      column: column,
      writer: writer,
      def_levels: new_buffer(),
      rep_levels: new_buffer(),
      levels_cap: 0,
      levels_written: 0,
      levels_pos: 0,
      valid_bits: new_buffer(),
      values_cap: 0,
      values_written: 0,
      null_count: 0,
      records_read: 0,
      at_record_start: true,
      failed: false,
      mem_tracker: mem_tracker,
      ref_count: AtomicUsize::new(1)
    }
  }

  /// Reads at most `num_records` complete records.
  ///
  /// Returns the number of records materialized, which is `num_records`
  /// unless the column chunk is exhausted. A record left open because the
  /// chunk ended mid-record is counted exactly once.
  pub fn read_records(&mut self, num_records: usize) -> Result<usize> {
    if self.failed {
      return Ok(0);
    }
    match self.read_records_inner(num_records) {
      Ok(records_read) => Ok(records_read),
      Err(e) => {
        self.failed = true;
        Err(e)
      }
    }
  }

  fn read_records_inner(&mut self, num_records: usize) -> Result<usize> {
    let mut records_read = 0;

    // Delimit records from levels decoded by a previous call first
    if self.levels_pos < self.levels_written {
      records_read += self.read_record_data(num_records)?;
    }

    let level_batch_size = cmp::max(MIN_LEVEL_BATCH_SIZE, num_records);

    // If we are mid-record, continue until the record closes or the chunk
    // ends, even when the requested count has been reached
    while !self.at_record_start || records_read < num_records {
      if !self.column.has_next()? {
        if !self.at_record_start {
          // The chunk ended inside an open record. Count it here, exactly
          // once: `set_page_reader` re-arms `at_record_start`, so the next
          // chunk's leading zero level does not close it again.
          records_read += 1;
          self.at_record_start = true;
        }
        break;
      }

      let batch_size = cmp::min(level_batch_size, self.column.num_available_values());
      if batch_size == 0 {
        break;
      }

      if self.descr.max_def_level() > 0 {
        self.reserve_levels(batch_size)?;

        let levels_read = {
          let levels_written = self.levels_written;
          let def_levels = &mut self.def_levels.typed_data_mut::<i16>()
            [levels_written..levels_written + batch_size];
          let num_def_levels = self.column.read_def_levels(def_levels)?;
          if self.descr.max_rep_level() > 0 {
            let rep_levels = &mut self.rep_levels.typed_data_mut::<i16>()
              [levels_written..levels_written + batch_size];
            let num_rep_levels = self.column.read_rep_levels(rep_levels)?;
            if num_def_levels != num_rep_levels {
              return Err(corrupt_err!(
                "Number of decoded definition and repetition levels did not match: {} != {}",
                num_def_levels,
                num_rep_levels));
            }
          }
          num_def_levels
        };

        // Exhausted the column chunk
        if levels_read == 0 {
          break;
        }
        self.levels_written += levels_read;
        records_read += self.read_record_data(num_records - records_read)?;
      } else {
        // No levels at all: values map to records one to one
        let batch_size = cmp::min(num_records - records_read, batch_size);
        records_read += self.read_record_data(batch_size)?;
      }
    }

    self.records_read += records_read;
    Ok(records_read)
  }

  /// Materializes values for the delimited window `[levels_pos, ..)` of up
  /// to `num_records` records and advances all counters.
  fn read_record_data(&mut self, num_records: usize) -> Result<usize> {
    // Conservative upper bound on the slots this window can produce
    let possible_num_values =
      cmp::max(num_records, self.levels_written - self.levels_pos);
    self.reserve_values(possible_num_values)?;

    let start_pos = self.levels_pos;
    let records_read;
    let mut values_to_read = 0;
    if self.descr.max_rep_level() > 0 {
      let (records, values) = self.delimit_records(num_records);
      records_read = records;
      values_to_read = values;
    } else if self.descr.max_def_level() > 0 {
      // Optional non-repeated column: each level is one record
      records_read = cmp::min(self.levels_written - self.levels_pos, num_records);
      self.levels_pos += records_read;
    } else {
      records_read = num_records;
      values_to_read = num_records;
    }

    let mut null_count = 0;
    if self.descr.has_nullable_values() {
      let (slots, nulls) = {
        let values_written = self.values_written;
        let def_levels =
          &self.def_levels.typed_data::<i16>()[start_pos..self.levels_pos];
        let mut io = ValidityIO::new(self.valid_bits.mut_data(), values_written);
        def_levels_to_bitmap(def_levels, self.descr.level_info(), &mut io);
        (io.read, io.null_count)
      };
      null_count = nulls;
      values_to_read = slots - nulls;
      if slots > 0 {
        let valid_bits = self.valid_bits.data();
        self.writer.read_spaced(
          &mut self.column, slots, nulls, valid_bits, self.values_written)?;
      }
    } else if values_to_read > 0 {
      self.writer.read_dense(&mut self.column, values_to_read, self.values_written)?;
    }

    // Tell the page layer how many of its slots this window consumed: one per
    // level for any leaf that reads levels, one per value otherwise
    if self.descr.level_info().def_level > 0 {
      self.column.consume_buffered_values(self.levels_pos - start_pos);
    } else {
      self.column.consume_buffered_values(values_to_read);
    }

    // Slot count includes null placeholders
    self.values_written += values_to_read + null_count;
    self.null_count += null_count;
    Ok(records_read)
  }

  /// Scans `rep_levels[levels_pos..levels_written]`, counting record
  /// boundaries and the physical values the consumed window holds. Stops
  /// before consuming the boundary level that would open record
  /// `num_records + 1`.
  fn delimit_records(&mut self, num_records: usize) -> (usize, usize) {
    let mut records_read = 0;
    let mut values_to_read = 0;
    let mut pos = self.levels_pos;
    let mut at_record_start = self.at_record_start;
    let max_def_level = self.descr.max_def_level();
    {
      let def_levels = self.def_levels.typed_data::<i16>();
      let rep_levels = self.rep_levels.typed_data::<i16>();
      while pos < self.levels_written {
        if rep_levels[pos] == 0 {
          // If at_record_start is set, this zero opens the record we are
          // already positioned at, not a new one
          if !at_record_start {
            records_read += 1;
            if records_read == num_records {
              // The boundary level belongs to the next record
              at_record_start = true;
              break;
            }
          }
        }
        // The level at this position is consumed; keep going until the next
        // record boundary
        at_record_start = false;
        if def_levels[pos] == max_def_level {
          values_to_read += 1;
        }
        pos += 1;
      }
    }
    self.levels_pos = pos;
    self.at_record_start = at_record_start;
    (records_read, values_to_read)
  }

  /// Pre-grows level buffers to hold `extra` more level slots.
  fn reserve_levels(&mut self, extra: usize) -> Result<()> {
    if self.descr.max_def_level() > 0 {
      let new_cap = update_capacity(self.levels_cap, self.levels_written, extra)?;
      if new_cap > self.levels_cap {
        let num_bytes = new_cap
          .checked_mul(2)
          .ok_or(corrupt_err!("Level buffer size overflows usize"))?;
        self.def_levels.resize(num_bytes)?;
        if self.descr.max_rep_level() > 0 {
          self.rep_levels.resize(num_bytes)?;
        }
        self.levels_cap = new_cap;
      }
    }
    Ok(())
  }

  /// Pre-grows the values buffer (and the validity bitmap for nullable
  /// columns) to hold `extra` more value slots.
  fn reserve_values(&mut self, extra: usize) -> Result<()> {
    let new_cap = update_capacity(self.values_cap, self.values_written, extra)?;
    if new_cap > self.values_cap {
      self.writer.reserve(new_cap)?;
      if self.descr.has_nullable_values() {
        self.valid_bits.resize(bit_util::bytes_for_bits(new_cap))?;
      }
      self.values_cap = new_cap;
    }
    Ok(())
  }

  /// Pre-grows all buffers to hold at least `extra` more values and levels.
  pub fn reserve(&mut self, extra: usize) -> Result<()> {
    self.reserve_levels(extra)?;
    self.reserve_values(extra)
  }

  /// Discards completed values and shifts any unread levels to the front of
  /// the level buffers, so records can be read in arbitrarily small batches
  /// without data loss. Must be called at a record boundary.
  pub fn reset(&mut self) {
    self.reset_values();

    if self.levels_written > 0 {
      let levels_pos = self.levels_pos;
      let levels_written = self.levels_written;
      {
        let def_levels = self.def_levels.typed_data_mut::<i16>();
        for i in 0..levels_written - levels_pos {
          def_levels[i] = def_levels[levels_pos + i];
        }
      }
      if self.descr.max_rep_level() > 0 {
        let rep_levels = self.rep_levels.typed_data_mut::<i16>();
        for i in 0..levels_written - levels_pos {
          rep_levels[i] = rep_levels[levels_pos + i];
        }
      }
      self.levels_written -= self.levels_pos;
      self.levels_pos = 0;
    }

    self.records_read = 0;
  }

  /// Clears value counters; buffers stay allocated for reuse.
  fn reset_values(&mut self) {
    self.values_written = 0;
    self.null_count = 0;
    self.writer.reset();
  }

  /// Re-points this reader at the next column chunk. Level and value buffers
  /// belong to the record reader and survive; only page state is discarded.
  pub fn set_page_reader(&mut self, page_reader: Box<PageReader>) {
    self.column.set_page_reader(page_reader);
    self.at_record_start = true;
  }

  /// Returns true if there may be more records in the current chunk. False
  /// after exhaustion or a fatal error.
  pub fn has_more(&mut self) -> Result<bool> {
    if self.failed {
      return Ok(false);
    }
    Ok(self.levels_pos < self.levels_written || self.column.has_next()?)
  }

  /// Definition levels decoded so far, including not yet delimited ones.
  pub fn def_levels(&self) -> &[i16] {
    &self.def_levels.typed_data::<i16>()[..self.levels_written]
  }

  /// Repetition levels decoded so far. Empty for non-repeated columns.
  pub fn rep_levels(&self) -> &[i16] {
    if self.descr.max_rep_level() > 0 {
      &self.rep_levels.typed_data::<i16>()[..self.levels_written]
    } else {
      &[]
    }
  }

  pub fn levels_pos(&self) -> usize {
    self.levels_pos
  }

  pub fn values_written(&self) -> usize {
    self.values_written
  }

  pub fn null_count(&self) -> usize {
    self.null_count
  }

  /// Records completed since the last [`reset`].
  pub fn records_read(&self) -> usize {
    self.records_read
  }

  /// Borrowed view of the packed values decoded so far. Empty for
  /// variable-length columns.
  pub fn values(&self) -> &[u8] {
    self.writer.values_bytes(self.values_written)
  }

  /// Detaches the packed values buffer, trimmed to the populated byte count.
  /// The reader installs a fresh buffer and stays usable.
  pub fn release_values(&mut self) -> Result<ByteBuffer> {
    let values = self.writer.release_values(self.values_written)?;
    self.values_cap = 0;
    Ok(values)
  }

  /// Detaches the validity bitmap, trimmed to the populated byte count. The
  /// reader installs a fresh bitmap and stays usable.
  pub fn release_valid_bits(&mut self) -> Result<ByteBuffer> {
    let replacement = self.make_buffer();
    let mut valid_bits = ::std::mem::replace(&mut self.valid_bits, replacement);
    valid_bits.resize(bit_util::bytes_for_bits(self.values_written))?;
    self.values_cap = 0;
    Ok(valid_bits)
  }

  /// Increments the usage count. May be called from any thread.
  pub fn retain(&self) {
    self.ref_count.fetch_add(1, Ordering::Relaxed);
  }

  /// Decrements the usage count, releasing all buffers when it reaches zero.
  /// Returns the remaining count.
  pub fn release(&mut self) -> usize {
    let prev = self.ref_count.fetch_sub(1, Ordering::AcqRel);
    assert!(prev > 0, "Released more times than retained");
    if prev == 1 {
      self.free_buffers();
    }
    prev - 1
  }

  fn make_buffer(&self) -> ByteBuffer {
    match self.mem_tracker {
      Some(ref mc) => ByteBuffer::with_mem_tracker(mc.clone()),
      None => ByteBuffer::new()
    }
  }

  fn free_buffers(&mut self) {
    self.def_levels = self.make_buffer();
    self.rep_levels = self.make_buffer();
    self.valid_bits = self.make_buffer();
    self.writer = W::new(&self.descr, self.mem_tracker.clone());
    self.levels_cap = 0;
    self.levels_written = 0;
    self.levels_pos = 0;
    self.values_cap = 0;
    self.values_written = 0;
    self.null_count = 0;
    self.records_read = 0;
  }
}

impl<T: DataType> PrimitiveRecordReader<T> where PlainDecoder<T>: Decoder<T> {
  /// Borrowed view of the packed values as their native type.
  pub fn typed_values(&self) -> &[T::T] {
    self.writer.typed_values(self.values_written)
  }
}

impl ByteArrayRecordReader {
  /// Finalizes the builder into one or more immutable arrays.
  pub fn get_builder_chunks(&mut self) -> Vec<::array::Array> {
    self.writer.get_builder_chunks()
  }
}

impl FixedLenByteArrayRecordReader {
  /// Finalizes the builder into one or more immutable arrays.
  pub fn get_builder_chunks(&mut self) -> Vec<::array::Array> {
    self.writer.get_builder_chunks()
  }
}

// ----------------------------------------------------------------------
// Construction-time dispatch over the physical type

/// A record reader for any physical type.
pub enum RecordReader {
  Bool(PrimitiveRecordReader<BoolType>),
  Int32(PrimitiveRecordReader<Int32Type>),
  Int64(PrimitiveRecordReader<Int64Type>),
  Int96(PrimitiveRecordReader<Int96Type>),
  Float(PrimitiveRecordReader<FloatType>),
  Double(PrimitiveRecordReader<DoubleType>),
  ByteArray(ByteArrayRecordReader),
  FixedLenByteArray(FixedLenByteArrayRecordReader)
}

/// Gets a record reader for the column `descr`, reading from pages in
/// `page_reader`. The physical type is dispatched on once, here.
pub fn get_record_reader(
  descr: ColumnDescPtr, page_reader: Box<PageReader>
) -> RecordReader {
  match descr.physical_type() {
    Type::BOOLEAN =>
      RecordReader::Bool(RecordReaderImpl::new(descr, page_reader)),
    Type::INT32 =>
      RecordReader::Int32(RecordReaderImpl::new(descr, page_reader)),
    Type::INT64 =>
      RecordReader::Int64(RecordReaderImpl::new(descr, page_reader)),
    Type::INT96 =>
      RecordReader::Int96(RecordReaderImpl::new(descr, page_reader)),
    Type::FLOAT =>
      RecordReader::Float(RecordReaderImpl::new(descr, page_reader)),
    Type::DOUBLE =>
      RecordReader::Double(RecordReaderImpl::new(descr, page_reader)),
    Type::BYTE_ARRAY =>
      RecordReader::ByteArray(RecordReaderImpl::new(descr, page_reader)),
    Type::FIXED_LEN_BYTE_ARRAY =>
      RecordReader::FixedLenByteArray(RecordReaderImpl::new(descr, page_reader))
  }
}

macro_rules! dispatch_mut {
  ($self:ident, $method:ident $(, $arg:expr)*) => {
    match *$self {
      RecordReader::Bool(ref mut r) => r.$method($($arg),*),
      RecordReader::Int32(ref mut r) => r.$method($($arg),*),
      RecordReader::Int64(ref mut r) => r.$method($($arg),*),
      RecordReader::Int96(ref mut r) => r.$method($($arg),*),
      RecordReader::Float(ref mut r) => r.$method($($arg),*),
      RecordReader::Double(ref mut r) => r.$method($($arg),*),
      RecordReader::ByteArray(ref mut r) => r.$method($($arg),*),
      RecordReader::FixedLenByteArray(ref mut r) => r.$method($($arg),*)
    }
  };
}

macro_rules! dispatch_ref {
  ($self:ident, $method:ident $(, $arg:expr)*) => {
    match *$self {
      RecordReader::Bool(ref r) => r.$method($($arg),*),
      RecordReader::Int32(ref r) => r.$method($($arg),*),
      RecordReader::Int64(ref r) => r.$method($($arg),*),
      RecordReader::Int96(ref r) => r.$method($($arg),*),
      RecordReader::Float(ref r) => r.$method($($arg),*),
      RecordReader::Double(ref r) => r.$method($($arg),*),
      RecordReader::ByteArray(ref r) => r.$method($($arg),*),
      RecordReader::FixedLenByteArray(ref r) => r.$method($($arg),*)
    }
  };
}

impl RecordReader {
  pub fn read_records(&mut self, num_records: usize) -> Result<usize> {
    dispatch_mut!(self, read_records, num_records)
  }

  pub fn has_more(&mut self) -> Result<bool> {
    dispatch_mut!(self, has_more)
  }

  pub fn reserve(&mut self, extra: usize) -> Result<()> {
    dispatch_mut!(self, reserve, extra)
  }

  pub fn reset(&mut self) {
    dispatch_mut!(self, reset)
  }

  pub fn set_page_reader(&mut self, page_reader: Box<PageReader>) {
    dispatch_mut!(self, set_page_reader, page_reader)
  }

  pub fn release_values(&mut self) -> Result<ByteBuffer> {
    dispatch_mut!(self, release_values)
  }

  pub fn release_valid_bits(&mut self) -> Result<ByteBuffer> {
    dispatch_mut!(self, release_valid_bits)
  }

  pub fn retain(&self) {
    dispatch_ref!(self, retain)
  }

  pub fn release(&mut self) -> usize {
    dispatch_mut!(self, release)
  }

  pub fn def_levels(&self) -> &[i16] {
    dispatch_ref!(self, def_levels)
  }

  pub fn rep_levels(&self) -> &[i16] {
    dispatch_ref!(self, rep_levels)
  }

  pub fn levels_pos(&self) -> usize {
    dispatch_ref!(self, levels_pos)
  }

  pub fn values_written(&self) -> usize {
    dispatch_ref!(self, values_written)
  }

  pub fn null_count(&self) -> usize {
    dispatch_ref!(self, null_count)
  }

  pub fn records_read(&self) -> usize {
    dispatch_ref!(self, records_read)
  }

  pub fn values(&self) -> &[u8] {
    dispatch_ref!(self, values)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::rc::Rc;

  use array::Array;
  use basic::LogicalType;
  use schema::ColumnDescriptor;
  use util::test_common::*;

  fn int32_reader(
    descr: ColumnDescriptor, pages: Vec<::column::page::Page>
  ) -> PrimitiveRecordReader<Int32Type> {
    RecordReaderImpl::new(Rc::new(descr), Box::new(InMemoryPageReader::new(pages)))
  }

  #[test]
  fn test_flat_required_column() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(4).values::<Int32Type>(&[10, 20, 30, 40]).consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(2).unwrap(), 2);
    assert_eq!(reader.typed_values(), &[10, 20]);
    assert_eq!(reader.values_written(), 2);
    assert_eq!(reader.null_count(), 0);
    reader.reset();

    // asking for more than remains yields the remainder
    assert_eq!(reader.read_records(10).unwrap(), 2);
    assert_eq!(reader.typed_values(), &[30, 40]);
    reader.reset();

    assert_eq!(reader.read_records(10).unwrap(), 0);
    assert!(!reader.has_more().unwrap());
  }

  #[test]
  fn test_flat_required_column_no_reset_concatenates() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(4).values::<Int32Type>(&[10, 20, 30, 40]).consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(2).unwrap(), 2);
    assert_eq!(reader.read_records(2).unwrap(), 2);
    assert_eq!(reader.typed_values(), &[10, 20, 30, 40]);
    assert_eq!(reader.records_read(), 4);
  }

  #[test]
  fn test_flat_optional_column() {
    let descr = ColumnDescriptor::new(Type::INT64, 1, 0);
    let pages = vec![
      DataPageBuilder::new(5)
        .def_levels(&[1, 0, 1, 1, 0])
        .values::<Int64Type>(&[7, 9, 11])
        .consume()
    ];
    let mut reader: PrimitiveRecordReader<Int64Type> = RecordReaderImpl::new(
      Rc::new(descr), Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(5).unwrap(), 5);
    assert_eq!(reader.values_written(), 5);
    assert_eq!(reader.null_count(), 2);
    assert_eq!(reader.def_levels(), &[1, 0, 1, 1, 0]);

    let values = reader.typed_values().to_vec();
    let valid_bits = reader.release_valid_bits().unwrap();
    // LSB first: positions 0, 2 and 3 set
    assert_eq!(valid_bits.data(), &[0b00001101]);
    assert_eq!(values[0], 7);
    assert_eq!(values[2], 9);
    assert_eq!(values[3], 11);

    // popcount(valid_bits) + null_count == values_written
    assert_eq!(
      bit_util::count_set_bits(valid_bits.data(), 0, reader.values_written()),
      reader.values_written() - reader.null_count()
    );
  }

  #[test]
  fn test_repeated_column() {
    // records: {[1, 2, 3]}, {} (null list), {[5, 6]}
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1);
    let pages = vec![
      DataPageBuilder::new(6)
        .rep_levels(&[0, 1, 1, 0, 0, 1])
        .def_levels(&[2, 2, 2, 0, 2, 2])
        .values::<Int32Type>(&[1, 2, 3, 5, 6])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(3).unwrap(), 3);
    assert_eq!(reader.values_written(), 6);
    assert_eq!(reader.null_count(), 1);

    let values = reader.typed_values().to_vec();
    assert_eq!(&values[..3], &[1, 2, 3]);
    assert_eq!(&values[4..], &[5, 6]);

    let valid_bits = reader.release_valid_bits().unwrap();
    // the null list occupies one cleared slot
    assert_eq!(valid_bits.data(), &[0b00110111]);
  }

  #[test]
  fn test_chunk_ends_mid_record() {
    // the last record never sees a closing zero level; exhaustion must count
    // it exactly once
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1);
    let pages = vec![
      DataPageBuilder::new(6)
        .rep_levels(&[0, 1, 1, 0, 0, 1])
        .def_levels(&[2, 2, 2, 0, 2, 2])
        .values::<Int32Type>(&[1, 2, 3, 5, 6])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(10).unwrap(), 3);
    assert_eq!(reader.read_records(10).unwrap(), 0);

    // the next chunk opens with a zero level, which must not close the
    // already counted record
    let next_chunk = vec![
      DataPageBuilder::new(2)
        .rep_levels(&[0, 1])
        .def_levels(&[2, 2])
        .values::<Int32Type>(&[7, 8])
        .consume()
    ];
    reader.set_page_reader(Box::new(InMemoryPageReader::new(next_chunk)));
    reader.reset();
    assert_eq!(reader.read_records(10).unwrap(), 1);
    assert_eq!(reader.typed_values(), &[7, 8]);
  }

  #[test]
  fn test_resume_in_small_batches() {
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1);
    let pages = vec![
      DataPageBuilder::new(6)
        .rep_levels(&[0, 1, 1, 0, 0, 1])
        .def_levels(&[2, 2, 2, 0, 2, 2])
        .values::<Int32Type>(&[1, 2, 3, 5, 6])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(1).unwrap(), 1);
    assert_eq!(reader.values_written(), 3);
    assert_eq!(reader.typed_values(), &[1, 2, 3]);
    // levels beyond the first record are already decoded but not consumed
    assert_eq!(reader.levels_pos(), 3);
    assert_eq!(reader.def_levels().len(), 6);

    // remaining records come out of the buffered levels
    assert_eq!(reader.read_records(5).unwrap(), 2);
    assert_eq!(reader.values_written(), 6);
    assert_eq!(reader.null_count(), 1);
  }

  #[test]
  fn test_reset_shifts_unread_levels() {
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1);
    let pages = vec![
      DataPageBuilder::new(6)
        .rep_levels(&[0, 1, 1, 0, 0, 1])
        .def_levels(&[2, 2, 2, 0, 2, 2])
        .values::<Int32Type>(&[1, 2, 3, 5, 6])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(1).unwrap(), 1);
    let old_def_tail = reader.def_levels()[reader.levels_pos()..].to_vec();
    let old_rep_tail = reader.rep_levels()[reader.levels_pos()..].to_vec();

    reader.reset();
    assert_eq!(reader.levels_pos(), 0);
    assert_eq!(reader.values_written(), 0);
    assert_eq!(reader.records_read(), 0);
    assert_eq!(reader.def_levels(), &old_def_tail[..]);
    assert_eq!(reader.rep_levels(), &old_rep_tail[..]);

    // reading continues from the preserved tail
    assert_eq!(reader.read_records(5).unwrap(), 2);
    assert_eq!(reader.values_written(), 3);
    assert_eq!(reader.null_count(), 1);
  }

  #[test]
  fn test_rep_def_count_mismatch_is_corrupt() {
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1);
    // rep levels missing entirely
    let pages = vec![
      DataPageBuilder::new(2)
        .def_levels(&[2, 2])
        .values::<Int32Type>(&[1, 2])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);
    match reader.read_records(2) {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
    // the error is sticky
    assert!(!reader.has_more().unwrap());
    assert_eq!(reader.read_records(2).unwrap(), 0);
  }

  #[test]
  fn test_reserve_overflow_is_corrupt_and_mutates_nothing() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(2).values::<Int32Type>(&[1, 2]).consume()
    ];
    let mut reader = int32_reader(descr, pages);

    match reader.reserve(1usize << 62) {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
    assert_eq!(reader.values_written(), 0);

    // the reader is still usable
    assert_eq!(reader.read_records(2).unwrap(), 2);
    assert_eq!(reader.typed_values(), &[1, 2]);
  }

  #[test]
  fn test_release_values_installs_fresh_buffer() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(4).values::<Int32Type>(&[10, 20, 30, 40]).consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(2).unwrap(), 2);
    let released = reader.release_values().unwrap();
    assert_eq!(released.size(), 8);
    assert_eq!(released.typed_data::<i32>(), &[10, 20]);

    reader.reset();
    assert_eq!(reader.read_records(2).unwrap(), 2);
    assert_eq!(reader.typed_values(), &[30, 40]);
  }

  #[test]
  fn test_values_across_multiple_pages() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(3).values::<Int32Type>(&[1, 2, 3]).consume(),
      DataPageBuilder::new(3).values::<Int32Type>(&[4, 5, 6]).consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(6).unwrap(), 6);
    assert_eq!(reader.typed_values(), &[1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn test_partition_law_random_values() {
    let mut values = vec![];
    random_numbers_range::<i32>(100, -1000, 1000, &mut values);

    let one_shot = {
      let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
      let pages = vec![
        DataPageBuilder::new(100).values::<Int32Type>(&values).consume()
      ];
      let mut reader = int32_reader(descr, pages);
      assert_eq!(reader.read_records(100).unwrap(), 100);
      reader.typed_values().to_vec()
    };
    assert_eq!(one_shot, values);

    let partitioned = {
      let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
      let pages = vec![
        DataPageBuilder::new(100).values::<Int32Type>(&values).consume()
      ];
      let mut reader = int32_reader(descr, pages);
      assert_eq!(reader.read_records(7).unwrap(), 7);
      assert_eq!(reader.read_records(51).unwrap(), 51);
      assert_eq!(reader.read_records(100).unwrap(), 42);
      reader.typed_values().to_vec()
    };
    assert_eq!(partitioned, one_shot);
  }

  #[test]
  fn test_bool_column() {
    let descr = ColumnDescriptor::new(Type::BOOLEAN, 0, 0);
    let data = vec![true, false, true, true, false];
    let pages = vec![
      DataPageBuilder::new(5).values::<BoolType>(&data).consume()
    ];
    let mut reader: PrimitiveRecordReader<BoolType> = RecordReaderImpl::new(
      Rc::new(descr), Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(5).unwrap(), 5);
    assert_eq!(reader.typed_values(), &data[..]);
  }

  #[test]
  fn test_byte_array_column_with_nulls() {
    let descr = ColumnDescriptor::new(Type::BYTE_ARRAY, 1, 0)
      .with_logical_type(LogicalType::UTF8);
    let values = vec![ByteArray::from("hi"), ByteArray::from("bye")];
    let pages = vec![
      DataPageBuilder::new(3)
        .def_levels(&[1, 0, 1])
        .values::<ByteArrayType>(&values)
        .consume()
    ];
    let mut reader: ByteArrayRecordReader = RecordReaderImpl::new(
      Rc::new(descr), Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(3).unwrap(), 3);
    assert_eq!(reader.values_written(), 3);
    assert_eq!(reader.null_count(), 1);
    assert_eq!(reader.values(), &[] as &[u8]);

    let chunks = reader.get_builder_chunks();
    assert_eq!(chunks.len(), 1);
    match chunks[0] {
      Array::Str(ref array) => {
        assert_eq!(array.len(), 3);
        assert_eq!(array.null_count(), 1);
        assert_eq!(array.value(0), "hi");
        assert!(array.is_null(1));
        assert_eq!(array.value(2), "bye");
      },
      ref other => panic!("Expected string array, got {:?}", other)
    }
  }

  #[test]
  fn test_byte_array_column_without_logical_type() {
    let descr = ColumnDescriptor::new(Type::BYTE_ARRAY, 0, 0);
    let values = vec![ByteArray::from(vec![1, 2]), ByteArray::from(vec![3])];
    let pages = vec![
      DataPageBuilder::new(2).values::<ByteArrayType>(&values).consume()
    ];
    let mut reader: ByteArrayRecordReader = RecordReaderImpl::new(
      Rc::new(descr), Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(2).unwrap(), 2);
    let chunks = reader.get_builder_chunks();
    match chunks[0] {
      Array::Binary(ref array) => {
        assert_eq!(array.len(), 2);
        assert_eq!(array.value(0), &[1, 2]);
        assert_eq!(array.value(1), &[3]);
      },
      ref other => panic!("Expected binary array, got {:?}", other)
    }
  }

  #[test]
  fn test_fixed_len_byte_array_column() {
    let descr = ColumnDescriptor::new(Type::FIXED_LEN_BYTE_ARRAY, 1, 0)
      .with_type_length(2);
    let values = vec![ByteArray::from(vec![1, 2]), ByteArray::from(vec![3, 4])];
    let pages = vec![
      DataPageBuilder::new(3)
        .def_levels(&[1, 1, 0])
        .values::<FixedLenByteArrayType>(&values)
        .consume()
    ];
    let mut reader: FixedLenByteArrayRecordReader = RecordReaderImpl::new(
      Rc::new(descr), Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(3).unwrap(), 3);
    let chunks = reader.get_builder_chunks();
    match chunks[0] {
      Array::FixedSizeBinary(ref array) => {
        assert_eq!(array.len(), 3);
        assert_eq!(array.value(0), &[1, 2]);
        assert_eq!(array.value(1), &[3, 4]);
        assert!(array.is_null(2));
      },
      ref other => panic!("Expected fixed size binary array, got {:?}", other)
    }
  }

  #[test]
  fn test_empty_list_emits_no_slot_above_leaf() {
    // the repeated ancestor sits at definition level 1; a level 0
    // observation is a null list with no leaf slot at all
    let descr = ColumnDescriptor::new(Type::INT32, 2, 1)
      .with_repeated_ancestor_def_level(1);
    let pages = vec![
      DataPageBuilder::new(4)
        .rep_levels(&[0, 1, 0, 0])
        .def_levels(&[2, 2, 0, 2])
        .values::<Int32Type>(&[1, 2, 3])
        .consume()
    ];
    let mut reader = int32_reader(descr, pages);

    assert_eq!(reader.read_records(3).unwrap(), 3);
    // the null list contributed no slot
    assert_eq!(reader.values_written(), 3);
    assert_eq!(reader.null_count(), 0);
    assert_eq!(reader.typed_values(), &[1, 2, 3]);
  }

  #[test]
  fn test_retain_release() {
    let descr = ColumnDescriptor::new(Type::INT32, 0, 0);
    let pages = vec![
      DataPageBuilder::new(2).values::<Int32Type>(&[1, 2]).consume()
    ];
    let mut reader = int32_reader(descr, pages);
    reader.read_records(2).unwrap();

    reader.retain();
    assert_eq!(reader.release(), 1);
    // still holding values: the last reference is not gone yet
    assert_eq!(reader.typed_values(), &[1, 2]);
    assert_eq!(reader.release(), 0);
    assert_eq!(reader.values_written(), 0);
    assert_eq!(reader.values(), &[] as &[u8]);
  }

  #[test]
  fn test_record_reader_enum_dispatch() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 0, 0));
    let pages = vec![
      DataPageBuilder::new(3).values::<Int32Type>(&[4, 5, 6]).consume()
    ];
    let mut reader = get_record_reader(
      descr, Box::new(InMemoryPageReader::new(pages)));

    assert_eq!(reader.read_records(3).unwrap(), 3);
    assert_eq!(reader.values_written(), 3);
    assert_eq!(reader.null_count(), 0);
    match reader {
      RecordReader::Int32(ref r) => assert_eq!(r.typed_values(), &[4, 5, 6]),
      _ => panic!("Expected INT32 record reader")
    }
  }
}
