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

//! Contains the column chunk decoder: a thin facade over a page reader that
//! serves decoded levels and typed values to the record assembly layer.

use std::cmp;

use data_type::*;
use encodings::decoding::{Decoder, PlainDecoder};
use errors::{DremelError, Result};
use schema::ColumnDescPtr;
use super::page::PageReader;

/// Decoding adapter for one column chunk.
///
/// The adapter pulls pages lazily from the page reader, validates their level
/// streams and hands out definition levels, repetition levels and typed
/// values. Consumption is tracked separately from level reads: callers
/// declare consumed slots through [`consume_buffered_values`], which is what
/// advances the page cursor.
pub struct ColumnChunkDecoder<T: DataType> {
  descr: ColumnDescPtr,
  page_reader: Box<PageReader>,
  decoder: PlainDecoder<T>,

  // Decoded level streams of the current page and read positions within them
  def_levels: Vec<i16>,
  def_pos: usize,
  rep_levels: Vec<i16>,
  rep_pos: usize,

  // The total number of level slots stored in the current page
  num_buffered_values: usize,

  // The number of slots from the current page consumed so far
  num_decoded_values: usize
}

impl<T: DataType> ColumnChunkDecoder<T> where PlainDecoder<T>: Decoder<T> {
  pub fn new(descr: ColumnDescPtr, page_reader: Box<PageReader>) -> Self {
    let type_length = descr.type_length();
    ColumnChunkDecoder {
      descr: descr,
      page_reader: page_reader,
      decoder: PlainDecoder::new(type_length),
      def_levels: vec![],
      def_pos: 0,
      rep_levels: vec![],
      rep_pos: 0,
      num_buffered_values: 0,
      num_decoded_values: 0
    }
  }

  pub fn descr(&self) -> &ColumnDescPtr {
    &self.descr
  }

  /// Re-points this decoder at a new page stream (the next column chunk).
  /// All page-local state is discarded.
  pub fn set_page_reader(&mut self, page_reader: Box<PageReader>) {
    self.page_reader = page_reader;
    self.def_levels.clear();
    self.def_pos = 0;
    self.rep_levels.clear();
    self.rep_pos = 0;
    self.num_buffered_values = 0;
    self.num_decoded_values = 0;
  }

  /// Returns true if additional slots remain in the current page stream,
  /// loading the next non-empty page when the current one is used up.
  #[inline]
  pub fn has_next(&mut self) -> Result<bool> {
    if self.num_buffered_values == 0
      || self.num_buffered_values == self.num_decoded_values {
      if !self.read_new_page()? {
        Ok(false)
      } else {
        Ok(self.num_buffered_values != 0)
      }
    } else {
      Ok(true)
    }
  }

  /// Slots remaining in the current page before a new page must be loaded.
  #[inline]
  pub fn num_available_values(&self) -> usize {
    self.num_buffered_values - self.num_decoded_values
  }

  /// Declares that `num` logical slots have been consumed.
  #[inline]
  pub fn consume_buffered_values(&mut self, num: usize) {
    self.num_decoded_values += num;
  }

  /// Fills up to `buffer.len()` definition levels from the current page.
  /// Short reads are legal at page boundaries.
  #[inline]
  pub fn read_def_levels(&mut self, buffer: &mut [i16]) -> Result<usize> {
    let num_levels = cmp::min(buffer.len(), self.def_levels.len() - self.def_pos);
    buffer[..num_levels]
      .copy_from_slice(&self.def_levels[self.def_pos..self.def_pos + num_levels]);
    self.def_pos += num_levels;
    Ok(num_levels)
  }

  /// Same as [`read_def_levels`] for repetition levels.
  #[inline]
  pub fn read_rep_levels(&mut self, buffer: &mut [i16]) -> Result<usize> {
    let num_levels = cmp::min(buffer.len(), self.rep_levels.len() - self.rep_pos);
    buffer[..num_levels]
      .copy_from_slice(&self.rep_levels[self.rep_pos..self.rep_pos + num_levels]);
    self.rep_pos += num_levels;
    Ok(num_levels)
  }

  /// Dense decode of exactly `buffer.len()` physical values.
  #[inline]
  pub fn read_values(&mut self, buffer: &mut [T::T]) -> Result<usize> {
    self.decoder.get(buffer)
  }

  /// Decodes `buffer.len() - null_count` physical values, placed at the
  /// positions whose bit in `valid_bits` (starting at `offset`) is set.
  #[inline]
  pub fn read_values_spaced(
    &mut self,
    buffer: &mut [T::T],
    null_count: usize,
    valid_bits: &[u8],
    offset: usize
  ) -> Result<usize> {
    self.decoder.get_spaced(buffer, null_count, valid_bits, offset)
  }

  /// Reads the next non-empty page and sets up level slices and the value
  /// decoder. Returns false if there's no page left.
  fn read_new_page(&mut self) -> Result<bool> {
    loop {
      match self.page_reader.get_next_page()? {
        // No more pages to read
        None => return Ok(false),
        Some(page) => {
          if page.num_values == 0 {
            continue;
          }
          let num_values = page.num_values as usize;

          self.def_levels = match page.def_levels {
            Some(levels) => {
              if self.descr.max_def_level() == 0 {
                return Err(corrupt_err!(
                  "Page carries definition levels for a column without any"));
              }
              self.validate_levels(&levels, num_values, self.descr.max_def_level())?;
              levels
            },
            None => {
              if self.descr.max_def_level() > 0 {
                return Err(corrupt_err!(
                  "Page is missing definition levels for an optional column"));
              }
              vec![]
            }
          };
          self.def_pos = 0;

          self.rep_levels = match page.rep_levels {
            Some(levels) => {
              if self.descr.max_rep_level() == 0 {
                return Err(corrupt_err!(
                  "Page carries repetition levels for a column without any"));
              }
              self.validate_levels(&levels, num_values, self.descr.max_rep_level())?;
              levels
            },
            None => {
              if self.descr.max_rep_level() > 0 {
                return Err(corrupt_err!(
                  "Page is missing repetition levels for a repeated column"));
              }
              vec![]
            }
          };
          self.rep_pos = 0;

          // Physical values present in the page: one per slot whose
          // definition level reaches the maximum
          let num_present = if self.descr.max_def_level() > 0 {
            let max_def_level = self.descr.max_def_level();
            self.def_levels.iter().filter(|&&level| level == max_def_level).count()
          } else {
            num_values
          };
          self.decoder.set_data(page.buf, num_present)?;

          self.num_buffered_values = num_values;
          self.num_decoded_values = 0;
          return Ok(true);
        }
      }
    }
  }

  fn validate_levels(
    &self, levels: &[i16], num_values: usize, max_level: i16
  ) -> Result<()> {
    if levels.len() != num_values {
      return Err(corrupt_err!(
        "Page declares {} slots but carries {} levels", num_values, levels.len()));
    }
    for &level in levels {
      if level < 0 || level > max_level {
        return Err(corrupt_err!(
          "Level {} out of range [0, {}]", level, max_level));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::rc::Rc;

  use basic::Type;
  use schema::ColumnDescriptor;
  use util::test_common::*;

  #[test]
  fn test_read_flat_values_across_pages() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 0, 0));
    let pages = vec![
      DataPageBuilder::new(3).values::<Int32Type>(&[1, 2, 3]).consume(),
      DataPageBuilder::new(2).values::<Int32Type>(&[4, 5]).consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int32Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));

    assert!(decoder.has_next().unwrap());
    assert_eq!(decoder.num_available_values(), 3);
    let mut values = vec![0; 3];
    assert_eq!(decoder.read_values(&mut values).unwrap(), 3);
    assert_eq!(values, vec![1, 2, 3]);
    decoder.consume_buffered_values(3);

    assert!(decoder.has_next().unwrap());
    assert_eq!(decoder.num_available_values(), 2);
    let mut values = vec![0; 2];
    assert_eq!(decoder.read_values(&mut values).unwrap(), 2);
    assert_eq!(values, vec![4, 5]);
    decoder.consume_buffered_values(2);

    assert!(!decoder.has_next().unwrap());
  }

  #[test]
  fn test_read_levels_short_read_at_page_boundary() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT64, 1, 0));
    let pages = vec![
      DataPageBuilder::new(4)
        .def_levels(&[1, 0, 1, 1])
        .values::<Int64Type>(&[10, 20, 30])
        .consume(),
      DataPageBuilder::new(2)
        .def_levels(&[0, 1])
        .values::<Int64Type>(&[40])
        .consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int64Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));

    assert!(decoder.has_next().unwrap());
    let mut levels = vec![0i16; 16];
    // short read: only the current page's levels are served
    assert_eq!(decoder.read_def_levels(&mut levels).unwrap(), 4);
    assert_eq!(&levels[..4], &[1, 0, 1, 1]);
    assert_eq!(decoder.read_def_levels(&mut levels).unwrap(), 0);
    decoder.consume_buffered_values(4);

    assert!(decoder.has_next().unwrap());
    assert_eq!(decoder.read_def_levels(&mut levels).unwrap(), 2);
    assert_eq!(&levels[..2], &[0, 1]);
  }

  #[test]
  fn test_spaced_read_through_adapter() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 1, 0));
    let pages = vec![
      DataPageBuilder::new(4)
        .def_levels(&[1, 0, 0, 1])
        .values::<Int32Type>(&[6, 8])
        .consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int32Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));

    assert!(decoder.has_next().unwrap());
    let valid_bits = vec![0b00001001u8];
    let mut values = vec![0; 4];
    let n = decoder
      .read_values_spaced(&mut values, 2, &valid_bits, 0)
      .unwrap();
    assert_eq!(n, 4);
    assert_eq!(values[0], 6);
    assert_eq!(values[3], 8);
  }

  #[test]
  fn test_out_of_range_level_is_corrupt() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 1, 0));
    let pages = vec![
      DataPageBuilder::new(2)
        .def_levels(&[1, 2])
        .values::<Int32Type>(&[3])
        .consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int32Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));

    match decoder.has_next() {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
  }

  #[test]
  fn test_missing_levels_is_corrupt() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 1, 0));
    let pages = vec![
      DataPageBuilder::new(2).values::<Int32Type>(&[3, 4]).consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int32Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));

    match decoder.has_next() {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
  }

  #[test]
  fn test_set_page_reader_resets_page_state() {
    let descr = Rc::new(ColumnDescriptor::new(Type::INT32, 0, 0));
    let pages = vec![
      DataPageBuilder::new(2).values::<Int32Type>(&[1, 2]).consume()
    ];
    let mut decoder: ColumnChunkDecoder<Int32Type> =
      ColumnChunkDecoder::new(descr, Box::new(InMemoryPageReader::new(pages)));
    assert!(decoder.has_next().unwrap());
    let mut values = vec![0; 1];
    decoder.read_values(&mut values).unwrap();
    decoder.consume_buffered_values(1);

    let next_chunk = vec![
      DataPageBuilder::new(2).values::<Int32Type>(&[8, 9]).consume()
    ];
    decoder.set_page_reader(Box::new(InMemoryPageReader::new(next_chunk)));
    assert_eq!(decoder.num_available_values(), 0);
    assert!(decoder.has_next().unwrap());
    let mut values = vec![0; 2];
    assert_eq!(decoder.read_values(&mut values).unwrap(), 2);
    assert_eq!(values, vec![8, 9]);
  }
}
