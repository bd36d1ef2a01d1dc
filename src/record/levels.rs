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

//! Projection of definition levels into validity bitmaps.

use schema::LevelInfo;
use util::bit_util;

/// Input/output parameters for [`def_levels_to_bitmap`].
pub struct ValidityIO<'a> {
  /// Validity bitmap to populate.
  pub valid_bits: &'a mut [u8],
  /// Bit position in `valid_bits` the first emitted slot is written to.
  pub valid_bits_offset: usize,
  /// Output: number of slots emitted (set and cleared bits together).
  pub read: usize,
  /// Output: number of cleared bits among the emitted slots.
  pub null_count: usize
}

impl<'a> ValidityIO<'a> {
  pub fn new(valid_bits: &'a mut [u8], valid_bits_offset: usize) -> Self {
    ValidityIO {
      valid_bits: valid_bits,
      valid_bits_offset: valid_bits_offset,
      read: 0,
      null_count: 0
    }
  }
}

/// Populates the validity bitmap from a window of definition levels covering
/// one or more records.
///
/// A level equal to the leaf's maximum sets a bit. A level that represents a
/// null at or below the leaf's own optional segment clears a bit. Levels
/// below `repeated_ancestor_def_level` belong to a null or empty ancestor
/// list: they produce no leaf slot at all and are skipped entirely.
pub fn def_levels_to_bitmap(def_levels: &[i16], leaf: &LevelInfo, io: &mut ValidityIO) {
  for &level in def_levels {
    if level == leaf.def_level {
      bit_util::set_bit(io.valid_bits, io.valid_bits_offset + io.read);
      io.read += 1;
    } else if level >= leaf.repeated_ancestor_def_level {
      bit_util::unset_bit(io.valid_bits, io.valid_bits_offset + io.read);
      io.read += 1;
      io.null_count += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flat_optional_levels() {
    let leaf = LevelInfo::new(1, 0);
    let mut bits = vec![0xFFu8; 1];
    {
      let mut io = ValidityIO::new(&mut bits, 0);
      def_levels_to_bitmap(&[1, 0, 1, 1, 0], &leaf, &mut io);
      assert_eq!(io.read, 5);
      assert_eq!(io.null_count, 2);
    }
    // LSB first: positions 0, 2 and 3 set
    assert_eq!(bits[0] & 0b00011111, 0b00001101);
  }

  #[test]
  fn test_levels_with_offset() {
    let leaf = LevelInfo::new(1, 0);
    let mut bits = vec![0u8; 2];
    {
      let mut io = ValidityIO::new(&mut bits, 6);
      def_levels_to_bitmap(&[1, 0, 1], &leaf, &mut io);
      assert_eq!(io.read, 3);
      assert_eq!(io.null_count, 1);
    }
    assert!(bit_util::get_bit(&bits, 6));
    assert!(!bit_util::get_bit(&bits, 7));
    assert!(bit_util::get_bit(&bits, 8));
  }

  #[test]
  fn test_levels_above_leaf_produce_no_slot() {
    // List of optional ints: levels 0 and 1 mean the list itself is null or
    // empty, so the leaf sees no slot for them.
    let leaf = LevelInfo::new(3, 1).with_repeated_ancestor_def_level(2);
    let mut bits = vec![0u8; 1];
    {
      let mut io = ValidityIO::new(&mut bits, 0);
      def_levels_to_bitmap(&[3, 0, 2, 1, 3], &leaf, &mut io);
      assert_eq!(io.read, 3);
      assert_eq!(io.null_count, 1);
    }
    assert!(bit_util::get_bit(&bits, 0));
    assert!(!bit_util::get_bit(&bits, 1));
    assert!(bit_util::get_bit(&bits, 2));
  }

  #[test]
  fn test_all_present() {
    let leaf = LevelInfo::new(2, 1);
    let mut bits = vec![0u8; 1];
    {
      let mut io = ValidityIO::new(&mut bits, 0);
      def_levels_to_bitmap(&[2, 2, 2, 2], &leaf, &mut io);
      assert_eq!(io.read, 4);
      assert_eq!(io.null_count, 0);
    }
    assert_eq!(bit_util::count_set_bits(&bits, 0, 4), 4);
  }
}
