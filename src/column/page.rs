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

//! Contains the column page produced by the physical page layer and the
//! `PageReader` interface this core consumes.
//!
//! Decompression, level codecs and dictionary resolution happen before a page
//! reaches this crate: levels arrive as decoded 16-bit streams and values as
//! a raw decoded-value slice.

use util::memory::ByteBufferPtr;
use errors::Result;

/// One data page of a column chunk.
pub struct Page {
  /// Raw decoded-value bytes for the page, in plain layout.
  pub buf: ByteBufferPtr,
  /// Total number of level slots in this page (equals the value count for
  /// columns without levels).
  pub num_values: u32,
  /// Decoded definition levels, present iff the column has a maximum
  /// definition level greater than zero. Must hold `num_values` entries.
  pub def_levels: Option<Vec<i16>>,
  /// Decoded repetition levels, present iff the column has a maximum
  /// repetition level greater than zero. Must hold `num_values` entries.
  pub rep_levels: Option<Vec<i16>>
}

/// API for reading pages from a column chunk. This offers a iterator like
/// API to get the next page.
pub trait PageReader {
  /// Gets the next page in the column chunk associated with this reader.
  /// Returns `None` if there are no pages left.
  fn get_next_page(&mut self) -> Result<Option<Page>>;
}
