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

//! Memory related utilities: a growable aligned byte buffer, a shared
//! immutable byte pointer, and a memory usage tracker.

use std::cell::Cell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::slice;

use errors::{DremelError, Result};

/// Hard ceiling for any buffer size, in bytes. Capacity arithmetic that
/// reaches this value (or wraps a 64-bit computation) is a structural error.
pub const MAX_BUFFER_SIZE: u64 = 1 << 62;

/// Returns the new capacity for a buffer of capacity `cap` and logical size
/// `size` that has to hold `extra` more bytes. The capacity is unchanged when
/// it already fits, otherwise it becomes the next power of two of
/// `size + extra`.
pub fn update_capacity(cap: usize, size: usize, extra: usize) -> Result<usize> {
  let target = (size as u64)
    .checked_add(extra as u64)
    .ok_or(corrupt_err!("Buffer size overflows u64"))?;
  if target >= MAX_BUFFER_SIZE {
    return Err(corrupt_err!(
      "Buffer size {} exceeds maximum of {} bytes", target, MAX_BUFFER_SIZE));
  }
  if cap as u64 >= target {
    Ok(cap)
  } else {
    // target < 2^62, so the next power of two cannot wrap
    Ok(target.next_power_of_two() as usize)
  }
}

// ----------------------------------------------------------------------
// Memory tracker

/// Tracks the current and historical maximum number of bytes held by the
/// buffers registered with it.
pub struct MemTracker {
  memory_usage: Cell<i64>,
  max_memory_usage: Cell<i64>
}

pub type MemTrackerPtr = Rc<MemTracker>;

impl MemTracker {
  pub fn new() -> Self {
    MemTracker { memory_usage: Cell::new(0), max_memory_usage: Cell::new(0) }
  }

  pub fn new_ptr() -> MemTrackerPtr {
    Rc::new(MemTracker::new())
  }

  /// Number of bytes currently allocated through this tracker.
  pub fn memory_usage(&self) -> i64 {
    self.memory_usage.get()
  }

  /// High watermark of `memory_usage` over the tracker lifetime.
  pub fn max_memory_usage(&self) -> i64 {
    self.max_memory_usage.get()
  }

  /// Adds `num_bytes` (possibly negative) to the current usage.
  pub fn alloc(&self, num_bytes: i64) {
    let new_usage = self.memory_usage.get() + num_bytes;
    self.memory_usage.set(new_usage);
    if new_usage > self.max_memory_usage.get() {
      self.max_memory_usage.set(new_usage);
    }
  }
}

// ----------------------------------------------------------------------
// Byte buffer

/// A resizable buffer of bytes. Storage is backed by 64-bit words, so views
/// of the contents as any primitive type of alignment up to 8 bytes are
/// sound. New bytes exposed by growth are always zeroed.
pub struct ByteBuffer {
  data: Vec<u64>,
  size: usize,
  mem_tracker: Option<MemTrackerPtr>
}

impl ByteBuffer {
  pub fn new() -> Self {
    ByteBuffer { data: vec![], size: 0, mem_tracker: None }
  }

  pub fn with_mem_tracker(mc: MemTrackerPtr) -> Self {
    ByteBuffer { data: vec![], size: 0, mem_tracker: Some(mc) }
  }

  /// Logical length in bytes.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0
  }

  /// Number of bytes allocated (and zero-initialized) for this buffer.
  pub fn capacity(&self) -> usize {
    self.data.len() * 8
  }

  /// Grows or shrinks the logical length to `new_size` bytes. Shrinking never
  /// releases storage; growing allocates at least the next power of two of
  /// the requested size.
  pub fn resize(&mut self, new_size: usize) -> Result<()> {
    if new_size > self.capacity() {
      let new_cap = update_capacity(self.capacity(), new_size, 0)?;
      self.grow_storage(new_cap);
    }
    self.size = new_size;
    Ok(())
  }

  /// Ensures capacity for `extra` more bytes past the current logical length.
  /// The logical length does not change.
  pub fn reserve(&mut self, extra: usize) -> Result<()> {
    let new_cap = update_capacity(self.capacity(), self.size, extra)?;
    if new_cap > self.capacity() {
      self.grow_storage(new_cap);
    }
    Ok(())
  }

  /// Resets the logical length to zero. Storage is retained for reuse.
  pub fn clear(&mut self) {
    self.size = 0;
  }

  fn grow_storage(&mut self, new_cap: usize) {
    let old_cap = self.capacity();
    let num_words = (new_cap + 7) / 8;
    self.data.resize(num_words, 0);
    if let Some(ref mc) = self.mem_tracker {
      mc.alloc((self.capacity() - old_cap) as i64);
    }
  }

  pub fn data(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.data.as_ptr() as *const u8, self.size) }
  }

  pub fn mut_data(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr() as *mut u8, self.size) }
  }

  /// View of the contents as a slice of `T`. The word-aligned storage makes
  /// this valid for any `T` with alignment of at most 8 bytes.
  pub fn typed_data<T>(&self) -> &[T] {
    assert!(mem::align_of::<T>() <= 8);
    unsafe {
      slice::from_raw_parts(
        self.data.as_ptr() as *const T, self.size / mem::size_of::<T>())
    }
  }

  pub fn typed_data_mut<T>(&mut self) -> &mut [T] {
    assert!(mem::align_of::<T>() <= 8);
    unsafe {
      slice::from_raw_parts_mut(
        self.data.as_mut_ptr() as *mut T, self.size / mem::size_of::<T>())
    }
  }

  /// Copies the contents of `data` into this buffer, replacing its previous
  /// contents.
  pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
    self.resize(data.len())?;
    self.mut_data().copy_from_slice(data);
    Ok(())
  }
}

impl Drop for ByteBuffer {
  fn drop(&mut self) {
    if let Some(ref mc) = self.mem_tracker {
      mc.alloc(-(self.capacity() as i64));
    }
  }
}

impl fmt::Debug for ByteBuffer {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "ByteBuffer {{ size: {}, capacity: {} }}", self.size, self.capacity())
  }
}

// ----------------------------------------------------------------------
// Immutable byte buffer pointer

/// A cheaply clonable read-only view into a shared byte vector.
#[derive(Clone, Debug)]
pub struct ByteBufferPtr {
  data: Rc<Vec<u8>>,
  start: usize,
  len: usize
}

impl ByteBufferPtr {
  pub fn new(v: Vec<u8>) -> Self {
    let len = v.len();
    ByteBufferPtr { data: Rc::new(v), start: 0, len: len }
  }

  pub fn data(&self) -> &[u8] {
    &self.data[self.start..self.start + self.len]
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Whole view of the underlying vector this pointer was derived from.
  pub fn all(&self) -> ByteBufferPtr {
    ByteBufferPtr { data: self.data.clone(), start: self.start, len: self.len }
  }

  /// Sub-view starting at `start` (relative to this view) to its end.
  pub fn start_from(&self, start: usize) -> ByteBufferPtr {
    assert!(start <= self.len);
    ByteBufferPtr {
      data: self.data.clone(),
      start: self.start + start,
      len: self.len - start
    }
  }

  /// Sub-view of `len` bytes starting at `start` (relative to this view).
  pub fn range(&self, start: usize, len: usize) -> ByteBufferPtr {
    assert!(start + len <= self.len);
    ByteBufferPtr { data: self.data.clone(), start: self.start + start, len: len }
  }
}

impl AsRef<[u8]> for ByteBufferPtr {
  fn as_ref(&self) -> &[u8] {
    self.data()
  }
}

impl PartialEq for ByteBufferPtr {
  fn eq(&self, other: &ByteBufferPtr) -> bool {
    self.data() == other.data()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_update_capacity() {
    assert_eq!(update_capacity(64, 10, 20).unwrap(), 64);
    assert_eq!(update_capacity(16, 10, 20).unwrap(), 32);
    assert_eq!(update_capacity(0, 0, 1).unwrap(), 1);
    assert_eq!(update_capacity(0, 1000, 24).unwrap(), 1024);
    assert_eq!(update_capacity(0, 1000, 25).unwrap(), 2048);
  }

  #[test]
  fn test_update_capacity_overflow() {
    let res = update_capacity(0, 1 << 61, 1 << 61);
    match res {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
    let res = update_capacity(0, usize::max_value(), usize::max_value());
    match res {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
  }

  #[test]
  fn test_byte_buffer_resize() {
    let mut buf = ByteBuffer::new();
    assert_eq!(buf.size(), 0);
    assert_eq!(buf.capacity(), 0);

    buf.resize(10).unwrap();
    assert_eq!(buf.size(), 10);
    assert_eq!(buf.capacity(), 16);
    assert_eq!(buf.data(), &[0; 10][..]);

    // shrink keeps storage
    buf.resize(4).unwrap();
    assert_eq!(buf.size(), 4);
    assert_eq!(buf.capacity(), 16);

    buf.resize(100).unwrap();
    assert_eq!(buf.size(), 100);
    assert_eq!(buf.capacity(), 128);
  }

  #[test]
  fn test_byte_buffer_reserve() {
    let mut buf = ByteBuffer::new();
    buf.resize(8).unwrap();
    buf.reserve(100).unwrap();
    assert_eq!(buf.size(), 8);
    assert!(buf.capacity() >= 108);
  }

  #[test]
  fn test_byte_buffer_reserve_overflow_mutates_nothing() {
    let mut buf = ByteBuffer::new();
    buf.resize(8).unwrap();
    buf.mut_data().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    let cap = buf.capacity();

    let res = buf.reserve(1usize << 62);
    match res {
      Err(DremelError::Corrupt(_)) => {},
      other => panic!("Expected corrupt error, got {:?}", other)
    }
    assert_eq!(buf.size(), 8);
    assert_eq!(buf.capacity(), cap);
    assert_eq!(buf.data(), &[1, 2, 3, 4, 5, 6, 7, 8][..]);
  }

  #[test]
  fn test_byte_buffer_typed_data() {
    let mut buf = ByteBuffer::new();
    buf.resize(8).unwrap();
    {
      let levels = buf.typed_data_mut::<i16>();
      assert_eq!(levels.len(), 4);
      levels.copy_from_slice(&[1, 0, 2, 1]);
    }
    assert_eq!(buf.typed_data::<i16>(), &[1, 0, 2, 1]);
    // new bytes exposed by growth are zeroed
    buf.resize(16).unwrap();
    assert_eq!(buf.typed_data::<i16>(), &[1, 0, 2, 1, 0, 0, 0, 0]);
  }

  #[test]
  fn test_mem_tracker() {
    let mc = MemTracker::new_ptr();
    {
      let mut buf = ByteBuffer::with_mem_tracker(mc.clone());
      buf.resize(10).unwrap();
      assert_eq!(mc.memory_usage(), buf.capacity() as i64);
      buf.resize(100).unwrap();
      assert_eq!(mc.memory_usage(), buf.capacity() as i64);
      assert_eq!(mc.max_memory_usage(), buf.capacity() as i64);
    }
    assert_eq!(mc.memory_usage(), 0);
    assert_eq!(mc.max_memory_usage(), 128);
  }

  #[test]
  fn test_byte_ptr() {
    let ptr = ByteBufferPtr::new(vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(ptr.len(), 8);
    assert_eq!(ptr.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    let tail = ptr.start_from(3);
    assert_eq!(tail.len(), 5);
    assert_eq!(tail.data(), &[4, 5, 6, 7, 8]);

    let mid = tail.range(1, 2);
    assert_eq!(mid.data(), &[5, 6]);
    assert_eq!(mid.start(), 4);
  }
}
