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

//! Immutable typed columnar arrays with validity bitmaps, plus the schema
//! types used by the text ingester.

pub mod builder;

use std::fmt;
use std::rc::Rc;
use std::str;

use basic::TimeUnit;
use errors::{DremelError, Result};
use util::bit_util;

// ----------------------------------------------------------------------
// Validity bitmap

/// Immutable packed validity bitmap. Bit `i` is 1 iff slot `i` holds a
/// present value. Bits past `len` are always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
  bits: Vec<u8>,
  len: usize
}

impl Bitmap {
  /// Creates a bitmap over the first `len` bits of `bits`. Trailing bits of
  /// the last byte must be zero.
  pub fn new(bits: Vec<u8>, len: usize) -> Self {
    assert!(bits.len() >= bit_util::bytes_for_bits(len));
    Bitmap { bits: bits, len: len }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_set(&self, i: usize) -> bool {
    assert!(i < self.len);
    bit_util::get_bit(&self.bits, i)
  }

  pub fn count_set_bits(&self) -> usize {
    bit_util::count_set_bits(&self.bits, 0, self.len)
  }

  pub fn data(&self) -> &[u8] {
    &self.bits
  }
}

// ----------------------------------------------------------------------
// Arrays

/// An array of a fixed-width native type.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveArray<N> {
  values: Vec<N>,
  validity: Option<Bitmap>,
  null_count: usize
}

impl<N: Copy + PartialEq + fmt::Debug> PrimitiveArray<N> {
  /// Creates an array without nulls.
  pub fn new(values: Vec<N>) -> Self {
    PrimitiveArray { values: values, validity: None, null_count: 0 }
  }

  pub fn from_data(values: Vec<N>, validity: Option<Bitmap>, null_count: usize) -> Self {
    if let Some(ref bitmap) = validity {
      assert_eq!(bitmap.len(), values.len());
    }
    PrimitiveArray { values: values, validity: validity, null_count: null_count }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn null_count(&self) -> usize {
    self.null_count
  }

  /// Value at slot `i`. For a null slot this returns the default placeholder
  /// the builder wrote; consult [`is_null`] first.
  pub fn value(&self, i: usize) -> N {
    self.values[i]
  }

  pub fn values(&self) -> &[N] {
    &self.values
  }

  pub fn is_null(&self, i: usize) -> bool {
    match self.validity {
      Some(ref bitmap) => !bitmap.is_set(i),
      None => false
    }
  }

  pub fn is_valid(&self, i: usize) -> bool {
    !self.is_null(i)
  }

  pub fn validity(&self) -> Option<&Bitmap> {
    self.validity.as_ref()
  }
}

macro_rules! make_offsets_array {
  ($name:ident) => {
    #[derive(Clone, Debug, PartialEq)]
    pub struct $name {
      offsets: Vec<i32>,
      data: Vec<u8>,
      validity: Option<Bitmap>,
      null_count: usize
    }

    impl $name {
      pub fn from_data(
        offsets: Vec<i32>,
        data: Vec<u8>,
        validity: Option<Bitmap>,
        null_count: usize
      ) -> Self {
        assert!(!offsets.is_empty());
        if let Some(ref bitmap) = validity {
          assert_eq!(bitmap.len(), offsets.len() - 1);
        }
        $name {
          offsets: offsets,
          data: data,
          validity: validity,
          null_count: null_count
        }
      }

      pub fn len(&self) -> usize {
        self.offsets.len() - 1
      }

      pub fn null_count(&self) -> usize {
        self.null_count
      }

      pub fn offsets(&self) -> &[i32] {
        &self.offsets
      }

      pub fn is_null(&self, i: usize) -> bool {
        match self.validity {
          Some(ref bitmap) => !bitmap.is_set(i),
          None => false
        }
      }

      pub fn is_valid(&self, i: usize) -> bool {
        !self.is_null(i)
      }

      pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
      }

      fn value_bytes(&self, i: usize) -> &[u8] {
        let start = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        &self.data[start..end]
      }
    }
  };
}

make_offsets_array!(BinaryArray);
make_offsets_array!(StringArray);

impl BinaryArray {
  pub fn value(&self, i: usize) -> &[u8] {
    self.value_bytes(i)
  }
}

impl StringArray {
  pub fn value(&self, i: usize) -> &str {
    // The builder only ever appends valid utf8
    unsafe { str::from_utf8_unchecked(self.value_bytes(i)) }
  }
}

/// An array of byte values that all share one fixed width.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedSizeBinaryArray {
  width: i32,
  data: Vec<u8>,
  validity: Option<Bitmap>,
  null_count: usize
}

impl FixedSizeBinaryArray {
  pub fn from_data(
    width: i32,
    data: Vec<u8>,
    validity: Option<Bitmap>,
    null_count: usize
  ) -> Self {
    assert!(width > 0);
    assert_eq!(data.len() % width as usize, 0);
    FixedSizeBinaryArray {
      width: width,
      data: data,
      validity: validity,
      null_count: null_count
    }
  }

  pub fn len(&self) -> usize {
    self.data.len() / self.width as usize
  }

  pub fn width(&self) -> i32 {
    self.width
  }

  pub fn null_count(&self) -> usize {
    self.null_count
  }

  pub fn value(&self, i: usize) -> &[u8] {
    let width = self.width as usize;
    &self.data[i * width..(i + 1) * width]
  }

  pub fn is_null(&self, i: usize) -> bool {
    match self.validity {
      Some(ref bitmap) => !bitmap.is_set(i),
      None => false
    }
  }

  pub fn is_valid(&self, i: usize) -> bool {
    !self.is_null(i)
  }
}

/// A finished columnar array of any supported type.
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
  Bool(PrimitiveArray<bool>),
  Int8(PrimitiveArray<i8>),
  Int16(PrimitiveArray<i16>),
  Int32(PrimitiveArray<i32>),
  Int64(PrimitiveArray<i64>),
  UInt8(PrimitiveArray<u8>),
  UInt16(PrimitiveArray<u16>),
  UInt32(PrimitiveArray<u32>),
  UInt64(PrimitiveArray<u64>),
  Float(PrimitiveArray<f32>),
  Double(PrimitiveArray<f64>),
  Timestamp(TimeUnit, PrimitiveArray<i64>),
  Str(StringArray),
  Binary(BinaryArray),
  FixedSizeBinary(FixedSizeBinaryArray)
}

/// Reference counted pointer for [`Array`].
pub type ArrayRef = Rc<Array>;

impl Array {
  pub fn len(&self) -> usize {
    match *self {
      Array::Bool(ref a) => a.len(),
      Array::Int8(ref a) => a.len(),
      Array::Int16(ref a) => a.len(),
      Array::Int32(ref a) => a.len(),
      Array::Int64(ref a) => a.len(),
      Array::UInt8(ref a) => a.len(),
      Array::UInt16(ref a) => a.len(),
      Array::UInt32(ref a) => a.len(),
      Array::UInt64(ref a) => a.len(),
      Array::Float(ref a) => a.len(),
      Array::Double(ref a) => a.len(),
      Array::Timestamp(_, ref a) => a.len(),
      Array::Str(ref a) => a.len(),
      Array::Binary(ref a) => a.len(),
      Array::FixedSizeBinary(ref a) => a.len()
    }
  }

  pub fn null_count(&self) -> usize {
    match *self {
      Array::Bool(ref a) => a.null_count(),
      Array::Int8(ref a) => a.null_count(),
      Array::Int16(ref a) => a.null_count(),
      Array::Int32(ref a) => a.null_count(),
      Array::Int64(ref a) => a.null_count(),
      Array::UInt8(ref a) => a.null_count(),
      Array::UInt16(ref a) => a.null_count(),
      Array::UInt32(ref a) => a.null_count(),
      Array::UInt64(ref a) => a.null_count(),
      Array::Float(ref a) => a.null_count(),
      Array::Double(ref a) => a.null_count(),
      Array::Timestamp(_, ref a) => a.null_count(),
      Array::Str(ref a) => a.null_count(),
      Array::Binary(ref a) => a.null_count(),
      Array::FixedSizeBinary(ref a) => a.null_count()
    }
  }

  /// Rough number of bytes held by this array's buffers.
  pub fn byte_size(&self) -> usize {
    match *self {
      Array::Bool(ref a) => a.len(),
      Array::Int8(ref a) => a.len(),
      Array::Int16(ref a) => a.len() * 2,
      Array::Int32(ref a) => a.len() * 4,
      Array::Int64(ref a) => a.len() * 8,
      Array::UInt8(ref a) => a.len(),
      Array::UInt16(ref a) => a.len() * 2,
      Array::UInt32(ref a) => a.len() * 4,
      Array::UInt64(ref a) => a.len() * 8,
      Array::Float(ref a) => a.len() * 4,
      Array::Double(ref a) => a.len() * 8,
      Array::Timestamp(_, ref a) => a.len() * 8,
      Array::Str(ref a) => a.data.len() + a.offsets.len() * 4,
      Array::Binary(ref a) => a.data.len() + a.offsets.len() * 4,
      Array::FixedSizeBinary(ref a) => a.data.len()
    }
  }
}

// ----------------------------------------------------------------------
// Schema for ingested batches

/// Column types the text ingester can produce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldType {
  Bool,
  Int8,
  Int16,
  Int32,
  Int64,
  UInt8,
  UInt16,
  UInt32,
  UInt64,
  Float,
  Double,
  Timestamp(TimeUnit),
  Utf8
}

/// A named, typed column of an ingested batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
  name: String,
  field_type: FieldType,
  nullable: bool
}

impl Field {
  pub fn new(name: &str, field_type: FieldType, nullable: bool) -> Self {
    Field {
      name: String::from(name),
      field_type: field_type,
      nullable: nullable
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn field_type(&self) -> FieldType {
    self.field_type
  }

  pub fn is_nullable(&self) -> bool {
    self.nullable
  }

  pub fn set_name(&mut self, name: &str) {
    self.name = String::from(name);
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
  fields: Vec<Field>
}

/// Reference counted pointer for [`Schema`].
pub type SchemaRef = Rc<Schema>;

impl Schema {
  pub fn new(fields: Vec<Field>) -> Self {
    Schema { fields: fields }
  }

  pub fn fields(&self) -> &[Field] {
    &self.fields
  }

  pub fn field(&self, i: usize) -> &Field {
    &self.fields[i]
  }

  pub fn field_mut(&mut self, i: usize) -> &mut Field {
    &mut self.fields[i]
  }

  pub fn num_fields(&self) -> usize {
    self.fields.len()
  }
}

// ----------------------------------------------------------------------
// Record batches

/// A group of equal-length arrays forming a batch of records.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordBatch {
  schema: SchemaRef,
  columns: Vec<ArrayRef>,
  num_rows: usize
}

/// Reference counted pointer for [`RecordBatch`].
pub type RecordBatchRef = Rc<RecordBatch>;

impl RecordBatch {
  pub fn new(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<Self> {
    if schema.num_fields() != columns.len() {
      return Err(corrupt_err!(
        "Batch has {} columns but schema has {} fields",
        columns.len(),
        schema.num_fields()));
    }
    let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
    for column in &columns {
      if column.len() != num_rows {
        return Err(corrupt_err!(
          "Batch columns have unequal lengths: {} != {}", column.len(), num_rows));
      }
    }
    Ok(RecordBatch { schema: schema, columns: columns, num_rows: num_rows })
  }

  pub fn schema(&self) -> SchemaRef {
    self.schema.clone()
  }

  pub fn num_rows(&self) -> usize {
    self.num_rows
  }

  pub fn num_columns(&self) -> usize {
    self.columns.len()
  }

  pub fn column(&self, i: usize) -> &ArrayRef {
    &self.columns[i]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bitmap() {
    let bitmap = Bitmap::new(vec![0b00001101], 5);
    assert_eq!(bitmap.len(), 5);
    assert!(bitmap.is_set(0));
    assert!(!bitmap.is_set(1));
    assert!(bitmap.is_set(2));
    assert_eq!(bitmap.count_set_bits(), 3);
  }

  #[test]
  fn test_primitive_array() {
    let array = PrimitiveArray::new(vec![1i32, 2, 3]);
    assert_eq!(array.len(), 3);
    assert_eq!(array.null_count(), 0);
    assert!(array.is_valid(1));
    assert_eq!(array.value(2), 3);

    let array = PrimitiveArray::from_data(
      vec![1i64, 0, 3], Some(Bitmap::new(vec![0b00000101], 3)), 1);
    assert_eq!(array.null_count(), 1);
    assert!(array.is_null(1));
    assert_eq!(array.value(0), 1);
    assert_eq!(array.value(2), 3);
  }

  #[test]
  fn test_string_array() {
    let array = StringArray::from_data(
      vec![0, 2, 2, 5], b"hibye".to_vec(), Some(Bitmap::new(vec![0b00000101], 3)), 1);
    assert_eq!(array.len(), 3);
    assert_eq!(array.value(0), "hi");
    assert!(array.is_null(1));
    assert_eq!(array.value(2), "bye");
  }

  #[test]
  fn test_fixed_size_binary_array() {
    let array = FixedSizeBinaryArray::from_data(2, vec![1, 2, 3, 4], None, 0);
    assert_eq!(array.len(), 2);
    assert_eq!(array.value(0), &[1, 2]);
    assert_eq!(array.value(1), &[3, 4]);
  }

  #[test]
  fn test_record_batch_mismatched_columns() {
    let schema = Rc::new(Schema::new(vec![
      Field::new("a", FieldType::Int32, false),
      Field::new("b", FieldType::Utf8, false)
    ]));
    let columns = vec![Rc::new(Array::Int32(PrimitiveArray::new(vec![1, 2])))];
    assert!(RecordBatch::new(schema, columns).is_err());
  }

  #[test]
  fn test_record_batch() {
    let schema = Rc::new(Schema::new(vec![Field::new("a", FieldType::Int32, false)]));
    let columns = vec![Rc::new(Array::Int32(PrimitiveArray::new(vec![1, 2])))];
    let batch = RecordBatch::new(schema, columns).unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 1);
    assert_eq!(batch.column(0).len(), 2);
  }
}
