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

//! Row-oriented text ingestion into columnar record batches.
//!
//! The reader parses delimited text against a schema of primitive, timestamp
//! and string fields. Per-field typed converters are prepared once at
//! construction; the row loop validates field counts and funnels each cell
//! through its converter. A configurable set of strings is treated as null;
//! for string columns null recognition is opt-in, so by default the empty
//! string is a value, not a null.

use std::collections::HashSet;
use std::io::Read;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder as CsvReaderBuilder, StringRecord};

use array::{Array, ArrayRef, FieldType, RecordBatch, RecordBatchRef, Schema, SchemaRef};
use array::builder::{PrimitiveBuilder, StringBuilder};
use basic::TimeUnit;
use errors::{DremelError, Result};
use util::memory::MemTrackerPtr;

/// Hook that may rewrite the schema from the first text row before any
/// converter runs.
pub type HeaderHandler = Box<Fn(&mut Schema, &[String]) -> Result<()>>;

const DEFAULT_NULL_STRINGS: &'static [&'static str] =
  &["", "NULL", "null", "N/A", "n/a", "NA"];

// ----------------------------------------------------------------------
// Value conversion

fn parse_num<N: FromStr>(value: &str, type_name: &str) -> Result<N> {
  value.parse::<N>().map_err(|_| {
    parse_err!("Cannot parse '{}' as {}", value, type_name)
  })
}

fn parse_bool(value: &str) -> Result<bool> {
  match value {
    "true" | "True" | "1" => Ok(true),
    "false" | "False" | "0" => Ok(false),
    _ => Err(parse_err!("Cannot parse '{}' as BOOLEAN", value))
  }
}

fn parse_timestamp(value: &str, unit: TimeUnit) -> Result<i64> {
  let datetime = if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    dt.with_timezone(&Utc).naive_utc()
  } else if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
    dt
  } else if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
    dt
  } else if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
    date.and_hms(0, 0, 0)
  } else {
    return Err(parse_err!("Cannot parse '{}' as timestamp", value));
  };
  let result = match unit {
    TimeUnit::SECONDS => datetime.timestamp(),
    TimeUnit::MILLIS => datetime.timestamp_millis(),
    TimeUnit::MICROS => {
      datetime.timestamp() * 1_000_000 + i64::from(datetime.timestamp_subsec_micros())
    },
    TimeUnit::NANOS => datetime.timestamp_nanos()
  };
  Ok(result)
}

/// A typed converter plus the builder it feeds, one per schema field.
enum ColumnConverter {
  Bool(PrimitiveBuilder<bool>),
  Int8(PrimitiveBuilder<i8>),
  Int16(PrimitiveBuilder<i16>),
  Int32(PrimitiveBuilder<i32>),
  Int64(PrimitiveBuilder<i64>),
  UInt8(PrimitiveBuilder<u8>),
  UInt16(PrimitiveBuilder<u16>),
  UInt32(PrimitiveBuilder<u32>),
  UInt64(PrimitiveBuilder<u64>),
  Float(PrimitiveBuilder<f32>),
  Double(PrimitiveBuilder<f64>),
  Timestamp(TimeUnit, PrimitiveBuilder<i64>),
  Utf8(StringBuilder)
}

impl ColumnConverter {
  fn new(field_type: FieldType) -> Self {
    match field_type {
      FieldType::Bool => ColumnConverter::Bool(PrimitiveBuilder::new()),
      FieldType::Int8 => ColumnConverter::Int8(PrimitiveBuilder::new()),
      FieldType::Int16 => ColumnConverter::Int16(PrimitiveBuilder::new()),
      FieldType::Int32 => ColumnConverter::Int32(PrimitiveBuilder::new()),
      FieldType::Int64 => ColumnConverter::Int64(PrimitiveBuilder::new()),
      FieldType::UInt8 => ColumnConverter::UInt8(PrimitiveBuilder::new()),
      FieldType::UInt16 => ColumnConverter::UInt16(PrimitiveBuilder::new()),
      FieldType::UInt32 => ColumnConverter::UInt32(PrimitiveBuilder::new()),
      FieldType::UInt64 => ColumnConverter::UInt64(PrimitiveBuilder::new()),
      FieldType::Float => ColumnConverter::Float(PrimitiveBuilder::new()),
      FieldType::Double => ColumnConverter::Double(PrimitiveBuilder::new()),
      FieldType::Timestamp(unit) =>
        ColumnConverter::Timestamp(unit, PrimitiveBuilder::new()),
      FieldType::Utf8 => ColumnConverter::Utf8(StringBuilder::new())
    }
  }

  fn append(&mut self, value: &str) -> Result<()> {
    match *self {
      ColumnConverter::Bool(ref mut b) => b.append(parse_bool(value)?),
      ColumnConverter::Int8(ref mut b) => b.append(parse_num(value, "INT8")?),
      ColumnConverter::Int16(ref mut b) => b.append(parse_num(value, "INT16")?),
      ColumnConverter::Int32(ref mut b) => b.append(parse_num(value, "INT32")?),
      ColumnConverter::Int64(ref mut b) => b.append(parse_num(value, "INT64")?),
      ColumnConverter::UInt8(ref mut b) => b.append(parse_num(value, "UINT8")?),
      ColumnConverter::UInt16(ref mut b) => b.append(parse_num(value, "UINT16")?),
      ColumnConverter::UInt32(ref mut b) => b.append(parse_num(value, "UINT32")?),
      ColumnConverter::UInt64(ref mut b) => b.append(parse_num(value, "UINT64")?),
      ColumnConverter::Float(ref mut b) => b.append(parse_num(value, "FLOAT")?),
      ColumnConverter::Double(ref mut b) => b.append(parse_num(value, "DOUBLE")?),
      ColumnConverter::Timestamp(unit, ref mut b) =>
        b.append(parse_timestamp(value, unit)?),
      ColumnConverter::Utf8(ref mut b) => b.append(value)?
    }
    Ok(())
  }

  fn append_null(&mut self) {
    match *self {
      ColumnConverter::Bool(ref mut b) => b.append_null(),
      ColumnConverter::Int8(ref mut b) => b.append_null(),
      ColumnConverter::Int16(ref mut b) => b.append_null(),
      ColumnConverter::Int32(ref mut b) => b.append_null(),
      ColumnConverter::Int64(ref mut b) => b.append_null(),
      ColumnConverter::UInt8(ref mut b) => b.append_null(),
      ColumnConverter::UInt16(ref mut b) => b.append_null(),
      ColumnConverter::UInt32(ref mut b) => b.append_null(),
      ColumnConverter::UInt64(ref mut b) => b.append_null(),
      ColumnConverter::Float(ref mut b) => b.append_null(),
      ColumnConverter::Double(ref mut b) => b.append_null(),
      ColumnConverter::Timestamp(_, ref mut b) => b.append_null(),
      ColumnConverter::Utf8(ref mut b) => b.append_null()
    }
  }

  fn finish(&mut self) -> Array {
    match *self {
      ColumnConverter::Bool(ref mut b) => Array::Bool(b.finish()),
      ColumnConverter::Int8(ref mut b) => Array::Int8(b.finish()),
      ColumnConverter::Int16(ref mut b) => Array::Int16(b.finish()),
      ColumnConverter::Int32(ref mut b) => Array::Int32(b.finish()),
      ColumnConverter::Int64(ref mut b) => Array::Int64(b.finish()),
      ColumnConverter::UInt8(ref mut b) => Array::UInt8(b.finish()),
      ColumnConverter::UInt16(ref mut b) => Array::UInt16(b.finish()),
      ColumnConverter::UInt32(ref mut b) => Array::UInt32(b.finish()),
      ColumnConverter::UInt64(ref mut b) => Array::UInt64(b.finish()),
      ColumnConverter::Float(ref mut b) => Array::Float(b.finish()),
      ColumnConverter::Double(ref mut b) => Array::Double(b.finish()),
      ColumnConverter::Timestamp(unit, ref mut b) => Array::Timestamp(unit, b.finish()),
      ColumnConverter::Utf8(ref mut b) => Array::Str(b.finish())
    }
  }

  fn is_string(&self) -> bool {
    match *self {
      ColumnConverter::Utf8(_) => true,
      _ => false
    }
  }
}

// ----------------------------------------------------------------------
// Reader

/// Builder for the text [`Reader`], covering delimiter, batching, null
/// policy, header handling and memory accounting options.
pub struct ReaderBuilder {
  schema: SchemaRef,
  delimiter: u8,
  header: bool,
  header_handler: Option<HeaderHandler>,
  chunk_size: i64,
  null_strings: HashSet<String>,
  strings_can_be_null: bool,
  mem_tracker: Option<MemTrackerPtr>
}

impl ReaderBuilder {
  pub fn new(schema: SchemaRef) -> Self {
    let null_strings = DEFAULT_NULL_STRINGS
      .iter()
      .map(|s| String::from(*s))
      .collect();
    ReaderBuilder {
      schema: schema,
      delimiter: b',',
      header: false,
      header_handler: None,
      chunk_size: 1,
      null_strings: null_strings,
      strings_can_be_null: false,
      mem_tracker: None
    }
  }

  pub fn with_delimiter(mut self, delimiter: u8) -> Self {
    self.delimiter = delimiter;
    self
  }

  /// Reads the first row as a header that renames the schema fields.
  pub fn with_header(mut self, header: bool) -> Self {
    self.header = header;
    self
  }

  /// Installs a custom header hook, run on the first row instead of the
  /// default renaming.
  pub fn with_header_handler(mut self, handler: HeaderHandler) -> Self {
    self.header = true;
    self.header_handler = Some(handler);
    self
  }

  /// Sets the record batching policy: a negative size ingests all rows into
  /// one batch, `1` (the default) emits one batch per row, and larger sizes
  /// emit fixed-size batches.
  pub fn with_chunk_size(mut self, chunk_size: i64) -> Self {
    self.chunk_size = if chunk_size == 0 { 1 } else { chunk_size };
    self
  }

  /// Replaces the set of strings treated as null.
  pub fn with_null_strings(mut self, null_strings: &[&str]) -> Self {
    self.null_strings = null_strings.iter().map(|s| String::from(*s)).collect();
    self
  }

  /// Opts string columns into null recognition. Off by default: the empty
  /// string is then a value, not a null.
  pub fn with_strings_can_be_null(mut self, strings_can_be_null: bool) -> Self {
    self.strings_can_be_null = strings_can_be_null;
    self
  }

  pub fn with_mem_tracker(mut self, mem_tracker: MemTrackerPtr) -> Self {
    self.mem_tracker = Some(mem_tracker);
    self
  }

  pub fn build<R: Read>(self, reader: R) -> Result<Reader<R>> {
    let mut csv = CsvReaderBuilder::new()
      .has_headers(false)
      .flexible(true)
      .delimiter(self.delimiter)
      .from_reader(reader);

    let mut schema = (*self.schema).clone();
    if self.header {
      let mut record = StringRecord::new();
      if csv.read_record(&mut record)? {
        let cells: Vec<String> =
          record.iter().map(|cell| String::from(cell)).collect();
        match self.header_handler {
          Some(ref handler) => handler(&mut schema, &cells)?,
          None => {
            if cells.len() != schema.num_fields() {
              return Err(DremelError::MismatchedFields(
                schema.num_fields(), cells.len()));
            }
            for (i, cell) in cells.iter().enumerate() {
              schema.field_mut(i).set_name(cell);
            }
          }
        }
      }
    }
    let schema = Rc::new(schema);

    let converters = schema
      .fields()
      .iter()
      .map(|field| ColumnConverter::new(field.field_type()))
      .collect();

    Ok(Reader {
      csv: csv,
      schema: schema,
      chunk_size: self.chunk_size,
      null_strings: self.null_strings,
      strings_can_be_null: self.strings_can_be_null,
      mem_tracker: self.mem_tracker,
      converters: converters,
      current: None,
      err: None,
      done: false
    })
  }
}

/// Reads delimited text rows into record batches.
///
/// Iteration follows the advance-then-inspect shape: [`next`] converts the
/// next batch of rows and returns whether one is available, [`record`]
/// borrows it, and [`err`] reports the first value conversion failure after
/// iteration ends. A bad cell never stops ingestion (its slot becomes null);
/// structural problems such as row arity mismatches stop it immediately.
pub struct Reader<R: Read> {
  csv: ::csv::Reader<R>,
  schema: SchemaRef,
  chunk_size: i64,
  null_strings: HashSet<String>,
  strings_can_be_null: bool,
  mem_tracker: Option<MemTrackerPtr>,
  converters: Vec<ColumnConverter>,
  current: Option<RecordBatchRef>,
  err: Option<DremelError>,
  done: bool
}

impl<R: Read> Reader<R> {
  /// Advances to the next record batch. Returns false when the input is
  /// exhausted or a structural error occurred.
  pub fn next(&mut self) -> bool {
    if self.done {
      self.current = None;
      return false;
    }

    let mut rows_read = 0;
    let mut record = StringRecord::new();
    while self.chunk_size < 0 || rows_read < self.chunk_size as usize {
      match self.csv.read_record(&mut record) {
        Err(e) => {
          self.err = Some(e.into());
          self.done = true;
          self.current = None;
          return false;
        },
        Ok(false) => {
          self.done = true;
          break;
        },
        Ok(true) => {
          if record.len() != self.schema.num_fields() {
            self.err = Some(DremelError::MismatchedFields(
              self.schema.num_fields(), record.len()));
            self.done = true;
            self.current = None;
            return false;
          }
          self.convert_row(&record);
          rows_read += 1;
        }
      }
    }

    if rows_read == 0 {
      self.current = None;
      return false;
    }

    let columns: Vec<ArrayRef> = self
      .converters
      .iter_mut()
      .map(|converter| Rc::new(converter.finish()))
      .collect();
    if let Some(ref mc) = self.mem_tracker {
      let num_bytes: usize = columns.iter().map(|c| c.byte_size()).sum();
      mc.alloc(num_bytes as i64);
    }
    match RecordBatch::new(self.schema.clone(), columns) {
      Ok(batch) => {
        self.current = Some(Rc::new(batch));
        true
      },
      Err(e) => {
        self.err = Some(e);
        self.done = true;
        self.current = None;
        false
      }
    }
  }

  fn convert_row(&mut self, record: &StringRecord) {
    for (i, converter) in self.converters.iter_mut().enumerate() {
      let value = record.get(i).unwrap_or("");
      let is_null = self.null_strings.contains(value)
        && (!converter.is_string() || self.strings_can_be_null);
      if is_null {
        converter.append_null();
        continue;
      }
      if let Err(e) = converter.append(value) {
        // only the first conversion failure is retained; the slot becomes
        // null and ingestion continues
        if self.err.is_none() {
          self.err = Some(e);
        }
        converter.append_null();
      }
    }
  }

  /// The batch produced by the last successful [`next`] call.
  pub fn record(&self) -> Option<RecordBatchRef> {
    self.current.clone()
  }

  /// First value conversion error observed, if any.
  pub fn err(&self) -> Option<&DremelError> {
    self.err.as_ref()
  }

  pub fn schema(&self) -> SchemaRef {
    self.schema.clone()
  }
}
