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

//! Common error types and macros for this crate.

use std::io;
use std::result;

quick_error! {
  /// Set of errors that can be produced during record assembly or ingestion.
  #[derive(Debug, PartialEq)]
  pub enum DremelError {
    /// Structural violation in the input: mismatched level counts,
    /// out-of-range levels, capacity overflow.
    Corrupt(message: String) {
      display("Corrupt data: {}", message)
      description(message)
    }
    /// A value decoder reported a failure.
    Decode(message: String) {
      display("Decode error: {}", message)
      description(message)
      from(e: io::Error) -> (format!("underlying IO error: {}", e))
    }
    /// Ran out of input bytes while decoding values.
    Eof(message: String) {
      display("EOF: {}", message)
      description(message)
    }
    /// A text row does not have one field per schema column.
    MismatchedFields(expected: usize, actual: usize) {
      display("Row has {} fields, schema has {}", actual, expected)
      description("row arity does not match schema")
    }
    /// A text field could not be converted to its column type.
    ParseValue(message: String) {
      display("Parse error: {}", message)
      description(message)
    }
  }
}

/// A specialized `Result` for all errors in this crate.
pub type Result<T> = result::Result<T, DremelError>;

// ----------------------------------------------------------------------
// Conversion from csv errors

impl From<::csv::Error> for DremelError {
  fn from(e: ::csv::Error) -> DremelError {
    DremelError::ParseValue(format!("underlying csv error: {}", e))
  }
}

// ----------------------------------------------------------------------
// Convenient macros for different errors

macro_rules! corrupt_err {
  ($fmt:expr) => (DremelError::Corrupt($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (DremelError::Corrupt(format!($fmt, $($args),*)));
}

macro_rules! decode_err {
  ($fmt:expr) => (DremelError::Decode($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (DremelError::Decode(format!($fmt, $($args),*)));
}

macro_rules! eof_err {
  ($fmt:expr) => (DremelError::Eof($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (DremelError::Eof(format!($fmt, $($args),*)));
}

macro_rules! parse_err {
  ($fmt:expr) => (DremelError::ParseValue($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (DremelError::ParseValue(format!($fmt, $($args),*)));
}
