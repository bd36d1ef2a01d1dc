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

//! Contains basic enums shared by the whole crate.

use std::fmt;

// ----------------------------------------------------------------------
// Types from the columnar format

/// Physical types of leaf values.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  BOOLEAN,
  INT32,
  INT64,
  INT96,
  FLOAT,
  DOUBLE,
  BYTE_ARRAY,
  FIXED_LEN_BYTE_ARRAY
}

/// Common logical types that annotate the physical types. Only the subset
/// that affects record assembly is represented: `UTF8` selects the string
/// builder for byte-array columns.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
  NONE,
  UTF8
}

/// Resolution of a timestamp column.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
  SECONDS,
  MILLIS,
  MICROS,
  NANOS
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for LogicalType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl fmt::Display for TimeUnit {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_type() {
    assert_eq!(format!("{}", Type::BOOLEAN), "BOOLEAN");
    assert_eq!(format!("{}", Type::INT32), "INT32");
    assert_eq!(format!("{}", Type::INT64), "INT64");
    assert_eq!(format!("{}", Type::INT96), "INT96");
    assert_eq!(format!("{}", Type::FLOAT), "FLOAT");
    assert_eq!(format!("{}", Type::DOUBLE), "DOUBLE");
    assert_eq!(format!("{}", Type::BYTE_ARRAY), "BYTE_ARRAY");
    assert_eq!(format!("{}", Type::FIXED_LEN_BYTE_ARRAY), "FIXED_LEN_BYTE_ARRAY");
  }

  #[test]
  fn test_display_time_unit() {
    assert_eq!(format!("{}", TimeUnit::SECONDS), "SECONDS");
    assert_eq!(format!("{}", TimeUnit::MILLIS), "MILLIS");
    assert_eq!(format!("{}", TimeUnit::MICROS), "MICROS");
    assert_eq!(format!("{}", TimeUnit::NANOS), "NANOS");
  }
}
