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

//! Column descriptors: everything record assembly needs to know about one
//! leaf column. The schema tree itself is resolved by the file layer and is
//! not represented here.

use std::rc::Rc;

use basic::{LogicalType, Type};

/// Position of a leaf column in the nesting structure, expressed as Dremel
/// levels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelInfo {
  /// Maximum definition level. A definition level equal to this marks a
  /// present leaf value.
  pub def_level: i16,
  /// Maximum repetition level. A repetition level of zero marks the first
  /// leaf of a new record.
  pub rep_level: i16,
  /// Definition level at which the closest repeated ancestor of the leaf is
  /// known to be present. Definition levels below this belong to a null or
  /// empty ancestor and produce no leaf slot at all.
  pub repeated_ancestor_def_level: i16
}

impl LevelInfo {
  pub fn new(def_level: i16, rep_level: i16) -> Self {
    LevelInfo {
      def_level: def_level,
      rep_level: rep_level,
      repeated_ancestor_def_level: 0
    }
  }

  pub fn with_repeated_ancestor_def_level(mut self, level: i16) -> Self {
    self.repeated_ancestor_def_level = level;
    self
  }

  /// A leaf has nullable values iff some optional segment sits between it and
  /// its closest repeated ancestor (or the root).
  pub fn has_nullable_values(&self) -> bool {
    self.def_level > self.repeated_ancestor_def_level
  }
}

/// A descriptor for a leaf column: its physical type plus the level
/// information derived from its nesting path.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescriptor {
  physical_type: Type,
  logical_type: LogicalType,
  type_length: i32,
  level_info: LevelInfo
}

/// Reference counted pointer for [`ColumnDescriptor`].
pub type ColumnDescPtr = Rc<ColumnDescriptor>;

impl ColumnDescriptor {
  pub fn new(physical_type: Type, max_def_level: i16, max_rep_level: i16) -> Self {
    ColumnDescriptor {
      physical_type: physical_type,
      logical_type: LogicalType::NONE,
      type_length: -1,
      level_info: LevelInfo::new(max_def_level, max_rep_level)
    }
  }

  pub fn with_logical_type(mut self, logical_type: LogicalType) -> Self {
    self.logical_type = logical_type;
    self
  }

  /// Sets the value width for `FIXED_LEN_BYTE_ARRAY` columns.
  pub fn with_type_length(mut self, type_length: i32) -> Self {
    self.type_length = type_length;
    self
  }

  pub fn with_repeated_ancestor_def_level(mut self, level: i16) -> Self {
    self.level_info = self.level_info.with_repeated_ancestor_def_level(level);
    self
  }

  pub fn physical_type(&self) -> Type {
    self.physical_type
  }

  pub fn logical_type(&self) -> LogicalType {
    self.logical_type
  }

  pub fn type_length(&self) -> i32 {
    self.type_length
  }

  pub fn max_def_level(&self) -> i16 {
    self.level_info.def_level
  }

  pub fn max_rep_level(&self) -> i16 {
    self.level_info.rep_level
  }

  pub fn level_info(&self) -> &LevelInfo {
    &self.level_info
  }

  pub fn has_nullable_values(&self) -> bool {
    self.level_info.has_nullable_values()
  }
}
