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

//! Dremel-style record assembly for columnar data.
//!
//! This crate turns streams of encoded column pages, carrying definition and
//! repetition levels, into typed dense columnar arrays with validity bitmaps,
//! grouped into logical records. The main entry point is
//! [`record::reader::get_record_reader`]. A row-oriented text ingester that
//! produces the same columnar batches lives in [`ingest`].

extern crate byteorder;
extern crate chrono;
extern crate csv;
#[macro_use]
extern crate quick_error;
extern crate rand;

#[macro_use]
pub mod errors;
pub mod basic;
pub mod data_type;
pub mod schema;
pub mod util;
pub mod array;
pub mod column;
pub mod encodings;
pub mod record;
pub mod ingest;
