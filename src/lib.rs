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

//! Mergeable streaming sketches: approximate quantiles and distinct-count
//! cardinality estimation.
//!
//! This crate provides two independent sketch families that share a common
//! binary preamble shape and memory abstraction:
//!
//! - [`quantiles`]: the Doubles sketch, for approximate rank, quantile,
//!   CDF, and PMF queries over a stream of 64-bit floats.
//! - [`theta`]: the Theta sketch, for approximate distinct-count
//!   estimation, along with `Union`, `Intersection`, and `AnotB` set
//!   operations over sketches built under a shared hash seed.
//!
//! # Usage
//!
//! ```rust
//! use sketchcore::quantiles::DoublesSketch;
//!
//! let mut sketch = DoublesSketch::builder().k(128).build();
//! for v in 0..1000 {
//!     sketch.update(v as f64).unwrap();
//! }
//! let median = sketch.quantile(0.5).unwrap();
//! assert!((median - 500.0).abs() < 50.0);
//! ```
//!
//! ```rust
//! use sketchcore::theta::ThetaSketch;
//!
//! let mut sketch = ThetaSketch::builder().build();
//! for i in 0..1000 {
//!     sketch.update(i);
//! }
//! let estimate = sketch.estimate();
//! assert!((estimate - 1000.0).abs() / 1000.0 < 0.1);
//! ```

pub(crate) mod codec;
pub mod common;
pub mod error;
pub mod family;
pub(crate) mod hash;
pub mod memory;
pub mod quantiles;
pub mod theta;

pub use error::Error;
pub use error::ErrorKind;
