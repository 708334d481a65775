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

//! Small utilities shared by every sketch family.

pub mod binomial_bounds;
mod canonical;
mod num_std_dev;
mod random;
mod resize_factor;

pub use canonical::canonical_double;
pub use num_std_dev::NumStdDev;
pub use random::RandomSource;
pub use random::XorShift64;
pub use resize_factor::ResizeFactor;
