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

//! Normal-approximation confidence bounds for a theta-sketch cardinality
//! estimate, treating retained count as a binomial count over `theta` trials.

use crate::common::NumStdDev;
use crate::error::Error;

/// Approximate lower confidence bound on the true cardinality, given
/// `num_retained` hashes kept under sampling probability `theta`.
pub fn lower_bound(num_retained: u64, theta: f64, num_std_dev: NumStdDev) -> Result<f64, Error> {
    if !(0.0..=1.0).contains(&theta) || theta == 0.0 {
        return Err(Error::out_of_range("theta", theta, "(0, 1]"));
    }
    if theta >= 1.0 {
        return Ok(num_retained as f64);
    }

    let n = num_retained as f64;
    let estimate = n / theta;
    let variance = n * (1.0 - theta) / (theta * theta);
    let bound = estimate - num_std_dev.as_f64() * variance.sqrt();
    Ok(bound.max(0.0))
}

/// Approximate upper confidence bound on the true cardinality.
///
/// Empty sketches always bound to `0.0`, matching the Theta sketch failure
/// model: an estimate of zero carries no uncertainty worth reporting.
pub fn upper_bound(
    num_retained: u64,
    theta: f64,
    num_std_dev: NumStdDev,
    is_empty: bool,
) -> Result<f64, Error> {
    if is_empty {
        return Ok(0.0);
    }
    if !(0.0..=1.0).contains(&theta) || theta == 0.0 {
        return Err(Error::out_of_range("theta", theta, "(0, 1]"));
    }
    if theta >= 1.0 {
        return Ok(num_retained as f64);
    }

    let n = num_retained as f64;
    let estimate = n / theta;
    let variance = n * (1.0 - theta) / (theta * theta);
    Ok(estimate + num_std_dev.as_f64() * variance.sqrt())
}
