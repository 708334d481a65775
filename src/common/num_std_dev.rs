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

/// Confidence level for [`binomial_bounds`](super::binomial_bounds), expressed
/// as a count of standard deviations around the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumStdDev {
    /// ~68.3% confidence interval.
    One,
    /// ~95.4% confidence interval.
    Two,
    /// ~99.7% confidence interval.
    Three,
}

impl NumStdDev {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            NumStdDev::One => 1.0,
            NumStdDev::Two => 2.0,
            NumStdDev::Three => 3.0,
        }
    }
}

impl TryFrom<u8> for NumStdDev {
    type Error = crate::error::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NumStdDev::One),
            2 => Ok(NumStdDev::Two),
            3 => Ok(NumStdDev::Three),
            other => Err(crate::error::Error::out_of_range(
                "num_std_dev",
                other,
                "[1, 3]",
            )),
        }
    }
}
