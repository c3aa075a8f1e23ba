// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Size-based rolling of the log file with an error stream fallback.
//!
//! The active file is `<base>.log`. Once at least the rotation threshold has been written to it,
//! the next write first archives it as `<base>-<MM-DD-YYYY_HH-MM-SS>.log` and opens a fresh
//! `<base>.log`. An archive name that is already taken is never overwritten: the threshold is
//! widened instead and rotation is retried later. When the file cannot be created or archived,
//! records go to the error stream until a later retry succeeds.

pub use header::DefaultHeaderFooter;
pub use header::HeaderFooter;

pub(crate) use policy::RotationPolicy;
pub(crate) use sink::RollingFile;

mod clock;
mod header;
mod policy;
mod sink;
