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

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use jiff::Zoned;

const ARCHIVE_DATE_FORMAT: &str = "%m-%d-%Y_%H-%M-%S";

/// Size-based rotation thresholds.
///
/// The effective threshold moves between three values:
///
/// - the configured base threshold while writing to a file;
/// - the base threshold widened by `base / 20` per archive name collision, up to a cap;
/// - the fallback threshold while writing to the error stream, so that recovery is retried often.
#[derive(Debug, Clone)]
pub(crate) struct RotationPolicy {
    base: usize,
    threshold: usize,
    step: usize,
    cap: usize,
    fallback: usize,
}

impl RotationPolicy {
    pub(crate) fn new(base: usize, cap: usize, fallback: usize) -> Self {
        Self {
            base,
            threshold: base,
            step: (base / 20).max(1),
            cap,
            fallback,
        }
    }

    pub(crate) fn threshold(&self) -> usize {
        self.threshold
    }

    pub(crate) fn should_rotate(&self, written: usize) -> bool {
        written >= self.threshold
    }

    /// Widen the threshold after an archive name collision.
    pub(crate) fn back_off(&mut self) {
        let widened = self.threshold.saturating_add(self.step);
        self.threshold = widened.min(self.cap.max(self.threshold));
    }

    /// Return to the configured threshold after a fresh file was opened.
    pub(crate) fn restore(&mut self) {
        self.threshold = self.base;
    }

    /// Retry recovery once `fallback` more bytes went to the error stream.
    pub(crate) fn degrade(&mut self, written: usize) {
        self.threshold = written.saturating_add(self.fallback);
    }
}

/// `<base>.log`
pub(crate) fn active_path(base: &Path) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".log");
    PathBuf::from(name)
}

/// `<base>-<MM-DD-YYYY_HH-MM-SS>.log`
pub(crate) fn archive_path(base: &Path, now: &Zoned) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push("-");
    name.push(now.strftime(ARCHIVE_DATE_FORMAT).to_string());
    name.push(".log");
    PathBuf::from(name)
}
