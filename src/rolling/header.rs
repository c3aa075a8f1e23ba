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

use std::fmt;
use std::io;
use std::io::Write;

use jiff::Zoned;

/// Writes the first and last lines of every log file.
///
/// Only used when the logger is configured with
/// [`Verbosity::HEADER_FOOTER`](crate::Verbosity::HEADER_FOOTER), and never on the error stream
/// fallback.
pub trait HeaderFooter: fmt::Debug + Send + Sync + 'static {
    /// Called right after a log file is opened.
    fn header(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Called right before a log file is closed.
    fn footer(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl<T: HeaderFooter> From<T> for Box<dyn HeaderFooter> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Writes `#Start log at: <timestamp>` and `#Stop log at: <timestamp>`.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultHeaderFooter {}

impl HeaderFooter for DefaultHeaderFooter {
    fn header(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "#Start log at: {}", Zoned::now())
    }

    fn footer(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "#Stop log at: {}", Zoned::now())
    }
}
