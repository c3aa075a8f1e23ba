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

//! Log record and its parts.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jiff::Timestamp;

use crate::verbosity::Verbosity;

/// A single argument of a templated payload.
pub type Arg = Box<dyn fmt::Display + Send>;

/// Build a `Vec<Arg>` from a list of displayable values.
///
/// # Examples
///
/// ```
/// let args = logrelay::args![42, "answer"];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(Box::new($arg) as $crate::record::Arg),*]
    };
}

/// The user payload of a record.
///
/// Rendering happens on the background worker, so every part is owned and `Send`.
pub enum Payload {
    /// A single value rendered with its `Display` implementation.
    Value(Box<dyn fmt::Display + Send>),
    /// A template with `{}` placeholders and the values that fill them.
    Format {
        template: Cow<'static, str>,
        args: Vec<Arg>,
    },
}

impl Payload {
    /// A payload rendering a single value.
    pub fn value(value: impl fmt::Display + Send + 'static) -> Self {
        Payload::Value(Box::new(value))
    }

    /// A payload substituting `args` into `template`.
    pub fn format(template: impl Into<Cow<'static, str>>, args: Vec<Arg>) -> Self {
        Payload::Format {
            template: template.into(),
            args,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(value) => f.debug_tuple("Value").field(&value.to_string()).finish(),
            Payload::Format { template, args } => f
                .debug_struct("Format")
                .field("template", template)
                .field("args", &args.iter().map(|a| a.to_string()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// The source location a record was emitted from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    file: Cow<'static, str>,
    line: u32,
}

impl Location {
    /// Create a location from a file path and a line number.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self::new(location.file(), location.line())
    }

    /// The full path as it was captured.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The file name without any leading directories.
    pub fn short_file(&self) -> &str {
        match self.file.rfind(['/', '\\']) {
            Some(idx) => &self.file[idx + 1..],
            None => &self.file,
        }
    }

    /// The line number.
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// One log event awaiting formatting and write.
///
/// A record is immutable once built. It is owned by the queue after submission and dropped by the
/// worker once written.
#[derive(Debug)]
pub struct Record {
    timestamp: Timestamp,
    level: Level,
    verbosity: Verbosity,
    location: Option<Location>,
    prefix: Option<Arc<str>>,
    payload: Payload,
}

impl Record {
    /// Create a [`RecordBuilder`] for the given payload.
    pub fn builder(payload: Payload) -> RecordBuilder {
        RecordBuilder::new(payload)
    }

    /// The capture time.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The severity of the record.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The fields requested for the formatted line.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// The call site, if captured.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The tag of the emitting logger, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The message payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    fn new(payload: Payload) -> Self {
        RecordBuilder {
            record: Record {
                timestamp: Timestamp::now(),
                level: Level::Info,
                verbosity: Verbosity::DEFAULT,
                location: None,
                prefix: None,
                payload,
            },
        }
    }

    /// Set [`timestamp`](Record::timestamp).
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`verbosity`](Record::verbosity).
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.record.verbosity = verbosity;
        self
    }

    /// Set [`location`](Record::location).
    pub fn location(mut self, location: Option<Location>) -> Self {
        self.record.location = location;
        self
    }

    /// Set [`prefix`](Record::prefix).
    pub fn prefix(mut self, prefix: Option<Arc<str>>) -> Self {
        self.record.prefix = prefix;
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}

/// The severity of a record.
///
/// Lower values are more severe. A logger configured at level `L` records a message at level `M`
/// only when `M <= L`.
#[repr(usize)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Level {
    /// Designates very serious errors.
    Error = 0,
    /// Designates hazardous situations.
    Warning = 1,
    /// Designates useful information.
    Info = 2,
    /// Designates lower priority information.
    Debug = 3,
}

impl Level {
    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

impl From<Level> for log::LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => log::LevelFilter::Error,
            Level::Warning => log::LevelFilter::Warn,
            Level::Info => log::LevelFilter::Info,
            Level::Debug => log::LevelFilter::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The type returned by `from_str` when the string doesn't match any of the log levels.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "malformed log level: {:?}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("error", Level::Error),
            ("warning", Level::Warning),
            ("warn", Level::Warning),
            ("info", Level::Info),
            ("debug", Level::Debug),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(ParseLevelError {
            input: s.to_string(),
        })
    }
}
