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

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::Trap;
use crate::manager::LogManager;
use crate::record::Arg;
use crate::record::Level;
use crate::record::Location;
use crate::record::Payload;
use crate::record::Record;
use crate::verbosity::Verbosity;

mod builder;
pub use builder::DEFAULT_FALLBACK_THRESHOLD;
pub use builder::DEFAULT_QUEUE_SIZE;
pub use builder::DEFAULT_ROTATE_THRESHOLD;
pub use builder::LoggerBuilder;

/// A handle to a named logger.
///
/// Handles are cheap to clone and share one queue and one log file. Every method only enqueues the
/// record; formatting and file I/O happen on the logger's background worker, in submission order.
///
/// Records above the configured [`Level`] are discarded before they are queued. Once the logger
/// is stopped, records are rejected and reported to its [`Trap`].
///
/// # Examples
///
/// ```no_run
/// use logrelay::LoggerBuilder;
///
/// let logger = LoggerBuilder::new("app", "/var/log/app/app").register().unwrap();
/// logger.info("service started");
/// logger.warningf("{} retries left", logrelay::args![3]);
///
/// let db = logger.with_prefix("db");
/// db.error("connection lost");
/// ```
#[derive(Clone)]
pub struct Logger {
    manager: Arc<LogManager>,
    level: Level,
    verbosity: Verbosity,
    prefix: Option<Arc<str>>,
    trap: Arc<dyn Trap>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.manager.name())
            .field("level", &self.level)
            .field("verbosity", &self.verbosity)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(
        manager: Arc<LogManager>,
        level: Level,
        verbosity: Verbosity,
        prefix: Option<Arc<str>>,
        trap: Arc<dyn Trap>,
    ) -> Self {
        Self {
            manager,
            level,
            verbosity,
            prefix,
            trap,
        }
    }

    pub(crate) fn manager(&self) -> &Arc<LogManager> {
        &self.manager
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        self.manager.name()
    }

    /// The most verbose level that is still logged.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The fields rendered on each line.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// The tag written as `[prefix]`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Whether records at `level` pass the level filter.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// A handle to the same logger that tags every line with `[prefix]`.
    ///
    /// An empty prefix removes the tag.
    pub fn with_prefix(&self, prefix: impl Into<Arc<str>>) -> Logger {
        let prefix = prefix.into();
        Logger {
            prefix: (!prefix.is_empty()).then_some(prefix),
            ..self.clone()
        }
    }

    /// Records submitted but not yet written.
    pub fn backlog(&self) -> usize {
        self.manager.backlog()
    }

    /// Enqueue a prebuilt record as is, bypassing the level filter.
    ///
    /// Blocks while the queue is full. Fails once the logger has been stopped.
    pub fn submit(&self, record: Record) -> Result<(), Error> {
        self.manager.submit(record)
    }

    /// Log `payload` at `level`, stamped with this handle's verbosity and prefix.
    #[track_caller]
    pub fn log(&self, level: Level, payload: Payload) {
        if !self.enabled(level) {
            return;
        }
        // not through a closure, which would report its own location
        let location = if self.verbosity.contains(Verbosity::FILE) {
            Some(Location::caller())
        } else {
            None
        };
        self.emit(level, payload, location);
    }

    pub(crate) fn emit(&self, level: Level, payload: Payload, location: Option<Location>) {
        let record = Record::builder(payload)
            .level(level)
            .verbosity(self.verbosity)
            .location(location)
            .prefix(self.prefix.clone())
            .build();
        if let Err(err) = self.submit(record) {
            self.trap.trap(&err);
        }
    }

    /// Log `value` at [`Level::Error`].
    #[track_caller]
    pub fn error(&self, value: impl fmt::Display + Send + 'static) {
        self.log(Level::Error, Payload::value(value));
    }

    /// Log `value` at [`Level::Warning`].
    #[track_caller]
    pub fn warning(&self, value: impl fmt::Display + Send + 'static) {
        self.log(Level::Warning, Payload::value(value));
    }

    /// Log `value` at [`Level::Info`].
    #[track_caller]
    pub fn info(&self, value: impl fmt::Display + Send + 'static) {
        self.log(Level::Info, Payload::value(value));
    }

    /// Log `value` at [`Level::Debug`].
    #[track_caller]
    pub fn debug(&self, value: impl fmt::Display + Send + 'static) {
        self.log(Level::Debug, Payload::value(value));
    }

    /// Log a `{}` template at [`Level::Error`]. See [`args!`](crate::args).
    #[track_caller]
    pub fn errorf(&self, template: impl Into<Cow<'static, str>>, args: Vec<Arg>) {
        self.log(Level::Error, Payload::format(template, args));
    }

    /// Log a `{}` template at [`Level::Warning`].
    #[track_caller]
    pub fn warningf(&self, template: impl Into<Cow<'static, str>>, args: Vec<Arg>) {
        self.log(Level::Warning, Payload::format(template, args));
    }

    /// Log a `{}` template at [`Level::Info`].
    #[track_caller]
    pub fn infof(&self, template: impl Into<Cow<'static, str>>, args: Vec<Arg>) {
        self.log(Level::Info, Payload::format(template, args));
    }

    /// Log a `{}` template at [`Level::Debug`].
    #[track_caller]
    pub fn debugf(&self, template: impl Into<Cow<'static, str>>, args: Vec<Arg>) {
        self.log(Level::Debug, Payload::format(template, args));
    }
}
