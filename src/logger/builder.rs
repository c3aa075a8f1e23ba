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
use std::path::PathBuf;
use std::sync::Arc;

use crate::DefaultHeaderFooter;
use crate::DefaultTrap;
use crate::Error;
use crate::HeaderFooter;
use crate::Logger;
use crate::Registry;
use crate::Trap;
use crate::manager::ManagerConfig;
use crate::record::Level;
use crate::rolling::RotationPolicy;
use crate::verbosity::Verbosity;

/// 16 MiB.
pub const DEFAULT_ROTATE_THRESHOLD: usize = 2 << 23;

/// Records a logger can hold before producers block.
pub const DEFAULT_QUEUE_SIZE: usize = 50_000;

/// Bytes written to the error stream before opening the log file is retried. 500 KiB.
pub const DEFAULT_FALLBACK_THRESHOLD: usize = 500 * 1024;

/// A builder to configure and register a [`Logger`].
///
/// Log lines go to `<file_base>.log`. Archived files are named
/// `<file_base>-<MM-DD-YYYY_HH-MM-SS>.log`. The parent directory must exist.
///
/// ## Examples
///
/// ```no_run
/// use logrelay::Level;
/// use logrelay::LoggerBuilder;
/// use logrelay::Verbosity;
///
/// let logger = LoggerBuilder::new("app", "/var/log/app/app")
///     .rotate_threshold(64 * 1024 * 1024)
///     .level(Level::Debug)
///     .verbosity(Verbosity::DEFAULT | Verbosity::MICROSECONDS | Verbosity::FILE)
///     .prefix("main")
///     .register()
///     .unwrap();
/// logger.debug("configured");
/// ```
#[must_use = "call `register` to start the logger"]
pub struct LoggerBuilder {
    name: String,
    file_base: PathBuf,
    rotate_threshold: usize,
    queue_size: usize,
    level: Level,
    verbosity: Verbosity,
    prefix: Option<Arc<str>>,
    header_footer: Arc<dyn HeaderFooter>,
    fallback_threshold: usize,
    collision_cap: Option<usize>,
    fallback: Option<Box<dyn Write + Send>>,
    trap: Arc<dyn Trap>,
    thread_name: Option<String>,
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("name", &self.name)
            .field("file_base", &self.file_base)
            .field("rotate_threshold", &self.rotate_threshold)
            .field("queue_size", &self.queue_size)
            .field("level", &self.level)
            .field("verbosity", &self.verbosity)
            .field("prefix", &self.prefix)
            .field("header_footer", &self.header_footer)
            .field("fallback_threshold", &self.fallback_threshold)
            .field("collision_cap", &self.collision_cap)
            .field("trap", &self.trap)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder {
    /// Create a new builder for the logger `name` writing to `<file_base>.log`.
    pub fn new(name: impl Into<String>, file_base: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file_base: file_base.into(),
            rotate_threshold: DEFAULT_ROTATE_THRESHOLD,
            queue_size: DEFAULT_QUEUE_SIZE,
            level: Level::Info,
            verbosity: Verbosity::DEFAULT,
            prefix: None,
            header_footer: Arc::new(DefaultHeaderFooter::default()),
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            collision_cap: None,
            fallback: None,
            trap: Arc::new(DefaultTrap::default()),
            thread_name: None,
        }
    }

    /// Set the number of bytes after which the log file is rotated.
    ///
    /// Default to 16 MiB.
    pub fn rotate_threshold(mut self, bytes: usize) -> Self {
        self.rotate_threshold = bytes;
        self
    }

    /// Set the capacity of the record queue. Zero means the default of 50000.
    pub fn queue_size(mut self, records: usize) -> Self {
        self.queue_size = if records == 0 {
            DEFAULT_QUEUE_SIZE
        } else {
            records
        };
        self
    }

    /// Set the most verbose level that is logged.
    ///
    /// Default to [`Level::Info`].
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the level from its name, e.g. `"warning"`.
    pub fn level_str(mut self, level: &str) -> Result<Self, Error> {
        self.level = level.parse()?;
        Ok(self)
    }

    /// Set the fields rendered on each line and whether headers and footers are written.
    ///
    /// Default to [`Verbosity::DEFAULT`].
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Tag every line with `[prefix]`.
    pub fn prefix(mut self, prefix: impl Into<Arc<str>>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Set the header and footer written when [`Verbosity::HEADER_FOOTER`] is set.
    pub fn header_footer(mut self, header_footer: impl Into<Box<dyn HeaderFooter>>) -> Self {
        self.header_footer = Arc::from(header_footer.into());
        self
    }

    /// Set how many bytes go to the error stream before opening the log file is retried.
    ///
    /// Default to 500 KiB.
    pub fn fallback_threshold(mut self, bytes: usize) -> Self {
        self.fallback_threshold = bytes;
        self
    }

    /// Bound how far the rotation threshold widens while archive names collide.
    ///
    /// Default to twice the rotation threshold.
    pub fn collision_cap(mut self, bytes: usize) -> Self {
        self.collision_cap = Some(bytes);
        self
    }

    /// Let the rotation threshold widen without bound while archive names collide.
    pub fn unbounded_collision_back_off(mut self) -> Self {
        self.collision_cap = Some(usize::MAX);
        self
    }

    /// Replace the error stream that takes over when the log file is unusable.
    ///
    /// Default to standard error.
    pub fn fallback(mut self, writer: impl Write + Send + 'static) -> Self {
        self.fallback = Some(Box::new(writer));
        self
    }

    /// Set the trap that receives errors raised by the background worker.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    /// Set the name of the background worker thread.
    ///
    /// Default to `logrelay-<name>`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Start the logger and add it to the process-wide [`Registry`].
    pub fn register(self) -> Result<Logger, Error> {
        self.register_in(Registry::global())
    }

    /// Start the logger and add it to `registry`.
    ///
    /// Fails if the name is taken or the configuration is invalid. On success, a leftover
    /// `<file_base>.log` is archived before the first line is written.
    pub fn register_in(self, registry: &Registry) -> Result<Logger, Error> {
        let Self {
            name,
            file_base,
            rotate_threshold,
            queue_size,
            level,
            verbosity,
            prefix,
            header_footer,
            fallback_threshold,
            collision_cap,
            fallback,
            trap,
            thread_name,
        } = self;

        if file_base.as_os_str().is_empty() {
            return Err(Error::new("log file base must not be empty").with_context("logger", name));
        }
        if rotate_threshold == 0 {
            return Err(
                Error::new("rotation threshold must be positive").with_context("logger", name)
            );
        }
        let thread_name = thread_name.unwrap_or_else(|| format!("logrelay-{name}"));
        if thread_name.contains('\0') {
            return Err(Error::new("thread name must not contain NUL bytes")
                .with_context("logger", name));
        }

        let cap = collision_cap.unwrap_or_else(|| rotate_threshold.saturating_mul(2));
        let config = ManagerConfig {
            file_base,
            queue_size,
            policy: RotationPolicy::new(rotate_threshold, cap, fallback_threshold),
            header_footer: verbosity
                .contains(Verbosity::HEADER_FOOTER)
                .then_some(header_footer),
            utc: verbosity.contains(Verbosity::UTC),
            fallback: fallback.unwrap_or_else(|| Box::new(io::stderr())),
            trap: trap.clone(),
            thread_name,
        };

        registry.register(name, config, |manager| {
            Logger::new(manager, level, verbosity, prefix, trap)
        })
    }
}
