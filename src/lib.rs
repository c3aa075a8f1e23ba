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

//! Logrelay is an asynchronous file logger with size-based rotation.
//!
//! # Overview
//!
//! Each named logger owns a bounded queue and one background thread. Producers only format the
//! record envelope and enqueue it; the background thread renders lines in submission order and
//! appends them to `<base>.log`. Once the file has grown past the rotation threshold, it is
//! renamed to `<base>-<MM-DD-YYYY_HH-MM-SS>.log` and a fresh file is opened. When the file cannot
//! be opened or renamed, lines go to standard error until a later retry succeeds.
//!
//! Loggers are kept in a [`Registry`] by name. [`stop_all`] stops every logger and waits for the
//! queued records to be written.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use logrelay::LoggerBuilder;
//! use logrelay::Verbosity;
//!
//! let logger = LoggerBuilder::new("app", "/var/log/app/app")
//!     .verbosity(Verbosity::DEFAULT | Verbosity::FILE)
//!     .register()
//!     .unwrap();
//!
//! logger.info("This is an info message.");
//! logger.errorf("failed to connect to {}", logrelay::args!["db:5432"]);
//!
//! // elsewhere
//! let logger = logrelay::get("app").unwrap();
//! logger.with_prefix("worker").debug("not logged at the default level");
//!
//! logrelay::stop_all(Duration::from_secs(5)).unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::time::Duration;

pub mod record;

mod bridge;
mod error;
mod layout;
mod logger;
mod manager;
mod registry;
mod rolling;
mod trap;
mod verbosity;

pub use error::Backlog;
pub use error::Error;
pub use error::StopError;
pub use layout::TextLayout;
pub use logger::DEFAULT_FALLBACK_THRESHOLD;
pub use logger::DEFAULT_QUEUE_SIZE;
pub use logger::DEFAULT_ROTATE_THRESHOLD;
pub use logger::Logger;
pub use logger::LoggerBuilder;
pub use record::Level;
pub use record::Location;
pub use record::Payload;
pub use record::Record;
pub use registry::Registry;
pub use rolling::DefaultHeaderFooter;
pub use rolling::HeaderFooter;
pub use trap::DefaultTrap;
pub use trap::Trap;
pub use verbosity::Verbosity;

/// Look up a logger in the process-wide registry.
pub fn get(name: &str) -> Option<Logger> {
    Registry::global().get(name)
}

/// Enqueue a prebuilt record on the named logger of the process-wide registry.
pub fn submit(name: &str, record: Record) -> Result<(), Error> {
    match get(name) {
        Some(logger) => logger.submit(record),
        None => Err(Error::new("logger is not registered").with_context("logger", name)),
    }
}

/// Stop every logger of the process-wide registry, waiting up to `timeout` for queued records to
/// be written. See [`Registry::stop_all`].
pub fn stop_all(timeout: Duration) -> Result<(), StopError> {
    Registry::global().stop_all(timeout)
}
