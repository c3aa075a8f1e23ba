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

//! Per-logger queue and background worker.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread::JoinHandle;

use jiff::tz::TimeZone;

use crate::Error;
use crate::HeaderFooter;
use crate::Trap;
use crate::layout::TextLayout;
use crate::record::Record;
use crate::rolling::RollingFile;
use crate::rolling::RotationPolicy;

mod queue;
mod worker;

use self::queue::Producer;
use self::worker::Worker;

/// Everything a manager needs to start its worker.
pub(crate) struct ManagerConfig {
    pub(crate) file_base: PathBuf,
    pub(crate) queue_size: usize,
    pub(crate) policy: RotationPolicy,
    pub(crate) header_footer: Option<Arc<dyn HeaderFooter>>,
    pub(crate) utc: bool,
    pub(crate) fallback: Box<dyn Write + Send>,
    pub(crate) trap: Arc<dyn Trap>,
    pub(crate) thread_name: String,
}

/// Owns the bounded queue of one named logger and the thread that drains it.
///
/// Producers block while the queue is full. Once stopped, the manager rejects new records; the
/// worker keeps going until every queued record is written and then closes the log file.
pub(crate) struct LogManager {
    name: String,
    producer: Producer,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for LogManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogManager")
            .field("name", &self.name)
            .field("backlog", &self.backlog())
            .field("stopped", &self.producer.is_closed())
            .finish()
    }
}

impl LogManager {
    /// Spawn the worker thread and return the running manager.
    pub(crate) fn start(name: String, config: ManagerConfig) -> Result<Self, Error> {
        let ManagerConfig {
            file_base,
            queue_size,
            policy,
            header_footer,
            utc,
            fallback,
            trap,
            thread_name,
        } = config;

        let tz = if utc {
            TimeZone::UTC
        } else {
            TimeZone::system()
        };
        let sink = RollingFile::new(file_base, policy, header_footer, tz.clone(), fallback, trap);
        let layout = TextLayout::default().with_time_zone(tz);

        let (producer, consumer) = queue::queue(queue_size);
        let worker = Worker::new(consumer, layout, sink);
        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::new("failed to spawn log worker thread")
                    .with_context("logger", &name)
                    .with_source(err)
            })?;

        Ok(Self {
            name,
            producer,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a record, blocking while the queue is full.
    pub(crate) fn submit(&self, record: Record) -> Result<(), Error> {
        self.producer
            .push(record)
            .map_err(|err| err.with_context("logger", &self.name))
    }

    /// Records accepted but not yet written.
    pub(crate) fn backlog(&self) -> usize {
        self.producer.backlog()
    }

    /// Stop accepting records. The worker drains what is queued and then exits.
    pub(crate) fn stop(&self) {
        self.producer.close();
    }

    /// Whether the worker has written every record and closed the log file.
    pub(crate) fn is_finished(&self) -> bool {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Reap a finished worker thread.
    pub(crate) fn join(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for LogManager {
    fn drop(&mut self) {
        self.producer.close();
    }
}
