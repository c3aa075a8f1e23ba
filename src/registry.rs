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

//! Name to logger mapping and coordinated shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use crate::Error;
use crate::Logger;
use crate::StopError;
use crate::error::Backlog;
use crate::manager::LogManager;
use crate::manager::ManagerConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// A set of named loggers, each with its own queue and worker.
///
/// Most programs use the process-wide [`Registry::global`]. Separate registries are useful to
/// isolate groups of loggers, e.g. in tests.
///
/// Loggers live until they are removed with [`Registry::unregister`] or [`Registry::stop_all`].
#[derive(Debug, Default)]
pub struct Registry {
    loggers: Mutex<HashMap<String, Logger>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    fn loggers(&self) -> MutexGuard<'_, HashMap<String, Logger>> {
        self.loggers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a manager for `name` and register the facade built around it.
    ///
    /// Fails without side effects if the name is taken; in particular the log file is left alone.
    pub(crate) fn register(
        &self,
        name: String,
        config: ManagerConfig,
        make_logger: impl FnOnce(Arc<LogManager>) -> Logger,
    ) -> Result<Logger, Error> {
        let mut loggers = self.loggers();
        if loggers.contains_key(&name) {
            return Err(Error::new("logger is already registered").with_context("logger", name));
        }

        let manager = LogManager::start(name.clone(), config)?;
        let logger = make_logger(Arc::new(manager));
        loggers.insert(name, logger.clone());
        Ok(logger)
    }

    /// Look up a logger by name.
    pub fn get(&self, name: &str) -> Option<Logger> {
        self.loggers().get(name).cloned()
    }

    /// Names of all registered loggers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.loggers().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Stop one logger and wait up to `timeout` for its queue to drain.
    ///
    /// Returns `Ok(false)` if no logger has this name. Once removed, the name can be registered
    /// again even if draining timed out.
    pub fn unregister(&self, name: &str, timeout: Duration) -> Result<bool, StopError> {
        let Some(logger) = self.loggers().remove(name) else {
            return Ok(false);
        };
        let manager = logger.manager().clone();
        manager.stop();
        wait_drained(&[manager], timeout).map(|()| true)
    }

    /// Stop every registered logger and wait up to `timeout` for all queues to drain.
    ///
    /// All loggers are removed from the registry and reject new records from the moment this is
    /// called. Records already queued keep being written in the background even after a timeout;
    /// the returned error lists how many were still pending per logger.
    pub fn stop_all(&self, timeout: Duration) -> Result<(), StopError> {
        let managers = self
            .loggers()
            .drain()
            .map(|(_, logger)| logger.manager().clone())
            .collect::<Vec<_>>();

        for manager in &managers {
            manager.stop();
        }
        wait_drained(&managers, timeout)
    }
}

fn wait_drained(managers: &[Arc<LogManager>], timeout: Duration) -> Result<(), StopError> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        let drained = managers
            .iter()
            .all(|manager| manager.backlog() == 0 && manager.is_finished());
        if drained {
            for manager in managers {
                manager.join();
            }
            return Ok(());
        }

        let now = Instant::now();
        let remaining = match deadline {
            Some(deadline) if now >= deadline => {
                let backlog = managers
                    .iter()
                    .filter(|manager| !manager.is_finished())
                    .map(|manager| Backlog {
                        name: manager.name().to_string(),
                        records: manager.backlog(),
                    })
                    .collect();
                return Err(StopError::new(timeout, backlog));
            }
            Some(deadline) => deadline - now,
            None => POLL_INTERVAL,
        };
        std::thread::sleep(POLL_INTERVAL.min(remaining));
    }
}
