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

//! Bridge from the [`log`] crate.

use std::borrow::Cow;

use crate::Logger;
use crate::record::Level;
use crate::record::Location;
use crate::record::Payload;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::enabled(self, Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        if !Logger::enabled(self, level) {
            return;
        }

        // the arguments borrow from the caller's stack frame
        let payload = match record.args().as_str() {
            Some(message) => Payload::value(message),
            None => Payload::value(record.args().to_string()),
        };

        let file = match (record.file_static(), record.file()) {
            (Some(file), _) => Some(Cow::Borrowed(file)),
            (None, Some(file)) => Some(Cow::Owned(file.to_string())),
            (None, None) => None,
        };
        let location = file.map(|file| Location::new(file, record.line().unwrap_or(0)));

        self.emit(level, payload, location);
    }

    /// Records are flushed by the background worker whenever its queue runs empty.
    fn flush(&self) {}
}

impl Logger {
    /// Install this logger as the global [`log`] logger.
    ///
    /// The global maximum level is set from this logger's level.
    ///
    /// # Errors
    ///
    /// Return an error if the log crate global logger has already been set.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use logrelay::LoggerBuilder;
    ///
    /// let logger = LoggerBuilder::new("app", "/var/log/app/app").register().unwrap();
    /// logger.apply().unwrap();
    ///
    /// log::info!("routed to /var/log/app/app.log");
    /// ```
    pub fn apply(self) -> Result<(), log::SetLoggerError> {
        let max_level = log::LevelFilter::from(self.level());
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}
