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

//! Formatting of records into lines.

use std::fmt::Write;

use jiff::tz::TimeZone;

use crate::record::Arg;
use crate::record::Payload;
use crate::record::Record;
use crate::verbosity::Verbosity;

/// A layout that formats a record as one line of text.
///
/// Output format, every field but the message gated by a [`Verbosity`] flag:
///
/// ```text
/// 2024/08/11 22:44:57.172105 ERROR [main.rs:51] [db] Hello error!
/// 2024/08/11 22:44:57.172219 WARNING [main.rs:52] [db] Hello warning!
/// 2024/08/11 22:44:57.172276 INFO [main.rs:53] [db] Hello info!
/// ```
///
/// Date and time use the system time zone unless [`Verbosity::UTC`] is set.
#[derive(Debug, Clone)]
pub struct TextLayout {
    local: TimeZone,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            local: TimeZone::system(),
        }
    }
}

impl TextLayout {
    /// Use `tz` instead of the system time zone for non-UTC records.
    pub fn with_time_zone(mut self, tz: TimeZone) -> Self {
        self.local = tz;
        self
    }

    /// Format `record` into `buf`, replacing its content.
    ///
    /// The result always ends with exactly one trailing `\n` added by the layout, unless the message
    /// already ends with one.
    pub fn format(&self, record: &Record, buf: &mut String) {
        buf.clear();

        let verbosity = record.verbosity();
        if verbosity.intersects(Verbosity::DATE | Verbosity::TIME | Verbosity::MICROSECONDS) {
            let tz = if verbosity.contains(Verbosity::UTC) {
                TimeZone::UTC
            } else {
                self.local.clone()
            };
            let time = record.timestamp().to_zoned(tz);

            // SAFETY: write to a string always succeeds
            if verbosity.contains(Verbosity::DATE) {
                write!(
                    buf,
                    "{:04}/{:02}/{:02} ",
                    time.year(),
                    time.month(),
                    time.day()
                )
                .unwrap();
            }
            if verbosity.intersects(Verbosity::TIME | Verbosity::MICROSECONDS) {
                write!(
                    buf,
                    "{:02}:{:02}:{:02}",
                    time.hour(),
                    time.minute(),
                    time.second()
                )
                .unwrap();
                if verbosity.contains(Verbosity::MICROSECONDS) {
                    write!(buf, ".{:06}", time.subsec_nanosecond() / 1_000).unwrap();
                }
                buf.push(' ');
            }
        }

        if verbosity.contains(Verbosity::LEVEL) {
            buf.push_str(record.level().as_str());
            buf.push(' ');
        }

        if verbosity.contains(Verbosity::FILE) {
            match record.location() {
                Some(location) => {
                    let file = if verbosity.contains(Verbosity::FILE_LONG) {
                        location.file()
                    } else {
                        location.short_file()
                    };
                    write!(buf, "[{file}:{}] ", location.line()).unwrap();
                }
                None => buf.push_str("[???:0] "),
            }
        }

        if let Some(prefix) = record.prefix().filter(|p| !p.is_empty()) {
            write!(buf, "[{prefix}] ").unwrap();
        }

        match record.payload() {
            Payload::Value(value) => write!(buf, "{value}").unwrap(),
            Payload::Format { template, args } if args.is_empty() => buf.push_str(template),
            Payload::Format { template, args } => render_template(buf, template, args),
        }

        if !buf.ends_with('\n') {
            buf.push('\n');
        }
    }
}

/// Substitute `args` into the `{}` placeholders of `template`, in order.
///
/// `{{` and `}}` render literal braces. A placeholder with no argument left renders `{!missing}`;
/// arguments without a placeholder are appended as ` {!extra: a, b}`.
fn render_template(buf: &mut String, template: &str, args: &[Arg]) {
    let mut args = args.iter();
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        buf.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if tail.starts_with("{{") {
            buf.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            buf.push('}');
            rest = &tail[2..];
        } else if tail.starts_with("{}") {
            match args.next() {
                Some(arg) => write!(buf, "{arg}").unwrap(),
                None => buf.push_str("{!missing}"),
            }
            rest = &tail[2..];
        } else {
            // lone brace
            buf.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    buf.push_str(rest);

    let extra = args.map(|arg| arg.to_string()).collect::<Vec<_>>();
    if !extra.is_empty() {
        write!(buf, " {{!extra: {}}}", extra.join(", ")).unwrap();
    }
}
