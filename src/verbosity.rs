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
use std::ops::BitOr;
use std::ops::BitOrAssign;

/// A set of independent flags selecting the fields of a formatted line.
///
/// # Examples
///
/// ```
/// use logrelay::Verbosity;
///
/// let verbosity = Verbosity::DEFAULT | Verbosity::FILE;
/// assert!(verbosity.contains(Verbosity::LEVEL));
/// assert!(!verbosity.contains(Verbosity::UTC));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Verbosity(u32);

impl Verbosity {
    /// No optional fields; only the message is written.
    pub const NONE: Verbosity = Verbosity(0);
    /// The date as `YYYY/MM/DD`.
    pub const DATE: Verbosity = Verbosity(1 << 0);
    /// The time as `HH:MM:SS`.
    pub const TIME: Verbosity = Verbosity(1 << 1);
    /// Microsecond resolution for the time.
    pub const MICROSECONDS: Verbosity = Verbosity(1 << 2);
    /// Render date and time in UTC rather than the local time zone.
    pub const UTC: Verbosity = Verbosity(1 << 3);
    /// The file name and line of the call site.
    pub const FILE: Verbosity = Verbosity(1 << 4);
    /// Keep the full path of the call site. Only meaningful with [`Verbosity::FILE`].
    pub const FILE_LONG: Verbosity = Verbosity(1 << 5);
    /// The severity of the record.
    pub const LEVEL: Verbosity = Verbosity(1 << 6);
    /// Write a header when a log file is opened and a footer when it is closed.
    pub const HEADER_FOOTER: Verbosity = Verbosity(1 << 7);
    /// `DATE | TIME | LEVEL`.
    pub const DEFAULT: Verbosity = Verbosity(Self::DATE.0 | Self::TIME.0 | Self::LEVEL.0);

    /// Returns `true` if every flag of `other` is set in `self`.
    pub const fn contains(self, other: Verbosity) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any flag of `other` is set in `self`.
    pub const fn intersects(self, other: Verbosity) -> bool {
        self.0 & other.0 != 0
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for Verbosity {
    type Output = Verbosity;

    fn bitor(self, rhs: Verbosity) -> Verbosity {
        Verbosity(self.0 | rhs.0)
    }
}

impl BitOrAssign for Verbosity {
    fn bitor_assign(&mut self, rhs: Verbosity) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Verbosity, &str); 8] = [
            (Verbosity::DATE, "DATE"),
            (Verbosity::TIME, "TIME"),
            (Verbosity::MICROSECONDS, "MICROSECONDS"),
            (Verbosity::UTC, "UTC"),
            (Verbosity::FILE, "FILE"),
            (Verbosity::FILE_LONG, "FILE_LONG"),
            (Verbosity::LEVEL, "LEVEL"),
            (Verbosity::HEADER_FOOTER, "HEADER_FOOTER"),
        ];

        let names = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>();
        if names.is_empty() {
            write!(f, "Verbosity(NONE)")
        } else {
            write!(f, "Verbosity({})", names.join(" | "))
        }
    }
}
