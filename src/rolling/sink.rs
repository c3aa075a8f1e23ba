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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use jiff::Zoned;
use jiff::tz::TimeZone;

use crate::Error;
use crate::rolling::HeaderFooter;
use crate::rolling::clock::Clock;
use crate::rolling::policy::RotationPolicy;
use crate::rolling::policy::active_path;
use crate::rolling::policy::archive_path;
use crate::trap::Trap;

#[derive(Debug)]
enum Output {
    None,
    File(File),
    Fallback,
}

enum ArchiveError {
    Collision,
    Failed(Error),
}

/// The output side of a log manager: the active file, its byte counter and the rotation state.
///
/// Owned by exactly one worker thread.
pub(crate) struct RollingFile {
    base: PathBuf,
    active: PathBuf,
    output: Output,
    fallback: Box<dyn Write + Send>,
    written: usize,
    policy: RotationPolicy,
    header_footer: Option<Arc<dyn HeaderFooter>>,
    tz: TimeZone,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl RollingFile {
    pub(crate) fn new(
        base: impl Into<PathBuf>,
        policy: RotationPolicy,
        header_footer: Option<Arc<dyn HeaderFooter>>,
        tz: TimeZone,
        fallback: Box<dyn Write + Send>,
        trap: Arc<dyn Trap>,
    ) -> Self {
        let base = base.into();
        let active = active_path(&base);
        Self {
            base,
            active,
            output: Output::None,
            fallback,
            written: 0,
            policy,
            header_footer,
            tz,
            clock: Clock::DefaultClock,
            trap,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Open the active file, archiving a leftover one first.
    pub(crate) fn start(&mut self) {
        self.rotate();
    }

    /// Write one formatted line, rotating beforehand if the threshold is reached.
    ///
    /// Returns the number of bytes accepted by the outputs.
    pub(crate) fn write(&mut self, buf: &[u8]) -> usize {
        if matches!(self.output, Output::None) || self.policy.should_rotate(self.written) {
            self.rotate();
        }

        let (n, err) = match &mut self.output {
            Output::File(file) => write_counted(file, buf),
            Output::Fallback | Output::None => write_counted(&mut self.fallback, buf),
        };
        self.written += n;

        let Some(err) = err else {
            return n;
        };

        let to_file = matches!(self.output, Output::File(_));
        self.trap.trap(
            &Error::new("failed to write log record")
                .with_context("path", self.active.display())
                .with_source(err),
        );
        if !to_file {
            return n;
        }

        self.degrade();
        let (rest, err) = write_counted(&mut self.fallback, &buf[n..]);
        self.written += rest;
        if let Some(err) = err {
            self.trap
                .trap(&Error::new("failed to write log record to fallback").with_source(err));
        }
        n + rest
    }

    pub(crate) fn flush(&mut self) {
        let result = match &mut self.output {
            Output::File(file) => file.flush(),
            Output::Fallback => self.fallback.flush(),
            Output::None => Ok(()),
        };
        if let Err(err) = result {
            self.trap
                .trap(&Error::new("failed to flush log output").with_source(err));
        }
    }

    /// Close the current output, writing the footer if it is a file.
    pub(crate) fn close(&mut self) {
        match std::mem::replace(&mut self.output, Output::None) {
            Output::File(mut file) => {
                if let Some(header_footer) = &self.header_footer {
                    if let Err(err) = header_footer.footer(&mut file) {
                        self.trap.trap(
                            &Error::new("failed to write log footer")
                                .with_context("path", self.active.display())
                                .with_source(err),
                        );
                    }
                }
                if let Err(err) = file.flush() {
                    self.trap
                        .trap(&Error::new("failed to flush log file").with_source(err));
                }
            }
            Output::Fallback => {
                if let Err(err) = self.fallback.flush() {
                    self.trap
                        .trap(&Error::new("failed to flush log fallback").with_source(err));
                }
            }
            Output::None => {}
        }
    }

    fn rotate(&mut self) {
        let now = self.clock.now().to_zoned(self.tz.clone());
        match self.archive(&now) {
            Ok(()) => self.open_active(),
            Err(ArchiveError::Collision) if matches!(self.output, Output::File(_)) => {
                self.policy.back_off();
            }
            // nothing usable is open; append to the existing file rather than overwrite anything
            Err(ArchiveError::Collision) => self.open_active(),
            // keep appending to the active file; fall back only if it cannot be opened either
            Err(ArchiveError::Failed(err)) => {
                self.trap.trap(&err);
                self.open_active();
            }
        }
    }

    fn archive(&mut self, now: &Zoned) -> Result<(), ArchiveError> {
        let metadata = match fs::metadata(&self.active) {
            Ok(metadata) => metadata,
            // nothing to archive; a still open handle is replaced once the new file opens
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(ArchiveError::Failed(
                    Error::new("failed to inspect log file")
                        .with_context("path", self.active.display())
                        .with_source(err),
                ));
            }
        };

        if !metadata.is_file() {
            return Err(ArchiveError::Failed(
                Error::new("log file path is not a regular file")
                    .with_context("path", self.active.display()),
            ));
        }

        let archive = archive_path(&self.base, now);
        if fs::symlink_metadata(&archive).is_ok() {
            return Err(ArchiveError::Collision);
        }

        self.close();
        fs::rename(&self.active, &archive).map_err(|err| {
            ArchiveError::Failed(
                Error::new("failed to archive log file")
                    .with_context("from", self.active.display())
                    .with_context("to", archive.display())
                    .with_source(err),
            )
        })
    }

    fn open_active(&mut self) {
        let mut file = match OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.active)
        {
            Ok(file) => file,
            Err(err) => {
                self.trap.trap(
                    &Error::new("failed to create log file")
                        .with_context("path", self.active.display())
                        .with_source(err),
                );
                self.degrade();
                return;
            }
        };

        self.close();
        self.written = 0;
        self.policy.restore();

        if let Some(header_footer) = &self.header_footer {
            let mut header = Vec::new();
            match header_footer
                .header(&mut header)
                .and_then(|()| file.write_all(&header))
            {
                Ok(()) => self.written += header.len(),
                Err(err) => self.trap.trap(
                    &Error::new("failed to write log header")
                        .with_context("path", self.active.display())
                        .with_source(err),
                ),
            }
        }

        self.output = Output::File(file);
    }

    fn degrade(&mut self) {
        if matches!(self.output, Output::Fallback) {
            self.policy.degrade(self.written);
            return;
        }

        self.close();
        self.output = Output::Fallback;
        self.written = 0;
        self.policy.degrade(0);
    }
}

/// Like `write_all`, but reports how many bytes were accepted before an error.
fn write_counted(w: &mut dyn Write, buf: &[u8]) -> (usize, Option<io::Error>) {
    let mut n = 0;
    while n < buf.len() {
        match w.write(&buf[n..]) {
            Ok(0) => return (n, Some(io::ErrorKind::WriteZero.into())),
            Ok(k) => n += k,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return (n, Some(err)),
        }
    }
    (n, None)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::str::FromStr;
    use std::sync::Mutex;

    use jiff::Span;
    use jiff::Timestamp;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;
    use crate::rolling::clock::ManualClock;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CollectTrap(Mutex<Vec<String>>);

    impl Trap for CollectTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[derive(Debug)]
    struct Markers;

    impl HeaderFooter for Markers {
        fn header(&self, w: &mut dyn Write) -> io::Result<()> {
            w.write_all(b"H\n")
        }

        fn footer(&self, w: &mut dyn Write) -> io::Result<()> {
            w.write_all(b"F\n")
        }
    }

    struct Fixture {
        sink: RollingFile,
        fallback: SharedBuf,
        trap: Arc<CollectTrap>,
    }

    fn start_time() -> Timestamp {
        Timestamp::from_str("2024-08-10T00:00:00Z").unwrap()
    }

    fn fixture(
        base: &Path,
        policy: RotationPolicy,
        header_footer: Option<Arc<dyn HeaderFooter>>,
    ) -> Fixture {
        let fallback = SharedBuf::default();
        let trap = Arc::new(CollectTrap::default());
        let sink = RollingFile::new(
            base,
            policy,
            header_footer,
            TimeZone::UTC,
            Box::new(fallback.clone()),
            trap.clone(),
        )
        .with_clock(Clock::ManualClock(ManualClock::new(start_time())));
        Fixture {
            sink,
            fallback,
            trap,
        }
    }

    fn archives(dir: &Path) -> Vec<PathBuf> {
        let mut files = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.is_file() && path.file_name().unwrap() != "app.log")
            .collect::<Vec<_>>();
        files.sort();
        files
    }

    fn read(path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).unwrap()
    }

    fn generate_random_line() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(5..=15);
        let mut line: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect();
        line.push('\n');
        line
    }

    #[test]
    fn test_one_archive_per_threshold() {
        for k in [1, 3, 7] {
            let temp_dir = TempDir::new().expect("failed to create a temporary directory");
            let base = temp_dir.path().join("app");
            let mut f = fixture(&base, RotationPolicy::new(100, 200, 50), None);
            f.sink.start();

            // 10 lines of 10 bytes fill a file exactly
            for i in 0..k * 10 {
                let line = format!("line-{i:04}\n");
                assert_eq!(f.sink.write(line.as_bytes()), 10);
                f.sink.clock.advance(Span::new().seconds(1));
            }
            assert_eq!(archives(temp_dir.path()).len(), k - 1);

            f.sink.write(b"tail\n");
            let archived = archives(temp_dir.path());
            assert_eq!(archived.len(), k);
            for archive in archived {
                assert_eq!(fs::metadata(archive).unwrap().len(), 100);
            }
            assert_eq!(read(active_path(&base)), "tail\n");
            assert!(f.trap.0.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn test_random_lines_keep_order_and_bound_overshoot() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        let mut f = fixture(&base, RotationPolicy::new(100, 200, 50), None);
        f.sink.start();

        let mut expected = String::new();
        for _ in 0..200 {
            let line = generate_random_line();
            f.sink.write(line.as_bytes());
            expected.push_str(&line);
            f.sink.clock.advance(Span::new().seconds(1));
        }

        let mut actual = String::new();
        for archive in archives(temp_dir.path()) {
            let content = read(&archive);
            assert!(content.len() >= 100, "{archive:?} is under the threshold");
            assert!(content.len() < 100 + 16, "{archive:?} overshoots by more than a line");
            actual.push_str(&content);
        }
        actual.push_str(&read(active_path(&base)));
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_collision_backs_off_without_overwrite() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        let mut f = fixture(&base, RotationPolicy::new(100, 200, 50), None);
        f.sink.start();

        let taken = archive_path(&base, &start_time().to_zoned(TimeZone::UTC));
        fs::write(&taken, "keep\n").unwrap();

        for i in 0..10 {
            f.sink.write(format!("line-{i:04}\n").as_bytes());
        }
        assert_eq!(f.sink.policy.threshold(), 100);

        f.sink.write(b"line-010\n\n");
        assert_eq!(read(&taken), "keep\n");
        assert_eq!(f.sink.policy.threshold(), 105);
        assert_eq!(f.sink.written, 110);

        f.sink.write(b"line-011\n\n");
        assert_eq!(read(&taken), "keep\n");
        assert_eq!(f.sink.policy.threshold(), 110);

        f.sink.clock.advance(Span::new().seconds(1));
        f.sink.write(b"fresh\n");
        assert_eq!(read(&taken), "keep\n");
        assert_eq!(f.sink.policy.threshold(), 100);
        assert_eq!(f.sink.written, 6);
        assert_eq!(read(active_path(&base)), "fresh\n");

        let archived = archives(temp_dir.path());
        assert_eq!(archived.len(), 2);
        let rotated = archived.iter().find(|path| **path != taken).unwrap();
        assert_eq!(fs::metadata(rotated).unwrap().len(), 120);
    }

    #[test]
    fn test_collision_back_off_respects_cap() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        let mut f = fixture(&base, RotationPolicy::new(100, 105, 50), None);
        f.sink.start();

        let taken = archive_path(&base, &start_time().to_zoned(TimeZone::UTC));
        fs::write(&taken, "keep\n").unwrap();

        for _ in 0..20 {
            f.sink.write(b"0123456789");
        }
        assert_eq!(f.sink.policy.threshold(), 105);
        assert_eq!(read(&taken), "keep\n");
        assert_eq!(f.sink.written, 200);
    }

    #[test]
    fn test_fallback_recovery() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let dir = temp_dir.path().join("missing");
        let base = dir.join("app");
        let mut f = fixture(&base, RotationPolicy::new(1000, 2000, 20), None);

        f.sink.start();
        assert!(matches!(f.sink.output, Output::Fallback));
        assert_eq!(f.trap.0.lock().unwrap().len(), 1);

        f.sink.write(b"aaaaaaaaa\n");
        f.sink.write(b"aaaaaaaaa\n");
        assert_eq!(f.fallback.contents().len(), 20);
        assert_eq!(f.sink.policy.threshold(), 20);

        // the retry fails, the next one is scheduled another fallback threshold later
        f.sink.write(b"aaaaaaaaa\n");
        assert!(matches!(f.sink.output, Output::Fallback));
        assert_eq!(f.sink.policy.threshold(), 40);
        assert_eq!(f.fallback.contents().len(), 30);

        fs::create_dir(&dir).unwrap();
        f.sink.write(b"aaaaaaaaa\n");
        f.sink.write(b"bbbbbbbbb\n");
        assert!(matches!(f.sink.output, Output::File(_)));
        assert_eq!(f.sink.policy.threshold(), 1000);
        assert_eq!(f.fallback.contents().len(), 40);
        assert_eq!(read(active_path(&base)), "bbbbbbbbb\n");

        f.sink.write(b"ccccccccc\n");
        assert_eq!(read(active_path(&base)), "bbbbbbbbb\nccccccccc\n");
        assert_eq!(f.fallback.contents().len(), 40);
    }

    #[test]
    #[cfg(unix)]
    fn test_failed_archive_keeps_writing_to_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        // `<base>.log` fits in a file name, `<base>-<timestamp>.log` does not
        let base = temp_dir.path().join("a".repeat(240));
        let mut f = fixture(&base, RotationPolicy::new(20, 40, 20), None);

        f.sink.start();
        assert!(matches!(f.sink.output, Output::File(_)));

        let mut expected = String::new();
        for i in 0..20 {
            let line = format!("line-{i:03}\n");
            f.sink.write(line.as_bytes());
            expected.push_str(&line);
        }

        assert!(matches!(f.sink.output, Output::File(_)));
        assert_eq!(f.fallback.contents(), "");
        assert_eq!(read(active_path(&base)), expected);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
        assert_eq!(f.sink.policy.threshold(), 20);

        let trapped = f.trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 6, "{trapped:?}");
        assert!(
            trapped.iter().all(|e| e.starts_with("failed to archive log file")),
            "{trapped:?}"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_failed_archive_recovers_from_fallback() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("a".repeat(240));
        // a directory at the log path makes both archiving and opening fail
        fs::create_dir(active_path(&base)).unwrap();

        let mut f = fixture(&base, RotationPolicy::new(1000, 2000, 20), None);
        f.sink.start();
        assert!(matches!(f.sink.output, Output::Fallback));
        assert_eq!(f.trap.0.lock().unwrap().len(), 2);

        f.sink.write(b"aaaaaaaaa\n");
        f.sink.write(b"aaaaaaaaa\n");
        assert_eq!(f.sink.policy.threshold(), 20);

        // the file is usable again, but its archive name is too long to rename to
        fs::remove_dir(active_path(&base)).unwrap();
        fs::write(active_path(&base), "kept\n").unwrap();

        f.sink.write(b"bbbbbbbbb\n");
        assert!(matches!(f.sink.output, Output::File(_)));
        assert_eq!(f.sink.policy.threshold(), 1000);
        assert_eq!(f.fallback.contents().len(), 20);
        assert_eq!(read(active_path(&base)), "kept\nbbbbbbbbb\n");

        let trapped = f.trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 3, "{trapped:?}");
        assert!(trapped[2].starts_with("failed to archive log file"), "{trapped:?}");
    }

    #[derive(Debug)]
    struct UnflushableStream;

    impl Write for UnflushableStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("stream closed"))
        }
    }

    #[test]
    fn test_fallback_flush_error_is_trapped() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("missing").join("app");
        let trap = Arc::new(CollectTrap::default());
        let mut sink = RollingFile::new(
            &base,
            RotationPolicy::new(1000, 2000, 50),
            None,
            TimeZone::UTC,
            Box::new(UnflushableStream),
            trap.clone(),
        );

        sink.start();
        sink.write(b"to stderr\n");
        sink.close();

        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 2, "{trapped:?}");
        assert!(trapped[0].starts_with("failed to create log file"), "{trapped:?}");
        assert!(
            trapped[1].starts_with("failed to flush log fallback"),
            "{trapped:?}"
        );
    }

    #[test]
    fn test_header_and_footer() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        let mut f = fixture(
            &base,
            RotationPolicy::new(10, 20, 50),
            Some(Arc::new(Markers)),
        );
        f.sink.start();
        assert_eq!(f.sink.written, 2);

        f.sink.write(b"0123456789\n");
        assert_eq!(f.sink.written, 13);

        f.sink.clock.advance(Span::new().seconds(1));
        f.sink.write(b"abcdefghij\n");
        let archived = archives(temp_dir.path());
        assert_eq!(archived.len(), 1);
        assert_eq!(read(&archived[0]), "H\n0123456789\nF\n");

        f.sink.close();
        assert_eq!(read(active_path(&base)), "H\nabcdefghij\nF\n");
    }

    #[test]
    fn test_leftover_file_is_archived_on_start() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        fs::write(active_path(&base), "previous run\n").unwrap();

        let mut f = fixture(&base, RotationPolicy::new(100, 200, 50), None);
        f.sink.start();
        f.sink.write(b"this run\n");

        let archived = archives(temp_dir.path());
        assert_eq!(
            archived,
            vec![archive_path(&base, &start_time().to_zoned(TimeZone::UTC))]
        );
        assert_eq!(read(&archived[0]), "previous run\n");
        assert_eq!(read(active_path(&base)), "this run\n");
    }

    #[test]
    fn test_directory_in_place_of_log_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let base = temp_dir.path().join("app");
        fs::create_dir(active_path(&base)).unwrap();

        let mut f = fixture(&base, RotationPolicy::new(100, 200, 50), None);
        f.sink.start();
        f.sink.write(b"to stderr\n");

        assert!(matches!(f.sink.output, Output::Fallback));
        assert_eq!(f.fallback.contents(), "to stderr\n");
        let trapped = f.trap.0.lock().unwrap();
        assert!(trapped[0].contains("not a regular file"), "{trapped:?}");
    }
}
