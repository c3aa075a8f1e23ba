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
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use logrelay::LoggerBuilder;
use logrelay::Registry;
use logrelay::Verbosity;
use tempfile::TempDir;

fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect::<Vec<_>>();
    files.sort();
    files
}

/// Archives in name order, then the active file.
fn all_lines(dir: &Path) -> Vec<String> {
    let active = dir.join("app.log");
    let mut files = log_files(dir)
        .into_iter()
        .filter(|path| *path != active)
        .collect::<Vec<_>>();
    files.push(active);

    files
        .iter()
        .flat_map(|path| {
            fs::read_to_string(path)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn test_rotation_with_prefixed_lines() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let logger = LoggerBuilder::new("rotation", dir.path().join("app"))
        .rotate_threshold(100)
        .verbosity(Verbosity::NONE)
        .prefix("X")
        .register_in(&registry)
        .unwrap();

    // 15 bytes per line
    for i in 0..10 {
        logger.info(format!("message-{i:02}"));
    }
    registry.stop_all(Duration::from_secs(10)).unwrap();

    let files = log_files(dir.path());
    assert_eq!(files.len(), 2, "{files:?}");

    let active = dir.path().join("app.log");
    let archive = files.iter().find(|path| **path != active).unwrap();
    let name = archive.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("app-") && name.ends_with(".log"), "{name}");
    // app-MM-DD-YYYY_HH-MM-SS.log
    assert_eq!(name.len(), "app-".len() + 19 + ".log".len(), "{name}");

    let archived = fs::read_to_string(archive).unwrap();
    assert!(archived.len() >= 100 && archived.len() < 115, "{archived}");
    assert_eq!(archived.lines().count(), 7);

    let lines = all_lines(dir.path());
    let expected = (0..10)
        .map(|i| format!("[X] message-{i:02}"))
        .collect::<Vec<_>>();
    assert_eq!(lines, expected);
}

#[test]
fn test_rapid_rotation_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let logger = LoggerBuilder::new("rapid", dir.path().join("app"))
        .rotate_threshold(100)
        .verbosity(Verbosity::NONE)
        .register_in(&registry)
        .unwrap();

    // archive names collide within one second, so most lines land in widened files
    for i in 0..300 {
        logger.infof("line {:04}", logrelay::args![i]);
    }
    registry.stop_all(Duration::from_secs(10)).unwrap();

    let lines = all_lines(dir.path());
    let expected = (0..300).map(|i| format!("line {i:04}")).collect::<Vec<_>>();
    assert_eq!(lines, expected);
}

#[test]
fn test_leftover_log_is_archived_on_start() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "from a previous run\n").unwrap();

    let registry = Registry::new();
    let logger = LoggerBuilder::new("restart", dir.path().join("app"))
        .verbosity(Verbosity::NONE)
        .register_in(&registry)
        .unwrap();
    logger.info("fresh");
    registry.stop_all(Duration::from_secs(10)).unwrap();

    assert_eq!(log_files(dir.path()).len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("app.log")).unwrap(),
        "fresh\n"
    );
    assert_eq!(all_lines(dir.path()), vec!["from a previous run", "fresh"]);
}
