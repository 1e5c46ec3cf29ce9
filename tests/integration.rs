//! Integration tests for arbor


use std::fs;

use harness::{SampleArchive, arbor_cmd, run_arbor};
use predicates::prelude::*;

#[test]
fn test_basic_tree_output() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k"]);
    assert!(success, "arbor should succeed");
    assert!(stdout.starts_with("Data.p4k\n"), "title first: {}", stdout);
    assert!(stdout.contains("└── Data"), "should show Data: {}", stdout);
    assert!(stdout.contains("ship.cgf"));
    assert!(stdout.contains("hull.dds.1"));
    assert!(stdout.contains("3 directories, 4 files"), "footer: {}", stdout);
}

#[test]
fn test_basic_tree_exit_status() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    arbor_cmd(archive.path())
        .arg("Data.p4k")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Data.p4k\n"))
        .stdout(predicate::str::ends_with("3 directories, 4 files\n"));
}

#[test]
fn test_tree_connectors() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k"]);
    assert!(success);
    assert!(stdout.contains("    ├── Objects"), "{}", stdout);
    assert!(stdout.contains("    │   └── ship.cgf"), "{}", stdout);
    assert!(stdout.contains("    ├── readme.txt"), "{}", stdout);
    assert!(stdout.contains("    └── Textures"), "{}", stdout);
}

#[test]
fn test_substring_filter_keeps_ancestors() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "--filter", "HULL"]);
    assert!(success);
    assert!(stdout.contains("Textures"));
    assert!(stdout.contains("hull.dds"));
    assert!(!stdout.contains("ship.cgf"), "non-matching leaf hidden: {}", stdout);
    assert!(!stdout.contains("readme.txt"));
    assert!(stdout.contains("2 directories, 2 files"), "{}", stdout);
}

#[test]
fn test_regex_filter() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["Data.p4k", "--filter", r"\.dds$", "--regex"]);
    assert!(success);
    assert!(stdout.contains("hull.dds"));
    assert!(!stdout.contains("hull.dds.1"), "{}", stdout);
}

#[test]
fn test_glob_and_exclude() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "--glob", "*.dds"]);
    assert!(success);
    assert!(stdout.contains("hull.dds"));
    assert!(stdout.contains("2 directories, 1 files"), "{}", stdout);

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "-I", "*.txt"]);
    assert!(success);
    assert!(!stdout.contains("readme.txt"), "{}", stdout);
    assert!(stdout.contains("ship.cgf"));
}

#[test]
fn test_level_and_dirs_only() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "-L", "1"]);
    assert!(success);
    assert!(stdout.contains("Data"));
    assert!(!stdout.contains("Textures"), "depth limit: {}", stdout);

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "-d"]);
    assert!(success);
    assert!(stdout.contains("Textures"));
    assert!(!stdout.contains("hull.dds"));
    assert!(stdout.contains("3 directories, 0 files"), "{}", stdout);
}

#[test]
fn test_long_columns() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["Data.p4k", "-l", "--sort", "size", "--reverse"]);
    assert!(success);
    let line = stdout
        .lines()
        .find(|l| l.contains("readme.txt"))
        .expect("readme.txt line");
    assert!(line.contains(".txt"), "type column: {}", line);
    assert!(line.contains("7B"), "size column: {}", line);
}

#[test]
fn test_json_output() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["type"], "dir");
    let data = &value["children"][0];
    assert_eq!(data["name"], "Data");
    assert_eq!(data["type"], "dir");
    assert_eq!(data["children"].as_array().unwrap().len(), 3);
}

#[test]
fn test_stats_output() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "--stats"]);
    assert!(success);
    assert!(stdout.contains("Files:        4 total"), "{}", stdout);
    assert!(stdout.contains("Directories:  3"));
    assert!(stdout.contains("By Type:"));

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["Data.p4k", "--stats", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value[0]["files"], 4);
    assert_eq!(value[0]["total_bytes"], 24);
}

#[test]
fn test_records_layout() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["game.json"]);
    assert!(success);
    assert!(stdout.starts_with("Game.dcb\n"), "{}", stdout);
    assert!(stdout.contains("ships"));
    assert!(stdout.contains("aurora"));
    assert!(
        stdout.contains("aurora.0a1b2c3d-0000-0000-0000-000000000003"),
        "duplicate record renamed with its key: {}",
        stdout
    );
    assert!(!stdout.contains("libs"), "root prefix stripped: {}", stdout);
    assert!(!stdout.contains(".xml"), "extension stripped: {}", stdout);
}

#[test]
fn test_records_raw_paths() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["game.json", "--raw-paths"]);
    assert!(success);
    assert!(stdout.contains("libs"));
    assert!(stdout.contains("aurora.xml"));
}

#[test]
fn test_records_custom_root() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["game.json", "--records-root", "libs/foundry"]);
    assert!(success);
    assert!(stdout.contains("└── records") || stdout.contains("├── records"), "{}", stdout);
    assert!(!stdout.contains("libs"));
}

#[test]
fn test_type_filter() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["game.json", "--type", "ammoparams"]);
    assert!(success);
    assert!(stdout.contains("bullet"));
    assert!(!stdout.contains("aurora"), "{}", stdout);
}

#[test]
fn test_filter_matches_keys() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["game.json", "--filter", "000000000002", "--keys"]);
    assert!(success);
    assert!(stdout.contains("bullet"), "{}", stdout);
    assert!(stdout.contains("1 directories, 1 files"), "{}", stdout);
}

#[test]
fn test_lookup_by_key_and_path() {
    let archive = SampleArchive::new();
    archive.records("game.json");
    archive.package("Data.p4k");

    let (stdout, _stderr, success) = run_arbor(
        archive.path(),
        &["game.json", "--key", "0a1b2c3d-0000-0000-0000-000000000002"],
    );
    assert!(success);
    assert!(stdout.starts_with("ammo/bullet"), "{}", stdout);
    assert!(stdout.contains("AmmoParams"));

    let (stdout, _stderr, success) =
        run_arbor(archive.path(), &["Data.p4k", "--lookup", "data/README.txt"]);
    assert!(success);
    assert!(stdout.starts_with("Data/readme.txt"), "{}", stdout);
}

#[test]
fn test_extract_filtered_leaves() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (_stdout, stderr, success) =
        run_arbor(archive.path(), &["Data.p4k", "--glob", "*.dds", "--extract", "out"]);
    assert!(success, "extraction should succeed: {}", stderr);
    assert!(stderr.contains("Extracted 1 files"), "{}", stderr);
    let written = archive.path().join("out/Data/Textures/hull.dds");
    assert_eq!(fs::read_to_string(written).unwrap(), "DDS hull");
    assert!(!archive.path().join("out/Data/readme.txt").exists());
}

#[test]
fn test_extract_record() {
    let archive = SampleArchive::new();
    archive.records("game.json");

    let (_stdout, stderr, success) = run_arbor(
        archive.path(),
        &["game.json", "--lookup", "ammo/bullet", "--extract", "out"],
    );
    assert!(success, "{}", stderr);
    let written = archive.path().join("out/ammo/bullet");
    assert_eq!(fs::read_to_string(written).unwrap(), "<Ammo/>");
}

#[test]
fn test_multiple_archives() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");
    archive.records("game.json");

    let (stdout, _stderr, success) = run_arbor(archive.path(), &["Data.p4k", "game.json"]);
    assert!(success);
    assert!(stdout.contains("Data.p4k\n"));
    assert!(stdout.contains("Game.dcb\n"));
    assert!(stdout.find("Data.p4k").unwrap() < stdout.find("Game.dcb").unwrap());
}

#[test]
fn test_progress_lines() {
    let archive = SampleArchive::new();
    archive.package("Data.p4k");

    let (_stdout, stderr, success) = run_arbor(archive.path(), &["Data.p4k", "--progress"]);
    assert!(success);
    assert!(stderr.contains("Loading Data.p4k"), "{}", stderr);
}
