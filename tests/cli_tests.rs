use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn swhid_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swhid"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    swhid_cmd().args(args).output().unwrap()
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = swhid_cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for subcommand in [
        "content", "parse", "directory", "archive", "revision", "release", "snapshot", "verify",
    ] {
        assert!(help.contains(subcommand), "missing {} in:\n{}", subcommand, help);
    }
}

#[test]
fn test_content_from_stdin() {
    let output = run_with_stdin(&["content"], b"Hello, World!");
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "swh:1:cnt:b45ef6fec89518d314f546fd6c3025367b721684\n"
    );
}

#[test]
fn test_content_from_stdin_is_binary_safe() {
    let data = b"\x00\xff\r\n\x1b";
    let output = run_with_stdin(&["content"], data);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), swhid::from_content(data).to_string());
}

#[test]
fn test_content_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty");
    fs::write(&path, b"").unwrap();

    let output = run(&["content", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "swh:1:cnt:e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n"
    );
}

#[test]
fn test_parse_prints_canonical_form() {
    let output = run(&[
        "parse",
        "swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2;lines=1-2;origin=https://example.com",
    ]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2;origin=https://example.com;lines=1-2\n"
    );
}

#[test]
fn test_parse_json() {
    let output = run(&[
        "parse",
        "--json",
        "swh:1:rev:309cf2674ee7a0749978cf8265ab91a60aea0f7d;origin=https://example.com",
    ]);
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["scheme"], "swh");
    assert_eq!(parsed["version"], 1);
    assert_eq!(parsed["object_type"], "rev");
    assert_eq!(parsed["object_hash"], "309cf2674ee7a0749978cf8265ab91a60aea0f7d");
    assert_eq!(parsed["qualifiers"]["origin"], "https://example.com");
}

#[test]
fn test_parse_invalid_exits_nonzero() {
    let output = run(&["parse", "swh:1:xyz:94a9ed024d3859793618152ea559a168bbcbb5e2"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_directory_and_recursive_listing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("file.txt"), b"test").unwrap();
    let root = dir.path().to_str().unwrap();

    let output = run(&["directory", "--no-git-index", root]);
    assert!(output.status.success());
    let expected = swhid::SwhidComputer::new()
        .with_git_index(false)
        .compute_directory_swhid(dir.path())
        .unwrap();
    assert_eq!(stdout(&output).trim(), expected.to_string());

    let output = run(&["directory", "--no-git-index", "--recursive", root]);
    assert!(output.status.success());
    let listing = stdout(&output);
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(&format!("{}\t", expected)));
    assert!(lines[1].starts_with("swh:1:cnt:30d74d258442c7c65512eafab474568dd706c430\t"));
}

#[test]
fn test_directory_with_permission_file() {
    let dir = TempDir::new().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("tool"), b"#!/bin/sh\n").unwrap();
    let perms = dir.path().join("perms.json");
    fs::write(&perms, br#"{"tool": "755"}"#).unwrap();

    let output = run(&[
        "directory",
        "--no-git-index",
        "--permissions",
        perms.to_str().unwrap(),
        tree.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let expected = swhid::from_directory(vec![swhid::DirectoryEntry::new(
        "tool",
        swhid::EntryKind::Executable,
        swhid::from_content(b"#!/bin/sh\n"),
    )])
    .unwrap();
    assert_eq!(stdout(&output).trim(), expected.to_string());
}

#[test]
fn test_verify_match_and_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, b"Hello, World!").unwrap();
    let path = path.to_str().unwrap();

    let output = run(&[
        "verify",
        path,
        "swh:1:cnt:b45ef6fec89518d314f546fd6c3025367b721684;origin=https://example.com",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("OK "));

    let output = run(&[
        "verify",
        path,
        "swh:1:cnt:e69de29bb2d1d6434b8b29ae775ad8c2e48c5391",
    ]);
    assert!(!output.status.success());
    assert!(stdout(&output).starts_with("MISMATCH "));
}

#[test]
fn test_verify_invalid_swhid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, b"x").unwrap();

    let output = run(&["verify", path.to_str().unwrap(), "not-a-swhid"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_quiet_and_verbose_conflict() {
    let output = run(&["-q", "-v", "parse", "swh:1:cnt:e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"]);
    assert!(!output.status.success());
}
