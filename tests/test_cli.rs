
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Read;
use std::process::Command;
use tempfile::tempdir;

fn wts() -> Command {
    Command::new(assert_cmd::cargo_bin!("wts"))
}

/// Copies the regular sample into `dir`, default output paths are derived from it.
fn copy_regular_sample(dir: &std::path::Path) -> std::path::PathBuf {
    let target = dir.join("logon.webtest");
    fs::copy(regular_sample(), &target).unwrap();
    target
}

#[test]
fn it_respects_file_output() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("out").join("test.webtext");

    let mut cmd = wts();
    cmd.args([
        "dump",
        "-i",
        regular_sample().to_str().unwrap(),
        "-o",
        &f.to_string_lossy(),
    ]);

    assert!(
        cmd.output().unwrap().stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let mut written = vec![];
    File::open(&f).unwrap().read_to_end(&mut written).unwrap();
    assert!(
        written.starts_with(b"C: [#1] open logon page\r\n"),
        "Expected output to be printed to file"
    )
}

#[test]
fn it_defaults_output_to_the_input_with_webtext_extension() {
    let d = tempdir().unwrap();
    let input = copy_regular_sample(d.path());

    wts()
        .args(["dump", "-i", input.to_str().unwrap(), "--cnr"])
        .assert()
        .success();

    let written = fs::read_to_string(d.path().join("logon.webtext")).unwrap();
    assert!(written.starts_with("C: [] open logon page\r\n"));
}

#[test]
fn it_picks_up_default_rawrule_file_in_raw_mode() {
    let d = tempdir().unwrap();
    let input = copy_regular_sample(d.path());
    fs::copy(regular_sample_rules(), d.path().join("logon.rawrule")).unwrap();

    wts()
        .args(["dump", "-i", input.to_str().unwrap(), "-r"])
        .assert()
        .success();

    let written = fs::read_to_string(d.path().join("logon.webtext")).unwrap();
    assert!(written.contains("Order.Store (Order):True"), "{}", written);
    assert!(written.contains("<Due/>"));
}

#[test]
fn it_skips_missing_rawrule_file() {
    let d = tempdir().unwrap();
    let input = copy_regular_sample(d.path());

    wts()
        .args(["dump", "-i", input.to_str().unwrap(), "--raw"])
        .assert()
        .success();

    let written = fs::read_to_string(d.path().join("logon.webtext")).unwrap();
    assert!(written.contains("Order.Save (Order):True"));
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();

    let mut cmd = wts();
    cmd.args([
        "dump",
        "-i",
        regular_sample().to_str().unwrap(),
        "-o",
        &d.path().to_string_lossy(),
    ]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("wts error:"));
}

#[test]
fn test_missing_input_is_reported() {
    let d = tempdir().unwrap();
    let missing = d.path().join("missing.webtest");

    wts()
        .args(["dump", "-i", missing.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("wts error: Failed to open file"));

    assert!(!d.path().join("missing.webtext").exists());
}

#[test]
fn test_quiet_suppresses_error_message() {
    wts()
        .args(["-q", "dump", "-i", sample_with_unknown_method().to_str().unwrap(), "-o"])
        .arg(tempdir().unwrap().path().join("x.webtext"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_malformed_rawrule_is_a_config_error() {
    let d = tempdir().unwrap();
    let out = d.path().join("out.webtext");

    wts()
        .args(["dump", "-r", "-i", regular_sample().to_str().unwrap()])
        .args(["--rawrule", rules_with_invalid_pattern().to_str().unwrap()])
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid rule pattern"));

    assert!(!out.exists());
}

#[test]
fn test_check_prints_reported_requests_to_stdout() {
    wts()
        .args([
            "check",
            "-i",
            regular_sample().to_str().unwrap(),
            "-c",
            "never-matches",
            "--timeout",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "\r\nT: Logon\r\nC: [#2] submit profile\r\nP: (5,200) ",
        ));
}

#[test]
fn test_check_with_invalid_pattern_fails() {
    wts()
        .args(["check", "-i", regular_sample().to_str().unwrap(), "-c", "(unclosed"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid check pattern"));
}

#[test]
fn test_no_subcommand_prints_help() {
    wts()
        .assert()
        .code(2)
        .stdout(predicate::str::contains("dump"));
}
