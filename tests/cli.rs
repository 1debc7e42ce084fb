//! End-to-end checks of the procdump binary against the real `/proc`.

#![cfg(target_os = "linux")]

use std::fs;
use std::process::{Command, Output};

use procdump::domains::dump::exit;

fn procdump(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_procdump"))
        .args(args)
        .env_remove("PROCDUMP_LOG_LEVEL")
        .output()
        .expect("failed to run procdump")
}

fn status(output: &Output) -> i32 {
    output.status.code().expect("procdump was killed by a signal")
}

#[test]
fn test_dumps_file_verbatim() {
    let output = procdump(&["version"]);

    assert_eq!(status(&output), i32::from(exit::SUCCESS));
    assert_eq!(output.stdout, fs::read("/proc/version").unwrap());
}

#[test]
fn test_dash_target_means_stdout() {
    let output = procdump(&["version", "-"]);

    assert_eq!(status(&output), i32::from(exit::SUCCESS));
    assert_eq!(output.stdout, fs::read("/proc/version").unwrap());
}

#[test]
fn test_traversal_rejected() {
    let output = procdump(&["../etc/passwd"]);

    assert_eq!(status(&output), i32::from(exit::TRAVERSAL));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("procdump: "));
}

#[test]
fn test_absolute_path_rejected() {
    let output = procdump(&["/etc/passwd"]);
    assert_eq!(status(&output), i32::from(exit::TRAVERSAL));
}

#[test]
fn test_exact_rule_rejected() {
    let output = procdump(&["1/mem"]);

    assert_eq!(status(&output), i32::from(exit::EXACT_MATCH));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_kernel_log_and_page_tables_rejected() {
    for path in ["kmsg", "kpageflags", "kpagecount", "kpagecgroup"] {
        let output = procdump(&["--check", path]);
        assert_eq!(status(&output), i32::from(exit::EXACT_MATCH), "{path}");
    }
}

#[test]
fn test_segment_rule_rejected() {
    let output = procdump(&["1/fd/0"]);
    assert_eq!(status(&output), i32::from(exit::SEGMENT_MATCH));

    let output = procdump(&["self/root/etc/passwd"]);
    assert_eq!(status(&output), i32::from(exit::SEGMENT_MATCH));
}

#[test]
fn test_missing_file_is_not_found() {
    let output = procdump(&["nonexistent/path"]);

    assert_eq!(status(&output), i32::from(exit::NOT_FOUND));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_directory_is_unreadable() {
    let output = procdump(&["self"]);

    assert_eq!(status(&output), i32::from(exit::UNREADABLE));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_diagnostics_escape_control_characters() {
    let output = procdump(&["1/\x1b[2J/mem"]);

    assert_eq!(status(&output), i32::from(exit::EXACT_MATCH));
    assert!(!output.stderr.contains(&0x1b));
}

#[test]
fn test_usage_errors() {
    assert_eq!(status(&procdump(&[])), i32::from(exit::USAGE));
    assert_eq!(status(&procdump(&["version", "out.txt"])), i32::from(exit::USAGE));
    assert_eq!(status(&procdump(&["version", "-", "extra"])), i32::from(exit::USAGE));
    assert_eq!(status(&procdump(&[""])), i32::from(exit::USAGE));
}

#[test]
fn test_check_reports_without_reading() {
    let output = procdump(&["--check", "version"]);
    assert_eq!(status(&output), i32::from(exit::SUCCESS));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/proc/version"));

    let output = procdump(&["--check", "1/mem"]);
    assert_eq!(status(&output), i32::from(exit::EXACT_MATCH));
}

#[test]
fn test_show_policy_prints_json() {
    let output = procdump(&["--show-policy"]);
    assert_eq!(status(&output), i32::from(exit::SUCCESS));

    let policy: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(policy["trusted_root"], "/proc");
    assert!(policy["rules"].as_array().is_some_and(|rules| !rules.is_empty()));
}
