//! End-to-end tests driving the `emt` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const LOG: &str = "\
1507220303:  *** emerge --update --deep @world
1507220303:  >>> emerge (1 of 2) app-shells/bash-4.4_p12 to /
1507220353:  ::: completed emerge (1 of 2) app-shells/bash-4.4_p12 to /
1507220360:  >>> emerge (2 of 2) dev-lang/rust-1.75.0 to /
1507224083:  ::: completed emerge (2 of 2) dev-lang/rust-1.75.0 to /
1507224090:  *** exiting successfully.
1507300000:  >>> emerge (1 of 2) dev-lang/rust-1.76.0 to /
1507300010:  >>> emerge (2 of 2) app-misc/fresh-0.1 to /
";

fn emt_binary() -> String {
    env!("CARGO_BIN_EXE_emt").to_string()
}

/// Runs `emt` isolated from the user's config and environment.
fn emt(home: &Path, args: &[&str]) -> Output {
    Command::new(emt_binary())
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG")
        .env_remove("EMT_LOG_PATH")
        .env_remove("EMT_PROC_DIR")
        .env_remove("EMT_STATISTIC")
        .env_remove("EMT_DISCARD_ON_RESTART")
        .args(args)
        .output()
        .expect("failed to run emt")
}

fn write_log(temp: &TempDir, content: &str) -> String {
    let path = temp.path().join("emerge.log");
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_default_command_prints_history() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);

    let output = emt(temp.path(), &["--log", &log]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "2017-10-05T16:18:23Z: app-shells/bash-4.4_p12: 50s\n\
         2017-10-05T16:19:20Z: dev-lang/rust-1.75.0: 1h2m3s\n\
         Total number of compilations: 2\n"
    );
}

#[test]
fn test_history_json() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);

    let output = emt(temp.path(), &["history", "--json", "--log", &log]);
    assert!(output.status.success(), "{}", stderr(&output));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total"], 2);
    assert_eq!(value["compiles"][1]["package"], "dev-lang/rust");
}

#[test]
fn test_estimate_prints_statistic() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);

    let output = emt(temp.path(), &["estimate", "rust", "--log", &log]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "2017-10-05T16:19:20Z: dev-lang/rust-1.75.0: 1h2m3s\n\
         Total number of compilations: 1\n\
         Median duration: 1h2m3s\n"
    );
}

#[test]
fn test_estimate_unknown_package_exits_2() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);

    let output = emt(temp.path(), &["estimate", "zsh", "--log", &log]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("found no compilations matching zsh"));
}

#[test]
fn test_missing_log_exits_1() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.log");

    let output = emt(temp.path(), &["--log", &missing.display().to_string()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("could not open log file"));
}

#[test]
fn test_malformed_lines_are_skipped_with_warning() {
    let temp = TempDir::new().unwrap();
    let log = write_log(
        &temp,
        "100:  >>> emerge (1 of 1) a/x-1 to /\nbogus: hello\n160:  ::: completed emerge (1 of 1) a/x-1 to /\n",
    );

    let output = emt(temp.path(), &["history", "--log", &log]);
    assert!(output.status.success());
    assert!(stdout(&output).ends_with("Total number of compilations: 1\n"));
    assert!(stderr(&output).contains("skipping unparsable log line"));
}

#[test]
fn test_config_file_sets_log_path() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);
    let config = temp.path().join("emt.toml");
    fs::write(
        &config,
        format!("log_path = {log:?}\nstatistic = \"average\"\n"),
    )
    .unwrap();

    let config = config.display().to_string();
    let output = emt(temp.path(), &["estimate", "bash", "--config", &config]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).ends_with("Average duration: 50s\n"));
}

#[test]
fn test_current_reads_fake_proc() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);
    let proc_dir = temp.path().join("proc");
    for (pid, cmdline) in [
        ("1", &b"/sbin/init\0"[..]),
        (
            "300",
            &b"[dev-lang/rust-1.76.0] sandbox\0/usr/lib/portage/ebuild.sh\0compile\0"[..],
        ),
        (
            "301",
            &b"[app-misc/fresh-0.1] sandbox\0/bin/bash /usr/lib/portage/ebuild.sh unpack\0"[..],
        ),
    ] {
        fs::create_dir_all(proc_dir.join(pid)).unwrap();
        fs::write(proc_dir.join(pid).join("cmdline"), cmdline).unwrap();
    }

    let output = emt(
        temp.path(),
        &[
            "current",
            "--log",
            &log,
            "--proc-dir",
            &proc_dir.display().to_string(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3, "{out}");
    assert!(lines[0].starts_with("Package"));
    assert!(lines[1].starts_with("app-misc/fresh-0.1"));
    assert!(lines[1].contains("unpack"));
    assert!(lines[1].ends_with("unknown"));
    assert!(lines[2].starts_with("dev-lang/rust-1.76.0"));
    assert!(lines[2].contains("compile"));
    assert!(lines[2].ends_with("any time now"));
}

#[test]
fn test_current_with_nothing_running() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, LOG);
    let proc_dir = temp.path().join("proc");
    fs::create_dir(&proc_dir).unwrap();

    let output = emt(
        temp.path(),
        &[
            "current",
            "--log",
            &log,
            "--proc-dir",
            &proc_dir.display().to_string(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "No compilations currently running.\n");
}
