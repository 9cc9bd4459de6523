use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const STARTUP_MESSAGE: &str = "loaded runtime configuration";

/// Runs one `ask` turn against a provider name that is rejected before any network call.
fn ask_with_logging_env(log_output: &str, log_format: &str, log_file_path: Option<&Path>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_finchat"));
    cmd.args(["ask", "hi"])
        .env("MODEL_PROVIDER", "invalid")
        .env("RUST_LOG", "finchat=info")
        .env("LOG_OUTPUT", log_output)
        .env("LOG_FORMAT", log_format);

    match log_file_path {
        Some(path) => cmd.env("LOG_FILE_PATH", path),
        None => cmd.env_remove("LOG_FILE_PATH"),
    };

    cmd.output().expect("failed to run finchat binary")
}

fn scratch_dir(label: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "finchat-logging-{label}-{stamp}-{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("failed to create temp directory");
    dir
}

fn read_rotated_log(dir: &Path, base_file_name: &str) -> String {
    let prefix = format!("{base_file_name}.");
    let path = fs::read_dir(dir)
        .expect("failed to read temp directory")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .max()
        .expect("expected a rotated log file to be created");
    fs::read_to_string(path).expect("failed to read rotated log file")
}

#[test]
fn json_format_emits_structured_startup_line() {
    let output = ask_with_logging_env("stderr", "json", None);
    assert!(!output.status.success(), "invalid provider should fail command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let entries: Vec<Value> = stderr
        .lines()
        .filter(|line| line.trim_start().starts_with('{'))
        .map(|line| serde_json::from_str(line).expect("line should be valid JSON"))
        .collect();
    assert!(
        !entries.is_empty(),
        "expected at least one JSON log line, got stderr:\n{stderr}"
    );

    let startup = entries
        .iter()
        .find(|entry| entry["fields"]["message"].as_str() == Some(STARTUP_MESSAGE))
        .unwrap_or_else(|| panic!("expected startup log message, got stderr:\n{stderr}"));
    assert_eq!(startup["fields"]["provider"].as_str(), Some("invalid"));
}

#[test]
fn file_output_keeps_logs_off_stderr() {
    let dir = scratch_dir("file");
    let output = ask_with_logging_env("file", "pretty", Some(&dir.join("finchat.log")));
    assert!(!output.status.success(), "invalid provider should fail command");

    let contents = read_rotated_log(&dir, "finchat.log");
    assert!(
        contents.contains(STARTUP_MESSAGE),
        "expected startup log message in file, got:\n{contents}"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains(STARTUP_MESSAGE),
        "did not expect logs on stderr in file-only mode:\n{stderr}"
    );
    assert!(
        stderr.contains("Unsupported MODEL_PROVIDER"),
        "expected command error on stderr:\n{stderr}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn both_output_writes_stderr_and_file() {
    let dir = scratch_dir("both");
    let output = ask_with_logging_env("both", "pretty", Some(&dir.join("finchat.log")));
    assert!(!output.status.success(), "invalid provider should fail command");

    let contents = read_rotated_log(&dir, "finchat.log");
    assert!(contents.contains(STARTUP_MESSAGE), "file log:\n{contents}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(STARTUP_MESSAGE), "stderr:\n{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unusable_log_path_falls_back_to_stderr() {
    let dir = scratch_dir("fallback");
    let blocker = dir.join("not-a-directory");
    fs::write(&blocker, "block").expect("failed to create blocking file");

    let output = ask_with_logging_env("file", "pretty", Some(&blocker.join("finchat.log")));
    assert!(!output.status.success(), "invalid provider should fail command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to initialize LOG_OUTPUT=file"),
        "expected fallback notice, got:\n{stderr}"
    );
    assert!(stderr.contains("using stderr instead"), "stderr:\n{stderr}");
    assert!(stderr.contains(STARTUP_MESSAGE), "stderr:\n{stderr}");

    let _ = fs::remove_dir_all(&dir);
}
