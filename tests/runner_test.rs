#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{sh, sh_logged};
use dbforge::{
    console::Console,
    runner::{Invocation, Runner, RunnerError},
};
use std::fs;

/// Build a runner over a scratch logs directory; returns the tempdir so it
/// outlives the test body.
fn runner(echo: bool) -> (Runner, tempfile::TempDir, tokio::task::JoinHandle<()>) {
    let dir = tempfile::tempdir().unwrap();
    let (console, writer) = Console::spawn();
    let runner = Runner::new(dir.path().to_str().unwrap(), echo, console);
    (runner, dir, writer)
}

#[tokio::test]
async fn reports_success_for_zero_exit() {
    let (runner, _dir, writer) = runner(false);
    let result = runner.run(&sh("exit 0")).await;
    assert!(result.is_ok());
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn nonzero_exit_is_a_runtime_failure() {
    let (runner, _dir, writer) = runner(false);
    let err = runner.run(&sh("exit 3")).await.unwrap_err();
    assert!(!err.is_spawn_failure());
    assert_eq!(err.exit_code(), Some(3));
    assert!(matches!(err, RunnerError::Exit { .. }));
    assert!(err.to_string().contains("exited"));
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn missing_binary_is_a_spawn_failure() {
    let (runner, _dir, writer) = runner(false);
    let invocation = Invocation {
        program: "/nonexistent/dbforge-no-such-tool".to_string(),
        args: vec![],
        current_dir: None,
        log_name: None,
    };
    let err = runner.run(&invocation).await.unwrap_err();
    assert!(err.is_spawn_failure());
    // no exit code exists for a process that never started
    assert_eq!(err.exit_code(), None);
    assert!(matches!(err, RunnerError::Spawn { .. }));
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn log_file_captures_stdout_in_order() {
    let (runner, dir, writer) = runner(false);
    let result = runner
        .run(&sh_logged("echo a; echo b; echo noise >&2", "x"))
        .await;
    assert!(result.is_ok());

    let log = fs::read_to_string(dir.path().join("x.txt")).unwrap();
    // stderr never reaches the log file
    assert_eq!(log, "a\nb\n");
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn echo_enabled_still_writes_log() {
    let (runner, dir, writer) = runner(true);
    runner
        .run(&sh_logged("printf 'hello\\n'", "echoed"))
        .await
        .unwrap();
    let log = fs::read_to_string(dir.path().join("echoed.txt")).unwrap();
    assert_eq!(log, "hello\n");
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn no_log_name_produces_no_file() {
    let (runner, dir, writer) = runner(false);
    runner.run(&sh("echo hi")).await.unwrap();
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 0);
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn many_lines_kept_in_order() {
    let (runner, dir, writer) = runner(false);
    runner.run(&sh_logged("seq 1 200", "seq")).await.unwrap();

    let log = fs::read_to_string(dir.path().join("seq.txt")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 200);
    assert_eq!(lines.first(), Some(&"1"));
    assert_eq!(lines.last(), Some(&"200"));
    assert!(log.ends_with('\n'));
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn trailing_output_is_drained_before_return() {
    let (runner, dir, writer) = runner(false);
    // output produced immediately before exit must still land in the log
    runner
        .run(&sh_logged("printf 'last line\\n'", "tail"))
        .await
        .unwrap();
    let log = fs::read_to_string(dir.path().join("tail.txt")).unwrap();
    assert_eq!(log, "last line\n");
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn non_utf8_output_does_not_stop_the_drain() {
    let (runner, dir, writer) = runner(false);
    // a line of raw bytes in the middle must not cost us the lines around
    // it, nor the already-buffered log content
    runner
        .run(&sh_logged(
            "printf 'before\\n'; printf '\\377\\376\\n'; printf 'after\\n'",
            "bin",
        ))
        .await
        .unwrap();

    let log = fs::read(dir.path().join("bin.txt")).unwrap();
    let text = String::from_utf8_lossy(&log);
    assert!(text.starts_with("before\n"));
    assert!(text.ends_with("after\n"));
    assert_eq!(text.lines().count(), 3);
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn unwritable_log_dir_is_non_fatal() {
    let (console, writer) = Console::spawn();
    let runner = Runner::new("/nonexistent/logs", false, console);
    // the step still succeeds, just without durable logging
    runner.run(&sh_logged("echo hi", "x")).await.unwrap();
    drop(runner);
    writer.await.unwrap();
}

#[tokio::test]
async fn sequential_invocations_do_not_overlap() {
    let (runner, dir, writer) = runner(false);

    runner
        .run(&sh_logged("sleep 0.2; echo done", "first"))
        .await
        .unwrap();
    // the second invocation only works if the first one's log was fully
    // drained and closed before the runner returned
    let second = sh_logged(
        &format!("cat {}/first.txt", dir.path().display()),
        "second",
    );
    runner.run(&second).await.unwrap();

    let log = fs::read_to_string(dir.path().join("second.txt")).unwrap();
    assert_eq!(log, "done\n");
    drop(runner);
    writer.await.unwrap();
}
