#![cfg(unix)]

use std::error::Error;

use rundag::{RunContext, Shell};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn output_captures_trimmed_stdout() -> TestResult {
    let ctx = RunContext::new();
    let out = Shell::new().output(&ctx, "echo", &["banana"]).await?;
    assert_eq!(out, "banana");
    Ok(())
}

#[tokio::test]
async fn run_reports_the_exit_code() -> TestResult {
    let ctx = RunContext::new();
    let err = Shell::new()
        .run(&ctx, "sh", &["-c", "exit 3"])
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("failed with exit code 3"),
        "{err}"
    );
    Ok(())
}

#[tokio::test]
async fn workdir_applies_to_the_child() -> TestResult {
    let dir = tempfile::tempdir()?;
    let expected = dir.path().canonicalize()?;

    let ctx = RunContext::new();
    let out = Shell::new()
        .workdir(dir.path())
        .output(&ctx, "pwd", &[])
        .await?;
    assert_eq!(std::path::PathBuf::from(out).canonicalize()?, expected);
    Ok(())
}

#[tokio::test]
async fn env_overlays_the_inherited_environment() -> TestResult {
    let ctx = RunContext::new();
    let out = Shell::new()
        .env("FRUIT", "melon")
        .output(&ctx, "sh", &["-c", "printf %s \"$FRUIT\""])
        .await?;
    assert_eq!(out, "melon");
    Ok(())
}

#[tokio::test]
async fn script_runs_lines_in_order() -> TestResult {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("marker");

    let ctx = RunContext::new();
    Shell::new()
        .workdir(dir.path())
        .script(
            &ctx,
            &["set -e", "printf one > marker", "printf ',two' >> marker"],
        )
        .await?;

    assert_eq!(std::fs::read_to_string(marker)?, "one,two");
    Ok(())
}

#[tokio::test]
async fn script_reports_the_exit_code() -> TestResult {
    let ctx = RunContext::new();
    let err = Shell::new()
        .script(&ctx, &["exit 4"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exit code 4"), "{err}");
    Ok(())
}

#[tokio::test]
async fn cancellation_kills_the_child() -> TestResult {
    let ctx = RunContext::new();
    ctx.cancel();

    let err = Shell::new()
        .run(&ctx, "sleep", &["5"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"), "{err}");
    Ok(())
}
